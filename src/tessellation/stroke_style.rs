use crate::error::{Result, TessellationError};

/// Default limit on the miter length, in multiples of half the stroke width.
pub const DEFAULT_MITER_LIMIT: f64 = 2.0;

/// Join style at interior polyline vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineJoin {
    /// Miter join, switching to a bevel where the miter limit is exceeded.
    #[default]
    Miter,
    /// Always bevel.
    Bevel,
}

/// Cap style at the ends of open polylines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CapStyle {
    /// The stroke ends flush with the endpoint.
    #[default]
    Flat,
    /// The stroke extends half its width past the endpoint.
    Square,
    /// A half disc centered on the endpoint.
    Round,
}

impl CapStyle {
    /// Numeric code passed to shaders.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Flat => 0,
            Self::Square => 1,
            Self::Round => 2,
        }
    }
}

/// Style parameters for stroking a map item outline.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrokeStyle {
    width: f64,
    cap: CapStyle,
    join: LineJoin,
    miter_limit: f64,
    color: [f32; 4],
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            cap: CapStyle::default(),
            join: LineJoin::default(),
            miter_limit: DEFAULT_MITER_LIMIT,
            color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl StrokeStyle {
    /// Creates a new stroke style with `width` in screen pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if `width` is not positive and finite.
    pub fn new(width: f64) -> Result<Self> {
        if !width.is_finite() || width <= 0.0 {
            return Err(TessellationError::InvalidParameters(format!(
                "stroke width must be positive, got {width}"
            ))
            .into());
        }
        Ok(Self {
            width,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_cap(mut self, cap: CapStyle) -> Self {
        self.cap = cap;
        self
    }

    #[must_use]
    pub fn with_join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }

    /// Sets the miter limit.
    ///
    /// # Errors
    ///
    /// Returns an error if `limit` is below 1 or not finite.
    pub fn with_miter_limit(mut self, limit: f64) -> Result<Self> {
        if !limit.is_finite() || limit < 1.0 {
            return Err(TessellationError::InvalidParameters(format!(
                "miter limit must be at least 1, got {limit}"
            ))
            .into());
        }
        self.miter_limit = limit;
        Ok(self)
    }

    /// Sets the RGBA color, components in `[0, 1]`.
    #[must_use]
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    /// Returns the stroke width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Returns half the stroke width.
    #[must_use]
    pub fn half_width(&self) -> f64 {
        self.width * 0.5
    }

    #[must_use]
    pub fn cap(&self) -> CapStyle {
        self.cap
    }

    #[must_use]
    pub fn line_join(&self) -> LineJoin {
        self.join
    }

    #[must_use]
    pub fn miter_limit(&self) -> f64 {
        self.miter_limit
    }

    #[must_use]
    pub fn color(&self) -> [f32; 4] {
        self.color
    }
}
