/// How an item turns its outline into GPU geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RenderStrategy {
    /// Thin GPU line strips; the width is a material uniform.
    LineStrip,
    /// Triangulated stroke with joins and caps.
    #[default]
    Extruded,
    /// Triangulated interior of closed outlines.
    Fill,
}

impl RenderStrategy {
    /// Whether hit testing considers the interior.
    #[must_use]
    pub fn hits_interior(self) -> bool {
        matches!(self, Self::Fill)
    }
}
