use crate::error::{ConfigError, Result};
use crate::operations::lod::{SimplificationPool, DEFAULT_ASYNC_THRESHOLD};
use crate::tessellation::DEFAULT_ROUND_CAP_SEGMENTS;

/// Parameters of the map item geometry engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Extra screen pixels kept around the viewport when clipping.
    pub clip_margin_px: f64,
    /// Allowed simplification error in screen pixels.
    pub simplification_tolerance_px: f64,
    /// Paths with more wrapped vertices are simplified in the background.
    pub async_simplification_threshold: usize,
    /// Worker threads of the simplification pool, 0 for one per core.
    pub worker_threads: usize,
    /// Triangles per round stroke cap.
    pub round_cap_segments: usize,
    /// Disables simplification entirely when `false`.
    pub lod_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clip_margin_px: 16.0,
            simplification_tolerance_px: 1.0,
            async_simplification_threshold: DEFAULT_ASYNC_THRESHOLD,
            worker_threads: 0,
            round_cap_segments: DEFAULT_ROUND_CAP_SEGMENTS,
            lod_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Checks that every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        if !self.clip_margin_px.is_finite() || self.clip_margin_px < 0.0 {
            return Err(invalid(format!(
                "clip_margin_px must be non-negative, got {}",
                self.clip_margin_px
            )));
        }
        if !self.simplification_tolerance_px.is_finite() || self.simplification_tolerance_px < 0.0 {
            return Err(invalid(format!(
                "simplification_tolerance_px must be non-negative, got {}",
                self.simplification_tolerance_px
            )));
        }
        if self.round_cap_segments == 0 {
            return Err(invalid("round_cap_segments must be at least 1".to_owned()));
        }
        Ok(())
    }

    /// Builds the shared simplification pool described by this config.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::PoolBuild` if the threads cannot be spawned.
    pub fn build_pool(&self) -> Result<SimplificationPool> {
        SimplificationPool::new(self.worker_threads)
    }
}

fn invalid(message: String) -> crate::error::MapGeomError {
    ConfigError::Invalid(message).into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_negative_margin() {
        let config = EngineConfig {
            clip_margin_px: -1.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_tolerance_and_caps() {
        let config = EngineConfig {
            simplification_tolerance_px: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
        let config = EngineConfig {
            round_cap_segments: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builds_pool_with_requested_threads() {
        let config = EngineConfig {
            worker_threads: 2,
            ..EngineConfig::default()
        };
        assert_eq!(config.build_pool().unwrap().thread_count(), 2);
    }
}
