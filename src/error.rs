use thiserror::Error;

/// Top-level error type for the map geometry engine.
///
/// Only construction and configuration can fail. Problems found while
/// building screen geometry degrade the output instead of surfacing here.
#[derive(Debug, Error)]
pub enum MapGeomError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Tessellation(#[from] TessellationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Item(#[from] ItemError),
}

/// Errors related to geographic input.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("parameter {parameter} = {value} is out of range [{min}, {max}]")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("holes are only allowed on closed paths")]
    HolesOnOpenPath,

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),
}

/// Errors related to projector setup.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("invalid viewport: {0}")]
    InvalidViewport(String),

    #[error("zoom level {0} is not finite or negative")]
    InvalidZoom(f64),
}

/// Errors related to tessellation parameters.
#[derive(Debug, Error)]
pub enum TessellationError {
    #[error("invalid tessellation parameters: {0}")]
    InvalidParameters(String),

    #[error("tessellation failed: {0}")]
    Failed(String),
}

/// Errors related to engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors related to the background simplification workers.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to build simplification pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),
}

/// Errors related to the item store.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("map item not found")]
    NotFound,
}

/// Convenience type alias for results using [`MapGeomError`].
pub type Result<T> = std::result::Result<T, MapGeomError>;
