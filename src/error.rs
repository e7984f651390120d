use thiserror::Error;

/// Errors raised while building, slicing or resolving a physical cube.
#[derive(Debug, Error)]
pub enum CubeError {
    /// The effective or reduced dimensionality is outside what the resolver handles.
    #[error("unsupported dimensionality {found}: {context}")]
    UnsupportedDimensionality { found: usize, context: &'static str },

    /// Neither header key convention supplies a required field.
    #[error("missing header field `{0}`")]
    MissingHeaderField(String),

    /// A header field is present but its value cannot describe an axis.
    #[error("invalid header field {0}")]
    InvalidHeaderField(String),

    /// A slice ledger does not fit the coordinate system it is applied to.
    #[error("invalid slice ledger: {0}")]
    InvalidSliceLedger(String),

    /// A coordinate sub-selection is out of bounds or has too many entries.
    #[error("invalid axis selection: {0}")]
    InvalidSelection(String),

    /// A two-dimensional coordinate system whose pixel axes are not the sky axes.
    #[error("retained pixel axes are not the helioprojective longitude/latitude pair")]
    NonCelestialAxes,

    #[error("projection undefined: {0}")]
    Projection(&'static str),

    /// The array container has no array under this key.
    #[error("array `{0}` not found in container")]
    MissingArray(String),

    /// A container key that does not name a location inside the container.
    #[error("invalid container key `{0}`")]
    InvalidKey(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, CubeError>;
