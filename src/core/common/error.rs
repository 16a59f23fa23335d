use std::fmt;

/// Every failure surfaced by the neighbor search engines, trees and models.
#[derive(Debug)]
pub enum KnnError {
    /// A search or accessor ran before any reference set was trained.
    ModelNotInitialized(String),
    /// A caller-supplied argument was rejected at the boundary.
    InvalidParameter { message: String },
    /// Query and reference points disagree on dimensionality.
    DimensionMismatch { expected: usize, found: usize },
    /// A tree-type discriminant that maps to no concrete engine.
    UnsupportedTreeType(String),
    /// A persisted record describes a different engine than the one being restored.
    SerializationTypeMismatch { expected: String, found: String },
    /// Tree construction failed.
    Build(String),
    Configuration(String),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for KnnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelNotInitialized(s) => write!(f, "Model not initialized: {}", s),
            Self::InvalidParameter { message } => write!(f, "Invalid parameter: {}", message),
            Self::DimensionMismatch { expected, found } => {
                write!(f, "Dimension mismatch: expected {}, found {}", expected, found)
            }
            Self::UnsupportedTreeType(s) => write!(f, "Unsupported tree type: {}", s),
            Self::SerializationTypeMismatch { expected, found } => write!(
                f,
                "Serialization type mismatch: expected '{}', found '{}'",
                expected, found
            ),
            Self::Build(s) => write!(f, "Tree build error: {}", s),
            Self::Configuration(s) => write!(f, "Configuration error: {}", s),
            Self::Io(e) => write!(f, "IO Error: {}", e),
            Self::Json(e) => write!(f, "JSON Serialization/Deserialization Error: {}", e),
        }
    }
}

impl std::error::Error for KnnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KnnError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for KnnError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl KnnError {
    /// Shorthand for an `InvalidParameter` error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter { message: message.into() }
    }

    /// Shorthand for the error every untrained accessor returns.
    #[must_use]
    pub fn not_initialized(what: &str) -> Self {
        Self::ModelNotInitialized(format!("no neighbor search model initialized ({what})"))
    }
}
