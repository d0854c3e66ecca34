use thiserror::Error;

/// Error types for the k-medoids search
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusteringError {
    /// The distance-matrix document is not valid JSON or violates its schema
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Cluster count or size parameters are non-positive or inverted
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The bounded worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl ClusteringError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ClusteringError::MalformedInput(_) => "MalformedInput",
            ClusteringError::InvalidParameter(_) => "InvalidParameter",
            ClusteringError::ThreadPool(_) => "ThreadPool",
        }
    }
}
