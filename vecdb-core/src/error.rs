use thiserror::Error;

/// Failures surfaced by index construction, training, insertion and search.
///
/// Every variant is raised before any state is mutated, so a failed call
/// leaves the index exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Dimension mismatch: index expects {expected} components, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Index must be trained before vectors can be added")]
    NotTrained,
    #[error("Index is already trained")]
    AlreadyTrained,
    #[error("Insufficient training data: need at least {required} vectors, got {provided}")]
    InsufficientTrainingData { required: usize, provided: usize },
    #[error("Invalid k: {0} (must be a positive integer)")]
    InvalidK(usize),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Capacity exceeded: index holds at most {limit} vectors")]
    CapacityExceeded { limit: usize },
}

pub type Result<T> = std::result::Result<T, IndexError>;
