use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeakCallError {
    /// The run can not start with these parameters.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// Seed discovery found no high-confidence region, so no fragment shift can be estimated.
    #[error("no high-confidence regions found")]
    EmptySeedSet,
    #[error("computation failed: {0}")]
    Computation(String),
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PeakCallError>;
