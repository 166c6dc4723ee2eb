use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Transform is not invertible: {0}")]
    NonInvertible(String),

    #[error("Dimensions are not separable: {0}")]
    NotSeparable(String),

    #[error("Point outside of domain: {0}")]
    OutOfDomain(String),

    #[error("No convergence after {iterations} iterations")]
    NonConvergent { iterations: usize },

    #[error("Derivative unavailable: {0}")]
    NoDerivative(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl TransformError {
    pub(crate) fn check_dim(expected: usize, actual: usize) -> Result<()> {
        if expected != actual {
            return Err(TransformError::DimensionMismatch { expected, actual });
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
