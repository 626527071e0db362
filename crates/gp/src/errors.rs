use thiserror::Error;

/// A result type for GP fitting and prediction
pub type Result<T> = std::result::Result<T, GpError>;

/// An error raised by [`GaussianProcess`](crate::GaussianProcess) fitting or prediction
#[derive(Error, Debug)]
pub enum GpError {
    /// When training or prediction inputs are empty or have inconsistent shapes
    #[error("Invalid data: {0}")]
    InvalidDataError(String),
    /// When GP parameters (theta, bounds, nugget) are rejected
    #[error("Invalid parameters: {0}")]
    InvalidParamsError(String),
    /// When the constant trend cannot be estimated for the current theta
    #[error("Ill-conditioned correlation matrix: {0}")]
    IllConditionedError(String),
    /// When the Cholesky factorization or a triangular solve fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// Required by linfa `Fit` implementations
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
}
