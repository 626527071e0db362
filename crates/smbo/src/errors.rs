use thiserror::Error;

/// A result type for SMBO errors
pub type Result<T> = std::result::Result<T, SmboError>;

/// An error for offline sequential model-based optimization
#[derive(Error, Debug)]
pub enum SmboError {
    /// When configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfigError(String),
    /// When the acquisition optimizer cannot propose any unselected candidate
    #[error("Candidate pool exhausted: all {0} configurations have been selected")]
    PoolExhaustedError(usize),
    /// When a candidate pool without any configuration is given
    #[error("Candidate pool is empty")]
    EmptyPoolError,
    /// When an invalid value is encountered
    #[error("Value error: {0}")]
    InvalidValue(String),
    /// When GP computation fails
    #[error("GP error")]
    GpError(#[from] tlbo_gp::GpError),
    /// When configuration space handling fails
    #[error("Configuration space error")]
    SpaceError(#[from] tlbo_space::SpaceError),
    /// When initial design clustering fails
    #[error("KMeans error")]
    KMeansError(#[from] linfa_clustering::KMeansError),
    /// When a quantile of ranking losses cannot be computed
    #[error("Quantile error")]
    QuantileError(#[from] ndarray_stats::errors::QuantileError),
    /// When IO fails
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    /// When numpy array read fails
    #[error("IO error")]
    ReadNpyError(#[from] ndarray_npy::ReadNpyError),
    /// When numpy array write fails
    #[error("IO error")]
    WriteNpyError(#[from] ndarray_npy::WriteNpyError),
    /// When json (de)serialization fails
    #[error("Json error")]
    JsonError(#[from] serde_json::Error),
}
