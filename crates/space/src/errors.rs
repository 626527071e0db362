use thiserror::Error;

/// A result type for configuration space handling
pub type Result<T> = std::result::Result<T, SpaceError>;

/// An error when defining a configuration space or building configurations
#[derive(Error, Debug)]
pub enum SpaceError {
    /// When a hyperparameter definition is inconsistent
    #[error("Invalid hyperparameter {name}: {reason}")]
    InvalidHyperparameter {
        /// Name of the faulty hyperparameter
        name: String,
        /// Explanation
        reason: String,
    },
    /// When a value lies outside of its hyperparameter domain
    #[error("Value error: {0}")]
    InvalidValue(String),
    /// When the number of values does not match the space dimension
    #[error("Dimension error: expected {expected} values, got {actual}")]
    DimensionError {
        /// Space dimension
        expected: usize,
        /// Given number of values
        actual: usize,
    },
    /// When json (de)serialization fails
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}
