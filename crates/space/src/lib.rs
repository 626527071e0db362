//! This library defines hyperparameter configuration spaces.
//!
//! A [`ConfigurationSpace`] is an ordered list of [`Hyperparameter`] domains
//! (float, integer, categorical, ordinal). It builds and validates
//! [`Configuration`]s, draws them at random and encodes them as numeric
//! feature vectors suitable for surrogate models.
//!
//! ```
//! use tlbo_space::{ConfigurationSpace, Hyperparameter};
//!
//! let space = ConfigurationSpace::new(vec![
//!     Hyperparameter::float("learning_rate", 1e-4, 1., 1e-2).log_scale(),
//!     Hyperparameter::int("max_depth", 1, 12, 6),
//!     Hyperparameter::categorical("booster", &["gbtree", "dart"], 0),
//! ])
//! .expect("valid space");
//!
//! let config = space.configuration(&[1e-2, 4., 1.]).expect("valid configuration");
//! let x = space.to_vector(&config);
//! assert_eq!(x.len(), 3);
//! ```
mod configuration;
mod errors;
mod hyperparameter;
mod space;

pub use configuration::*;
pub use errors::*;
pub use hyperparameter::*;
pub use space::*;
