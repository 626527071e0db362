//! This library implements [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) regression
//! also known as [Kriging](https://en.wikipedia.org/wiki/Kriging) models.
//!
//! Only ordinary kriging is provided (constant mean), correlation being either
//! squared exponential or matern 5/2. It is the building block of the surrogate
//! models used by the transfer-learning optimization loop.
//!
//! GP methods are implemented by [GaussianProcess] parameterized by [GpParams].
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
pub mod correlation_models;
mod errors;
mod parameters;
mod utils;

mod optimization;

pub use algorithm::*;
pub use errors::*;
pub use parameters::*;
pub use utils::DiffMatrix;
