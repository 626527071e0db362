//! Surrogate models consumed by the optimization loop.
//!
//! The loop only relies on the [SurrogateModel] trait. Transfer ensembles
//! additionally expose an [EnsembleView] used by the transfer-aware acquisition.
mod ensemble;
mod gp;
mod random;
mod rgpe;

pub use ensemble::SourceEnsemble;
pub use gp::GpSurrogate;
pub use random::RandomSurrogate;
pub use rgpe::{Rgpe, RGPE_N_BOOTSTRAP};

use crate::errors::Result;
use crate::pool::CandidatePool;
use crate::types::is_failed_perf;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// A regression model predicting performances from encoded configurations
pub trait SurrogateModel {
    /// Short name of the model
    fn name(&self) -> &'static str;

    /// Fit the model on encoded configurations `x` (n, dim) and performances `y` (n,).
    /// An empty training set (n == 0) resets the model to its prior.
    fn train(&mut self, x: &ArrayView2<f64>, y: &ArrayView1<f64>) -> Result<()>;

    /// Predicted means and variances at encoded configurations `x` (n, dim)
    fn predict_valvar(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)>;

    /// Ensemble structure, if the model is a weighted combination of source and target models
    fn ensemble(&self) -> Option<EnsembleView<'_>> {
        None
    }
}

impl<M: SurrogateModel + ?Sized> SurrogateModel for Box<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn train(&mut self, x: &ArrayView2<f64>, y: &ArrayView1<f64>) -> Result<()> {
        (**self).train(x, y)
    }

    fn predict_valvar(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        (**self).predict_valvar(x)
    }

    fn ensemble(&self) -> Option<EnsembleView<'_>> {
        (**self).ensemble()
    }
}

/// Borrowed view on a source/target ensemble.
///
/// Member models work on standardized performances: sources on their own
/// standardized scale, the target on `(y - target_mean) / target_std`.
#[derive(Debug, Clone, Copy)]
pub struct EnsembleView<'a> {
    /// Source task models
    pub sources: &'a [GpSurrogate],
    /// Standardized incumbent value of each source task
    pub source_etas: &'a [f64],
    /// Target task model
    pub target: &'a GpSurrogate,
    /// Weights of sources followed by the target weight
    pub weights: &'a [f64],
    /// Mean used to standardize target performances
    pub target_mean: f64,
    /// Standard deviation used to standardize target performances
    pub target_std: f64,
}

impl EnsembleView<'_> {
    /// Weight of the target model
    pub fn target_weight(&self) -> f64 {
        self.weights.last().copied().unwrap_or(1.)
    }
}

/// Training data of a source task
#[derive(Debug, Clone)]
pub struct SourceData {
    /// Encoded configurations (n, dim)
    pub x: Array2<f64>,
    /// Performances (n,)
    pub y: Array1<f64>,
}

impl SourceData {
    /// Non failed records among the first `max_records` records of a pool
    pub fn from_pool(pool: &CandidatePool, max_records: usize) -> Self {
        let n = max_records.min(pool.len());
        let idx: Vec<usize> = (0..n).filter(|&i| !is_failed_perf(pool.perf(i))).collect();
        SourceData {
            x: pool.x().select(Axis(0), &idx),
            y: pool.perfs().select(Axis(0), &idx),
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Whether there is no record
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FAILED_PERF;
    use tlbo_space::{ConfigurationSpace, Hyperparameter};

    #[test]
    fn test_source_data_from_pool() {
        let space =
            ConfigurationSpace::new(vec![Hyperparameter::float("x", 0., 1., 0.5)]).unwrap();
        let configs: Vec<_> = [0.1, 0.2, 0.3, 0.4]
            .iter()
            .map(|v| space.configuration(&[*v]).unwrap())
            .collect();
        let pool = CandidatePool::new(&space, configs, vec![1., FAILED_PERF, 3., 4.]).unwrap();
        let data = SourceData::from_pool(&pool, 3);
        assert_eq!(data.len(), 2);
        assert_eq!(data.y, ndarray::array![1., 3.]);
        assert_eq!(data.x.dim(), (2, 1));
    }
}
