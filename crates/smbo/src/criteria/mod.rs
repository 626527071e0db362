//! Acquisition functions used to score candidate configurations
mod ei;
mod taf;

pub use ei::ExpectedImprovement;
pub use taf::TransferAcquisition;

use crate::errors::Result;
use crate::surrogates::SurrogateModel;
use crate::types::AcquisitionKind;

use ndarray::{Array1, ArrayView2};

/// A scoring function over encoded candidates, higher is more promising.
///
/// Before scoring, the function is updated with the current model state,
/// the incumbent value `eta` and the number of observations.
pub trait AcquisitionFunction {
    /// Name of the acquisition function
    fn name(&self) -> &'static str;

    /// Update internal state from the freshly trained `model`
    fn update(&mut self, model: &dyn SurrogateModel, eta: f64, num_data: usize) -> Result<()>;

    /// Scores of encoded candidates `x` (n, dim)
    fn values(&self, model: &dyn SurrogateModel, x: &ArrayView2<f64>) -> Result<Array1<f64>>;
}

/// Acquisition functions available to the optimization loop
#[derive(Clone, Debug)]
pub enum Acquisition {
    /// Expected Improvement
    Ei(ExpectedImprovement),
    /// Transfer acquisition function
    Taf(TransferAcquisition),
}

impl Acquisition {
    /// Acquisition function of the given kind
    pub fn new(kind: AcquisitionKind) -> Self {
        match kind {
            AcquisitionKind::Ei => Acquisition::Ei(ExpectedImprovement::default()),
            AcquisitionKind::Taf => Acquisition::Taf(TransferAcquisition::default()),
        }
    }

    /// Kind of this acquisition function
    pub fn kind(&self) -> AcquisitionKind {
        match self {
            Acquisition::Ei(_) => AcquisitionKind::Ei,
            Acquisition::Taf(_) => AcquisitionKind::Taf,
        }
    }

    fn inner(&self) -> &dyn AcquisitionFunction {
        match self {
            Acquisition::Ei(acq) => acq,
            Acquisition::Taf(acq) => acq,
        }
    }
}

impl AcquisitionFunction for Acquisition {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn update(&mut self, model: &dyn SurrogateModel, eta: f64, num_data: usize) -> Result<()> {
        match self {
            Acquisition::Ei(acq) => acq.update(model, eta, num_data),
            Acquisition::Taf(acq) => acq.update(model, eta, num_data),
        }
    }

    fn values(&self, model: &dyn SurrogateModel, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
        self.inner().values(model, x)
    }
}
