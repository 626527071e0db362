use crate::criteria::AcquisitionFunction;
use crate::errors::Result;
use crate::surrogates::SurrogateModel;
use crate::utils::{norm_cdf, norm_pdf};

use ndarray::{Array1, ArrayView2, Zip};

/// Expected improvement of a prediction `(mu, var)` below `eta`, 0 when variance vanishes
pub(crate) fn expected_improvement(eta: f64, mu: f64, var: f64) -> f64 {
    if var < f64::EPSILON {
        0.0
    } else {
        let sigma = var.sqrt();
        let z = (eta - mu) / sigma;
        (eta - mu) * norm_cdf(z) + sigma * norm_pdf(z)
    }
}

/// A structure for Expected Improvement implementation
#[derive(Clone, Debug)]
pub struct ExpectedImprovement {
    eta: f64,
    num_data: usize,
}

impl Default for ExpectedImprovement {
    fn default() -> Self {
        ExpectedImprovement {
            eta: f64::INFINITY,
            num_data: 0,
        }
    }
}

impl ExpectedImprovement {
    /// Current incumbent value
    pub fn eta(&self) -> f64 {
        self.eta
    }

    /// Number of observations at last update
    pub fn num_data(&self) -> usize {
        self.num_data
    }
}

impl AcquisitionFunction for ExpectedImprovement {
    fn name(&self) -> &'static str {
        "EI"
    }

    fn update(&mut self, _model: &dyn SurrogateModel, eta: f64, num_data: usize) -> Result<()> {
        self.eta = eta;
        self.num_data = num_data;
        Ok(())
    }

    /// EI values at `x` wrt the surrogate prediction and the incumbent value
    fn values(&self, model: &dyn SurrogateModel, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
        let (mu, var) = model.predict_valvar(x)?;
        Ok(Zip::from(&mu)
            .and(&var)
            .map_collect(|m, v| expected_improvement(self.eta, *m, *v)))
    }
}
