use crate::correlation_models::CorrelationModel;
use crate::errors::{GpError, Result};
use crate::{GP_COBYLA_MAX_EVAL, GP_COBYLA_MIN_EVAL, GP_OPTIM_N_START};
use linfa::{Float, ParamGuard};

use ndarray::{Array1, array};

/// An enum to represent a n-dim hyper parameter tuning
#[derive(Clone, Debug, PartialEq)]
pub enum ThetaTuning<F: Float> {
    /// Constant parameter (ie given not estimated)
    Fixed(Array1<F>),
    /// Parameter is optimized between given bounds (lower, upper) starting from the inital guess
    Full {
        /// Initial guess for the parameter
        init: Array1<F>,
        /// Bounds (lower, upper) applied to every parameter component
        bounds: (F, F),
    },
}

impl<F: Float> Default for ThetaTuning<F> {
    fn default() -> Self {
        ThetaTuning::Full {
            init: array![F::cast(ThetaTuning::<F>::DEFAULT_INIT)],
            bounds: (
                F::cast(ThetaTuning::<F>::DEFAULT_BOUNDS.0),
                F::cast(ThetaTuning::<F>::DEFAULT_BOUNDS.1),
            ),
        }
    }
}

impl<F: Float> ThetaTuning<F> {
    /// Default initial theta value
    pub const DEFAULT_INIT: f64 = 1e-1;
    /// Default bounds for theta values
    pub const DEFAULT_BOUNDS: (f64, f64) = (1e-2, 1e1);

    /// Get initial theta value
    pub fn init(&self) -> &Array1<F> {
        match self {
            ThetaTuning::Full { init, .. } => init,
            ThetaTuning::Fixed(init) => init,
        }
    }

    /// Get bounds for theta value
    pub fn bounds(&self) -> Option<(F, F)> {
        match self {
            ThetaTuning::Full { bounds, .. } => Some(*bounds),
            ThetaTuning::Fixed(_) => None,
        }
    }
}

/// A set of validated GP parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct GpValidParams<F: Float, Corr: CorrelationModel<F>> {
    /// Parameter tuning hint of the autocorrelation model
    pub(crate) theta_tuning: ThetaTuning<F>,
    /// Correlation model representing the spatial correlation between errors at e(x) and e(x')
    pub(crate) corr: Corr,
    /// Number of internal likelihood optimization restart
    pub(crate) n_start: usize,
    /// Max number of internal likelihood evaluation during optimization
    pub(crate) max_eval: usize,
    /// Parameter to improve numerical stability
    pub(crate) nugget: F,
    /// Seed of the multistart random generator
    pub(crate) seed: u64,
}

impl<F: Float, Corr: CorrelationModel<F>> Default for GpValidParams<F, Corr> {
    fn default() -> GpValidParams<F, Corr> {
        GpValidParams {
            theta_tuning: ThetaTuning::default(),
            corr: Corr::default(),
            n_start: GP_OPTIM_N_START,
            max_eval: GP_COBYLA_MAX_EVAL,
            nugget: F::cast(100.0) * F::epsilon(),
            seed: 42,
        }
    }
}

impl<F: Float, Corr: CorrelationModel<F>> GpValidParams<F, Corr> {
    /// Get correlation corr k(x, x')
    pub fn corr(&self) -> &Corr {
        &self.corr
    }

    /// Get theta tuning strategy
    pub fn theta_tuning(&self) -> &ThetaTuning<F> {
        &self.theta_tuning
    }

    /// Get the number of internal optimization restart
    pub fn n_start(&self) -> usize {
        self.n_start
    }

    /// Get the max number of internal likelihood evaluations during one optimization
    pub fn max_eval(&self) -> usize {
        self.max_eval
    }

    /// Get nugget
    pub fn nugget(&self) -> F {
        self.nugget
    }

    /// Get multistart seed
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [GP algorithm](struct.GaussianProcess.html).
pub struct GpParams<F: Float, Corr: CorrelationModel<F>>(GpValidParams<F, Corr>);

impl<F: Float, Corr: CorrelationModel<F>> GpParams<F, Corr> {
    /// A constructor for GP parameters given a correlation model
    pub fn new(corr: Corr) -> GpParams<F, Corr> {
        Self(GpValidParams {
            corr,
            ..Default::default()
        })
    }

    /// Set correlation model.
    pub fn corr(mut self, corr: Corr) -> Self {
        self.0.corr = corr;
        self
    }

    /// Set value for theta hyper parameter.
    ///
    /// When theta is optimized, the internal optimization is started from `theta_init`.
    /// When theta is fixed, this set theta constant value.
    pub fn theta_init(mut self, theta_init: Array1<F>) -> Self {
        self.0.theta_tuning = match self.0.theta_tuning {
            ThetaTuning::Full { init: _, bounds } => ThetaTuning::Full {
                init: theta_init,
                bounds,
            },
            ThetaTuning::Fixed(_) => ThetaTuning::Fixed(theta_init),
        };
        self
    }

    /// Set theta hyper parameter search space.
    ///
    /// This function is no-op when theta tuning is fixed
    pub fn theta_bounds(mut self, lower: F, upper: F) -> Self {
        if let ThetaTuning::Full { bounds, .. } = &mut self.0.theta_tuning {
            *bounds = (lower, upper);
        }
        self
    }

    /// Set theta hyper parameter tuning
    pub fn theta_tuning(mut self, theta_tuning: ThetaTuning<F>) -> Self {
        self.0.theta_tuning = theta_tuning;
        self
    }

    /// Set the number of internal GP hyperparameter theta optimization restarts
    pub fn n_start(mut self, n_start: usize) -> Self {
        self.0.n_start = n_start;
        self
    }

    /// Set the max number of internal likelihood evaluations during one optimization
    /// Given max_eval has to be greater than [crate::GP_COBYLA_MIN_EVAL] otherwise
    /// max_eval is set to [crate::GP_COBYLA_MIN_EVAL].
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.0.max_eval = GP_COBYLA_MIN_EVAL.max(max_eval);
        self
    }

    /// Set nugget.
    ///
    /// Nugget is used to improve numerical stability
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.nugget = nugget;
        self
    }

    /// Set the seed used to draw multistart points
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }
}

impl<F: Float, Corr: CorrelationModel<F>> From<GpValidParams<F, Corr>> for GpParams<F, Corr> {
    fn from(valid: GpValidParams<F, Corr>) -> Self {
        GpParams(valid)
    }
}

impl<F: Float, Corr: CorrelationModel<F>> ParamGuard for GpParams<F, Corr> {
    type Checked = GpValidParams<F, Corr>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if let Some((lower, upper)) = self.0.theta_tuning.bounds() {
            if lower <= F::zero() || lower >= upper {
                return Err(GpError::InvalidParamsError(format!(
                    "Theta bounds should satisfy 0 < lower < upper, got ({lower}, {upper})"
                )));
            }
        }
        let init = self.0.theta_tuning.init();
        if init.is_empty() || init.iter().any(|t| *t <= F::zero()) {
            return Err(GpError::InvalidParamsError(
                "Initial theta should be non empty with positive components".to_string(),
            ));
        }
        if self.0.nugget < F::zero() {
            return Err(GpError::InvalidParamsError(
                "Nugget should be positive".to_string(),
            ));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation_models::SquaredExponentialCorr;

    #[test]
    fn test_params_check() {
        let params = GpParams::<f64, _>::new(SquaredExponentialCorr());
        assert!(params.clone().check().is_ok());
        assert!(matches!(
            params.clone().theta_bounds(1., 0.1).check(),
            Err(GpError::InvalidParamsError(_))
        ));
        assert!(matches!(
            params.clone().theta_init(array![-1.]).check(),
            Err(GpError::InvalidParamsError(_))
        ));
        let valid = params.max_eval(3).check().unwrap();
        assert_eq!(valid.max_eval(), GP_COBYLA_MIN_EVAL);
    }

    #[test]
    fn test_fixed_theta_ignores_bounds() {
        let valid = GpParams::<f64, _>::new(SquaredExponentialCorr())
            .theta_tuning(ThetaTuning::Fixed(array![0.5, 2.]))
            .theta_bounds(1., 0.1)
            .check()
            .unwrap();
        assert_eq!(valid.theta_tuning().bounds(), None);
        assert_eq!(valid.theta_tuning().init(), &array![0.5, 2.]);
    }
}
