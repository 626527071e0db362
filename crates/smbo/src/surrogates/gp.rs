use crate::errors::Result;
use crate::surrogates::SurrogateModel;
use crate::types::SurrogateKind;

use linfa::prelude::{Dataset, Fit};
use linfa::ParamGuard;
use log::warn;
use ndarray::{Array1, ArrayView1, ArrayView2};
use tlbo_gp::correlation_models::{CorrelationModel, Matern52Corr, SquaredExponentialCorr};
use tlbo_gp::{GaussianProcess, ThetaTuning};

const GP_NUGGET: f64 = 1e-6;
const GP_RETRY_NUGGET: f64 = 1e-3;
const GP_N_START: usize = 5;

#[derive(Debug, Clone)]
enum GpModel {
    SquaredExponential(GaussianProcess<f64, SquaredExponentialCorr>),
    Matern52(GaussianProcess<f64, Matern52Corr>),
}

/// Kriging surrogate fitted on target data only.
///
/// Before any training (or after training on an empty set) it predicts
/// a null mean with unit variance.
#[derive(Debug, Clone)]
pub struct GpSurrogate {
    kind: SurrogateKind,
    seed: u64,
    model: Option<GpModel>,
}

impl GpSurrogate {
    /// An untrained surrogate of the given kind, `seed` drives hyperparameters multistart
    pub fn new(kind: SurrogateKind, seed: u64) -> Self {
        GpSurrogate {
            kind,
            seed,
            model: None,
        }
    }

    /// Surrogate kind
    pub fn kind(&self) -> SurrogateKind {
        self.kind
    }

    /// Whether a GP has been fitted
    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    /// Fitted correlation parameters
    pub fn theta(&self) -> Option<&Array1<f64>> {
        match &self.model {
            Some(GpModel::SquaredExponential(gp)) => Some(gp.theta()),
            Some(GpModel::Matern52(gp)) => Some(gp.theta()),
            None => None,
        }
    }

    /// A surrogate of the same kind fitted with fixed correlation parameters
    pub fn fit_fixed(
        &self,
        x: &ArrayView2<f64>,
        y: &ArrayView1<f64>,
        theta: &Array1<f64>,
    ) -> Result<GpSurrogate> {
        let mut gp = GpSurrogate::new(self.kind, self.seed);
        if !y.is_empty() {
            gp.model = Some(fit_model(self.kind, x, y, self.seed, Some(theta))?);
        }
        Ok(gp)
    }
}

fn fit_model(
    kind: SurrogateKind,
    x: &ArrayView2<f64>,
    y: &ArrayView1<f64>,
    seed: u64,
    theta: Option<&Array1<f64>>,
) -> Result<GpModel> {
    Ok(match kind {
        SurrogateKind::Gp => {
            GpModel::SquaredExponential(fit_gp(SquaredExponentialCorr(), x, y, seed, theta)?)
        }
        SurrogateKind::GpMatern52 => GpModel::Matern52(fit_gp(Matern52Corr(), x, y, seed, theta)?),
    })
}

fn fit_gp<Corr: CorrelationModel<f64>>(
    corr: Corr,
    x: &ArrayView2<f64>,
    y: &ArrayView1<f64>,
    seed: u64,
    theta: Option<&Array1<f64>>,
) -> Result<GaussianProcess<f64, Corr>> {
    let dataset = Dataset::new(x.to_owned(), y.to_owned());
    let mut params = GaussianProcess::<f64, Corr>::params(corr)
        .n_start(GP_N_START)
        .nugget(GP_NUGGET)
        .seed(seed);
    if let Some(theta) = theta {
        params = params.theta_tuning(ThetaTuning::Fixed(theta.to_owned()));
    }
    match params.clone().check()?.fit(&dataset) {
        Ok(gp) => Ok(gp),
        Err(err) => {
            warn!("GP training failed ({err}), retry with nugget {GP_RETRY_NUGGET}");
            Ok(params.nugget(GP_RETRY_NUGGET).check()?.fit(&dataset)?)
        }
    }
}

impl SurrogateModel for GpSurrogate {
    fn name(&self) -> &'static str {
        "notl"
    }

    fn train(&mut self, x: &ArrayView2<f64>, y: &ArrayView1<f64>) -> Result<()> {
        self.model = if y.is_empty() {
            None
        } else {
            Some(fit_model(self.kind, x, y, self.seed, None)?)
        };
        Ok(())
    }

    fn predict_valvar(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        Ok(match &self.model {
            Some(GpModel::SquaredExponential(gp)) => gp.predict_valvar(x)?,
            Some(GpModel::Matern52(gp)) => gp.predict_valvar(x)?,
            None => (Array1::zeros(x.nrows()), Array1::ones(x.nrows())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, s};

    #[test]
    fn test_untrained_prior() {
        let gp = GpSurrogate::new(SurrogateKind::Gp, 0);
        let (mu, var) = gp.predict_valvar(&array![[0.1], [0.7]].view()).unwrap();
        assert_eq!(mu, array![0., 0.]);
        assert_eq!(var, array![1., 1.]);
        assert!(gp.theta().is_none());
    }

    #[test]
    fn test_gp_surrogate_interpolates() {
        for kind in [SurrogateKind::Gp, SurrogateKind::GpMatern52] {
            let mut gp = GpSurrogate::new(kind, 42);
            let x = array![[0.0], [0.25], [0.5], [0.75], [1.0]];
            let y = array![1.0, 0.3, 0.1, 0.4, 0.9];
            gp.train(&x.view(), &y.view()).unwrap();
            assert!(gp.is_trained());
            let (mu, var) = gp.predict_valvar(&x.view()).unwrap();
            assert_abs_diff_eq!(mu, y, epsilon = 1e-2);
            assert!(var.iter().all(|v| *v >= 0.));

            gp.train(&x.slice(s![..0, ..]), &y.slice(s![..0]))
                .unwrap();
            assert!(!gp.is_trained());
        }
    }

    #[test]
    fn test_fit_fixed_keeps_theta() {
        let mut gp = GpSurrogate::new(SurrogateKind::Gp, 42);
        let x = array![[0.0, 0.1], [0.3, 0.5], [0.6, 0.2], [0.9, 0.9]];
        let y = array![0.5, 0.1, 0.3, 0.8];
        gp.train(&x.view(), &y.view()).unwrap();
        let theta = gp.theta().unwrap().to_owned();
        let loo = gp
            .fit_fixed(&x.slice(s![1.., ..]), &y.slice(s![1..]), &theta)
            .unwrap();
        assert_eq!(loo.theta(), Some(&theta));
    }
}
