use crate::criteria::ei::expected_improvement;
use crate::criteria::AcquisitionFunction;
use crate::errors::{Result, SmboError};
use crate::surrogates::SurrogateModel;

use ndarray::{Array1, ArrayView2, Zip};

/// Transfer acquisition function.
///
/// Weighted sum of the target expected improvement and of the predicted
/// improvements of each source model over its own incumbent:
/// `w_T * EI_T(x) + sum_i w_i * max(0, eta_i - mu_i(x))`.
/// It requires an ensemble surrogate.
#[derive(Clone, Debug)]
pub struct TransferAcquisition {
    eta: f64,
    num_data: usize,
}

impl Default for TransferAcquisition {
    fn default() -> Self {
        TransferAcquisition {
            eta: f64::INFINITY,
            num_data: 0,
        }
    }
}

impl TransferAcquisition {
    /// Current incumbent value in target scale
    pub fn eta(&self) -> f64 {
        self.eta
    }
}

fn not_an_ensemble(model: &dyn SurrogateModel) -> SmboError {
    SmboError::InvalidConfigError(format!(
        "Transfer acquisition requires an ensemble surrogate, got {}",
        model.name()
    ))
}

impl AcquisitionFunction for TransferAcquisition {
    fn name(&self) -> &'static str {
        "TAF"
    }

    fn update(&mut self, model: &dyn SurrogateModel, eta: f64, num_data: usize) -> Result<()> {
        if model.ensemble().is_none() {
            return Err(not_an_ensemble(model));
        }
        self.eta = eta;
        self.num_data = num_data;
        Ok(())
    }

    fn values(&self, model: &dyn SurrogateModel, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
        let view = model.ensemble().ok_or_else(|| not_an_ensemble(model))?;
        let eta = (self.eta - view.target_mean) / view.target_std;

        let (mu, var) = view.target.predict_valvar(x)?;
        let w_target = view.target_weight();
        let mut values =
            Zip::from(&mu)
                .and(&var)
                .map_collect(|m, v| w_target * expected_improvement(eta, *m, *v));

        for ((src, eta_src), w) in view
            .sources
            .iter()
            .zip(view.source_etas)
            .zip(view.weights)
        {
            if *w <= 0. {
                continue;
            }
            let (mu_src, _) = src.predict_valvar(x)?;
            Zip::from(&mut values)
                .and(&mu_src)
                .for_each(|v, m| *v += w * (eta_src - m).max(0.));
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surrogates::{GpSurrogate, Rgpe, SourceData};
    use crate::types::SurrogateKind;
    use ndarray::array;

    #[test]
    fn test_taf_requires_ensemble() {
        let model = GpSurrogate::new(SurrogateKind::Gp, 0);
        let mut taf = TransferAcquisition::default();
        assert!(matches!(
            taf.update(&model, 0., 1),
            Err(SmboError::InvalidConfigError(_))
        ));
    }

    #[test]
    fn test_taf_scores_promising_region() {
        let x = array![[0.0], [0.2], [0.4], [0.6], [0.8], [1.0]];
        let source = SourceData {
            x: x.clone(),
            y: x.column(0).mapv(|v| (v - 0.8).powi(2)),
        };
        let mut rgpe = Rgpe::new(SurrogateKind::Gp, &[source], 50, 0).unwrap();
        let xt = array![[0.1], [0.5]];
        let yt = array![0.5, 0.1];
        rgpe.train(&xt.view(), &yt.view()).unwrap();

        let mut taf = TransferAcquisition::default();
        taf.update(&rgpe, 0.1, 2).unwrap();
        let values = taf.values(&rgpe, &array![[0.8], [0.05]].view()).unwrap();
        assert!(values.iter().all(|v| *v >= 0.));
        assert!(values[0] > values[1]);
    }
}
