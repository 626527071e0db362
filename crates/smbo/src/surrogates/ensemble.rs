use crate::errors::{Result, SmboError};
use crate::surrogates::{GpSurrogate, SourceData, SurrogateModel};
use crate::types::SurrogateKind;
use crate::utils::mean_std;

use ndarray::{s, Array1, ArrayView1, ArrayView2};
use rayon::prelude::*;

/// Equally weighted average of source task GPs.
///
/// Only used to rank candidates before any target observation, training is a no-op.
#[derive(Debug, Clone)]
pub struct SourceEnsemble {
    sources: Vec<GpSurrogate>,
}

impl SourceEnsemble {
    /// Fit one GP per source (in parallel) on standardized performances of
    /// at most `num_src_hpo_trial` records
    pub fn new(
        kind: SurrogateKind,
        sources: &[SourceData],
        num_src_hpo_trial: usize,
        seed: u64,
    ) -> Result<Self> {
        if sources.is_empty() {
            return Err(SmboError::InvalidConfigError(
                "Source ensemble requires at least one source task".to_string(),
            ));
        }
        let sources = sources
            .par_iter()
            .enumerate()
            .map(|(i, src)| {
                let n = num_src_hpo_trial.min(src.len());
                let y = src.y.slice(s![..n]);
                let (mean, std) = mean_std(&y);
                let mut gp = GpSurrogate::new(kind, seed.wrapping_add(i as u64));
                gp.train(&src.x.slice(s![..n, ..]), &y.mapv(|v| (v - mean) / std).view())?;
                Ok(gp)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SourceEnsemble { sources })
    }

    /// Number of source models
    pub fn n_sources(&self) -> usize {
        self.sources.len()
    }
}

impl SurrogateModel for SourceEnsemble {
    fn name(&self) -> &'static str {
        "es"
    }

    fn train(&mut self, _x: &ArrayView2<f64>, _y: &ArrayView1<f64>) -> Result<()> {
        Ok(())
    }

    fn predict_valvar(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        let w = 1. / self.sources.len() as f64;
        let mut mean = Array1::<f64>::zeros(x.nrows());
        let mut var = Array1::<f64>::zeros(x.nrows());
        for model in &self.sources {
            let (mu, sigma2) = model.predict_valvar(x)?;
            mean.scaled_add(w, &mu);
            var.scaled_add(w * w, &sigma2);
        }
        Ok((mean, var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_source_ensemble_ranks_like_sources() {
        let x = array![[0.0], [0.2], [0.4], [0.6], [0.8], [1.0]];
        let sources = vec![
            SourceData {
                x: x.clone(),
                y: x.column(0).mapv(|v| (v - 0.4).powi(2)),
            },
            SourceData {
                x: x.clone(),
                y: x.column(0).mapv(|v| 10. * (v - 0.4).powi(2) + 3.),
            },
        ];
        let es = SourceEnsemble::new(SurrogateKind::Gp, &sources, 50, 0).unwrap();
        assert_eq!(es.n_sources(), 2);
        let (mu, _) = es.predict_valvar(&array![[0.4], [1.0]].view()).unwrap();
        assert!(mu[0] < mu[1]);
    }
}
