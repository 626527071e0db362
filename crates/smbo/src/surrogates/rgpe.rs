use crate::errors::{Result, SmboError};
use crate::surrogates::{EnsembleView, GpSurrogate, SourceData, SurrogateModel};
use crate::types::SurrogateKind;
use crate::utils::mean_std;

use log::{debug, warn};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_stats::{interpolate::Linear, QuantileExt};
use noisy_float::types::n64;
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;
use std::time::Instant;

/// Default number of bootstrap samples used to estimate model weights
pub const RGPE_N_BOOTSTRAP: usize = 100;

/// Ranking-weighted Gaussian process ensemble.
///
/// One GP per source task is fitted once at construction on standardized
/// source performances. Each training refits the target GP and weights every
/// member by how often it attains the smallest pairwise ranking loss on
/// bootstrap samples of the target observations, target loss being computed
/// from leave-one-out models.
#[derive(Debug, Clone)]
pub struct Rgpe {
    sources: Vec<GpSurrogate>,
    source_etas: Vec<f64>,
    target: GpSurrogate,
    weights: Vec<f64>,
    weight_history: Vec<Vec<f64>>,
    target_mean: f64,
    target_std: f64,
    n_bootstrap: usize,
    rng: Xoshiro256Plus,
}

impl Rgpe {
    /// Fit source models (in parallel) on at most `num_src_hpo_trial` records of each source
    pub fn new(
        kind: SurrogateKind,
        sources: &[SourceData],
        num_src_hpo_trial: usize,
        seed: u64,
    ) -> Result<Self> {
        if sources.is_empty() {
            return Err(SmboError::InvalidConfigError(
                "RGPE requires at least one source task".to_string(),
            ));
        }
        let now = Instant::now();
        let fitted: Vec<(GpSurrogate, f64)> = sources
            .par_iter()
            .enumerate()
            .map(|(i, src)| {
                let n = num_src_hpo_trial.min(src.len());
                let x = src.x.slice(s![..n, ..]);
                let y = src.y.slice(s![..n]);
                let (mean, std) = mean_std(&y);
                let y_std = y.mapv(|v| (v - mean) / std);
                let mut gp = GpSurrogate::new(kind, seed.wrapping_add(i as u64));
                if n == 0 {
                    warn!("Source task {i} has no successful record");
                }
                gp.train(&x, &y_std.view())?;
                let eta = y_std.iter().copied().fold(f64::INFINITY, f64::min);
                Ok((gp, if eta.is_finite() { eta } else { 0. }))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "Training {} source models took {:.3}s",
            fitted.len(),
            now.elapsed().as_secs_f64()
        );
        let (sources, source_etas): (Vec<_>, Vec<_>) = fitted.into_iter().unzip();
        let n_models = sources.len() + 1;
        Ok(Rgpe {
            sources,
            source_etas,
            target: GpSurrogate::new(kind, seed),
            weights: vec![1. / n_models as f64; n_models],
            weight_history: vec![],
            target_mean: 0.,
            target_std: 1.,
            n_bootstrap: RGPE_N_BOOTSTRAP,
            rng: Xoshiro256Plus::seed_from_u64(seed),
        })
    }

    /// Set the number of bootstrap samples
    pub fn n_bootstrap(mut self, n_bootstrap: usize) -> Self {
        self.n_bootstrap = n_bootstrap.max(1);
        self
    }

    /// Current weights, sources first and target last
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Weights computed at each training
    pub fn weight_history(&self) -> &[Vec<f64>] {
        &self.weight_history
    }

    /// Ranking-loss indicator matrix `m[j, k] = (pred[j] < pred[k]) xor (y[j] < y[k])`
    fn ranking_mismatches(preds: &ArrayView1<f64>, y: &ArrayView1<f64>) -> Array2<bool> {
        let n = y.len();
        Array2::from_shape_fn((n, n), |(j, k)| (preds[j] < preds[k]) ^ (y[j] < y[k]))
    }

    /// Target mismatches from leave-one-out models: row j compares the
    /// prediction of the model fitted without point j at x_j and x_k.
    fn target_mismatches(&self, x: &ArrayView2<f64>, y: &ArrayView1<f64>) -> Result<Array2<bool>> {
        let n = y.len();
        let theta = match self.target.theta() {
            Some(theta) => theta.to_owned(),
            None => return Ok(Array2::from_elem((n, n), false)),
        };
        let rows = (0..n)
            .into_par_iter()
            .map(|j| {
                let idx: Vec<usize> = (0..n).filter(|&i| i != j).collect();
                let loo = self.target.fit_fixed(
                    &x.select(Axis(0), &idx).view(),
                    &y.select(Axis(0), &idx).view(),
                    &theta,
                )?;
                let (preds, _) = loo.predict_valvar(x)?;
                Ok(Array1::from_shape_fn(n, |k| {
                    (preds[j] < preds[k]) ^ (y[j] < y[k])
                }))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut mismatches = Array2::from_elem((n, n), false);
        for (j, row) in rows.iter().enumerate() {
            mismatches.row_mut(j).assign(row);
        }
        Ok(mismatches)
    }

    fn compute_weights(&mut self, x: &ArrayView2<f64>, y: &ArrayView1<f64>) -> Result<Vec<f64>> {
        let n = y.len();
        let n_models = self.sources.len() + 1;
        let mut mismatches = self
            .sources
            .par_iter()
            .map(|src| {
                let (preds, _) = src.predict_valvar(x)?;
                Ok(Self::ranking_mismatches(&preds.view(), y))
            })
            .collect::<Result<Vec<_>>>()?;
        mismatches.push(self.target_mismatches(x, y)?);

        // losses[b][m]: ranking loss of model m on bootstrap sample b
        let mut losses = Array2::<f64>::zeros((self.n_bootstrap, n_models));
        for mut row in losses.rows_mut() {
            let sample: Vec<usize> = (0..n).map(|_| self.rng.gen_range(0..n)).collect();
            for (m, mism) in mismatches.iter().enumerate() {
                let mut loss = 0usize;
                for &j in &sample {
                    for &k in &sample {
                        if mism[[j, k]] {
                            loss += 1;
                        }
                    }
                }
                row[m] = loss as f64;
            }
        }

        discard_unreliable_sources(&mut losses)?;

        let mut counts = vec![0usize; n_models];
        for row in losses.rows() {
            let best = row.iter().copied().fold(f64::INFINITY, f64::min);
            let winners: Vec<usize> = (0..n_models).filter(|&m| row[m] == best).collect();
            let winner = winners[self.rng.gen_range(0..winners.len())];
            counts[winner] += 1;
        }
        Ok(counts
            .iter()
            .map(|c| *c as f64 / self.n_bootstrap as f64)
            .collect())
    }
}

/// Exclude source models (every column but the last) whose median bootstrap
/// loss exceeds the 95th percentile of the target model loss (last column)
fn discard_unreliable_sources(losses: &mut Array2<f64>) -> Result<()> {
    let n_models = losses.ncols();
    // quantiles reorder lanes in place, bootstrap rows must stay aligned
    let threshold = losses
        .column(n_models - 1)
        .to_owned()
        .quantile_axis_skipnan_mut(Axis(0), n64(0.95), &Linear)?
        .into_scalar();
    let medians = losses
        .clone()
        .quantile_axis_skipnan_mut(Axis(0), n64(0.5), &Linear)?;
    for m in 0..n_models - 1 {
        if medians[m] > threshold {
            debug!(
                "Discard source model {m} (median loss {} > {threshold})",
                medians[m]
            );
            losses.column_mut(m).fill(f64::INFINITY);
        }
    }
    Ok(())
}

impl SurrogateModel for Rgpe {
    fn name(&self) -> &'static str {
        "rgpe"
    }

    fn train(&mut self, x: &ArrayView2<f64>, y: &ArrayView1<f64>) -> Result<()> {
        let (mean, std) = mean_std(y);
        self.target_mean = mean;
        self.target_std = std;
        let y_std = y.mapv(|v| (v - mean) / std);
        self.target.train(x, &y_std.view())?;

        let n_models = self.sources.len() + 1;
        self.weights = if y.len() < 3 {
            vec![1. / n_models as f64; n_models]
        } else {
            let now = Instant::now();
            let weights = self.compute_weights(x, &y_std.view())?;
            debug!(
                "RGPE weights {weights:?} computed in {:.3}s",
                now.elapsed().as_secs_f64()
            );
            weights
        };
        self.weight_history.push(self.weights.clone());
        Ok(())
    }

    fn predict_valvar(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        let mut mean = Array1::<f64>::zeros(x.nrows());
        let mut var = Array1::<f64>::zeros(x.nrows());
        let members = self.sources.iter().chain(std::iter::once(&self.target));
        for (model, w) in members.zip(self.weights.iter()) {
            if *w <= 0. {
                continue;
            }
            let (mu, sigma2) = model.predict_valvar(x)?;
            mean.scaled_add(*w, &mu);
            var.scaled_add(w * w, &sigma2);
        }
        let mean = mean.mapv(|v| self.target_mean + self.target_std * v);
        let var = var.mapv(|v| self.target_std * self.target_std * v);
        Ok((mean, var))
    }

    fn ensemble(&self) -> Option<EnsembleView<'_>> {
        Some(EnsembleView {
            sources: &self.sources,
            source_etas: &self.source_etas,
            target: &self.target,
            weights: &self.weights,
            target_mean: self.target_mean,
            target_std: self.target_std,
        })
    }
}
