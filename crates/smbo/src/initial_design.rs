//! Clustered initial design.
//!
//! Candidates are ranked by a cheap surrogate (usually a [crate::SourceEnsemble]),
//! the best ones are clustered with k-means and one representative per cluster
//! is kept, spreading the first evaluations over the predicted-good region.
use crate::errors::Result;
use crate::pool::CandidatePool;
use crate::surrogates::SurrogateModel;

use linfa::prelude::{Dataset, Fit, Predict};
use linfa_clustering::KMeans;
use log::debug;
use ndarray::Axis;
use rand_xoshiro::Xoshiro256Plus;
use std::cmp::Ordering;
use std::collections::HashSet;
use tlbo_space::Configuration;

/// Default number of best ranked candidates considered for clustering
pub const DEFAULT_INIT_TOP_K: usize = 100;

/// Pool indices sorted by increasing predicted mean of `ranker` (stable, NaN last)
pub fn rank_pool(ranker: &dyn SurrogateModel, pool: &CandidatePool) -> Result<Vec<usize>> {
    let (mu, _) = ranker.predict_valvar(&pool.x())?;
    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.sort_by(|&a, &b| match (mu[a].is_nan(), mu[b].is_nan()) {
        (false, false) => mu[a].partial_cmp(&mu[b]).unwrap_or(Ordering::Equal),
        (nan_a, nan_b) => nan_a.cmp(&nan_b),
    });
    Ok(order)
}

/// Select at most `init_num` configurations: one representative per k-means cluster
/// (k = `init_num`) among the `top_k` best ranked candidates, in ranking order.
///
/// When `top_k` candidates are not more than `init_num`, they are all returned.
pub fn clustered_initial_design(
    ranker: &dyn SurrogateModel,
    pool: &CandidatePool,
    init_num: usize,
    top_k: usize,
    rng: Xoshiro256Plus,
) -> Result<Vec<Configuration>> {
    if init_num == 0 {
        return Ok(vec![]);
    }
    let mut top = rank_pool(ranker, pool)?;
    top.truncate(top_k);
    if top.len() <= init_num {
        return Ok(top.iter().map(|&i| pool.configuration(i).clone()).collect());
    }

    let x = pool.x().select(Axis(0), &top);
    let dataset = Dataset::from(x.clone());
    let kmeans = KMeans::params_with_rng(init_num, rng).fit(&dataset)?;
    let labels = kmeans.predict(&x);

    let mut seen = HashSet::new();
    let design: Vec<Configuration> = top
        .iter()
        .zip(labels.iter())
        .filter(|(_, label)| seen.insert(**label))
        .map(|(&i, _)| pool.configuration(i).clone())
        .collect();
    debug!(
        "Initial design: {} representatives from {} clusters over top {} candidates",
        design.len(),
        init_num,
        top.len()
    );
    Ok(design)
}
