//! Acquisition maximization over the finite candidate pool.
use crate::criteria::AcquisitionFunction;
use crate::errors::Result;
use crate::pool::CandidatePool;
use crate::surrogates::SurrogateModel;

use log::debug;
use ndarray::{s, Axis};
use std::cmp::Ordering;
use std::time::Instant;

/// Default number of candidates scored at once
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Exhaustive acquisition optimizer for offline replay.
///
/// As the candidate universe is the closed pool, maximization amounts to
/// scoring every unselected candidate and sorting by decreasing score,
/// ties being kept in pool order.
#[derive(Clone, Debug)]
pub struct OfflineSearch {
    chunk_size: usize,
}

impl Default for OfflineSearch {
    fn default() -> Self {
        OfflineSearch {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl OfflineSearch {
    /// Set the number of candidates scored in one acquisition call
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Pool indices of at most `num_points` unselected candidates (`selected[i] == false`)
    /// with their scores, ranked by decreasing acquisition value.
    /// An empty result means every candidate has already been selected.
    pub fn maximize(
        &self,
        acquisition: &dyn AcquisitionFunction,
        model: &dyn SurrogateModel,
        pool: &CandidatePool,
        selected: &[bool],
        num_points: usize,
    ) -> Result<Vec<(usize, f64)>> {
        let now = Instant::now();
        let candidates: Vec<usize> = (0..pool.len())
            .filter(|&i| !selected.get(i).copied().unwrap_or(false))
            .collect();
        if candidates.is_empty() {
            return Ok(vec![]);
        }

        let x = pool.x().select(Axis(0), &candidates);
        let mut scores = Vec::with_capacity(candidates.len());
        let mut start = 0;
        while start < candidates.len() {
            let end = (start + self.chunk_size).min(candidates.len());
            let values = acquisition.values(model, &x.slice(s![start..end, ..]))?;
            scores.extend(values.iter().map(|v| if v.is_nan() { f64::NEG_INFINITY } else { *v }));
            start = end;
        }

        let mut ranked: Vec<(usize, f64)> = candidates.into_iter().zip(scores).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked.truncate(num_points);
        debug!(
            "{} acquisition optimization over {} candidates took {:.3}s",
            acquisition.name(),
            x.nrows(),
            now.elapsed().as_secs_f64()
        );
        Ok(ranked)
    }
}
