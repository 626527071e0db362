//! Closed-world lookup table standing in for configuration evaluation.
use crate::errors::{Result, SmboError};
use crate::types::is_failed_perf;

use log::warn;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_stats::QuantileExt;
use std::collections::HashMap;
use tlbo_space::{Configuration, ConfigurationSpace};

/// A fixed finite set of configurations with their pre-recorded performances
/// (lower is better, failures recorded with [crate::FAILED_PERF]).
///
/// Configurations are kept in insertion order which gives the deterministic
/// iteration order used for tie breaking. Their encoded feature vectors are
/// computed once at construction.
#[derive(Clone, Debug)]
pub struct CandidatePool {
    configurations: Vec<Configuration>,
    perfs: Array1<f64>,
    x: Array2<f64>,
    index: HashMap<Configuration, usize>,
}

impl CandidatePool {
    /// Build a pool from configurations of the given `space` and their performances.
    ///
    /// Repeated configurations keep their first recorded performance.
    pub fn new(
        space: &ConfigurationSpace,
        configurations: Vec<Configuration>,
        perfs: Vec<f64>,
    ) -> Result<Self> {
        if configurations.len() != perfs.len() {
            return Err(SmboError::InvalidValue(format!(
                "Pool configurations ({}) and performances ({}) sizes mismatch",
                configurations.len(),
                perfs.len()
            )));
        }
        if configurations.is_empty() {
            return Err(SmboError::EmptyPoolError);
        }

        let mut index = HashMap::with_capacity(configurations.len());
        let mut kept = Vec::with_capacity(configurations.len());
        let mut kept_perfs = Vec::with_capacity(perfs.len());
        for (config, perf) in configurations.into_iter().zip(perfs) {
            space.validate(&config)?;
            if index.contains_key(&config) {
                warn!("Configuration {config} recorded twice in pool, keep first record");
                continue;
            }
            index.insert(config.clone(), kept.len());
            kept.push(config);
            kept_perfs.push(perf);
        }
        let x = space.to_array(&kept);
        Ok(CandidatePool {
            configurations: kept,
            perfs: Array1::from(kept_perfs),
            x,
            index,
        })
    }

    /// Number of configurations
    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    /// Whether the pool has no configuration (never true for a constructed pool)
    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// Configuration at index `i`
    pub fn configuration(&self, i: usize) -> &Configuration {
        &self.configurations[i]
    }

    /// All configurations in pool order
    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    /// Recorded performance at index `i`
    pub fn perf(&self, i: usize) -> f64 {
        self.perfs[i]
    }

    /// All recorded performances in pool order
    pub fn perfs(&self) -> ArrayView1<'_, f64> {
        self.perfs.view()
    }

    /// Encoded configurations as a (len, dim) matrix
    pub fn x(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    /// Index of the given configuration if it belongs to the pool
    pub fn index_of(&self, config: &Configuration) -> Option<usize> {
        self.index.get(config).copied()
    }

    /// Whether the given configuration belongs to the pool
    pub fn contains(&self, config: &Configuration) -> bool {
        self.index.contains_key(config)
    }

    /// Recorded performance of a configuration
    pub fn lookup(&self, config: &Configuration) -> Option<f64> {
        self.index_of(config).map(|i| self.perfs[i])
    }

    /// Min and max of the non failed performances, `None` when all evaluations failed
    pub fn perf_bounds(&self) -> Option<(f64, f64)> {
        let perfs: Array1<f64> = self
            .perfs
            .iter()
            .copied()
            .filter(|p| !is_failed_perf(*p))
            .collect();
        match (perfs.min(), perfs.max()) {
            (Ok(lo), Ok(up)) => Some((*lo, *up)),
            _ => None,
        }
    }

    /// Encoded configurations and performances of non failed records
    pub fn successes(&self) -> (Array2<f64>, Array1<f64>) {
        let idx: Vec<usize> = (0..self.len())
            .filter(|&i| !is_failed_perf(self.perfs[i]))
            .collect();
        (self.x.select(Axis(0), &idx), self.perfs.select(Axis(0), &idx))
    }

    /// A pool made of the first `n` records
    pub fn truncated(&self, n: usize) -> CandidatePool {
        let n = n.min(self.len()).max(1);
        let configurations = self.configurations[..n].to_vec();
        let index = configurations
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        CandidatePool {
            configurations,
            perfs: self.perfs.slice(s![..n]).to_owned(),
            x: self.x.slice(s![..n, ..]).to_owned(),
            index,
        }
    }
}
