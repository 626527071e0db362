//! Append-only log of evaluated configurations.
use crate::errors::{Result, SmboError};
use crate::types::TrialState;

use serde::Serialize;
use std::collections::HashMap;
use tlbo_space::Configuration;

/// One evaluated configuration
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialRecord {
    /// Evaluated configuration
    pub configuration: Configuration,
    /// Index of the configuration in the candidate pool
    pub pool_index: usize,
    /// Looked up performance
    pub perf: f64,
    /// Outcome
    pub state: TrialState,
    /// Loop iteration at which the configuration was first evaluated
    pub iteration: usize,
}

/// Append-only log of evaluated configurations.
///
/// A configuration is recorded at most once, either as a success or as a failure.
/// Successes and failures are views computed from the single ordered log.
#[derive(Clone, Debug, Default)]
pub struct TrialHistory {
    records: Vec<TrialRecord>,
    index: HashMap<Configuration, usize>,
    n_successes: usize,
    incumbent: Option<usize>,
}

impl TrialHistory {
    /// An empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an evaluation, fails if the configuration is already recorded
    pub fn add(&mut self, record: TrialRecord) -> Result<()> {
        if self.index.contains_key(&record.configuration) {
            return Err(SmboError::InvalidValue(format!(
                "Configuration {} already recorded",
                record.configuration
            )));
        }
        let pos = self.records.len();
        if record.state == TrialState::Success {
            self.n_successes += 1;
            let better = self
                .incumbent
                .map_or(true, |i| record.perf < self.records[i].perf);
            if better {
                self.incumbent = Some(pos);
            }
        }
        self.index.insert(record.configuration.clone(), pos);
        self.records.push(record);
        Ok(())
    }

    /// Whether the configuration has been evaluated (successfully or not)
    pub fn contains(&self, config: &Configuration) -> bool {
        self.index.contains_key(config)
    }

    /// Recorded evaluation of the configuration
    pub fn get(&self, config: &Configuration) -> Option<&TrialRecord> {
        self.index.get(config).map(|&i| &self.records[i])
    }

    /// All records in evaluation order
    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    /// Number of evaluated configurations
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been evaluated yet
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Successful evaluations in evaluation order
    pub fn successes(&self) -> impl Iterator<Item = &TrialRecord> {
        self.records
            .iter()
            .filter(|r| r.state == TrialState::Success)
    }

    /// Failed evaluations in evaluation order
    pub fn failures(&self) -> impl Iterator<Item = &TrialRecord> {
        self.records.iter().filter(|r| r.state == TrialState::Failed)
    }

    /// Number of successful evaluations
    pub fn n_successes(&self) -> usize {
        self.n_successes
    }

    /// Number of failed evaluations
    pub fn n_failures(&self) -> usize {
        self.records.len() - self.n_successes
    }

    /// Successfully evaluated configurations
    pub fn configurations(&self) -> Vec<Configuration> {
        self.successes().map(|r| r.configuration.clone()).collect()
    }

    /// Performances of successful evaluations, aligned with [TrialHistory::configurations]
    pub fn perfs(&self) -> Vec<f64> {
        self.successes().map(|r| r.perf).collect()
    }

    /// Configurations whose evaluation failed
    pub fn failed_configurations(&self) -> Vec<Configuration> {
        self.failures().map(|r| r.configuration.clone()).collect()
    }

    /// Best successful record so far
    pub fn incumbent(&self) -> Option<&TrialRecord> {
        self.incumbent.map(|i| &self.records[i])
    }

    /// Best performance so far
    pub fn incumbent_value(&self) -> Option<f64> {
        self.incumbent().map(|r| r.perf)
    }
}
