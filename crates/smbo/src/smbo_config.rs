//! Offline SMBO loop configuration.
use crate::errors::{Result, SmboError};
use crate::initial_design::DEFAULT_INIT_TOP_K;
use crate::types::*;

use serde::{Deserialize, Serialize};

/// Default number of iterations of a run
pub const DEFAULT_MAX_ITERATIONS: usize = 200;
/// Default number of initial configurations
pub const DEFAULT_INIT_NUM: usize = 3;
/// Default number of consecutive rejections before accepting an already evaluated configuration
pub const DEFAULT_MAX_REJECTIONS: usize = 200;

/// Offline SMBO configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmboConfig {
    /// Number of iterations (one configuration selected per iteration)
    pub(crate) max_iterations: usize,
    /// Number of successful evaluations before using the surrogate
    pub(crate) init_num: usize,
    /// Whether initial configurations are chosen by clustering the best ranked candidates
    pub(crate) init_design: bool,
    /// Number of best ranked candidates clustered by the initial design
    pub(crate) init_top_k: usize,
    /// Acquisition function
    pub(crate) acquisition: AcquisitionKind,
    /// Exploration gate
    pub(crate) random_chooser: RandomChooserKind,
    /// Number of consecutive rejections tolerated by random sampling
    pub(crate) max_rejections: usize,
    /// Seed of every random stream of the loop, drawn from entropy if not given
    pub(crate) seed: Option<u64>,
    /// Directory where run results are written
    pub(crate) outdir: Option<String>,
}

impl Default for SmboConfig {
    fn default() -> Self {
        SmboConfig {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            init_num: DEFAULT_INIT_NUM,
            init_design: false,
            init_top_k: DEFAULT_INIT_TOP_K,
            acquisition: AcquisitionKind::default(),
            random_chooser: RandomChooserKind::default(),
            max_rejections: DEFAULT_MAX_REJECTIONS,
            seed: None,
            outdir: None,
        }
    }
}

impl SmboConfig {
    /// Sets the number of iterations
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the number of initial configurations
    pub fn init_num(mut self, init_num: usize) -> Self {
        self.init_num = init_num;
        self
    }

    /// Enables or disables the clustered initial design
    pub fn init_design(mut self, init_design: bool) -> Self {
        self.init_design = init_design;
        self
    }

    /// Sets the number of best ranked candidates clustered by the initial design
    pub fn init_top_k(mut self, init_top_k: usize) -> Self {
        self.init_top_k = init_top_k;
        self
    }

    /// Sets the acquisition function
    pub fn acquisition(mut self, acquisition: AcquisitionKind) -> Self {
        self.acquisition = acquisition;
        self
    }

    /// Sets the exploration gate
    pub fn random_chooser(mut self, random_chooser: RandomChooserKind) -> Self {
        self.random_chooser = random_chooser;
        self
    }

    /// Sets the number of consecutive rejections tolerated by random sampling
    pub fn max_rejections(mut self, max_rejections: usize) -> Self {
        self.max_rejections = max_rejections;
        self
    }

    /// Sets a random seed for reproducibility
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets a directory to write run results
    pub fn outdir(mut self, outdir: impl Into<String>) -> Self {
        self.outdir = Some(outdir.into());
        self
    }

    /// Check options consistency
    pub fn check(self) -> Result<ValidSmboConfig> {
        if self.max_iterations == 0 {
            return Err(SmboError::InvalidConfigError(
                "max_iterations should be greater than 0".to_string(),
            ));
        }
        match self.random_chooser {
            RandomChooserKind::Prob(prob) if !(0. ..=1.).contains(&prob) => {
                return Err(SmboError::InvalidConfigError(format!(
                    "Random chooser probability should be in [0, 1], got {prob}"
                )));
            }
            RandomChooserKind::Modulus(modulus) if !(modulus >= 1.) => {
                return Err(SmboError::InvalidConfigError(format!(
                    "Random chooser modulus should be at least 1, got {modulus}"
                )));
            }
            _ => (),
        }
        if self.init_design && self.init_top_k < self.init_num {
            return Err(SmboError::InvalidConfigError(format!(
                "init_top_k ({}) should not be lower than init_num ({})",
                self.init_top_k, self.init_num
            )));
        }
        if self.max_rejections == 0 {
            return Err(SmboError::InvalidConfigError(
                "max_rejections should be greater than 0".to_string(),
            ));
        }
        Ok(ValidSmboConfig(self))
    }
}

/// A checked [SmboConfig]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidSmboConfig(SmboConfig);

impl ValidSmboConfig {
    /// Number of iterations
    pub fn max_iterations(&self) -> usize {
        self.0.max_iterations
    }

    /// Number of initial configurations
    pub fn init_num(&self) -> usize {
        self.0.init_num
    }

    /// Whether the clustered initial design is enabled
    pub fn init_design(&self) -> bool {
        self.0.init_design
    }

    /// Number of best ranked candidates clustered by the initial design
    pub fn init_top_k(&self) -> usize {
        self.0.init_top_k
    }

    /// Acquisition function kind
    pub fn acquisition(&self) -> AcquisitionKind {
        self.0.acquisition
    }

    /// Exploration gate kind
    pub fn random_chooser(&self) -> RandomChooserKind {
        self.0.random_chooser
    }

    /// Number of consecutive rejections tolerated by random sampling
    pub fn max_rejections(&self) -> usize {
        self.0.max_rejections
    }

    /// Configured seed
    pub fn seed(&self) -> Option<u64> {
        self.0.seed
    }

    /// Output directory
    pub fn outdir(&self) -> Option<&str> {
        self.0.outdir.as_deref()
    }

    /// Unchecked configuration
    pub fn config(&self) -> &SmboConfig {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SmboConfig::default().check().unwrap();
        assert_eq!(config.max_iterations(), 200);
        assert_eq!(config.init_num(), 3);
        assert!(!config.init_design());
        assert_eq!(config.random_chooser(), RandomChooserKind::Prob(0.25));
        assert_eq!(config.max_rejections(), 200);
        assert_eq!(config.seed(), None);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(SmboConfig::default().max_iterations(0).check().is_err());
        assert!(SmboConfig::default()
            .random_chooser(RandomChooserKind::Prob(-0.1))
            .check()
            .is_err());
        assert!(SmboConfig::default()
            .random_chooser(RandomChooserKind::Modulus(0.))
            .check()
            .is_err());
        assert!(SmboConfig::default()
            .init_design(true)
            .init_num(10)
            .init_top_k(5)
            .check()
            .is_err());
        assert!(SmboConfig::default()
            .init_num(10)
            .init_top_k(5)
            .check()
            .is_ok());
    }

    #[test]
    fn test_config_json() {
        let config = SmboConfig::default().seed(42).acquisition(AcquisitionKind::Taf);
        let json = serde_json::to_string(&config).unwrap();
        let back: SmboConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
