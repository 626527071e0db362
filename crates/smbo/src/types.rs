//! Trial outcomes, failure sentinel and closed option kinds.
use crate::errors::{Result, SmboError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tlbo_space::Configuration;

/// Performance value recorded for configurations whose evaluation failed
pub const FAILED_PERF: f64 = 2147483647.0;

/// Information attached to a trial when the looked up performance is the failure sentinel
pub const FAILED_INFO: &str = "failed configuration evaluation.";

/// Whether a recorded performance denotes a failed evaluation
pub fn is_failed_perf(perf: f64) -> bool {
    perf == FAILED_PERF || !perf.is_finite()
}

/// Outcome of a trial
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialState {
    /// Performance successfully looked up
    Success,
    /// Failure sentinel looked up
    Failed,
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialState::Success => write!(f, "SUCCESS"),
            TrialState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Result of one loop iteration
#[derive(Clone, Debug, PartialEq)]
pub struct Trial {
    /// Selected configuration
    pub configuration: Configuration,
    /// Trial outcome
    pub state: TrialState,
    /// Observed performance (lower is better)
    pub perf: f64,
    /// Optional message, set for freshly failed evaluations
    pub info: Option<String>,
}

/// Acquisition function used to score candidates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionKind {
    /// Expected Improvement
    #[default]
    Ei,
    /// Transfer acquisition function (transfer-aware EI)
    Taf,
}

impl FromStr for AcquisitionKind {
    type Err = SmboError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ei" => Ok(AcquisitionKind::Ei),
            "taf" => Ok(AcquisitionKind::Taf),
            other => Err(SmboError::InvalidConfigError(format!(
                "Invalid acquisition function: {other} (expected one of ei, taf)"
            ))),
        }
    }
}

impl fmt::Display for AcquisitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionKind::Ei => write!(f, "ei"),
            AcquisitionKind::Taf => write!(f, "taf"),
        }
    }
}

/// Surrogate family fitted on target (and source) data
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurrogateKind {
    /// GP with squared exponential correlation
    #[default]
    Gp,
    /// GP with Matern 5/2 correlation
    GpMatern52,
}

impl FromStr for SurrogateKind {
    type Err = SmboError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gp" => Ok(SurrogateKind::Gp),
            "gp_matern52" => Ok(SurrogateKind::GpMatern52),
            other => Err(SmboError::InvalidConfigError(format!(
                "Invalid surrogate type: {other} (expected one of gp, gp_matern52)"
            ))),
        }
    }
}

impl fmt::Display for SurrogateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurrogateKind::Gp => write!(f, "gp"),
            SurrogateKind::GpMatern52 => write!(f, "gp_matern52"),
        }
    }
}

/// Transfer method used to build the loop surrogate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferMethod {
    /// No transfer: target data only
    NoTl,
    /// Ranking-weighted Gaussian process ensemble
    Rgpe,
    /// Random search baseline
    Rs,
}

impl FromStr for TransferMethod {
    type Err = SmboError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "notl" => Ok(TransferMethod::NoTl),
            "rgpe" => Ok(TransferMethod::Rgpe),
            "rs" => Ok(TransferMethod::Rs),
            other => Err(SmboError::InvalidConfigError(format!(
                "Invalid transfer method: {other} (expected one of notl, rgpe, rs)"
            ))),
        }
    }
}

impl fmt::Display for TransferMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMethod::NoTl => write!(f, "notl"),
            TransferMethod::Rgpe => write!(f, "rgpe"),
            TransferMethod::Rs => write!(f, "rs"),
        }
    }
}

/// Random chooser deciding to explore at a given iteration
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum RandomChooserKind {
    /// Explore with the given probability
    Prob(f64),
    /// Explore every `modulus` iterations
    Modulus(f64),
}

impl Default for RandomChooserKind {
    fn default() -> Self {
        RandomChooserKind::Prob(0.25)
    }
}
