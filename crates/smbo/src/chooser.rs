//! Exploration gate of the optimization loop.
use crate::errors::{Result, SmboError};
use crate::types::RandomChooserKind;

use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

/// Gate deciding whether the next configuration is drawn at random
/// instead of maximizing the acquisition function.
#[derive(Clone, Debug)]
pub enum RandomChooser {
    /// Fires with probability `prob`
    Prob {
        /// Exploration probability
        prob: f64,
        /// Owned random stream
        rng: Xoshiro256Plus,
    },
    /// Fires when `iteration % modulus < 1`
    NoCoolDown {
        /// Exploration period
        modulus: f64,
    },
}

impl RandomChooser {
    /// Build the chooser of the given kind with its own random stream
    pub fn new(kind: RandomChooserKind, rng: Xoshiro256Plus) -> Result<Self> {
        match kind {
            RandomChooserKind::Prob(prob) => {
                if !(0. ..=1.).contains(&prob) {
                    return Err(SmboError::InvalidConfigError(format!(
                        "Random chooser probability should be in [0, 1], got {prob}"
                    )));
                }
                Ok(RandomChooser::Prob { prob, rng })
            }
            RandomChooserKind::Modulus(modulus) => {
                if !(modulus >= 1.) {
                    return Err(SmboError::InvalidConfigError(format!(
                        "Random chooser modulus should be at least 1, got {modulus}"
                    )));
                }
                Ok(RandomChooser::NoCoolDown { modulus })
            }
        }
    }

    /// Shortcut for a seeded probability chooser
    pub fn prob(prob: f64, seed: u64) -> Result<Self> {
        Self::new(
            RandomChooserKind::Prob(prob),
            Xoshiro256Plus::seed_from_u64(seed),
        )
    }

    /// Whether a random configuration should be used at `iteration`
    pub fn check(&mut self, iteration: usize) -> bool {
        match self {
            RandomChooser::Prob { prob, rng } => rng.gen::<f64>() < *prob,
            RandomChooser::NoCoolDown { modulus } => (iteration as f64) % *modulus < 1.,
        }
    }
}
