//! Hyperparameter domains.
//!
//! Each hyperparameter knows how to validate a raw value, how to encode it
//! into a numeric feature used by surrogate models and clustering, and how to
//! draw a value at random. Numeric domains are encoded min-max normalized in
//! `[0, 1]` (on a log scale when requested), discrete choices are encoded
//! as their index.
use crate::errors::{Result, SpaceError};
use ndarray_rand::rand::Rng;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A value taken by a hyperparameter within a configuration
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum HpValue {
    /// Continuous value
    Float(f64),
    /// Integer value
    Int(i64),
    /// Index of a categorical choice or of an ordinal item
    Index(usize),
}

impl HpValue {
    /// The value as a raw float (index as float for discrete choices)
    pub fn as_f64(&self) -> f64 {
        match *self {
            HpValue::Float(v) => v,
            HpValue::Int(v) => v as f64,
            HpValue::Index(v) => v as f64,
        }
    }
}

impl PartialEq for HpValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HpValue::Float(a), HpValue::Float(b)) => float_key(*a) == float_key(*b),
            (HpValue::Int(a), HpValue::Int(b)) => a == b,
            (HpValue::Index(a), HpValue::Index(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for HpValue {}

impl Hash for HpValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match *self {
            HpValue::Float(v) => float_key(v).hash(state),
            HpValue::Int(v) => v.hash(state),
            HpValue::Index(v) => v.hash(state),
        }
    }
}

// -0.0 and 0.0 must hash alike
fn float_key(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

/// An enumeration of the supported hyperparameter domains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Hyperparameter {
    /// Continuous variable in [lower, upper]
    Float {
        /// Hyperparameter name
        name: String,
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
        /// Default value
        default: f64,
        /// Whether the domain is explored on a log scale
        #[serde(default)]
        log: bool,
    },
    /// Integer variable in lower..=upper
    Int {
        /// Hyperparameter name
        name: String,
        /// Lower bound
        lower: i64,
        /// Upper bound
        upper: i64,
        /// Default value
        default: i64,
        /// Whether the domain is explored on a log scale
        #[serde(default)]
        log: bool,
    },
    /// Unordered choice among named items
    Categorical {
        /// Hyperparameter name
        name: String,
        /// Available choices
        choices: Vec<String>,
        /// Index of the default choice
        default: usize,
    },
    /// Ordered choice among float items
    Ordinal {
        /// Hyperparameter name
        name: String,
        /// Available items, in order
        sequence: Vec<f64>,
        /// Index of the default item
        default: usize,
    },
}

impl Hyperparameter {
    /// Continuous hyperparameter constructor
    pub fn float(name: impl Into<String>, lower: f64, upper: f64, default: f64) -> Self {
        Hyperparameter::Float {
            name: name.into(),
            lower,
            upper,
            default,
            log: false,
        }
    }

    /// Integer hyperparameter constructor
    pub fn int(name: impl Into<String>, lower: i64, upper: i64, default: i64) -> Self {
        Hyperparameter::Int {
            name: name.into(),
            lower,
            upper,
            default,
            log: false,
        }
    }

    /// Categorical hyperparameter constructor
    pub fn categorical(name: impl Into<String>, choices: &[&str], default: usize) -> Self {
        Hyperparameter::Categorical {
            name: name.into(),
            choices: choices.iter().map(|c| c.to_string()).collect(),
            default,
        }
    }

    /// Ordinal hyperparameter constructor
    pub fn ordinal(name: impl Into<String>, sequence: &[f64], default: usize) -> Self {
        Hyperparameter::Ordinal {
            name: name.into(),
            sequence: sequence.to_vec(),
            default,
        }
    }

    /// Switch a numeric hyperparameter to log scale, no-op for discrete choices
    pub fn log_scale(self) -> Self {
        match self {
            Hyperparameter::Float {
                name,
                lower,
                upper,
                default,
                ..
            } => Hyperparameter::Float {
                name,
                lower,
                upper,
                default,
                log: true,
            },
            Hyperparameter::Int {
                name,
                lower,
                upper,
                default,
                ..
            } => Hyperparameter::Int {
                name,
                lower,
                upper,
                default,
                log: true,
            },
            other => other,
        }
    }

    /// Hyperparameter name
    pub fn name(&self) -> &str {
        match self {
            Hyperparameter::Float { name, .. }
            | Hyperparameter::Int { name, .. }
            | Hyperparameter::Categorical { name, .. }
            | Hyperparameter::Ordinal { name, .. } => name,
        }
    }

    /// Check the consistency of the domain definition
    pub fn check(&self) -> Result<()> {
        let invalid = |reason: String| SpaceError::InvalidHyperparameter {
            name: self.name().to_string(),
            reason,
        };
        match self {
            Hyperparameter::Float {
                lower,
                upper,
                default,
                log,
                ..
            } => {
                if !lower.is_finite() || !upper.is_finite() || lower >= upper {
                    return Err(invalid(format!("bad bounds [{lower}, {upper}]")));
                }
                if *log && *lower <= 0. {
                    return Err(invalid("log scale requires a positive lower bound".into()));
                }
                if !(lower..=upper).contains(&default) {
                    return Err(invalid(format!("default {default} out of bounds")));
                }
            }
            Hyperparameter::Int {
                lower,
                upper,
                default,
                log,
                ..
            } => {
                if lower >= upper {
                    return Err(invalid(format!("bad bounds [{lower}, {upper}]")));
                }
                if *log && *lower <= 0 {
                    return Err(invalid("log scale requires a positive lower bound".into()));
                }
                if !(lower..=upper).contains(&default) {
                    return Err(invalid(format!("default {default} out of bounds")));
                }
            }
            Hyperparameter::Categorical {
                choices, default, ..
            } => {
                if choices.is_empty() {
                    return Err(invalid("no choice".into()));
                }
                if *default >= choices.len() {
                    return Err(invalid(format!("default index {default} out of choices")));
                }
            }
            Hyperparameter::Ordinal {
                sequence, default, ..
            } => {
                if sequence.is_empty() {
                    return Err(invalid("empty sequence".into()));
                }
                if *default >= sequence.len() {
                    return Err(invalid(format!("default index {default} out of sequence")));
                }
            }
        }
        Ok(())
    }

    /// Default value
    pub fn default_value(&self) -> HpValue {
        match self {
            Hyperparameter::Float { default, .. } => HpValue::Float(*default),
            Hyperparameter::Int { default, .. } => HpValue::Int(*default),
            Hyperparameter::Categorical { default, .. }
            | Hyperparameter::Ordinal { default, .. } => HpValue::Index(*default),
        }
    }

    /// Build a value from its raw float representation
    /// (value for numeric domains, index for discrete choices)
    pub fn value(&self, raw: f64) -> Result<HpValue> {
        let out_of_domain =
            || SpaceError::InvalidValue(format!("{raw} not in domain of {}", self.name()));
        if !raw.is_finite() {
            return Err(out_of_domain());
        }
        match self {
            Hyperparameter::Float { lower, upper, .. } => {
                if (*lower..=*upper).contains(&raw) {
                    Ok(HpValue::Float(raw))
                } else {
                    Err(out_of_domain())
                }
            }
            Hyperparameter::Int { lower, upper, .. } => {
                let v = raw.round() as i64;
                if (raw - raw.round()).abs() < 1e-9 && (*lower..=*upper).contains(&v) {
                    Ok(HpValue::Int(v))
                } else {
                    Err(out_of_domain())
                }
            }
            Hyperparameter::Categorical { choices, .. } => index_value(raw, choices.len())
                .map(HpValue::Index)
                .ok_or_else(out_of_domain),
            Hyperparameter::Ordinal { sequence, .. } => index_value(raw, sequence.len())
                .map(HpValue::Index)
                .ok_or_else(out_of_domain),
        }
    }

    /// Check a value belongs to the domain
    pub fn validate(&self, value: &HpValue) -> Result<()> {
        let valid = match (self, value) {
            (Hyperparameter::Float { lower, upper, .. }, HpValue::Float(v)) => {
                (*lower..=*upper).contains(v)
            }
            (Hyperparameter::Int { lower, upper, .. }, HpValue::Int(v)) => {
                (*lower..=*upper).contains(v)
            }
            (Hyperparameter::Categorical { choices, .. }, HpValue::Index(i)) => *i < choices.len(),
            (Hyperparameter::Ordinal { sequence, .. }, HpValue::Index(i)) => *i < sequence.len(),
            _ => false,
        };
        if valid {
            Ok(())
        } else {
            Err(SpaceError::InvalidValue(format!(
                "{value:?} not in domain of {}",
                self.name()
            )))
        }
    }

    /// Numeric feature of the given value
    pub fn encode(&self, value: &HpValue) -> f64 {
        match (self, value) {
            (
                Hyperparameter::Float {
                    lower, upper, log, ..
                },
                HpValue::Float(v),
            ) => normalize(*v, *lower, *upper, *log),
            (
                Hyperparameter::Int {
                    lower, upper, log, ..
                },
                HpValue::Int(v),
            ) => normalize(*v as f64, *lower as f64, *upper as f64, *log),
            (_, v) => v.as_f64(),
        }
    }

    /// Value corresponding to the given numeric feature, clipped to the domain
    pub fn decode(&self, feature: f64) -> HpValue {
        match self {
            Hyperparameter::Float {
                lower, upper, log, ..
            } => HpValue::Float(denormalize(feature, *lower, *upper, *log).clamp(*lower, *upper)),
            Hyperparameter::Int {
                lower, upper, log, ..
            } => {
                let v = denormalize(feature, *lower as f64, *upper as f64, *log).round() as i64;
                HpValue::Int(v.clamp(*lower, *upper))
            }
            Hyperparameter::Categorical { choices, .. } => {
                HpValue::Index(clip_index(feature, choices.len()))
            }
            Hyperparameter::Ordinal { sequence, .. } => {
                HpValue::Index(clip_index(feature, sequence.len()))
            }
        }
    }

    /// Draw a value uniformly (log-uniformly when on log scale) within the domain
    pub fn sample<R: Rng>(&self, rng: &mut R) -> HpValue {
        match self {
            Hyperparameter::Float { .. } => self.decode(rng.gen::<f64>()),
            Hyperparameter::Int {
                lower, upper, log, ..
            } => {
                if *log {
                    self.decode(rng.gen::<f64>())
                } else {
                    HpValue::Int(rng.gen_range(*lower..=*upper))
                }
            }
            Hyperparameter::Categorical { choices, .. } => {
                HpValue::Index(rng.gen_range(0..choices.len()))
            }
            Hyperparameter::Ordinal { sequence, .. } => {
                HpValue::Index(rng.gen_range(0..sequence.len()))
            }
        }
    }

    /// Human readable rendering of a value
    pub fn display(&self, value: &HpValue) -> String {
        match (self, value) {
            (Hyperparameter::Categorical { choices, .. }, HpValue::Index(i)) => choices
                .get(*i)
                .cloned()
                .unwrap_or_else(|| format!("#{i}")),
            (Hyperparameter::Ordinal { sequence, .. }, HpValue::Index(i)) => sequence
                .get(*i)
                .map(|v| v.to_string())
                .unwrap_or_else(|| format!("#{i}")),
            (_, v) => v.as_f64().to_string(),
        }
    }
}

fn index_value(raw: f64, n: usize) -> Option<usize> {
    if raw >= 0. && (raw - raw.round()).abs() < 1e-9 && (raw.round() as usize) < n {
        Some(raw.round() as usize)
    } else {
        None
    }
}

fn clip_index(feature: f64, n: usize) -> usize {
    if feature.is_nan() || feature <= 0. {
        0
    } else {
        (feature.round() as usize).min(n - 1)
    }
}

fn normalize(v: f64, lower: f64, upper: f64, log: bool) -> f64 {
    if log {
        (v.ln() - lower.ln()) / (upper.ln() - lower.ln())
    } else {
        (v - lower) / (upper - lower)
    }
}

fn denormalize(t: f64, lower: f64, upper: f64, log: bool) -> f64 {
    if log {
        (lower.ln() + t * (upper.ln() - lower.ln())).exp()
    } else {
        lower + t * (upper - lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray_rand::rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn test_float_encoding() {
        let hp = Hyperparameter::float("lr", 0., 10., 1.);
        assert_abs_diff_eq!(hp.encode(&HpValue::Float(2.5)), 0.25);
        assert_eq!(hp.decode(0.25), HpValue::Float(2.5));
        assert_eq!(hp.decode(1.5), HpValue::Float(10.));
    }

    #[test]
    fn test_log_encoding() {
        let hp = Hyperparameter::float("lr", 1e-4, 1., 1e-2).log_scale();
        assert_abs_diff_eq!(hp.encode(&HpValue::Float(1e-2)), 0.5, epsilon = 1e-12);
        match hp.decode(0.5) {
            HpValue::Float(v) => assert_abs_diff_eq!(v, 1e-2, epsilon = 1e-12),
            v => panic!("unexpected value {v:?}"),
        }
    }

    #[test]
    fn test_check_definitions() {
        assert!(Hyperparameter::float("x", 1., 0., 0.5).check().is_err());
        assert!(Hyperparameter::int("n", 0, 10, 11).check().is_err());
        assert!(Hyperparameter::categorical("c", &[], 0).check().is_err());
        assert!(Hyperparameter::float("x", 0., 1., 0.5)
            .log_scale()
            .check()
            .is_err());
        assert!(Hyperparameter::ordinal("o", &[1., 2.], 1).check().is_ok());
    }

    #[test]
    fn test_raw_values() {
        let hp = Hyperparameter::int("n", 1, 5, 3);
        assert_eq!(hp.value(4.).unwrap(), HpValue::Int(4));
        assert!(hp.value(4.5).is_err());
        assert!(hp.value(6.).is_err());
        let cat = Hyperparameter::categorical("kernel", &["rbf", "poly"], 0);
        assert_eq!(cat.value(1.).unwrap(), HpValue::Index(1));
        assert!(cat.value(2.).is_err());
        assert_eq!(cat.display(&HpValue::Index(1)), "poly");
    }

    #[test]
    fn test_sample_within_domain() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let hps = [
            Hyperparameter::float("x", -1., 1., 0.),
            Hyperparameter::int("n", 2, 64, 8).log_scale(),
            Hyperparameter::categorical("c", &["a", "b", "c"], 2),
        ];
        for _ in 0..100 {
            for hp in hps.iter() {
                let v = hp.sample(&mut rng);
                assert!(hp.validate(&v).is_ok());
            }
        }
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(HpValue::Float(0.0), HpValue::Float(-0.0));
        assert_ne!(HpValue::Float(1.0), HpValue::Int(1));
    }
}
