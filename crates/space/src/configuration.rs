use crate::hyperparameter::HpValue;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::fmt;
use std::sync::Arc;

/// An assignment of one value to each hyperparameter of a configuration space.
///
/// Configurations are immutable and compared by value, they are used as keys
/// of the candidate pool and of the trial history. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Configuration {
    values: Arc<[HpValue]>,
}

impl Configuration {
    /// Build a configuration from already validated values
    pub(crate) fn new(values: Vec<HpValue>) -> Self {
        Configuration {
            values: values.into(),
        }
    }

    /// Values in hyperparameter order
    pub fn values(&self) -> &[HpValue] {
        &self.values
    }

    /// Raw float rendering of the values (index for discrete choices)
    pub fn raw_values(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.as_f64()).collect()
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the configuration has no value
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match v {
                HpValue::Float(x) => write!(f, "{x}")?,
                HpValue::Int(n) => write!(f, "{n}")?,
                HpValue::Index(i) => write!(f, "#{i}")?,
            }
        }
        write!(f, "]")
    }
}

impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.values.len()))?;
        for v in self.values.iter() {
            seq.serialize_element(&v.as_f64())?;
        }
        seq.end()
    }
}
