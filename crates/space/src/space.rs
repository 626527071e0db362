use crate::configuration::Configuration;
use crate::errors::{Result, SpaceError};
use crate::hyperparameter::{HpValue, Hyperparameter};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use ndarray_rand::rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// An ordered set of hyperparameters defining the searchable configurations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SpaceDef", into = "SpaceDef")]
pub struct ConfigurationSpace {
    hyperparameters: Vec<Hyperparameter>,
}

#[derive(Serialize, Deserialize)]
struct SpaceDef {
    hyperparameters: Vec<Hyperparameter>,
}

impl TryFrom<SpaceDef> for ConfigurationSpace {
    type Error = SpaceError;

    fn try_from(def: SpaceDef) -> Result<Self> {
        ConfigurationSpace::new(def.hyperparameters)
    }
}

impl From<ConfigurationSpace> for SpaceDef {
    fn from(space: ConfigurationSpace) -> Self {
        SpaceDef {
            hyperparameters: space.hyperparameters,
        }
    }
}

impl ConfigurationSpace {
    /// Constructor checking every hyperparameter definition and name uniqueness
    pub fn new(hyperparameters: Vec<Hyperparameter>) -> Result<Self> {
        let mut names = HashSet::new();
        for hp in hyperparameters.iter() {
            hp.check()?;
            if !names.insert(hp.name().to_string()) {
                return Err(SpaceError::InvalidHyperparameter {
                    name: hp.name().to_string(),
                    reason: "duplicated name".to_string(),
                });
            }
        }
        Ok(ConfigurationSpace { hyperparameters })
    }

    /// Load a space from its json definition
    /// `{"hyperparameters": [{"type": "float", "name": ..., ...}, ...]}`
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a space from a json file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SpaceError::InvalidValue(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_json(&content)
    }

    /// Json definition of the space
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of hyperparameters
    pub fn dim(&self) -> usize {
        self.hyperparameters.len()
    }

    /// Hyperparameters in order
    pub fn hyperparameters(&self) -> &[Hyperparameter] {
        &self.hyperparameters
    }

    /// Build a configuration from raw float values
    /// (values for numeric hyperparameters, indices for discrete choices)
    pub fn configuration(&self, raw: &[f64]) -> Result<Configuration> {
        self.check_dim(raw.len())?;
        let values = self
            .hyperparameters
            .iter()
            .zip(raw)
            .map(|(hp, &r)| hp.value(r))
            .collect::<Result<Vec<_>>>()?;
        Ok(Configuration::new(values))
    }

    /// Build a configuration from typed values
    pub fn configuration_from_values(&self, values: Vec<HpValue>) -> Result<Configuration> {
        self.check_dim(values.len())?;
        for (hp, v) in self.hyperparameters.iter().zip(values.iter()) {
            hp.validate(v)?;
        }
        Ok(Configuration::new(values))
    }

    /// Configuration made of every default value
    pub fn default_configuration(&self) -> Configuration {
        Configuration::new(
            self.hyperparameters
                .iter()
                .map(|hp| hp.default_value())
                .collect(),
        )
    }

    /// Draw one configuration at random
    pub fn sample_configuration<R: Rng>(&self, rng: &mut R) -> Configuration {
        Configuration::new(self.hyperparameters.iter().map(|hp| hp.sample(rng)).collect())
    }

    /// Draw `n` configurations at random, duplicates are possible
    pub fn sample_configurations<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<Configuration> {
        (0..n).map(|_| self.sample_configuration(rng)).collect()
    }

    /// Check a configuration belongs to the space
    pub fn validate(&self, config: &Configuration) -> Result<()> {
        self.check_dim(config.len())?;
        self.hyperparameters
            .iter()
            .zip(config.values())
            .try_for_each(|(hp, v)| hp.validate(v))
    }

    /// Numeric feature vector of a configuration
    pub fn to_vector(&self, config: &Configuration) -> Array1<f64> {
        self.hyperparameters
            .iter()
            .zip(config.values())
            .map(|(hp, v)| hp.encode(v))
            .collect()
    }

    /// Feature matrix (nconfigs, dim) of the given configurations
    pub fn to_array(&self, configs: &[Configuration]) -> Array2<f64> {
        let mut x = Array2::zeros((configs.len(), self.dim()));
        for (mut row, config) in x.rows_mut().into_iter().zip(configs) {
            row.assign(&self.to_vector(config));
        }
        x
    }

    /// Configuration corresponding to a feature vector, values are clipped to their domains
    pub fn from_vector(&self, x: &ArrayView1<f64>) -> Result<Configuration> {
        self.check_dim(x.len())?;
        Ok(Configuration::new(
            self.hyperparameters
                .iter()
                .zip(x.iter())
                .map(|(hp, &t)| hp.decode(t))
                .collect(),
        ))
    }

    /// Configurations corresponding to the rows of a feature matrix
    pub fn from_array(&self, x: &ArrayView2<f64>) -> Result<Vec<Configuration>> {
        x.rows().into_iter().map(|row| self.from_vector(&row)).collect()
    }

    /// Human readable rendering `name=value, ...` of a configuration
    pub fn describe(&self, config: &Configuration) -> String {
        self.hyperparameters
            .iter()
            .zip(config.values())
            .map(|(hp, v)| format!("{}={}", hp.name(), hp.display(v)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn check_dim(&self, actual: usize) -> Result<()> {
        if actual != self.dim() {
            Err(SpaceError::DimensionError {
                expected: self.dim(),
                actual,
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ndarray_rand::rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    fn space() -> ConfigurationSpace {
        ConfigurationSpace::new(vec![
            Hyperparameter::float("learning_rate", 1e-3, 1., 0.1).log_scale(),
            Hyperparameter::int("n_estimators", 10, 110, 50),
            Hyperparameter::categorical("criterion", &["gini", "entropy"], 0),
        ])
        .unwrap()
    }

    #[test]
    fn test_duplicated_names() {
        let res = ConfigurationSpace::new(vec![
            Hyperparameter::float("x", 0., 1., 0.5),
            Hyperparameter::int("x", 0, 3, 1),
        ]);
        assert!(matches!(
            res,
            Err(SpaceError::InvalidHyperparameter { .. })
        ));
    }

    #[test]
    fn test_json_roundtrip_definition() {
        let json = r#"{"hyperparameters": [
            {"type": "float", "name": "learning_rate", "lower": 0.001, "upper": 1.0, "default": 0.1, "log": true},
            {"type": "int", "name": "n_estimators", "lower": 10, "upper": 110, "default": 50},
            {"type": "categorical", "name": "criterion", "choices": ["gini", "entropy"], "default": 0}
        ]}"#;
        let loaded = ConfigurationSpace::from_json(json).unwrap();
        assert_eq!(loaded, space());
        let again = ConfigurationSpace::from_json(&loaded.to_json().unwrap()).unwrap();
        assert_eq!(again, loaded);
    }

    #[test]
    fn test_invalid_json_definition() {
        let json = r#"{"hyperparameters": [
            {"type": "int", "name": "n", "lower": 10, "upper": 1, "default": 5}
        ]}"#;
        assert!(ConfigurationSpace::from_json(json).is_err());
    }

    #[test]
    fn test_configuration_encoding() {
        let space = space();
        let config = space.configuration(&[0.1, 60., 1.]).unwrap();
        let x = space.to_vector(&config);
        assert_abs_diff_eq!(x, array![0.6666666666666666, 0.5, 1.], epsilon = 1e-9);
        let back = space.from_vector(&x.view()).unwrap();
        assert_abs_diff_eq!(back.values()[0].as_f64(), 0.1, epsilon = 1e-12);
        assert_eq!(&back.values()[1..], &config.values()[1..]);
        assert_eq!(
            space.describe(&config),
            "learning_rate=0.1, n_estimators=60, criterion=entropy"
        );
    }

    #[test]
    fn test_configuration_errors() {
        let space = space();
        assert!(matches!(
            space.configuration(&[0.1, 60.]),
            Err(SpaceError::DimensionError {
                expected: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            space.configuration(&[2., 60., 1.]),
            Err(SpaceError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_sampled_configurations_are_valid() {
        let space = space();
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let configs = space.sample_configurations(50, &mut rng);
        assert_eq!(configs.len(), 50);
        configs
            .iter()
            .for_each(|c| assert!(space.validate(c).is_ok()));
        let x = space.to_array(&configs);
        assert_eq!(x.dim(), (50, 3));
        assert!(x.column(0).iter().all(|v| (0. ..=1.).contains(v)));
    }
}
