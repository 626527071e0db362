use crate::errors::{Result, SmboError};
use crate::surrogates::SurrogateModel;

use ndarray::{Array, Array1, ArrayView1, ArrayView2};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;
use std::sync::Mutex;

/// Surrogate predicting uniform random means with unit variance,
/// turning the loop into a random search baseline.
#[derive(Debug)]
pub struct RandomSurrogate {
    rng: Mutex<Xoshiro256Plus>,
}

impl RandomSurrogate {
    /// A random surrogate drawing from its own seeded stream
    pub fn new(seed: u64) -> Self {
        RandomSurrogate {
            rng: Mutex::new(Xoshiro256Plus::seed_from_u64(seed)),
        }
    }
}

impl SurrogateModel for RandomSurrogate {
    fn name(&self) -> &'static str {
        "rs"
    }

    fn train(&mut self, _x: &ArrayView2<f64>, _y: &ArrayView1<f64>) -> Result<()> {
        Ok(())
    }

    fn predict_valvar(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| SmboError::InvalidValue("random surrogate state poisoned".to_string()))?;
        let mean = Array::random_using(x.nrows(), Uniform::new(0., 1.), &mut *rng);
        Ok((mean, Array1::ones(x.nrows())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_random_predictions() {
        let model = RandomSurrogate::new(3);
        let x = Array2::<f64>::zeros((50, 2));
        let (m1, v) = model.predict_valvar(&x.view()).unwrap();
        let (m2, _) = model.predict_valvar(&x.view()).unwrap();
        assert!(m1.iter().all(|v| (0. ..1.).contains(v)));
        assert_eq!(v, Array1::<f64>::ones(50));
        assert_ne!(m1, m2);
    }
}
