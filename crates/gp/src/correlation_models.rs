//! A module for correlation models used to model the error term of the GP model.
//!
//! The following correlation models are implemented:
//! * squared exponential,
//! * matern 5/2.

use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix1, Ix2, Zip};
use std::fmt;

/// A trait for using a correlation model in GP regression
pub trait CorrelationModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync {
    /// Compute correlation values r(x, x') given componentwise differences `d` (n, nx)
    /// between x and x' and `theta` hyperparameters (nx,).
    /// Returns the (n,) correlation values.
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F>;
}

/// Squared exponential correlation models
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SquaredExponentialCorr();

impl<F: Float> CorrelationModel<F> for SquaredExponentialCorr {
    ///   d
    /// prod exp( - |theta_j * d_j|^2 / 2 )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let theta2 = theta.mapv(|v| v * v);
        let r = d.mapv(|v| v * v).dot(&theta2);
        r.mapv(|v| F::exp(F::cast(-0.5) * v))
    }
}

impl fmt::Display for SquaredExponentialCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SquaredExponential")
    }
}

/// Matern 5/2 correlation models
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Matern52Corr();

impl<F: Float> CorrelationModel<F> for Matern52Corr {
    ///   d
    /// prod (1 + sqrt(5) * theta_j * |d_j| + (5./3.) * theta_j^2 * |d_j|^2) exp( - sqrt(5) * theta_j * |d_j| )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let sqrt5 = F::cast(5).sqrt();
        let div5_3 = F::cast(5. / 3.);

        let mut r = Array1::ones(d.nrows());
        Zip::from(&mut r).and(d.rows()).for_each(|r_i, d_i| {
            Zip::from(&d_i).and(theta).for_each(|d_ij, theta_j| {
                let td = *theta_j * d_ij.abs();
                *r_i *= (F::one() + sqrt5 * td + div5_3 * td * td) * F::exp(-sqrt5 * td);
            });
        });
        r
    }
}

impl fmt::Display for Matern52Corr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Matern52")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::DiffMatrix;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, array};

    #[test]
    fn test_squared_exponential() {
        let xt = array![[4.5], [1.2], [2.0], [3.0], [4.0]];
        let dm = DiffMatrix::new(&xt);
        let res = SquaredExponentialCorr::default().value(&dm.d, &arr1(&[1.]));
        let expected = dm.d.column(0).mapv(|d| f64::exp(-0.5 * d * d));
        assert_abs_diff_eq!(res, expected, epsilon = 1e-12);
        assert_abs_diff_eq!(res[0], f64::exp(-0.5 * 3.3 * 3.3), epsilon = 1e-12);
    }

    #[test]
    fn test_squared_exponential_2d() {
        let xt = array![[0., 1.], [2., 3.], [4., 5.]];
        let dm = DiffMatrix::new(&xt);
        let res = SquaredExponentialCorr::default().value(&dm.d, &arr1(&[f64::sqrt(2.), 2.]));
        let expected = array![6.14421235e-06, 1.42516408e-21, 6.14421235e-06];
        assert_abs_diff_eq!(res, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_matern52_2d() {
        let xt = array![[0., 1.], [2., 3.], [4., 5.]];
        let dm = DiffMatrix::new(&xt);
        let res = Matern52Corr::default().value(&dm.d, &arr1(&[1., 2.]));
        let expected = array![6.62391590e-04, 1.02117882e-08, 6.62391590e-04];
        assert_abs_diff_eq!(res, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_distance_is_full_correlation() {
        let d = array![[0., 0.]];
        let theta = arr1(&[0.3, 3.]);
        assert_abs_diff_eq!(SquaredExponentialCorr().value(&d, &theta)[0], 1.);
        assert_abs_diff_eq!(Matern52Corr().value(&d, &theta)[0], 1.);
    }
}
