use libm::erfc;
use ndarray::{ArrayBase, Data, Ix1};

const SQRT_2PI: f64 = 2.5066282746310007;

/// Cumulative distribution function of Standard Normal at x
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Probability density function of Standard Normal at x
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / SQRT_2PI
}

/// Mean and standard deviation (ddof = 0) of `y`, std being 1 for
/// constant or empty input so that standardization is always defined.
pub fn mean_std<S: Data<Elem = f64>>(y: &ArrayBase<S, Ix1>) -> (f64, f64) {
    let mean = y.mean().unwrap_or(0.);
    let std = y.std(0.);
    if std > f64::EPSILON && std.is_finite() {
        (mean, std)
    } else {
        (mean, 1.)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};

    #[test]
    fn test_norm() {
        assert_abs_diff_eq!(norm_cdf(0.), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(norm_cdf(1.96), 0.9750021048517795, epsilon = 1e-9);
        assert_abs_diff_eq!(norm_pdf(0.), 0.3989422804014327, epsilon = 1e-12);
    }

    #[test]
    fn test_mean_std() {
        assert_eq!(mean_std(&Array1::<f64>::zeros(0)), (0., 1.));
        assert_eq!(mean_std(&array![2., 2.]), (2., 1.));
        let (m, s) = mean_std(&array![1., 3.].view());
        assert_abs_diff_eq!(m, 2.);
        assert_abs_diff_eq!(s, 1.);
    }
}
