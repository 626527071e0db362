use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2, s};

/// A structure to store (n, xdim) matrix data and its mean and standard deviation vectors.
#[derive(Debug, Clone)]
pub(crate) struct NormalizedData<F: Float> {
    /// normalized data
    pub data: Array2<F>,
    /// mean vector computed from data
    pub mean: Array1<F>,
    /// standard deviation vector computed from data
    pub std: Array1<F>,
}

impl<F: Float> NormalizedData<F> {
    /// Constructor, data is expected to have at least one row
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> NormalizedData<F> {
        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let mut std = if x.nrows() > 1 {
            x.std_axis(Axis(0), F::one())
        } else {
            Array1::ones(x.ncols())
        };
        // constant columns are left centered only
        std.mapv_inplace(|v| {
            if v == F::zero() || !v.is_finite() {
                F::one()
            } else {
                v
            }
        });
        let data = (x - &mean) / &std;
        NormalizedData { data, mean, std }
    }

    /// Normalize other points wrt data statistics
    pub fn apply(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        (x - &self.mean) / &self.std
    }
}

/// A structure to retain absolute differences computation used to compute covariance matrix
#[derive(Debug)]
pub struct DiffMatrix<F: Float> {
    /// Differences as (n_obs * (n_obs-1))/2, nx) array
    pub d: Array2<F>,
    /// Indices of the differences in the original data array
    pub d_indices: Array2<usize>,
    /// Number of observations
    pub n_obs: usize,
}

impl<F: Float> DiffMatrix<F> {
    /// Compute differences given points given as an array (n_obs, nx)
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> DiffMatrix<F> {
        let n_obs = x.nrows();
        let n_pairs = n_obs * n_obs.saturating_sub(1) / 2;
        let mut d_indices = Array2::<usize>::zeros((n_pairs, 2));
        let mut d = Array2::zeros((n_pairs, x.ncols()));
        let mut idx = 0;
        for k in 0..n_obs.saturating_sub(1) {
            let next = idx + n_obs - k - 1;
            for (r, i) in (idx..next).zip(k + 1..n_obs) {
                d_indices[[r, 0]] = k;
                d_indices[[r, 1]] = i;
            }
            let diff = &x.slice(s![k, ..]) - &x.slice(s![k + 1..n_obs, ..]);
            d.slice_mut(s![idx..next, ..]).assign(&diff.mapv(|v| v.abs()));
            idx = next;
        }
        DiffMatrix {
            d,
            d_indices,
            n_obs,
        }
    }

    /// Whether two observations share the same location
    pub fn has_duplicates(&self) -> bool {
        self.d
            .rows()
            .into_iter()
            .any(|row| row.iter().all(|v| *v == F::zero()))
    }
}

/// Computes differences between each element of x and each element of y
/// resulting in a 2d array of shape (nrows(x) * nrows(y), ncols(x));
/// *Panics* if x and y have not the same column numbers
pub fn pairwise_differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    assert!(x.ncols() == y.ncols());
    let ny = y.nrows();
    let mut result = Array2::zeros((x.nrows() * ny, x.ncols()));
    for (i, x_row) in x.rows().into_iter().enumerate() {
        let block = &x_row - y;
        result.slice_mut(s![i * ny..(i + 1) * ny, ..]).assign(&block);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_pairwise_differences() {
        let x = array![[-0.9486833], [-0.82219219]];
        let y = array![
            [-1.26491106],
            [-0.63245553],
            [0.],
            [0.63245553],
            [1.26491106]
        ];
        assert_abs_diff_eq!(
            &array![
                [0.31622777],
                [-0.31622777],
                [-0.9486833],
                [-1.58113883],
                [-2.21359436],
                [0.44271887],
                [-0.18973666],
                [-0.82219219],
                [-1.45464772],
                [-2.08710326]
            ],
            &pairwise_differences(&x, &y),
            epsilon = 1e-6
        )
    }

    #[test]
    fn test_normalized_matrix() {
        let x = array![[1., 2.], [3., 4.]];
        let xnorm = NormalizedData::new(&x);
        assert_eq!(array![2., 3.], xnorm.mean);
        assert_eq!(array![f64::sqrt(2.), f64::sqrt(2.)], xnorm.std);
    }

    #[test]
    fn test_normalized_single_row() {
        let x = array![[1., 2.]];
        let xnorm = NormalizedData::new(&x);
        assert_eq!(array![1., 1.], xnorm.std);
        assert_eq!(array![[0., 0.]], xnorm.data);
    }

    #[test]
    fn test_diff_matrix() {
        let xt = array![[0.5], [1.2], [2.0], [3.0], [4.0]];
        let expected = (
            array![
                [0.7],
                [1.5],
                [2.5],
                [3.5],
                [0.8],
                [1.8],
                [2.8],
                [1.],
                [2.],
                [1.]
            ],
            array![
                [0, 1],
                [0, 2],
                [0, 3],
                [0, 4],
                [1, 2],
                [1, 3],
                [1, 4],
                [2, 3],
                [2, 4],
                [3, 4]
            ],
        );
        let dm = DiffMatrix::new(&xt);
        assert_abs_diff_eq!(expected.0, dm.d, epsilon = 1e-12);
        assert_eq!(expected.1, dm.d_indices);
        assert!(!dm.has_duplicates());
        assert!(DiffMatrix::new(&array![[1., 2.], [1., 2.]]).has_duplicates());
    }

    #[test]
    fn test_diff_matrix_single_point() {
        let dm = DiffMatrix::new(&array![[1., 2.]]);
        assert_eq!(dm.d.nrows(), 0);
        assert_eq!(dm.n_obs, 1);
    }
}
