use crate::correlation_models::*;
use crate::errors::{GpError, Result};
use crate::optimization::{CobylaParams, as_f64, optimize_params, prepare_multistart};
use crate::parameters::{GpParams, GpValidParams};
use crate::utils::{DiffMatrix, NormalizedData, pairwise_differences};

use linfa::prelude::{DatasetBase, Fit, Float};
use linfa_linalg::{cholesky::*, triangular::*};

use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

use log::{debug, warn};
use rayon::prelude::*;
use std::fmt;
use std::time::Instant;

/// Default number of multistart for hyperparameters optimization
pub const GP_OPTIM_N_START: usize = 10;
/// Minimum of function evaluations for COBYLA optimizer
pub const GP_COBYLA_MIN_EVAL: usize = 25;
/// Maximum of function evaluations for COBYLA optimizer
pub const GP_COBYLA_MAX_EVAL: usize = 1000;

/// Internal parameters computed Gp during training
/// used later on in prediction computations
#[derive(Debug, Clone)]
pub(crate) struct GpInnerParams<F: Float> {
    /// Gaussian process variance
    sigma2: F,
    /// Constant mean estimated by generalized least-squares
    beta: F,
    /// Gaussian Process weights
    gamma: Array2<F>,
    /// Cholesky decomposition of the correlation matrix \[R\]
    r_chol: Array2<F>,
    /// Solution of the linear equation system : \[R\] x Ft = 1
    ft: Array2<F>,
    /// Norm of Ft, R factor of its QR decomposition
    ft_norm: F,
}

/// A GP regression is an interpolation method where the
/// interpolated values are modeled by a Gaussian process with a constant mean and
/// governed by a prior covariance kernel, which depends on some
/// parameters to be determined.
///
/// The interpolated output is modeled as stochastic process as follows:
///
/// `Y(x) = beta + Z(x)`
///
/// where:
/// * `beta` is the trend i.e. the constant mean of the gaussian process
/// * `Z(x)` the realization of stochastic gaussian process ~ `Normal(0, sigma^2)`
///   whose covariance is `sigma^2 * corr(x, x')`, `corr` depending on a set of
///   `thetas` parameters estimated by maximum likelihood.
///
/// # Example
///
/// ```no_run
/// use tlbo_gp::{correlation_models::*, GaussianProcess};
/// use linfa::prelude::*;
/// use ndarray::{array, Array1, Array2};
///
/// let xt = array![[0.0], [5.0], [10.0], [15.0], [18.0], [20.0], [25.0]];
/// let yt = xt.column(0).mapv(|v: f64| (v / 5.).sin() * v);
///
/// let gp = GaussianProcess::<f64, _>::params(SquaredExponentialCorr())
///     .fit(&Dataset::new(xt, yt))
///     .expect("GP fitted");
///
/// let (mean, variance) = gp.predict_valvar(&array![[1.0], [12.0]]).expect("predicted");
/// println!("mean = {mean}, variance = {variance}");
/// ```
#[derive(Debug, Clone)]
pub struct GaussianProcess<F: Float, Corr: CorrelationModel<F>> {
    /// Parameter of the autocorrelation model equal to the inverse of length scale
    theta: Array1<F>,
    /// Reduced likelihood value (result from internal optimization)
    likelihood: F,
    /// Gaussian process internal fitted params
    inner_params: GpInnerParams<F>,
    /// Training inputs
    xt_norm: NormalizedData<F>,
    /// Training outputs
    yt_norm: NormalizedData<F>,
    /// Parameters used to fit this model
    params: GpValidParams<F, Corr>,
}

impl<F: Float, Corr: CorrelationModel<F>> fmt::Display for GaussianProcess<F, Corr> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "GP(corr={}, theta={}, variance={}, likelihood={})",
            self.params.corr, self.theta, self.inner_params.sigma2, self.likelihood,
        )
    }
}

impl<F: Float, Corr: CorrelationModel<F>> GaussianProcess<F, Corr> {
    /// Gp parameters contructor
    pub fn params(corr: Corr) -> GpParams<F, Corr> {
        GpParams::new(corr)
    }

    /// Predict output values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns n scalar output values as a vector (n,).
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        self.check_input(x)?;
        let xnorm = self.xt_norm.apply(x);
        let corr = self.compute_correlation(&xnorm);
        Ok(self.mean_from_correlation(&corr))
    }

    /// Predict variance values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns n variance values as (n,) column vector.
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        self.check_input(x)?;
        let xnorm = self.xt_norm.apply(x);
        let corr = self.compute_correlation(&xnorm);
        self.variance_from_correlation(&corr)
    }

    /// Predict both output values and variance at n given `x` points of nx components
    pub fn predict_valvar(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        self.check_input(x)?;
        let xnorm = self.xt_norm.apply(x);
        let corr = self.compute_correlation(&xnorm);
        let mean = self.mean_from_correlation(&corr);
        let var = self.variance_from_correlation(&corr)?;
        Ok((mean, var))
    }

    fn check_input(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<()> {
        if x.ncols() != self.xt_norm.data.ncols() {
            return Err(GpError::InvalidDataError(format!(
                "Expected {} input features, got {}",
                self.xt_norm.data.ncols(),
                x.ncols()
            )));
        }
        Ok(())
    }

    fn mean_from_correlation(&self, corr: &Array2<F>) -> Array1<F> {
        // Scaled predictor
        let y_ = corr
            .dot(&self.inner_params.gamma)
            .mapv(|v| v + self.inner_params.beta);
        (&y_ * &self.yt_norm.std + &self.yt_norm.mean).remove_axis(Axis(1))
    }

    fn variance_from_correlation(&self, corr: &Array2<F>) -> Result<Array1<F>> {
        let inners = &self.inner_params;
        let rt = inners
            .r_chol
            .solve_triangular(&corr.t().to_owned(), UPLO::Lower)?;
        // Regression term: f(x) = 1 for the constant mean
        let u = inners
            .ft
            .t()
            .dot(&rt)
            .mapv(|v| (v - F::one()) / inners.ft_norm);

        let mse = Array1::<F>::ones(rt.ncols()) - rt.mapv(|v| v * v).sum_axis(Axis(0))
            + u.mapv(|v| v * v).sum_axis(Axis(0));

        // Mean Squared Error might be slightly negative depending on
        // machine precision: set to zero in that case
        Ok(mse.mapv(|v| {
            let v = inners.sigma2 * v;
            if v < F::zero() { F::zero() } else { v }
        }))
    }

    /// Compute correlation matrix given normalized x points specified as a (n, nx) matrix
    fn compute_correlation(&self, xnorm: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        let dx = pairwise_differences(xnorm, &self.xt_norm.data);
        let r = self.params.corr.value(&dx, &self.theta);
        let n_obs = xnorm.nrows();
        let nt = self.xt_norm.data.nrows();
        r.into_shape((n_obs, nt))
            .unwrap_or_else(|_| Array2::zeros((n_obs, nt)))
    }

    /// Optimal theta
    pub fn theta(&self) -> &Array1<F> {
        &self.theta
    }

    /// Estimated variance
    pub fn variance(&self) -> F {
        self.inner_params.sigma2
    }

    /// Estimated constant mean in output space
    pub fn mean(&self) -> F {
        self.inner_params.beta * self.yt_norm.std[0] + self.yt_norm.mean[0]
    }

    /// Retrieve reduced likelihood value
    pub fn likelihood(&self) -> F {
        self.likelihood
    }

    /// Number of training points
    pub fn n_obs(&self) -> usize {
        self.xt_norm.data.nrows()
    }

    /// Input dimension
    pub fn dim(&self) -> usize {
        self.xt_norm.data.ncols()
    }
}

impl<F: Float, Corr: CorrelationModel<F>, D: Data<Elem = F>>
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, GpError> for GpValidParams<F, Corr>
{
    type Object = GaussianProcess<F, Corr>;

    /// Fit GP parameters using maximum likelihood
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets().to_owned().insert_axis(Axis(1));

        if x.nrows() == 0 {
            return Err(GpError::InvalidDataError(
                "Cannot fit a GP without training data".to_string(),
            ));
        }
        if x.nrows() != y.nrows() {
            return Err(GpError::InvalidDataError(format!(
                "Training inputs ({}) and outputs ({}) sizes mismatch",
                x.nrows(),
                y.nrows()
            )));
        }

        let dim = x.ncols();
        let init = self.theta_tuning().init();
        let theta0 = if init.len() == 1 {
            Array1::from_elem(dim, init[0])
        } else if init.len() == dim {
            init.to_owned()
        } else {
            return Err(GpError::InvalidParamsError(format!(
                "Initial guess for theta should be either 1-dim or dim of xtrain ({dim}), got {}",
                init.len()
            )));
        };

        let xtrain = NormalizedData::new(x);
        let ytrain = NormalizedData::new(&y);

        let x_distances = DiffMatrix::new(&xtrain.data);
        if x_distances.has_duplicates() {
            warn!("Multiple x input features have the same value (at least same row twice).");
        }

        let bounds = match self.theta_tuning().bounds() {
            // No correlation to learn from a single point
            Some(bounds) if x_distances.n_obs >= 2 => Some(bounds),
            _ => None,
        };
        let opt_theta = if let Some((lower, upper)) = bounds {
            let base: f64 = 10.;
            let objfn = |x: &[f64], _gradient: Option<&mut [f64]>, _params: &mut ()| -> f64 {
                if x.iter().any(|v| v.is_nan()) {
                    // shortcut return worst value wrt to rlf minimization
                    return f64::INFINITY;
                }
                let theta: Array1<F> = x.iter().map(|v| F::cast(base.powf(*v))).collect();
                let rxx = self.corr().value(&x_distances.d, &theta);
                match reduced_likelihood(rxx, &x_distances, &ytrain, self.nugget()) {
                    Ok(r) => -as_f64(r.0),
                    Err(_) => f64::INFINITY,
                }
            };

            let bounds = vec![(lower, upper); dim];
            let mut rng = Xoshiro256Plus::seed_from_u64(self.seed());
            let (theta_inits, bounds) =
                prepare_multistart(self.n_start(), &theta0, &bounds, &mut rng);
            debug!("Optimize with multistart theta = {theta_inits:?} and bounds = {bounds:?}");
            let now = Instant::now();
            let opt_params = (0..theta_inits.nrows())
                .into_par_iter()
                .map(|i| {
                    optimize_params(
                        objfn,
                        &theta_inits.row(i).to_vec(),
                        &bounds,
                        CobylaParams {
                            maxeval: (10 * theta_inits.ncols())
                                .clamp(GP_COBYLA_MIN_EVAL, self.max_eval()),
                            ..CobylaParams::default()
                        },
                    )
                })
                .reduce(
                    || (f64::INFINITY, theta_inits.row(0).to_owned()),
                    |a, b| if b.0 < a.0 { b } else { a },
                );
            debug!("elapsed optim = {:?}", now.elapsed().as_millis());
            opt_params.1.mapv(|v| F::cast(base.powf(v)))
        } else {
            theta0
        };

        let rxx = self.corr().value(&x_distances.d, &opt_theta);
        let (lkh, inner_params) = reduced_likelihood(rxx, &x_distances, &ytrain, self.nugget())?;
        Ok(GaussianProcess {
            theta: opt_theta,
            likelihood: lkh,
            inner_params,
            xt_norm: xtrain,
            yt_norm: ytrain,
            params: self.clone(),
        })
    }
}

/// Compute reduced likelihood function of ordinary kriging
/// rxx: correlation factors at x samples,
/// x_distances: pairwise distances between x samples
/// ytrain: normalized output training values
/// nugget: factor to improve numerical stability
fn reduced_likelihood<F: Float>(
    rxx: Array1<F>,
    x_distances: &DiffMatrix<F>,
    ytrain: &NormalizedData<F>,
    nugget: F,
) -> Result<(F, GpInnerParams<F>)> {
    // Set up R
    let mut r_mx: Array2<F> = Array2::<F>::eye(x_distances.n_obs).mapv(|v| v + v * nugget);
    for (i, ij) in x_distances.d_indices.outer_iter().enumerate() {
        r_mx[[ij[0], ij[1]]] = rxx[i];
        r_mx[[ij[1], ij[0]]] = rxx[i];
    }
    let fx = Array2::<F>::ones((x_distances.n_obs, 1));
    // R cholesky decomposition
    let r_chol = r_mx.cholesky()?;
    // Solve generalized least squared problem, Ft has a single column
    let ft = r_chol.solve_triangular(&fx, UPLO::Lower)?;
    let ft_norm = ft.column(0).dot(&ft.column(0)).sqrt();
    if ft_norm < F::cast(1e-10) {
        return Err(GpError::IllConditionedError(
            "ft is too ill conditioned, try another theta again".to_string(),
        ));
    }
    let yt = r_chol.solve_triangular(&ytrain.data, UPLO::Lower)?;

    let beta = ft.column(0).dot(&yt.column(0)) / (ft_norm * ft_norm);
    let rho = yt - ft.mapv(|v| v * beta);
    let rho_sqr = rho.mapv(|v| v * v).sum();

    let gamma = r_chol.t().solve_triangular_into(rho, UPLO::Upper)?;
    // The determinant of R is equal to the squared product of
    // the diagonal elements of its Cholesky decomposition r_chol
    let n_obs: F = F::cast(x_distances.n_obs);

    let logdet = r_chol.diag().mapv(|v: F| v.log10()).sum() * F::cast(2.) / n_obs;

    // Constant outputs give a null variance
    let sigma2 = (rho_sqr / n_obs).max(F::epsilon());
    let reduced_likelihood = -n_obs * (sigma2.log10() + logdet);

    Ok((
        reduced_likelihood,
        GpInnerParams {
            sigma2: sigma2 * ytrain.std[0] * ytrain.std[0],
            beta,
            gamma,
            r_chol,
            ft,
            ft_norm,
        },
    ))
}
