use linfa::prelude::Float;
use ndarray::{Array1, Array2, arr1};
use ndarray_rand::rand::Rng;
use num_traits::ToPrimitive;

pub(crate) struct CobylaParams {
    pub rhobeg: f64,
    pub ftol_rel: f64,
    pub maxeval: usize,
}

impl Default for CobylaParams {
    fn default() -> Self {
        CobylaParams {
            rhobeg: 0.5,
            ftol_rel: 1e-4,
            maxeval: 200,
        }
    }
}

/// Build `n_start + 1` starting points on log10 scale: the given `theta0`
/// followed by points drawn uniformly within log10 bounds.
/// Returns starting points as rows and log10 bounds.
pub(crate) fn prepare_multistart<F: Float, R: Rng>(
    n_start: usize,
    theta0: &Array1<F>,
    bounds: &[(F, F)],
    rng: &mut R,
) -> (Array2<f64>, Vec<(f64, f64)>) {
    let bounds: Vec<(f64, f64)> = bounds
        .iter()
        .map(|(lo, up)| (as_f64(lo.log10()), as_f64(up.log10())))
        .collect();

    let mut theta0s = Array2::zeros((n_start + 1, theta0.len()));
    theta0s
        .row_mut(0)
        .assign(&theta0.mapv(|v| as_f64(v.log10())));
    for mut row in theta0s.rows_mut().into_iter().skip(1) {
        row.iter_mut()
            .zip(bounds.iter())
            .for_each(|(v, (lo, up))| *v = rng.gen_range(*lo..=*up));
    }
    (theta0s, bounds)
}

/// Optimize gp hyper parameters given an initial guess and bounds with cobyla
pub(crate) fn optimize_params<ObjF>(
    objfn: ObjF,
    param0: &[f64],
    bounds: &[(f64, f64)],
    cobyla: CobylaParams,
) -> (f64, Array1<f64>)
where
    ObjF: Fn(&[f64], Option<&mut [f64]>, &mut ()) -> f64,
{
    use cobyla::{Func, StopTols, minimize};

    let cons: Vec<&dyn Func<()>> = vec![];
    match minimize(
        |x, u| objfn(x, None, u),
        param0,
        bounds,
        &cons,
        (),
        cobyla.maxeval,
        cobyla::RhoBeg::All(cobyla.rhobeg),
        Some(StopTols {
            ftol_rel: cobyla.ftol_rel,
            ..StopTols::default()
        }),
    ) {
        Ok((_, x_opt, fval)) => {
            let fval = if f64::is_nan(fval) {
                f64::INFINITY
            } else {
                fval
            };
            (fval, arr1(&x_opt))
        }
        Err((status, x_opt, _)) => {
            log::warn!("Cobyla optimizer failed in GP status={status:?}");
            (f64::INFINITY, arr1(&x_opt))
        }
    }
}

#[inline(always)]
pub(crate) fn as_f64<F: Float>(v: F) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}
