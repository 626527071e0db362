//! This library implements offline sequential model-based optimization (SMBO)
//! with transfer-learning surrogates.
//!
//! Evaluations are replayed from a [CandidatePool]: a closed set of
//! configurations whose performances have been recorded beforehand, failed
//! evaluations being marked with [FAILED_PERF]. The [SmboOffline] loop
//! selects one configuration per iteration and looks its performance up.
//!
//! Selection goes through three phases:
//! * initial configurations: the default configuration then random draws,
//!   or a clustered design over the candidates best ranked by previous problems,
//! * exploration: a random unevaluated candidate when the [RandomChooser] fires,
//! * exploitation: the candidate maximizing the acquisition function
//!   ([ExpectedImprovement] or [TransferAcquisition]) given the trained surrogate.
//!
//! Surrogates implement [SurrogateModel]:
//! * [GpSurrogate]: a GP fitted on the target observations only,
//! * [Rgpe]: ranking-weighted ensemble of source GPs and the target GP,
//! * [RandomSurrogate]: uniform random predictions, a random search baseline,
//! * [SourceEnsemble]: average of source GPs used to rank the pool for the initial design.
//!
//! Runs are assessed with the average distance to the minimum
//! ([SmboOffline::get_adtm]) and saved with a [RunRecorder].
//!
//! ```no_run
//! use tlbo_smbo::{CandidatePool, Rgpe, SmboConfig, SmboOffline, SourceData, SurrogateKind};
//! use tlbo_space::{ConfigurationSpace, Hyperparameter};
//!
//! let space = ConfigurationSpace::new(vec![Hyperparameter::float("x", 0., 1., 0.5)])?;
//! let configs: Vec<_> = (0..100)
//!     .map(|i| space.configuration(&[i as f64 / 99.]))
//!     .collect::<Result<_, _>>()?;
//! let perf = |x: f64, opt: f64| (x - opt).powi(2);
//! let source_perfs = configs.iter().map(|c| perf(c.raw_values()[0], 0.25)).collect();
//! let target_perfs = configs.iter().map(|c| perf(c.raw_values()[0], 0.3)).collect();
//! let source = CandidatePool::new(&space, configs.clone(), source_perfs)?;
//! let target = CandidatePool::new(&space, configs, target_perfs)?;
//!
//! let model = Rgpe::new(SurrogateKind::Gp, &[SourceData::from_pool(&source, 50)], 50, 0)?;
//! let config = SmboConfig::default().max_iterations(20).seed(0).check()?;
//! let mut smbo = SmboOffline::new(config, space, target, model)?;
//! smbo.run()?;
//! println!("adtm = {}", smbo.get_adtm()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
mod chooser;
mod criteria;
mod data;
mod errors;
mod history;
mod initial_design;
mod optimizer;
mod pool;
mod recorder;
mod smbo_config;
mod smbo_offline;
mod surrogates;
mod types;
pub mod utils;

pub use chooser::*;
pub use criteria::*;
pub use data::*;
pub use errors::*;
pub use history::*;
pub use initial_design::*;
pub use optimizer::*;
pub use pool::*;
pub use recorder::*;
pub use smbo_config::*;
pub use smbo_offline::*;
pub use surrogates::*;
pub use types::*;
