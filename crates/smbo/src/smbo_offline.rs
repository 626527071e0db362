//! Offline sequential model-based optimization loop.
//!
//! Each iteration selects one configuration of the candidate pool, either
//! from the initial design, by random sampling or by maximizing the
//! acquisition function over the unselected candidates, and resolves its
//! performance by pool lookup.
use crate::chooser::RandomChooser;
use crate::criteria::{Acquisition, AcquisitionFunction};
use crate::errors::{Result, SmboError};
use crate::history::{TrialHistory, TrialRecord};
use crate::initial_design::clustered_initial_design;
use crate::optimizer::OfflineSearch;
use crate::pool::CandidatePool;
use crate::smbo_config::ValidSmboConfig;
use crate::surrogates::SurrogateModel;
use crate::types::*;

use log::{debug, error, info, warn};
use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use std::time::Instant;
use tlbo_space::{Configuration, ConfigurationSpace};

/// Offline SMBO loop replaying pre-recorded performances of a candidate pool.
///
/// ```no_run
/// use tlbo_smbo::{CandidatePool, GpSurrogate, SmboConfig, SmboOffline, SurrogateKind};
/// use tlbo_space::{ConfigurationSpace, Hyperparameter};
///
/// let space = ConfigurationSpace::new(vec![Hyperparameter::float("x", 0., 1., 0.5)])?;
/// let configs: Vec<_> = (0..50)
///     .map(|i| space.configuration(&[i as f64 / 49.]))
///     .collect::<Result<_, _>>()?;
/// let perfs = configs.iter().map(|c| (c.raw_values()[0] - 0.3).powi(2)).collect();
/// let pool = CandidatePool::new(&space, configs, perfs)?;
///
/// let config = SmboConfig::default().max_iterations(20).seed(42).check()?;
/// let model = GpSurrogate::new(SurrogateKind::Gp, 42);
/// let mut smbo = SmboOffline::new(config, space, pool, model)?;
/// smbo.run()?;
/// println!("best = {}, adtm = {}", smbo.get_inc_y()?, smbo.get_adtm()?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SmboOffline<M: SurrogateModel> {
    config: ValidSmboConfig,
    space: ConfigurationSpace,
    pool: CandidatePool,
    model: M,
    acquisition: Acquisition,
    optimizer: OfflineSearch,
    chooser: RandomChooser,
    history: TrialHistory,
    /// selected[i] is true when pool configuration i has been evaluated
    selected: Vec<bool>,
    initial_configurations: Option<Vec<Configuration>>,
    init_num: usize,
    iteration_id: usize,
    default_obj_value: f64,
    y_bounds: Option<(f64, f64)>,
    seed: u64,
    rng: Xoshiro256Plus,
}

impl<M: SurrogateModel> SmboOffline<M> {
    /// A loop without clustered initial design: the first `init_num` successful
    /// evaluations come from the default configuration then random sampling.
    pub fn new(
        config: ValidSmboConfig,
        space: ConfigurationSpace,
        pool: CandidatePool,
        model: M,
    ) -> Result<Self> {
        Self::build(config, space, pool, model, None)
    }

    /// A loop whose initial configurations are chosen by clustering the
    /// candidates best ranked by `ranker` when the initial design is enabled.
    pub fn with_initial_design(
        config: ValidSmboConfig,
        space: ConfigurationSpace,
        pool: CandidatePool,
        model: M,
        ranker: &dyn SurrogateModel,
    ) -> Result<Self> {
        Self::build(config, space, pool, model, Some(ranker))
    }

    fn build(
        config: ValidSmboConfig,
        space: ConfigurationSpace,
        pool: CandidatePool,
        model: M,
        ranker: Option<&dyn SurrogateModel>,
    ) -> Result<Self> {
        if pool.is_empty() {
            return Err(SmboError::EmptyPoolError);
        }
        if pool.x().ncols() != space.dim() {
            return Err(SmboError::InvalidValue(format!(
                "Pool configurations have {} features, space has {} hyperparameters",
                pool.x().ncols(),
                space.dim()
            )));
        }
        let acquisition = Acquisition::new(config.acquisition());
        if acquisition.kind() == AcquisitionKind::Taf && model.ensemble().is_none() {
            return Err(SmboError::InvalidConfigError(format!(
                "Acquisition {} requires an ensemble surrogate, got {}",
                acquisition.kind(),
                model.name()
            )));
        }

        let seed = config
            .seed()
            .unwrap_or_else(|| Xoshiro256Plus::from_entropy().gen());
        let rng = Xoshiro256Plus::seed_from_u64(seed);
        let mut chooser_rng = rng.clone();
        chooser_rng.jump();
        let mut design_rng = chooser_rng.clone();
        design_rng.jump();
        let chooser = RandomChooser::new(config.random_chooser(), chooser_rng)?;

        let (initial_configurations, init_num) = if config.init_design() {
            let ranker = ranker.ok_or_else(|| {
                SmboError::InvalidConfigError(
                    "Initial design is enabled but no ranking surrogate is given".to_string(),
                )
            })?;
            let design = clustered_initial_design(
                ranker,
                &pool,
                config.init_num(),
                config.init_top_k(),
                design_rng,
            )?;
            let n = design.len();
            (Some(design), n)
        } else {
            (None, config.init_num())
        };

        let y_bounds = pool.perf_bounds();
        if y_bounds.is_none() {
            warn!("Every configuration of the pool failed");
        }
        let selected = vec![false; pool.len()];
        Ok(SmboOffline {
            config,
            space,
            pool,
            model,
            acquisition,
            optimizer: OfflineSearch::default(),
            chooser,
            history: TrialHistory::new(),
            selected,
            initial_configurations,
            init_num,
            iteration_id: 0,
            default_obj_value: FAILED_PERF,
            y_bounds,
            seed,
            rng,
        })
    }

    /// Set the acquisition optimizer
    pub fn optimizer(mut self, optimizer: OfflineSearch) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Run one iteration: select a configuration then observe its performance
    pub fn iterate(&mut self) -> Result<Trial> {
        let config = self.suggest()?;
        self.observe(config)
    }

    /// Iterate until the iteration budget is exhausted
    pub fn run(&mut self) -> Result<()> {
        while self.iteration_id < self.config.max_iterations() {
            self.iterate()?;
        }
        info!(
            "Run finished after {} iterations: {} successes, {} failures, incumbent {:?}",
            self.iteration_id,
            self.history.n_successes(),
            self.history.n_failures(),
            self.history.incumbent_value()
        );
        Ok(())
    }

    /// Choose the next configuration to evaluate
    pub fn suggest(&mut self) -> Result<Configuration> {
        let n_successes = self.history.n_successes();
        if n_successes < self.init_num {
            return Ok(self.initial_choice());
        }
        if self.chooser.check(self.iteration_id) {
            debug!("Iteration-{}: random configuration", self.iteration_id + 1);
            return Ok(self.sample_random_configuration());
        }
        if n_successes == 0 {
            debug!("No successful evaluation to fit the surrogate, sample randomly");
            return Ok(self.sample_random_configuration());
        }
        self.exploit()
    }

    /// Resolve the performance of `config` by pool lookup and record it.
    ///
    /// An already evaluated configuration is not looked up again: its recorded
    /// outcome is returned. Every call consumes one iteration.
    pub fn observe(&mut self, config: Configuration) -> Result<Trial> {
        let trial = if let Some(record) = self.history.get(&config) {
            debug!("This configuration has been evaluated! Skip it.");
            Trial {
                configuration: config,
                state: record.state,
                perf: record.perf,
                info: None,
            }
        } else {
            let pool_index = self.pool.index_of(&config).ok_or_else(|| {
                SmboError::InvalidValue(format!("Configuration {config} is not in the pool"))
            })?;
            let perf = self.pool.perf(pool_index);
            let (state, info) = if is_failed_perf(perf) {
                error!("{FAILED_INFO}");
                (TrialState::Failed, Some(FAILED_INFO.to_string()))
            } else {
                if self.history.n_successes() == 0 {
                    self.default_obj_value = perf;
                }
                (TrialState::Success, None)
            };
            self.history.add(TrialRecord {
                configuration: config.clone(),
                pool_index,
                perf,
                state,
                iteration: self.iteration_id,
            })?;
            self.selected[pool_index] = true;
            Trial {
                configuration: config,
                state,
                perf,
                info,
            }
        };

        self.iteration_id += 1;
        info!(
            "Iteration-{}, objective improvement: {:.4}",
            self.iteration_id,
            f64::max(0., self.default_obj_value - trial.perf)
        );
        Ok(trial)
    }

    fn initial_choice(&mut self) -> Configuration {
        let next = match &self.initial_configurations {
            Some(design) => design.iter().find(|c| !self.history.contains(c)).cloned(),
            None => {
                let default = self.space.default_configuration();
                if self.history.contains(&default) {
                    None
                } else if self.pool.contains(&default) {
                    Some(default)
                } else {
                    debug!("Default configuration {default} is not in the pool");
                    None
                }
            }
        };
        next.unwrap_or_else(|| self.sample_random_configuration())
    }

    /// Uniform draw over the whole pool rejecting evaluated configurations,
    /// an evaluated one being accepted after `max_rejections` consecutive rejections
    fn sample_random_configuration(&mut self) -> Configuration {
        let mut rejections = 0;
        loop {
            let i = self.rng.gen_range(0..self.pool.len());
            if !self.selected[i] {
                return self.pool.configuration(i).clone();
            }
            rejections += 1;
            if rejections >= self.config.max_rejections() {
                debug!("Accept already evaluated configuration after {rejections} rejections");
                return self.pool.configuration(i).clone();
            }
        }
    }

    fn exploit(&mut self) -> Result<Configuration> {
        let (x, y) = self.training_data();
        let now = Instant::now();
        self.model.train(&x.view(), &y.view())?;
        debug!(
            "Training {} surrogate on {} points took {:.3}s",
            self.model.name(),
            y.len(),
            now.elapsed().as_secs_f64()
        );

        let eta = self
            .history
            .incumbent_value()
            .ok_or_else(|| SmboError::InvalidValue("No incumbent to improve on".to_string()))?;
        self.acquisition
            .update(&self.model, eta, self.history.n_successes())?;
        let ranked = self.optimizer.maximize(
            &self.acquisition,
            &self.model,
            &self.pool,
            &self.selected,
            1,
        )?;
        match ranked.first() {
            Some((i, _)) => Ok(self.pool.configuration(*i).clone()),
            None => Err(SmboError::PoolExhaustedError(self.pool.len())),
        }
    }

    /// Encoded configurations and performances of successful evaluations
    pub fn training_data(&self) -> (Array2<f64>, Array1<f64>) {
        let idx: Vec<usize> = self.history.successes().map(|r| r.pool_index).collect();
        let y: Array1<f64> = self.history.successes().map(|r| r.perf).collect();
        (self.pool.x().select(Axis(0), &idx), y)
    }

    /// Normalized distance of the incumbent to the pool minimum:
    /// `(min(perfs) - y_min) / (y_max - y_min)`
    pub fn get_adtm(&self) -> Result<f64> {
        let inc = self.get_inc_y()?;
        let (y_min, y_max) = self.y_bounds.ok_or_else(|| {
            SmboError::InvalidValue("No successful performance in the pool".to_string())
        })?;
        if y_max == y_min {
            return Err(SmboError::InvalidValue(format!(
                "ADTM undefined for constant pool performances ({y_min})"
            )));
        }
        Ok((inc - y_min) / (y_max - y_min))
    }

    /// Best observed performance
    pub fn get_inc_y(&self) -> Result<f64> {
        self.history
            .incumbent_value()
            .ok_or_else(|| SmboError::InvalidValue("No successful evaluation yet".to_string()))
    }

    /// Number of completed iterations
    pub fn iteration_id(&self) -> usize {
        self.iteration_id
    }

    /// Iteration budget
    pub fn max_iterations(&self) -> usize {
        self.config.max_iterations()
    }

    /// Performance of the first successful evaluation ([FAILED_PERF] before it)
    pub fn default_obj_value(&self) -> f64 {
        self.default_obj_value
    }

    /// Evaluation log
    pub fn history(&self) -> &TrialHistory {
        &self.history
    }

    /// Successfully evaluated configurations
    pub fn configurations(&self) -> Vec<Configuration> {
        self.history.configurations()
    }

    /// Performances aligned with [SmboOffline::configurations]
    pub fn perfs(&self) -> Vec<f64> {
        self.history.perfs()
    }

    /// Configurations whose evaluation failed
    pub fn failed_configurations(&self) -> Vec<Configuration> {
        self.history.failed_configurations()
    }

    /// Candidate pool
    pub fn pool(&self) -> &CandidatePool {
        &self.pool
    }

    /// Configuration space
    pub fn space(&self) -> &ConfigurationSpace {
        &self.space
    }

    /// Minimum non failed performance of the pool
    pub fn y_min(&self) -> Option<f64> {
        self.y_bounds.map(|b| b.0)
    }

    /// Maximum non failed performance of the pool
    pub fn y_max(&self) -> Option<f64> {
        self.y_bounds.map(|b| b.1)
    }

    /// Number of initial configurations
    pub fn init_num(&self) -> usize {
        self.init_num
    }

    /// Configurations of the clustered initial design, if enabled
    pub fn initial_configurations(&self) -> Option<&[Configuration]> {
        self.initial_configurations.as_deref()
    }

    /// Surrogate model
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Loop configuration
    pub fn config(&self) -> &ValidSmboConfig {
        &self.config
    }

    /// Seed of the loop random streams
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smbo_config::SmboConfig;
    use crate::surrogates::{GpSurrogate, RandomSurrogate};
    use approx::assert_abs_diff_eq;
    use tlbo_space::Hyperparameter;

    fn quadratic_pool(n: usize) -> (ConfigurationSpace, CandidatePool) {
        let space =
            ConfigurationSpace::new(vec![Hyperparameter::float("x", 0., 1., 0.5)]).unwrap();
        let configs: Vec<_> = (0..n)
            .map(|i| space.configuration(&[i as f64 / (n - 1) as f64]).unwrap())
            .collect();
        let perfs = configs
            .iter()
            .map(|c| (c.raw_values()[0] - 0.3).powi(2))
            .collect();
        let pool = CandidatePool::new(&space, configs, perfs).unwrap();
        (space, pool)
    }

    #[test]
    fn test_gp_loop_finds_minimum() {
        let (space, pool) = quadratic_pool(41);
        let config = SmboConfig::default()
            .max_iterations(15)
            .seed(42)
            .check()
            .unwrap();
        let mut smbo =
            SmboOffline::new(config, space, pool, GpSurrogate::new(SurrogateKind::Gp, 0)).unwrap();
        smbo.run().unwrap();
        assert_eq!(smbo.iteration_id(), 15);
        assert_eq!(smbo.history().len(), 15);
        assert!(smbo.get_inc_y().unwrap() < 1e-2);
        let adtm = smbo.get_adtm().unwrap();
        assert!((0. ..=1.).contains(&adtm));
        // default configuration x = 0.5 is evaluated first
        assert_abs_diff_eq!(smbo.default_obj_value(), 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_taf_requires_ensemble_model() {
        let (space, pool) = quadratic_pool(5);
        let config = SmboConfig::default()
            .acquisition(AcquisitionKind::Taf)
            .check()
            .unwrap();
        assert!(matches!(
            SmboOffline::new(config, space, pool, RandomSurrogate::new(0)),
            Err(SmboError::InvalidConfigError(_))
        ));
    }

    #[test]
    fn test_initial_design_requires_ranker() {
        let (space, pool) = quadratic_pool(5);
        let config = SmboConfig::default().init_design(true).check().unwrap();
        assert!(matches!(
            SmboOffline::new(config, space, pool, RandomSurrogate::new(0)),
            Err(SmboError::InvalidConfigError(_))
        ));
    }

    #[test]
    fn test_observe_rejects_unknown_configuration() {
        let (space, pool) = quadratic_pool(5);
        let config = SmboConfig::default().seed(0).check().unwrap();
        let outside = space.configuration(&[0.33]).unwrap();
        let mut smbo = SmboOffline::new(config, space, pool, RandomSurrogate::new(0)).unwrap();
        assert!(matches!(
            smbo.observe(outside),
            Err(SmboError::InvalidValue(_))
        ));
        assert_eq!(smbo.iteration_id(), 0);
        assert!(smbo.get_inc_y().is_err());
        assert!(smbo.get_adtm().is_err());
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = |seed| {
            let (space, pool) = quadratic_pool(30);
            let config = SmboConfig::default()
                .max_iterations(10)
                .seed(seed)
                .check()
                .unwrap();
            let mut smbo =
                SmboOffline::new(config, space, pool, RandomSurrogate::new(seed)).unwrap();
            smbo.run().unwrap();
            smbo.history()
                .records()
                .iter()
                .map(|r| r.pool_index)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }
}
