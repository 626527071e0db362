use approx::assert_abs_diff_eq;
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use std::collections::HashSet;
use tlbo_smbo::*;
use tlbo_space::{Configuration, ConfigurationSpace, Hyperparameter};

fn abc_problem() -> (ConfigurationSpace, CandidatePool) {
    let space = ConfigurationSpace::new(vec![Hyperparameter::categorical(
        "letter",
        &["A", "B", "C"],
        1,
    )])
    .unwrap();
    let configs: Vec<_> = (0..3)
        .map(|i| space.configuration(&[i as f64]).unwrap())
        .collect();
    let pool = CandidatePool::new(&space, configs, vec![0.1, 0.5, FAILED_PERF]).unwrap();
    (space, pool)
}

fn grid_problem(n: usize, failure_rate: f64, seed: u64) -> (ConfigurationSpace, CandidatePool) {
    let space = ConfigurationSpace::new(vec![
        Hyperparameter::float("x", 0., 1., 0.5),
        Hyperparameter::int("depth", 1, 8, 4),
    ])
    .unwrap();
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let configs = space.sample_configurations(n, &mut rng);
    let perfs = configs
        .iter()
        .map(|c| {
            let v = c.raw_values();
            if rng.gen::<f64>() < failure_rate {
                FAILED_PERF
            } else {
                (v[0] - 0.7).powi(2) + 0.01 * (v[1] - 3.).abs()
            }
        })
        .collect();
    let pool = CandidatePool::new(&space, configs, perfs).unwrap();
    (space, pool)
}

#[test]
fn test_success_failure_and_duplicate_trials() {
    let (space, pool) = abc_problem();
    let config = SmboConfig::default()
        .init_num(1)
        .seed(0)
        .check()
        .unwrap();
    let mut smbo = SmboOffline::new(config, space.clone(), pool, RandomSurrogate::new(0)).unwrap();
    let a = space.configuration(&[0.]).unwrap();
    let b = space.configuration(&[1.]).unwrap();
    let c = space.configuration(&[2.]).unwrap();

    let trial = smbo.iterate().unwrap();
    assert_eq!(
        trial,
        Trial {
            configuration: b.clone(),
            state: TrialState::Success,
            perf: 0.5,
            info: None
        }
    );
    assert_eq!(smbo.default_obj_value(), 0.5);

    let trial = smbo.observe(c.clone()).unwrap();
    assert_eq!(trial.state, TrialState::Failed);
    assert_eq!(trial.perf, FAILED_PERF);
    assert_eq!(trial.info.as_deref(), Some("failed configuration evaluation."));
    assert_eq!(smbo.failed_configurations(), vec![c.clone()]);
    assert_eq!(smbo.configurations(), vec![b.clone()]);

    let trial = smbo.observe(b.clone()).unwrap();
    assert_eq!(
        trial,
        Trial {
            configuration: b.clone(),
            state: TrialState::Success,
            perf: 0.5,
            info: None
        }
    );
    assert_eq!(smbo.iteration_id(), 3);
    assert_eq!(smbo.history().len(), 2);

    // re-observing the failure keeps its outcome without info
    let trial = smbo.observe(c).unwrap();
    assert_eq!(trial.state, TrialState::Failed);
    assert_eq!(trial.info, None);
    assert_eq!(smbo.iteration_id(), 4);

    smbo.observe(a).unwrap();
    assert_eq!(smbo.get_inc_y().unwrap(), 0.1);
    assert_abs_diff_eq!(smbo.get_adtm().unwrap(), 0.);
    assert_eq!(smbo.default_obj_value(), 0.5);
}

#[test]
fn test_budget_larger_than_pool() {
    let (space, pool) = grid_problem(3, 0., 1);
    let config = SmboConfig::default()
        .max_iterations(5)
        .random_chooser(RandomChooserKind::Prob(1.))
        .seed(3)
        .check()
        .unwrap();
    let mut smbo =
        SmboOffline::new(config, space, pool, GpSurrogate::new(SurrogateKind::Gp, 0)).unwrap();
    smbo.run().unwrap();
    assert_eq!(smbo.iteration_id(), 5);
    assert_eq!(smbo.history().len(), 3);
    assert_eq!(smbo.configurations().len(), 3);
}

#[test]
fn test_exploitation_on_exhausted_pool() {
    let (space, pool) = grid_problem(3, 0., 1);
    let config = SmboConfig::default()
        .max_iterations(5)
        .random_chooser(RandomChooserKind::Prob(0.))
        .seed(3)
        .check()
        .unwrap();
    let mut smbo =
        SmboOffline::new(config, space, pool, GpSurrogate::new(SurrogateKind::Gp, 0)).unwrap();
    for _ in 0..3 {
        smbo.iterate().unwrap();
    }
    assert!(matches!(
        smbo.iterate(),
        Err(SmboError::PoolExhaustedError(3))
    ));
}

#[test]
fn test_single_configuration_pool_terminates() {
    let space = ConfigurationSpace::new(vec![Hyperparameter::float("x", 0., 1., 0.5)]).unwrap();
    let config = space.configuration(&[0.2]).unwrap();
    let pool = CandidatePool::new(&space, vec![config.clone()], vec![1.]).unwrap();
    let smbo_config = SmboConfig::default().max_iterations(4).seed(0).check().unwrap();
    let mut smbo = SmboOffline::new(smbo_config, space, pool, RandomSurrogate::new(0)).unwrap();
    for _ in 0..4 {
        let trial = smbo.iterate().unwrap();
        assert_eq!(trial.configuration, config);
    }
    assert_eq!(smbo.history().len(), 1);
    // adtm is undefined on constant performances
    assert!(smbo.get_adtm().is_err());
}

#[test]
fn test_loop_invariants() {
    let (space, pool) = grid_problem(60, 0.2, 7);
    let config = SmboConfig::default()
        .max_iterations(30)
        .seed(11)
        .check()
        .unwrap();
    let mut smbo =
        SmboOffline::new(config, space, pool, GpSurrogate::new(SurrogateKind::Gp, 0)).unwrap();

    let mut seen: HashSet<Configuration> = HashSet::new();
    for _ in 0..30 {
        let before = smbo.iteration_id();
        let n_before = smbo.configurations().len() + smbo.failed_configurations().len();
        let trial = smbo.iterate().unwrap();
        assert_eq!(smbo.iteration_id(), before + 1);

        let n_after = smbo.configurations().len() + smbo.failed_configurations().len();
        if seen.insert(trial.configuration.clone()) {
            assert_eq!(n_after, n_before + 1);
        } else {
            assert_eq!(n_after, n_before);
        }

        let successes: HashSet<_> = smbo.configurations().into_iter().collect();
        assert!(smbo
            .failed_configurations()
            .iter()
            .all(|c| !successes.contains(c)));
        assert_eq!(smbo.perfs().len(), smbo.configurations().len());
    }

    if let Ok(adtm) = smbo.get_adtm() {
        assert!((0. ..=1.).contains(&adtm));
    }
}

#[test]
fn test_clustered_initial_design_from_sources() {
    let (space, target) = grid_problem(200, 0., 5);
    let (_, source) = grid_problem(200, 0., 6);
    let sources = vec![SourceData::from_pool(&source, 100)];
    let ranker = SourceEnsemble::new(SurrogateKind::Gp, &sources, 100, 0).unwrap();
    let top: HashSet<_> = rank_pool(&ranker, &target).unwrap()[..DEFAULT_INIT_TOP_K]
        .iter()
        .map(|&i| target.configuration(i).clone())
        .collect();

    let config = SmboConfig::default()
        .init_num(5)
        .init_design(true)
        .max_iterations(8)
        .seed(0)
        .check()
        .unwrap();
    let model = Rgpe::new(SurrogateKind::Gp, &sources, 100, 0).unwrap();
    let mut smbo = SmboOffline::with_initial_design(config, space, target, model, &ranker).unwrap();

    let design = smbo.initial_configurations().unwrap().to_vec();
    assert!(!design.is_empty() && design.len() <= 5);
    assert!(design.iter().all(|c| top.contains(c)));
    assert_eq!(smbo.init_num(), design.len());

    for expected in &design {
        let trial = smbo.iterate().unwrap();
        assert_eq!(&trial.configuration, expected);
    }
    smbo.run().unwrap();
    assert_eq!(smbo.iteration_id(), 8);
    assert_eq!(smbo.model().weights().len(), 2);
}

#[test]
fn test_rgpe_with_transfer_acquisition() {
    let (space, target) = grid_problem(80, 0.1, 9);
    let (_, source) = grid_problem(80, 0., 10);
    let model = Rgpe::new(
        SurrogateKind::GpMatern52,
        &[SourceData::from_pool(&source, 50)],
        50,
        1,
    )
    .unwrap();
    let config = SmboConfig::default()
        .acquisition(AcquisitionKind::Taf)
        .max_iterations(12)
        .seed(2)
        .check()
        .unwrap();
    let mut smbo = SmboOffline::new(config, space, target, model).unwrap();
    smbo.run().unwrap();
    assert_eq!(smbo.iteration_id(), 12);
    let weights = smbo.model().weights();
    assert_abs_diff_eq!(weights.iter().sum::<f64>(), 1., epsilon = 1e-9);
    assert!(!smbo.model().weight_history().is_empty());
}

#[test]
fn test_failing_design_point_is_skipped() {
    let (space, target) = grid_problem(200, 0., 5);
    let (_, source) = grid_problem(200, 0., 6);
    let sources = vec![SourceData::from_pool(&source, 100)];
    let ranker = SourceEnsemble::new(SurrogateKind::Gp, &sources, 100, 0).unwrap();
    let config = SmboConfig::default()
        .init_num(5)
        .init_design(true)
        .seed(0)
        .check()
        .unwrap();

    let design = SmboOffline::with_initial_design(
        config.clone(),
        space.clone(),
        target.clone(),
        RandomSurrogate::new(0),
        &ranker,
    )
    .unwrap()
    .initial_configurations()
    .unwrap()
    .to_vec();
    assert!(design.len() >= 2);

    // same candidates, the first design point now fails
    let configs = target.configurations().to_vec();
    let perfs = configs
        .iter()
        .zip(target.perfs())
        .map(|(c, &p)| if *c == design[0] { FAILED_PERF } else { p })
        .collect();
    let pool = CandidatePool::new(&space, configs, perfs).unwrap();
    let mut smbo =
        SmboOffline::with_initial_design(config, space, pool, RandomSurrogate::new(0), &ranker)
            .unwrap();
    assert_eq!(smbo.initial_configurations().unwrap(), design.as_slice());

    let trial = smbo.iterate().unwrap();
    assert_eq!(trial.configuration, design[0]);
    assert_eq!(trial.state, TrialState::Failed);
    let trial = smbo.iterate().unwrap();
    assert_eq!(trial.configuration, design[1]);
    assert_eq!(trial.state, TrialState::Success);
    assert_eq!(smbo.history().n_successes(), 1);
}

#[test]
fn test_no_success_samples_randomly() {
    let (space, pool) = grid_problem(5, 1., 4);
    let config = SmboConfig::default()
        .init_num(0)
        .max_iterations(5)
        .random_chooser(RandomChooserKind::Prob(0.))
        .seed(1)
        .check()
        .unwrap();
    let mut smbo =
        SmboOffline::new(config, space, pool, GpSurrogate::new(SurrogateKind::Gp, 0)).unwrap();
    smbo.run().unwrap();
    assert_eq!(smbo.iteration_id(), 5);
    assert_eq!(smbo.failed_configurations().len(), 5);
    assert!(smbo.configurations().is_empty());
    assert!(smbo.get_inc_y().is_err());
}
