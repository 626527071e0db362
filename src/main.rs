//! Benchmark driver replaying recorded hyperparameter searches.
//!
//! Problems (one HPO record file each) are processed in sequence: the first
//! problem uses its own truncated records as source, then every finished run
//! history becomes a source for the following problems.
use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use ndarray::Array2;
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use std::path::PathBuf;
use tlbo_smbo::{
    load_hpo_dir, AcquisitionKind, CandidatePool, GpSurrogate, ProblemRun, RandomSurrogate, Rgpe,
    RunRecorder, SmboConfig, SmboOffline, SourceData, SourceEnsemble, SurrogateKind,
    SurrogateModel, TransferMethod, DEFAULT_INIT_NUM,
};
use tlbo_space::ConfigurationSpace;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory of HPO record files (`*.json`)
    #[arg(long, default_value = "data/hpo_data")]
    data_dir: PathBuf,

    /// JSON definition of the configuration space of the records
    #[arg(long)]
    space: PathBuf,

    /// Only problems whose record file name contains this string
    #[arg(long, default_value = "")]
    benchmark: String,

    /// Comma separated transfer methods among notl, rgpe, rs
    #[arg(long, default_value = "rgpe")]
    methods: String,

    /// Surrogate type, gp or gp_matern52
    #[arg(long, default_value = "gp")]
    surrogate_type: String,

    /// Acquisition function, ei or taf
    #[arg(long, default_value = "ei")]
    acq: String,

    /// Number of iterations per problem
    #[arg(long, default_value_t = 50)]
    trial_num: usize,

    /// Size of the clustered initial design, 0 to start from the default
    /// configuration then random ones
    #[arg(long, default_value_t = 0)]
    init_num: usize,

    /// Number of records used to fit each source model
    #[arg(long, default_value_t = 50)]
    num_source_data: usize,

    /// Number of replicates
    #[arg(long, default_value_t = 10)]
    rep_num: usize,

    /// First replicate index
    #[arg(long, default_value_t = 0)]
    start_id: usize,

    /// Seed of problem shuffling and per-problem seeds
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Directory of run results
    #[arg(long, default_value = "data/exp_results")]
    outdir: PathBuf,
}

/// Loop outputs of one problem
struct ProblemOutcome {
    run: ProblemRun,
    history: CandidatePool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let surrogate_kind: SurrogateKind = args.surrogate_type.parse()?;
    let acquisition: AcquisitionKind = args.acq.parse()?;
    let methods = args
        .methods
        .split(',')
        .map(|m| m.trim().parse::<TransferMethod>())
        .collect::<Result<Vec<_>, _>>()?;

    let space = ConfigurationSpace::from_json_file(&args.space)
        .with_context(|| format!("Cannot read space {}", args.space.display()))?;
    let problems: Vec<(String, CandidatePool)> = load_hpo_dir(&args.data_dir, &space)?
        .into_iter()
        .filter(|(name, _)| name.contains(&args.benchmark))
        .collect();
    if problems.is_empty() {
        bail!("No problem found in {}", args.data_dir.display());
    }
    info!("Load {} problems for benchmark '{}'", problems.len(), args.benchmark);

    let (init_design, init_num) = if args.init_num > 0 {
        (true, args.init_num)
    } else {
        (false, DEFAULT_INIT_NUM)
    };
    let base_config = SmboConfig::default()
        .max_iterations(args.trial_num)
        .init_num(init_num)
        .init_design(init_design)
        .acquisition(acquisition)
        .outdir(args.outdir.to_string_lossy());
    base_config.clone().check()?;

    let mut rng = Xoshiro256Plus::seed_from_u64(args.seed);
    let seeds: Vec<u64> = (0..problems.len()).map(|_| rng.gen_range(1..10000)).collect();
    let mut order: Vec<usize> = (0..problems.len()).collect();
    for _ in 0..args.start_id {
        order.shuffle(&mut rng);
    }

    let benchmark = format!(
        "{}_{}_{}_{}",
        if args.benchmark.is_empty() {
            "all"
        } else {
            args.benchmark.as_str()
        },
        args.num_source_data,
        args.trial_num,
        args.surrogate_type
    );
    for rep in args.start_id..args.rep_num {
        order.shuffle(&mut rng);
        for &method in &methods {
            let mut recorder =
                RunRecorder::new(method.to_string(), &benchmark, rep, base_config.clone());
            let mut sources: Vec<SourceData> = vec![];
            for (k, &id) in order.iter().enumerate() {
                let (name, pool) = &problems[id];
                info!(
                    "[{method}] Evaluate {}-th problem {name} with {} source problems",
                    k + 1,
                    sources.len()
                );
                if k == 0 {
                    sources.push(SourceData::from_pool(pool, args.trial_num));
                }
                let config = base_config.clone().seed(seeds[k]);
                let outcome = run_problem(
                    method,
                    surrogate_kind,
                    config,
                    &space,
                    name,
                    pool,
                    &sources,
                    args.num_source_data,
                )?;
                sources.push(SourceData::from_pool(&outcome.history, outcome.history.len()));

                if let Some(last) = outcome.run.last() {
                    info!(
                        "In {}-th problem {name}: adtm {:.4}, y_inc {:.4}",
                        k + 1,
                        last[0],
                        last[1]
                    );
                }
                log_weights(&outcome.run.weights);
                recorder.push(outcome.run);
            }
            let path = recorder.save(&args.outdir)?;
            info!("Results saved in {}", path.display());
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_problem(
    method: TransferMethod,
    kind: SurrogateKind,
    config: SmboConfig,
    space: &ConfigurationSpace,
    name: &str,
    pool: &CandidatePool,
    sources: &[SourceData],
    num_source_data: usize,
) -> Result<ProblemOutcome> {
    let config = config.check()?;
    let seed = config.seed().unwrap_or_default();
    let ranker = if config.init_design() {
        Some(SourceEnsemble::new(kind, sources, num_source_data, seed)?)
    } else {
        None
    };
    let mut run = ProblemRun::start(name, seed, sources.len());
    match method {
        TransferMethod::NoTl => {
            let model = GpSurrogate::new(kind, seed);
            let smbo = replay(config, space, pool, model, ranker.as_ref(), &mut run)?;
            finish(run, smbo, vec![])
        }
        TransferMethod::Rgpe => {
            let model = Rgpe::new(kind, sources, num_source_data, seed)?;
            let smbo = replay(config, space, pool, model, ranker.as_ref(), &mut run)?;
            let weights = smbo.model().weight_history().to_vec();
            finish(run, smbo, weights)
        }
        TransferMethod::Rs => {
            let model = RandomSurrogate::new(seed);
            let smbo = replay(config, space, pool, model, ranker.as_ref(), &mut run)?;
            finish(run, smbo, vec![])
        }
    }
}

fn replay<M: SurrogateModel>(
    config: tlbo_smbo::ValidSmboConfig,
    space: &ConfigurationSpace,
    pool: &CandidatePool,
    model: M,
    ranker: Option<&SourceEnsemble>,
    run: &mut ProblemRun,
) -> Result<SmboOffline<M>> {
    let mut smbo = match ranker {
        Some(ranker) => {
            SmboOffline::with_initial_design(config, space.clone(), pool.clone(), model, ranker)?
        }
        None => SmboOffline::new(config, space.clone(), pool.clone(), model)?,
    };
    for _ in 0..smbo.max_iterations() {
        smbo.iterate()?;
        run.record(&smbo)?;
    }
    info!(
        "min/max {:?}/{:?}, {} successes, {} failures",
        smbo.y_min(),
        smbo.y_max(),
        smbo.history().n_successes(),
        smbo.history().n_failures()
    );
    Ok(smbo)
}

fn finish<M: SurrogateModel>(
    mut run: ProblemRun,
    smbo: SmboOffline<M>,
    weights: Vec<Vec<f64>>,
) -> Result<ProblemOutcome> {
    run.finish(&smbo, weights);
    let records = smbo.history().records();
    let history = CandidatePool::new(
        smbo.space(),
        records.iter().map(|r| r.configuration.clone()).collect(),
        records.iter().map(|r| r.perf).collect(),
    )?;
    Ok(ProblemOutcome { run, history })
}

fn log_weights(weights: &[Vec<f64>]) {
    let n_models = match weights.first() {
        Some(w) => w.len(),
        None => return,
    };
    let fmt = |w: &[f64]| {
        w.iter()
            .map(|v| format!("{v:.2}"))
            .collect::<Vec<_>>()
            .join(",")
    };
    for w in weights {
        info!("{}", fmt(w));
    }
    let flat: Vec<f64> = weights.iter().flatten().copied().collect();
    if let Ok(arr) = Array2::from_shape_vec((weights.len(), n_models), flat) {
        if let Some(mean) = arr.mean_axis(ndarray::Axis(0)) {
            info!("Weight stats: {}", fmt(mean.as_slice().unwrap_or(&[])));
            let used: Vec<usize> = mean
                .iter()
                .enumerate()
                .filter(|(_, w)| **w >= 1e-2)
                .map(|(i, _)| i)
                .collect();
            info!("Source problems used {used:?}");
        }
    }
}
