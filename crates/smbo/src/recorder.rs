//! Persistence of benchmark run results.
//!
//! A [RunRecorder] gathers, for one method/benchmark/replicate, the runs made
//! on successive problems. Each run is a sequence of per-iteration
//! `(adtm, incumbent performance, elapsed seconds)` rows.
use crate::errors::{Result, SmboError};
use crate::smbo_config::SmboConfig;
use crate::smbo_offline::SmboOffline;
use crate::surrogates::SurrogateModel;
use crate::types::FAILED_PERF;

use ndarray::{s, Array2, Array3, Axis};
use ndarray_npy::{read_npy, write_npy};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One selected configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectedConfiguration {
    /// Raw hyperparameter values
    pub configuration: Vec<f64>,
    /// Observed performance
    pub perf: f64,
}

/// Results of one loop run on one problem
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProblemRun {
    /// Problem name
    pub problem: String,
    /// Seed of the loop
    pub seed: u64,
    /// Number of source problems
    pub n_sources: usize,
    /// Per-iteration `[adtm, incumbent, elapsed]` rows
    pub results: Vec<[f64; 3]>,
    /// Evaluated configurations in evaluation order
    pub selected: Vec<SelectedConfiguration>,
    /// Ensemble weights computed along the run, sources first and target last
    pub weights: Vec<Vec<f64>>,
    #[serde(skip)]
    start: Option<Instant>,
}

impl ProblemRun {
    /// Start timing a run
    pub fn start(problem: impl Into<String>, seed: u64, n_sources: usize) -> Self {
        ProblemRun {
            problem: problem.into(),
            seed,
            n_sources,
            results: vec![],
            selected: vec![],
            weights: vec![],
            start: Some(Instant::now()),
        }
    }

    /// Record metrics after the latest iteration of `smbo`
    ///
    /// While no evaluation has succeeded, the row is `[1, FAILED_PERF, elapsed]`.
    pub fn record<M: SurrogateModel>(&mut self, smbo: &SmboOffline<M>) -> Result<()> {
        let elapsed = self.start.map_or(0., |s| s.elapsed().as_secs_f64());
        if smbo.history().n_successes() == 0 {
            self.results.push([1., FAILED_PERF, elapsed]);
        } else {
            self.results
                .push([smbo.get_adtm()?, smbo.get_inc_y()?, elapsed]);
        }
        Ok(())
    }

    /// Record the evaluated configurations and ensemble weights at the end of the run
    pub fn finish<M: SurrogateModel>(&mut self, smbo: &SmboOffline<M>, weights: Vec<Vec<f64>>) {
        self.selected = smbo
            .history()
            .records()
            .iter()
            .map(|r| SelectedConfiguration {
                configuration: r.configuration.raw_values(),
                perf: r.perf,
            })
            .collect();
        self.weights = weights;
    }

    /// Last recorded row
    pub fn last(&self) -> Option<&[f64; 3]> {
        self.results.last()
    }

    /// Rows as a (n_iterations, 3) matrix
    pub fn to_array(&self) -> Array2<f64> {
        let mut arr = Array2::zeros((self.results.len(), 3));
        for (mut row, res) in arr.rows_mut().into_iter().zip(&self.results) {
            row.assign(&ndarray::aview1(res));
        }
        arr
    }
}

/// Summary written along the results matrix
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    /// Transfer method
    pub method: String,
    /// Benchmark name
    pub benchmark: String,
    /// Replicate index
    pub replicate: usize,
    /// Loop configuration
    pub config: SmboConfig,
    /// Runs in processing order
    pub runs: Vec<ProblemRun>,
    /// Crate name and version
    pub code_reference: String,
}

/// Recorder of the runs of one method/benchmark/replicate
#[derive(Clone, Debug)]
pub struct RunRecorder {
    method: String,
    benchmark: String,
    replicate: usize,
    config: SmboConfig,
    runs: Vec<ProblemRun>,
}

impl RunRecorder {
    /// An empty recorder
    pub fn new(
        method: impl Into<String>,
        benchmark: impl Into<String>,
        replicate: usize,
        config: SmboConfig,
    ) -> Self {
        RunRecorder {
            method: method.into(),
            benchmark: benchmark.into(),
            replicate,
            config,
            runs: vec![],
        }
    }

    /// Add a finished run
    pub fn push(&mut self, run: ProblemRun) {
        self.runs.push(run);
    }

    /// Recorded runs
    pub fn runs(&self) -> &[ProblemRun] {
        &self.runs
    }

    /// File name stem `{method}-{benchmark}-{replicate}`
    pub fn file_stem(&self) -> String {
        format!("{}-{}-{}", self.method, self.benchmark, self.replicate)
    }

    /// Results as a (n_runs, n_iterations, 3) array, runs being truncated
    /// to the shortest one
    pub fn to_array(&self) -> Array3<f64> {
        let n_iter = self.runs.iter().map(|r| r.results.len()).min().unwrap_or(0);
        let mut arr = Array3::zeros((self.runs.len(), n_iter, 3));
        for (mut slab, run) in arr.axis_iter_mut(Axis(0)).zip(&self.runs) {
            slab.assign(&run.to_array().slice(s![..n_iter, ..]));
        }
        arr
    }

    /// Write `{stem}.npy` results and `{stem}.json` summary into `outdir`,
    /// returns the path of the results file
    pub fn save<P: AsRef<Path>>(&self, outdir: P) -> Result<PathBuf> {
        let outdir = outdir.as_ref();
        std::fs::create_dir_all(outdir)?;
        let stem = self.file_stem();
        let npy_path = outdir.join(format!("{stem}.npy"));
        write_npy(&npy_path, &self.to_array())?;

        let summary = RunSummary {
            method: self.method.clone(),
            benchmark: self.benchmark.clone(),
            replicate: self.replicate,
            config: self.config.clone(),
            runs: self.runs.clone(),
            code_reference: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        };
        let out_json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(outdir.join(format!("{stem}.json")), out_json)?;
        Ok(npy_path)
    }
}

/// Load results written by [RunRecorder::save]
pub fn load_results<P: AsRef<Path>>(path: P) -> Result<Array3<f64>> {
    Ok(read_npy(path)?)
}

/// Load a summary written by [RunRecorder::save]
pub fn load_summary<P: AsRef<Path>>(path: P) -> Result<RunSummary> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(SmboError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::CandidatePool;
    use crate::surrogates::RandomSurrogate;
    use tlbo_space::{ConfigurationSpace, Hyperparameter};

    #[test]
    fn test_record_before_first_success() {
        let space = ConfigurationSpace::new(vec![Hyperparameter::categorical(
            "letter",
            &["A", "B", "C"],
            1,
        )])
        .unwrap();
        let configs: Vec<_> = (0..3)
            .map(|i| space.configuration(&[i as f64]).unwrap())
            .collect();
        let pool = CandidatePool::new(&space, configs.clone(), vec![0.1, FAILED_PERF, 0.5]).unwrap();
        let config = SmboConfig::default().seed(0).check().unwrap();
        let mut smbo = SmboOffline::new(config, space, pool, RandomSurrogate::new(0)).unwrap();

        let mut run = ProblemRun::start("abc", 0, 0);
        // the default configuration B fails
        let trial = smbo.iterate().unwrap();
        assert_eq!(trial.configuration, configs[1]);
        run.record(&smbo).unwrap();
        assert_eq!(run.last().unwrap()[..2], [1., FAILED_PERF]);

        smbo.observe(configs[0].clone()).unwrap();
        run.record(&smbo).unwrap();
        assert_eq!(run.results.len(), 2);
        assert_eq!(run.last().unwrap()[..2], [0., 0.1]);
    }

    #[test]
    fn test_save_and_load() {
        let mut recorder = RunRecorder::new("rgpe", "toy", 0, SmboConfig::default());
        let mut run = ProblemRun::start("p1", 1, 0);
        run.results = vec![[0.5, 0.2, 0.1], [0.1, 0.05, 0.3]];
        recorder.push(run.clone());
        run.results.push([0., 0., 0.5]);
        recorder.push(run);

        let dir = std::env::temp_dir().join(format!("tlbo-recorder-{}", std::process::id()));
        let path = recorder.save(&dir).unwrap();
        assert!(path.ends_with("rgpe-toy-0.npy"));

        let results = load_results(&path).unwrap();
        assert_eq!(results.dim(), (2, 2, 3));
        assert_eq!(results[[1, 1, 1]], 0.05);

        let summary = load_summary(dir.join("rgpe-toy-0.json")).unwrap();
        assert_eq!(summary.runs.len(), 2);
        assert_eq!(summary.runs[1].results.len(), 3);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
