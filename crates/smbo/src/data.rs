//! Persisted hyperparameter optimization records.
//!
//! A record file is a JSON list of `{"configuration": [values...], "perf": f64}`
//! entries, failed evaluations being recorded with [crate::FAILED_PERF].
use crate::errors::Result;
use crate::pool::CandidatePool;
use crate::types::is_failed_perf;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tlbo_space::ConfigurationSpace;

/// One recorded evaluation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HpoRecord {
    /// Raw hyperparameter values, categorical/ordinal given by index
    pub configuration: Vec<f64>,
    /// Performance (lower is better)
    pub perf: f64,
}

/// Build a pool from records of the given space
pub fn pool_from_records(space: &ConfigurationSpace, records: &[HpoRecord]) -> Result<CandidatePool> {
    let configurations = records
        .iter()
        .map(|r| space.configuration(&r.configuration))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let perfs = records.iter().map(|r| r.perf).collect();
    CandidatePool::new(space, configurations, perfs)
}

/// Records of a pool in pool order
pub fn records_from_pool(pool: &CandidatePool) -> Vec<HpoRecord> {
    pool.configurations()
        .iter()
        .zip(pool.perfs().iter())
        .map(|(c, p)| HpoRecord {
            configuration: c.raw_values(),
            perf: *p,
        })
        .collect()
}

/// Load a record file as a candidate pool
pub fn load_hpo_records<P: AsRef<Path>>(path: P, space: &ConfigurationSpace) -> Result<CandidatePool> {
    let reader = BufReader::new(File::open(path)?);
    let records: Vec<HpoRecord> = serde_json::from_reader(reader)?;
    pool_from_records(space, &records)
}

/// Save a candidate pool as a record file
pub fn save_hpo_records<P: AsRef<Path>>(path: P, pool: &CandidatePool) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, &records_from_pool(pool))?;
    Ok(())
}

/// Whether successful performances of a pool are not all equal
pub fn has_spread(pool: &CandidatePool) -> bool {
    matches!(pool.perf_bounds(), Some((lo, up)) if lo < up)
}

/// Load every `*.json` record file of `dir` sorted by file name.
///
/// Problems whose performances are constant (or all failed) are skipped.
/// Returns `(problem name, pool)` pairs, the name being the file stem.
pub fn load_hpo_dir<P: AsRef<Path>>(
    dir: P,
    space: &ConfigurationSpace,
) -> Result<Vec<(String, CandidatePool)>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
        .collect();
    paths.sort();

    let mut problems = vec![];
    for path in paths {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let pool = load_hpo_records(&path, space)?;
        if !has_spread(&pool) {
            warn!("Skip problem {name}: constant performances");
            continue;
        }
        let n_failed = pool.perfs().iter().filter(|p| is_failed_perf(**p)).count();
        info!(
            "Load problem {name}: {} configurations ({n_failed} failed)",
            pool.len()
        );
        problems.push((name, pool));
    }
    Ok(problems)
}
