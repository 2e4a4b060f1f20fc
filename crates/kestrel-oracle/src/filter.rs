//! Pool filtering: validate every recorded trace file in a directory and
//! emit the list of files fit to serve as ground truth.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::trace_file::load_trace_file;
use crate::validate::{is_ground_truth_valid, OracleContext};

/// Validate every `.json` trace file under `dir`, in parallel, and return
/// the paths that passed in file-name order. Malformed files are dropped
/// with a warning; they never fail the pool.
pub fn filter_truth_pool(
    dir: &Path,
    min_steps: usize,
    ctx: &OracleContext,
) -> Result<Vec<PathBuf>, io::Error> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    candidates.sort();

    let mut valid: Vec<(usize, PathBuf)> = candidates
        .into_par_iter()
        .enumerate()
        .filter_map(|(i, path)| {
            let file = match load_trace_file(&path) {
                Ok(file) => file,
                Err(err) => {
                    warn!(%err, "dropping malformed trace file");
                    return None;
                }
            };
            if is_ground_truth_valid(file.mission(), file.traces(), min_steps, ctx) {
                Some((i, path))
            } else {
                None
            }
        })
        .collect();
    valid.sort_by_key(|(i, _)| *i);

    let paths: Vec<PathBuf> = valid.into_iter().map(|(_, p)| p).collect();
    info!(valid = paths.len(), "trace pool filtered");
    Ok(paths)
}

/// Persist the validated-truth list as a JSON array of paths
/// (`valid_list.json`).
pub fn write_valid_list(paths: &[PathBuf], out: &Path) -> Result<(), io::Error> {
    let jsn = serde_json::to_string_pretty(paths)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(out, jsn)
}
