//! The mutation campaign loop: a bounded worker pool that builds one
//! sandbox per mutant, replays the oracle missions against it, and
//! aggregates classifications in completion order.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel;
use tracing::{debug, info, warn};

use kestrel_model::stable_hash;
use kestrel_oracle::{matches_ground_truth, OracleContext, TraceFile};

use crate::database::{Database, DatabaseEntry, Observation};
use crate::sandbox::{Sandbox, SandboxProvider, TimeoutPolicy};

/// Campaign-wide settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum mutants (and therefore sandboxes) in flight at once.
    pub workers: usize,
    /// Identifier of the unmutated snapshot every diff is applied to.
    pub base_snapshot: String,
    /// Directory mutant traces are persisted into.
    pub trace_directory: PathBuf,
    /// Directory the oracle trace files were loaded from, recorded in the
    /// database for provenance.
    pub oracle_directory: PathBuf,
}

/// Lifecycle of one mutant through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutantStatus {
    Pending,
    SnapshotBuilding,
    BuildFailed,
    Ready,
    Executing(usize),
    Classified,
    Released,
}

/// Terminal result for one mutant.
#[derive(Debug)]
pub enum MutantOutcome {
    /// The snapshot could not be built; the mutant contributes nothing.
    BuildFailed,
    /// Every admissible mission was executed and classified. `None` when
    /// no mission produced an observation.
    Classified(Option<DatabaseEntry>),
    /// The campaign was interrupted before or during this mutant.
    Cancelled,
    /// Processing panicked; sibling mutants are unaffected.
    Panicked { message: String },
}

#[derive(Debug)]
pub struct MutantReport {
    pub diff_index: usize,
    pub outcome: MutantOutcome,
}

pub struct PipelineOutcome {
    pub database: Database,
    /// One report per submitted diff, in completion order.
    pub reports: Vec<MutantReport>,
}

/// Run a mutation campaign over `diffs`. Every diff receives exactly one
/// terminal report, cancellation included. At no instant are more than
/// `config.workers` sandboxes provisioned, and every provisioned sandbox
/// is released before this function returns.
pub fn run(
    diffs: &[String],
    oracle_pool: &[(PathBuf, TraceFile)],
    provider: &dyn SandboxProvider,
    ctx: &OracleContext,
    config: &PipelineConfig,
    cancel: &AtomicBool,
) -> PipelineOutcome {
    let policy = TimeoutPolicy::new(ctx.library.clone(), ctx.schema.clone());
    let oracle_files: Vec<TraceFile> =
        oracle_pool.iter().map(|(_, file)| file.clone()).collect();

    let (job_tx, job_rx) = channel::unbounded::<usize>();
    for index in 0..diffs.len() {
        let _ = job_tx.send(index);
    }
    drop(job_tx);

    let (report_tx, report_rx) = channel::unbounded::<MutantReport>();
    let workers = config.workers.max(1);

    let scope_result = crossbeam::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let report_tx = report_tx.clone();
            let policy = &policy;
            let oracle_files = &oracle_files;
            scope.spawn(move |_| {
                while let Ok(index) = job_rx.recv() {
                    // Queued-but-unstarted work exits without side effects
                    // once the campaign is interrupted.
                    let outcome = if cancel.load(Ordering::SeqCst) {
                        MutantOutcome::Cancelled
                    } else {
                        let diff = &diffs[index];
                        match catch_unwind(AssertUnwindSafe(|| {
                            process_mutant(
                                index,
                                diff,
                                oracle_pool,
                                oracle_files,
                                provider,
                                ctx,
                                config,
                                policy,
                                cancel,
                            )
                        })) {
                            Ok(outcome) => outcome,
                            Err(payload) => {
                                let message = panic_message(payload.as_ref());
                                warn!(index, message, "mutant processing panicked");
                                MutantOutcome::Panicked { message }
                            }
                        }
                    };
                    if report_tx
                        .send(MutantReport {
                            diff_index: index,
                            outcome,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }
        drop(report_tx);
    });
    if scope_result.is_err() {
        // Workers catch their own panics; reaching this means a worker
        // died outside its catch boundary.
        warn!("a pipeline worker thread terminated abnormally");
    }

    let reports: Vec<MutantReport> = report_rx.into_iter().collect();
    let entries: Vec<DatabaseEntry> = reports
        .iter()
        .filter_map(|report| match &report.outcome {
            MutantOutcome::Classified(Some(entry)) => Some(entry.clone()),
            _ => None,
        })
        .collect();

    info!(
        mutants = diffs.len(),
        recorded = entries.len(),
        "mutation campaign finished"
    );

    PipelineOutcome {
        database: Database::new(
            config.oracle_directory.clone(),
            &config.base_snapshot,
            entries,
        ),
        reports,
    }
}

#[allow(clippy::too_many_arguments)]
fn process_mutant(
    index: usize,
    diff: &str,
    oracle_pool: &[(PathBuf, TraceFile)],
    oracle_files: &[TraceFile],
    provider: &dyn SandboxProvider,
    ctx: &OracleContext,
    config: &PipelineConfig,
    policy: &TimeoutPolicy,
    cancel: &AtomicBool,
) -> MutantOutcome {
    let mut status = MutantStatus::SnapshotBuilding;
    debug!(index, ?status);

    let sandbox = match provider.build(&config.base_snapshot, diff) {
        Ok(sandbox) => sandbox,
        Err(err) => {
            status = MutantStatus::BuildFailed;
            warn!(index, ?status, %err, "mutant snapshot build failed");
            return MutantOutcome::BuildFailed;
        }
    };
    // Release on every exit path, panics and cancellation included.
    let mut guard = ReleaseGuard { sandbox };

    status = MutantStatus::Ready;
    debug!(index, ?status);

    let mut inconsistent: Vec<Observation> = Vec::new();
    let mut consistent: Vec<Observation> = Vec::new();

    for (mission_index, (oracle_path, oracle_file)) in oracle_pool.iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            debug!(index, mission_index, "mutant cancelled mid-flight");
            return MutantOutcome::Cancelled;
        }

        status = MutantStatus::Executing(mission_index);
        debug!(index, ?status);

        let mission = oracle_file.mission();
        let trace = match guard.sandbox.execute(mission, policy) {
            Ok(trace) => trace,
            Err(err) => {
                warn!(index, mission_index, %err, "mission skipped on execution error");
                continue;
            }
        };

        let mutant_file = TraceFile::new(mission.clone(), trace.traces().to_vec());
        let file_name = format!(
            "{:016x}.json",
            stable_hash(format!("{diff}{}", mission.ident()).as_bytes())
        );
        let trace_path = config.trace_directory.join(file_name);
        if let Err(err) = mutant_file.save(&trace_path) {
            warn!(index, mission_index, %err, "failed to persist mutant trace; mission skipped");
            continue;
        }

        match matches_ground_truth(&mutant_file, oracle_files, ctx) {
            Ok(true) => consistent.push(Observation {
                oracle: oracle_path.clone(),
                trace: trace_path,
            }),
            Ok(false) => inconsistent.push(Observation {
                oracle: oracle_path.clone(),
                trace: trace_path,
            }),
            Err(err) => {
                warn!(index, mission_index, %err, "classification failed; mission skipped");
            }
        }
    }

    status = MutantStatus::Classified;
    debug!(
        index,
        ?status,
        killed = !inconsistent.is_empty(),
        observations = inconsistent.len() + consistent.len()
    );

    let entry = DatabaseEntry::new(diff, inconsistent, consistent);

    guard.sandbox.release();
    status = MutantStatus::Released;
    debug!(index, ?status);

    MutantOutcome::Classified(entry)
}

struct ReleaseGuard {
    sandbox: Box<dyn Sandbox>,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        // Sandbox::release is idempotent; the normal path has already
        // released by the time this runs.
        self.sandbox.release();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
