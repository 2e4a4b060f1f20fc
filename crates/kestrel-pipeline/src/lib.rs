//! Mutation pipeline: builds sandboxed snapshots of mutated control
//! software, replays the oracle missions against each, classifies the
//! recorded behaviour, and aggregates the verdicts into a database.

pub mod database;
pub mod resources;
pub mod run;
pub mod sandbox;

pub use database::{Database, DatabaseEntry, Observation};
pub use resources::{Lease, ResourcePool};
pub use run::{run, MutantOutcome, MutantReport, MutantStatus, PipelineConfig, PipelineOutcome};
pub use sandbox::{
    BuildError, ExecutionError, PolicyError, Sandbox, SandboxProvider, TimeoutPolicy,
};
