//! The sandbox capability surface the pipeline consumes. Provisioning
//! mechanics (containers, snapshots, telemetry wiring) live behind these
//! traits in the host application.

use kestrel_model::{Mission, MissionTrace, State, VariableSchema};
use kestrel_spec::{timeout_seconds, SpecError, SpecLibrary};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("diff rejected against base snapshot '{base}': {message}")]
    DiffRejected { base: String, message: String },

    #[error("snapshot build failed: {message}")]
    Failed { message: String },

    #[error("no sandbox resources available")]
    ResourcesExhausted,
}

/// Failure while driving a provisioned sandbox. Recoverable at mission
/// granularity: the pipeline skips the mission and keeps the sandbox.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("connection to system under test lost: {message}")]
    ConnectionLost { message: String },

    #[error("system under test crashed: {message}")]
    Crashed { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("mission has no command at index {index}")]
    NoSuchCommand { index: usize },

    #[error(transparent)]
    Spec(#[from] SpecError),
}

/// Per-command deadlines, derived from the branch the specification
/// selects for each command's prior state.
#[derive(Debug, Clone)]
pub struct TimeoutPolicy {
    library: SpecLibrary,
    schema: VariableSchema,
}

impl TimeoutPolicy {
    pub fn new(library: SpecLibrary, schema: VariableSchema) -> Self {
        Self { library, schema }
    }

    /// Seconds the command at `index` is allowed to take, given the state
    /// it starts from.
    pub fn deadline(
        &self,
        mission: &Mission,
        index: usize,
        prior: &State,
    ) -> Result<f64, PolicyError> {
        let command = mission
            .commands()
            .get(index)
            .ok_or(PolicyError::NoSuchCommand { index })?;
        let spec = self.library.spec(command.kind())?;
        let branch = spec.applicable_branch(
            prior,
            command.parameters(),
            mission.environment(),
            &self.schema,
        )?;
        Ok(timeout_seconds(
            branch,
            command,
            prior,
            mission.environment(),
            mission.configuration(),
        ))
    }
}

/// A provisioned, executable snapshot of the system under test.
pub trait Sandbox: Send {
    /// Run one mission end to end, sampling state per command, enforcing
    /// the per-command deadlines of `policy`.
    fn execute(
        &mut self,
        mission: &Mission,
        policy: &TimeoutPolicy,
    ) -> Result<MissionTrace, ExecutionError>;

    /// Tear the sandbox down and return its resources. Idempotent:
    /// releasing an already-released or never-fully-created sandbox is a
    /// no-op.
    fn release(&mut self);
}

/// Capability to build a sandbox from a base snapshot plus a source diff.
pub trait SandboxProvider: Send + Sync {
    fn build(&self, base: &str, diff: &str) -> Result<Box<dyn Sandbox>, BuildError>;
}
