//! Ground-truth validation: a recorded trace is admitted to the oracle
//! pool only if every step's observed outcome is one the specification
//! predicts from that step's prior state.

use tracing::debug;

use kestrel_model::{CommandTrace, Mission, State, VariableSchema};
use kestrel_spec::{postcondition_holds, SpecLibrary};

/// Traces shorter than this carry too little behaviour to act as ground
/// truth.
pub const MIN_TRACE_STEPS: usize = 3;

/// The specification context a trace is judged against.
pub struct OracleContext {
    pub library: SpecLibrary,
    pub schema: VariableSchema,
}

/// Whether a recorded run of `mission` is specification-conformant and
/// usable as ground truth. Deterministic and idempotent: the same inputs
/// always produce the same verdict.
///
/// The prior state of each step is the step's first sampled state when
/// one was recorded, otherwise the previous step's final state (the
/// mission's initial state for the first step). Branch ambiguity at any
/// step invalidates the whole trace.
pub fn is_ground_truth_valid(
    mission: &Mission,
    traces: &[CommandTrace],
    min_steps: usize,
    ctx: &OracleContext,
) -> bool {
    if traces.len() < min_steps {
        debug!(steps = traces.len(), min_steps, "trace rejected: too short");
        return false;
    }
    if traces.len() != mission.commands().len() {
        debug!(
            steps = traces.len(),
            commands = mission.commands().len(),
            "trace rejected: step count does not match mission"
        );
        return false;
    }

    let env = mission.environment();
    let mut prev_final: State = mission.initial_state().clone();

    for (command, trace) in mission.commands().iter().zip(traces) {
        if trace.command().kind() != command.kind() {
            debug!(
                expected = command.kind(),
                recorded = trace.command().kind(),
                "trace rejected: command kind mismatch"
            );
            return false;
        }

        let prior = trace.first_state().unwrap_or(&prev_final).clone();

        let spec = match ctx.library.spec(command.kind()) {
            Ok(spec) => spec,
            Err(err) => {
                debug!(command = command.kind(), %err, "trace rejected");
                return false;
            }
        };

        let branch =
            match spec.applicable_branch(&prior, command.parameters(), env, &ctx.schema) {
                Ok(branch) => branch,
                Err(err) => {
                    debug!(command = command.kind(), %err, "trace rejected");
                    return false;
                }
            };

        let Some(posterior) = trace.final_state() else {
            debug!(command = command.kind(), "trace rejected: no recorded states");
            return false;
        };

        match postcondition_holds(branch, &prior, command.parameters(), posterior, env, &ctx.schema)
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(
                    command = command.kind(),
                    branch = branch.name(),
                    "trace rejected: postcondition does not hold"
                );
                return false;
            }
            Err(err) => {
                debug!(command = command.kind(), %err, "trace rejected");
                return false;
            }
        }

        prev_final = posterior.clone();
    }

    true
}
