//! Mutant classification: does a mutant's recorded run reproduce, within
//! noise tolerances, the outcome branches the validated oracle runs
//! exhibited for the same mission?

use tracing::debug;

use kestrel_model::State;
use kestrel_spec::{postcondition_holds, SpecError};

use crate::trace_file::TraceFile;
use crate::validate::OracleContext;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("no oracle trace covers mission {ident}")]
    NoCoveringTrace { ident: String },

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Eval(#[from] kestrel_spec::EvalError),
}

/// True iff for every oracle trace of the same mission, every step of the
/// mutant run lands inside the postcondition of the branch that step took
/// in the oracle run. A step-count mismatch, a command-kind mismatch, or
/// a single variable outside its tolerance at any step classifies the
/// mutant as inconsistent.
///
/// The branch is selected from the oracle's prior state (the reference
/// behaviour); the postcondition is evaluated with the mutant's own prior,
/// since the branch relates each posterior to the state the command
/// started from. Reflexive: a valid trace matches a pool containing
/// itself.
pub fn matches_ground_truth(
    mutant: &TraceFile,
    oracle_pool: &[TraceFile],
    ctx: &OracleContext,
) -> Result<bool, OracleError> {
    let ident = mutant.mission().ident();
    let covering: Vec<&TraceFile> = oracle_pool
        .iter()
        .filter(|o| o.mission().ident() == ident)
        .collect();
    if covering.is_empty() {
        return Err(OracleError::NoCoveringTrace { ident });
    }

    for oracle in covering {
        if !matches_one(mutant, oracle, ctx)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_one(
    mutant: &TraceFile,
    oracle: &TraceFile,
    ctx: &OracleContext,
) -> Result<bool, OracleError> {
    if mutant.traces().len() != oracle.traces().len() {
        debug!(
            mutant_steps = mutant.traces().len(),
            oracle_steps = oracle.traces().len(),
            "mutant inconsistent: step count differs from oracle"
        );
        return Ok(false);
    }

    let mission = oracle.mission();
    let env = mission.environment();
    let mut oracle_prev: State = mission.initial_state().clone();
    let mut mutant_prev: State = mutant.mission().initial_state().clone();

    for (step, (oracle_step, mutant_step)) in
        oracle.traces().iter().zip(mutant.traces()).enumerate()
    {
        let command = oracle_step.command();
        if mutant_step.command().kind() != command.kind() {
            debug!(step, "mutant inconsistent: command kind differs");
            return Ok(false);
        }

        let oracle_prior = oracle_step.first_state().unwrap_or(&oracle_prev).clone();
        let mutant_prior = mutant_step.first_state().unwrap_or(&mutant_prev).clone();

        let spec = ctx.library.spec(command.kind())?;
        let branch =
            spec.applicable_branch(&oracle_prior, command.parameters(), env, &ctx.schema)?;

        let Some(mutant_posterior) = mutant_step.final_state() else {
            debug!(step, "mutant inconsistent: no recorded states");
            return Ok(false);
        };

        let holds = postcondition_holds(
            branch,
            &mutant_prior,
            command.parameters(),
            mutant_posterior,
            env,
            &ctx.schema,
        )?;
        if !holds {
            debug!(step, branch = branch.name(), "mutant inconsistent");
            return Ok(false);
        }

        if let Some(s) = oracle_step.final_state() {
            oracle_prev = s.clone();
        }
        mutant_prev = mutant_posterior.clone();
    }

    Ok(true)
}
