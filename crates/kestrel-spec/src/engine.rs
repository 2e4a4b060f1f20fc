//! Branch applicability, postcondition checking, and timeout evaluation.
//!
//! Applicability is a function of the *prior* state only; postconditions
//! additionally see the *posterior* state. The split lets one branch set
//! serve both as a predictive model and as a validator of observed
//! behaviour.

use std::collections::BTreeMap;

use kestrel_model::{
    Command, Configuration, Environment, Parameter, State, Value, VariableSchema,
};

use crate::branch::{Branch, Timeout, TimeoutArgs};
use crate::eval::{eval_bool, EvalContext, EvalError};

/// Zero or multiple branch preconditions held for a step. This is a
/// specification-consistency failure, never silently defaulted; callers
/// decide whether it is fatal.
#[derive(Debug, thiserror::Error)]
pub enum AmbiguityError {
    #[error("no applicable branch for command '{command}'")]
    NoApplicableBranch { command: String },

    #[error("multiple applicable branches for command '{command}': {branches:?}")]
    MultipleApplicableBranches {
        command: String,
        branches: Vec<String>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error(transparent)]
    Ambiguity(#[from] AmbiguityError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("no specification registered for command kind '{kind}'")]
    UnknownCommand { kind: String },
}

/// The specification of one command kind: its parameters and its ordered
/// set of mutually-exclusive outcome branches.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    name: String,
    parameters: Vec<Parameter>,
    branches: Vec<Branch>,
}

impl CommandSpec {
    pub fn new(name: &str, parameters: Vec<Parameter>, branches: Vec<Branch>) -> Self {
        Self {
            name: name.to_string(),
            parameters,
            branches,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn branch(&self, name: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.name() == name)
    }

    /// The unique branch whose precondition holds for the bound (prior
    /// state, parameters, environment).
    pub fn applicable_branch(
        &self,
        prior: &State,
        params: &BTreeMap<String, Value>,
        env: &Environment,
        schema: &VariableSchema,
    ) -> Result<&Branch, SpecError> {
        let ctx = EvalContext {
            prior,
            params,
            posterior: None,
            env,
            schema,
        };

        let mut matched: Vec<&Branch> = Vec::new();
        for branch in &self.branches {
            if eval_bool(branch.precondition(), &ctx)? {
                matched.push(branch);
            }
        }

        match matched.len() {
            1 => Ok(matched[0]),
            0 => Err(AmbiguityError::NoApplicableBranch {
                command: self.name.clone(),
            }
            .into()),
            _ => Err(AmbiguityError::MultipleApplicableBranches {
                command: self.name.clone(),
                branches: matched.iter().map(|b| b.name().to_string()).collect(),
            }
            .into()),
        }
    }
}

/// Registry of command specifications, indexed by command kind.
#[derive(Debug, Clone, Default)]
pub struct SpecLibrary {
    specs: BTreeMap<String, CommandSpec>,
}

impl SpecLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: CommandSpec) {
        self.specs.insert(spec.name().to_string(), spec);
    }

    pub fn spec(&self, kind: &str) -> Result<&CommandSpec, SpecError> {
        self.specs.get(kind).ok_or_else(|| SpecError::UnknownCommand {
            kind: kind.to_string(),
        })
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Whether an observed posterior state satisfies the branch postcondition.
pub fn postcondition_holds(
    branch: &Branch,
    prior: &State,
    params: &BTreeMap<String, Value>,
    posterior: &State,
    env: &Environment,
    schema: &VariableSchema,
) -> Result<bool, EvalError> {
    let ctx = EvalContext {
        prior,
        params,
        posterior: Some(posterior),
        env,
        schema,
    };
    eval_bool(branch.postcondition(), &ctx)
}

/// Seconds the branch allows the command to take from the given prior
/// state.
pub fn timeout_seconds(
    branch: &Branch,
    command: &Command,
    prior: &State,
    env: &Environment,
    config: &Configuration,
) -> f64 {
    let args = TimeoutArgs {
        command,
        prior,
        env,
        config,
    };
    match branch.timeout() {
        Timeout::Fixed(secs) => *secs,
        t @ Timeout::Derived(_) => t.evaluate(&args),
    }
}
