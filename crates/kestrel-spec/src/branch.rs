use std::fmt;
use std::sync::Arc;

use kestrel_model::{Command, Configuration, Environment, State};

use crate::expr::Expr;
use crate::parse::{parse, ParseError};

/// Inputs available to a timeout formula.
pub struct TimeoutArgs<'a> {
    pub command: &'a Command,
    pub prior: &'a State,
    pub env: &'a Environment,
    pub config: &'a Configuration,
}

impl<'a> TimeoutArgs<'a> {
    /// Numeric command argument, or 0.0 if absent or non-numeric.
    pub fn arg_num(&self, name: &str) -> f64 {
        self.command
            .parameter(name)
            .and_then(|v| v.as_num())
            .unwrap_or(0.0)
    }

    /// Numeric prior-state variable, or 0.0 if absent or non-numeric.
    pub fn prior_num(&self, name: &str) -> f64 {
        self.prior
            .read(name)
            .and_then(|v| v.as_num())
            .unwrap_or(0.0)
    }
}

type TimeoutFn = dyn Fn(&TimeoutArgs<'_>) -> f64 + Send + Sync;

/// A branch timeout: either a constant number of seconds, or a pure
/// function of the command's arguments, the prior state, and the mission
/// environment/configuration.
#[derive(Clone)]
pub enum Timeout {
    Fixed(f64),
    Derived(Arc<TimeoutFn>),
}

impl Timeout {
    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&TimeoutArgs<'_>) -> f64 + Send + Sync + 'static,
    {
        Timeout::Derived(Arc::new(f))
    }

    pub fn evaluate(&self, args: &TimeoutArgs<'_>) -> f64 {
        match self {
            Timeout::Fixed(secs) => *secs,
            Timeout::Derived(f) => f(args),
        }
    }
}

impl fmt::Debug for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeout::Fixed(secs) => write!(f, "Timeout::Fixed({secs})"),
            Timeout::Derived(_) => write!(f, "Timeout::Derived(..)"),
        }
    }
}

/// One mutually-exclusive outcome template for a command: a precondition
/// over (prior state, parameters), a noise-tolerant postcondition over
/// (prior state, parameters, posterior state), and a timeout formula.
#[derive(Debug, Clone)]
pub struct Branch {
    name: String,
    precondition: Expr,
    postcondition: Expr,
    timeout: Timeout,
}

impl Branch {
    /// Parse precondition and postcondition from the surface grammar.
    pub fn new(
        name: &str,
        precondition: &str,
        postcondition: &str,
        timeout: Timeout,
    ) -> Result<Self, ParseError> {
        Ok(Self {
            name: name.to_string(),
            precondition: parse(precondition)?,
            postcondition: parse(postcondition)?,
            timeout,
        })
    }

    pub fn from_exprs(name: &str, precondition: Expr, postcondition: Expr, timeout: Timeout) -> Self {
        Self {
            name: name.to_string(),
            precondition,
            postcondition,
            timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn precondition(&self) -> &Expr {
        &self.precondition
    }

    pub fn postcondition(&self) -> &Expr {
        &self.postcondition
    }

    pub fn timeout(&self) -> &Timeout {
        &self.timeout
    }
}
