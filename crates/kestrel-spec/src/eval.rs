//! Noise-aware evaluation of specification expressions against a bound
//! (prior state, parameters, posterior state, environment) namespace.

use std::collections::BTreeMap;

use kestrel_model::{Environment, State, Value, VariableSchema};

use crate::expr::{Expr, Namespace, OpKind};

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("unbound {namespace} variable '{name}'")]
    UnboundVariable {
        namespace: &'static str,
        name: String,
    },

    #[error("posterior variable '{name}' referenced, but no posterior state is bound")]
    PosteriorUnavailable { name: String },

    #[error("type error: expected {expected}, got {actual}")]
    TypeError {
        expected: &'static str,
        actual: String,
    },

    #[error("operator '{op}' expects {expected} arguments, got {got}")]
    Arity {
        op: &'static str,
        expected: usize,
        got: usize,
    },
}

/// The bound namespaces an expression is evaluated against.
///
/// `posterior` is `None` when evaluating a precondition; referencing a
/// `__` variable then is an error, since applicability is a function of
/// prior state and parameters only.
pub struct EvalContext<'a> {
    pub prior: &'a State,
    pub params: &'a BTreeMap<String, Value>,
    pub posterior: Option<&'a State>,
    pub env: &'a Environment,
    pub schema: &'a VariableSchema,
}

impl<'a> EvalContext<'a> {
    fn resolve(&self, ns: Namespace, name: &str) -> Result<Value, EvalError> {
        match ns {
            // Environment constants share the prior namespace: both are
            // readable before the command runs.
            Namespace::Prior => self
                .prior
                .read(name)
                .or_else(|| self.env.read(name))
                .cloned()
                .ok_or_else(|| EvalError::UnboundVariable {
                    namespace: "prior-state",
                    name: name.to_string(),
                }),
            Namespace::Param => {
                self.params
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EvalError::UnboundVariable {
                        namespace: "parameter",
                        name: name.to_string(),
                    })
            }
            Namespace::Posterior => {
                let state = self
                    .posterior
                    .ok_or_else(|| EvalError::PosteriorUnavailable {
                        name: name.to_string(),
                    })?;
                state
                    .read(name)
                    .cloned()
                    .ok_or_else(|| EvalError::UnboundVariable {
                        namespace: "posterior-state",
                        name: name.to_string(),
                    })
            }
        }
    }

    /// Noise tolerance applicable to a comparison argument: set only for
    /// state-variable references whose schema entry declares noise.
    fn tolerance_of(&self, expr: &Expr) -> Option<f64> {
        match expr {
            Expr::Var(Namespace::Prior | Namespace::Posterior, name) => {
                self.schema.variable(name).and_then(|v| v.noise())
            }
            _ => None,
        }
    }
}

pub fn eval(expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Var(ns, name) => ctx.resolve(*ns, name),
        Expr::Op { op, args } => eval_op(*op, args, ctx),
    }
}

/// Evaluate an expression expected to produce a boolean.
pub fn eval_bool(expr: &Expr, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
    match eval(expr, ctx)? {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::TypeError {
            expected: "bool",
            actual: other.type_name().to_string(),
        }),
    }
}

fn eval_op(op: OpKind, args: &[Expr], ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
    match op {
        OpKind::And => {
            for arg in args {
                if !eval_bool(arg, ctx)? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        OpKind::Or => {
            for arg in args {
                if eval_bool(arg, ctx)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        // The parser enforces arity, but `Expr` values can also be built
        // directly; a malformed operand list must not panic here.
        OpKind::Not => match args {
            [arg] => Ok(Value::Bool(!eval_bool(arg, ctx)?)),
            _ => Err(arity_error(op, 1, args.len())),
        },

        OpKind::Eq => {
            let (lhs, rhs) = binary_args(op, args)?;
            Ok(Value::Bool(eval_eq(lhs, rhs, ctx)?))
        }
        OpKind::Neq => {
            let (lhs, rhs) = binary_args(op, args)?;
            Ok(Value::Bool(!eval_eq(lhs, rhs, ctx)?))
        }

        OpKind::Lt => eval_num_cmp(op, args, ctx, |a, b| a < b),
        OpKind::Gt => eval_num_cmp(op, args, ctx, |a, b| a > b),
        OpKind::Lte => eval_num_cmp(op, args, ctx, |a, b| a <= b),
        OpKind::Gte => eval_num_cmp(op, args, ctx, |a, b| a >= b),
    }
}

fn arity_error(op: OpKind, expected: usize, got: usize) -> EvalError {
    EvalError::Arity {
        op: op.symbol(),
        expected,
        got,
    }
}

fn binary_args(op: OpKind, args: &[Expr]) -> Result<(&Expr, &Expr), EvalError> {
    match args {
        [lhs, rhs] => Ok((lhs, rhs)),
        _ => Err(arity_error(op, 2, args.len())),
    }
}

/// Noise-aware equality. When either side is a state-variable reference
/// with a declared tolerance, numeric operands compare within it; with two
/// such references the larger tolerance wins. Everything else is exact.
fn eval_eq(lhs: &Expr, rhs: &Expr, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
    let left = eval(lhs, ctx)?;
    let right = eval(rhs, ctx)?;

    let tolerance = match (ctx.tolerance_of(lhs), ctx.tolerance_of(rhs)) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    };

    match (tolerance, &left, &right) {
        (Some(eps), Value::Num(a), Value::Num(b)) => Ok((a - b).abs() <= eps),
        _ => Ok(left == right),
    }
}

fn eval_num_cmp(
    op: OpKind,
    args: &[Expr],
    ctx: &EvalContext<'_>,
    cmp: fn(f64, f64) -> bool,
) -> Result<Value, EvalError> {
    let (lhs, rhs) = binary_args(op, args)?;
    let left = eval(lhs, ctx)?;
    let right = eval(rhs, ctx)?;
    match (&left, &right) {
        (Value::Num(a), Value::Num(b)) => Ok(Value::Bool(cmp(*a, *b))),
        _ => Err(EvalError::TypeError {
            expected: "num",
            actual: format!("{}, {}", left.type_name(), right.type_name()),
        }),
    }
}
