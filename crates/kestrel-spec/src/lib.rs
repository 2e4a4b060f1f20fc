//! Command specifications: a prefix-expression predicate grammar, a
//! noise-aware evaluator, and per-command branch sets with derived
//! timeouts. Includes the built-in copter library.

pub mod branch;
pub mod copter;
pub mod engine;
pub mod eval;
pub mod expr;
pub mod geo;
pub mod parse;

pub use branch::{Branch, Timeout, TimeoutArgs};
pub use copter::LibraryError;
pub use engine::{
    postcondition_holds, timeout_seconds, AmbiguityError, CommandSpec, SpecError, SpecLibrary,
};
pub use eval::{eval, eval_bool, EvalContext, EvalError};
pub use expr::{Expr, Namespace, OpKind};
pub use parse::{parse, ParseError};
