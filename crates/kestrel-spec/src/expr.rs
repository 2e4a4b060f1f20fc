use serde::Serialize;

use kestrel_model::Value;

/// Which of the three disjoint variable namespaces a reference lives in.
///
/// In the surface grammar: `_name` is prior-state, `$name` is a command
/// parameter, `__name` is posterior-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Prior,
    Param,
    Posterior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    And,
    Or,
    Not,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl OpKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            OpKind::And => "and",
            OpKind::Or => "or",
            OpKind::Not => "not",
            OpKind::Eq => "=",
            OpKind::Neq => "/=",
            OpKind::Lt => "<",
            OpKind::Gt => ">",
            OpKind::Lte => "<=",
            OpKind::Gte => ">=",
        }
    }
}

/// A parsed specification expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Literal(Value),
    Var(Namespace, String),
    Op { op: OpKind, args: Vec<Expr> },
}

impl Expr {
    /// All state-variable references (prior and posterior) in the
    /// expression, in evaluation order.
    pub fn state_refs(&self) -> Vec<(Namespace, &str)> {
        let mut out = Vec::new();
        self.collect_state_refs(&mut out);
        out
    }

    fn collect_state_refs<'a>(&'a self, out: &mut Vec<(Namespace, &'a str)>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Var(ns, name) => {
                if matches!(ns, Namespace::Prior | Namespace::Posterior) {
                    out.push((*ns, name.as_str()));
                }
            }
            Expr::Op { args, .. } => {
                for a in args {
                    a.collect_state_refs(out);
                }
            }
        }
    }

    /// Whether the expression mentions any posterior-state variable.
    pub fn references_posterior(&self) -> bool {
        match self {
            Expr::Literal(_) => false,
            Expr::Var(ns, _) => *ns == Namespace::Posterior,
            Expr::Op { args, .. } => args.iter().any(Expr::references_posterior),
        }
    }
}
