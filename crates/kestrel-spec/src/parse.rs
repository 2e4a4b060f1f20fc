//! Parser for the parenthesized prefix expression grammar used by branch
//! preconditions and postconditions, e.g.
//!
//! ```text
//! (and
//!     (= _armed true)
//!     (= _mode "GUIDED")
//!     (< _altitude 0.3)
//!     (> $altitude _altitude))
//! ```
//!
//! Namespace markers: `_name` prior-state, `$name` parameter, `__name`
//! posterior-state.

use kestrel_model::Value;

use crate::expr::{Expr, Namespace, OpKind};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unexpected token '{token}' at byte {pos}")]
    UnexpectedToken { token: String, pos: usize },

    #[error("unterminated string literal starting at byte {pos}")]
    UnterminatedString { pos: usize },

    #[error("malformed number '{text}' at byte {pos}")]
    BadNumber { text: String, pos: usize },

    #[error("unknown operator '{name}' at byte {pos}")]
    UnknownOperator { name: String, pos: usize },

    #[error("operator '{op}' expects {expected} arguments, got {got}")]
    BadArity {
        op: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("trailing input after expression at byte {pos}")]
    TrailingInput { pos: usize },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Atom(String),
    Str(String),
}

fn tokenize(src: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push((Token::LParen, start)),
            ')' => tokens.push((Token::RParen, start)),
            '"' => {
                let mut s = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    s.push(c);
                }
                if !closed {
                    return Err(ParseError::UnterminatedString { pos: start });
                }
                tokens.push((Token::Str(s), start));
            }
            _ => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                tokens.push((Token::Atom(src[start..end].to_string()), start));
            }
        }
    }

    Ok(tokens)
}

/// Parse a single expression, rejecting trailing input.
pub fn parse(src: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(src)?;
    let mut pos = 0;
    let expr = parse_expr(&tokens, &mut pos)?;
    if pos < tokens.len() {
        return Err(ParseError::TrailingInput {
            pos: tokens[pos].1,
        });
    }
    Ok(expr)
}

fn parse_expr(tokens: &[(Token, usize)], pos: &mut usize) -> Result<Expr, ParseError> {
    let (token, byte) = tokens.get(*pos).ok_or(ParseError::UnexpectedEof)?;
    match token {
        Token::LParen => {
            *pos += 1;
            let (head, head_byte) = tokens.get(*pos).ok_or(ParseError::UnexpectedEof)?;
            let op = match head {
                Token::Atom(name) => operator(name).ok_or_else(|| ParseError::UnknownOperator {
                    name: name.clone(),
                    pos: *head_byte,
                })?,
                other => {
                    return Err(ParseError::UnexpectedToken {
                        token: format!("{other:?}"),
                        pos: *head_byte,
                    })
                }
            };
            *pos += 1;

            let mut args = Vec::new();
            loop {
                let (next, _) = tokens.get(*pos).ok_or(ParseError::UnexpectedEof)?;
                if *next == Token::RParen {
                    *pos += 1;
                    break;
                }
                args.push(parse_expr(tokens, pos)?);
            }

            check_arity(op, args.len())?;
            Ok(Expr::Op { op, args })
        }

        Token::RParen => Err(ParseError::UnexpectedToken {
            token: ")".to_string(),
            pos: *byte,
        }),

        Token::Str(s) => {
            *pos += 1;
            Ok(Expr::Literal(Value::Str(s.clone())))
        }

        Token::Atom(a) => {
            *pos += 1;
            parse_atom(a, *byte)
        }
    }
}

fn parse_atom(atom: &str, byte: usize) -> Result<Expr, ParseError> {
    // The `__` marker must be checked before `_`.
    if let Some(name) = atom.strip_prefix("__") {
        return Ok(Expr::Var(Namespace::Posterior, name.to_string()));
    }
    if let Some(name) = atom.strip_prefix('_') {
        return Ok(Expr::Var(Namespace::Prior, name.to_string()));
    }
    if let Some(name) = atom.strip_prefix('$') {
        return Ok(Expr::Var(Namespace::Param, name.to_string()));
    }
    match atom {
        "true" => return Ok(Expr::Literal(Value::Bool(true))),
        "false" => return Ok(Expr::Literal(Value::Bool(false))),
        _ => {}
    }
    if atom.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+' || c == '.') {
        return atom
            .parse::<f64>()
            .map(|n| Expr::Literal(Value::Num(n)))
            .map_err(|_| ParseError::BadNumber {
                text: atom.to_string(),
                pos: byte,
            });
    }
    Err(ParseError::UnexpectedToken {
        token: atom.to_string(),
        pos: byte,
    })
}

fn operator(name: &str) -> Option<OpKind> {
    match name {
        "and" => Some(OpKind::And),
        "or" => Some(OpKind::Or),
        "not" => Some(OpKind::Not),
        "=" => Some(OpKind::Eq),
        "/=" => Some(OpKind::Neq),
        "<" => Some(OpKind::Lt),
        ">" => Some(OpKind::Gt),
        "<=" => Some(OpKind::Lte),
        ">=" => Some(OpKind::Gte),
        _ => None,
    }
}

fn check_arity(op: OpKind, got: usize) -> Result<(), ParseError> {
    match op {
        OpKind::Not => {
            if got != 1 {
                return Err(ParseError::BadArity {
                    op: op.symbol(),
                    expected: "exactly 1",
                    got,
                });
            }
        }
        OpKind::And | OpKind::Or => {
            if got < 2 {
                return Err(ParseError::BadArity {
                    op: op.symbol(),
                    expected: "at least 2",
                    got,
                });
            }
        }
        _ => {
            if got != 2 {
                return Err(ParseError::BadArity {
                    op: op.symbol(),
                    expected: "exactly 2",
                    got,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_namespaces() {
        assert_eq!(
            parse("_altitude").unwrap(),
            Expr::Var(Namespace::Prior, "altitude".into())
        );
        assert_eq!(
            parse("__altitude").unwrap(),
            Expr::Var(Namespace::Posterior, "altitude".into())
        );
        assert_eq!(
            parse("$altitude").unwrap(),
            Expr::Var(Namespace::Param, "altitude".into())
        );
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse("true").unwrap(), Expr::Literal(Value::Bool(true)));
        assert_eq!(parse("0.3").unwrap(), Expr::Literal(Value::Num(0.3)));
        assert_eq!(parse("-1.5").unwrap(), Expr::Literal(Value::Num(-1.5)));
        assert_eq!(
            parse("\"GUIDED\"").unwrap(),
            Expr::Literal(Value::Str("GUIDED".into()))
        );
    }

    #[test]
    fn test_parse_takeoff_precondition() {
        let expr = parse(
            r#"
            (and
                (= _armed true)
                (= _mode "GUIDED")
                (< _altitude 0.3)
                (> $altitude _altitude)
                (> $altitude 1.0))
            "#,
        )
        .unwrap();

        match expr {
            Expr::Op { op: OpKind::And, args } => assert_eq!(args.len(), 5),
            other => panic!("expected and-expression, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_nested_not() {
        let expr = parse("(not (and (= _armed true) (> $altitude 1.0)))").unwrap();
        assert!(matches!(expr, Expr::Op { op: OpKind::Not, .. }));
    }

    #[test]
    fn test_arity_errors() {
        assert!(matches!(
            parse("(not _armed __armed)"),
            Err(ParseError::BadArity { .. })
        ));
        assert!(matches!(
            parse("(= _armed)"),
            Err(ParseError::BadArity { .. })
        ));
        assert!(matches!(
            parse("(and _armed)"),
            Err(ParseError::BadArity { .. })
        ));
    }

    #[test]
    fn test_unknown_operator() {
        assert!(matches!(
            parse("(xor _a _b)"),
            Err(ParseError::UnknownOperator { .. })
        ));
    }

    #[test]
    fn test_trailing_input_rejected() {
        assert!(matches!(
            parse("(= _a 1.0) (= _b 2.0)"),
            Err(ParseError::TrailingInput { .. })
        ));
    }

    #[test]
    fn test_non_ascii_string_literal() {
        assert_eq!(
            parse("\"GÜIDED\"").unwrap(),
            Expr::Literal(Value::Str("GÜIDED".into()))
        );
        assert_eq!(
            parse("(= _mode \"høver\")").unwrap(),
            Expr::Op {
                op: OpKind::Eq,
                args: vec![
                    Expr::Var(Namespace::Prior, "mode".into()),
                    Expr::Literal(Value::Str("høver".into())),
                ],
            }
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            parse("(= _mode \"GUIDED"),
            Err(ParseError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn test_posterior_detection() {
        let expr = parse("(= __altitude $altitude)").unwrap();
        assert!(expr.references_posterior());
        let expr = parse("(= _altitude $altitude)").unwrap();
        assert!(!expr.references_posterior());
    }
}
