//! Expression evaluation over the row cache.
//!
//! Evaluation is result-bearing: arithmetic faults, bad casts, and
//! unresolvable references come back as `Err` and abort the statement at
//! the caller. NULL propagates through operators; comparisons and logic
//! follow three-valued semantics.

use std::cmp::Ordering;

use crate::datum::Value;
use crate::sql::{BinaryOp, Expr, UnaryOp};

use super::cache::RowCache;
use super::error::ExecutorError;

/// Evaluates an expression against the current row cache.
///
/// # Errors
///
/// Returns [`ExecutorError`] for unresolvable column references, operand
/// type mismatches, division by zero, and integer overflow. Aggregate
/// calls never reach this function; the result shaper strips them first.
pub fn eval(expr: &Expr, cache: &RowCache) -> Result<Value, ExecutorError> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(n) => Ok(Value::Float(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Column(col) => cache
            .resolve(col.table.as_deref(), &col.column)
            .map(Clone::clone),
        Expr::Unary { op, operand } => {
            let value = eval(operand, cache)?;
            eval_unary(*op, value)
        }
        Expr::Binary { left, op, right } => {
            let lhs = eval(left, cache)?;
            let rhs = eval(right, cache)?;
            eval_binary(*op, lhs, rhs)
        }
        Expr::IsNull { expr, negated } => {
            let value = eval(expr, cache)?;
            Ok(Value::Bool(value.is_null() != *negated))
        }
        Expr::Like {
            expr,
            pattern,
            negated,
        } => {
            let value = eval(expr, cache)?;
            let pattern = eval(pattern, cache)?;
            match (value, pattern) {
                (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                (Value::Str(s), Value::Str(p)) => Ok(Value::Bool(like_match(&s, &p) != *negated)),
                (value, pattern) => Err(ExecutorError::TypeMismatch {
                    expected: "STRING LIKE STRING".to_string(),
                    found: format!("{} LIKE {}", value.type_name(), pattern.type_name()),
                }),
            }
        }
        Expr::Aggregate { .. } => Err(ExecutorError::Unsupported(
            "aggregate call outside an aggregation query".to_string(),
        )),
    }
}

/// Converts a WHERE result to a filtering decision.
///
/// NULL filters the row out; numbers follow the usual nonzero-is-true
/// convention.
///
/// # Errors
///
/// Returns `ExecutorError::TypeMismatch` for strings and dates.
pub fn to_condition(value: &Value) -> Result<bool, ExecutorError> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::Int(n) => Ok(*n != 0),
        Value::Float(n) => Ok(*n != 0.0),
        other => Err(ExecutorError::TypeMismatch {
            expected: "boolean condition".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> Result<Value, ExecutorError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match (op, value) {
        (UnaryOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or(ExecutorError::IntegerOverflow),
        (UnaryOp::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, value) => Err(ExecutorError::TypeMismatch {
            expected: match op {
                UnaryOp::Neg => "numeric operand".to_string(),
                UnaryOp::Not => "boolean operand".to_string(),
            },
            found: value.type_name().to_string(),
        }),
    }
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExecutorError> {
    match op {
        BinaryOp::And | BinaryOp::Or => eval_logic(op, lhs, rhs),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            eval_arithmetic(op, lhs, rhs)
        }
        _ => eval_comparison(op, lhs, rhs),
    }
}

/// Three-valued AND/OR. Both operands are already evaluated; a false
/// AND-side or a true OR-side decides even when the other side is NULL.
fn eval_logic(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExecutorError> {
    let side = |value: Value| -> Result<Option<bool>, ExecutorError> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(b)),
            other => Err(ExecutorError::TypeMismatch {
                expected: "boolean operand".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    };
    let l = side(lhs)?;
    let r = side(rhs)?;
    let result = match op {
        BinaryOp::And => match (l, r) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        BinaryOp::Or => match (l, r) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        _ => unreachable!("eval_logic only handles AND/OR"),
    };
    Ok(result.map_or(Value::Null, Value::Bool))
}

fn eval_arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExecutorError> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div => {
                    if b == 0 {
                        return Err(ExecutorError::DivisionByZero);
                    }
                    a.checked_div(b)
                }
                BinaryOp::Mod => {
                    if b == 0 {
                        return Err(ExecutorError::DivisionByZero);
                    }
                    a.checked_rem(b)
                }
                _ => unreachable!("eval_arithmetic only handles + - * / %"),
            };
            result.map(Value::Int).ok_or(ExecutorError::IntegerOverflow)
        }
        (lhs, rhs) => {
            let a = numeric_operand(&lhs)?;
            let b = numeric_operand(&rhs)?;
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => {
                    if b == 0.0 {
                        return Err(ExecutorError::DivisionByZero);
                    }
                    a / b
                }
                BinaryOp::Mod => {
                    if b == 0.0 {
                        return Err(ExecutorError::DivisionByZero);
                    }
                    a % b
                }
                _ => unreachable!("eval_arithmetic only handles + - * / %"),
            };
            Ok(Value::Float(result))
        }
    }
}

fn numeric_operand(value: &Value) -> Result<f64, ExecutorError> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(n) => Ok(*n),
        other => Err(ExecutorError::TypeMismatch {
            expected: "numeric operand".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

fn eval_comparison(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExecutorError> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }
    let ordering = lhs
        .compare(&rhs)
        .ok_or_else(|| ExecutorError::TypeMismatch {
            expected: format!("operand comparable with {}", lhs.type_name()),
            found: rhs.type_name().to_string(),
        })?;
    let result = match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Neq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        _ => unreachable!("eval_comparison only handles comparisons"),
    };
    Ok(Value::Bool(result))
}

/// SQL LIKE matching: `%` matches any run, `_` matches one character.
fn like_match(s: &str, pattern: &str) -> bool {
    let s: Vec<char> = s.chars().collect();
    let p: Vec<char> = pattern.chars().collect();

    // dp[j] = does p[..j] match the current prefix of s
    let mut dp = vec![false; p.len() + 1];
    dp[0] = true;
    for j in 1..=p.len() {
        dp[j] = dp[j - 1] && p[j - 1] == '%';
    }

    for i in 1..=s.len() {
        let mut prev_diag = dp[0];
        dp[0] = false;
        for j in 1..=p.len() {
            let cur = dp[j];
            dp[j] = match p[j - 1] {
                '%' => dp[j - 1] || cur,
                '_' => prev_diag,
                ch => prev_diag && ch == s[i - 1],
            };
            prev_diag = cur;
        }
    }
    dp[p.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Parser;

    fn eval_str(input: &str) -> Result<Value, ExecutorError> {
        let mut parser = Parser::new(input).unwrap();
        let expr = parser.parse_expr().unwrap();
        eval(&expr, &RowCache::new())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_str("1 + 2 * 3").unwrap(), Value::Int(7));
        assert_eq!(eval_str("7 / 2").unwrap(), Value::Int(3));
        assert_eq!(eval_str("7 % 3").unwrap(), Value::Int(1));
        assert_eq!(eval_str("1 + 0.5").unwrap(), Value::Float(1.5));
        assert_eq!(eval_str("-3 * -1").unwrap(), Value::Int(3));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(
            eval_str("1 / 0"),
            Err(ExecutorError::DivisionByZero)
        ));
        assert!(matches!(
            eval_str("1.0 / 0.0"),
            Err(ExecutorError::DivisionByZero)
        ));
        assert!(matches!(
            eval_str("1 % 0"),
            Err(ExecutorError::DivisionByZero)
        ));
    }

    #[test]
    fn test_overflow() {
        assert!(matches!(
            eval_str("9223372036854775807 + 1"),
            Err(ExecutorError::IntegerOverflow)
        ));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval_str("1 < 2").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("2 <= 1").unwrap(), Value::Bool(false));
        assert_eq!(eval_str("1 = 1.0").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("'abc' < 'abd'").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("1 <> 2").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_incompatible_comparison_errors() {
        assert!(matches!(
            eval_str("1 = 'one'"),
            Err(ExecutorError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_null_propagation() {
        assert_eq!(eval_str("NULL + 1").unwrap(), Value::Null);
        assert_eq!(eval_str("NULL = NULL").unwrap(), Value::Null);
        assert_eq!(eval_str("NULL IS NULL").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("1 IS NOT NULL").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_three_valued_logic() {
        assert_eq!(eval_str("FALSE AND NULL").unwrap(), Value::Bool(false));
        assert_eq!(eval_str("TRUE AND NULL").unwrap(), Value::Null);
        assert_eq!(eval_str("TRUE OR NULL").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("FALSE OR NULL").unwrap(), Value::Null);
        assert_eq!(eval_str("NOT TRUE").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_like() {
        assert_eq!(eval_str("'hello' LIKE 'h%'").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("'hello' LIKE '_ello'").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("'hello' LIKE 'h_llo'").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("'hello' LIKE 'h'").unwrap(), Value::Bool(false));
        assert_eq!(eval_str("'hello' NOT LIKE 'x%'").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("'' LIKE '%'").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("'ab' LIKE '%%b'").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_to_condition() {
        assert!(to_condition(&Value::Bool(true)).unwrap());
        assert!(!to_condition(&Value::Bool(false)).unwrap());
        assert!(!to_condition(&Value::Null).unwrap());
        assert!(to_condition(&Value::Int(5)).unwrap());
        assert!(!to_condition(&Value::Float(0.0)).unwrap());
        assert!(to_condition(&Value::Str("x".into())).is_err());
    }

    #[test]
    fn test_unresolved_column() {
        assert!(matches!(
            eval_str("ghost"),
            Err(ExecutorError::ColumnNotFound { .. })
        ));
    }
}
