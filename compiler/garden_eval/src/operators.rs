//! Operator semantics over evaluated operands.
//!
//! The operator set is fixed, so dispatch is a match on [`Operator`].
//! Integer arithmetic is checked; mixing ints and floats promotes to float.
//! `and`/`or` short-circuit in the evaluator, which only passes the operands
//! it actually consulted.
//!
//! Numeric comparisons follow IEEE 754: `-0.0` equals `0.0`, and NaN is
//! unequal and unordered with everything. The total order of [`Value`] is
//! only for collections and result comparison.

use std::cmp::Ordering;

use garden_ir::Operator;

use crate::errors::{division_by_zero, overflow, type_mismatch, wrong_arity, EvalError, EvalResult};
use crate::value::Value;

/// Numeric view of an operand.
#[derive(Copy, Clone)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(op: Operator, value: &Value) -> Result<Num, EvalError> {
        match value {
            Value::Int(n) => Ok(Num::Int(*n)),
            Value::Float(f) => Ok(Num::Float(*f)),
            other => Err(type_mismatch(op.symbol(), "a number", other)),
        }
    }

    #[expect(clippy::cast_precision_loss, reason = "int to float promotion")]
    fn to_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(n) => Value::Int(n),
            Num::Float(f) => Value::Float(f),
        }
    }
}

/// Apply `op` to already-evaluated operands.
pub fn apply(op: Operator, args: &[Value]) -> EvalResult {
    match op {
        Operator::Add => {
            at_least(op, args, 1)?;
            if args.iter().all(|a| matches!(a, Value::Text(_))) {
                let joined: String = args.iter().filter_map(Value::as_text).collect();
                return Ok(Value::text(joined));
            }
            fold(op, args, i64::checked_add, |a, b| a + b)
        }
        Operator::Sub => {
            at_least(op, args, 1)?;
            if let [only] = args {
                return match Num::of(op, only)? {
                    Num::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(|| overflow("-")),
                    Num::Float(f) => Ok(Value::Float(-f)),
                };
            }
            fold(op, args, i64::checked_sub, |a, b| a - b)
        }
        Operator::Mul => {
            at_least(op, args, 1)?;
            fold(op, args, i64::checked_mul, |a, b| a * b)
        }
        Operator::Div => {
            let (a, b) = binary_nums(op, args)?;
            match (a, b) {
                (_, Num::Int(0)) => Err(division_by_zero()),
                (Num::Int(x), Num::Int(y)) => {
                    x.checked_div(y).map(Value::Int).ok_or_else(|| overflow("/"))
                }
                _ if b.to_f64() == 0.0 => Err(division_by_zero()),
                _ => Ok(Value::Float(a.to_f64() / b.to_f64())),
            }
        }
        Operator::Rem => {
            let (a, b) = binary_nums(op, args)?;
            match (a, b) {
                (_, Num::Int(0)) => Err(division_by_zero()),
                (Num::Int(x), Num::Int(y)) => {
                    x.checked_rem(y).map(Value::Int).ok_or_else(|| overflow("%"))
                }
                _ if b.to_f64() == 0.0 => Err(division_by_zero()),
                _ => Ok(Value::Float(a.to_f64() % b.to_f64())),
            }
        }
        Operator::Eq | Operator::NotEq => {
            let [a, b] = exactly_two(op, args)?;
            let equal = match (a, b) {
                (Value::Float(_), Value::Int(_) | Value::Float(_))
                | (Value::Int(_), Value::Float(_)) => {
                    Num::of(op, a)?.to_f64() == Num::of(op, b)?.to_f64()
                }
                _ => a == b,
            };
            Ok(Value::Bool(if op == Operator::Eq { equal } else { !equal }))
        }
        Operator::Lt | Operator::LtEq | Operator::Gt | Operator::GtEq => {
            let [a, b] = exactly_two(op, args)?;
            let ordering = compare(op, a, b)?;
            Ok(Value::Bool(match op {
                Operator::Lt => ordering == Some(Ordering::Less),
                Operator::LtEq => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                Operator::Gt => ordering == Some(Ordering::Greater),
                _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            }))
        }
        Operator::And | Operator::Or => {
            at_least(op, args, 1)?;
            let mut acc = op == Operator::And;
            for arg in args {
                let b = arg
                    .as_bool()
                    .ok_or_else(|| type_mismatch(op.symbol(), "a bool", arg))?;
                acc = if op == Operator::And { acc && b } else { acc || b };
            }
            Ok(Value::Bool(acc))
        }
        Operator::Not => {
            let [arg] = args else {
                return Err(wrong_arity("not", "1", args.len()));
            };
            arg.as_bool()
                .map(|b| Value::Bool(!b))
                .ok_or_else(|| type_mismatch("not", "a bool", arg))
        }
    }
}

/// Value that decides an `and`/`or` chain early, if any.
pub fn short_circuits(op: Operator, value: &Value) -> bool {
    match op {
        Operator::And => value.as_bool() == Some(false),
        Operator::Or => value.as_bool() == Some(true),
        _ => false,
    }
}

fn at_least(op: Operator, args: &[Value], n: usize) -> Result<(), EvalError> {
    if args.len() < n {
        return Err(wrong_arity(op.symbol(), &format!("at least {n}"), args.len()));
    }
    Ok(())
}

fn exactly_two(op: Operator, args: &[Value]) -> Result<[&Value; 2], EvalError> {
    match args {
        [a, b] => Ok([a, b]),
        _ => Err(wrong_arity(op.symbol(), "2", args.len())),
    }
}

fn binary_nums(op: Operator, args: &[Value]) -> Result<(Num, Num), EvalError> {
    let [a, b] = exactly_two(op, args)?;
    Ok((Num::of(op, a)?, Num::of(op, b)?))
}

fn fold(
    op: Operator,
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult {
    let mut nums = args.iter().map(|a| Num::of(op, a));
    let Some(first) = nums.next() else {
        return Err(wrong_arity(op.symbol(), "at least 1", 0));
    };
    let mut acc = first?;
    for next in nums {
        acc = match (acc, next?) {
            (Num::Int(a), Num::Int(b)) => {
                Num::Int(int_op(a, b).ok_or_else(|| overflow(op.symbol()))?)
            }
            (a, b) => Num::Float(float_op(a.to_f64(), b.to_f64())),
        };
    }
    Ok(acc.into_value())
}

/// `None` when the operands are unordered, which only happens with NaN.
fn compare(op: Operator, a: &Value, b: &Value) -> Result<Option<Ordering>, EvalError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Some(x.cmp(y))),
        (Value::Text(x), Value::Text(y)) => Ok(Some(x.cmp(y))),
        (Value::Text(_), other) => Err(type_mismatch(op.symbol(), "text", other)),
        _ => {
            let x = Num::of(op, a)?.to_f64();
            let y = Num::of(op, b)?.to_f64();
            Ok(x.partial_cmp(&y))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ints(ns: &[i64]) -> Vec<Value> {
        ns.iter().copied().map(Value::Int).collect()
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(apply(Operator::Add, &ints(&[2, 2])), Ok(Value::Int(4)));
        assert_eq!(apply(Operator::Mul, &ints(&[4, 10])), Ok(Value::Int(40)));
        assert_eq!(apply(Operator::Sub, &ints(&[10, 3, 2])), Ok(Value::Int(5)));
        assert_eq!(apply(Operator::Sub, &ints(&[7])), Ok(Value::Int(-7)));
        assert_eq!(apply(Operator::Div, &ints(&[7, 2])), Ok(Value::Int(3)));
        assert_eq!(apply(Operator::Rem, &ints(&[7, 2])), Ok(Value::Int(1)));
    }

    #[test]
    fn test_float_promotion() {
        assert_eq!(
            apply(Operator::Add, &[Value::Int(1), Value::Float(0.5)]),
            Ok(Value::Float(1.5))
        );
        assert_eq!(
            apply(Operator::Div, &[Value::Float(1.0), Value::Int(4)]),
            Ok(Value::Float(0.25))
        );
    }

    #[test]
    fn test_text_concatenation() {
        assert_eq!(
            apply(Operator::Add, &[Value::text("ab"), Value::text("c")]),
            Ok(Value::text("abc"))
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            apply(Operator::Div, &ints(&[1, 0])),
            Err(EvalError::DivisionByZero)
        );
        assert_eq!(
            apply(Operator::Rem, &[Value::Float(1.0), Value::Float(0.0)]),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn test_overflow_is_error() {
        assert_eq!(
            apply(Operator::Add, &ints(&[i64::MAX, 1])),
            Err(EvalError::Overflow { op: "+".to_owned() })
        );
        assert_eq!(
            apply(Operator::Sub, &ints(&[i64::MIN])),
            Err(EvalError::Overflow { op: "-".to_owned() })
        );
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(apply(Operator::Lt, &ints(&[1, 2])), Ok(Value::Bool(true)));
        assert_eq!(apply(Operator::GtEq, &ints(&[2, 2])), Ok(Value::Bool(true)));
        assert_eq!(
            apply(Operator::Eq, &[Value::Int(2), Value::Float(2.0)]),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            apply(Operator::NotEq, &[Value::text("a"), Value::text("a")]),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            apply(Operator::Lt, &[Value::text("a"), Value::text("b")]),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn test_signed_zero_compares_equal() {
        let zero = Value::Float(0.0);
        let negative = Value::Float(-0.0);
        let eq = |a: &Value, b: &Value| apply(Operator::Eq, &[a.clone(), b.clone()]);

        assert_eq!(eq(&zero, &negative), Ok(Value::Bool(true)));
        assert_eq!(eq(&Value::Int(0), &negative), Ok(Value::Bool(true)));
        assert_eq!(
            apply(Operator::NotEq, &[zero.clone(), negative.clone()]),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            apply(Operator::Lt, &[negative.clone(), zero.clone()]),
            Ok(Value::Bool(false))
        );
        assert_eq!(apply(Operator::LtEq, &[zero, negative]), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_nan_is_unordered() {
        let nan = Value::Float(f64::NAN);
        let one = Value::Float(1.0);

        assert_eq!(apply(Operator::Eq, &[nan.clone(), nan.clone()]), Ok(Value::Bool(false)));
        assert_eq!(apply(Operator::NotEq, &[nan.clone(), nan.clone()]), Ok(Value::Bool(true)));
        for op in [Operator::Lt, Operator::LtEq, Operator::Gt, Operator::GtEq] {
            assert_eq!(apply(op, &[nan.clone(), one.clone()]), Ok(Value::Bool(false)));
            assert_eq!(apply(op, &[Value::Int(1), nan.clone()]), Ok(Value::Bool(false)));
        }
    }

    #[test]
    fn test_type_mismatch() {
        let err = apply(Operator::Add, &[Value::Int(1), Value::Bool(true)]);
        assert_eq!(
            err,
            Err(EvalError::TypeMismatch {
                op: "+".to_owned(),
                expected: "a number".to_owned(),
                found: "bool".to_owned(),
            })
        );
        assert!(apply(Operator::Lt, &[Value::text("a"), Value::Int(1)]).is_err());
    }

    #[test]
    fn test_logic() {
        let t = Value::Bool(true);
        let f = Value::Bool(false);
        assert_eq!(apply(Operator::And, &[t.clone(), f.clone()]), Ok(f.clone()));
        assert_eq!(apply(Operator::Or, &[f.clone(), t.clone()]), Ok(t.clone()));
        assert_eq!(apply(Operator::Not, &[f.clone()]), Ok(t.clone()));
        assert!(short_circuits(Operator::And, &f));
        assert!(short_circuits(Operator::Or, &t));
        assert!(!short_circuits(Operator::And, &t));
    }

    #[test]
    fn test_arity() {
        assert_eq!(
            apply(Operator::Div, &ints(&[1])),
            Err(EvalError::Arity {
                callee: "/".to_owned(),
                expected: "2".to_owned(),
                found: 1,
            })
        );
        assert!(apply(Operator::Add, &[]).is_err());
        assert!(apply(Operator::Not, &[]).is_err());
    }
}
