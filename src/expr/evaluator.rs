// SPDX-License-Identifier: MIT

//! Expression evaluation against a variable context
//!
//! Unknown variable references resolve to an undefined sentinel and every
//! comparison touching an undefined operand is `false`. A missing attribute
//! must never take down a whole graph evaluation, so nothing in this module
//! returns an error; parse failures are reported by the parser.

use super::ast::{CompareOp, Expression, Literal, Operand};
use super::context::VariableContext;
use serde_json::{Number, Value};

/// Evaluate an expression to a boolean.
///
/// Bare operands evaluate by truthiness; comparisons against undefined
/// variables are `false` in every direction.
pub fn evaluate(expr: &Expression, ctx: &VariableContext) -> bool {
    match expr {
        Expression::Compare { left, op, right } => evaluate_compare(left, *op, right, ctx),
        Expression::And(left, right) => evaluate(left, ctx) && evaluate(right, ctx),
        Expression::Or(left, right) => evaluate(left, ctx) || evaluate(right, ctx),
        Expression::Not(inner) => !evaluate(inner, ctx),
        Expression::Operand(operand) => truthy(resolve(operand, ctx).as_ref()),
    }
}

/// Evaluate an expression to a value, for template interpolation.
///
/// `None` means the expression referenced an undefined variable and has no
/// value; boolean sub-expressions yield `Value::Bool`.
pub fn evaluate_value(expr: &Expression, ctx: &VariableContext) -> Option<Value> {
    match expr {
        Expression::Operand(operand) => resolve(operand, ctx),
        other => Some(Value::Bool(evaluate(other, ctx))),
    }
}

/// Resolve an operand; `None` is the undefined sentinel
fn resolve(operand: &Operand, ctx: &VariableContext) -> Option<Value> {
    match operand {
        Operand::Var(path) => ctx.get(path).cloned(),
        Operand::Literal(lit) => Some(literal_value(lit)),
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::String(s) => Value::String(s.clone()),
        Literal::Number(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

fn evaluate_compare(left: &Operand, op: CompareOp, right: &Operand, ctx: &VariableContext) -> bool {
    // An undefined variable on either side makes the comparison false,
    // including `missing == null`: the undefined sentinel is distinct from
    // an explicitly stored null.
    let (Some(left), Some(right)) = (resolve(left, ctx), resolve(right, ctx)) else {
        return false;
    };

    match op {
        CompareOp::Eq => values_equal(&left, &right),
        CompareOp::NotEq => !values_equal(&left, &right),
        CompareOp::Gt => compare_numbers(&left, &right, |a, b| a > b),
        CompareOp::Gte => compare_numbers(&left, &right, |a, b| a >= b),
        CompareOp::Lt => compare_numbers(&left, &right, |a, b| a < b),
        CompareOp::Lte => compare_numbers(&left, &right, |a, b| a <= b),
        CompareOp::Contains => check_contains(&left, &right),
        CompareOp::In => check_contains(&right, &left),
    }
}

/// Equality with numeric coercion.
///
/// When the operands are typed differently and one is a numeric-looking
/// string, both are compared as numbers. String equality is exact and
/// case-sensitive.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
            _ => false,
        },
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Null, Value::Null) => true,
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            match (numeric_value(left), numeric_value(right)) {
                (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
                _ => false,
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => a == b,
        _ => false,
    }
}

fn compare_numbers<F>(left: &Value, right: &Value, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (numeric_value(left), numeric_value(right)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// Numbers pass through; numeric-looking strings coerce
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn check_contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::String(s), Value::String(sub)) => s.contains(sub.as_str()),
        (Value::Array(arr), needle) => arr.iter().any(|v| values_equal(v, needle)),
        (Value::Object(map), Value::String(key)) => map.contains_key(key),
        _ => false,
    }
}

/// Truthiness of a resolved value; the undefined sentinel is false
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(arr)) => !arr.is_empty(),
        Some(Value::Object(_)) => true,
    }
}
