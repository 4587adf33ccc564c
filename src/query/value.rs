//! Value comparison rules for WHERE clauses
//!
//! The record side keeps its stored type; only the literal side is decoded
//! from JSON. Mixed number/string/bool/null operands are compared
//! numerically, the way a loosely-typed client expects (`"5" = 5` holds,
//! `null <= 0` holds). A field absent from the record never satisfies an
//! ordering comparison and only equals `null`.

use std::cmp::Ordering;

use serde_json::Value;

/// Numeric view of a scalar, if it has one
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Ordering between a record field and a literal.
///
/// `None` means the pair is not ordered (every ordering comparison is false).
pub fn compare(field: Option<&Value>, literal: &Value) -> Option<Ordering> {
    let field = field?;
    match (field, literal) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => None,
        _ => {
            let a = to_number(field)?;
            let b = to_number(literal)?;
            a.partial_cmp(&b)
        }
    }
}

/// Loose equality between a record field and a literal
pub fn loose_eq(field: Option<&Value>, literal: &Value) -> bool {
    match (field, literal) {
        (None, Value::Null) | (Some(Value::Null), Value::Null) => true,
        (None, _) | (Some(Value::Null), _) | (Some(_), Value::Null) => false,
        (Some(Value::String(a)), Value::String(b)) => a == b,
        (Some(Value::Bool(a)), Value::Bool(b)) => a == b,
        (Some(Value::Array(_) | Value::Object(_)), _) | (_, Value::Array(_) | Value::Object(_)) => {
            false
        }
        (Some(a), b) => match (to_number(a), to_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

/// Strict equality used for list membership.
///
/// Numbers compare by value, so `1` and `1.0` are the same element.
pub fn strict_eq(field: &Value, element: &Value) -> bool {
    match (field, element) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(_) | Value::Object(_), _) => false,
        (a, b) => a == b,
    }
}
