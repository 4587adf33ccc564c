//! WHERE clause tokenizer
//!
//! Splits a clause on its connective and breaks each comparison into
//! `(field, operator, literal)` text tokens. Literal decoding happens in
//! the parser.

use std::fmt;

use super::errors::{QueryError, QueryResult};

/// Connective joining the comparisons of a clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    /// Literal separator text
    pub fn as_str(&self) -> &'static str {
        match self {
            Connective::And => " and ",
            Connective::Or => " or ",
        }
    }
}

/// Comparison operators, in matching precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lte,
    Lt,
    Gte,
    Gt,
    Eq,
    Like,
    In,
}

impl Operator {
    /// Matching order at a given position: longer symbols first
    pub const PRECEDENCE: [Operator; 7] = [
        Operator::Lte,
        Operator::Lt,
        Operator::Gte,
        Operator::Gt,
        Operator::Eq,
        Operator::Like,
        Operator::In,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Lte => "<=",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Gt => ">",
            Operator::Eq => "=",
            Operator::Like => " like ",
            Operator::In => " in ",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Raw pieces of one comparison, trimmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonTokens<'a> {
    pub field: &'a str,
    pub operator: Operator,
    pub literal: &'a str,
}

/// Split a clause into comparisons.
///
/// `" and "` is checked before `" or "`. A clause with no connective yields
/// itself as the only comparison.
pub fn split_clauses(clause: &str) -> (Option<Connective>, Vec<&str>) {
    for connective in [Connective::And, Connective::Or] {
        let parts = split_ignore_ascii_case(clause, connective.as_str());
        if parts.len() > 1 {
            return (Some(connective), parts);
        }
    }
    (None, vec![clause.trim()])
}

/// Break a comparison into field, operator and literal.
///
/// The field is the shortest non-empty prefix followed by an operator that
/// leaves a non-empty literal behind.
pub fn tokenize_comparison(text: &str) -> QueryResult<ComparisonTokens<'_>> {
    let bytes = text.as_bytes();

    for pos in 1..bytes.len() {
        for operator in Operator::PRECEDENCE {
            let symbol = operator.symbol().as_bytes();
            let end = pos + symbol.len();
            if end >= bytes.len() || !bytes[pos..end].eq_ignore_ascii_case(symbol) {
                continue;
            }

            let field = text[..pos].trim();
            let literal = text[end..].trim();
            if field.is_empty() {
                return Err(QueryError::parse(text, "missing field name"));
            }
            if literal.is_empty() {
                return Err(QueryError::parse(text, "missing literal"));
            }

            return Ok(ComparisonTokens {
                field,
                operator,
                literal,
            });
        }
    }

    Err(QueryError::parse(text, "no comparison operator found"))
}

/// Split on every non-overlapping, ASCII case-insensitive occurrence of `sep`
fn split_ignore_ascii_case<'a>(s: &'a str, sep: &str) -> Vec<&'a str> {
    let bytes = s.as_bytes();
    let sep = sep.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i + sep.len() <= bytes.len() {
        if bytes[i..i + sep.len()].eq_ignore_ascii_case(sep) {
            parts.push(&s[start..i]);
            i += sep.len();
            start = i;
        } else {
            i += 1;
        }
    }
    parts.push(&s[start..]);
    parts
}
