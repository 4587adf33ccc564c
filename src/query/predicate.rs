//! Predicate tree
//!
//! A parsed clause is a single comparison, or an AND / OR node over
//! comparison leaves. Predicates are pure: evaluating one never touches
//! anything but the record passed in.

use serde_json::{Map, Value};

use super::errors::{QueryError, QueryResult};
use super::lexer::{split_clauses, tokenize_comparison, Connective, Operator};
use super::value::{compare, loose_eq, strict_eq};

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Decoded JSON scalar
    Scalar(Value),
    /// Decoded list for `in`
    List(Vec<Value>),
}

/// `<field><operator><literal>`
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub field: String,
    pub operator: Operator,
    pub operand: Operand,
}

impl Comparison {
    /// Parse one comparison
    pub fn parse(text: &str) -> QueryResult<Self> {
        let tokens = tokenize_comparison(text)?;

        let operand = match tokens.operator {
            Operator::In => Operand::List(decode_list(text, tokens.literal)?),
            Operator::Like => {
                let literal = decode_literal(text, tokens.literal)?;
                if !literal.is_string() {
                    return Err(QueryError::parse(text, "like expects a string literal"));
                }
                Operand::Scalar(literal)
            }
            _ => Operand::Scalar(decode_literal(text, tokens.literal)?),
        };

        Ok(Self {
            field: tokens.field.to_string(),
            operator: tokens.operator,
            operand,
        })
    }

    /// Test a record
    pub fn evaluate(&self, record: &Map<String, Value>) -> QueryResult<bool> {
        let field = record.get(&self.field);

        match (&self.operator, &self.operand) {
            (Operator::In, Operand::List(items)) => Ok(field
                .map(|value| items.iter().any(|item| strict_eq(value, item)))
                .unwrap_or(false)),
            (Operator::Like, Operand::Scalar(Value::String(needle))) => match field {
                Some(Value::String(haystack)) => Ok(haystack
                    .to_lowercase()
                    .contains(&needle.to_lowercase())),
                _ => Err(QueryError::evaluation(
                    &self.field,
                    self.operator.symbol(),
                    "field value is not a string",
                )),
            },
            (Operator::Eq, Operand::Scalar(literal)) => Ok(loose_eq(field, literal)),
            (Operator::Lt, Operand::Scalar(literal)) => {
                Ok(compare(field, literal).is_some_and(|o| o.is_lt()))
            }
            (Operator::Lte, Operand::Scalar(literal)) => {
                Ok(compare(field, literal).is_some_and(|o| o.is_le()))
            }
            (Operator::Gt, Operand::Scalar(literal)) => {
                Ok(compare(field, literal).is_some_and(|o| o.is_gt()))
            }
            (Operator::Gte, Operand::Scalar(literal)) => {
                Ok(compare(field, literal).is_some_and(|o| o.is_ge()))
            }
            _ => Err(QueryError::evaluation(
                &self.field,
                self.operator.symbol(),
                "operand does not fit the operator",
            )),
        }
    }
}

/// A compiled WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// No connective
    Single(Comparison),
    /// Every comparison must hold
    All(Vec<Comparison>),
    /// At least one comparison must hold
    Any(Vec<Comparison>),
}

impl Predicate {
    /// Parse a WHERE clause
    pub fn parse(clause: &str) -> QueryResult<Self> {
        let (connective, parts) = split_clauses(clause);
        let comparisons = parts
            .into_iter()
            .map(Comparison::parse)
            .collect::<QueryResult<Vec<_>>>()
            .map_err(|err| QueryError::parse(clause, err.reason()))?;

        Ok(match connective {
            None => match comparisons.into_iter().next() {
                Some(single) => Predicate::Single(single),
                None => return Err(QueryError::parse(clause, "empty clause")),
            },
            Some(Connective::And) => Predicate::All(comparisons),
            Some(Connective::Or) => Predicate::Any(comparisons),
        })
    }

    /// Test a record.
    ///
    /// Every comparison is evaluated, so a type error in any of them is
    /// reported even when the result is already decided.
    pub fn evaluate(&self, record: &Map<String, Value>) -> QueryResult<bool> {
        match self {
            Predicate::Single(comparison) => comparison.evaluate(record),
            Predicate::All(comparisons) => comparisons
                .iter()
                .try_fold(true, |acc, c| Ok(c.evaluate(record)? && acc)),
            Predicate::Any(comparisons) => comparisons
                .iter()
                .try_fold(false, |acc, c| Ok(c.evaluate(record)? || acc)),
        }
    }

    /// Comparisons in clause order
    pub fn comparisons(&self) -> &[Comparison] {
        match self {
            Predicate::Single(c) => std::slice::from_ref(c),
            Predicate::All(cs) | Predicate::Any(cs) => cs,
        }
    }
}

fn decode_literal(text: &str, literal: &str) -> QueryResult<Value> {
    serde_json::from_str(literal)
        .map_err(|e| QueryError::parse(text, format!("invalid literal {}: {}", literal, e)))
}

/// Decode `(a,b,c)`: the items between the first `(` and the next `)`
fn decode_list(text: &str, literal: &str) -> QueryResult<Vec<Value>> {
    let inner = literal
        .find('(')
        .and_then(|open| {
            let rest = &literal[open + 1..];
            rest.find(')').map(|close| &rest[..close])
        })
        .filter(|inner| !inner.is_empty())
        .ok_or_else(|| QueryError::parse(text, "in expects a parenthesized list"))?;

    serde_json::from_str::<Vec<Value>>(&format!("[{}]", inner))
        .map_err(|e| QueryError::parse(text, format!("invalid list ({}): {}", inner, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn matches(clause: &str, value: Value) -> bool {
        Predicate::parse(clause)
            .unwrap()
            .evaluate(&record(value))
            .unwrap()
    }

    #[test]
    fn test_ordering_operators() {
        assert!(matches("age>=18", json!({"age": 18})));
        assert!(!matches("age>18", json!({"age": 18})));
        assert!(matches("age<=18", json!({"age": 17})));
        assert!(matches("age<18", json!({"age": 17})));
        assert!(!matches("age<18", json!({"name": "no age"})));
    }

    #[test]
    fn test_equality_with_quoted_string() {
        assert!(matches(r#"name="Ann""#, json!({"name": "Ann"})));
        assert!(!matches(r#"name="Ann""#, json!({"name": "Bob"})));
        assert!(matches("active=true", json!({"active": true})));
        assert!(matches("deleted=null", json!({})));
    }

    #[test]
    fn test_like_is_case_insensitive_substring() {
        assert!(matches(r#"title like "LASAG""#, json!({"title": "Easy Lasagna"})));
        assert!(!matches(r#"title like "pizza""#, json!({"title": "Easy Lasagna"})));
    }

    #[test]
    fn test_like_on_non_string_is_a_type_error() {
        let predicate = Predicate::parse(r#"age like "1""#).unwrap();
        let err = predicate.evaluate(&record(json!({"age": 10}))).unwrap_err();
        assert!(matches!(err, QueryError::Evaluation { .. }));
    }

    #[test]
    fn test_in_list_membership() {
        assert!(matches(r#"city in ("A","B")"#, json!({"city": "B"})));
        assert!(!matches(r#"city in ("A","B")"#, json!({"city": "C"})));
        assert!(matches("n in (1, 2, 3)", json!({"n": 2})));
        assert!(!matches("n in (1, 2, 3)", json!({})));
    }

    #[test]
    fn test_connectives() {
        let clause = r#"age>=18 and city="Sofia""#;
        assert!(matches(clause, json!({"age": 20, "city": "Sofia"})));
        assert!(!matches(clause, json!({"age": 20, "city": "Varna"})));

        let clause = r#"age<18 OR city="Sofia""#;
        assert!(matches(clause, json!({"age": 20, "city": "Sofia"})));
        assert!(matches(clause, json!({"age": 10, "city": "Varna"})));
        assert!(!matches(clause, json!({"age": 20, "city": "Varna"})));
    }

    #[test]
    fn test_shapes() {
        assert!(matches!(Predicate::parse("a=1").unwrap(), Predicate::Single(_)));
        assert!(matches!(Predicate::parse("a=1 and b=2").unwrap(), Predicate::All(_)));
        assert_eq!(Predicate::parse("a=1 or b=2 or c=3").unwrap().comparisons().len(), 3);
    }

    #[test]
    fn test_parse_failures() {
        for clause in ["age", "name=Ann", "a in 1,2", "a in ()", r#"a like 5"#, "a=1 and b"] {
            let err = Predicate::parse(clause).unwrap_err();
            assert!(matches!(err, QueryError::Parse { .. }), "{}", clause);
        }
    }

    #[test]
    fn test_mixed_connectives_split_on_and() {
        // The " or " half stays inside the first literal, which then fails to decode
        assert!(Predicate::parse("a=1 or b=2 and c=3").is_err());
    }
}
