//! Multi-key stable sort
//!
//! `sortBy=a,b desc` orders by `a` ascending, ties broken by `b`
//! descending. Keys are applied as single-key stable sorts from the last to
//! the first, so earlier keys dominate.

use std::cmp::Ordering;

use serde_json::Value;

use crate::storage::Record;

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Parse `field[ flag],...`; any second token means descending
pub fn parse_sort_keys(raw: &str) -> Vec<SortKey> {
    raw.split(',')
        .filter_map(|part| {
            let mut words = part.split(' ').filter(|w| !w.is_empty());
            let field = words.next()?;
            Some(SortKey {
                field: field.to_string(),
                descending: words.next().is_some(),
            })
        })
        .collect()
}

/// Sort records in place by the given keys
pub fn sort_records(records: &mut [Record], keys: &[SortKey]) {
    for key in keys.iter().rev() {
        records.sort_by(|a, b| {
            let ordering = compare_values(a.get(&key.field), b.get(&key.field));
            if key.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

/// Numeric when both sides are numbers, otherwise a locale-style string
/// comparison of their text forms
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    if let (Some(Value::Number(x)), Some(Value::Number(y))) = (a, b) {
        let x = x.as_f64().unwrap_or(0.0);
        let y = y.as_f64().unwrap_or(0.0);
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    locale_compare(&text_form(a), &text_form(b))
}

/// Case-insensitive first; among equals, lower case sorts before upper case
fn locale_compare(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Text form of a field value; absent fields read as empty
pub fn text_form(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
