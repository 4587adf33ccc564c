//! Query Descriptor
//!
//! The recognized query-string options of one request, taken from the raw
//! query map. Unrecognized keys are ignored.

use std::collections::HashMap;

use serde::Serialize;

/// Default page size when `pageSize` is present but zero or not a number
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Raw decoded query string: key -> value
pub type QueryMap = HashMap<String, String>;

/// Parsed query-string options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
    pub sort_by: Option<String>,
    pub offset: Option<String>,
    pub page_size: Option<String>,
    pub distinct: Option<String>,
    /// `count` given with a non-empty value, or as a bare key
    pub count: bool,
    pub select: Option<String>,
    pub load: Option<String>,
}

impl QueryDescriptor {
    /// Pick the recognized options out of a query map.
    ///
    /// An option with an empty value counts as absent. A bare key arrives
    /// with a non-empty flag value and counts as present.
    pub fn from_query(query: &QueryMap) -> Self {
        let option = |key: &str| {
            query
                .get(key)
                .filter(|value| !value.is_empty())
                .cloned()
        };

        Self {
            where_clause: option("where"),
            sort_by: option("sortBy"),
            offset: option("offset"),
            page_size: option("pageSize"),
            distinct: option("distinct"),
            count: option("count").is_some(),
            select: option("select"),
            load: option("load"),
        }
    }

    /// Index of the first kept record of a list of `len`.
    ///
    /// A negative offset counts from the end. Anything but a number is 0.
    pub fn offset_start(&self, len: usize) -> usize {
        let n = self.offset.as_deref().and_then(parse_number).unwrap_or(0.0);
        slice_index(n, len)
    }

    /// End of the page in a list of `len`, only when `pageSize` was supplied.
    ///
    /// A negative size drops that many records from the end. Zero or
    /// anything but a number falls back to [`DEFAULT_PAGE_SIZE`].
    pub fn page_end(&self, len: usize) -> Option<usize> {
        self.page_size.as_deref().map(|raw| {
            let n = parse_number(raw)
                .filter(|n| *n != 0.0)
                .unwrap_or(DEFAULT_PAGE_SIZE as f64);
            slice_index(n, len)
        })
    }

    /// Fields of `distinct`
    pub fn distinct_fields(&self) -> Option<Vec<String>> {
        self.distinct.as_deref().map(split_list)
    }

    /// Fields of `select`
    pub fn select_fields(&self) -> Option<Vec<String>> {
        self.select.as_deref().map(split_list)
    }
}

/// Non-empty comma-separated entries
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Clamp a possibly negative, possibly fractional index into `0..=len`
fn slice_index(n: f64, len: usize) -> usize {
    let n = n.trunc();
    let len_f = len as f64;
    if n < 0.0 {
        (len_f + n).max(0.0) as usize
    } else {
        n.min(len_f) as usize
    }
}
