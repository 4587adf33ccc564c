//! # Result Pipeline
//!
//! Turns the raw read result of a collection into the response payload.
//! Stages run in a fixed order, each only when its option is present:
//!
//! 1. filter (`where`)
//! 2. sort (`sortBy`)
//! 3. offset (`offset`)
//! 4. page size (`pageSize`)
//! 5. distinct (`distinct`)
//! 6. count (`count`), which ends the pipeline
//! 7. select (`select`)
//! 8. load (`load`)
//!
//! Stages 1-6 only apply to lists. Select and load also apply to a single
//! record. Every stage works on owned copies of the stored records.

pub mod descriptor;
pub mod relations;
pub mod sort;

use std::collections::HashSet;

use serde_json::Value;

use crate::observability::EventSink;
use crate::query::{Predicate, QueryResult};
use crate::storage::Record;

pub use descriptor::{QueryDescriptor, QueryMap, DEFAULT_PAGE_SIZE};
pub use relations::{
    parse_relations, PreloadedRelations, RelationLoader, RelationSource, RelationSpec,
};
pub use sort::{parse_sort_keys, sort_records, SortKey};

/// Separator joining field values into a distinct key
pub const DISTINCT_SEPARATOR: &str = "::";

/// Read result flowing through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    List(Vec<Record>),
    Single(Record),
    Count(usize),
}

impl Payload {
    pub fn into_value(self) -> Value {
        match self {
            Payload::List(records) => {
                Value::Array(records.into_iter().map(Value::Object).collect())
            }
            Payload::Single(record) => Value::Object(record),
            Payload::Count(n) => Value::from(n),
        }
    }
}

/// The read-side stage sequence for one request
pub struct ResultPipeline<'a> {
    descriptor: &'a QueryDescriptor,
    sink: &'a dyn EventSink,
}

impl<'a> ResultPipeline<'a> {
    pub fn new(descriptor: &'a QueryDescriptor, sink: &'a dyn EventSink) -> Self {
        Self { descriptor, sink }
    }

    /// Relations requested through `load`
    pub fn relations(&self) -> Vec<RelationSpec> {
        self.descriptor
            .load
            .as_deref()
            .map(|raw| parse_relations(raw, self.sink))
            .unwrap_or_default()
    }

    /// Run every stage
    pub fn run(
        &self,
        payload: Payload,
        relations: &[RelationSpec],
        source: &dyn RelationSource,
    ) -> QueryResult<Payload> {
        let payload = match payload {
            Payload::List(records) => {
                let records = self.shape(records)?;
                if self.descriptor.count {
                    return Ok(Payload::Count(records.len()));
                }
                Payload::List(records)
            }
            other => other,
        };

        let payload = self.select(payload);
        Ok(self.load(payload, relations, source))
    }

    /// Stages 1-5
    fn shape(&self, records: Vec<Record>) -> QueryResult<Vec<Record>> {
        let mut records = match self.descriptor.where_clause.as_deref() {
            Some(clause) => self.filter(records, clause)?,
            None => records,
        };

        if let Some(raw) = self.descriptor.sort_by.as_deref() {
            sort_records(&mut records, &parse_sort_keys(raw));
        }

        let start = self.descriptor.offset_start(records.len());
        records.drain(..start);

        if let Some(end) = self.descriptor.page_end(records.len()) {
            records.truncate(end);
        }

        if let Some(fields) = self.descriptor.distinct_fields() {
            records = distinct(records, &fields);
        }

        Ok(records)
    }

    fn filter(&self, records: Vec<Record>, clause: &str) -> QueryResult<Vec<Record>> {
        let predicate = Predicate::parse(clause).map_err(|err| {
            self.sink
                .warn("WHERE_REJECTED", &[("clause", clause), ("reason", err.reason())]);
            err
        })?;

        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            if predicate.evaluate(&record)? {
                kept.push(record);
            }
        }
        Ok(kept)
    }

    fn select(&self, payload: Payload) -> Payload {
        let Some(fields) = self.descriptor.select_fields() else {
            return payload;
        };
        match payload {
            Payload::List(records) => {
                Payload::List(records.iter().map(|r| project(r, &fields)).collect())
            }
            Payload::Single(record) => Payload::Single(project(&record, &fields)),
            count => count,
        }
    }

    fn load(
        &self,
        payload: Payload,
        relations: &[RelationSpec],
        source: &dyn RelationSource,
    ) -> Payload {
        if relations.is_empty() {
            return payload;
        }

        let loader = RelationLoader::new(source, self.sink);
        loader.announce(relations);
        match payload {
            Payload::List(records) => Payload::List(
                records
                    .into_iter()
                    .map(|r| loader.load(r, relations))
                    .collect(),
            ),
            Payload::Single(record) => Payload::Single(loader.load(record, relations)),
            count => count,
        }
    }
}

/// Keep the first record for each composite key, in first-seen order
pub fn distinct(records: Vec<Record>, fields: &[String]) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let key = fields
                .iter()
                .map(|f| sort::text_form(record.get(f)))
                .collect::<Vec<_>>()
                .join(DISTINCT_SEPARATOR);
            seen.insert(key)
        })
        .collect()
}

/// Copy of `record` holding only `fields` that are present
pub fn project(record: &Record, fields: &[String]) -> Record {
    fields
        .iter()
        .filter_map(|f| record.get(f).map(|v| (f.clone(), v.clone())))
        .collect()
}
