//! Record builder: the stateful half of extraction.
//!
//! Holds the file's calendar date, a cursor to the current record and the
//! append-only output sequence. Records are never closed explicitly; a new
//! timestamp simply supersedes the previous one as the write target.

use crate::error::Result;
use crate::fields::{extract_fields, field_patterns};
use crate::models::{Field, Record};
use chrono::{NaiveDate, NaiveTime};

/// What a data fragment did to the builder state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FragmentOutcome {
    /// Fields written to the current record
    pub written: Vec<Field>,
    /// Subset of `written` that replaced an existing value
    pub overwritten: Vec<Field>,
    /// Readouts discarded because no record exists yet
    pub dropped: usize,
}

/// Accumulates records for one input traversal
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    date: NaiveDate,
    current: Option<usize>,
    records: Vec<Record>,
}

impl RecordBuilder {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            current: None,
            records: Vec::new(),
        }
    }

    /// Open a new record at `time` on the builder's date and make it current
    pub fn on_timestamp(&mut self, time: NaiveTime) {
        self.records.push(Record::new(self.date.and_time(time)));
        self.current = Some(self.records.len() - 1);
    }

    /// Match every field pattern against `text` and write hits to the
    /// current record. Without a current record the readouts are counted
    /// and dropped unparsed, so a bad value there is never an error.
    pub fn on_data_fragment(&mut self, text: &str, line_number: usize) -> Result<FragmentOutcome> {
        let mut outcome = FragmentOutcome::default();

        let Some(index) = self.current else {
            outcome.dropped = field_patterns()
                .iter()
                .map(|pattern| pattern.captures(text).count())
                .sum();
            return Ok(outcome);
        };

        let values = extract_fields(text, line_number)?;
        let record = &mut self.records[index];
        for (field, value) in values {
            if record.set(field, value).is_some() {
                outcome.overwritten.push(field);
            }
            outcome.written.push(field);
        }

        Ok(outcome)
    }

    /// The record currently receiving fields, if any
    pub fn current(&self) -> Option<&Record> {
        self.current.map(|index| &self.records[index])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in creation order
    pub fn finish(self) -> Vec<Record> {
        self.records
    }
}
