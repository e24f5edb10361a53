/// Materialized rows of the loaded table, merged with the change overlay.

use std::collections::HashMap;

use crate::error::StoreError;
use crate::export::iso_timestamp;
use crate::overlay::{ChangeEntry, ChangeOverlay};
use crate::value::{record_id, Record, Value};

/// Holds the rows of the focal table after a load, plus the column order of
/// the producing query. Rows with an integer `id` are indexed for editing;
/// rows without one are displayable only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    columns: Vec<String>,
    records: Vec<Record>,
    ids: HashMap<i64, usize>,
}

impl RecordStore {
    pub fn new() -> Self {
        RecordStore {
            columns: Vec::new(),
            records: Vec::new(),
            ids: HashMap::new(),
        }
    }

    /// Replace all records and the column set. When a malformed source
    /// repeats an id, the first occurrence keeps the index slot.
    pub fn load(&mut self, columns: Vec<String>, records: Vec<Record>) {
        self.ids = HashMap::new();
        for (position, record) in records.iter().enumerate() {
            if let Some(id) = record_id(record) {
                self.ids.entry(id).or_insert(position);
            }
        }
        self.columns = columns;
        self.records = records;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column order of the producing query; drives rendering and CSV export.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: i64) -> Option<&Record> {
        self.ids.get(&id).and_then(|&position| self.records.get(position))
    }

    /// Rewrite transcript and status on every record the overlay knows,
    /// leaving all other records untouched. Returns how many records were
    /// rewritten. Applying the same overlay twice yields the same state.
    pub fn apply_overlay(&mut self, overlay: &ChangeOverlay) -> usize {
        let mut applied = 0;
        for (id, entry) in overlay.iter() {
            if let Some(&position) = self.ids.get(id) {
                let record = &mut self.records[position];
                record.insert(
                    "transcript".to_string(),
                    Value::Text(entry.transcript.clone()),
                );
                record.insert("status".to_string(), status_value(&entry.status));
                applied += 1;
            }
        }
        applied
    }

    /// Commit a transcript edit: an empty-after-trim transcript derives the
    /// status `"To do"`, any other transcript keeps the record's current
    /// status. The record and the overlay entry for `id` are both updated;
    /// the caller persists the overlay. Returns the updated record.
    pub fn commit_edit(
        &mut self,
        id: i64,
        new_transcript: &str,
        timestamp_ms: i64,
        overlay: &mut ChangeOverlay,
    ) -> Result<Record, StoreError> {
        let position = *self.ids.get(&id).ok_or(StoreError::RecordNotFound(id))?;
        let record = &mut self.records[position];

        let status = if new_transcript.trim().is_empty() {
            Value::Text("To do".to_string())
        } else {
            record.get("status").cloned().unwrap_or(Value::Null)
        };

        record.insert(
            "transcript".to_string(),
            Value::Text(new_transcript.to_string()),
        );
        record.insert("status".to_string(), status.clone());

        overlay.record(
            id,
            ChangeEntry {
                transcript: new_transcript.to_string(),
                status: match status {
                    Value::Null => None,
                    other => Some(other.to_display()),
                },
                timestamp: iso_timestamp(timestamp_ms),
            },
        );

        Ok(record.clone())
    }
}

fn status_value(status: &Option<String>) -> Value {
    match status {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}
