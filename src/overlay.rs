/// Durable transcript edits, kept out-of-band from the database.
///
/// Edits live in a key-value storage capability under one well-known key
/// and are merged over freshly loaded rows, so they survive reloads without
/// ever mutating the canonical source file. Only a snapshot export writes
/// them back into the database itself.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The single storage key the overlay lives under.
pub const STORAGE_KEY: &str = "podcastTranscriptChanges";

/// Key-value persistence capability (browser local storage in the original
/// deployment). An absent key means an empty overlay.
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// In-memory `Storage` for tests and the demo server.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage {
            entries: HashMap::new(),
        }
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

/// One pending edit: the overridden transcript, the status derived at edit
/// time (null when the record had none), and when the edit was made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub transcript: String,
    pub status: Option<String>,
    pub timestamp: String,
}

/// The pending edits, keyed by record id. An entry always wins over the
/// database's original values for that id when rows are materialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeOverlay {
    entries: HashMap<i64, ChangeEntry>,
}

impl ChangeOverlay {
    pub fn new() -> Self {
        ChangeOverlay {
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&ChangeEntry> {
        self.entries.get(&id)
    }

    /// Create or replace the entry for one record.
    pub fn record(&mut self, id: i64, entry: ChangeEntry) {
        self.entries.insert(id, entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&i64, &ChangeEntry)> {
        self.entries.iter()
    }

    /// Ids of all pending entries, sorted for deterministic replay order.
    pub fn ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Read the overlay from storage. An absent key is an empty overlay; a
    /// malformed payload or non-numeric id is skipped with a warning rather
    /// than failing the load.
    pub fn load(storage: &dyn Storage) -> ChangeOverlay {
        let mut overlay = ChangeOverlay::new();
        let raw = match storage.get(STORAGE_KEY) {
            Some(raw) => raw,
            None => return overlay,
        };

        match serde_json::from_str::<HashMap<String, ChangeEntry>>(&raw) {
            Ok(entries) => {
                for (key, entry) in entries {
                    match key.parse::<i64>() {
                        Ok(id) => {
                            overlay.entries.insert(id, entry);
                        }
                        Err(_) => warn!("skipping overlay entry with non-numeric id '{}'", key),
                    }
                }
            }
            Err(e) => warn!("discarding malformed overlay payload: {}", e),
        }
        overlay
    }

    /// Write the overlay to storage under [`STORAGE_KEY`], ids as string keys.
    pub fn persist(&self, storage: &mut dyn Storage) {
        let entries: HashMap<String, &ChangeEntry> = self
            .entries
            .iter()
            .map(|(id, entry)| (id.to_string(), entry))
            .collect();
        match serde_json::to_string(&entries) {
            Ok(payload) => storage.set(STORAGE_KEY, &payload),
            Err(e) => warn!("failed to serialize overlay: {}", e),
        }
    }

    /// Drop every pending edit from storage.
    pub fn clear(storage: &mut dyn Storage) {
        storage.set(STORAGE_KEY, "{}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(transcript: &str, status: Option<&str>) -> ChangeEntry {
        ChangeEntry {
            transcript: transcript.to_string(),
            status: status.map(String::from),
            timestamp: "2024-03-01T10:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let mut storage = MemoryStorage::new();
        let mut overlay = ChangeOverlay::new();
        overlay.record(7, entry("new words", Some("Pending")));
        overlay.record(12, entry("", None));
        overlay.persist(&mut storage);

        let loaded = ChangeOverlay::load(&storage);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(7).unwrap().transcript, "new words");
        assert_eq!(loaded.get(7).unwrap().status.as_deref(), Some("Pending"));
        assert_eq!(loaded.get(12).unwrap().status, None);
    }

    #[test]
    fn test_absent_key_is_empty_overlay() {
        let storage = MemoryStorage::new();
        assert!(ChangeOverlay::load(&storage).is_empty());
    }

    #[test]
    fn test_malformed_payload_is_discarded() {
        let mut storage = MemoryStorage::new();
        storage.set(STORAGE_KEY, "not json at all");
        assert!(ChangeOverlay::load(&storage).is_empty());
    }

    #[test]
    fn test_non_numeric_ids_are_skipped() {
        let mut storage = MemoryStorage::new();
        storage.set(
            STORAGE_KEY,
            r#"{"7": {"transcript": "ok", "status": "Done", "timestamp": "t"},
                "abc": {"transcript": "bad", "status": null, "timestamp": "t"}}"#,
        );
        let loaded = ChangeOverlay::load(&storage);
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get(7).is_some());
    }

    #[test]
    fn test_clear_leaves_empty_overlay() {
        let mut storage = MemoryStorage::new();
        let mut overlay = ChangeOverlay::new();
        overlay.record(1, entry("x", Some("Completed")));
        overlay.persist(&mut storage);

        ChangeOverlay::clear(&mut storage);
        assert_eq!(storage.get(STORAGE_KEY).as_deref(), Some("{}"));
        assert!(ChangeOverlay::load(&storage).is_empty());
    }

    #[test]
    fn test_ids_are_sorted() {
        let mut overlay = ChangeOverlay::new();
        overlay.record(12, entry("a", None));
        overlay.record(3, entry("b", None));
        overlay.record(7, entry("c", None));
        assert_eq!(overlay.ids(), vec![3, 7, 12]);
    }
}
