//! Complaint store. The whole collection lives in one JSON document.
//!
//! Every mutation is a full load → modify → save cycle. There is no file
//! locking: two writers whose cycles overlap lose one update (last save wins).
//! Reads are fail-soft; a missing, empty or corrupt document reads as empty,
//! and a malformed entry inside an otherwise valid list is skipped on its own.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Classification, Complaint, Note, Status};

pub mod export;

pub const COMPLAINTS_FILE: &str = "complaints.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode complaints: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to replace {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// Result of a status update. The store never guesses on an unknown id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct ComplaintStore {
    data_dir: PathBuf,
    path: PathBuf,
}

impl ComplaintStore {
    /// Opens the store under `data_dir`, creating the directory if absent.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir).map_err(|source| StoreError::Io {
            path: data_dir.clone(),
            source,
        })?;
        let path = data_dir.join(COMPLAINTS_FILE);
        Ok(Self { data_dir, path })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Vec<Complaint> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No complaints document at {} yet", self.path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!("Error loading complaints from {}: {e}", self.path.display());
                return Vec::new();
            }
        };

        if content.trim().is_empty() {
            return Vec::new();
        }

        let elements = match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(elements)) => elements,
            Ok(_) => {
                warn!("Complaints document {} is not a list", self.path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!("Error decoding complaints in {}: {e}", self.path.display());
                return Vec::new();
            }
        };

        decode_records(elements)
    }

    /// Overwrites the whole document with `records`.
    pub fn save(&self, records: &[Complaint]) -> Result<(), StoreError> {
        let bytes = to_pretty_json(records)?;
        write_atomically(&self.path, &bytes)
    }

    /// Files a classified complaint as a new record with status `New`.
    pub fn append(&self, classification: &Classification) -> Result<Complaint, StoreError> {
        let mut records = self.load();

        let complaint = Complaint::from_classification(
            classification,
            Uuid::new_v4().to_string(),
            now_timestamp(),
        );
        records.push(complaint.clone());
        self.save(&records)?;

        info!(
            "Filed complaint {} ({} / {})",
            complaint.id,
            complaint.category.as_str(),
            complaint.priority.as_str()
        );
        Ok(complaint)
    }

    /// Sets the status of the first record with `id` and appends `note` when it
    /// is non-blank. Nothing is written when no record matches.
    pub fn update_status(
        &self,
        id: &str,
        status: Status,
        note: &str,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut records = self.load();

        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            info!("Status update for unknown complaint {id} ignored");
            return Ok(UpdateOutcome::NotFound);
        };

        record.status = status;
        let note = note.trim();
        if !note.is_empty() {
            record.notes.push(Note {
                timestamp: now_timestamp(),
                note: note.to_string(),
            });
        }

        self.save(&records)?;
        info!("Complaint {id} moved to {}", status.as_str());
        Ok(UpdateOutcome::Updated)
    }

    pub fn get(&self, id: &str) -> Option<Complaint> {
        self.load().into_iter().find(|r| r.id == id)
    }

    /// Case-insensitive substring search over summary, complaint text and
    /// keywords. The query is trimmed first and a blank query returns
    /// everything. Collection order is kept.
    pub fn search(&self, query: &str) -> Vec<Complaint> {
        filter_records(self.load(), query)
    }
}

/// Normalizes each element on its own. A non-object element is dropped with a
/// warning; the rest of the collection survives.
fn decode_records(elements: Vec<Value>) -> Vec<Complaint> {
    let total = elements.len();
    let records: Vec<Complaint> = elements
        .into_iter()
        .enumerate()
        .filter_map(|(index, element)| {
            if !element.is_object() {
                warn!("Skipping complaint #{index}: expected an object, got {element}");
                return None;
            }
            serde_json::from_value(element)
                .map_err(|e| warn!("Skipping complaint #{index}: {e}"))
                .ok()
        })
        .collect();
    if records.len() < total {
        warn!("Loaded {} of {total} complaint entries", records.len());
    }
    records
}

pub fn filter_records(records: Vec<Complaint>, query: &str) -> Vec<Complaint> {
    let query = query.trim();
    if query.is_empty() {
        return records;
    }
    let needle = query.to_lowercase();
    records
        .into_iter()
        .filter(|r| matches_query(r, &needle))
        .collect()
}

fn matches_query(record: &Complaint, needle: &str) -> bool {
    record.summary.to_lowercase().contains(needle)
        || record.complaint_text.to_lowercase().contains(needle)
        || record.keywords.join(" ").to_lowercase().contains(needle)
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Pretty JSON with 4-space indentation and a trailing newline.
pub(crate) fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut bytes = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    value.serialize(&mut serializer)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Writes to a temp file beside `path`, syncs it, then renames it into place.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_error = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_error)?;
    tmp.write_all(bytes).map_err(io_error)?;
    tmp.as_file().sync_all().map_err(io_error)?;
    tmp.persist(path).map_err(|source| StoreError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::models::{Category, Priority};
    use serde_json::json;

    fn test_store() -> (tempfile::TempDir, ComplaintStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ComplaintStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn classification(category: &str, summary: &str, text: &str, keywords: &[&str]) -> Classification {
        Classification {
            category: Some(category.to_string()),
            priority: Some("Medium".to_string()),
            summary: Some(summary.to_string()),
            keywords: Some(keywords.iter().map(|k| k.to_string()).collect()),
            confidence: Some(0.8),
            complaint_text: Some(text.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("complaints");
        let store = ComplaintStore::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.path(), nested.join(COMPLAINTS_FILE));
    }

    #[test]
    fn test_load_missing_document_is_empty() {
        let (_dir, store) = test_store();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_empty_document_is_empty() {
        let (_dir, store) = test_store();
        std::fs::write(store.path(), "  \n").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_corrupt_document_is_empty() {
        let (_dir, store) = test_store();
        std::fs::write(store.path(), "[{\"id\": \"abc\",").unwrap();
        assert!(store.load().is_empty());

        std::fs::write(store.path(), "{\"not\": \"a list\"}").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_skips_non_object_entries() {
        let (_dir, store) = test_store();
        let doc = json!([
            {"id": "a", "timestamp": "2025-01-01T00:00:00Z", "complaint_text": "Leak", "category": "Water"},
            null,
            "stray",
            42,
            {"id": "b", "timestamp": "2025-01-02T00:00:00Z", "complaint_text": "Hole", "category": "Roads"}
        ]);
        std::fs::write(store.path(), doc.to_string()).unwrap();

        let ids: Vec<_> = store.load().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_append_keeps_records_beside_malformed_entry() {
        let (_dir, store) = test_store();
        let doc = json!([
            {"id": "a", "complaint_text": "Leak", "category": "Water"},
            {"id": "b", "complaint_text": "Hole", "category": "Roads"},
            null
        ]);
        std::fs::write(store.path(), doc.to_string()).unwrap();

        let filed = store.append(&classification("Parks", "broken bench", "Bench", &[])).unwrap();
        let ids: Vec<_> = store.load().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string(), filed.id]);

        assert_eq!(
            store.update_status("b", Status::Resolved, "").unwrap(),
            UpdateOutcome::Updated
        );
        assert_eq!(store.load().len(), 3);
    }

    #[test]
    fn test_save_load_round_trip_is_idempotent() {
        let (_dir, store) = test_store();
        store.append(&classification("Water", "water leak", "Pipe leaking", &["pipe"])).unwrap();
        store.append(&classification("Roads", "pothole", "Huge pothole", &["road"])).unwrap();
        store.update_status(&store.load()[0].id, Status::Resolved, "patched").unwrap();

        let first = store.load();
        store.save(&first).unwrap();
        let bytes_after_first_save = std::fs::read(store.path()).unwrap();
        let second = store.load();
        assert_eq!(first, second);

        store.save(&second).unwrap();
        assert_eq!(std::fs::read(store.path()).unwrap(), bytes_after_first_save);
    }

    #[test]
    fn test_round_trip_normalizes_legacy_document_once() {
        let (_dir, store) = test_store();
        let legacy = json!([{
            "id": "legacy-1",
            "timestamp": "2024-03-02T08:00:00.000001",
            "complaint_text": "Dogs barking",
            "category": "Noise",
            "priority": "low",
            "summary": "noise",
            "keywords": "dogs, barking",
            "confidence": 0.5,
            "status": "In Progress",
            "notes": null
        }]);
        std::fs::write(store.path(), legacy.to_string()).unwrap();

        let loaded = store.load();
        assert_eq!(loaded[0].category, Category::Other);
        assert_eq!(loaded[0].priority, Priority::Low);
        assert_eq!(loaded[0].status, Status::InProgress);

        store.save(&loaded).unwrap();
        assert_eq!(store.load(), loaded);
    }

    #[test]
    fn test_append_sets_store_owned_fields() {
        let (_dir, store) = test_store();
        let record = store
            .append(&classification("Water", "water leak", "Pipe leaking", &["pipe"]))
            .unwrap();

        assert_eq!(record.status, Status::New);
        assert!(record.notes.is_empty());
        assert!(!record.id.is_empty());
        assert!(!record.timestamp.is_empty());
        assert_eq!(record.category, Category::Water);
        assert_eq!(record.complaint_text, "Pipe leaking");

        let stored = store.load();
        assert_eq!(stored, vec![record]);
    }

    #[test]
    fn test_append_preserves_filing_order() {
        let (_dir, store) = test_store();
        let a = store.append(&classification("Water", "a", "a", &[])).unwrap();
        let b = store.append(&classification("Roads", "b", "b", &[])).unwrap();
        let c = store.append(&classification("Waste", "c", "c", &[])).unwrap();

        let ids: Vec<_> = store.load().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn test_appended_ids_are_unique() {
        let (_dir, store) = test_store();
        for i in 0..25 {
            store
                .append(&classification("Other", &format!("s{i}"), "t", &[]))
                .unwrap();
        }
        let records = store.load();
        let ids: HashSet<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(records.len(), 25);
        assert_eq!(ids.len(), 25);
    }

    #[test]
    fn test_update_status_appends_note() {
        let (_dir, store) = test_store();
        let record = store.append(&classification("Electricity", "outage", "No power", &[])).unwrap();
        let notes_before = store.get(&record.id).unwrap().notes.len();

        let outcome = store.update_status(&record.id, Status::Resolved, "fixed").unwrap();
        assert_eq!(outcome, UpdateOutcome::Updated);

        let updated = store.get(&record.id).unwrap();
        assert_eq!(updated.id, record.id);
        assert_eq!(updated.status, Status::Resolved);
        assert_eq!(updated.notes.len(), notes_before + 1);
        assert_eq!(updated.notes.last().unwrap().note, "fixed");
        assert!(!updated.notes.last().unwrap().timestamp.is_empty());
    }

    #[test]
    fn test_update_status_blank_note_changes_status_only() {
        let (_dir, store) = test_store();
        let record = store.append(&classification("Health", "clinic", "Clinic closed", &[])).unwrap();

        store.update_status(&record.id, Status::InProgress, "   ").unwrap();
        let updated = store.get(&record.id).unwrap();
        assert_eq!(updated.status, Status::InProgress);
        assert!(updated.notes.is_empty());
    }

    #[test]
    fn test_update_status_normalizes_malformed_notes() {
        let (_dir, store) = test_store();
        let doc = json!([{
            "id": "x1",
            "timestamp": "2024-01-01T00:00:00",
            "complaint_text": "Broken bench",
            "notes": "called twice"
        }]);
        std::fs::write(store.path(), doc.to_string()).unwrap();

        store.update_status("x1", Status::Closed, "replaced bench").unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        let notes = raw[0]["notes"].as_array().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0]["note"], "replaced bench");
        assert_eq!(raw[0]["status"], "Closed");
    }

    #[test]
    fn test_update_unknown_id_leaves_document_untouched() {
        let (_dir, store) = test_store();
        store.append(&classification("Water", "leak", "Leak", &[])).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let outcome = store.update_status("nonexistent-id", Status::Closed, "").unwrap();
        assert_eq!(outcome, UpdateOutcome::NotFound);
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_update_unknown_id_does_not_create_document() {
        let (_dir, store) = test_store();
        store.update_status("nope", Status::Closed, "note").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_search_matches_summary_case_insensitively() {
        let (_dir, store) = test_store();
        let light = store
            .append(&classification("Electricity", "streetlight outage", "Lights out", &["light"]))
            .unwrap();
        let leak = store
            .append(&classification("Water", "water leak", "Pipe burst", &["pipe"]))
            .unwrap();

        assert_eq!(store.search("streetlight"), vec![light.clone()]);
        assert_eq!(store.search("STREETLIGHT"), vec![light.clone()]);
        assert_eq!(store.search(""), vec![light, leak]);
    }

    #[test]
    fn test_search_covers_text_and_keywords() {
        let (_dir, store) = test_store();
        let a = store
            .append(&classification("Roads", "damaged surface", "Crater near the school", &["asphalt"]))
            .unwrap();
        let b = store
            .append(&classification("Waste", "missed pickup", "Bins left out", &["recycling", "bins"]))
            .unwrap();

        assert_eq!(store.search("crater"), vec![a]);
        assert_eq!(store.search("Recycling"), vec![b.clone()]);
        // keywords are space-joined before matching
        assert_eq!(store.search("recycling bins"), vec![b]);
        assert!(store.search("electricity").is_empty());
        assert_eq!(store.search("   ").len(), 2);
    }

    #[test]
    fn test_search_ignores_surrounding_whitespace() {
        let (_dir, store) = test_store();
        let leak = store
            .append(&classification("Water", "water leak", "Pipe burst", &["pipe"]))
            .unwrap();
        store
            .append(&classification("Roads", "pothole", "Hole in road", &["road"]))
            .unwrap();

        assert_eq!(store.search(" leak"), vec![leak.clone()]);
        assert_eq!(store.search("\tPIPE \n"), vec![leak]);
    }

    #[test]
    fn test_concurrent_writers_last_save_wins() {
        // Two handles on one document stand in for two processes.
        let (dir, store_a) = test_store();
        let store_b = ComplaintStore::open(dir.path()).unwrap();
        let first = store_a.append(&classification("Water", "leak", "Leak", &[])).unwrap();
        let second = store_a.append(&classification("Roads", "pothole", "Hole", &[])).unwrap();

        // Both writers read the same snapshot before either saves.
        let mut snapshot_a = store_a.load();
        let mut snapshot_b = store_b.load();

        snapshot_a[0].status = Status::Resolved;
        snapshot_b[1].status = Status::Closed;
        store_a.save(&snapshot_a).unwrap();
        store_b.save(&snapshot_b).unwrap();

        let final_state = store_a.load();
        let first_now = final_state.iter().find(|r| r.id == first.id).unwrap();
        let second_now = final_state.iter().find(|r| r.id == second.id).unwrap();
        // The first writer's change is lost.
        assert_eq!(first_now.status, Status::New);
        assert_eq!(second_now.status, Status::Closed);
    }

    #[test]
    fn test_save_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = ComplaintStore::open(dir.path()).unwrap();
        std::fs::remove_dir_all(dir.path()).unwrap();

        let err = store.save(&[]).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_document_is_indented_json_array() {
        let (_dir, store) = test_store();
        store.append(&classification("Water", "leak", "Leak", &["pipe"])).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("[\n    {\n        \"id\""));
        assert!(text.ends_with("]\n"));
    }
}
