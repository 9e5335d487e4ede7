//! CSV / JSON export of the full collection. Export is fail-soft: every
//! failure is logged and reported as `false`.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{info, warn};

use crate::models::fields::text_from_value;
use crate::models::Complaint;
use crate::store::{to_pretty_json, write_atomically, ComplaintStore, StoreError};

const CSV_HEADER: [&str; 10] = [
    "id",
    "timestamp",
    "complaint_text",
    "category",
    "priority",
    "summary",
    "keywords",
    "confidence",
    "status",
    "notes",
];

impl ComplaintStore {
    /// Returns false on an empty collection (leaving `path` untouched) or on I/O failure.
    pub fn export_csv(&self, path: &Path) -> bool {
        self.export_with(path, "CSV", |records| Ok(render_csv(records).into_bytes()))
    }

    /// Same document shape as the backing store.
    pub fn export_json(&self, path: &Path) -> bool {
        self.export_with(path, "JSON", |records| to_pretty_json(records))
    }

    fn export_with<F>(&self, path: &Path, format: &str, render: F) -> bool
    where
        F: FnOnce(&[Complaint]) -> Result<Vec<u8>, StoreError>,
    {
        let records = self.load();
        if records.is_empty() {
            info!("No complaints to export");
            return false;
        }

        match render(records.as_slice()).and_then(|bytes| write_atomically(path, &bytes)) {
            Ok(()) => {
                info!(
                    "Exported {} complaints as {format} to {}",
                    records.len(),
                    path.display()
                );
                true
            }
            Err(e) => {
                warn!("Error exporting to {format}: {e}");
                false
            }
        }
    }
}

/// Fixed record fields first, then every extra key found in any record,
/// sorted. A record without a given extra key leaves that cell empty.
pub fn render_csv(records: &[Complaint]) -> String {
    let extra_keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.extra.keys().map(String::as_str))
        .collect();

    let mut header: Vec<&str> = CSV_HEADER.to_vec();
    header.extend(extra_keys.iter().copied());
    let mut csv = header
        .into_iter()
        .map(escape_csv)
        .collect::<Vec<_>>()
        .join(",");
    csv.push('\n');

    for r in records {
        let mut row = vec![
            escape_csv(&r.id),
            escape_csv(&r.timestamp),
            escape_csv(&r.complaint_text),
            escape_csv(r.category.as_str()),
            escape_csv(r.priority.as_str()),
            escape_csv(&r.summary),
            escape_csv(&r.keywords.join(", ")),
            r.confidence.to_string(),
            escape_csv(r.status.as_str()),
            escape_csv(&flatten_notes(r)),
        ];
        row.extend(extra_keys.iter().map(|key| {
            r.extra
                .get(*key)
                .and_then(text_from_value)
                .map(|v| escape_csv(&v))
                .unwrap_or_default()
        }));
        csv.push_str(&row.join(","));
        csv.push('\n');
    }
    csv
}

fn flatten_notes(record: &Complaint) -> String {
    if record.notes.is_empty() {
        return String::new();
    }
    serde_json::to_string(&record.notes).unwrap_or_default()
}

fn escape_csv(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
