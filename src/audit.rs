//! Append-only audit trail.
//!
//! Every catalog mutation is recorded as one [`AuditEntry`] carrying the
//! acting user, an action tag, and full before/after snapshots of the
//! affected record. Entries are never edited or reordered after append;
//! the log is the sole change history; the store itself carries no
//! versioning.
//!
//! The underlying storage is the same header-row-first tabular file the
//! catalog uses, so "append" is a read-modify-write of the whole file.
//! That bounds how large the log can grow before this design needs
//! revisiting; for a club catalog it is plenty.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::{format_timestamp, parse_timestamp};
use crate::table;

/// Audit file column set, in file order.
pub const AUDIT_FIELDS: &[&str] = &[
    "ts",
    "user",
    "action",
    "record_id",
    "name",
    "changed_fields",
    "before_json",
    "after_json",
];

/// One immutable audit trail entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub ts: Option<DateTime<Utc>>,
    pub user: String,
    pub action: String,
    pub record_id: String,
    pub name: String,
    pub changed_fields: Vec<String>,
    pub before_json: String,
    pub after_json: String,
}

/// Handle to the audit file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty history file if absent. Idempotent.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        table::write_atomic(&self.path, &table::render(&audit_headers(), &[]))
    }

    /// Read the whole log in file order. Corrupt or unreadable history
    /// degrades to an empty sequence after a loud warning.
    pub fn read_all(&self) -> Result<Vec<AuditEntry>> {
        self.ensure_exists()?;

        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "audit file unreadable, treating as empty"
                );
                return Ok(Vec::new());
            }
        };

        let parsed = match table::parse(&text) {
            Ok(t) => t,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "audit file corrupt, treating as empty"
                );
                return Ok(Vec::new());
            }
        };

        let entries = parsed
            .rows
            .iter()
            .map(|row| {
                let cell = |name: &str| parsed.value(row, name).unwrap_or("").to_string();
                AuditEntry {
                    ts: parse_timestamp(&cell("ts")),
                    user: cell("user"),
                    action: cell("action"),
                    record_id: cell("record_id"),
                    name: cell("name"),
                    changed_fields: split_changed(&cell("changed_fields")),
                    before_json: cell("before_json"),
                    after_json: cell("after_json"),
                }
            })
            .collect();

        Ok(entries)
    }

    /// Append one entry recording a mutation.
    ///
    /// `record_id` and `name` are taken from whichever snapshot is present,
    /// preferring `after`. `changed_fields` is computed only when both
    /// snapshots are supplied. A pure creation or deletion has no
    /// meaningful before/after diff and yields an empty list.
    pub fn append(
        &self,
        action: &str,
        user: &str,
        before: Option<&Value>,
        after: Option<&Value>,
    ) -> Result<()> {
        let mut entries = self.read_all()?;

        let subject = after.or(before);
        let record_id = subject
            .map(|s| render_state_value(s.get("id").unwrap_or(&Value::Null)))
            .unwrap_or_default();
        let name = subject
            .map(|s| render_state_value(s.get("name").unwrap_or(&Value::Null)))
            .unwrap_or_default();

        let changed = match (before, after) {
            (Some(b), Some(a)) => changed_fields(b, a),
            _ => Vec::new(),
        };

        entries.push(AuditEntry {
            ts: Some(Utc::now()),
            user: if user.is_empty() { "-" } else { user }.to_string(),
            action: action.to_string(),
            record_id,
            name,
            changed_fields: changed,
            before_json: snapshot_json(before),
            after_json: snapshot_json(after),
        });

        self.write_all(&entries)
    }

    fn write_all(&self, entries: &[AuditEntry]) -> Result<()> {
        let rows: Vec<Vec<String>> = entries
            .iter()
            .map(|e| {
                vec![
                    e.ts.map(format_timestamp).unwrap_or_default(),
                    e.user.clone(),
                    e.action.clone(),
                    e.record_id.clone(),
                    e.name.clone(),
                    e.changed_fields.join(", "),
                    e.before_json.clone(),
                    e.after_json.clone(),
                ]
            })
            .collect();
        table::write_atomic(&self.path, &table::render(&audit_headers(), &rows))
    }
}

/// Field names whose string-rendered values differ between two snapshots,
/// over the union of both key sets, sorted for determinism.
pub fn changed_fields(before: &Value, after: &Value) -> Vec<String> {
    let empty = serde_json::Map::new();
    let b = before.as_object().unwrap_or(&empty);
    let a = after.as_object().unwrap_or(&empty);

    let mut keys: Vec<&String> = b.keys().chain(a.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter(|k| {
            let bv = render_state_value(b.get(*k).unwrap_or(&Value::Null));
            let av = render_state_value(a.get(*k).unwrap_or(&Value::Null));
            bv != av
        })
        .cloned()
        .collect()
}

/// String rendering used for snapshot comparison: null is empty, strings
/// are themselves, everything else is its JSON text.
fn render_state_value(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Serialize a snapshot verbatim; an absent snapshot stores as `{}`.
fn snapshot_json(state: Option<&Value>) -> String {
    match state {
        Some(v) => v.to_string(),
        None => "{}".to_string(),
    }
}

fn split_changed(cell: &str) -> Vec<String> {
    cell.split(", ")
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn audit_headers() -> Vec<String> {
    AUDIT_FIELDS.iter().map(|f| f.to_string()).collect()
}

/// CLI entry point. Prints the audit trail in file order, oldest first,
/// optionally limited to the most recent `limit` entries.
pub fn run_audit(config: &crate::config::Config, limit: Option<usize>) -> Result<()> {
    let log = AuditLog::new(&config.files.audit);
    let entries = log.read_all()?;

    if entries.is_empty() {
        println!("audit log is empty.");
        return Ok(());
    }

    let start = match limit {
        Some(n) => entries.len().saturating_sub(n),
        None => 0,
    };

    println!(
        "{:<20} {:<10} {:<16} {:<6} {:<20} CHANGED",
        "TS", "USER", "ACTION", "ID", "NAME"
    );
    for entry in &entries[start..] {
        println!(
            "{:<20} {:<10} {:<16} {:<6} {:<20} {}",
            entry.ts.map(format_timestamp).unwrap_or_default(),
            entry.user,
            entry.action,
            entry.record_id,
            entry.name,
            entry.changed_fields.join(", "),
        );
    }
    Ok(())
}
