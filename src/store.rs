//! Canonical catalog storage.
//!
//! The catalog is one tabular file holding the full record set. Loading
//! reconciles whatever shape the file has onto the canonical schema
//! (missing columns synthesized as absent, extra columns dropped, canonical
//! order restored), so files written by older versions keep loading.
//! Saving is a whole-file replacement: callers load, mutate in memory, and
//! save the complete set.
//!
//! Single-writer contract: nothing here guards against a second process
//! writing the same file; the last rename wins and no conflict is detected.

use anyhow::Result;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::{Record, CANONICAL_FIELDS};
use crate::table;

/// Handle to the catalog file.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the backing file with zero records under the canonical header
    /// if it does not exist yet. Idempotent.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        table::write_atomic(&self.path, &table::render(&canonical_headers(), &[]))
    }

    /// Load the full record set.
    ///
    /// A corrupt or unreadable file degrades to an empty set after a loud
    /// warning. The catalog stays usable, but the caller should know the
    /// data may look emptied rather than erroring.
    pub fn load(&self) -> Result<Vec<Record>> {
        self.ensure_exists()?;

        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "catalog file unreadable, treating as empty"
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
                    "catalog file corrupt, treating as empty"
                );
                return Ok(Vec::new());
            }
        };

        let records = parsed
            .rows
            .iter()
            .map(|row| {
                let mut rec = Record::default();
                for field in CANONICAL_FIELDS {
                    if let Some(cell) = parsed.value(row, field) {
                        rec.set(field, cell);
                    }
                }
                rec
            })
            .collect();

        Ok(records)
    }

    /// Atomically replace the backing file with the full record set.
    ///
    /// Every record's `updated_at` is coerced to a valid timestamp first,
    /// substituting "now" when absent.
    pub fn save(&self, records: &[Record]) -> Result<()> {
        let now = Utc::now();
        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|rec| {
                let mut stamped = rec.clone();
                if stamped.updated_at.is_none() {
                    stamped.updated_at = Some(now);
                }
                stamped.to_row()
            })
            .collect();

        table::write_atomic(&self.path, &table::render(&canonical_headers(), &rows))
    }
}

/// Next id to assign: max existing + 1, starting at 1 for an empty catalog.
pub fn next_id(records: &[Record]) -> i64 {
    records.iter().filter_map(|r| r.id).max().unwrap_or(0) + 1
}

fn canonical_headers() -> Vec<String> {
    CANONICAL_FIELDS.iter().map(|f| f.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(tmp: &TempDir) -> CatalogStore {
        CatalogStore::new(tmp.path().join("catalog.csv"))
    }

    #[test]
    fn ensure_exists_creates_empty_catalog() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.ensure_exists().unwrap();
        assert!(store.path().exists());

        // Idempotent: a second call leaves the file alone.
        store.ensure_exists().unwrap();
        assert_eq!(store.load().unwrap().len(), 0);
    }

    #[test]
    fn save_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);

        let mut rec = Record::default();
        rec.id = Some(1);
        rec.name = Some("Daybreak".to_string());
        rec.member = Some("Aya Sato".to_string());
        rec.quantity = 2;
        rec.updated_at = crate::models::parse_timestamp("2024-05-01 12:30:00");

        store.save(std::slice::from_ref(&rec)).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, vec![rec]);

        // save(load()) is a no-op on content.
        store.save(&loaded).unwrap();
        assert_eq!(store.load().unwrap(), loaded);
    }

    #[test]
    fn save_stamps_missing_updated_at() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);

        let mut rec = Record::default();
        rec.id = Some(1);
        rec.name = Some("Daybreak".to_string());
        assert!(rec.updated_at.is_none());

        store.save(&[rec]).unwrap();
        let loaded = store.load().unwrap();
        assert!(loaded[0].updated_at.is_some());
    }

    #[test]
    fn load_reconciles_older_file_shapes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("catalog.csv");
        // A historical file missing most canonical columns, with an extra
        // one, in a different order.
        fs::write(&path, "name,id,color\nDaybreak,1,red\n").unwrap();

        let store = CatalogStore::new(&path);
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, Some(1));
        assert_eq!(loaded[0].name.as_deref(), Some("Daybreak"));
        assert_eq!(loaded[0].category, None);
        assert_eq!(loaded[0].quantity, 0);

        // After a save the file carries the full canonical header.
        store.save(&loaded).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, CANONICAL_FIELDS.join(","));
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("catalog.csv");
        fs::write(&path, "").unwrap();

        let store = CatalogStore::new(&path);
        assert_eq!(store.load().unwrap().len(), 0);
    }

    #[test]
    fn next_id_is_max_plus_one() {
        let mut a = Record::default();
        a.id = Some(3);
        let mut b = Record::default();
        b.id = Some(7);
        let c = Record::default();
        assert_eq!(next_id(&[a, b, c]), 8);
        assert_eq!(next_id(&[]), 1);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.save(&[]).unwrap();
        let names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["catalog.csv".to_string()]);
    }
}
