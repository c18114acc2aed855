//! Member-name suggestion index.
//!
//! A persisted frequency counter over the catalog's `member` field, used
//! to bias picklists toward the names actually in use. Keys are normalized
//! names (NFKC compatibility folding, whitespace runs collapsed), so
//! full-width and half-width renderings of the same name count together.
//!
//! The counter is re-derivable: if the file is ever lost, the next
//! bootstrap reseeds it from member occurrence counts in the catalog.
//! Bootstrap is strictly a cold-start convenience: once any history
//! exists it never fires again.

use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

use crate::models::Record;
use crate::table::write_atomic;

/// Normalize a name for counting and comparison: NFKC fold, collapse
/// internal whitespace runs to a single space, trim the ends.
pub fn normalize_name(s: &str) -> String {
    let folded: String = s.nfkc().collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Handle to the persisted counter file.
#[derive(Debug, Clone)]
pub struct FrequencyIndex {
    path: PathBuf,
}

impl FrequencyIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the counter. A missing file is an empty counter; a corrupt one
    /// degrades to empty after a loud warning.
    pub fn load(&self) -> BTreeMap<String, u64> {
        if !self.path.exists() {
            return BTreeMap::new();
        }
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "history file unreadable, treating as empty"
                );
                return BTreeMap::new();
            }
        };
        match serde_json::from_str(&text) {
            Ok(counts) => counts,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "history file corrupt, treating as empty"
                );
                BTreeMap::new()
            }
        }
    }

    /// Persist the full counter as pretty-printed JSON, keys sorted.
    pub fn save(&self, counts: &BTreeMap<String, u64>) -> Result<()> {
        let text = serde_json::to_string_pretty(counts)?;
        write_atomic(&self.path, &text)
    }

    /// Increment the count for a name by one and persist.
    pub fn bump(&self, name: &str) -> Result<()> {
        let key = normalize_name(name);
        if key.is_empty() {
            return Ok(());
        }
        let mut counts = self.load();
        *counts.entry(key).or_insert(0) += 1;
        self.save(&counts)
    }

    /// Seed the counter from member occurrence counts in existing records.
    ///
    /// Only acts when the persisted counter is empty; once any history
    /// exists this is a no-op, never a resync.
    pub fn bootstrap_from_records(&self, records: &[Record]) -> Result<()> {
        if !self.load().is_empty() {
            return Ok(());
        }
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for rec in records {
            if let Some(member) = &rec.member {
                let key = normalize_name(member);
                if !key.is_empty() {
                    *counts.entry(key).or_insert(0) += 1;
                }
            }
        }
        if counts.is_empty() {
            return Ok(());
        }
        self.save(&counts)
    }

    /// Order candidate names by (count descending, normalized name
    /// ascending). Blank candidates are dropped. Deterministic for any
    /// fixed counter state and candidate set.
    pub fn rank(&self, candidates: &[String]) -> Vec<String> {
        let counts = self.load();
        let mut cleaned: Vec<String> = candidates
            .iter()
            .filter(|c| !c.trim().is_empty())
            .cloned()
            .collect();
        cleaned.sort_by_key(|c| {
            let key = normalize_name(c);
            let count = counts.get(&key).copied().unwrap_or(0);
            (std::cmp::Reverse(count), key)
        });
        cleaned
    }
}

/// CLI entry point. Prints the distinct member names in rank order with
/// their counts, seeding the counter from the catalog on first use.
pub fn run_suggest(config: &crate::config::Config) -> Result<()> {
    let store = crate::store::CatalogStore::new(&config.files.catalog);
    let records = store.load()?;

    let index = FrequencyIndex::new(&config.files.history);
    index.bootstrap_from_records(&records)?;

    let mut base: Vec<String> = records
        .iter()
        .filter_map(|rec| rec.member.as_deref())
        .map(normalize_name)
        .filter(|s| !s.is_empty())
        .collect();
    base.sort();
    base.dedup();

    if base.is_empty() {
        println!("no member names on record yet.");
        return Ok(());
    }

    let counts = index.load();
    println!("{:<7} MEMBER", "COUNT");
    for name in index.rank(&base) {
        println!("{:<7} {}", counts.get(&name).copied().unwrap_or(0), name);
    }
    Ok(())
}
