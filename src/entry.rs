//! Record mutation commands: add, session assignment, delete.
//!
//! Every mutation here is a full load-mutate-save cycle over the catalog
//! followed by one audit append per affected record. Validation happens
//! before the load, so a rejected operation leaves no partial write.

use anyhow::{bail, Result};
use chrono::Utc;
use regex::Regex;
use std::sync::LazyLock;

use crate::audit::AuditLog;
use crate::config::Config;
use crate::models::{normalize_session, Record};
use crate::store::{next_id, CatalogStore};
use crate::suggest::{normalize_name, FrequencyIndex};

static RATIO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("valid regex"));

/// Form-style inputs for a new catalog entry.
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    pub name: String,
    pub member: String,
    pub producer: Option<String>,
    pub region: Option<String>,
    pub category: Option<String>,
    pub polish_ratio: Option<String>,
    pub notes: Option<String>,
}

/// Register a new record.
///
/// `name` and `member` are required; `polish_ratio`, when given, must be a
/// plain decimal number. The new record gets the next id, the current
/// timestamp, and no session, so it enters the pending-approval group. On
/// success the member-frequency counter is bumped and an `add` audit entry
/// is appended.
pub fn run_add(config: &Config, user: &str, entry: &NewEntry) -> Result<()> {
    let member = normalize_name(&entry.member);
    let name = entry.name.trim();
    if member.is_empty() || name.is_empty() {
        bail!("member and name are required");
    }
    let ratio = entry.polish_ratio.as_deref().map(str::trim).unwrap_or("");
    if !ratio.is_empty() && !RATIO_RE.is_match(ratio) {
        bail!("polish_ratio must be a plain number, e.g. 60 or 55.5");
    }

    let store = CatalogStore::new(&config.files.catalog);
    let mut records = store.load()?;

    let mut rec = Record::default();
    rec.id = Some(next_id(&records));
    rec.name = Some(name.to_string());
    rec.member = Some(member.clone());
    rec.producer = trimmed(&entry.producer);
    rec.region = trimmed(&entry.region);
    rec.category = trimmed(&entry.category);
    rec.polish_ratio = if ratio.is_empty() {
        None
    } else {
        Some(ratio.to_string())
    };
    rec.notes = trimmed(&entry.notes);
    rec.updated_at = Some(Utc::now());

    records.push(rec.clone());
    store.save(&records)?;

    FrequencyIndex::new(&config.files.history).bump(&member)?;
    AuditLog::new(&config.files.audit).append("add", user, None, Some(&rec.to_state()))?;

    println!("added record {} ({})", rec.id.unwrap_or_default(), name);
    println!("ok");
    Ok(())
}

/// Set or clear the session number on one or more records.
///
/// The input is normalized to its digit run ("8", "session 8", "第8回" all
/// store as "8"); clearing returns records to pending approval. Each
/// affected record yields an `update_session` audit entry.
pub fn run_session(
    config: &Config,
    user: &str,
    ids: &[i64],
    value: Option<&str>,
    clear: bool,
) -> Result<()> {
    let new_val = if clear {
        None
    } else {
        match value {
            Some(v) => match normalize_session(v) {
                Some(n) => Some(n),
                None => bail!("session must contain a number, e.g. 8 or \"session 8\""),
            },
            None => bail!("provide a session number or --clear"),
        }
    };

    let store = CatalogStore::new(&config.files.catalog);
    let mut records = store.load()?;

    let mut changes: Vec<(serde_json::Value, serde_json::Value)> = Vec::new();
    for rec in records.iter_mut() {
        if rec.id.map(|id| ids.contains(&id)).unwrap_or(false) {
            let before = rec.to_state();
            rec.session = new_val.clone();
            changes.push((before, rec.to_state()));
        }
    }
    if changes.is_empty() {
        bail!("no records match the given ids");
    }

    store.save(&records)?;

    let log = AuditLog::new(&config.files.audit);
    for (before, after) in &changes {
        log.append("update_session", user, Some(before), Some(after))?;
    }

    match &new_val {
        Some(n) => println!("assigned session {} to {} record(s)", n, changes.len()),
        None => println!("returned {} record(s) to pending approval", changes.len()),
    }
    println!("ok");
    Ok(())
}

/// Hard-delete records by id. Without `--yes` nothing is written; the
/// targets are listed so the caller can confirm. Each removed record
/// yields a `delete` audit entry carrying only the before state.
pub fn run_delete(config: &Config, user: &str, ids: &[i64], yes: bool) -> Result<()> {
    let store = CatalogStore::new(&config.files.catalog);
    let records = store.load()?;

    let (removed, kept): (Vec<Record>, Vec<Record>) = records
        .into_iter()
        .partition(|rec| rec.id.map(|id| ids.contains(&id)).unwrap_or(false));

    if removed.is_empty() {
        bail!("no records match the given ids");
    }

    if !yes {
        println!("would delete {} record(s):", removed.len());
        for rec in &removed {
            println!(
                "  [id:{}] {} / {}",
                rec.id.unwrap_or_default(),
                rec.name.as_deref().unwrap_or(""),
                rec.member.as_deref().unwrap_or("")
            );
        }
        println!("nothing deleted (pass --yes to confirm)");
        return Ok(());
    }

    store.save(&kept)?;

    let log = AuditLog::new(&config.files.audit);
    for rec in &removed {
        log.append("delete", user, Some(&rec.to_state()), None)?;
    }

    println!("deleted {} record(s)", removed.len());
    println!("ok");
    Ok(())
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
