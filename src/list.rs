//! Catalog listing.
//!
//! Read-only view over the record set, optionally grouped by session label
//! (pending approval first, then ascending session number) and filtered by
//! member or session. `--resave` is the one mutation here: it rewrites the
//! catalog through the canonical schema, which is how older file shapes
//! get upgraded in place.

use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;

use crate::audit::AuditLog;
use crate::config::Config;
use crate::models::{
    normalize_session, session_label, session_sort_key, Record, PENDING_LABEL,
};
use crate::store::CatalogStore;
use crate::suggest::normalize_name;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(\.\d+)?").expect("valid regex"));

pub fn run_list(
    config: &Config,
    group: bool,
    member: Option<&str>,
    session: Option<&str>,
    resave: bool,
    user: &str,
) -> Result<()> {
    let store = CatalogStore::new(&config.files.catalog);
    let mut records = store.load()?;

    if resave {
        store.save(&records)?;
        AuditLog::new(&config.files.audit).append("manual_save", user, None, None)?;
        records = store.load()?;
        println!("catalog rewritten under the canonical schema");
    }

    if let Some(m) = member {
        let target = normalize_name(m);
        records.retain(|rec| {
            rec.member
                .as_deref()
                .map(|v| normalize_name(v) == target)
                .unwrap_or(false)
        });
    }

    if let Some(s) = session {
        if s == "pending" || s == PENDING_LABEL {
            records.retain(|rec| {
                rec.session.as_deref().map(str::trim).unwrap_or("").is_empty()
            });
        } else {
            let target = normalize_session(s);
            records.retain(|rec| {
                rec.session.as_deref().and_then(normalize_session) == target
            });
        }
    }

    if records.is_empty() {
        println!("no records to show.");
        return Ok(());
    }

    if group {
        let mut labels: Vec<String> = records
            .iter()
            .map(|rec| session_label(rec.session.as_deref()))
            .collect();
        labels.sort_by_key(|l| session_sort_key(l));
        labels.dedup();

        for label in &labels {
            let group_rows: Vec<&Record> = records
                .iter()
                .filter(|rec| session_label(rec.session.as_deref()) == *label)
                .collect();
            println!("== {} ({}) ==", label, group_rows.len());
            print_rows(&group_rows);
            println!();
        }
    } else {
        let rows: Vec<&Record> = records.iter().collect();
        print_rows(&rows);
    }

    Ok(())
}

fn print_rows(records: &[&Record]) {
    println!(
        "{:<5} {:<20} {:<14} {:<12} {:<12} {:<14} {:<7} SESSION",
        "ID", "NAME", "PRODUCER", "REGION", "CATEGORY", "MEMBER", "RATIO"
    );
    for rec in records {
        println!(
            "{:<5} {:<20} {:<14} {:<12} {:<12} {:<14} {:<7} {}",
            rec.id.map(|v| v.to_string()).unwrap_or_default(),
            rec.name.as_deref().unwrap_or(""),
            rec.producer.as_deref().unwrap_or(""),
            rec.region.as_deref().unwrap_or(""),
            rec.category.as_deref().unwrap_or(""),
            rec.member.as_deref().unwrap_or(""),
            format_ratio(rec.polish_ratio.as_deref().unwrap_or("")),
            session_label(rec.session.as_deref()),
        );
    }
}

/// Display form of a polish ratio cell.
///
/// The first number found is shown as a percentage, with fractions ≤ 1
/// scaled up ("0.55" shows as "55%"). Cells without a number, such as
/// the mixed notations some spreadsheets carry, are shown verbatim.
pub fn format_ratio(raw: &str) -> String {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return String::new();
    }
    match NUMBER.find(s).and_then(|m| m.as_str().parse::<f64>().ok()) {
        Some(v) => {
            let v = if v <= 1.0 { v * 100.0 } else { v };
            format!("{:.0}%", v)
        }
        None => s.to_string(),
    }
}
