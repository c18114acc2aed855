//! Spreadsheet import pipeline.
//!
//! Converts an externally produced table of unknown column layout into the
//! canonical record shape: guess a column mapping from a synonym table,
//! let the caller override it, then project and coerce every row. The
//! whole normalized set replaces the catalog in one save.
//!
//! The synonym table is data, not code: the built-in lists can be
//! replaced per field from `kura.toml`, so header vocabularies specific to
//! one club's spreadsheets are configuration.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::models::{Record, CANONICAL_FIELDS};
use crate::store::CatalogStore;
use crate::table::{self, Table};

/// Mapping from canonical field name to the chosen source column.
/// An absent key means "no match".
pub type ColumnMapping = BTreeMap<String, String>;

/// Cell values treated as "not set" when scanning style columns.
const NEGATIVE_MARKS: &[&str] = &["", "0", "false", "×", "✕", "✖"];

/// Prioritized synonym lists per canonical field, in canonical field order.
#[derive(Debug, Clone)]
pub struct SynonymTable {
    entries: Vec<(String, Vec<String>)>,
}

impl SynonymTable {
    /// Built-in synonym lists covering the header vocabulary of the club
    /// spreadsheets this tool grew up around, plus the English fallbacks.
    pub fn defaults() -> Self {
        let table: &[(&str, &[&str])] = &[
            ("id", &["id", "番号", "no"]),
            ("name", &["銘柄", "商品名", "名称", "品名", "name"]),
            ("category", &["カテゴリ", "区分", "分類", "category"]),
            ("quantity", &["数量", "在庫", "qty", "quantity"]),
            ("updated_at", &["例会日時", "更新日", "updated_at"]),
            ("member", &["会員氏名", "氏名", "member"]),
            ("producer", &["蔵元", "メーカー", "酒造", "producer"]),
            ("region", &["地域", "都道府県", "region"]),
            ("polish_ratio", &["精米歩合", "歩合", "polish"]),
            ("notes", &["備考", "メモ", "notes"]),
            ("session", &["例会", "session"]),
            ("session_date", &["例会日時", "session_date"]),
        ];
        Self {
            entries: table
                .iter()
                .map(|(field, syns)| {
                    (
                        field.to_string(),
                        syns.iter().map(|s| s.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Defaults with per-field replacements from configuration.
    pub fn with_overrides(overrides: &BTreeMap<String, Vec<String>>) -> Self {
        let mut t = Self::defaults();
        for (field, syns) in overrides {
            if let Some(entry) = t.entries.iter_mut().find(|(f, _)| f == field) {
                entry.1 = syns.clone();
            }
        }
        t
    }

    fn synonyms_for(&self, field: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, syns)| syns.as_slice())
            .unwrap_or(&[])
    }
}

/// Guess which source column feeds each canonical field.
///
/// For each field, source columns are scanned in order and the first whose
/// name contains any synonym (case-insensitive substring) wins. Fields
/// with no matching column are left out of the mapping. Deterministic:
/// the same header set always produces the same guess.
pub fn guess_mapping(columns: &[String], synonyms: &SynonymTable) -> ColumnMapping {
    let mut mapping = ColumnMapping::new();
    for field in CANONICAL_FIELDS {
        let syns = synonyms.synonyms_for(field);
        let hit = columns.iter().find(|col| {
            let lc = col.to_lowercase();
            syns.iter().any(|syn| lc.contains(&syn.to_lowercase()))
        });
        if let Some(col) = hit {
            mapping.insert(field.to_string(), col.clone());
        }
    }
    mapping
}

/// Project source rows into canonical records.
///
/// Each canonical field takes the mapped column's cell (absent mapping or
/// missing column yields the field's absent default). Coercions are total:
/// `quantity` becomes a non-negative integer (else 0), `updated_at` a
/// timestamp (else now). When no column maps to `category`, it is derived
/// per row from `style_columns`: the first style column whose cell is
/// non-empty and not a negative marker lends its own name as the category.
pub fn normalize(source: &Table, mapping: &ColumnMapping, style_columns: &[String]) -> Vec<Record> {
    let now = Utc::now();
    source
        .rows
        .iter()
        .map(|row| {
            let mut rec = Record::default();
            for field in CANONICAL_FIELDS {
                if let Some(col) = mapping.get(*field) {
                    if let Some(cell) = source.value(row, col) {
                        rec.set(field, cell);
                    }
                }
            }
            if rec.updated_at.is_none() {
                rec.updated_at = Some(now);
            }
            if !mapping.contains_key("category") {
                rec.category = pick_style(source, row, style_columns);
            }
            rec
        })
        .collect()
}

/// First style column whose cell holds a real value, by column list order.
fn pick_style(source: &Table, row: &[String], style_columns: &[String]) -> Option<String> {
    for col in style_columns {
        if let Some(cell) = source.value(row, col) {
            let v = cell.trim();
            if !NEGATIVE_MARKS.iter().any(|m| v.eq_ignore_ascii_case(m)) {
                return Some(col.clone());
            }
        }
    }
    None
}

/// Run a full import: read the source file, guess the mapping, apply the
/// caller's overrides, normalize, and replace the catalog.
///
/// `overrides` are `field=Column` pairs; an empty column unmaps the field.
/// `style_columns`, when not given, defaults to the configured style
/// candidates that actually appear in the source header.
pub fn run_import(
    config: &Config,
    path: &Path,
    overrides: &[(String, String)],
    style_columns: Option<Vec<String>>,
    dry_run: bool,
) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    let source = table::parse(&text)
        .with_context(|| format!("Failed to parse import file: {}", path.display()))?;

    let synonyms = SynonymTable::with_overrides(&config.import.synonyms);
    let mut mapping = guess_mapping(&source.headers, &synonyms);

    for (field, column) in overrides {
        if !CANONICAL_FIELDS.contains(&field.as_str()) {
            bail!(
                "Unknown field in --map: '{}'. Must be one of: {}",
                field,
                CANONICAL_FIELDS.join(", ")
            );
        }
        if column.is_empty() {
            mapping.remove(field);
        } else {
            mapping.insert(field.clone(), column.clone());
        }
    }

    let style_columns = style_columns.unwrap_or_else(|| {
        config
            .import
            .style_candidates
            .iter()
            .filter(|c| source.column(c).is_some())
            .cloned()
            .collect()
    });

    println!("import {}", path.display());
    println!("  source columns: {}", source.headers.len());
    for field in CANONICAL_FIELDS {
        match mapping.get(*field) {
            Some(col) => println!("  {:<14} <- {}", field, col),
            None => println!("  {:<14} <- (no match)", field),
        }
    }
    if !mapping.contains_key("category") && !style_columns.is_empty() {
        println!("  category via style columns: {}", style_columns.join(", "));
    }

    if dry_run {
        println!("  rows found: {} (dry-run, nothing written)", source.rows.len());
        return Ok(());
    }

    let records = normalize(&source, &mapping, &style_columns);
    let store = CatalogStore::new(&config.files.catalog);
    store.save(&records)?;

    println!("  records written: {}", records.len());
    println!("ok");
    Ok(())
}
