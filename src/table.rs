//! Header-row-first tabular file codec.
//!
//! Both the catalog and the audit log persist as single-table CSV files
//! whose first row names the columns. Quoting follows the usual CSV rules:
//! cells containing a comma, quote, or newline are wrapped in double quotes
//! with embedded quotes doubled, and a quoted cell may span lines. The
//! parser is a single forward scan over the whole text, so it never
//! produces a half-read row.

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

/// A parsed tabular file: named columns plus loosely-typed string cells.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Index of a named column, if present.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell value for a named column in the given row. Absent columns and
    /// short rows yield `None`.
    pub fn value<'a>(&self, row: &'a [String], name: &str) -> Option<&'a str> {
        let idx = self.column(name)?;
        row.get(idx).map(|s| s.as_str())
    }
}

/// Parse a header-row-first tabular text into a [`Table`].
///
/// Rows whose cells are all empty are skipped; rows shorter than the header
/// are kept as-is (consumers treat missing cells as empty).
pub fn parse(text: &str) -> Result<Table> {
    let mut records = scan(text);
    if records.is_empty() {
        bail!("table has no header row");
    }
    let headers = records.remove(0);
    if headers.iter().all(|h| h.is_empty()) {
        bail!("table header row is empty");
    }
    let rows = records
        .into_iter()
        .filter(|r| r.iter().any(|c| !c.is_empty()))
        .collect();
    Ok(Table { headers, rows })
}

/// Render headers and rows back to tabular text, ending with a newline.
pub fn render(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    push_row(&mut out, headers);
    for row in rows {
        push_row(&mut out, row);
    }
    out
}

/// Replace `path` with `contents` via write-to-temp and rename, so a crash
/// mid-write leaves either the old file or the new one, never a torn one.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.to_path_buf();
    tmp.set_extension("tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn push_row(out: &mut String, cells: &[String]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape(cell));
    }
    out.push('\n');
}

/// Escape a cell: wrap in quotes if it contains a comma, quote, or newline.
fn escape(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Scan the whole text into records of cells, honoring quoted cells that
/// span commas and newlines.
fn scan(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    cell.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                cell.push(ch);
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ',' => {
                    row.push(std::mem::take(&mut cell));
                }
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' => {
                    row.push(std::mem::take(&mut cell));
                    records.push(std::mem::take(&mut row));
                }
                _ => cell.push(ch),
            }
        }
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        records.push(row);
    }
    records
}
