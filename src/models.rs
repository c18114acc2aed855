//! Core data models used throughout kura.
//!
//! A [`Record`] is one catalog entry. Whatever shape a historical catalog
//! file (or an uploaded spreadsheet) has, every record exposed to the rest
//! of the system carries exactly the canonical field set, in canonical
//! order. Cell-level coercions are total: they never fail, they fall back
//! to a defined default instead.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// The canonical field set, in canonical order. This is the catalog file's
/// header row and the key set of every audit snapshot.
pub const CANONICAL_FIELDS: &[&str] = &[
    "id",
    "name",
    "category",
    "quantity",
    "updated_at",
    "member",
    "producer",
    "region",
    "polish_ratio",
    "notes",
    "session",
    "session_date",
];

/// Display label for records whose session is unset.
pub const PENDING_LABEL: &str = "pending approval";

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// One catalog entry.
///
/// `id` is assigned by the store (next = max existing + 1). `session` is
/// either absent (the record is pending approval) or a normalized
/// numeric-string identifier produced by [`normalize_session`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: i64,
    pub updated_at: Option<DateTime<Utc>>,
    pub member: Option<String>,
    pub producer: Option<String>,
    pub region: Option<String>,
    pub polish_ratio: Option<String>,
    pub notes: Option<String>,
    pub session: Option<String>,
    pub session_date: Option<String>,
}

impl Record {
    /// Render one canonical field as a catalog-file cell.
    ///
    /// Absent values render as the empty string; `quantity` always renders
    /// as an integer, `updated_at` as `YYYY-MM-DD HH:MM:SS`.
    pub fn get(&self, field: &str) -> String {
        match field {
            "id" => self.id.map(|v| v.to_string()).unwrap_or_default(),
            "name" => self.name.clone().unwrap_or_default(),
            "category" => self.category.clone().unwrap_or_default(),
            "quantity" => self.quantity.to_string(),
            "updated_at" => self.updated_at.map(format_timestamp).unwrap_or_default(),
            "member" => self.member.clone().unwrap_or_default(),
            "producer" => self.producer.clone().unwrap_or_default(),
            "region" => self.region.clone().unwrap_or_default(),
            "polish_ratio" => self.polish_ratio.clone().unwrap_or_default(),
            "notes" => self.notes.clone().unwrap_or_default(),
            "session" => self.session.clone().unwrap_or_default(),
            "session_date" => self.session_date.clone().unwrap_or_default(),
            _ => String::new(),
        }
    }

    /// Set one canonical field from a raw cell value, applying the field's
    /// total coercion. Unknown field names are ignored.
    pub fn set(&mut self, field: &str, raw: &str) {
        match field {
            "id" => self.id = coerce_id(raw),
            "name" => self.name = non_empty(raw),
            "category" => self.category = non_empty(raw),
            "quantity" => self.quantity = coerce_quantity(raw),
            "updated_at" => self.updated_at = parse_timestamp(raw),
            "member" => self.member = non_empty(raw),
            "producer" => self.producer = non_empty(raw),
            "region" => self.region = non_empty(raw),
            "polish_ratio" => self.polish_ratio = non_empty(raw),
            "notes" => self.notes = non_empty(raw),
            "session" => self.session = non_empty(raw),
            "session_date" => self.session_date = non_empty(raw),
            _ => {}
        }
    }

    /// Render the full record as a catalog-file row, canonical order.
    pub fn to_row(&self) -> Vec<String> {
        CANONICAL_FIELDS.iter().map(|f| self.get(f)).collect()
    }

    /// Render the record as a JSON object keyed by canonical field name,
    /// every value string-rendered. This is the snapshot shape the audit
    /// log stores and diffs.
    pub fn to_state(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for field in CANONICAL_FIELDS {
            map.insert(
                field.to_string(),
                serde_json::Value::String(self.get(field)),
            );
        }
        serde_json::Value::Object(map)
    }
}

fn non_empty(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Coerce a cell to a record id. Accepts plain integers and float renderings
/// of integers ("3", "3.0"); anything else yields absent.
pub fn coerce_id(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(n) = s.parse::<i64>() {
        return Some(n);
    }
    s.parse::<f64>().ok().map(|f| f as i64)
}

/// Coerce a cell to a non-negative quantity. Unparsable or absent values
/// default to 0; negative values clamp to 0.
pub fn coerce_quantity(raw: &str) -> i64 {
    let s = raw.trim();
    let n = if let Ok(n) = s.parse::<i64>() {
        n
    } else if let Ok(f) = s.parse::<f64>() {
        f as i64
    } else {
        0
    };
    n.max(0)
}

/// Parse a cell as a timestamp, trying the catalog's own format first and
/// a few common spreadsheet renderings after. Unparsable yields absent;
/// the store substitutes "now" on save.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

/// Format a timestamp the way the catalog file stores it.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Normalize a session input to its stored form: the first digit run,
/// re-rendered as a plain integer string. "8", "session 8", and "第8回"
/// all normalize to "8". Inputs without digits yield absent.
pub fn normalize_session(input: &str) -> Option<String> {
    let m = DIGIT_RUN.find(input)?;
    m.as_str().parse::<i64>().ok().map(|n| n.to_string())
}

/// Display label for a stored session value.
///
/// Absent and blank values surface as the pending-approval sentinel group;
/// numeric values (including float renderings) become `session N`; anything
/// else a historical file holds is shown verbatim.
pub fn session_label(session: Option<&str>) -> String {
    let s = session.unwrap_or("").trim();
    if s.is_empty() {
        return PENDING_LABEL.to_string();
    }
    if let Ok(n) = s.parse::<i64>() {
        return format!("session {}", n);
    }
    if let Ok(f) = s.parse::<f64>() {
        return format!("session {}", f as i64);
    }
    s.to_string()
}

/// Sort key for session group labels: pending first, then ascending session
/// number, then everything without a number.
pub fn session_sort_key(label: &str) -> (u8, i64) {
    if label == PENDING_LABEL {
        return (0, -1);
    }
    match DIGIT_RUN
        .find(label)
        .and_then(|m| m.as_str().parse::<i64>().ok())
    {
        Some(n) => (1, n),
        None => (1, i64::MAX),
    }
}
