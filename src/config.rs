use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::CANONICAL_FIELDS;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesConfig {
    #[serde(default = "default_catalog_path")]
    pub catalog: PathBuf,
    #[serde(default = "default_audit_path")]
    pub audit: PathBuf,
    #[serde(default = "default_history_path")]
    pub history: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog_path(),
            audit: default_audit_path(),
            history: default_history_path(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/catalog.csv")
}
fn default_audit_path() -> PathBuf {
    PathBuf::from("data/audit.csv")
}
fn default_history_path() -> PathBuf {
    PathBuf::from("data/member_history.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    /// Source columns whose non-empty cells mark a style; used to derive
    /// `category` when no source column maps to it.
    #[serde(default = "default_style_candidates")]
    pub style_candidates: Vec<String>,
    /// Per-field synonym overrides for header guessing. Keys must be
    /// canonical field names; entries replace the built-in list for that
    /// field only.
    #[serde(default)]
    pub synonyms: BTreeMap<String, Vec<String>>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            style_candidates: default_style_candidates(),
            synonyms: BTreeMap::new(),
        }
    }
}

fn default_style_candidates() -> Vec<String> {
    [
        "本醸造",
        "特別本醸造",
        "純米",
        "特別純米",
        "吟醸",
        "純米吟醸",
        "大吟醸",
        "純米大吟醸",
        "その他",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Load configuration from a TOML file.
///
/// A missing file is not an error: every setting has a default, so the
/// tool works out of the box with files under `./data/`.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    for field in config.import.synonyms.keys() {
        if !CANONICAL_FIELDS.contains(&field.as_str()) {
            anyhow::bail!(
                "Unknown field in import.synonyms: '{}'. Must be one of: {}",
                field,
                CANONICAL_FIELDS.join(", ")
            );
        }
    }

    Ok(config)
}
