//! # kura CLI
//!
//! The `kura` binary is the interface to the catalog. It provides commands
//! for initializing the backing files, registering and approving entries,
//! importing spreadsheets, and inspecting the audit trail.
//!
//! ## Usage
//!
//! ```bash
//! kura --config ./kura.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kura init` | Create the catalog and audit files |
//! | `kura add` | Register a new entry (pending approval) |
//! | `kura list` | Show the catalog, grouped by session |
//! | `kura session` | Assign or clear session numbers |
//! | `kura delete` | Hard-delete records by id |
//! | `kura import <file>` | Ingest a spreadsheet of any column layout |
//! | `kura audit` | Print the change history |
//! | `kura suggest` | Member names ranked by usage |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use kura::{audit, config, entry, import, list, store, suggest};

/// kura — a local-first catalog manager for tasting clubs.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file is absent, built-in defaults apply and the backing
/// files live under `./data/`.
#[derive(Parser)]
#[command(
    name = "kura",
    about = "kura — a local-first catalog manager with audit history and spreadsheet import",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Optional; defaults apply when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./kura.toml")]
    config: PathBuf,

    /// Acting user recorded in the audit trail.
    #[arg(long, global = true, default_value = "-")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create the catalog and audit files.
    ///
    /// Both are created empty under the canonical header row. Idempotent:
    /// running it again leaves existing files alone.
    Init,

    /// Show the catalog.
    ///
    /// Records are grouped by session label by default, pending-approval
    /// entries first. Filters compare member names after normalization, so
    /// full-width and half-width spellings match.
    List {
        /// Print one flat table instead of session groups.
        #[arg(long)]
        flat: bool,

        /// Only show entries from this member.
        #[arg(long)]
        member: Option<String>,

        /// Only show one session ("8") or the pending group ("pending").
        #[arg(long)]
        session: Option<String>,

        /// Rewrite the catalog under the canonical schema and record a
        /// manual_save audit entry.
        #[arg(long)]
        resave: bool,
    },

    /// Register a new entry.
    ///
    /// The record gets the next id and no session, so it shows up in the
    /// pending-approval group until a session number is assigned.
    Add {
        /// Bottle name (required).
        #[arg(long)]
        name: String,

        /// Member who brought it (required).
        #[arg(long)]
        member: String,

        /// Producer, e.g. the brewery.
        #[arg(long)]
        producer: Option<String>,

        /// Region of origin.
        #[arg(long)]
        region: Option<String>,

        /// Style category, e.g. 純米吟醸.
        #[arg(long)]
        category: Option<String>,

        /// Polish ratio as a plain number, e.g. 60 or 55.5.
        #[arg(long)]
        polish_ratio: Option<String>,

        /// Free-form notes.
        #[arg(long)]
        notes: Option<String>,
    },

    /// Assign or clear session numbers on records.
    ///
    /// The number may be decorated: "8", "session 8", and "第8回" all
    /// store as "8". Clearing returns records to pending approval.
    Session {
        /// Record id(s) to update (repeatable).
        #[arg(long = "id", required = true)]
        ids: Vec<i64>,

        /// Session number to assign.
        #[arg(long)]
        number: Option<String>,

        /// Clear the session instead, returning records to pending.
        #[arg(long, conflicts_with = "number")]
        clear: bool,
    },

    /// Hard-delete records by id.
    ///
    /// Without `--yes` the targets are listed and nothing is written.
    /// Deletions are recorded in the audit trail with the full before
    /// state, so the history survives the record.
    Delete {
        /// Record id(s) to delete (repeatable).
        #[arg(long = "id", required = true)]
        ids: Vec<i64>,

        /// Actually delete; without this flag the command only previews.
        #[arg(long)]
        yes: bool,
    },

    /// Ingest a spreadsheet of unknown column layout.
    ///
    /// Source headers are matched to canonical fields by a synonym table
    /// (configurable in kura.toml); `--map` overrides any guess. The
    /// normalized set replaces the whole catalog.
    Import {
        /// Path to the source file (header-row-first CSV).
        file: PathBuf,

        /// Override a guessed mapping: `field=Column`. An empty column
        /// (`field=`) unmaps the field. Repeatable.
        #[arg(long = "map", value_parser = parse_key_val)]
        map: Vec<(String, String)>,

        /// Columns whose non-empty cells mark the style; the first marked
        /// column names the category. Defaults to the configured style
        /// candidates present in the source. Repeatable.
        #[arg(long = "style-col")]
        style_cols: Vec<String>,

        /// Show the guessed mapping and row count without writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the change history, oldest first.
    Audit {
        /// Only show the most recent N entries.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print member names ranked by usage frequency.
    ///
    /// Seeds the frequency counter from the catalog the first time it
    /// runs on a fresh installation.
    Suggest,
}

/// Parse a `key=value` pair for `--map` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid FIELD=COLUMN: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            store::CatalogStore::new(&cfg.files.catalog).ensure_exists()?;
            audit::AuditLog::new(&cfg.files.audit).ensure_exists()?;
            println!("Catalog initialized successfully.");
        }
        Commands::List {
            flat,
            member,
            session,
            resave,
        } => {
            list::run_list(
                &cfg,
                !flat,
                member.as_deref(),
                session.as_deref(),
                resave,
                &cli.user,
            )?;
        }
        Commands::Add {
            name,
            member,
            producer,
            region,
            category,
            polish_ratio,
            notes,
        } => {
            let new_entry = entry::NewEntry {
                name,
                member,
                producer,
                region,
                category,
                polish_ratio,
                notes,
            };
            entry::run_add(&cfg, &cli.user, &new_entry)?;
        }
        Commands::Session { ids, number, clear } => {
            entry::run_session(&cfg, &cli.user, &ids, number.as_deref(), clear)?;
        }
        Commands::Delete { ids, yes } => {
            entry::run_delete(&cfg, &cli.user, &ids, yes)?;
        }
        Commands::Import {
            file,
            map,
            style_cols,
            dry_run,
        } => {
            let style = if style_cols.is_empty() {
                None
            } else {
                Some(style_cols)
            };
            import::run_import(&cfg, &file, &map, style, dry_run)?;
        }
        Commands::Audit { limit } => {
            audit::run_audit(&cfg, limit)?;
        }
        Commands::Suggest => {
            suggest::run_suggest(&cfg)?;
        }
    }

    Ok(())
}
