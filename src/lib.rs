//! # kura
//!
//! A local-first catalog manager for tasting clubs.
//!
//! kura keeps a small set of structured records in a single durable
//! tabular file, records every mutation in an append-only audit trail,
//! ingests externally produced spreadsheets of unknown column layout into
//! the canonical schema, and ranks member names by usage frequency to bias
//! picklists.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Spreadsheets │──▶│   Import    │──▶│   Catalog    │
//! │ (any layout) │   │  Pipeline   │   │ (one file)   │
//! └──────────────┘   └─────────────┘   └──────┬───────┘
//!                                             │
//!                        ┌────────────────────┼──────────────┐
//!                        ▼                    ▼              ▼
//!                  ┌──────────┐        ┌───────────┐  ┌───────────┐
//!                  │  Audit   │        │ Suggestion│  │    CLI    │
//!                  │   Log    │        │   Index   │  │  (kura)   │
//!                  └──────────┘        └───────────┘  └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kura init                                   # create backing files
//! kura add --name Daybreak --member "Aya Sato"
//! kura import bottles.csv --dry-run           # preview the guessed mapping
//! kura import bottles.csv
//! kura session --id 3 --number 8              # approve into session 8
//! kura list                                   # grouped catalog view
//! kura audit                                  # change history
//! kura suggest                                # member names, most-used first
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Canonical record shape and cell coercions |
//! | [`table`] | Header-row-first tabular file codec |
//! | [`store`] | Catalog load/save with schema reconciliation |
//! | [`audit`] | Append-only change history |
//! | [`import`] | Column-mapping spreadsheet ingestion |
//! | [`suggest`] | Frequency-ranked member-name index |
//! | [`entry`] | Add / session / delete commands |
//! | [`list`] | Catalog listing |

pub mod audit;
pub mod config;
pub mod entry;
pub mod import;
pub mod list;
pub mod models;
pub mod store;
pub mod suggest;
pub mod table;
