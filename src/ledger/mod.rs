// src/ledger/mod.rs

//! The attempt ledger: append-only storage of exam results with a
//! one-attempt-per-name guard.
//!
//! Every backend performs the duplicate check and the insert as one atomic
//! step, so two concurrent submissions under the same name cannot both land.

pub mod csv;
pub mod csv_file;
pub mod memory;
pub mod sqlite;

use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use crate::config::Config;
use crate::models::attempt::{AttemptRecord, ImportSummary};

pub use self::csv_file::CsvLedger;
pub use self::memory::MemoryLedger;
pub use self::sqlite::SqliteLedger;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("'{0}' has already attempted the exam")]
    Duplicate(String),

    #[error("results file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("results database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("results database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("malformed results data at line {line}: {message}")]
    Format { line: usize, message: String },
}

/// Append-only store of attempt records.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// True iff a record with the same name key exists.
    async fn has_attempted(&self, name: &str) -> Result<bool, LedgerError>;

    /// Appends `record`, or fails with [`LedgerError::Duplicate`] without
    /// writing anything if its name key is already taken.
    async fn append(&self, record: AttemptRecord) -> Result<(), LedgerError>;

    /// Every record, in insertion order.
    async fn list_all(&self) -> Result<Vec<AttemptRecord>, LedgerError>;
}

pub type SharedLedger = Arc<dyn Ledger>;

/// How student names are compared by the attempt guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMatch {
    /// Byte-for-byte comparison.
    #[default]
    Exact,
    /// Trimmed, internal whitespace collapsed, lowercased.
    Normalized,
}

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));

impl NameMatch {
    /// Key under which `name` is checked for uniqueness.
    pub fn key(&self, name: &str) -> String {
        match self {
            NameMatch::Exact => name.to_string(),
            NameMatch::Normalized => WHITESPACE.replace_all(name.trim(), " ").to_lowercase(),
        }
    }
}

impl FromStr for NameMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "normalized" => Ok(Self::Normalized),
            other => Err(format!("unknown name matching '{other}'")),
        }
    }
}

/// Storage medium behind the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerBackend {
    #[default]
    Sqlite,
    Csv,
    /// Lost on restart. Meant for tests and demos.
    Memory,
}

impl FromStr for LedgerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "csv" => Ok(Self::Csv),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown ledger backend '{other}'")),
        }
    }
}

/// Opens the ledger selected by `config`.
pub async fn open(config: &Config) -> Result<SharedLedger, LedgerError> {
    let ledger: SharedLedger = match config.ledger_backend {
        LedgerBackend::Sqlite => {
            tracing::info!("Opening results database at {}", config.database_url);
            Arc::new(SqliteLedger::connect(&config.database_url, config.name_match).await?)
        }
        LedgerBackend::Csv => {
            tracing::info!("Using results file {}", config.ledger_csv_path.display());
            Arc::new(CsvLedger::new(&config.ledger_csv_path, config.name_match))
        }
        LedgerBackend::Memory => {
            tracing::warn!("Using in-memory results ledger; results will not survive a restart");
            Arc::new(MemoryLedger::new(config.name_match))
        }
    };
    Ok(ledger)
}

/// Appends `records` in order, skipping names that already attempted.
pub async fn import(
    ledger: &dyn Ledger,
    records: Vec<AttemptRecord>,
) -> Result<ImportSummary, LedgerError> {
    let mut summary = ImportSummary::default();
    for record in records {
        match ledger.append(record).await {
            Ok(()) => summary.imported += 1,
            Err(LedgerError::Duplicate(name)) => {
                tracing::debug!("Skipping imported row for '{}': already present", name);
                summary.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(summary)
}
