// src/ledger/csv_file.rs

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{Ledger, LedgerError, NameMatch, csv};
use crate::models::attempt::AttemptRecord;

/// Ledger kept as a flat results file in the export format.
///
/// A single lock serializes every read-check-append cycle within the process.
pub struct CsvLedger {
    path: PathBuf,
    names: NameMatch,
    lock: Mutex<()>,
}

impl CsvLedger {
    pub fn new(path: impl AsRef<Path>, names: NameMatch) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            names,
            lock: Mutex::new(()),
        }
    }

    /// Reads the file; a missing file is an empty ledger.
    async fn read_text(&self) -> Result<String, LedgerError> {
        match fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the file contents through a staging file and rename.
    async fn rewrite(&self, text: &str) -> Result<(), LedgerError> {
        let mut staging = self.path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        let mut file = fs::File::create(&staging).await?;
        file.write_all(text.as_bytes()).await?;
        file.sync_data().await?;
        fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    fn contains(&self, records: &[AttemptRecord], name: &str) -> bool {
        let key = self.names.key(name);
        records.iter().any(|r| self.names.key(&r.name) == key)
    }
}

fn has_current_header(text: &str) -> bool {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let first = text.lines().next().unwrap_or_default();
    first.trim_end_matches('\r') == csv::COLUMNS.join(",")
}

#[async_trait]
impl Ledger for CsvLedger {
    async fn has_attempted(&self, name: &str) -> Result<bool, LedgerError> {
        let _guard = self.lock.lock().await;
        let records = csv::decode(&self.read_text().await?)?;
        Ok(self.contains(&records, name))
    }

    async fn append(&self, record: AttemptRecord) -> Result<(), LedgerError> {
        let _guard = self.lock.lock().await;

        let text = self.read_text().await?;
        let records = csv::decode(&text)?;
        if self.contains(&records, &record.name) {
            return Err(LedgerError::Duplicate(record.name));
        }

        if !text.trim().is_empty() && !has_current_header(&text) {
            // older column layout: rewrite the whole file so every row matches
            let mut all = records;
            all.push(record);
            self.rewrite(&csv::encode(&all)).await?;
            tracing::info!("Upgraded {} to the current column layout", self.path.display());
            return Ok(());
        }

        let mut chunk = String::new();
        if text.trim().is_empty() {
            chunk.push_str(&csv::header_line());
        } else if !text.ends_with('\n') {
            chunk.push('\n');
        }
        chunk.push_str(&csv::encode_row(&record));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        if text.trim().is_empty() {
            // whitespace-only leftovers would sit above the header
            file.set_len(0).await?;
        }
        file.write_all(chunk.as_bytes()).await?;
        file.sync_data().await?;

        tracing::debug!("Appended result for '{}' to {}", record.name, self.path.display());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<AttemptRecord>, LedgerError> {
        let _guard = self.lock.lock().await;
        csv::decode(&self.read_text().await?)
    }
}
