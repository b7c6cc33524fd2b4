// src/ledger/memory.rs

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Ledger, LedgerError, NameMatch};
use crate::models::attempt::AttemptRecord;

/// Non-durable ledger for tests.
#[derive(Default)]
pub struct MemoryLedger {
    names: NameMatch,
    records: Mutex<Vec<AttemptRecord>>,
}

impl MemoryLedger {
    pub fn new(names: NameMatch) -> Self {
        Self {
            names,
            records: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn has_attempted(&self, name: &str) -> Result<bool, LedgerError> {
        let key = self.names.key(name);
        let records = self.records.lock().await;
        Ok(records.iter().any(|r| self.names.key(&r.name) == key))
    }

    async fn append(&self, record: AttemptRecord) -> Result<(), LedgerError> {
        let key = self.names.key(&record.name);
        let mut records = self.records.lock().await;
        if records.iter().any(|r| self.names.key(&r.name) == key) {
            return Err(LedgerError::Duplicate(record.name));
        }
        records.push(record);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<AttemptRecord>, LedgerError> {
        Ok(self.records.lock().await.clone())
    }
}
