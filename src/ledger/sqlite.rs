// src/ledger/sqlite.rs

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::{Ledger, LedgerError, NameMatch};
use crate::models::attempt::AttemptRecord;
use crate::scoring::marks::MarksTier;

/// Ledger in an SQLite database. The UNIQUE `name_key` column is the
/// attempt guard.
pub struct SqliteLedger {
    pool: SqlitePool,
    names: NameMatch,
}

/// Row shape of the `attempts` table.
#[derive(sqlx::FromRow)]
struct AttemptRow {
    name: String,
    category: String,
    gross_speed_wpm: f64,
    final_speed_wpm: f64,
    mistake_count: i64,
    marks: String,
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<AttemptRow> for AttemptRecord {
    type Error = LedgerError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        let corrupt = |message: String| LedgerError::Format { line: 0, message };
        Ok(AttemptRecord {
            mistake_count: u32::try_from(row.mistake_count)
                .map_err(|_| corrupt(format!("stored mistake count {}", row.mistake_count)))?,
            marks: row.marks.parse::<MarksTier>().map_err(corrupt)?,
            name: row.name,
            category: row.category,
            gross_speed_wpm: row.gross_speed_wpm,
            final_speed_wpm: row.final_speed_wpm,
            created_at: row.created_at,
        })
    }
}

impl SqliteLedger {
    /// Connects to `url`, creating the database file if needed, and applies
    /// migrations.
    pub async fn connect(url: &str, names: NameMatch) -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;
        Self::with_pool(pool, names).await
    }

    /// Wraps an existing pool and applies migrations.
    pub async fn with_pool(pool: SqlitePool, names: NameMatch) -> Result<Self, LedgerError> {
        tracing::info!("Running migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool, names })
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn has_attempted(&self, name: &str) -> Result<bool, LedgerError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE name_key = ?")
            .bind(self.names.key(name))
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn append(&self, record: AttemptRecord) -> Result<(), LedgerError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attempts
                (name, name_key, category, gross_speed_wpm, final_speed_wpm,
                 mistake_count, marks, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.name)
        .bind(self.names.key(&record.name))
        .bind(&record.category)
        .bind(record.gross_speed_wpm)
        .bind(record.final_speed_wpm)
        .bind(i64::from(record.mistake_count))
        .bind(record.marks.to_string())
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(LedgerError::Duplicate(record.name))
            }
            Err(e) => {
                tracing::error!("Failed to insert attempt: {:?}", e);
                Err(e.into())
            }
        }
    }

    async fn list_all(&self) -> Result<Vec<AttemptRecord>, LedgerError> {
        let rows = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT name, category, gross_speed_wpm, final_speed_wpm,
                   mistake_count, marks, created_at
            FROM attempts
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AttemptRecord::try_from).collect()
    }
}
