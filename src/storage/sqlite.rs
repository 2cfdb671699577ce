//! SQLite Transaction Journal
//!
//! Durable mirror of the engine's transaction log.
//! Uses connection pooling via r2d2 for concurrent access.

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;

use super::traits::{StorageError, StorageResult, TransactionJournal};
use crate::types::{Address, AssetAmount, Epoch, TransactionRecord, TransactionStatus};

const SELECT_COLUMNS: &str = "id, user_address, kind, asset_amounts, liquid_amount, \
     underlying_amount, fee_amount, request_epoch, settlement_epoch, status, attempts, \
     error, created_at, updated_at";

/// SQLite-backed journal with connection pooling
pub struct SqliteJournal {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteJournal {
    /// Open (or create) the journal at `db_path` and run migrations
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let journal = Self { pool };
        journal.run_migrations()?;

        Ok(journal)
    }

    /// Create an in-memory journal (for testing)
    pub fn in_memory() -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let journal = Self { pool };
        journal.run_migrations()?;

        Ok(journal)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        self.pool
            .get()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn run_migrations(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                user_address TEXT NOT NULL,
                kind TEXT NOT NULL,
                asset_amounts TEXT NOT NULL,
                liquid_amount INTEGER NOT NULL,
                underlying_amount INTEGER NOT NULL,
                fee_amount INTEGER NOT NULL,
                request_epoch INTEGER NOT NULL,
                settlement_epoch INTEGER,
                status TEXT NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                error TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_address);
            CREATE INDEX IF NOT EXISTS idx_transactions_status ON transactions(status);
            "#,
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    /// Convert a database row to a TransactionRecord
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<TransactionRecord> {
        Ok(TransactionRecord {
            id: row.get("id")?,
            user: parse_column(row, "user_address")?,
            kind: parse_column(row, "kind")?,
            asset_amounts: {
                let raw: String = row.get("asset_amounts")?;
                serde_json::from_str::<Vec<AssetAmount>>(&raw)
                    .map_err(|e| conversion_error(row, "asset_amounts", e.to_string()))?
            },
            liquid_amount: row.get::<_, i64>("liquid_amount")? as u64,
            underlying_amount: row.get::<_, i64>("underlying_amount")? as u64,
            fee_amount: row.get::<_, i64>("fee_amount")? as u64,
            request_epoch: Epoch(row.get::<_, i64>("request_epoch")? as u64),
            settlement_epoch: row
                .get::<_, Option<i64>>("settlement_epoch")?
                .map(|v| Epoch(v as u64)),
            status: parse_column(row, "status")?,
            attempts: row.get::<_, i64>("attempts")? as u32,
            error: row.get("error")?,
            created_at: row.get::<_, i64>("created_at")? as u64,
            updated_at: row.get::<_, i64>("updated_at")? as u64,
        })
    }

    fn record_sync(&self, record: &TransactionRecord) -> StorageResult<()> {
        let conn = self.conn()?;
        let asset_amounts = serde_json::to_string(&record.asset_amounts)
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO transactions (
                id, user_address, kind, asset_amounts, liquid_amount,
                underlying_amount, fee_amount, request_epoch, settlement_epoch,
                status, attempts, error, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(id) DO UPDATE SET
                underlying_amount = excluded.underlying_amount,
                settlement_epoch = excluded.settlement_epoch,
                status = excluded.status,
                attempts = excluded.attempts,
                error = excluded.error,
                updated_at = excluded.updated_at
            "#,
            params![
                record.id,
                record.user.as_str(),
                record.kind.to_string(),
                asset_amounts,
                record.liquid_amount as i64,
                record.underlying_amount as i64,
                record.fee_amount as i64,
                record.request_epoch.value() as i64,
                record.settlement_epoch.map(|e| e.value() as i64),
                record.status.to_string(),
                record.attempts as i64,
                record.error,
                record.created_at as i64,
                record.updated_at as i64,
            ],
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    fn query_sync(&self, filter: &str, value: &str) -> StorageResult<Vec<TransactionRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions WHERE {} = ?1 ORDER BY seq",
            SELECT_COLUMNS, filter
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let records = stmt
            .query_map(params![value], Self::row_to_record)
            .map_err(|e| StorageError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;

        Ok(records)
    }
}

fn conversion_error(row: &rusqlite::Row, column: &str, message: String) -> rusqlite::Error {
    let idx = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

fn parse_column<T>(row: &rusqlite::Row, column: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.get(column)?;
    raw.parse()
        .map_err(|e: T::Err| conversion_error(row, column, e.to_string()))
}

#[async_trait]
impl TransactionJournal for SqliteJournal {
    async fn record(&self, record: &TransactionRecord) -> StorageResult<()> {
        self.record_sync(record)
    }

    async fn get(&self, id: &str) -> StorageResult<Option<TransactionRecord>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM transactions WHERE id = ?1", SELECT_COLUMNS);

        conn.query_row(&sql, params![id], Self::row_to_record)
            .optional()
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    async fn by_user(&self, user: &Address) -> StorageResult<Vec<TransactionRecord>> {
        self.query_sync("user_address", user.as_str())
    }

    async fn by_status(&self, status: TransactionStatus) -> StorageResult<Vec<TransactionRecord>> {
        self.query_sync("status", &status.to_string())
    }

    async fn count(&self) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(count as usize)
    }
}
