//! Storage Trait Definitions
//!
//! The engine keeps the canonical transaction log in memory; a journal
//! mirrors every appended or updated record so the audit trail survives
//! restarts. Implementations can use SQLite (production) or in-memory
//! (testing).

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Address, TransactionRecord, TransactionStatus};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Transaction journal interface
///
/// Implementations:
/// - `SqliteJournal` - Durable storage with SQLite
/// - `MemoryJournal` - In-memory storage for testing
#[async_trait]
pub trait TransactionJournal: Send + Sync {
    /// Insert a record, or replace the stored copy with the same ID
    async fn record(&self, record: &TransactionRecord) -> StorageResult<()>;

    /// Get a record by ID
    async fn get(&self, id: &str) -> StorageResult<Option<TransactionRecord>>;

    /// All records of one wallet, oldest first
    async fn by_user(&self, user: &Address) -> StorageResult<Vec<TransactionRecord>>;

    /// All records with a specific status, oldest first
    async fn by_status(&self, status: TransactionStatus) -> StorageResult<Vec<TransactionRecord>>;

    /// Number of stored records
    async fn count(&self) -> StorageResult<usize>;
}
