//! Storage Layer Module
//!
//! Persistence for the transaction audit log.
//!
//! This module contains:
//! - Journal trait definition
//! - SQLite implementation for production
//! - In-memory implementation for testing

pub mod memory;
pub mod sqlite;
pub mod traits;

// Re-exports for convenience
pub use memory::MemoryJournal;
pub use sqlite::SqliteJournal;
pub use traits::{StorageError, StorageResult, TransactionJournal};
