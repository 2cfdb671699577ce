//! In-Memory Journal
//!
//! Provides in-memory storage for testing and development.
//! Data is lost when the service restarts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::{StorageResult, TransactionJournal};
use crate::types::{Address, TransactionRecord, TransactionStatus};

#[derive(Default)]
struct Inner {
    /// Records indexed by ID
    records: HashMap<String, TransactionRecord>,
    /// Insertion order of IDs
    order: Vec<String>,
}

/// In-memory transaction journal
///
/// Thread-safe; clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryJournal {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryJournal {
    /// Create a new empty journal
    pub fn new() -> Self {
        Self::default()
    }

    async fn filtered<F>(&self, keep: F) -> Vec<TransactionRecord>
    where
        F: Fn(&TransactionRecord) -> bool,
    {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .filter(|r| keep(r))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TransactionJournal for MemoryJournal {
    async fn record(&self, record: &TransactionRecord) -> StorageResult<()> {
        let mut inner = self.inner.write().await;

        if !inner.records.contains_key(&record.id) {
            inner.order.push(record.id.clone());
        }
        inner.records.insert(record.id.clone(), record.clone());

        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<Option<TransactionRecord>> {
        Ok(self.inner.read().await.records.get(id).cloned())
    }

    async fn by_user(&self, user: &Address) -> StorageResult<Vec<TransactionRecord>> {
        Ok(self.filtered(|r| &r.user == user).await)
    }

    async fn by_status(&self, status: TransactionStatus) -> StorageResult<Vec<TransactionRecord>> {
        Ok(self.filtered(|r| r.status == status).await)
    }

    async fn count(&self) -> StorageResult<usize> {
        Ok(self.inner.read().await.records.len())
    }
}
