use crate::core::error::Result;
use crate::core::pair::CurrencyPair;
use crate::core::rate::RateRecord;
use crate::core::store::RateStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory rate store, records kept in insertion order
#[derive(Clone, Default)]
pub struct MemoryRateStore {
    inner: Arc<Mutex<Vec<RateRecord>>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn save_all(&self, records: &[RateRecord]) -> Result<()> {
        let mut store = self.inner.lock().await;
        store.extend_from_slice(records);
        debug!(saved = records.len(), "Memory store SAVE");
        Ok(())
    }

    async fn find_in_range(
        &self,
        pair: CurrencyPair,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RateRecord>> {
        let store = self.inner.lock().await;
        let mut found: Vec<RateRecord> = store
            .iter()
            .filter(|r| r.pair() == pair && r.created_at() >= start && r.created_at() <= end)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at());
        Ok(found)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut store = self.inner.lock().await;
        let before = store.len();
        store.retain(|r| r.created_at() >= cutoff);
        let deleted = before - store.len();
        debug!(deleted, "Memory store DELETE");
        Ok(deleted)
    }
}
