//! Persistence abstraction for rate records

use crate::core::error::Result;
use crate::core::pair::CurrencyPair;
use crate::core::rate::RateRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait RateStore: Send + Sync {
    /// Persists all `records` as one unit: either every record is stored or none is.
    async fn save_all(&self, records: &[RateRecord]) -> Result<()>;

    async fn save(&self, record: &RateRecord) -> Result<()> {
        self.save_all(std::slice::from_ref(record)).await
    }

    /// Records of `pair` with `start <= created_at <= end`, oldest first.
    async fn find_in_range(
        &self,
        pair: CurrencyPair,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RateRecord>>;

    /// Deletes records with `created_at < cutoff` and returns how many went.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}
