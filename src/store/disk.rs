use crate::core::error::Result;
use crate::core::pair::CurrencyPair;
use crate::core::rate::RateRecord;
use crate::core::store::RateStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const ID_LEN: usize = 16;

/// Order-preserving encoding of a timestamp: microseconds since the epoch
/// with the sign bit flipped, big-endian.
fn time_prefix(at: DateTime<Utc>) -> [u8; 8] {
    ((at.timestamp_micros() as u64) ^ (1 << 63)).to_be_bytes()
}

fn record_key(record: &RateRecord) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + ID_LEN);
    key.extend_from_slice(&time_prefix(record.created_at()));
    key.extend_from_slice(record.id().as_bytes());
    key
}

/// Smallest key of any record stamped at `at` or later.
fn lower_key(at: DateTime<Utc>) -> Vec<u8> {
    time_prefix(at).to_vec()
}

/// Largest key of any record stamped at `at` or earlier.
fn upper_key(at: DateTime<Utc>) -> Vec<u8> {
    let mut key = lower_key(at);
    key.extend_from_slice(&[0xFF; ID_LEN]);
    key
}

/// Rate store on a fjall keyspace, one partition per currency pair.
pub struct DiskRateStore {
    keyspace: Keyspace,
    partitions: HashMap<CurrencyPair, PartitionHandle>,
}

impl DiskRateStore {
    pub fn open(path: &Path) -> Result<Self> {
        let keyspace = fjall::Config::new(path).open()?;

        let mut partitions = HashMap::new();
        for pair in CurrencyPair::ALL {
            let partition =
                keyspace.open_partition(pair.storage_name(), PartitionCreateOptions::default())?;
            partitions.insert(pair, partition);
        }
        debug!(path = %path.display(), "Opened rate store");

        Ok(Self {
            keyspace,
            partitions,
        })
    }

    fn partition(&self, pair: CurrencyPair) -> &PartitionHandle {
        // Every variant gets a partition in `open`
        &self.partitions[&pair]
    }
}

#[async_trait]
impl RateStore for DiskRateStore {
    async fn save_all(&self, records: &[RateRecord]) -> Result<()> {
        let mut batch = self.keyspace.batch();
        for record in records {
            batch.insert(
                self.partition(record.pair()),
                record_key(record),
                serde_json::to_vec(record)?,
            );
        }
        batch.commit()?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(saved = records.len(), "Rate store SAVE");
        Ok(())
    }

    async fn find_in_range(
        &self,
        pair: CurrencyPair,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RateRecord>> {
        if start > end {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for item in self
            .partition(pair)
            .range(lower_key(start)..=upper_key(end))
        {
            let (_key, value) = item?;
            let record: RateRecord = serde_json::from_slice(&value)?;
            // Keys only carry microseconds
            if record.created_at() >= start && record.created_at() <= end {
                records.push(record);
            }
        }
        debug!(pair = %pair, found = records.len(), "Rate store RANGE");
        Ok(records)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut batch = self.keyspace.batch();
        let mut deleted = 0;
        for pair in CurrencyPair::ALL {
            let partition = self.partition(pair);
            for item in partition.range(..lower_key(cutoff)) {
                let (key, _value) = item?;
                batch.remove(partition, key);
                deleted += 1;
            }
            // Same microsecond as the cutoff: compare full timestamps
            for item in partition.range(lower_key(cutoff)..=upper_key(cutoff)) {
                let (key, value) = item?;
                let record: RateRecord = serde_json::from_slice(&value)?;
                if record.created_at() < cutoff {
                    batch.remove(partition, key);
                    deleted += 1;
                }
            }
        }
        batch.commit()?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(deleted, "Rate store DELETE");
        Ok(deleted)
    }
}
