pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use disk::DiskRateStore;

/// Opens the persistent rate store under the configured data directory.
pub fn open_rate_store(config: &AppConfig) -> Result<DiskRateStore> {
    let path = config.default_data_path()?.join("rates");
    DiskRateStore::open(&path)
        .with_context(|| format!("Failed to open rate store at {}", path.display()))
}
