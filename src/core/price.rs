//! Pricing abstractions and core types

use crate::core::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Exchange symbol to spot price, as returned by a single fetch.
pub type PriceSnapshot = HashMap<String, f64>;

/// One entry of the exchange's advertised request limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    pub rate_limit_type: String,
    pub interval: String,
    pub interval_num: u32,
    pub limit: u32,
}

#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// Fetches the current prices of `symbols`. Entries the exchange returns
    /// without a usable positive price are left out of the snapshot.
    async fn fetch_prices(&self, symbols: &BTreeSet<String>) -> Result<PriceSnapshot>;

    /// Liveness probe. Never fails, an unreachable exchange is `false`.
    async fn health_check(&self) -> bool;

    async fn rate_limits(&self) -> Option<Vec<RateLimit>> {
        None
    }
}
