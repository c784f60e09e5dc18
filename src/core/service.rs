//! Update cycle and queries over the stored rate series

use crate::core::calculator::calculate_eur_rates;
use crate::core::clock::Clock;
use crate::core::error::{RatesError, Result};
use crate::core::pair::CurrencyPair;
use crate::core::price::{PriceFetcher, RateLimit};
use crate::core::rate::RateRecord;
use crate::core::response::{DATE_FORMAT_HINT, RatesResponse};
use crate::core::store::RateStore;
use crate::providers::retry::RetryExecutor;
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_RETENTION_DAYS: i64 = 30;

pub struct RateService {
    fetcher: Arc<dyn PriceFetcher>,
    store: Arc<dyn RateStore>,
    retry: RetryExecutor,
    clock: Arc<dyn Clock>,
    retention: Duration,
    // Held for the whole of an update cycle
    update_guard: Mutex<()>,
}

impl RateService {
    pub fn new(
        fetcher: Arc<dyn PriceFetcher>,
        store: Arc<dyn RateStore>,
        retry: RetryExecutor,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            store,
            retry,
            clock,
            retention: Duration::days(DEFAULT_RETENTION_DAYS),
            update_guard: Mutex::new(()),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Fetches prices (with retries) and converts them. Nothing is stored.
    async fn compute_rates(&self) -> Result<BTreeMap<CurrencyPair, f64>> {
        let symbols = CurrencyPair::required_symbols();
        debug!(symbols = ?symbols, "Required symbols identified");

        let prices = self
            .retry
            .execute(|| self.fetcher.fetch_prices(&symbols))
            .await?;
        debug!(prices_received = prices.len(), "Prices fetched from exchange");

        calculate_eur_rates(&prices)
    }

    /// Runs one update cycle and returns the number of records stored.
    ///
    /// All-or-nothing: records are only built once every rate is known and are
    /// committed together. A cycle started while another one is running fails
    /// with [`RatesError::UpdateInProgress`] and stores nothing.
    #[instrument(name = "UpdateRates", skip(self))]
    pub async fn update_rates(&self) -> Result<usize> {
        let Ok(_guard) = self.update_guard.try_lock() else {
            warn!("Update cycle already running, skipping");
            return Err(RatesError::UpdateInProgress);
        };

        let started = Instant::now();
        let result = self.run_update_cycle().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(saved) => {
                info!(pairs_updated = saved, elapsed_ms, "Exchange rates updated successfully");
                Ok(saved)
            }
            Err(e) => {
                error!(error = %e, elapsed_ms, "Failed to update exchange rates");
                Err(e)
            }
        }
    }

    async fn run_update_cycle(&self) -> Result<usize> {
        let rates = self.compute_rates().await?;
        let now = self.clock.now();

        let records: Vec<RateRecord> = rates
            .into_iter()
            .filter_map(|(pair, rate)| match RateRecord::new(pair, rate, now) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(pair = %pair, rate, error = %e, "Rate cannot be stored, skipping pair");
                    None
                }
            })
            .collect();
        if records.is_empty() {
            return Err(RatesError::Validation(
                "No exchange rate could be stored".to_string(),
            ));
        }

        self.store.save_all(&records).await?;
        Ok(records.len())
    }

    /// Freshly computed rate for `pair`, not read from the store.
    pub async fn get_single_rate(&self, pair: CurrencyPair) -> Result<f64> {
        debug!(pair = %pair, "Getting single rate for pair");
        let rates = self.compute_rates().await?;

        match rates.get(&pair) {
            Some(rate) => {
                info!(pair = %pair, rate, "Successfully retrieved single rate");
                Ok(*rate)
            }
            None => {
                error!(
                    pair = %pair,
                    available_pairs = ?rates.keys().collect::<Vec<_>>(),
                    "Rate not found for pair"
                );
                Err(RatesError::NotFound(format!("Rate not found for pair: {pair}")))
            }
        }
    }

    /// Like [`get_single_rate`](Self::get_single_rate) but logs failures and
    /// returns `None`.
    pub async fn current_rate(&self, pair: CurrencyPair) -> Option<f64> {
        match self.get_single_rate(pair).await {
            Ok(rate) => Some(rate),
            Err(e) => {
                error!(pair = %pair, error = %e, "Failed to get current rate");
                None
            }
        }
    }

    pub async fn get_last_24_hours(&self, pair: &str) -> Result<RatesResponse> {
        let pair: CurrencyPair = pair.parse()?;
        let end = self.clock.now();
        let start = end - Duration::hours(24);

        let records = self.store.find_in_range(pair, start, end).await?;
        Ok(RatesResponse::from_records(pair, &records))
    }

    /// Records of `pair` stamped on the UTC calendar day `date` (`YYYY-MM-DD`).
    pub async fn get_rates_by_date(&self, pair: &str, date: &str) -> Result<RatesResponse> {
        let pair: CurrencyPair = pair.parse()?;
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
            RatesError::Validation(format!("Invalid date format. Use {DATE_FORMAT_HINT}"))
        })?;

        let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1) - Duration::nanoseconds(1);

        let records = self.store.find_in_range(pair, start, end).await?;
        Ok(RatesResponse::from_records(pair, &records))
    }

    /// Deletes records older than the retention window and returns how many went.
    pub async fn cleanup_old_data(&self) -> Result<usize> {
        let cutoff = self.clock.now() - self.retention;
        match self.store.delete_older_than(cutoff).await {
            Ok(deleted) => {
                info!(deleted_count = deleted, %cutoff, "Cleaned up old exchange rate records");
                Ok(deleted)
            }
            Err(e) => {
                error!(error = %e, %cutoff, "Failed to clean up old exchange rate records");
                Err(e)
            }
        }
    }

    pub async fn health_check(&self) -> bool {
        let healthy = self.fetcher.health_check().await;
        info!(healthy, "Exchange health check completed");
        healthy
    }

    pub async fn rate_limits(&self) -> Option<Vec<RateLimit>> {
        self.fetcher.rate_limits().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::core::price::PriceSnapshot;
    use crate::providers::retry::RetryPolicy;
    use crate::store::memory::MemoryRateStore;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeSet;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays queued fetch results; a final successful result repeats forever.
    struct ScriptedFetcher {
        responses: std::sync::Mutex<VecDeque<Result<PriceSnapshot>>>,
        calls: AtomicUsize,
        delay: std::time::Duration,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<PriceSnapshot>>) -> Self {
            Self {
                responses: std::sync::Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                delay: std::time::Duration::ZERO,
            }
        }

        fn prices(entries: &[(&str, f64)]) -> Self {
            Self::new(vec![Ok(snapshot(entries))])
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceFetcher for ScriptedFetcher {
        async fn fetch_prices(&self, _symbols: &BTreeSet<String>) -> Result<PriceSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let mut responses = self.responses.lock().unwrap();
            if responses.len() == 1 {
                if let Some(Ok(prices)) = responses.front() {
                    return Ok(prices.clone());
                }
            }
            responses
                .pop_front()
                .unwrap_or_else(|| Err(RatesError::Decode("no scripted response".to_string())))
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn snapshot(entries: &[(&str, f64)]) -> PriceSnapshot {
        entries
            .iter()
            .map(|(symbol, price)| (symbol.to_string(), *price))
            .collect()
    }

    fn full_prices() -> Vec<(&'static str, f64)> {
        vec![
            ("EURUSDT", 1.08),
            ("BTCUSDT", 60000.0),
            ("ETHUSDT", 2500.0),
            ("LTCUSDT", 65.0),
        ]
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 2, 14, 0, 0).unwrap()
    }

    fn service(fetcher: Arc<ScriptedFetcher>, store: MemoryRateStore) -> RateService {
        RateService::new(
            fetcher,
            Arc::new(store),
            RetryExecutor::new(RetryPolicy::new(3, std::time::Duration::ZERO)),
            Arc::new(FixedClock(now())),
        )
    }

    #[tokio::test]
    async fn test_update_rates_persists_one_record_per_pair() {
        let fetcher = Arc::new(ScriptedFetcher::prices(&full_prices()));
        let store = MemoryRateStore::new();
        let service = service(fetcher.clone(), store.clone());

        let saved = service.update_rates().await.unwrap();

        assert_eq!(saved, 3);
        assert_eq!(fetcher.calls(), 1);
        let btc = store
            .find_in_range(CurrencyPair::EurBtc, now(), now())
            .await
            .unwrap();
        assert_eq!(btc.len(), 1);
        assert_eq!(btc[0].rate(), rust_decimal::Decimal::new(1800, 8));
        assert_eq!(btc[0].created_at(), now());
    }

    #[tokio::test]
    async fn test_update_rates_with_missing_quote_stores_the_rest() {
        let fetcher = Arc::new(ScriptedFetcher::prices(&[
            ("EURUSDT", 1.08),
            ("BTCUSDT", 60000.0),
            ("LTCUSDT", 65.0),
        ]));
        let store = MemoryRateStore::new();
        let service = service(fetcher, store.clone());

        assert_eq!(service.update_rates().await.unwrap(), 2);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_update_rates_retries_transient_failures() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Err(RatesError::Status {
                status: 502,
                url: "http://exchange".to_string(),
            }),
            Ok(snapshot(&full_prices())),
        ]));
        let store = MemoryRateStore::new();
        let service = service(fetcher.clone(), store.clone());

        assert_eq!(service.update_rates().await.unwrap(), 3);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_stores_nothing() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(RatesError::Status {
            status: 400,
            url: "http://exchange".to_string(),
        })]));
        let store = MemoryRateStore::new();
        let service = service(fetcher.clone(), store.clone());

        let err = service.update_rates().await.unwrap_err();

        assert!(matches!(err, RatesError::RetryExhausted { attempts: 1, .. }));
        assert_eq!(fetcher.calls(), 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_calculation_stores_nothing() {
        let fetcher = Arc::new(ScriptedFetcher::prices(&[("BTCUSDT", 60000.0)]));
        let store = MemoryRateStore::new();
        let service = service(fetcher, store.clone());

        let err = service.update_rates().await.unwrap_err();

        assert!(err.is_validation());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_rate_too_small_to_store_skips_only_that_pair() {
        let fetcher = Arc::new(ScriptedFetcher::prices(&[
            ("EURUSDT", 1.08),
            ("BTCUSDT", 1e9),
            ("ETHUSDT", 2500.0),
            ("LTCUSDT", 65.0),
        ]));
        let store = MemoryRateStore::new();
        let service = service(fetcher, store.clone());

        assert_eq!(service.update_rates().await.unwrap(), 2);
        assert_eq!(store.len().await, 2);
        let btc = store
            .find_in_range(CurrencyPair::EurBtc, now(), now())
            .await
            .unwrap();
        assert!(btc.is_empty());
    }

    #[tokio::test]
    async fn test_no_storable_rate_fails_the_cycle() {
        let fetcher = Arc::new(ScriptedFetcher::prices(&[("EURUSDT", 1.08), ("BTCUSDT", 1e9)]));
        let store = MemoryRateStore::new();
        let service = service(fetcher, store.clone());

        let err = service.update_rates().await.unwrap_err();

        assert!(err.is_validation());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_update_is_rejected() {
        let mut fetcher = ScriptedFetcher::prices(&full_prices());
        fetcher.delay = std::time::Duration::from_secs(30);
        let fetcher = Arc::new(fetcher);
        let store = MemoryRateStore::new();
        let service = Arc::new(service(fetcher.clone(), store.clone()));

        let first = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.update_rates().await }
        });
        // Let the first cycle take the guard
        tokio::task::yield_now().await;

        let second = service.update_rates().await;
        assert!(matches!(second, Err(RatesError::UpdateInProgress)));

        assert_eq!(first.await.unwrap().unwrap(), 3);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(store.len().await, 3);

        // The guard is released once the cycle finishes
        assert_eq!(service.update_rates().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_get_single_rate_computes_without_storing() {
        let fetcher = Arc::new(ScriptedFetcher::prices(&full_prices()));
        let store = MemoryRateStore::new();
        let service = service(fetcher.clone(), store.clone());

        let rate = service.get_single_rate(CurrencyPair::EurEth).await.unwrap();

        assert!((rate - 0.000432).abs() < 1e-12);
        assert_eq!(fetcher.calls(), 1);
        assert!(store.is_empty().await);

        service.get_single_rate(CurrencyPair::EurEth).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_get_single_rate_not_found() {
        let fetcher = Arc::new(ScriptedFetcher::prices(&[
            ("EURUSDT", 1.08),
            ("BTCUSDT", 60000.0),
        ]));
        let service = service(fetcher, MemoryRateStore::new());

        let err = service
            .get_single_rate(CurrencyPair::EurLtc)
            .await
            .unwrap_err();
        assert!(matches!(err, RatesError::NotFound(_)));
        assert!(service.current_rate(CurrencyPair::EurLtc).await.is_none());
        assert!(service.current_rate(CurrencyPair::EurBtc).await.is_some());
    }

    #[tokio::test]
    async fn test_last_24_hours_window() {
        let store = MemoryRateStore::new();
        store
            .save_all(&[
                RateRecord::new(CurrencyPair::EurBtc, 0.00002, now() - Duration::hours(25)).unwrap(),
                RateRecord::new(CurrencyPair::EurBtc, 0.00003, now() - Duration::hours(1)).unwrap(),
                RateRecord::new(CurrencyPair::EurBtc, 0.00001, now() - Duration::hours(23)).unwrap(),
                RateRecord::new(CurrencyPair::EurEth, 0.0004, now() - Duration::hours(2)).unwrap(),
            ])
            .await
            .unwrap();
        let service = service(Arc::new(ScriptedFetcher::new(vec![])), store);

        let response = service.get_last_24_hours("EUR/BTC").await.unwrap();

        assert_eq!(response.pair, CurrencyPair::EurBtc);
        assert_eq!(response.count, 2);
        assert_eq!(response.data[0].timestamp, "2025-09-01 15:00:00");
        assert_eq!(response.data[1].timestamp, "2025-09-02 13:00:00");
    }

    #[tokio::test]
    async fn test_last_24_hours_rejects_unknown_pair() {
        let service = service(
            Arc::new(ScriptedFetcher::new(vec![])),
            MemoryRateStore::new(),
        );

        let err = service.get_last_24_hours("XYZ").await.unwrap_err();

        assert!(err.is_validation());
        assert!(err.to_string().contains("EUR/BTC, EUR/ETH, EUR/LTC"));
    }

    #[tokio::test]
    async fn test_rates_by_date_covers_whole_day() {
        let store = MemoryRateStore::new();
        let day_start = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
        store
            .save_all(&[
                RateRecord::new(CurrencyPair::EurLtc, 0.0166, day_start - Duration::seconds(1))
                    .unwrap(),
                RateRecord::new(CurrencyPair::EurLtc, 0.0167, day_start).unwrap(),
                RateRecord::new(
                    CurrencyPair::EurLtc,
                    0.0168,
                    day_start + Duration::days(1) - Duration::milliseconds(500),
                )
                .unwrap(),
                RateRecord::new(CurrencyPair::EurLtc, 0.0169, day_start + Duration::days(1))
                    .unwrap(),
            ])
            .await
            .unwrap();
        let service = service(Arc::new(ScriptedFetcher::new(vec![])), store);

        let response = service
            .get_rates_by_date("EUR/LTC", "2025-09-01")
            .await
            .unwrap();

        assert_eq!(response.count, 2);
        assert_eq!(response.data[0].timestamp, "2025-09-01 00:00:00");
        assert_eq!(response.data[1].timestamp, "2025-09-01 23:59:59");
    }

    #[tokio::test]
    async fn test_rates_by_date_rejects_bad_input() {
        let service = service(
            Arc::new(ScriptedFetcher::new(vec![])),
            MemoryRateStore::new(),
        );

        for date in ["2025-13-40", "02/09/2025", "yesterday", ""] {
            let err = service
                .get_rates_by_date("EUR/BTC", date)
                .await
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                "Validation error: Invalid date format. Use YYYY-MM-DD"
            );
        }

        let err = service
            .get_rates_by_date("EUR/XRP", "2025-09-01")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid pair 'EUR/XRP'"));
    }

    #[tokio::test]
    async fn test_cleanup_respects_retention_boundary() {
        let store = MemoryRateStore::new();
        store
            .save_all(&[
                RateRecord::new(
                    CurrencyPair::EurBtc,
                    0.00002,
                    now() - Duration::days(30) - Duration::seconds(1),
                )
                .unwrap(),
                RateRecord::new(CurrencyPair::EurEth, 0.0004, now() - Duration::days(29)).unwrap(),
                RateRecord::new(CurrencyPair::EurLtc, 0.016, now()).unwrap(),
            ])
            .await
            .unwrap();
        let service = service(Arc::new(ScriptedFetcher::new(vec![])), store.clone());

        assert_eq!(service.cleanup_old_data().await.unwrap(), 1);
        assert_eq!(store.len().await, 2);
        let eth = store
            .find_in_range(CurrencyPair::EurEth, now() - Duration::days(31), now())
            .await
            .unwrap();
        assert_eq!(eth.len(), 1);
    }

    #[tokio::test]
    async fn test_custom_retention() {
        let store = MemoryRateStore::new();
        store
            .save(&RateRecord::new(CurrencyPair::EurBtc, 0.00002, now() - Duration::days(8)).unwrap())
            .await
            .unwrap();
        let service = service(Arc::new(ScriptedFetcher::new(vec![])), store.clone())
            .with_retention(Duration::days(7));

        assert_eq!(service.cleanup_old_data().await.unwrap(), 1);
        assert!(store.is_empty().await);
    }
}
