use crate::core::error::{RatesError, Result};
use crate::core::pair::{BASE_CURRENCY_SYMBOL, CurrencyPair};
use crate::core::price::{PriceFetcher, PriceSnapshot, RateLimit};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

const PRICE_ENDPOINT: &str = "/api/v3/ticker/price";
const PING_ENDPOINT: &str = "/api/v3/ping";
const EXCHANGE_INFO_ENDPOINT: &str = "/api/v3/exchangeInfo";
const USER_AGENT: &str = "crypto-rates/1.0";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct BinanceClient {
    base_url: String,
    client: Client,
}

impl BinanceClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn exchange_info(&self) -> Result<ExchangeInfo> {
        let response = self
            .client
            .get(self.url(EXCHANGE_INFO_ENDPOINT))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| RatesError::Decode(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceValue {
    Number(f64),
    Text(String),
}

impl PriceValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            PriceValue::Number(n) => Some(*n),
            PriceValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: Option<String>,
    price: Option<PriceValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeInfo {
    rate_limits: Option<Vec<RateLimit>>,
}

/// Turns the ticker body into a snapshot. Unusable entries are skipped; only
/// a body that is not a non-empty JSON array is an error.
fn parse_price_response(body: &str, request_id: &str) -> Result<PriceSnapshot> {
    let items: Vec<serde_json::Value> = serde_json::from_str(body)
        .map_err(|e| RatesError::Decode(format!("Invalid response format: {e}")))?;
    if items.is_empty() {
        return Err(RatesError::Decode(
            "Empty price list in exchange response".to_string(),
        ));
    }

    let mut prices = PriceSnapshot::new();
    for item in items {
        let (symbol, raw_price) = match serde_json::from_value::<TickerPrice>(item.clone()) {
            Ok(TickerPrice {
                symbol: Some(symbol),
                price: Some(price),
            }) => (symbol, price),
            _ => {
                warn!(request_id, item = %item, "Invalid price data");
                continue;
            }
        };

        match raw_price.as_f64() {
            Some(price) if price.is_finite() && price > 0.0 => {
                if CurrencyPair::is_base_currency(&symbol) {
                    debug!(request_id, base_currency = %symbol, rate = price, "Base currency found");
                }
                prices.insert(symbol, price);
            }
            _ => {
                warn!(request_id, symbol = %symbol, price = ?raw_price, "Invalid price value");
            }
        }
    }

    if !prices.contains_key(BASE_CURRENCY_SYMBOL) {
        warn!(
            request_id,
            base_currency = BASE_CURRENCY_SYMBOL,
            found_symbols = ?prices.keys().collect::<Vec<_>>(),
            "Base currency not found in response"
        );
    }

    debug!(request_id, total_prices = prices.len(), "Parsed price response");
    Ok(prices)
}

#[async_trait]
impl PriceFetcher for BinanceClient {
    #[instrument(name = "BinancePriceFetch", skip(self, symbols), fields(symbols = symbols.len()))]
    async fn fetch_prices(&self, symbols: &BTreeSet<String>) -> Result<PriceSnapshot> {
        if symbols.is_empty() {
            return Err(RatesError::Validation(
                "At least one symbol is required".to_string(),
            ));
        }

        let request_id = format!("binance_{}", Uuid::new_v4().simple());
        let symbols_json = serde_json::to_string(symbols)?;
        let url = Url::parse_with_params(&self.url(PRICE_ENDPOINT), &[("symbols", &symbols_json)])
            .map_err(|e| RatesError::Validation(format!("Invalid exchange URL: {e}")))?;
        debug!(%request_id, %url, "Requesting prices");

        let response = self
            .client
            .get(url.clone())
            .header("X-Request-ID", &request_id)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%request_id, status = status.as_u16(), "Exchange returned an error status");
            return Err(RatesError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        parse_price_response(&body, &request_id).inspect_err(|e| {
            error!(%request_id, error = %e, "Failed to decode price response");
        })
    }

    async fn health_check(&self) -> bool {
        let result = self
            .client
            .get(self.url(PING_ENDPOINT))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) => {
                let healthy = response.status() == reqwest::StatusCode::OK;
                debug!(status = response.status().as_u16(), healthy, "Health check completed");
                healthy
            }
            Err(e) => {
                error!(error = %e, "Health check failed");
                false
            }
        }
    }

    async fn rate_limits(&self) -> Option<Vec<RateLimit>> {
        match self.exchange_info().await {
            Ok(info) => info.rate_limits,
            Err(e) => {
                warn!(error = %e, "Failed to get rate limit info");
                None
            }
        }
    }
}
