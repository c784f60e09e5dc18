//! EUR conversion arithmetic

use crate::core::error::{RatesError, Result};
use crate::core::pair::{BASE_CURRENCY_SYMBOL, CurrencyPair};
use crate::core::price::PriceSnapshot;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Converts raw USDT prices into the amount of each pair's crypto asset one
/// euro buys: `EURUSDT / <CRYPTO>USDT`.
///
/// Pairs whose quote price is missing or not positive are skipped. Fails when
/// the base price is unusable or no pair could be computed at all.
pub fn calculate_eur_rates(prices: &PriceSnapshot) -> Result<BTreeMap<CurrencyPair, f64>> {
    let base_price = match prices.get(BASE_CURRENCY_SYMBOL) {
        Some(price) if *price > 0.0 => *price,
        Some(price) => {
            return Err(RatesError::Validation(format!(
                "Invalid base currency rate ({BASE_CURRENCY_SYMBOL}) for conversion: {price}"
            )));
        }
        None => {
            return Err(RatesError::Validation(format!(
                "Base currency price ({BASE_CURRENCY_SYMBOL}) not available for conversion"
            )));
        }
    };

    let mut rates = BTreeMap::new();
    for pair in CurrencyPair::ALL {
        let symbol = pair.quote_symbol();
        let Some(&quote_price) = prices.get(&symbol) else {
            warn!(pair = %pair, symbol = %symbol, "Missing price for calculation");
            continue;
        };
        if !quote_price.is_finite() || quote_price <= 0.0 {
            warn!(pair = %pair, symbol = %symbol, quote_price, "Invalid quote price, skipping pair");
            continue;
        }

        let rate = base_price / quote_price;
        debug!(pair = %pair, base_price, quote_price, rate, "Calculated rate for pair");
        rates.insert(pair, rate);
    }

    if rates.is_empty() {
        return Err(RatesError::Validation(
            "No valid EUR exchange rates could be calculated".to_string(),
        ));
    }

    info!(pairs_calculated = rates.len(), "EUR rate calculation completed");
    Ok(rates)
}
