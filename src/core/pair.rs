//! Supported currency pairs and the exchange symbols derived from them

use crate::core::error::RatesError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

/// Symbol whose price is the numeraire for every conversion.
pub const BASE_CURRENCY_SYMBOL: &str = "EURUSDT";

const QUOTE_ASSET: &str = "USDT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum CurrencyPair {
    #[serde(rename = "EUR/BTC")]
    EurBtc,
    #[serde(rename = "EUR/ETH")]
    EurEth,
    #[serde(rename = "EUR/LTC")]
    EurLtc,
}

impl CurrencyPair {
    pub const ALL: [CurrencyPair; 3] = [
        CurrencyPair::EurBtc,
        CurrencyPair::EurEth,
        CurrencyPair::EurLtc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyPair::EurBtc => "EUR/BTC",
            CurrencyPair::EurEth => "EUR/ETH",
            CurrencyPair::EurLtc => "EUR/LTC",
        }
    }

    /// The crypto asset bought with one unit of the base currency.
    pub fn crypto_symbol(&self) -> &'static str {
        match self {
            CurrencyPair::EurBtc => "BTC",
            CurrencyPair::EurEth => "ETH",
            CurrencyPair::EurLtc => "LTC",
        }
    }

    /// Exchange ticker whose price is needed for this pair, e.g. `BTCUSDT`.
    pub fn quote_symbol(&self) -> String {
        format!("{}{}", self.crypto_symbol(), QUOTE_ASSET)
    }

    /// Name used for the pair's storage partition.
    pub fn storage_name(&self) -> &'static str {
        match self {
            CurrencyPair::EurBtc => "rates_eur_btc",
            CurrencyPair::EurEth => "rates_eur_eth",
            CurrencyPair::EurLtc => "rates_eur_ltc",
        }
    }

    pub fn supported() -> Vec<&'static str> {
        Self::ALL.iter().map(|p| p.as_str()).collect()
    }

    /// Every quote symbol plus the base currency symbol.
    pub fn required_symbols() -> BTreeSet<String> {
        let mut symbols: BTreeSet<String> = Self::ALL.iter().map(|p| p.quote_symbol()).collect();
        symbols.insert(BASE_CURRENCY_SYMBOL.to_string());
        symbols
    }

    pub fn is_base_currency(symbol: &str) -> bool {
        symbol == BASE_CURRENCY_SYMBOL
    }
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CurrencyPair {
    type Err = RatesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|pair| pair.as_str() == s)
            .ok_or_else(|| {
                RatesError::Validation(format!(
                    "Invalid pair '{}'. Supported pairs: {}",
                    s,
                    Self::supported().join(", ")
                ))
            })
    }
}
