//! Shapes returned by the rate queries

use crate::core::error::RatesError;
use crate::core::pair::CurrencyPair;
use crate::core::rate::RateRecord;
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT_HINT: &str = "YYYY-MM-DD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    pub timestamp: String,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatesResponse {
    pub pair: CurrencyPair,
    pub count: usize,
    pub data: Vec<RatePoint>,
}

impl RatesResponse {
    pub fn from_records(pair: CurrencyPair, records: &[RateRecord]) -> Self {
        let data: Vec<RatePoint> = records
            .iter()
            .map(|record| RatePoint {
                timestamp: record.created_at().format(TIMESTAMP_FORMAT).to_string(),
                rate: record.rate_f64(),
            })
            .collect();

        Self {
            pair,
            count: data.len(),
            data,
        }
    }
}

/// Which query produced an error; the day query also advertises the date format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Last24Hours,
    Day,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_pairs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
}

impl ErrorBody {
    /// Maps a query failure to what the caller may see. Validation problems are
    /// explained, anything else is reported as an opaque internal error.
    pub fn for_query(error: &RatesError, kind: QueryKind) -> Self {
        if !error.is_validation() {
            return Self {
                error: "Internal server error".to_string(),
                supported_pairs: None,
                date_format: None,
            };
        }

        let message = match error {
            RatesError::Validation(message) => message.clone(),
            other => other.to_string(),
        };
        Self {
            error: message,
            supported_pairs: Some(
                CurrencyPair::supported()
                    .into_iter()
                    .map(String::from)
                    .collect(),
            ),
            date_format: (kind == QueryKind::Day).then(|| DATE_FORMAT_HINT.to_string()),
        }
    }

    /// HTTP-style status for the body: 400 for bad input, 500 otherwise.
    pub fn status(&self) -> u16 {
        if self.supported_pairs.is_some() { 400 } else { 500 }
    }
}
