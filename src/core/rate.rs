use crate::core::error::{RatesError, Result};
use crate::core::pair::CurrencyPair;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fractional digits kept for a stored rate.
pub const RATE_SCALE: u32 = 8;

/// A computed rate as persisted. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    id: Uuid,
    pair: CurrencyPair,
    rate: Decimal,
    created_at: DateTime<Utc>,
}

impl RateRecord {
    /// Rounds `rate` to [`RATE_SCALE`] digits; fails unless the result is positive.
    pub fn new(pair: CurrencyPair, rate: f64, created_at: DateTime<Utc>) -> Result<Self> {
        let rate = Decimal::from_f64(rate)
            .map(|r| {
                let mut r = r.round_dp(RATE_SCALE);
                r.rescale(RATE_SCALE);
                r
            })
            .filter(|r| r.is_sign_positive() && !r.is_zero())
            .ok_or_else(|| {
                RatesError::Validation(format!("Rate for {pair} is not a positive number: {rate}"))
            })?;

        Ok(Self {
            id: Uuid::new_v4(),
            pair,
            rate,
            created_at,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pair(&self) -> CurrencyPair {
        self.pair
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn rate_f64(&self) -> f64 {
        self.rate.to_f64().unwrap_or_default()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_rate_is_rounded_to_eight_digits() {
        let record = RateRecord::new(CurrencyPair::EurLtc, 1.08 / 65.0, Utc::now()).unwrap();
        assert_eq!(record.rate(), Decimal::from_str("0.01661538").unwrap());
        assert_eq!(record.rate().scale(), 8);

        let record = RateRecord::new(CurrencyPair::EurBtc, 0.5, Utc::now()).unwrap();
        assert_eq!(record.rate().to_string(), "0.50000000");
    }

    #[test]
    fn test_non_positive_rates_are_rejected() {
        for rate in [0.0, -0.5, f64::NAN, 0.000000001] {
            let result = RateRecord::new(CurrencyPair::EurBtc, rate, Utc::now());
            assert!(result.is_err(), "rate {rate} should be rejected");
        }
    }

    #[test]
    fn test_records_get_distinct_ids() {
        let now = Utc::now();
        let a = RateRecord::new(CurrencyPair::EurBtc, 0.000018, now).unwrap();
        let b = RateRecord::new(CurrencyPair::EurBtc, 0.000018, now).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
