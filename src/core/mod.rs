//! Core business logic abstractions

pub mod calculator;
pub mod clock;
pub mod config;
pub mod error;
pub mod log;
pub mod pair;
pub mod price;
pub mod rate;
pub mod response;
pub mod service;
pub mod store;

// Re-export main types for cleaner imports
pub use error::{RatesError, RetryClass};
pub use pair::{BASE_CURRENCY_SYMBOL, CurrencyPair};
pub use price::{PriceFetcher, PriceSnapshot, RateLimit};
pub use rate::RateRecord;
pub use response::{ErrorBody, QueryKind, RatePoint, RatesResponse};
pub use service::RateService;
pub use store::RateStore;
