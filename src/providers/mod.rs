pub mod binance;
pub mod retry;

pub use binance::BinanceClient;
pub use retry::{RetryExecutor, RetryPolicy};
