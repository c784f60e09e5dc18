//! Error taxonomy for the rate pipeline.
//!
//! Every failure carries a [`RetryClass`] so the retry executor can decide
//! whether another attempt is worthwhile without knowing where the error
//! came from.

use thiserror::Error;

/// Whether an operation that failed with an error may be attempted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Terminal, abort immediately.
    Never,
    /// Transient, wait and try again.
    WithBackoff,
}

#[derive(Error, Debug)]
pub enum RatesError {
    /// Bad pair or date input, or no rate could be computed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport failure, including timeouts.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The exchange answered with a non-success status.
    #[error("HTTP error: {status} for {url}")]
    Status { status: u16, url: String },

    /// The exchange response was not well-formed or was empty.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<RatesError>,
    },

    #[error("An update cycle is already in progress")]
    UpdateInProgress,

    #[error("Storage error: {0}")]
    Storage(#[from] fjall::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RatesError {
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Status { status, .. } if (400..500).contains(status) => RetryClass::Never,
            // Network, 5xx and anything unexpected are treated as transient
            _ => RetryClass::WithBackoff,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, RatesError>;
