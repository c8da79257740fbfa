use chrono::NaiveDate;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum PriceError {
    /// No cached, fetched, or nearest-neighbor price could be resolved.
    /// Callers must treat this as a hard failure, never substitute zero.
    #[error("No price available for {date} in {currency}")]
    Unavailable { date: NaiveDate, currency: String },

    #[error("Price API rate limited")]
    RateLimited,

    /// Expected "no access" outcome on the free API tier; recovered via
    /// cache fallback like any other remote failure.
    #[error("Price API unauthorized")]
    Unauthorized,

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid price data: {0}")]
    InvalidData(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl PriceError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, PriceError::RateLimited)
    }
}
