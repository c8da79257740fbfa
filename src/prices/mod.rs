mod price_constants;
mod price_errors;
mod price_model;
mod price_provider;
mod price_service;
mod rate_limiter;

#[cfg(test)]
mod price_service_tests;

pub use price_constants::*;
pub use price_errors::PriceError;
pub use price_model::{cache_key, CachedPrice};
pub use price_provider::{CoinGeckoProvider, PriceProvider};
pub use price_service::PriceService;
pub use rate_limiter::RateLimiter;
