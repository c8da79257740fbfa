use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::price_constants::{PRICE_CACHE_KEY_PREFIX, PRICE_CACHE_VERSION};

/// One cached historical price, keyed by `(date, currency)`.
///
/// Stored as JSON in the key-value collaborator. A stored price must be a
/// strictly positive decimal; anything else is corrupt and gets purged on
/// read rather than trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPrice {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Currency units per whole bitcoin.
    pub price: Decimal,
    /// When this entry was written, ms since epoch.
    pub last_updated: i64,
    pub is_estimated: bool,
}

fn default_version() -> u32 {
    PRICE_CACHE_VERSION
}

impl CachedPrice {
    pub fn new(price: Decimal, last_updated: i64, is_estimated: bool) -> Self {
        CachedPrice {
            version: PRICE_CACHE_VERSION,
            price,
            last_updated,
            is_estimated,
        }
    }

    /// Structural validity of a stored entry.
    pub fn is_valid(&self) -> bool {
        self.version == PRICE_CACHE_VERSION && self.price > Decimal::ZERO
    }

    /// Deserialization boundary: malformed payloads and structurally invalid
    /// entries both come back as `None`, so callers treat them uniformly as
    /// corrupt.
    pub fn from_json(raw: &str) -> Option<CachedPrice> {
        let parsed: CachedPrice = serde_json::from_str(raw).ok()?;
        if parsed.is_valid() {
            Some(parsed)
        } else {
            None
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Cache key for a date/currency pair: `historical_price_YYYY-MM-DD_CCY`.
pub fn cache_key(date: NaiveDate, currency: &str) -> String {
    format!(
        "{}{}_{}",
        PRICE_CACHE_KEY_PREFIX,
        date.format("%Y-%m-%d"),
        currency.to_uppercase()
    )
}

/// Suffix shared by all keys of one currency, used to scope prefix scans.
pub fn currency_suffix(currency: &str) -> String {
    format!("_{}", currency.to_uppercase())
}

/// Extracts the date back out of a cache key for the given currency.
pub fn date_from_key(key: &str, currency: &str) -> Option<NaiveDate> {
    let suffix = currency_suffix(currency);
    let date_part = key
        .strip_prefix(PRICE_CACHE_KEY_PREFIX)?
        .strip_suffix(&suffix)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
