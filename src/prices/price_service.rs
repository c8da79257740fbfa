use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, info, warn};
use rust_decimal::Decimal;

use crate::clock::Clock;
use crate::store::KeyValueStore;

use super::price_constants::{
    MAX_CONSECUTIVE_RATE_LIMIT_ERRORS, NEAREST_CACHE_WINDOW_DAYS, PRICE_CACHE_KEY_PREFIX,
};
use super::price_errors::PriceError;
use super::price_model::{cache_key, currency_suffix, date_from_key, CachedPrice};
use super::price_provider::PriceProvider;
use super::rate_limiter::RateLimiter;

/// Ordered resolution strategies for a single `(date, currency)` lookup.
/// Evaluated strictly in this order; the first hit wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    ExactCache,
    Remote,
    NearestCache,
}

const RESOLUTION_ORDER: [Resolution; 3] = [
    Resolution::ExactCache,
    Resolution::Remote,
    Resolution::NearestCache,
];

/// Resolves historical Bitcoin prices through a persistent cache, a
/// rate-limited remote endpoint, and a nearest-neighbor cache fallback.
///
/// Corrupt cache entries are deleted as a side effect of reading them and
/// treated as misses. Remote calls are strictly sequential; overlapping
/// `resolve`/`resolve_many` callers are expected to serialize themselves
/// (e.g. behind a single in-flight refresh guard).
pub struct PriceService {
    store: Arc<dyn KeyValueStore>,
    provider: Arc<dyn PriceProvider>,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
}

impl PriceService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn PriceProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        PriceService {
            store,
            provider,
            limiter: RateLimiter::new(clock.clone()),
            clock,
        }
    }

    /// Resolves a positive price for `date`, or fails with
    /// `PriceError::Unavailable` once every strategy is exhausted.
    pub async fn resolve(&self, date: NaiveDate, currency: &str) -> Result<Decimal, PriceError> {
        for strategy in RESOLUTION_ORDER {
            let resolved = match strategy {
                Resolution::ExactCache => self.exact_cached(date, currency),
                Resolution::Remote => match self.fetch_remote(date, currency).await {
                    Ok(price) => Some(price),
                    Err(e) => {
                        self.log_remote_failure(date, currency, &e);
                        None
                    }
                },
                Resolution::NearestCache => self.nearest_cached(date, currency),
            };
            if let Some(price) = resolved {
                return Ok(price);
            }
        }
        Err(PriceError::Unavailable {
            date,
            currency: currency.to_string(),
        })
    }

    /// Batched resolution. Dates already cached are answered immediately;
    /// the rest are fetched one at a time under the rate limiter, falling
    /// back to the nearest cached entry per date on failure. Unresolvable
    /// dates are omitted from the returned map rather than erroring.
    pub async fn resolve_many(
        &self,
        dates: &[NaiveDate],
        currency: &str,
    ) -> Result<HashMap<NaiveDate, Decimal>, PriceError> {
        let mut results: HashMap<NaiveDate, Decimal> = HashMap::new();
        let mut to_fetch: Vec<NaiveDate> = Vec::new();

        for &date in dates {
            if results.contains_key(&date) || to_fetch.contains(&date) {
                continue;
            }
            match self.exact_cached(date, currency) {
                Some(price) => {
                    results.insert(date, price);
                }
                None => to_fetch.push(date),
            }
        }

        debug!(
            "Price batch: {} cached, {} to fetch",
            results.len(),
            to_fetch.len()
        );

        // A batch that starts inside a cooldown window never touches the
        // remote API at all.
        if self.limiter.in_cooldown() {
            debug!("Rate limit cooldown active, batch resolves from cache only");
            for date in to_fetch {
                if let Some(price) = self.nearest_cached(date, currency) {
                    results.insert(date, price);
                }
            }
            return Ok(results);
        }

        let mut consecutive_rate_limits: u32 = 0;
        for date in to_fetch {
            // After repeated 429s, stop hammering the endpoint for the rest
            // of the batch.
            if consecutive_rate_limits >= MAX_CONSECUTIVE_RATE_LIMIT_ERRORS {
                if let Some(price) = self.nearest_cached(date, currency) {
                    results.insert(date, price);
                }
                continue;
            }

            match self.fetch_remote(date, currency).await {
                Ok(price) => {
                    consecutive_rate_limits = 0;
                    results.insert(date, price);
                }
                Err(e) => {
                    if e.is_rate_limit() {
                        consecutive_rate_limits += 1;
                    } else if !matches!(e, PriceError::Unauthorized) {
                        consecutive_rate_limits = 0;
                    }
                    self.log_remote_failure(date, currency, &e);
                    if let Some(price) = self.nearest_cached(date, currency) {
                        results.insert(date, price);
                    }
                }
            }
        }

        Ok(results)
    }

    /// Drops every cached entry for one currency. Returns the count removed.
    pub fn invalidate(&self, currency: &str) -> Result<usize, PriceError> {
        let suffix = currency_suffix(currency);
        let keys: Vec<String> = self
            .store
            .keys_with_prefix(PRICE_CACHE_KEY_PREFIX)?
            .into_iter()
            .filter(|k| k.ends_with(&suffix))
            .collect();
        self.store.delete_many(&keys)?;
        info!("Cleared {} cached price(s) for {}", keys.len(), currency);
        Ok(keys.len())
    }

    /// Drops every cached price entry. Returns the count removed.
    pub fn invalidate_all(&self) -> Result<usize, PriceError> {
        let keys = self.store.keys_with_prefix(PRICE_CACHE_KEY_PREFIX)?;
        self.store.delete_many(&keys)?;
        info!("Cleared all {} cached price(s)", keys.len());
        Ok(keys.len())
    }

    /// Full cache scan deleting every structurally invalid entry. Meant to
    /// run opportunistically, not on the hot path. Returns the count removed.
    pub fn repair(&self) -> Result<usize, PriceError> {
        let keys = self.store.keys_with_prefix(PRICE_CACHE_KEY_PREFIX)?;
        let mut corrupt: Vec<String> = Vec::new();

        for key in keys {
            match self.store.get(&key)? {
                Some(raw) if CachedPrice::from_json(&raw).is_some() => {}
                Some(_) | None => corrupt.push(key),
            }
        }

        if corrupt.is_empty() {
            debug!("Price cache validation passed, nothing to repair");
        } else {
            self.store.delete_many(&corrupt)?;
            warn!(
                "Repaired price cache, removed {} corrupt entries",
                corrupt.len()
            );
        }
        Ok(corrupt.len())
    }

    /// Exact-date cache lookup with read-repair: a malformed or invalid
    /// stored entry is deleted and reported as a miss.
    fn exact_cached(&self, date: NaiveDate, currency: &str) -> Option<Decimal> {
        self.read_entry(&cache_key(date, currency))
            .map(|entry| entry.price)
    }

    /// Nearest cached entry for the same currency within the 30-day window,
    /// smaller date distance winning.
    fn nearest_cached(&self, date: NaiveDate, currency: &str) -> Option<Decimal> {
        let keys = match self.store.keys_with_prefix(PRICE_CACHE_KEY_PREFIX) {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Price cache scan failed: {}", e);
                return None;
            }
        };

        let suffix = currency_suffix(currency);
        let mut nearest: Option<(i64, Decimal)> = None;
        for key in keys {
            if !key.ends_with(&suffix) {
                continue;
            }
            let Some(cached_date) = date_from_key(&key, currency) else {
                continue;
            };
            let distance = (cached_date - date).num_days().abs();
            if distance > NEAREST_CACHE_WINDOW_DAYS {
                continue;
            }
            if nearest.map_or(true, |(best, _)| distance < best) {
                if let Some(entry) = self.read_entry(&key) {
                    nearest = Some((distance, entry.price));
                }
            }
        }

        if let Some((distance, price)) = nearest {
            debug!(
                "Using nearest cached {} price for {} ({} day(s) away)",
                currency, date, distance
            );
            return Some(price);
        }
        None
    }

    /// Remote fetch honoring the cooldown window and the one-call-per-second
    /// pace. A success is persisted and clears the cooldown; a fresh 429
    /// (re)starts it.
    async fn fetch_remote(&self, date: NaiveDate, currency: &str) -> Result<Decimal, PriceError> {
        if self.limiter.in_cooldown() {
            return Err(PriceError::RateLimited);
        }

        self.limiter.pace().await;
        match self.provider.fetch_price(date, currency).await {
            Ok(price) => {
                self.limiter.note_success();
                self.persist(date, currency, price);
                Ok(price)
            }
            Err(PriceError::RateLimited) => {
                self.limiter.note_rate_limited();
                Err(PriceError::RateLimited)
            }
            Err(e) => Err(e),
        }
    }

    fn persist(&self, date: NaiveDate, currency: &str, price: Decimal) {
        let entry = CachedPrice::new(price, self.clock.now_ms(), false);
        let payload = match entry.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize price cache entry: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(&cache_key(date, currency), &payload) {
            // Cache writes are best effort; the resolved price is still good.
            warn!("Failed to cache price for {}: {}", date, e);
        }
    }

    fn read_entry(&self, key: &str) -> Option<CachedPrice> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Price cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match CachedPrice::from_json(&raw) {
            Some(entry) => Some(entry),
            None => {
                warn!("Removing corrupt price cache entry {}", key);
                if let Err(e) = self.store.delete(key) {
                    warn!("Failed to remove corrupt entry {}: {}", key, e);
                }
                None
            }
        }
    }

    fn log_remote_failure(&self, date: NaiveDate, currency: &str, error: &PriceError) {
        match error {
            // Expected outcomes on the free tier; not anomalies.
            PriceError::Unauthorized => {
                debug!("Price API unauthorized for {} {}, using cache", date, currency)
            }
            PriceError::RateLimited => {
                debug!("Price API rate limited for {} {}, using cache", date, currency)
            }
            e => warn!("Price fetch failed for {} {}: {}", date, currency, e),
        }
    }
}
