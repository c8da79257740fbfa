/// Key prefix for cached historical prices in the key-value store.
/// Full key format: `historical_price_YYYY-MM-DD_CCY`.
pub const PRICE_CACHE_KEY_PREFIX: &str = "historical_price_";

/// Current cache payload schema version.
pub const PRICE_CACHE_VERSION: u32 = 1;

/// Minimum spacing between remote price calls (free-tier pacing).
pub const RATE_LIMIT_DELAY_MS: i64 = 1_000;

/// How long to avoid the remote API after a 429 response.
pub const RATE_LIMIT_COOLDOWN_MS: i64 = 60_000;

/// Consecutive 429s within one batch before the rest of the batch skips the
/// remote API entirely.
pub const MAX_CONSECUTIVE_RATE_LIMIT_ERRORS: u32 = 2;

/// Nearest-neighbor cache lookups only consider entries within this many
/// calendar days of the requested date.
pub const NEAREST_CACHE_WINDOW_DAYS: i64 = 30;

pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
