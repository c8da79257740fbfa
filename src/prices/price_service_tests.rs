use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::clock::ManualClock;
use crate::prices::price_model::cache_key;
use crate::prices::{CachedPrice, PriceError, PriceProvider, PriceService, RATE_LIMIT_COOLDOWN_MS};
use crate::store::{KeyValueStore, MemoryKeyValueStore};

const NOW_MS: i64 = 1_700_000_000_000;

/// Scripted provider outcomes, consumed in order.
enum Scripted {
    Price(Decimal),
    RateLimited,
    Unauthorized,
    Fail,
}

struct MockProvider {
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicUsize,
}

impl MockProvider {
    fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(MockProvider {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PriceProvider for MockProvider {
    fn name(&self) -> &'static str {
        "MOCK"
    }

    async fn fetch_price(&self, date: NaiveDate, _currency: &str) -> Result<Decimal, PriceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Price(p)) => Ok(p),
            Some(Scripted::RateLimited) => Err(PriceError::RateLimited),
            Some(Scripted::Unauthorized) => Err(PriceError::Unauthorized),
            Some(Scripted::Fail) | None => {
                Err(PriceError::Provider(format!("no scripted response for {date}")))
            }
        }
    }
}

struct Fixture {
    store: Arc<MemoryKeyValueStore>,
    provider: Arc<MockProvider>,
    clock: Arc<ManualClock>,
    service: PriceService,
}

fn fixture(script: Vec<Scripted>) -> Fixture {
    let store = Arc::new(MemoryKeyValueStore::new());
    let provider = MockProvider::new(script);
    let clock = ManualClock::new(NOW_MS);
    let service = PriceService::new(store.clone(), provider.clone(), clock.clone());
    Fixture {
        store,
        provider,
        clock,
        service,
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn seed(store: &MemoryKeyValueStore, date: NaiveDate, currency: &str, price: Decimal) {
    let entry = CachedPrice::new(price, 0, false);
    store
        .set(&cache_key(date, currency), &entry.to_json().unwrap())
        .unwrap();
}

#[tokio::test]
async fn second_resolve_for_same_key_never_calls_remote_again() {
    let f = fixture(vec![Scripted::Price(dec!(40000))]);

    let first = f.service.resolve(day(10), "USD").await.unwrap();
    let second = f.service.resolve(day(10), "USD").await.unwrap();

    assert_eq!(first, dec!(40000));
    assert_eq!(second, dec!(40000));
    assert_eq!(f.provider.calls(), 1);
}

#[tokio::test]
async fn cooldown_blocks_remote_calls_for_sixty_seconds() {
    let f = fixture(vec![Scripted::RateLimited, Scripted::Price(dec!(41000))]);
    // A neighbor within the 30-day window backs the fallback path.
    seed(&f.store, day(9), "USD", dec!(39500));

    let price = f.service.resolve(day(10), "USD").await.unwrap();
    assert_eq!(price, dec!(39500));
    assert_eq!(f.provider.calls(), 1);

    // Everything inside the window resolves from cache only.
    f.clock.advance_ms(RATE_LIMIT_COOLDOWN_MS - 1_000);
    let price = f.service.resolve(day(11), "USD").await.unwrap();
    assert_eq!(price, dec!(39500));
    assert_eq!(f.provider.calls(), 1);

    // Once the window elapses, the remote API is tried again.
    f.clock.advance_ms(2_000);
    let price = f.service.resolve(day(11), "USD").await.unwrap();
    assert_eq!(price, dec!(41000));
    assert_eq!(f.provider.calls(), 2);
}

#[tokio::test]
async fn corrupt_entry_is_deleted_and_replaced_on_successful_fetch() {
    let f = fixture(vec![Scripted::Price(dec!(42000))]);
    let key = cache_key(day(10), "USD");
    f.store.set(&key, "{ not json").unwrap();

    let price = f.service.resolve(day(10), "USD").await.unwrap();
    assert_eq!(price, dec!(42000));
    assert_eq!(f.provider.calls(), 1);

    // The corrupt payload was replaced with a fresh, valid one.
    let raw = f.store.get(&key).unwrap().unwrap();
    let entry = CachedPrice::from_json(&raw).unwrap();
    assert_eq!(entry.price, dec!(42000));
}

#[tokio::test]
async fn corrupt_entry_is_deleted_even_when_fetch_also_fails() {
    let f = fixture(vec![Scripted::Fail]);
    let key = cache_key(day(10), "USD");
    f.store.set(&key, r#"{"price":-1,"lastUpdated":0,"isEstimated":false}"#).unwrap();

    let result = f.service.resolve(day(10), "USD").await;
    assert!(matches!(result, Err(PriceError::Unavailable { .. })));
    assert_eq!(f.store.get(&key).unwrap(), None);
}

#[tokio::test]
async fn nearest_fallback_respects_thirty_day_window() {
    let far = fixture(vec![Scripted::Fail]);
    seed(
        &far.store,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        "USD",
        dec!(30000),
    );
    let result = far.service.resolve(day(10), "USD").await;
    assert!(matches!(result, Err(PriceError::Unavailable { .. })));

    let near = fixture(vec![Scripted::Fail]);
    seed(
        &near.store,
        NaiveDate::from_ymd_opt(2024, 2, 9).unwrap(), // exactly 30 days back
        "USD",
        dec!(30000),
    );
    let price = near.service.resolve(day(10), "USD").await.unwrap();
    assert_eq!(price, dec!(30000));
}

#[tokio::test]
async fn nearest_fallback_prefers_smaller_distance_and_same_currency() {
    let f = fixture(vec![Scripted::Fail]);
    seed(&f.store, day(15), "USD", dec!(45000)); // 5 days away
    seed(&f.store, day(8), "USD", dec!(38000)); // 2 days away
    seed(&f.store, day(10), "EUR", dec!(99000)); // exact date, wrong currency

    let price = f.service.resolve(day(10), "USD").await.unwrap();
    assert_eq!(price, dec!(38000));
}

#[tokio::test]
async fn batch_answers_cached_dates_without_remote_calls() {
    let f = fixture(vec![Scripted::Price(dec!(41000))]);
    seed(&f.store, day(1), "USD", dec!(40000));

    let prices = f
        .service
        .resolve_many(&[day(1), day(2)], "USD")
        .await
        .unwrap();

    assert_eq!(prices.get(&day(1)), Some(&dec!(40000)));
    assert_eq!(prices.get(&day(2)), Some(&dec!(41000)));
    assert_eq!(f.provider.calls(), 1);
}

#[tokio::test]
async fn batch_stops_hitting_remote_after_two_consecutive_rate_limits() {
    // First date gets a real 429; the second attempt is swallowed by the
    // cooldown window, which still counts as a consecutive rate limit.
    let f = fixture(vec![Scripted::RateLimited]);
    seed(&f.store, day(5), "USD", dec!(39000));

    let prices = f
        .service
        .resolve_many(&[day(6), day(7), day(8), day(9)], "USD")
        .await
        .unwrap();

    assert_eq!(f.provider.calls(), 1);
    for d in [day(6), day(7), day(8), day(9)] {
        assert_eq!(prices.get(&d), Some(&dec!(39000)));
    }
}

#[tokio::test]
async fn batch_skips_remote_entirely_when_already_cooling_down() {
    let f = fixture(vec![Scripted::RateLimited]);
    seed(&f.store, day(5), "USD", dec!(39000));

    // Trip the cooldown first.
    let _ = f.service.resolve(day(6), "USD").await;
    assert_eq!(f.provider.calls(), 1);

    let prices = f
        .service
        .resolve_many(&[day(7), day(8)], "USD")
        .await
        .unwrap();

    assert_eq!(f.provider.calls(), 1);
    assert_eq!(prices.get(&day(7)), Some(&dec!(39000)));
    assert_eq!(prices.get(&day(8)), Some(&dec!(39000)));
}

#[tokio::test]
async fn unauthorized_is_recovered_from_cache_without_cooldown() {
    let f = fixture(vec![Scripted::Unauthorized, Scripted::Price(dec!(41000))]);
    seed(&f.store, day(9), "USD", dec!(39500));

    let price = f.service.resolve(day(10), "USD").await.unwrap();
    assert_eq!(price, dec!(39500));

    // No cooldown was started: the next miss goes remote again.
    f.clock.advance_ms(2_000);
    let price = f.service.resolve(day(11), "USD").await.unwrap();
    assert_eq!(price, dec!(41000));
    assert_eq!(f.provider.calls(), 2);
}

#[tokio::test]
async fn invalidate_is_scoped_by_currency() {
    let f = fixture(vec![]);
    seed(&f.store, day(1), "USD", dec!(1));
    seed(&f.store, day(2), "USD", dec!(2));
    seed(&f.store, day(1), "EUR", dec!(3));

    assert_eq!(f.service.invalidate("USD").unwrap(), 2);
    assert_eq!(f.store.get(&cache_key(day(1), "EUR")).unwrap().is_some(), true);

    assert_eq!(f.service.invalidate_all().unwrap(), 1);
    assert_eq!(f.store.get(&cache_key(day(1), "EUR")).unwrap(), None);
}

#[tokio::test]
async fn repair_removes_only_invalid_entries_and_reports_count() {
    let f = fixture(vec![]);
    seed(&f.store, day(1), "USD", dec!(40000));
    f.store
        .set(&cache_key(day(2), "USD"), "garbage")
        .unwrap();
    f.store
        .set(
            &cache_key(day(3), "USD"),
            r#"{"price":0,"lastUpdated":0,"isEstimated":false}"#,
        )
        .unwrap();

    assert_eq!(f.service.repair().unwrap(), 2);
    assert!(f.store.get(&cache_key(day(1), "USD")).unwrap().is_some());
    assert_eq!(f.store.get(&cache_key(day(2), "USD")).unwrap(), None);
    assert_eq!(f.store.get(&cache_key(day(3), "USD")).unwrap(), None);
}

#[tokio::test]
async fn resolve_fails_hard_when_no_strategy_produces_a_price() {
    let f = fixture(vec![Scripted::Fail]);
    let result = f.service.resolve(day(10), "USD").await;
    assert!(matches!(result, Err(PriceError::Unavailable { .. })));
}
