use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use super::portfolio_model::BucketSize;

/// Calendar day (UTC) containing a millisecond timestamp.
pub(crate) fn date_of_ms(ms: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

/// Millisecond timestamp of UTC midnight on a calendar day.
pub(crate) fn ms_of_date(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc()
        .timestamp_millis()
}

/// First day of the period containing `date`. Weeks start on Monday (ISO).
pub(crate) fn period_start(size: BucketSize, date: NaiveDate) -> NaiveDate {
    match size {
        BucketSize::Day => date,
        BucketSize::Week => {
            date - Duration::days(date.weekday().num_days_from_monday() as i64)
        }
        BucketSize::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
            .expect("first of month is a valid date"),
        BucketSize::Year => {
            NaiveDate::from_ymd_opt(date.year(), 1, 1).expect("jan 1 is a valid date")
        }
    }
}

fn next_period(size: BucketSize, start: NaiveDate) -> NaiveDate {
    match size {
        BucketSize::Day => start + Duration::days(1),
        BucketSize::Week => start + Duration::days(7),
        BucketSize::Month => {
            let (year, month) = if start.month() == 12 {
                (start.year() + 1, 1)
            } else {
                (start.year(), start.month() + 1)
            };
            NaiveDate::from_ymd_opt(year, month, 1).expect("first of month is a valid date")
        }
        BucketSize::Year => {
            NaiveDate::from_ymd_opt(start.year() + 1, 1, 1).expect("jan 1 is a valid date")
        }
    }
}

/// Period-start timestamps (ms, UTC midnight) covering `[start_ms, end_ms]`,
/// aligned to calendar boundaries. The bucket containing `end_ms` is always
/// included; the first bucket may start before `start_ms` due to alignment.
pub(crate) fn generate(size: BucketSize, start_ms: i64, end_ms: i64) -> Vec<i64> {
    let mut buckets = Vec::new();
    if start_ms > end_ms {
        return buckets;
    }

    let end_day = date_of_ms(end_ms);
    let mut current = period_start(size, date_of_ms(start_ms));
    while current <= end_day {
        buckets.push(ms_of_date(current));
        current = next_period(size, current);
    }
    buckets
}

/// Whether two timestamps fall in the same calendar bucket. This single
/// predicate backs both the "use current balance for the last bucket" check
/// and the "skip appending a today point" check, so the two can never
/// diverge.
pub(crate) fn same_bucket(size: BucketSize, a_ms: i64, b_ms: i64) -> bool {
    period_start(size, date_of_ms(a_ms)) == period_start(size, date_of_ms(b_ms))
}
