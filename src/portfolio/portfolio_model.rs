use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Chart range selectable by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1W")]
    Week,
    #[serde(rename = "1M")]
    Month,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    Year,
    #[serde(rename = "5Y")]
    FiveYears,
    #[serde(rename = "All")]
    All,
}

/// Calendar granularity of one synthesized series bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketSize {
    Day,
    Week,
    Month,
    Year,
}

impl TimeRange {
    /// Bucket granularity used for this range: daily for a week, weekly for
    /// a month, monthly for 6M/1Y, yearly for 5Y/all-time.
    pub fn bucket_size(self) -> BucketSize {
        match self {
            TimeRange::Week => BucketSize::Day,
            TimeRange::Month => BucketSize::Week,
            TimeRange::SixMonths | TimeRange::Year => BucketSize::Month,
            TimeRange::FiveYears | TimeRange::All => BucketSize::Year,
        }
    }

    /// Window start for fixed ranges; `None` for all-time, whose origin is
    /// discovered from the earliest acquisition instead.
    pub fn window_start_ms(self, now_ms: i64) -> Option<i64> {
        let now = DateTime::<Utc>::from_timestamp_millis(now_ms)?;
        let start = match self {
            TimeRange::Week => now - Duration::days(7),
            TimeRange::Month => now.checked_sub_months(Months::new(1))?,
            TimeRange::SixMonths => now.checked_sub_months(Months::new(6))?,
            TimeRange::Year => now.checked_sub_months(Months::new(12))?,
            TimeRange::FiveYears => now.checked_sub_months(Months::new(60))?,
            TimeRange::All => return None,
        };
        Some(start.timestamp_millis())
    }
}

/// Aggregate portfolio snapshot; recomputed on every request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioMetrics {
    /// Satoshis.
    pub total_balance: i64,
    /// Local currency.
    pub current_value: Decimal,
    /// Local currency.
    pub cost_basis: Decimal,
    /// Local currency per whole BTC.
    pub average_buy_price: Decimal,
    /// Local currency.
    pub unrealized_return: Decimal,
    pub unrealized_return_percent: Decimal,
    /// Satoshis.
    pub fees_spent: i64,
    /// Local currency.
    pub fees_spent_value: Decimal,
    /// Percent of current value.
    pub fees_percent: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnrealizedReturn {
    pub amount: Decimal,
    pub percent: Decimal,
}

/// Fee load of the portfolio, with the "under half a percent of value"
/// verdict the fee display renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeesBreakdown {
    pub total_fees_sats: i64,
    pub total_fees_value: Decimal,
    pub fees_percent: Decimal,
    pub is_good: bool,
}

/// One synthesized point of the holdings-accumulated-so-far curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataPoint {
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    /// Milliseconds since epoch.
    pub timestamp: i64,
    /// Satoshis.
    pub btc_amount: i64,
    pub local_currency_value: Decimal,
}
