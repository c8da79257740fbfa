use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::acquisition::{AcquisitionTracker, TrackedOutput};
use crate::clock::Clock;
use crate::constants::sats_to_btc;
use crate::errors::Result;
use crate::prices::PriceService;
use crate::wallets::{ChainType, Wallet};

use super::buckets;
use super::portfolio_model::{
    ChartDataPoint, FeesBreakdown, PortfolioMetrics, TimeRange, UnrealizedReturn,
};

/// Read-only aggregate metrics over a set of wallets.
///
/// Every operation recomputes from current wallet state; nothing here is
/// cached or persisted. Off-chain wallets are excluded from all accounting.
pub struct PortfolioService {
    prices: Arc<PriceService>,
    tracker: Arc<AcquisitionTracker>,
    clock: Arc<dyn Clock>,
}

impl PortfolioService {
    pub fn new(
        prices: Arc<PriceService>,
        tracker: Arc<AcquisitionTracker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        PortfolioService {
            prices,
            tracker,
            clock,
        }
    }

    /// Sum of reported balances across on-chain wallets, in satoshis.
    pub fn total_balance(&self, wallets: &[Arc<dyn Wallet>]) -> i64 {
        wallets
            .iter()
            .filter(|w| w.chain_type() == ChainType::OnChain)
            .map(|w| w.get_balance())
            .sum()
    }

    /// Fiat paid, at acquisition-day prices, for the currently held confirmed
    /// outputs. A day with no resolvable price contributes zero; cost basis
    /// is deliberately an underestimate when price history is incomplete.
    pub async fn cost_basis(&self, wallets: &[Arc<dyn Wallet>], currency: &str) -> Result<Decimal> {
        let outputs = self.confirmed_tracked(wallets)?;
        if outputs.is_empty() {
            return Ok(Decimal::ZERO);
        }

        let mut sats_by_day: HashMap<NaiveDate, i64> = HashMap::new();
        for tracked in &outputs {
            let day = buckets::date_of_ms(tracked.first_seen_timestamp);
            *sats_by_day.entry(day).or_insert(0) += tracked.output.value;
        }

        let dates: Vec<NaiveDate> = sats_by_day.keys().copied().collect();
        let day_prices = self.prices.resolve_many(&dates, currency).await?;

        let mut basis = Decimal::ZERO;
        for (day, sats) in sats_by_day {
            match day_prices.get(&day) {
                Some(price) => basis += sats_to_btc(sats) * price,
                None => warn!("No {} price for {}, day contributes zero to cost basis", currency, day),
            }
        }
        Ok(basis)
    }

    /// Total balance valued at today's price. Zero balance short-circuits
    /// without touching the price layer.
    pub async fn current_value(
        &self,
        wallets: &[Arc<dyn Wallet>],
        currency: &str,
    ) -> Result<Decimal> {
        let total = self.total_balance(wallets);
        if total == 0 {
            return Ok(Decimal::ZERO);
        }
        let price = self.prices.resolve(self.today(), currency).await?;
        Ok(sats_to_btc(total) * price)
    }

    /// Cost basis divided by held BTC; zero when the balance is zero.
    pub async fn average_buy_price(
        &self,
        wallets: &[Arc<dyn Wallet>],
        currency: &str,
    ) -> Result<Decimal> {
        let total = self.total_balance(wallets);
        if total == 0 {
            return Ok(Decimal::ZERO);
        }
        let basis = self.cost_basis(wallets, currency).await?;
        Ok(basis / sats_to_btc(total))
    }

    /// Current value minus cost basis, with percent defined as zero when the
    /// cost basis is zero.
    pub async fn unrealized_return(
        &self,
        wallets: &[Arc<dyn Wallet>],
        currency: &str,
    ) -> Result<UnrealizedReturn> {
        let basis = self.cost_basis(wallets, currency).await?;
        let current = self.current_value(wallets, currency).await?;
        Ok(Self::unrealized_from(basis, current))
    }

    /// Total miner fees paid by outgoing transactions, in satoshis.
    ///
    /// A transaction whose computed fee comes out non-positive has incomplete
    /// input data and contributes zero rather than a negative fee.
    pub fn fees_spent(&self, wallets: &[Arc<dyn Wallet>]) -> Result<i64> {
        let mut total: i64 = 0;
        for wallet in wallets {
            if wallet.chain_type() != ChainType::OnChain {
                continue;
            }
            for tx in wallet.get_transactions()? {
                if tx.value >= 0 {
                    continue;
                }
                let inputs: i64 = tx.inputs.iter().filter_map(|input| input.value).sum();
                let outputs: i64 = tx.outputs.iter().map(|output| output.value).sum();
                let fee = inputs - outputs;
                if fee > 0 {
                    total += fee;
                } else {
                    debug!("Incomplete input data for tx {}, fee treated as zero", tx.txid);
                }
            }
        }
        Ok(total)
    }

    /// Fees in fiat terms, with the under-half-a-percent-of-value verdict.
    /// Fiat conversion degrades to zero when today's price is unavailable.
    pub async fn fees_breakdown(
        &self,
        wallets: &[Arc<dyn Wallet>],
        currency: &str,
    ) -> Result<FeesBreakdown> {
        let fees = self.fees_spent(wallets)?;
        let current = self.current_value(wallets, currency).await?;
        Ok(self.fees_breakdown_from(fees, current, currency).await)
    }

    /// One snapshot composing every metric.
    pub async fn metrics(
        &self,
        wallets: &[Arc<dyn Wallet>],
        currency: &str,
    ) -> Result<PortfolioMetrics> {
        let total = self.total_balance(wallets);
        let basis = self.cost_basis(wallets, currency).await?;
        let current = self.current_value(wallets, currency).await?;
        let average = if total == 0 {
            Decimal::ZERO
        } else {
            basis / sats_to_btc(total)
        };
        let unrealized = Self::unrealized_from(basis, current);
        let fees = self.fees_spent(wallets)?;
        let breakdown = self.fees_breakdown_from(fees, current, currency).await;

        Ok(PortfolioMetrics {
            total_balance: total,
            current_value: current,
            cost_basis: basis,
            average_buy_price: average,
            unrealized_return: unrealized.amount,
            unrealized_return_percent: unrealized.percent,
            fees_spent: fees,
            fees_spent_value: breakdown.total_fees_value,
            fees_percent: breakdown.fees_percent,
        })
    }

    /// Synthesized holdings-accumulated-so-far curve over the requested
    /// range. Each point answers "how much of what I hold today had I
    /// already acquired by then"; spent coins are not reconstructed.
    pub async fn history(
        &self,
        wallets: &[Arc<dyn Wallet>],
        range: TimeRange,
        currency: &str,
    ) -> Result<Vec<ChartDataPoint>> {
        let mut outputs = self.confirmed_tracked(wallets)?;
        if outputs.is_empty() {
            return Ok(Vec::new());
        }
        outputs.sort_by_key(|t| t.first_seen_timestamp);

        let now_ms = self.clock.now_ms();
        let size = range.bucket_size();
        let current_balance = self.total_balance(wallets);

        // An all-time chart starts at the earliest acquisition; outputs is
        // non-empty past the early return above.
        let window_start = range
            .window_start_ms(now_ms)
            .unwrap_or(outputs[0].first_seen_timestamp);

        // Holdings acquired before the window seed the curve so it does not
        // start at zero when older coins exist.
        let initial_balance: i64 = outputs
            .iter()
            .filter(|t| t.first_seen_timestamp < window_start)
            .map(|t| t.output.value)
            .sum();

        let bucket_times = buckets::generate(size, window_start, now_ms);
        let bucket_dates: Vec<NaiveDate> =
            bucket_times.iter().map(|&ms| buckets::date_of_ms(ms)).collect();
        let bucket_prices = self.prices.resolve_many(&bucket_dates, currency).await?;

        // Fetched once and substituted for any bucket whose own price could
        // not be resolved.
        let fallback_price = if bucket_dates.iter().any(|d| !bucket_prices.contains_key(d)) {
            self.prices
                .resolve(self.today(), currency)
                .await
                .ok()
                .filter(|p| p > &Decimal::ZERO)
        } else {
            None
        };

        let mut points: Vec<ChartDataPoint> = Vec::new();
        let last_index = bucket_times.len().saturating_sub(1);
        for (index, &bucket_ms) in bucket_times.iter().enumerate() {
            let is_current_period = index == last_index && buckets::same_bucket(size, bucket_ms, now_ms);

            let (balance, timestamp) = if is_current_period {
                // The newest point tracks the live balance exactly, stamped
                // at the moment of the call rather than the period start.
                (current_balance, now_ms)
            } else {
                let mut cumulative: i64 = initial_balance
                    + outputs
                        .iter()
                        .filter(|t| {
                            t.first_seen_timestamp >= window_start
                                && t.first_seen_timestamp <= bucket_ms
                        })
                        .map(|t| t.output.value)
                        .sum::<i64>();
                if cumulative > current_balance {
                    warn!(
                        "Cumulative balance {} exceeds current balance {}, clamping",
                        cumulative, current_balance
                    );
                    cumulative = current_balance;
                }
                (cumulative, bucket_ms)
            };

            if balance <= 0 {
                continue;
            }

            let price = bucket_prices
                .get(&bucket_dates[index])
                .copied()
                .filter(|p| p > &Decimal::ZERO)
                .or(fallback_price);
            let Some(price) = price else {
                debug!("No price for bucket {}, point omitted", bucket_dates[index]);
                continue;
            };

            points.push(Self::point(timestamp, balance, price));
        }

        let last_is_current_period = points
            .last()
            .map(|last| buckets::same_bucket(size, last.timestamp, now_ms))
            .unwrap_or(false);

        if last_is_current_period {
            // The wallet balance may have moved between bucket generation
            // and now; make the newest point exact.
            let drifted = points
                .last()
                .map(|last| last.btc_amount != current_balance)
                .unwrap_or(false);
            if drifted {
                match self.prices.resolve(self.today(), currency).await {
                    Ok(price) => {
                        if let Some(last) = points.last_mut() {
                            *last = Self::point(now_ms, current_balance, price);
                        }
                    }
                    Err(e) => warn!("Could not refresh today's price for final point: {}", e),
                }
            }
        } else if !points.is_empty() && current_balance > 0 {
            // A series with no priceable bucket stays empty; never
            // fabricate a lone live point.
            match self.prices.resolve(self.today(), currency).await {
                Ok(price) => points.push(Self::point(now_ms, current_balance, price)),
                Err(e) => warn!("Could not price today's point: {}", e),
            }
        }

        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }

    fn confirmed_tracked(&self, wallets: &[Arc<dyn Wallet>]) -> Result<Vec<TrackedOutput>> {
        let mut all = Vec::new();
        for wallet in wallets {
            if wallet.chain_type() != ChainType::OnChain {
                continue;
            }
            let tracked = self.tracker.with_acquisition_timestamps(wallet.as_ref())?;
            all.extend(tracked.into_iter().filter(|t| t.output.confirmations > 0));
        }
        Ok(all)
    }

    async fn fees_breakdown_from(
        &self,
        fees_sats: i64,
        current_value: Decimal,
        currency: &str,
    ) -> FeesBreakdown {
        let fees_value = if fees_sats > 0 {
            match self.prices.resolve(self.today(), currency).await {
                Ok(price) => sats_to_btc(fees_sats) * price,
                Err(e) => {
                    warn!("Fees left unvalued, no {} price for today: {}", currency, e);
                    Decimal::ZERO
                }
            }
        } else {
            Decimal::ZERO
        };
        let fees_percent = if current_value > Decimal::ZERO {
            fees_value / current_value * dec!(100)
        } else {
            Decimal::ZERO
        };
        FeesBreakdown {
            total_fees_sats: fees_sats,
            total_fees_value: fees_value,
            fees_percent,
            is_good: fees_percent < dec!(0.5),
        }
    }

    fn unrealized_from(basis: Decimal, current: Decimal) -> UnrealizedReturn {
        let amount = current - basis;
        let percent = if basis.is_zero() {
            Decimal::ZERO
        } else {
            amount / basis * dec!(100)
        };
        UnrealizedReturn { amount, percent }
    }

    fn point(timestamp: i64, sats: i64, price: Decimal) -> ChartDataPoint {
        ChartDataPoint {
            date: buckets::date_of_ms(timestamp).format("%Y-%m-%d").to_string(),
            timestamp,
            btc_amount: sats,
            local_currency_value: sats_to_btc(sats) * price,
        }
    }

    fn today(&self) -> NaiveDate {
        buckets::date_of_ms(self.clock.now_ms())
    }
}
