use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;

use super::price_constants::COINGECKO_BASE_URL;
use super::price_errors::PriceError;

/// Remote price-by-date collaborator: one positive decimal price per ISO
/// calendar date and currency code.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_price(&self, date: NaiveDate, currency: &str) -> Result<Decimal, PriceError>;
}

/// CoinGecko `/coins/bitcoin/history` provider (free tier).
pub struct CoinGeckoProvider {
    client: Client,
}

impl CoinGeckoProvider {
    pub fn new() -> Self {
        CoinGeckoProvider {
            client: Client::new(),
        }
    }
}

impl Default for CoinGeckoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    fn name(&self) -> &'static str {
        "COINGECKO"
    }

    async fn fetch_price(&self, date: NaiveDate, currency: &str) -> Result<Decimal, PriceError> {
        // CoinGecko's history endpoint wants DD-MM-YYYY.
        let url = format!(
            "{}/coins/bitcoin/history?date={}",
            COINGECKO_BASE_URL,
            date.format("%d-%m-%Y")
        );

        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(PriceError::RateLimited),
            StatusCode::UNAUTHORIZED => return Err(PriceError::Unauthorized),
            status if !status.is_success() => {
                return Err(PriceError::Provider(format!(
                    "CoinGecko returned status {}",
                    status
                )))
            }
            _ => {}
        }

        let body: serde_json::Value = response.json().await?;
        let price = body["market_data"]["current_price"][currency.to_lowercase()]
            .as_f64()
            .and_then(Decimal::from_f64_retain)
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| {
                PriceError::InvalidData(format!(
                    "no positive {} price for {} in response",
                    currency, date
                ))
            })?;

        Ok(price)
    }
}
