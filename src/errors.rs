use thiserror::Error;

use crate::prices::PriceError;
use crate::store::StoreError;
use crate::wallets::WalletError;

// Create a type alias for Result using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the portfolio engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Wallet operation failed: {0}")]
    Wallet(#[from] WalletError),

    #[error("Price operation failed: {0}")]
    Price(#[from] PriceError),
}
