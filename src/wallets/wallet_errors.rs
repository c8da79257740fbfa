use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Wallet metadata store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Wallet data unavailable: {0}")]
    Unavailable(String),
}
