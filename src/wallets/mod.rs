mod wallet_errors;
mod wallet_model;
mod wallet_traits;

#[cfg(test)]
pub(crate) mod wallet_mocks;

pub use wallet_errors::WalletError;
pub use wallet_model::*;
pub use wallet_traits::Wallet;
