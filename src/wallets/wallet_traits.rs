use super::wallet_errors::WalletError;
use super::wallet_model::{ChainType, UnspentOutput, UtxoMetadata, WalletTransaction};

/// Contract consumed from the wallet collaborator.
///
/// The engine never mutates wallet state except through
/// `set_utxo_metadata`, which replaces the full metadata record for one
/// output; field-level merging is the caller's job.
pub trait Wallet: Send + Sync {
    fn id(&self) -> &str;
    fn label(&self) -> &str;
    fn chain_type(&self) -> ChainType;

    /// Current spendable balance in satoshis as reported by the wallet.
    fn get_balance(&self) -> i64;

    /// Current unspent outputs. Portfolio accounting always asks for frozen
    /// outputs too; they are still held value.
    fn get_utxos(&self, include_frozen: bool) -> Result<Vec<UnspentOutput>, WalletError>;

    fn get_transactions(&self) -> Result<Vec<WalletTransaction>, WalletError>;

    fn get_utxo_metadata(&self, txid: &str, vout: u32) -> Result<UtxoMetadata, WalletError>;

    fn set_utxo_metadata(
        &self,
        txid: &str,
        vout: u32,
        metadata: UtxoMetadata,
    ) -> Result<(), WalletError>;
}
