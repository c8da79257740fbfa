use std::collections::HashMap;
use std::sync::Mutex;

use super::wallet_errors::WalletError;
use super::wallet_model::{ChainType, UnspentOutput, UtxoMetadata, WalletTransaction};
use super::wallet_traits::Wallet;

/// In-memory wallet used across acquisition and portfolio tests.
pub(crate) struct MockWallet {
    id: String,
    label: String,
    chain_type: ChainType,
    balance: i64,
    utxos: Vec<UnspentOutput>,
    transactions: Vec<WalletTransaction>,
    metadata: Mutex<HashMap<String, UtxoMetadata>>,
    fail_metadata_store: bool,
}

impl MockWallet {
    pub(crate) fn new(id: &str) -> Self {
        MockWallet {
            id: id.to_string(),
            label: id.to_string(),
            chain_type: ChainType::OnChain,
            balance: 0,
            utxos: Vec::new(),
            transactions: Vec::new(),
            metadata: Mutex::new(HashMap::new()),
            fail_metadata_store: false,
        }
    }

    pub(crate) fn off_chain(mut self) -> Self {
        self.chain_type = ChainType::OffChain;
        self
    }

    pub(crate) fn with_balance(mut self, sats: i64) -> Self {
        self.balance = sats;
        self
    }

    pub(crate) fn with_utxo(mut self, txid: &str, vout: u32, value: i64, confirmations: i64) -> Self {
        self.utxos.push(UnspentOutput {
            txid: txid.to_string(),
            vout,
            value,
            confirmations,
        });
        self
    }

    pub(crate) fn with_transaction(mut self, tx: WalletTransaction) -> Self {
        self.transactions.push(tx);
        self
    }

    pub(crate) fn failing_metadata_store(mut self) -> Self {
        self.fail_metadata_store = true;
        self
    }

    pub(crate) fn seed_metadata(&self, txid: &str, vout: u32, metadata: UtxoMetadata) {
        self.metadata
            .lock()
            .unwrap()
            .insert(format!("{}:{}", txid, vout), metadata);
    }

    pub(crate) fn metadata_for(&self, txid: &str, vout: u32) -> UtxoMetadata {
        self.metadata
            .lock()
            .unwrap()
            .get(&format!("{}:{}", txid, vout))
            .cloned()
            .unwrap_or_default()
    }
}

impl Wallet for MockWallet {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn chain_type(&self) -> ChainType {
        self.chain_type
    }

    fn get_balance(&self) -> i64 {
        self.balance
    }

    fn get_utxos(&self, _include_frozen: bool) -> Result<Vec<UnspentOutput>, WalletError> {
        Ok(self.utxos.clone())
    }

    fn get_transactions(&self) -> Result<Vec<WalletTransaction>, WalletError> {
        Ok(self.transactions.clone())
    }

    fn get_utxo_metadata(&self, txid: &str, vout: u32) -> Result<UtxoMetadata, WalletError> {
        if self.fail_metadata_store {
            return Err(WalletError::StoreUnavailable("mock failure".to_string()));
        }
        Ok(self.metadata_for(txid, vout))
    }

    fn set_utxo_metadata(
        &self,
        txid: &str,
        vout: u32,
        metadata: UtxoMetadata,
    ) -> Result<(), WalletError> {
        if self.fail_metadata_store {
            return Err(WalletError::StoreUnavailable("mock failure".to_string()));
        }
        self.metadata
            .lock()
            .unwrap()
            .insert(format!("{}:{}", txid, vout), metadata);
        Ok(())
    }
}
