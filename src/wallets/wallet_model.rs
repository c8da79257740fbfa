use serde::{Deserialize, Serialize};

/// Discriminates wallets that hold on-chain UTXOs from custodial/off-chain
/// wallets, which have no UTXO concept and are excluded from portfolio
/// accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChainType {
    OnChain,
    OffChain,
}

/// A transaction output not yet consumed by a later transaction.
///
/// Owned by the wallet collaborator; immutable once mined and gone from the
/// active set once spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnspentOutput {
    pub txid: String,
    pub vout: u32,
    /// Value in satoshis.
    pub value: i64,
    /// Zero means unconfirmed.
    pub confirmations: i64,
}

impl UnspentOutput {
    /// `txid:vout` key used for per-output metadata.
    pub fn outpoint(&self) -> String {
        format!("{}:{}", self.txid, self.vout)
    }
}

/// Per-output metadata owned by the wallet's own store.
///
/// `first_seen_timestamp` (ms since epoch) is managed by the acquisition
/// tracker; freeze state and memo belong to other features and must survive
/// a tracker `forget`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frozen: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen_timestamp: Option<i64>,
}

/// One input of a wallet transaction. The previous output's value may be
/// unknown when the wallet could not resolve the funding transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInput {
    /// Value in satoshis, when known.
    pub value: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutput {
    /// Value in satoshis.
    pub value: i64,
}

/// A transaction as seen from one wallet's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub txid: String,
    /// Net effect on the wallet in satoshis; negative for outgoing.
    pub value: i64,
    pub confirmations: i64,
    /// Block time in seconds since epoch, once mined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_time: Option<i64>,
    /// First-broadcast time in seconds since epoch, for unmined history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcast_time: Option<i64>,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl WalletTransaction {
    /// Acquisition timestamp of record in milliseconds: block time when
    /// mined, else first-broadcast time.
    pub fn acquisition_time_ms(&self) -> Option<i64> {
        self.block_time
            .or(self.broadcast_time)
            .map(|secs| secs * 1000)
    }
}
