use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};

use crate::clock::Clock;
use crate::errors::Result;
use crate::wallets::{ChainType, UnspentOutput, Wallet};

/// An unspent output paired with its resolved acquisition timestamp
/// (milliseconds since epoch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedOutput {
    pub output: UnspentOutput,
    pub first_seen_timestamp: i64,
}

/// Annotates unspent outputs with the time they were first observed.
///
/// All persistence is delegated to the wallet's own metadata accessors; the
/// tracker holds no state of its own. An already-set timestamp is never
/// overwritten, so a send-to-self transaction re-observing an output does
/// not reset its acquisition time.
pub struct AcquisitionTracker {
    clock: Arc<dyn Clock>,
}

impl AcquisitionTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        AcquisitionTracker { clock }
    }

    /// Creates an acquisition record for every current unspent output of the
    /// wallet (frozen ones included) that does not have one yet.
    ///
    /// The recorded timestamp is the creating transaction's block time, else
    /// its first-broadcast time, so cost-basis queries align to real
    /// acquisition dates rather than to whenever the app refreshed. Only when
    /// no transaction record exists does it fall back to the wall clock.
    /// Store failures propagate: silently skipping this bookkeeping would
    /// corrupt cost-basis accuracy.
    pub fn annotate(&self, wallet: &dyn Wallet) -> Result<()> {
        let utxos = wallet.get_utxos(true)?;
        let tx_times = self.transaction_times_ms(wallet)?;

        let mut created = 0usize;
        for utxo in &utxos {
            let mut metadata = wallet.get_utxo_metadata(&utxo.txid, utxo.vout)?;
            if metadata.first_seen_timestamp.is_some() {
                continue;
            }

            let timestamp = self.resolve_timestamp(&tx_times, utxo);
            metadata.first_seen_timestamp = Some(timestamp);
            wallet.set_utxo_metadata(&utxo.txid, utxo.vout, metadata)?;
            created += 1;
        }

        if created > 0 {
            debug!(
                "Annotated {} new output(s) for wallet '{}'",
                created,
                wallet.label()
            );
        }
        Ok(())
    }

    /// Applies `annotate` to every on-chain wallet. Off-chain wallets have no
    /// UTXO concept and are skipped.
    pub fn annotate_all(&self, wallets: &[Arc<dyn Wallet>]) -> Result<()> {
        for wallet in wallets {
            if wallet.chain_type() == ChainType::OnChain {
                self.annotate(wallet.as_ref())?;
            }
        }
        Ok(())
    }

    /// Read-only view of the wallet's current unspent outputs with resolved
    /// acquisition timestamps. Nothing is persisted; outputs whose metadata
    /// cannot be read degrade per-output to the transaction-time/wall-clock
    /// fallback instead of failing the whole batch.
    pub fn with_acquisition_timestamps(&self, wallet: &dyn Wallet) -> Result<Vec<TrackedOutput>> {
        let utxos = wallet.get_utxos(true)?;
        let tx_times = match self.transaction_times_ms(wallet) {
            Ok(times) => times,
            Err(e) => {
                warn!(
                    "Transaction history unavailable for wallet '{}': {}. Falling back to wall clock.",
                    wallet.label(),
                    e
                );
                HashMap::new()
            }
        };

        let mut tracked = Vec::with_capacity(utxos.len());
        for utxo in utxos {
            let stored = match wallet.get_utxo_metadata(&utxo.txid, utxo.vout) {
                Ok(metadata) => metadata.first_seen_timestamp,
                Err(e) => {
                    warn!(
                        "Metadata read failed for {}: {}. Falling back.",
                        utxo.outpoint(),
                        e
                    );
                    None
                }
            };
            let first_seen_timestamp =
                stored.unwrap_or_else(|| self.resolve_timestamp(&tx_times, &utxo));
            tracked.push(TrackedOutput {
                output: utxo,
                first_seen_timestamp,
            });
        }
        Ok(tracked)
    }

    /// On wallet deletion: strips the acquisition timestamp from every
    /// output's metadata while preserving freeze state and memos.
    pub fn forget(&self, wallet: &dyn Wallet) -> Result<()> {
        let utxos = wallet.get_utxos(true)?;
        for utxo in utxos {
            let mut metadata = wallet.get_utxo_metadata(&utxo.txid, utxo.vout)?;
            if metadata.first_seen_timestamp.take().is_some() {
                wallet.set_utxo_metadata(&utxo.txid, utxo.vout, metadata)?;
            }
        }
        Ok(())
    }

    fn transaction_times_ms(&self, wallet: &dyn Wallet) -> Result<HashMap<String, i64>> {
        let mut times = HashMap::new();
        for tx in wallet.get_transactions()? {
            if let Some(ms) = tx.acquisition_time_ms() {
                times.insert(tx.txid, ms);
            }
        }
        Ok(times)
    }

    fn resolve_timestamp(&self, tx_times: &HashMap<String, i64>, utxo: &UnspentOutput) -> i64 {
        match tx_times.get(&utxo.txid) {
            Some(ms) => *ms,
            None => {
                debug!(
                    "No transaction record for {}; using wall clock",
                    utxo.outpoint()
                );
                self.clock.now_ms()
            }
        }
    }
}
