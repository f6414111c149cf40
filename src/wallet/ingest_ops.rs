/// Chain-event ingestion
///
/// Normalizes watcher events into ledger and request-book updates. All
/// mutation happens under the wallet write lock; engine events are emitted
/// only after the lock is released.
use super::manager::Wallet;
use crate::config::EngineConfig;
use crate::error::WalletError;
use crate::events::{EngineEvent, EventBus};
use crate::storage::Storage;
use crate::wallet::shared::{TxDetails, TxOutput, TxRecord};
use chrono::Utc;
use uuid::Uuid;

/// Events delivered by the external blockchain watcher.
#[derive(Debug, Clone)]
pub enum ChainEvent {
    /// The chain tip moved.
    HeightChanged(u64),
    /// A transaction relevant to a wallet's addresses was observed.
    TransactionObserved { wallet_id: String, tx: ObservedTx },
}

/// A chain transaction as reported by the watcher. `block_height` is 0
/// while the transaction is still in the mempool.
#[derive(Debug, Clone)]
pub struct ObservedTx {
    pub chain_id: String,
    pub mal_chain_id: String,
    pub inputs: Vec<TxOutput>,
    pub outputs: Vec<TxOutput>,
    pub amount_satoshi: i64,
    pub fee_satoshi: u64,
    pub block_height: u64,
}

/// Applies an observed transaction to the wallet.
///
/// Resolution order: an existing record matching either chain-level id is
/// updated in place with its `internal_id` preserved (malleability dedup);
/// re-delivery of an identical observation is a no-op; otherwise a new
/// record is created and any Active receive request whose address appears
/// in the outputs is credited.
pub fn transaction_observed(
    storage: &Storage,
    events: &EventBus,
    wallet: &Wallet,
    obs: ObservedTx,
) -> Result<(), WalletError> {
    let mut emitted = Vec::new();
    {
        let mut data = wallet.data.write();
        let tip = data.state.block_height;
        let confirmed = obs.block_height > 0 && obs.block_height <= tip;

        let mut ledger = data.ledger.clone();
        match ledger.find_by_chain_ids(&obs.chain_id, &obs.mal_chain_id) {
            Some(internal_id) => {
                let record = ledger.get_mut(&internal_id).ok_or_else(|| {
                    WalletError::Ingestion(format!(
                        "Chain index points at missing record {}",
                        internal_id
                    ))
                })?;

                let unchanged = record.chain_id.as_deref() == Some(obs.chain_id.as_str())
                    && record.outputs == obs.outputs
                    && record.block_height == obs.block_height;
                if unchanged {
                    log::debug!(
                        "Duplicate observation of {} for wallet {}, ignoring",
                        obs.chain_id,
                        wallet.id
                    );
                    return Ok(());
                }

                if record.chain_id.as_deref() != Some(obs.chain_id.as_str())
                    && !obs.chain_id.is_empty()
                {
                    log::info!(
                        "Malleated id {} -> {} for record {} in wallet {}",
                        record.chain_id.as_deref().unwrap_or(""),
                        obs.chain_id,
                        internal_id,
                        wallet.id
                    );
                }

                if !obs.chain_id.is_empty() {
                    record.chain_id = Some(obs.chain_id.clone());
                }
                if !obs.mal_chain_id.is_empty() {
                    record.mal_chain_id = Some(obs.mal_chain_id.clone());
                }
                record.outputs = obs.outputs;
                record.amount_satoshi = obs.amount_satoshi;
                record.fee_satoshi = obs.fee_satoshi;
                record.block_height = obs.block_height;
                record.confirmed = confirmed;
                ledger.reindex(&internal_id);

                storage.save_ledger(&wallet.id, &ledger)?;
                data.ledger = ledger;
            }
            None => {
                let record = TxRecord {
                    internal_id: Uuid::new_v4().to_string(),
                    chain_id: non_empty(&obs.chain_id),
                    mal_chain_id: non_empty(&obs.mal_chain_id),
                    timestamp: Utc::now(),
                    outputs: obs.outputs,
                    amount_satoshi: obs.amount_satoshi,
                    fee_satoshi: obs.fee_satoshi,
                    block_height: obs.block_height,
                    confirmed,
                    superseded: false,
                    details: TxDetails::default(),
                };
                let internal_id = record.internal_id.clone();

                let mut book = data.requests.clone();
                for output in &record.outputs {
                    if let Some((request_id, total)) =
                        book.credit(&output.address, output.amount_satoshi)
                    {
                        log::info!(
                            "Request {} credited {} sats (total {}) in wallet {}",
                            request_id,
                            output.amount_satoshi,
                            total,
                            wallet.id
                        );
                        emitted.push(EngineEvent::RequestCredited {
                            wallet_id: wallet.id.clone(),
                            request_id,
                            amount_satoshi: output.amount_satoshi,
                        });
                    }
                }

                ledger.insert(record);
                storage.save_ledger(&wallet.id, &ledger)?;
                storage.save_requests(&wallet.id, &book)?;
                data.ledger = ledger;
                data.requests = book;

                emitted.push(EngineEvent::TransactionReceived {
                    wallet_id: wallet.id.clone(),
                    internal_id,
                });
            }
        }
    }

    for event in emitted {
        events.emit(event);
    }
    Ok(())
}

/// Applies a chain-tip change to the wallet.
///
/// Updates the stored height, re-evaluates record confirmation against the
/// new tip, and emits exactly one `HeightChanged` event for the wallet
/// regardless of how many records were affected. A tip below a record's
/// block (reorg) demotes it back to unconfirmed, bounded by the configured
/// scan depth.
pub fn height_changed(
    storage: &Storage,
    config: &EngineConfig,
    events: &EventBus,
    wallet: &Wallet,
    height: u64,
) -> Result<(), WalletError> {
    {
        let mut data = wallet.data.write();
        let mut state = data.state.clone();
        state.block_height = height;

        let mut ledger = data.ledger.clone();
        let mut changed = false;
        for record in ledger.records_mut() {
            if record.block_height == 0 {
                continue;
            }
            if record.block_height > height {
                let within_scan = record.block_height <= height + config.confirm_scan_depth;
                if record.confirmed && within_scan {
                    record.confirmed = false;
                    changed = true;
                }
            } else if !record.confirmed {
                record.confirmed = true;
                changed = true;
            }
        }

        storage.save_state(&wallet.id, &state)?;
        if changed {
            storage.save_ledger(&wallet.id, &ledger)?;
            data.ledger = ledger;
        }
        data.state = state;
    }

    events.emit(EngineEvent::HeightChanged {
        wallet_id: wallet.id.clone(),
        height,
    });
    Ok(())
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
