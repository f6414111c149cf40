/// Ledger queries and mutations
///
/// Read paths compute confirmations against the wallet's known tip at
/// query time; mutations persist before they become visible.
use super::manager::Wallet;
use crate::error::WalletError;
use crate::events::{EngineEvent, EventBus};
use crate::storage::Storage;
use crate::wallet::shared::{SendInfo, TxDetails, TxInfo, TxRecord, UnsavedTx};
use chrono::Utc;

pub fn get_transaction(wallet: &Wallet, id: &str) -> Result<TxInfo, WalletError> {
    let data = wallet.data.read();
    let tip = data.state.block_height;
    data.ledger
        .get(id)
        .map(|r| TxInfo::from_record(r, tip))
        .ok_or_else(|| WalletError::NotFound(format!("Transaction {}", id)))
}

/// Transactions with timestamps in `[start_time, end_time]` (unix
/// seconds), ascending.
pub fn list_transactions(wallet: &Wallet, start_time: i64, end_time: i64) -> Vec<TxInfo> {
    let data = wallet.data.read();
    let tip = data.state.block_height;
    data.ledger
        .list(start_time, end_time)
        .into_iter()
        .map(|r| TxInfo::from_record(r, tip))
        .collect()
}

pub fn search_transactions(wallet: &Wallet, query: &str) -> Vec<TxInfo> {
    let data = wallet.data.read();
    let tip = data.state.block_height;
    data.ledger
        .search(query)
        .into_iter()
        .map(|r| TxInfo::from_record(r, tip))
        .collect()
}

pub fn set_transaction_details(
    storage: &Storage,
    wallet: &Wallet,
    id: &str,
    details: TxDetails,
) -> Result<(), WalletError> {
    let mut data = wallet.data.write();
    let mut ledger = data.ledger.clone();
    if !ledger.set_details(id, details) {
        return Err(WalletError::NotFound(format!("Transaction {}", id)));
    }
    storage.save_ledger(&wallet.id, &ledger)?;
    data.ledger = ledger;
    Ok(())
}

pub fn get_transaction_details(wallet: &Wallet, id: &str) -> Result<TxDetails, WalletError> {
    let data = wallet.data.read();
    data.ledger
        .get(id)
        .map(|r| r.details.clone())
        .ok_or_else(|| WalletError::NotFound(format!("Transaction {}", id)))
}

/// Records funds imported from an externally held key as a single
/// incoming transaction. Idempotent on repeated identical `tx_id`.
pub fn record_sweep(
    storage: &Storage,
    events: &EventBus,
    wallet: &Wallet,
    tx_id: &str,
    mal_tx_id: &str,
    funds_satoshi: u64,
    details: TxDetails,
) -> Result<(), WalletError> {
    let internal_id;
    {
        let mut data = wallet.data.write();
        if data.ledger.find_by_chain_ids(tx_id, mal_tx_id).is_some() {
            log::debug!("Sweep {} already recorded for wallet {}", tx_id, wallet.id);
            return Ok(());
        }

        let record = TxRecord {
            internal_id: uuid::Uuid::new_v4().to_string(),
            chain_id: Some(tx_id.to_string()),
            mal_chain_id: if mal_tx_id.is_empty() {
                None
            } else {
                Some(mal_tx_id.to_string())
            },
            timestamp: Utc::now(),
            // Swept funds have no counterpart outputs on our own addresses.
            outputs: Vec::new(),
            amount_satoshi: funds_satoshi as i64,
            fee_satoshi: 0,
            block_height: 0,
            confirmed: false,
            superseded: false,
            details,
        };
        internal_id = record.internal_id.clone();

        let mut ledger = data.ledger.clone();
        ledger.insert(record);
        storage.save_ledger(&wallet.id, &ledger)?;
        data.ledger = ledger;
    }

    log::info!(
        "Recorded sweep {} of {} sats into wallet {}",
        tx_id,
        funds_satoshi,
        wallet.id
    );
    events.emit(EngineEvent::TransactionReceived {
        wallet_id: wallet.id.clone(),
        internal_id,
    });
    Ok(())
}

/// Folds an in-flight send into a persisted ledger entry before
/// broadcast. The record carries the send's negative net amount; the
/// `UnsavedTx` is consumed and its `internal_id` becomes the record's.
pub fn complete_send(
    storage: &Storage,
    wallet: &Wallet,
    info: &SendInfo,
    utx: UnsavedTx,
) -> Result<String, WalletError> {
    let mut data = wallet.data.write();

    let record = TxRecord {
        internal_id: utx.internal_id,
        chain_id: utx.chain_id,
        mal_chain_id: utx.mal_chain_id,
        timestamp: Utc::now(),
        outputs: utx.outputs,
        amount_satoshi: -(info.amount_satoshi as i64 + info.fee_satoshi as i64),
        fee_satoshi: info.fee_satoshi,
        block_height: 0,
        confirmed: false,
        superseded: false,
        details: info.details.clone(),
    };
    let internal_id = record.internal_id.clone();

    let mut ledger = data.ledger.clone();
    ledger.insert(record);
    storage.save_ledger(&wallet.id, &ledger)?;
    data.ledger = ledger;

    log::info!(
        "Send {} of {} sats (+{} fee) recorded in wallet {}",
        internal_id,
        info.amount_satoshi,
        info.fee_satoshi,
        wallet.id
    );
    Ok(internal_id)
}
