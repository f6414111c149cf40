use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form transaction metadata attached to ledger entries, receive
/// requests, and change addresses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxDetails {
    /// Requested or recorded amount, in satoshi.
    pub amount_satoshi: i64,
    /// Counterparty name
    pub name: String,
    pub category: String,
    pub notes: String,
    /// User-assigned fiat amount at the time of the transaction
    pub fiat_amount: f64,
}

/// One output of a chain transaction as seen by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    pub amount_satoshi: u64,
}

/// One ledger entry.
///
/// `internal_id` is assigned exactly once and never changes, even when the
/// chain-level id mutates under malleability or the transaction is
/// superseded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRecord {
    pub internal_id: String,
    /// Chain-level txid; absent until observed on chain, and may change
    /// under malleability while `internal_id` stays fixed.
    pub chain_id: Option<String>,
    pub mal_chain_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub outputs: Vec<TxOutput>,
    /// Net effect on the wallet balance; negative = outgoing.
    pub amount_satoshi: i64,
    pub fee_satoshi: u64,
    /// Block the transaction was mined in; 0 = unconfirmed/mempool.
    pub block_height: u64,
    /// True once the wallet's known tip has reached `block_height`.
    pub confirmed: bool,
    /// Replaced transactions are marked, never deleted.
    pub superseded: bool,
    pub details: TxDetails,
}

impl TxRecord {
    pub fn confirmations(&self, tip: u64) -> u64 {
        if self.block_height == 0 || self.block_height > tip {
            0
        } else {
            tip - self.block_height + 1
        }
    }
}

/// A send in flight: built before broadcast, folded into a `TxRecord` by
/// `complete_send` or discarded on failure. Never persisted as-is.
#[derive(Debug, Clone)]
pub struct UnsavedTx {
    pub internal_id: String,
    /// May be empty prior to broadcast.
    pub chain_id: Option<String>,
    pub mal_chain_id: Option<String>,
    pub outputs: Vec<TxOutput>,
}

/// Parameters of a send being completed.
#[derive(Debug, Clone)]
pub struct SendInfo {
    pub to_address: String,
    pub amount_satoshi: u64,
    pub fee_satoshi: u64,
    pub details: TxDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Active,
    Finalized,
    Canceled,
    /// Terminal variant of Finalized: received funds are earmarked for
    /// forwarding rather than normal receipt.
    Transferred,
}

impl RequestStatus {
    pub fn is_active(self) -> bool {
        matches!(self, RequestStatus::Active)
    }
}

/// An invoice: a wallet-issued request to receive funds at a specific
/// address. The address is bound at creation and never reassigned, and the
/// request itself is never physically deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveRequest {
    pub request_id: String,
    pub address: String,
    /// Index on the receive chain the address was derived at.
    pub address_index: u32,
    pub details: TxDetails,
    pub status: RequestStatus,
    /// Created with the transfer flag: finalization yields Transferred.
    pub transfer: bool,
    /// Running total credited by the ingestion engine; only increases.
    pub amount_received: u64,
    pub created_at: DateTime<Utc>,
}

/// Query-side view of a ledger entry, with confirmations computed against
/// the wallet's known tip at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxInfo {
    pub internal_id: String,
    pub chain_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub outputs: Vec<TxOutput>,
    pub amount_satoshi: i64,
    pub fee_satoshi: u64,
    pub block_height: u64,
    pub confirmations: u64,
    pub superseded: bool,
    pub details: TxDetails,
}

impl TxInfo {
    pub fn from_record(record: &TxRecord, tip: u64) -> Self {
        Self {
            internal_id: record.internal_id.clone(),
            chain_id: record.chain_id.clone(),
            timestamp: record.timestamp,
            outputs: record.outputs.clone(),
            amount_satoshi: record.amount_satoshi,
            fee_satoshi: record.fee_satoshi,
            block_height: record.block_height,
            confirmations: record.confirmations(tip),
            superseded: record.superseded,
            details: record.details.clone(),
        }
    }
}
