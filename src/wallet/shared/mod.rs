/// Shared wallet components
///
/// - `keychain.rs` - BIP84 derivation and ephemeral signing-key tables
/// - `records.rs` - ledger and request data model
/// - `ledger.rs` - transaction ledger with malleability-aware indexing
/// - `requests.rs` - receive-request state machine
pub mod keychain;
pub mod ledger;
pub mod records;
pub mod requests;

pub use keychain::{KeyTable, Keychain};
pub use ledger::TxLedger;
pub use records::{
    ReceiveRequest, RequestStatus, SendInfo, TxDetails, TxInfo, TxOutput, TxRecord, UnsavedTx,
};
pub use requests::RequestBook;
