//! Transaction and receive-request engine for a Bitcoin wallet.
//!
//! Reconciles chain-observed events with each wallet's local ledger and
//! invoice book, allocates change addresses, and derives ephemeral signing
//! keys. The chain itself (block validation, broadcast, fee policy) and
//! the outward API surface are external collaborators.
//!
//! Entry point is [`WalletManager`]: open wallets, feed it
//! [`ChainEvent`]s from the watcher, subscribe to [`EngineEvent`]s.

pub mod config;
pub mod error;
pub mod events;
pub mod storage;
pub mod wallet;

pub use config::EngineConfig;
pub use error::{StorageError, WalletError};
pub use events::{EngineEvent, EventBus};
pub use storage::{Storage, WalletState};
pub use wallet::ingest_ops::{ChainEvent, ObservedTx};
pub use wallet::shared::{
    KeyTable, Keychain, ReceiveRequest, RequestStatus, SendInfo, TxDetails, TxInfo, TxOutput,
    TxRecord, UnsavedTx,
};
pub use wallet::watch_ops::{ChainWatcher, WatchError};
pub use wallet::{Wallet, WalletManager};
