/// Wallet Core Module
///
/// Modular wallet engine with clear separation of concerns:
///
/// - `manager.rs` - Orchestrator: wallet registry and operation entry point
/// - `address_ops.rs` - Change-address allocation, initial receive pool
/// - `request_ops.rs` - Receive-request lifecycle and payment URIs
/// - `ledger_ops.rs` - Ledger queries, sweeps, send completion
/// - `ingest_ops.rs` - Chain-event ingestion
/// - `watch_ops.rs` - Address-watch registration
/// - `shared/` - Reusable components (keychain, records, ledger, requests)

// Operation modules
pub mod address_ops;
pub mod ingest_ops;
pub mod ledger_ops;
pub mod request_ops;
pub mod watch_ops;

// Shared components
pub mod shared;

// Main manager (orchestrator)
pub mod manager;

// Re-export the manager as the main entry point
pub use manager::{Wallet, WalletManager};
