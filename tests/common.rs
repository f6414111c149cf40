//! Shared test fixtures
//!
//! Self-contained: an in-memory recording watcher and tempdir-backed
//! storage stand in for the external collaborators.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wallet_core::{
    ChainWatcher, EngineConfig, ObservedTx, Storage, TxOutput, WalletManager, WatchError,
};

pub const MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// Watcher double that records registrations and can be told to fail.
#[derive(Default)]
pub struct RecordingWatcher {
    pub registrations: Mutex<Vec<(String, Vec<String>)>>,
    pub unregistered: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl ChainWatcher for RecordingWatcher {
    fn register_addresses(
        &self,
        wallet_id: &str,
        addresses: &[String],
        _timeout: Duration,
    ) -> Result<(), WatchError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WatchError("watcher unavailable".to_string()));
        }
        self.registrations
            .lock()
            .unwrap()
            .push((wallet_id.to_string(), addresses.to_vec()));
        Ok(())
    }

    fn unregister_wallet(&self, wallet_id: &str) {
        self.unregistered
            .lock()
            .unwrap()
            .push(wallet_id.to_string());
    }
}

pub struct TestEngine {
    pub manager: WalletManager,
    pub watcher: Arc<RecordingWatcher>,
    // Keeps the storage directory alive for the test's duration.
    pub _dir: TempDir,
}

pub fn engine() -> TestEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().expect("temp storage dir");
    let watcher = Arc::new(RecordingWatcher::default());
    let manager = WalletManager::new(
        Storage::new(dir.path()),
        watcher.clone(),
        EngineConfig::default(),
    );
    TestEngine {
        manager,
        watcher,
        _dir: dir,
    }
}

pub fn random_chain_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// A minimal observed transaction paying `amount` to `address`.
pub fn observed(chain_id: &str, mal_chain_id: &str, address: &str, amount: u64) -> ObservedTx {
    ObservedTx {
        chain_id: chain_id.to_string(),
        mal_chain_id: mal_chain_id.to_string(),
        inputs: Vec::new(),
        outputs: vec![TxOutput {
            address: address.to_string(),
            amount_satoshi: amount,
        }],
        amount_satoshi: amount as i64,
        fee_satoshi: 0,
        block_height: 0,
    }
}
