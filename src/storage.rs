use crate::error::StorageError;
use crate::wallet::shared::{RequestBook, TxDetails, TxLedger};
use bip39::Mnemonic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Per-wallet JSON persistence.
///
/// Each wallet owns a directory under the base path holding its ledger,
/// request book, chain state, and mnemonic. Records are written whole
/// after each mutation; the store is assumed crash-atomic per wallet.
pub struct Storage {
    base_path: PathBuf,
}

/// Durable per-wallet scalar state: chain cursors and last-known height.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletState {
    /// Last-known chain height, updated only by ingestion.
    pub block_height: u64,
    /// Next fresh index on the receive chain.
    pub receive_cursor: u32,
    /// Consumed change-chain indices.
    pub used_change: Vec<u32>,
    /// Metadata recorded when a change address was allocated.
    pub change_details: BTreeMap<u32, TxDetails>,
}

impl Storage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn wallet_dir(&self, wallet_id: &str) -> PathBuf {
        self.base_path.join(wallet_id)
    }

    pub fn create_wallet(&self, wallet_id: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path)?;
        fs::create_dir_all(self.wallet_dir(wallet_id))?;
        Ok(())
    }

    pub fn wallet_exists(&self, wallet_id: &str) -> bool {
        self.wallet_dir(wallet_id).exists()
    }

    pub fn save_mnemonic(&self, wallet_id: &str, mnemonic: &Mnemonic) -> Result<(), StorageError> {
        let path = self.wallet_dir(wallet_id).join("mnemonic.txt");
        fs::write(path, mnemonic.to_string())?;
        Ok(())
    }

    pub fn load_mnemonic(&self, wallet_id: &str) -> Result<Mnemonic, StorageError> {
        let path = self.wallet_dir(wallet_id).join("mnemonic.txt");
        if !path.exists() {
            return Err(StorageError::FileNotFound(path.display().to_string()));
        }
        let contents = fs::read_to_string(path)?;
        let mnemonic = Mnemonic::parse(contents.trim()).map_err(|e| {
            StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Invalid mnemonic: {}", e),
            ))
        })?;
        Ok(mnemonic)
    }

    pub fn save_ledger(&self, wallet_id: &str, ledger: &TxLedger) -> Result<(), StorageError> {
        let path = self.wallet_dir(wallet_id).join("ledger.json");
        let json = serde_json::to_string_pretty(ledger)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_ledger(&self, wallet_id: &str) -> Result<TxLedger, StorageError> {
        let path = self.wallet_dir(wallet_id).join("ledger.json");
        if !path.exists() {
            return Ok(TxLedger::default());
        }
        let contents = fs::read_to_string(path)?;
        let mut ledger: TxLedger = serde_json::from_str(&contents)?;
        ledger.rebuild_index();
        Ok(ledger)
    }

    pub fn save_requests(&self, wallet_id: &str, book: &RequestBook) -> Result<(), StorageError> {
        let path = self.wallet_dir(wallet_id).join("requests.json");
        let json = serde_json::to_string_pretty(book)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_requests(&self, wallet_id: &str) -> Result<RequestBook, StorageError> {
        let path = self.wallet_dir(wallet_id).join("requests.json");
        if !path.exists() {
            return Ok(RequestBook::default());
        }
        let contents = fs::read_to_string(path)?;
        let book = serde_json::from_str(&contents)?;
        Ok(book)
    }

    pub fn save_state(&self, wallet_id: &str, state: &WalletState) -> Result<(), StorageError> {
        let path = self.wallet_dir(wallet_id).join("state.json");
        let json = serde_json::to_string_pretty(state)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_state(&self, wallet_id: &str) -> Result<WalletState, StorageError> {
        let path = self.wallet_dir(wallet_id).join("state.json");
        if !path.exists() {
            return Ok(WalletState::default());
        }
        let contents = fs::read_to_string(path)?;
        let state = serde_json::from_str(&contents)?;
        Ok(state)
    }
}
