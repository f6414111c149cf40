use super::{address_ops, ingest_ops, ledger_ops, request_ops, watch_ops};
use crate::config::EngineConfig;
use crate::error::WalletError;
use crate::events::{EngineEvent, EventBus};
use crate::storage::{Storage, WalletState};
use crate::wallet::shared::{
    KeyTable, Keychain, ReceiveRequest, RequestBook, SendInfo, TxDetails, TxInfo, TxLedger,
    UnsavedTx,
};
use crate::wallet::watch_ops::ChainWatcher;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Mutable per-wallet state guarded by the wallet lock.
pub struct WalletData {
    pub ledger: TxLedger,
    pub requests: RequestBook,
    pub state: WalletState,
}

/// One open wallet: the aggregate root owning its keychain, ledger, and
/// request book. All mutation is serialized under `data`'s write lock;
/// different wallets are fully independent.
pub struct Wallet {
    pub id: String,
    pub(crate) keychain: Keychain,
    pub(crate) data: RwLock<WalletData>,
}

/// Process-wide wallet registry and operation entry point.
///
/// Wallets are opened on login and torn down on logout. No lock spans two
/// wallets, so event delivery and foreground calls on different wallets
/// never contend.
pub struct WalletManager {
    storage: Storage,
    config: EngineConfig,
    watcher: Arc<dyn ChainWatcher>,
    events: EventBus,
    wallets: RwLock<HashMap<String, Arc<Wallet>>>,
}

impl WalletManager {
    pub fn new(storage: Storage, watcher: Arc<dyn ChainWatcher>, config: EngineConfig) -> Self {
        Self {
            storage,
            config,
            watcher,
            events: EventBus::default(),
            wallets: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribe to the engine event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Opens a wallet, loading persisted state or creating it on first
    /// open. Idempotent for an already-open wallet.
    pub fn open_wallet(&self, wallet_id: &str, mnemonic: &str) -> Result<(), WalletError> {
        if self.wallets.read().contains_key(wallet_id) {
            return Ok(());
        }

        let keychain = Keychain::from_mnemonic(mnemonic, self.config.network)?;

        let fresh = !self.storage.wallet_exists(wallet_id);
        if fresh {
            self.storage.create_wallet(wallet_id)?;
            let parsed = bip39::Mnemonic::parse(mnemonic)
                .map_err(|e| WalletError::Keychain(format!("Invalid mnemonic: {}", e)))?;
            self.storage.save_mnemonic(wallet_id, &parsed)?;
        }

        let ledger = self.storage.load_ledger(wallet_id)?;
        let requests = self.storage.load_requests(wallet_id)?;
        let state = self.storage.load_state(wallet_id)?;

        let wallet = Arc::new(Wallet {
            id: wallet_id.to_string(),
            keychain,
            data: RwLock::new(WalletData {
                ledger,
                requests,
                state,
            }),
        });

        address_ops::ensure_initial_pool(&self.storage, &self.config, &wallet)?;

        self.wallets
            .write()
            .insert(wallet_id.to_string(), wallet);
        log::info!("Opened wallet {}", wallet_id);
        Ok(())
    }

    /// Tears a wallet down: stops event delivery for it, unregisters its
    /// addresses from the watcher, and persists final state. Any handler
    /// already inside the wallet lock completes before state is written.
    pub fn close_wallet(&self, wallet_id: &str) -> Result<(), WalletError> {
        let wallet = self
            .wallets
            .write()
            .remove(wallet_id)
            .ok_or_else(|| WalletError::WalletNotFound(wallet_id.to_string()))?;

        self.watcher.unregister_wallet(wallet_id);

        let data = wallet.data.write();
        self.storage.save_ledger(wallet_id, &data.ledger)?;
        self.storage.save_requests(wallet_id, &data.requests)?;
        self.storage.save_state(wallet_id, &data.state)?;

        log::info!("Closed wallet {}", wallet_id);
        Ok(())
    }

    fn wallet(&self, wallet_id: &str) -> Result<Arc<Wallet>, WalletError> {
        self.wallets
            .read()
            .get(wallet_id)
            .cloned()
            .ok_or_else(|| WalletError::WalletNotFound(wallet_id.to_string()))
    }

    // --- Keychain -------------------------------------------------------

    /// Private keys for exactly the given addresses. The table is
    /// ephemeral: the caller must drop it after signing, at which point
    /// the key material is zeroized.
    pub fn key_table(
        &self,
        wallet_id: &str,
        addresses: &[String],
    ) -> Result<KeyTable, WalletError> {
        let wallet = self.wallet(wallet_id)?;
        let (receive_count, change_count) = {
            let data = wallet.data.read();
            let change = data
                .state
                .used_change
                .iter()
                .max()
                .map(|m| m + 1)
                .unwrap_or(0);
            (data.state.receive_cursor, change)
        };
        wallet.keychain.key_table(addresses, receive_count, change_count)
    }

    // --- Change addresses -----------------------------------------------

    pub fn next_change_address(
        &self,
        wallet_id: &str,
        details: TxDetails,
    ) -> Result<String, WalletError> {
        let wallet = self.wallet(wallet_id)?;
        address_ops::next_change_address(&self.storage, &wallet, details)
    }

    // --- Receive requests -----------------------------------------------

    pub fn create_request(
        &self,
        wallet_id: &str,
        details: TxDetails,
        transfer: bool,
    ) -> Result<String, WalletError> {
        let wallet = self.wallet(wallet_id)?;
        request_ops::create_request(&self.storage, &wallet, details, transfer)
    }

    pub fn modify_request(
        &self,
        wallet_id: &str,
        request_id: &str,
        details: TxDetails,
    ) -> Result<(), WalletError> {
        let wallet = self.wallet(wallet_id)?;
        request_ops::modify_request(&self.storage, &wallet, request_id, details)
    }

    pub fn finalize_request(&self, wallet_id: &str, request_id: &str) -> Result<(), WalletError> {
        let wallet = self.wallet(wallet_id)?;
        request_ops::finalize_request(&self.storage, &wallet, request_id)
    }

    pub fn cancel_request(&self, wallet_id: &str, request_id: &str) -> Result<(), WalletError> {
        let wallet = self.wallet(wallet_id)?;
        request_ops::cancel_request(&self.storage, &wallet, request_id)
    }

    pub fn pending_requests(&self, wallet_id: &str) -> Result<Vec<ReceiveRequest>, WalletError> {
        let wallet = self.wallet(wallet_id)?;
        Ok(request_ops::pending_requests(&wallet))
    }

    pub fn request_address(&self, wallet_id: &str, request_id: &str) -> Result<String, WalletError> {
        let wallet = self.wallet(wallet_id)?;
        request_ops::request_address(&wallet, request_id)
    }

    pub fn request_uri(&self, wallet_id: &str, request_id: &str) -> Result<String, WalletError> {
        let wallet = self.wallet(wallet_id)?;
        request_ops::request_uri(&wallet, request_id)
    }

    // --- Ledger ---------------------------------------------------------

    pub fn get_transaction(&self, wallet_id: &str, id: &str) -> Result<TxInfo, WalletError> {
        let wallet = self.wallet(wallet_id)?;
        ledger_ops::get_transaction(&wallet, id)
    }

    pub fn list_transactions(
        &self,
        wallet_id: &str,
        start_time: i64,
        end_time: i64,
    ) -> Result<Vec<TxInfo>, WalletError> {
        let wallet = self.wallet(wallet_id)?;
        Ok(ledger_ops::list_transactions(&wallet, start_time, end_time))
    }

    pub fn search_transactions(
        &self,
        wallet_id: &str,
        query: &str,
    ) -> Result<Vec<TxInfo>, WalletError> {
        let wallet = self.wallet(wallet_id)?;
        Ok(ledger_ops::search_transactions(&wallet, query))
    }

    pub fn set_transaction_details(
        &self,
        wallet_id: &str,
        id: &str,
        details: TxDetails,
    ) -> Result<(), WalletError> {
        let wallet = self.wallet(wallet_id)?;
        ledger_ops::set_transaction_details(&self.storage, &wallet, id, details)
    }

    pub fn get_transaction_details(
        &self,
        wallet_id: &str,
        id: &str,
    ) -> Result<TxDetails, WalletError> {
        let wallet = self.wallet(wallet_id)?;
        ledger_ops::get_transaction_details(&wallet, id)
    }

    pub fn record_sweep(
        &self,
        wallet_id: &str,
        tx_id: &str,
        mal_tx_id: &str,
        funds_satoshi: u64,
        details: TxDetails,
    ) -> Result<(), WalletError> {
        let wallet = self.wallet(wallet_id)?;
        ledger_ops::record_sweep(
            &self.storage,
            &self.events,
            &wallet,
            tx_id,
            mal_tx_id,
            funds_satoshi,
            details,
        )
    }

    /// Folds a completed send into the ledger. When the destination is a
    /// transfer-flagged request in another open wallet, that request is
    /// marked Transferred; wallet locks are taken one at a time.
    pub fn complete_send(
        &self,
        wallet_id: &str,
        info: SendInfo,
        utx: UnsavedTx,
    ) -> Result<String, WalletError> {
        let wallet = self.wallet(wallet_id)?;
        let internal_id = ledger_ops::complete_send(&self.storage, &wallet, &info, utx)?;

        let others: Vec<Arc<Wallet>> = self.wallets.read().values().cloned().collect();
        for other in others {
            let mut data = other.data.write();
            let mut book = data.requests.clone();
            if let Some(request_id) = book.mark_transferred(&info.to_address) {
                self.storage.save_requests(&other.id, &book)?;
                data.requests = book;
                log::info!(
                    "Request {} in wallet {} marked transferred by send {}",
                    request_id,
                    other.id,
                    internal_id
                );
                break;
            }
        }
        Ok(internal_id)
    }

    // --- Address watching -----------------------------------------------

    /// Blocking: must not be called from the event-delivery path.
    pub fn watch_all(&self, wallet_id: &str) -> Result<(), WalletError> {
        let wallet = self.wallet(wallet_id)?;
        watch_ops::watch_all(&self.config, self.watcher.as_ref(), &wallet)
    }

    pub fn public_addresses(&self, wallet_id: &str) -> Result<Vec<String>, WalletError> {
        let wallet = self.wallet(wallet_id)?;
        watch_ops::public_addresses(&self.config, &wallet)
    }

    // --- Ingestion ------------------------------------------------------

    /// Entry point for the watcher's delivery path. Malformed or
    /// foreign-wallet events are logged and dropped, never fatal.
    pub fn handle_event(&self, event: ingest_ops::ChainEvent) {
        match event {
            ingest_ops::ChainEvent::HeightChanged(height) => {
                let wallets: Vec<Arc<Wallet>> = self.wallets.read().values().cloned().collect();
                for wallet in wallets {
                    if let Err(e) = ingest_ops::height_changed(
                        &self.storage,
                        &self.config,
                        &self.events,
                        &wallet,
                        height,
                    ) {
                        log::error!("Height update failed for wallet {}: {}", wallet.id, e);
                    }
                }
            }
            ingest_ops::ChainEvent::TransactionObserved { wallet_id, tx } => {
                let wallet = match self.wallet(&wallet_id) {
                    Ok(w) => w,
                    Err(_) => {
                        log::warn!(
                            "Dropping observed transaction {} for unknown wallet {}",
                            tx.chain_id,
                            wallet_id
                        );
                        return;
                    }
                };
                if let Err(e) = ingest_ops::transaction_observed(
                    &self.storage,
                    &self.events,
                    &wallet,
                    tx,
                ) {
                    log::error!("Ingestion failed for wallet {}: {}", wallet_id, e);
                }
            }
        }
    }
}
