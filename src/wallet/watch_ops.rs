/// Address-watch coordination
///
/// `watch_all` is a blocking call: it may perform I/O against the external
/// watcher and must not be invoked from the event-delivery path, which can
/// need the same wallet lock. The wallet lock is released before the
/// registration call is made.
use super::manager::Wallet;
use crate::config::EngineConfig;
use crate::error::WalletError;
use std::time::Duration;

/// Registration failure reported by a watcher implementation.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct WatchError(pub String);

/// External blockchain watcher: accepts address registrations and an
/// unregister call on wallet teardown. Implementations may block inside
/// `register_addresses` up to the given timeout.
pub trait ChainWatcher: Send + Sync {
    fn register_addresses(
        &self,
        wallet_id: &str,
        addresses: &[String],
        timeout: Duration,
    ) -> Result<(), WatchError>;

    fn unregister_wallet(&self, wallet_id: &str);
}

/// Registers the wallet's full current address set with the watcher and
/// blocks until registration is acknowledged or times out.
pub fn watch_all(
    config: &EngineConfig,
    watcher: &dyn ChainWatcher,
    wallet: &Wallet,
) -> Result<(), WalletError> {
    let addresses = collect_addresses(config, wallet)?;
    log::info!(
        "Registering {} addresses of wallet {} with the watcher",
        addresses.len(),
        wallet.id
    );
    watcher
        .register_addresses(&wallet.id, &addresses, config.watch_timeout)
        .map_err(|e| WalletError::WatchRegistrationFailed(e.0))
}

/// The same address set as `watch_all` registers, for diagnostics and
/// export. Does not touch the watcher.
pub fn public_addresses(config: &EngineConfig, wallet: &Wallet) -> Result<Vec<String>, WalletError> {
    collect_addresses(config, wallet)
}

/// Union of all derived receive and change addresses, with gap-limit
/// lookahead on both chains. Addresses bound to Canceled or Finalized
/// requests are part of the receive chain and stay in this set; an issued
/// address is watched forever.
fn collect_addresses(config: &EngineConfig, wallet: &Wallet) -> Result<Vec<String>, WalletError> {
    let (receive_count, change_count) = {
        let data = wallet.data.read();
        let receive = data.state.receive_cursor + config.address_gap_limit;
        let change = data
            .state
            .used_change
            .iter()
            .max()
            .map(|m| m + 1)
            .unwrap_or(0)
            + config.address_gap_limit;
        (receive, change)
    };

    let mut addresses = Vec::with_capacity((receive_count + change_count) as usize);
    for index in 0..receive_count {
        addresses.push(wallet.keychain.receive_address(index)?.to_string());
    }
    for index in 0..change_count {
        addresses.push(wallet.keychain.change_address(index)?.to_string());
    }
    Ok(addresses)
}
