/// Address management
///
/// Change-address allocation and the initial receive pool. Allocation and
/// marking are one atomic step under the wallet write lock, so concurrent
/// callers can never be handed the same address.
use super::manager::Wallet;
use crate::config::EngineConfig;
use crate::error::WalletError;
use crate::storage::Storage;
use crate::wallet::shared::TxDetails;

/// Non-hardened BIP32 child indices stop here.
const MAX_CHAIN_INDEX: u32 = 0x8000_0000;

/// Returns the next unused change address, marking it consumed and
/// recording `details` as its metadata in the same step.
pub fn next_change_address(
    storage: &Storage,
    wallet: &Wallet,
    details: TxDetails,
) -> Result<String, WalletError> {
    let mut data = wallet.data.write();

    let mut index = 0u32;
    while data.state.used_change.contains(&index) {
        index += 1;
        if index >= MAX_CHAIN_INDEX {
            return Err(WalletError::AddressExhausted(format!(
                "Change chain of wallet {} has no unused index",
                wallet.id
            )));
        }
    }

    let address = wallet.keychain.change_address(index)?;

    let mut state = data.state.clone();
    state.used_change.push(index);
    state.change_details.insert(index, details);
    storage.save_state(&wallet.id, &state)?;
    data.state = state;

    log::debug!(
        "Allocated change address index {} for wallet {}",
        index,
        wallet.id
    );
    Ok(address.to_string())
}

/// Pre-derives the initial receive pool when a wallet is first opened, so
/// the watcher covers the gap limit from the start.
pub fn ensure_initial_pool(
    storage: &Storage,
    config: &EngineConfig,
    wallet: &Wallet,
) -> Result<(), WalletError> {
    let mut data = wallet.data.write();
    if data.state.receive_cursor >= config.initial_address_pool {
        return Ok(());
    }

    // Validate the whole pool derives before committing the cursor.
    for index in 0..config.initial_address_pool {
        wallet.keychain.receive_address(index)?;
    }

    let mut state = data.state.clone();
    state.receive_cursor = config.initial_address_pool;
    storage.save_state(&wallet.id, &state)?;
    data.state = state;

    log::info!(
        "Initialized receive pool of {} addresses for wallet {}",
        config.initial_address_pool,
        wallet.id
    );
    Ok(())
}
