/// Receive-request operations
///
/// Invoice lifecycle: creation binds a fresh receive-chain address (never
/// the change chain), transitions go through the request book's state
/// machine, and nothing is ever physically deleted.
use super::manager::Wallet;
use crate::error::WalletError;
use crate::storage::Storage;
use crate::wallet::shared::{ReceiveRequest, RequestStatus, TxDetails};
use chrono::Utc;
use uuid::Uuid;

/// Creates an Active request bound to a fresh receiving address.
pub fn create_request(
    storage: &Storage,
    wallet: &Wallet,
    details: TxDetails,
    transfer: bool,
) -> Result<String, WalletError> {
    let mut data = wallet.data.write();

    let index = data.state.receive_cursor;
    let address = wallet.keychain.receive_address(index)?;

    let request = ReceiveRequest {
        request_id: Uuid::new_v4().to_string(),
        address: address.to_string(),
        address_index: index,
        details,
        status: RequestStatus::Active,
        transfer,
        amount_received: 0,
        created_at: Utc::now(),
    };
    let request_id = request.request_id.clone();

    let mut book = data.requests.clone();
    let mut state = data.state.clone();
    book.insert(request);
    state.receive_cursor = index + 1;

    storage.save_requests(&wallet.id, &book)?;
    storage.save_state(&wallet.id, &state)?;
    data.requests = book;
    data.state = state;

    log::info!(
        "Created receive request {} at index {} for wallet {}",
        request_id,
        index,
        wallet.id
    );
    Ok(request_id)
}

/// Edits details in place; valid only while Active.
pub fn modify_request(
    storage: &Storage,
    wallet: &Wallet,
    request_id: &str,
    details: TxDetails,
) -> Result<(), WalletError> {
    let mut data = wallet.data.write();
    let mut book = data.requests.clone();
    book.modify(request_id, details)?;
    storage.save_requests(&wallet.id, &book)?;
    data.requests = book;
    Ok(())
}

/// Records intent, not an address retirement: the bound address remains
/// valid to receive further funds.
pub fn finalize_request(
    storage: &Storage,
    wallet: &Wallet,
    request_id: &str,
) -> Result<(), WalletError> {
    let mut data = wallet.data.write();
    let mut book = data.requests.clone();
    book.finalize(request_id)?;
    storage.save_requests(&wallet.id, &book)?;
    data.requests = book;
    Ok(())
}

pub fn cancel_request(
    storage: &Storage,
    wallet: &Wallet,
    request_id: &str,
) -> Result<(), WalletError> {
    let mut data = wallet.data.write();
    let mut book = data.requests.clone();
    book.cancel(request_id)?;
    storage.save_requests(&wallet.id, &book)?;
    data.requests = book;
    Ok(())
}

/// Active requests in creation order.
pub fn pending_requests(wallet: &Wallet) -> Vec<ReceiveRequest> {
    let data = wallet.data.read();
    data.requests.pending().into_iter().cloned().collect()
}

pub fn request_address(wallet: &Wallet, request_id: &str) -> Result<String, WalletError> {
    let data = wallet.data.read();
    data.requests
        .get(request_id)
        .map(|r| r.address.clone())
        .ok_or_else(|| WalletError::NotFound(format!("Request {}", request_id)))
}

/// BIP21 payment URI for a request. QR rendering of the URI is left to
/// the caller.
pub fn request_uri(wallet: &Wallet, request_id: &str) -> Result<String, WalletError> {
    let data = wallet.data.read();
    let request = data
        .requests
        .get(request_id)
        .ok_or_else(|| WalletError::NotFound(format!("Request {}", request_id)))?;

    let mut uri = format!("bitcoin:{}", request.address);
    let mut params = Vec::new();
    if request.details.amount_satoshi > 0 {
        params.push(format!(
            "amount={}",
            format_btc(request.details.amount_satoshi as u64)
        ));
    }
    if !request.details.name.is_empty() {
        params.push(format!("label={}", percent_encode(&request.details.name)));
    }
    if !request.details.notes.is_empty() {
        params.push(format!("message={}", percent_encode(&request.details.notes)));
    }
    if !params.is_empty() {
        uri.push('?');
        uri.push_str(&params.join("&"));
    }
    Ok(uri)
}

/// Satoshi to a BIP21 decimal BTC amount without trailing zeros.
fn format_btc(satoshi: u64) -> String {
    let whole = satoshi / 100_000_000;
    let frac = satoshi % 100_000_000;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:08}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
