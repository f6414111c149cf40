use super::records::{ReceiveRequest, RequestStatus, TxDetails};
use crate::error::WalletError;
use serde::{Deserialize, Serialize};

/// Per-wallet store of receive requests, kept in creation order.
///
/// Requests are never removed; canceled and finalized requests stay
/// queryable for history, and their addresses are never reissued.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestBook {
    requests: Vec<ReceiveRequest>,
}

impl RequestBook {
    pub fn insert(&mut self, request: ReceiveRequest) {
        self.requests.push(request);
    }

    pub fn get(&self, request_id: &str) -> Option<&ReceiveRequest> {
        self.requests.iter().find(|r| r.request_id == request_id)
    }

    fn get_mut(&mut self, request_id: &str) -> Result<&mut ReceiveRequest, WalletError> {
        self.requests
            .iter_mut()
            .find(|r| r.request_id == request_id)
            .ok_or_else(|| WalletError::NotFound(format!("Request {}", request_id)))
    }

    /// Valid only while Active.
    pub fn modify(&mut self, request_id: &str, details: TxDetails) -> Result<(), WalletError> {
        let request = self.get_mut(request_id)?;
        if !request.status.is_active() {
            return Err(WalletError::InvalidState(format!(
                "Request {} is {:?}, only Active requests can be modified",
                request_id, request.status
            )));
        }
        request.details = details;
        Ok(())
    }

    /// Active -> Finalized (Transferred when created with the transfer
    /// flag). The bound address remains valid to receive further funds.
    pub fn finalize(&mut self, request_id: &str) -> Result<(), WalletError> {
        let request = self.get_mut(request_id)?;
        if !request.status.is_active() {
            return Err(WalletError::InvalidState(format!(
                "Request {} is {:?}, only Active requests can be finalized",
                request_id, request.status
            )));
        }
        request.status = if request.transfer {
            RequestStatus::Transferred
        } else {
            RequestStatus::Finalized
        };
        Ok(())
    }

    /// Active -> Canceled. The address is not reclaimed.
    pub fn cancel(&mut self, request_id: &str) -> Result<(), WalletError> {
        let request = self.get_mut(request_id)?;
        if !request.status.is_active() {
            return Err(WalletError::InvalidState(format!(
                "Request {} is {:?}, only Active requests can be canceled",
                request_id, request.status
            )));
        }
        request.status = RequestStatus::Canceled;
        Ok(())
    }

    /// Marks a transfer-flagged Active request as Transferred when its
    /// funds are folded into an outgoing send.
    pub fn mark_transferred(&mut self, address: &str) -> Option<String> {
        let request = self
            .requests
            .iter_mut()
            .find(|r| r.address == address && r.transfer && r.status.is_active())?;
        request.status = RequestStatus::Transferred;
        Some(request.request_id.clone())
    }

    /// Active requests in creation order.
    pub fn pending(&self) -> Vec<&ReceiveRequest> {
        self.requests.iter().filter(|r| r.status.is_active()).collect()
    }

    /// Credits the Active request bound to `address`, if any. Returns the
    /// request id and the new running total.
    pub fn credit(&mut self, address: &str, amount_satoshi: u64) -> Option<(String, u64)> {
        let request = self
            .requests
            .iter_mut()
            .find(|r| r.address == address && r.status.is_active())?;
        request.amount_received += amount_satoshi;
        Some((request.request_id.clone(), request.amount_received))
    }

    /// All bound addresses regardless of state; cancellation never
    /// removes an address from this set.
    pub fn addresses(&self) -> Vec<String> {
        self.requests.iter().map(|r| r.address.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
