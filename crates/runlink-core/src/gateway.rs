//! Payment gateway
//!
//! Requests are opened only by a payment notification from the configured
//! token. The sender and amount of the transfer are authoritative; whatever
//! the payload claims about them is ignored.

use chrono::{DateTime, Duration, DurationRound, Utc};
use tracing::{debug, info, warn};

use runlink_types::{
    Address, Amount, OracleError, OracleEvent, RequestId, RequestTerms, Result, WorkRequest,
};

use crate::oracle::Oracle;

impl Oracle {
    /// Token callback after `amount` moved from `sender` to the broker
    pub fn on_token_transfer(
        &mut self,
        caller: &Address,
        sender: Address,
        amount: Amount,
        payload: &[u8],
    ) -> Result<RequestId> {
        if caller != self.token().address() {
            return Err(OracleError::UnauthorizedCaller {
                caller: caller.to_string(),
            });
        }

        let request = WorkRequest::decode(payload)?;
        self.request_data(caller, sender, amount, request)
    }

    /// Open a request paid for by `sender`
    ///
    /// Only reachable through the token; any other caller has not paid.
    pub fn request_data(
        &mut self,
        caller: &Address,
        sender: Address,
        amount: Amount,
        request: WorkRequest,
    ) -> Result<RequestId> {
        if caller != self.token().address() {
            return Err(OracleError::PaymentRequired);
        }

        if request.sender.is_some_and(|claimed| claimed != sender) {
            warn!("Ignoring claimed sender in payload from {}", sender);
        }
        if request.amount.is_some_and(|claimed| claimed != amount) {
            warn!("Ignoring claimed amount in payload from {}", sender);
        }

        let expiration = self.expiration_from(Utc::now())?;
        let terms = RequestTerms {
            amount,
            callback_address: request.callback_address,
            callback_selector: request.callback_selector,
            external_id: request.external_id,
            expiration,
        };

        let mut ledger = self.ledger;
        ledger.receive(amount)?;
        let id = self
            .registry
            .create(sender, request.spec_id.clone(), terms)?;
        self.ledger = ledger;

        info!("Request {} opened by {} for {}", id, sender, amount);
        self.emit(OracleEvent::RunRequest {
            internal_id: id,
            requester: sender,
            spec_id: request.spec_id,
            amount,
            version: request.version,
            data: request.data,
            timestamp: Utc::now(),
        });
        Ok(id)
    }

    /// Expiration recorded for a request created at `now`, in whole seconds
    fn expiration_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let expiry = self.config.request_expiry_secs;
        let out_of_range = || OracleError::InvalidConfig {
            field: "request_expiry_secs".to_string(),
            reason: format!("{} seconds is out of range", expiry),
        };

        let expiration = Duration::try_seconds(expiry)
            .and_then(|delta| now.checked_add_signed(delta))
            .ok_or_else(out_of_range)?;
        expiration
            .duration_trunc(Duration::seconds(1))
            .map_err(|e| OracleError::invalid_input("expiration", e.to_string()))
    }

    /// Move `amount` from `from` to the broker and notify it in one step
    ///
    /// If the broker rejects the notification the transfer is undone.
    pub fn transfer_and_call(
        &mut self,
        from: &Address,
        amount: Amount,
        payload: &[u8],
    ) -> Result<RequestId> {
        let oracle = *self.address();
        let token = *self.token().address();
        self.token_mut().transfer(from, &oracle, amount)?;

        match self.on_token_transfer(&token, *from, amount, payload) {
            Ok(id) => Ok(id),
            Err(e) => {
                debug!("Notification from {} rejected: {}", from, e);
                self.token_mut().transfer(&oracle, from, amount)?;
                Err(e)
            }
        }
    }
}
