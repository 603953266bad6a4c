//! The request broker
//!
//! Every state-changing operation takes the identity of its immediate caller
//! and follows the same order: check the caller and the request, update the
//! registry and the escrow ledger, then make external calls. Consumer code
//! only runs once the broker's own state is final.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use runlink_types::{
    Address, Amount, CallbackOutcome, ExternalId, OracleError, OracleEvent, RequestId,
    RequestSlot, RequestTerms, Result, SpecId,
};

use crate::access::{AccessControl, OwnershipChange};
use crate::config::OracleConfig;
use crate::consumer::{Consumer, ConsumerDirectory};
use crate::invoker::CallbackInvoker;
use crate::ledger::EscrowLedger;
use crate::registry::RequestRegistry;
use crate::token::PaymentLedger;

/// Result of a successful fulfillment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentReceipt {
    pub internal_id: RequestId,
    /// Amount moved to the operator's withdrawable balance
    pub settled: Amount,
    /// What happened to the consumer callback
    pub outcome: CallbackOutcome,
}

/// Public view of an open request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRequestView {
    pub internal_id: RequestId,
    pub requester: Address,
    pub spec_id: SpecId,
    pub amount: Amount,
    pub callback_address: Address,
    pub external_id: ExternalId,
    pub expiration: DateTime<Utc>,
}

/// Point-in-time state of the broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSnapshot {
    pub address: Address,
    pub owner: Option<Address>,
    pub token: Address,
    pub token_balance: Amount,
    pub total_held: Amount,
    pub withdrawable: Amount,
    pub reserved: Amount,
    pub open_requests: Vec<OpenRequestView>,
    pub consumers: usize,
    pub events: usize,
    pub taken_at: DateTime<Utc>,
}

/// Payment-escrowed request/callback broker
pub struct Oracle {
    pub(crate) address: Address,
    pub(crate) config: OracleConfig,
    access: AccessControl,
    pub(crate) registry: RequestRegistry,
    pub(crate) ledger: EscrowLedger,
    token: Box<dyn PaymentLedger>,
    pub(crate) consumers: ConsumerDirectory,
    invoker: CallbackInvoker,
    events: Vec<OracleEvent>,
    pub(crate) call_depth: u32,
}

impl Oracle {
    /// Create a broker at `address`, owned by `owner`, paid in `token`
    pub fn new(address: Address, owner: Address, token: impl PaymentLedger + 'static) -> Self {
        let config = OracleConfig::default();
        let invoker = CallbackInvoker::new(config.callback);
        info!("Oracle {} created for owner {}", address, owner);
        Self {
            address,
            config,
            access: AccessControl::new(owner),
            registry: RequestRegistry::new(),
            ledger: EscrowLedger::new(),
            token: Box::new(token),
            consumers: ConsumerDirectory::new(),
            invoker,
            events: Vec::new(),
            call_depth: 0,
        }
    }

    /// Replace the default configuration
    pub fn with_config(mut self, config: OracleConfig) -> Result<Self> {
        if let Err(errors) = config.validate() {
            return Err(OracleError::InvalidConfig {
                field: "oracle".to_string(),
                reason: errors.join("; "),
            });
        }
        self.invoker = CallbackInvoker::new(config.callback);
        self.config = config;
        Ok(self)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    pub fn owner(&self) -> Option<&Address> {
        self.access.owner()
    }

    pub fn token(&self) -> &dyn PaymentLedger {
        self.token.as_ref()
    }

    pub fn token_mut(&mut self) -> &mut dyn PaymentLedger {
        self.token.as_mut()
    }

    pub fn consumers_mut(&mut self) -> &mut ConsumerDirectory {
        &mut self.consumers
    }

    /// Deploy consumer code at `address`
    pub fn deploy_consumer(&mut self, address: Address, consumer: Arc<dyn Consumer>) {
        self.consumers.deploy(address, consumer);
    }

    // --- Ownership ---

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<()> {
        let change = self.access.transfer_ownership(caller, new_owner)?;
        self.record_ownership(change);
        Ok(())
    }

    pub fn renounce_ownership(&mut self, caller: &Address) -> Result<()> {
        let change = self.access.renounce_ownership(caller)?;
        self.record_ownership(change);
        Ok(())
    }

    fn record_ownership(&mut self, change: OwnershipChange) {
        self.emit(OracleEvent::OwnershipTransferred {
            previous_owner: change.previous_owner,
            new_owner: change.new_owner,
            timestamp: Utc::now(),
        });
    }

    // --- Fulfillment ---

    /// Deliver `response` for request `id` under the terms the operator claims
    ///
    /// The claimed terms must reproduce the commitment recorded at creation.
    /// The request is closed and its payment earned before the consumer is
    /// called; a failing callback does not undo either.
    pub fn fulfill(
        &mut self,
        caller: &Address,
        id: &RequestId,
        response: &[u8],
        claimed: &RequestTerms,
    ) -> Result<FulfillmentReceipt> {
        self.access.require_owner(caller)?;

        let open = self.registry.verify_and_consume(id, claimed)?;
        let amount = open.terms.amount;
        if let Err(e) = self.ledger.settle(amount) {
            self.registry.restore(*id, open);
            return Err(e);
        }
        info!("Request {} fulfilled, {} earned", id, amount);

        let terms = open.terms;
        let invoker = self.invoker;
        let outcome = invoker.invoke(
            self,
            &terms.callback_address,
            &terms.callback_selector,
            &terms.external_id,
            response,
        );

        self.emit(OracleEvent::RequestFulfilled {
            internal_id: *id,
            amount,
            outcome: outcome.clone(),
            timestamp: Utc::now(),
        });

        Ok(FulfillmentReceipt {
            internal_id: *id,
            settled: amount,
            outcome,
        })
    }

    /// Fulfill using the terms the broker recorded
    pub fn fulfill_data(
        &mut self,
        caller: &Address,
        id: &RequestId,
        response: &[u8],
    ) -> Result<FulfillmentReceipt> {
        self.access.require_owner(caller)?;
        let terms = self.request_terms(id)?;
        self.fulfill(caller, id, response, &terms)
    }

    // --- Cancellation ---

    /// Cancel an open request and refund its payment to the requester
    pub fn cancel(&mut self, caller: &Address, id: &RequestId) -> Result<Amount> {
        let open = self.registry.cancel(id, caller)?;
        let amount = open.terms.amount;

        if let Err(e) = self
            .ledger
            .refund(self.token.as_mut(), &self.address, caller, amount)
        {
            self.registry.restore(*id, open);
            return Err(e);
        }

        info!("Request {} cancelled, {} refunded to {}", id, amount, caller);
        self.emit(OracleEvent::RequestCancelled {
            internal_id: *id,
            requester: *caller,
            refunded: amount,
            timestamp: Utc::now(),
        });
        Ok(amount)
    }

    /// Cancel the caller's request carrying `external_id`
    pub fn cancel_by_external_id(
        &mut self,
        caller: &Address,
        external_id: &ExternalId,
    ) -> Result<Amount> {
        let id = RequestId::derive(caller, external_id);
        self.cancel(caller, &id)
    }

    // --- Earnings ---

    /// Pay earned funds to `to`
    pub fn withdraw(&mut self, caller: &Address, to: Address, amount: Amount) -> Result<()> {
        self.access.require_owner(caller)?;
        self.ledger
            .withdraw(self.token.as_mut(), &self.address, &to, amount)?;
        self.emit(OracleEvent::Withdrawn {
            to,
            amount,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub fn withdrawable(&self) -> Amount {
        self.ledger.withdrawable()
    }

    pub fn total_held(&self) -> Amount {
        self.ledger.total_held()
    }

    // --- Queries ---

    pub fn slot(&self, id: &RequestId) -> &RequestSlot {
        self.registry.slot(id)
    }

    /// Terms recorded for an open request
    pub fn request_terms(&self, id: &RequestId) -> Result<RequestTerms> {
        self.registry
            .get(id)
            .map(|open| open.terms.clone())
            .ok_or_else(|| OracleError::UnknownRequest {
                request_id: id.to_string(),
            })
    }

    pub fn open_requests(&self) -> Vec<OpenRequestView> {
        let mut views: Vec<OpenRequestView> = self
            .registry
            .open_requests()
            .map(|(id, open)| OpenRequestView {
                internal_id: *id,
                requester: open.requester,
                spec_id: open.spec_id.clone(),
                amount: open.terms.amount,
                callback_address: open.terms.callback_address,
                external_id: open.terms.external_id.clone(),
                expiration: open.terms.expiration,
            })
            .collect();
        views.sort_by_key(|view| view.internal_id);
        views
    }

    /// Drop closed request slots
    pub fn compact(&mut self) -> usize {
        let removed = self.registry.compact();
        debug!("Compacted {} closed request slots", removed);
        removed
    }

    pub fn events(&self) -> &[OracleEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<OracleEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> OracleSnapshot {
        OracleSnapshot {
            address: self.address,
            owner: self.access.owner().copied(),
            token: *self.token.address(),
            token_balance: self.token.balance_of(&self.address),
            total_held: self.ledger.total_held(),
            withdrawable: self.ledger.withdrawable(),
            reserved: self.ledger.reserved(),
            open_requests: self.open_requests(),
            consumers: self.consumers.len(),
            events: self.events.len(),
            taken_at: Utc::now(),
        }
    }

    /// Verify the escrow accounting
    ///
    /// Reserved funds must equal the sum over open requests, and the broker's
    /// token balance must cover everything it holds.
    pub fn check_conservation(&self) -> Result<()> {
        let held = self.ledger.total_held();
        let withdrawable = self.ledger.withdrawable();
        let open_sum = self.registry.reserved_total()?;

        let reserved = held.checked_sub(withdrawable);
        let balance = self.token.balance_of(&self.address);
        if reserved != Some(open_sum) || balance < held {
            warn!(
                "Escrow mismatch: held {}, withdrawable {}, open {}, balance {}",
                held, withdrawable, open_sum, balance
            );
            return Err(OracleError::ConservationViolation {
                held: held.0,
                withdrawable: withdrawable.0,
                reserved: open_sum.0,
            });
        }
        Ok(())
    }

    pub(crate) fn emit(&mut self, event: OracleEvent) {
        debug!("Event {}", event.name());
        self.events.push(event);
    }
}

impl std::fmt::Debug for Oracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Oracle")
            .field("address", &self.address)
            .field("owner", &self.access.owner())
            .field("token", self.token.address())
            .field("ledger", &self.ledger)
            .field("open_requests", &self.registry.open_count())
            .field("consumers", &self.consumers)
            .finish()
    }
}
