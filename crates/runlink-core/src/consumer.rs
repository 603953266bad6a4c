//! Consumer callbacks
//!
//! A consumer is untrusted code registered at an address. When one of its
//! requests is fulfilled the broker calls [`Consumer::on_callback`] with a
//! [`CallbackContext`], the only way back into the broker during the call.
//! The context fixes the caller identity to the consumer's own address and
//! charges every broker call against the callback budget.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use runlink_types::{
    Address, Amount, CallbackFault, ExternalId, RequestId, Selector, WorkRequest,
};

use crate::oracle::{FulfillmentReceipt, Oracle};

/// Result type for consumer code
pub type CallbackResult<T> = std::result::Result<T, CallbackFault>;

/// Code the broker calls back on fulfillment
pub trait Consumer: Send + Sync {
    fn on_callback(
        &self,
        ctx: &mut CallbackContext<'_>,
        selector: &Selector,
        external_id: &ExternalId,
        response: &[u8],
    ) -> CallbackResult<()>;
}

/// Consumers deployed at addresses
#[derive(Default, Clone)]
pub struct ConsumerDirectory {
    consumers: HashMap<Address, Arc<dyn Consumer>>,
}

impl ConsumerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy `consumer` at `address`, replacing whatever was there
    pub fn deploy(&mut self, address: Address, consumer: Arc<dyn Consumer>) {
        self.consumers.insert(address, consumer);
    }

    pub fn get(&self, address: &Address) -> Option<Arc<dyn Consumer>> {
        self.consumers.get(address).cloned()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.consumers.contains_key(address)
    }

    /// Remove the code at `address`; later callbacks find nothing there
    pub fn remove(&mut self, address: &Address) -> bool {
        self.consumers.remove(address).is_some()
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }
}

impl std::fmt::Debug for ConsumerDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.consumers.keys()).finish()
    }
}

/// Handle a consumer holds while its callback runs
pub struct CallbackContext<'a> {
    oracle: &'a mut Oracle,
    address: Address,
    remaining_calls: u32,
    limit: u32,
    destroyed: bool,
}

impl<'a> CallbackContext<'a> {
    pub(crate) fn new(oracle: &'a mut Oracle, address: Address, limit: u32) -> Self {
        Self {
            oracle,
            address,
            remaining_calls: limit,
            limit,
            destroyed: false,
        }
    }

    /// Address the callback runs as
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Broker calls left in this callback
    pub fn remaining_calls(&self) -> u32 {
        self.remaining_calls
    }

    /// Token balance of this consumer
    pub fn balance(&self) -> Amount {
        self.oracle.token().balance_of(&self.address)
    }

    /// Whether `id` is still open
    pub fn is_open(&self, id: &RequestId) -> bool {
        self.oracle.slot(id).is_open()
    }

    /// Cancel one of this consumer's own requests
    pub fn cancel(&mut self, id: &RequestId) -> CallbackResult<Amount> {
        self.charge()?;
        let caller = self.address;
        Ok(self.oracle.cancel(&caller, id)?)
    }

    pub fn cancel_by_external_id(&mut self, external_id: &ExternalId) -> CallbackResult<Amount> {
        self.charge()?;
        let caller = self.address;
        Ok(self.oracle.cancel_by_external_id(&caller, external_id)?)
    }

    /// Attempt a fulfillment as this consumer
    pub fn fulfill_data(
        &mut self,
        id: &RequestId,
        response: &[u8],
    ) -> CallbackResult<FulfillmentReceipt> {
        self.charge()?;
        let caller = self.address;
        Ok(self.oracle.fulfill_data(&caller, id, response)?)
    }

    /// Attempt a withdrawal as this consumer
    pub fn withdraw(&mut self, to: Address, amount: Amount) -> CallbackResult<()> {
        self.charge()?;
        let caller = self.address;
        Ok(self.oracle.withdraw(&caller, to, amount)?)
    }

    /// Pay for a new request from this consumer's balance
    pub fn transfer_and_call(
        &mut self,
        amount: Amount,
        request: &WorkRequest,
    ) -> CallbackResult<RequestId> {
        self.charge()?;
        let payload = request.encode()?;
        let caller = self.address;
        Ok(self.oracle.transfer_and_call(&caller, amount, &payload)?)
    }

    /// Plain token transfer out of this consumer's balance
    pub fn transfer(&mut self, to: Address, amount: Amount) -> CallbackResult<()> {
        self.charge()?;
        let caller = self.address;
        Ok(self.oracle.token_mut().transfer(&caller, &to, amount)?)
    }

    /// Remove this consumer's code once the callback returns
    pub fn self_destruct(&mut self) {
        self.destroyed = true;
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn charge(&mut self) -> CallbackResult<()> {
        if self.remaining_calls == 0 {
            return Err(CallbackFault::BudgetExhausted { limit: self.limit });
        }
        self.remaining_calls -= 1;
        Ok(())
    }
}

/// A delivered response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedResponse {
    pub selector: Selector,
    pub external_id: ExternalId,
    pub response: Vec<u8>,
}

/// Consumer that stores every response it is handed
#[derive(Debug, Default)]
pub struct RecordingConsumer {
    received: Mutex<Vec<RecordedResponse>>,
}

impl RecordingConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<RecordedResponse> {
        self.received.lock().clone()
    }

    /// Most recent response, if any
    pub fn last(&self) -> Option<RecordedResponse> {
        self.received.lock().last().cloned()
    }
}

impl Consumer for RecordingConsumer {
    fn on_callback(
        &self,
        _ctx: &mut CallbackContext<'_>,
        selector: &Selector,
        external_id: &ExternalId,
        response: &[u8],
    ) -> CallbackResult<()> {
        self.received.lock().push(RecordedResponse {
            selector: *selector,
            external_id: external_id.clone(),
            response: response.to_vec(),
        });
        Ok(())
    }
}
