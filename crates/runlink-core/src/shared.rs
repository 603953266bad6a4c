//! Shared broker handle
//!
//! Every broker operation runs to completion under one lock, so concurrent
//! callers observe the same serial order a single-threaded host would.

use std::sync::Arc;

use tokio::sync::Mutex;

use runlink_types::{Address, Amount, ExternalId, OracleEvent, RequestId, RequestTerms, Result};

use crate::oracle::{FulfillmentReceipt, Oracle, OracleSnapshot};

/// Cloneable, thread-safe handle to an [`Oracle`]
#[derive(Clone)]
pub struct SharedOracle {
    inner: Arc<Mutex<Oracle>>,
}

impl SharedOracle {
    pub fn new(oracle: Oracle) -> Self {
        Self {
            inner: Arc::new(Mutex::new(oracle)),
        }
    }

    /// Run `f` with exclusive access to the broker
    pub async fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Oracle) -> R,
    {
        let mut oracle = self.inner.lock().await;
        f(&mut oracle)
    }

    pub async fn transfer_and_call(
        &self,
        from: Address,
        amount: Amount,
        payload: Vec<u8>,
    ) -> Result<RequestId> {
        self.inner
            .lock()
            .await
            .transfer_and_call(&from, amount, &payload)
    }

    pub async fn fulfill(
        &self,
        caller: Address,
        id: RequestId,
        response: Vec<u8>,
        claimed: RequestTerms,
    ) -> Result<FulfillmentReceipt> {
        self.inner
            .lock()
            .await
            .fulfill(&caller, &id, &response, &claimed)
    }

    pub async fn fulfill_data(
        &self,
        caller: Address,
        id: RequestId,
        response: Vec<u8>,
    ) -> Result<FulfillmentReceipt> {
        self.inner.lock().await.fulfill_data(&caller, &id, &response)
    }

    pub async fn cancel(&self, caller: Address, id: RequestId) -> Result<Amount> {
        self.inner.lock().await.cancel(&caller, &id)
    }

    pub async fn cancel_by_external_id(
        &self,
        caller: Address,
        external_id: ExternalId,
    ) -> Result<Amount> {
        self.inner
            .lock()
            .await
            .cancel_by_external_id(&caller, &external_id)
    }

    pub async fn withdraw(&self, caller: Address, to: Address, amount: Amount) -> Result<()> {
        self.inner.lock().await.withdraw(&caller, to, amount)
    }

    pub async fn snapshot(&self) -> OracleSnapshot {
        self.inner.lock().await.snapshot()
    }

    pub async fn check_conservation(&self) -> Result<()> {
        self.inner.lock().await.check_conservation()
    }

    pub async fn take_events(&self) -> Vec<OracleEvent> {
        self.inner.lock().await.take_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::InMemoryToken;
    use runlink_types::{Selector, WorkRequest};

    #[tokio::test]
    async fn test_concurrent_requests_conserve_funds() {
        let owner = Address::from_label("owner");
        let mut token = InMemoryToken::new(Address::from_label("token"));
        let requesters: Vec<Address> = (0..8)
            .map(|i| Address::from_label(&format!("requester-{}", i)))
            .collect();
        for requester in &requesters {
            token.mint(*requester, Amount::new(100)).unwrap();
        }
        let shared = SharedOracle::new(Oracle::new(Address::from_label("oracle"), owner, token));

        let mut handles = Vec::new();
        for requester in requesters.clone() {
            let shared = shared.clone();
            handles.push(tokio::spawn(async move {
                let payload = WorkRequest::new(
                    "spec",
                    requester,
                    Selector::from_signature("callback(bytes32,bytes32)"),
                    "job",
                )
                .encode()
                .unwrap();
                shared
                    .transfer_and_call(requester, Amount::new(25), payload)
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        assert_eq!(shared.snapshot().await.total_held, Amount::new(200));

        // Fulfill half, cancel the rest
        for (i, id) in ids.iter().enumerate() {
            if i % 2 == 0 {
                shared.fulfill_data(owner, *id, b"ok".to_vec()).await.unwrap();
            } else {
                shared.cancel(requesters[i], *id).await.unwrap();
            }
        }

        let snapshot = shared.snapshot().await;
        assert_eq!(snapshot.withdrawable, Amount::new(100));
        assert_eq!(snapshot.reserved, Amount::zero());
        assert!(snapshot.open_requests.is_empty());
        shared.check_conservation().await.unwrap();

        shared
            .withdraw(owner, owner, Amount::new(100))
            .await
            .unwrap();
        let balance = shared.with(|oracle| oracle.token().balance_of(&owner)).await;
        assert_eq!(balance, Amount::new(100));
    }
}
