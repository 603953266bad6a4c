//! Request registry
//!
//! Maps internal request ids to request slots. A slot is closed before any
//! caller sees the terms it held, so once `verify_and_consume` or `cancel`
//! succeeds every later attempt on the same id fails with `UnknownRequest`.

use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;

use runlink_types::{
    Address, Amount, OpenRequest, OracleError, RequestId, RequestSlot, RequestTerms, Result,
    SpecId,
};

use crate::crypto::commitment_digest;

static ABSENT: RequestSlot = RequestSlot::Absent;

/// Registry of request slots keyed by internal id
#[derive(Debug, Clone, Default)]
pub struct RequestRegistry {
    slots: HashMap<RequestId, RequestSlot>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for `id`; ids never seen are `Absent`
    pub fn slot(&self, id: &RequestId) -> &RequestSlot {
        self.slots.get(id).unwrap_or(&ABSENT)
    }

    pub fn get(&self, id: &RequestId) -> Option<&OpenRequest> {
        self.slot(id).as_open()
    }

    pub fn is_open(&self, id: &RequestId) -> bool {
        self.slot(id).is_open()
    }

    /// Open a request under `terms` for `requester`
    pub fn create(
        &mut self,
        requester: Address,
        spec_id: SpecId,
        terms: RequestTerms,
    ) -> Result<RequestId> {
        let id = RequestId::derive(&requester, &terms.external_id);
        if self.is_open(&id) {
            return Err(OracleError::DuplicateRequest {
                request_id: id.to_string(),
            });
        }

        let commitment = commitment_digest(&terms)?;
        self.slots.insert(
            id,
            RequestSlot::Open(OpenRequest {
                requester,
                spec_id,
                terms,
                commitment,
                created_at: Utc::now(),
            }),
        );
        Ok(id)
    }

    /// Check `claimed` against the stored commitment and close the slot
    pub fn verify_and_consume(
        &mut self,
        id: &RequestId,
        claimed: &RequestTerms,
    ) -> Result<OpenRequest> {
        let open = self.get(id).ok_or_else(|| unknown(id))?;
        if commitment_digest(claimed)? != open.commitment {
            debug!("Rejected terms for request {}", id);
            return Err(OracleError::TermMismatch {
                request_id: id.to_string(),
            });
        }
        self.close(id)
    }

    /// Close the slot on behalf of its requester
    pub fn cancel(&mut self, id: &RequestId, requester: &Address) -> Result<OpenRequest> {
        let open = self.get(id).ok_or_else(|| unknown(id))?;
        if &open.requester != requester {
            return Err(OracleError::unauthorized(format!(
                "{} did not create request {}",
                requester, id
            )));
        }
        self.close(id)
    }

    /// Reopen a slot closed by a call that is being rolled back
    pub(crate) fn restore(&mut self, id: RequestId, open: OpenRequest) {
        self.slots.insert(id, RequestSlot::Open(open));
    }

    /// Open requests
    pub fn open_requests(&self) -> impl Iterator<Item = (&RequestId, &OpenRequest)> {
        self.slots
            .iter()
            .filter_map(|(id, slot)| slot.as_open().map(|open| (id, open)))
    }

    pub fn open_count(&self) -> usize {
        self.open_requests().count()
    }

    /// Sum of escrowed amounts over open requests
    pub fn reserved_total(&self) -> Result<Amount> {
        Amount::checked_sum(self.open_requests().map(|(_, open)| open.terms.amount))
            .ok_or(OracleError::AmountOverflow)
    }

    /// Drop closed slots; returns how many were removed
    pub fn compact(&mut self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.is_open());
        before - self.slots.len()
    }

    fn close(&mut self, id: &RequestId) -> Result<OpenRequest> {
        self.slots
            .get_mut(id)
            .and_then(RequestSlot::take)
            .ok_or_else(|| unknown(id))
    }
}

fn unknown(id: &RequestId) -> OracleError {
    OracleError::UnknownRequest {
        request_id: id.to_string(),
    }
}
