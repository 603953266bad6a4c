//! Request types for Runlink
//!
//! A request is open exactly while its slot holds [`RequestSlot::Open`]. The
//! terms recorded at creation are bound by a commitment digest; fulfillment and
//! cancellation re-derive that digest from the terms they are handed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Address, Amount, ExternalId, OracleError, Result, Selector, SpecId};

/// Payload version written when the requester does not pick one
pub const DEFAULT_PAYLOAD_VERSION: u64 = 1;

fn default_version() -> u64 {
    DEFAULT_PAYLOAD_VERSION
}

/// Work request carried as the payload of a payment notification
///
/// `sender` and `amount` are advisory. The gateway replaces both with the
/// values of the authenticated transfer before anything is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(default = "default_version")]
    pub version: u64,
    pub spec_id: SpecId,
    pub callback_address: Address,
    pub callback_selector: Selector,
    pub external_id: ExternalId,
    /// Opaque job parameters for the off-chain node
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WorkRequest {
    pub fn new(
        spec_id: impl Into<SpecId>,
        callback_address: Address,
        callback_selector: Selector,
        external_id: impl Into<ExternalId>,
    ) -> Self {
        Self {
            sender: None,
            amount: None,
            version: DEFAULT_PAYLOAD_VERSION,
            spec_id: spec_id.into(),
            callback_address,
            callback_selector,
            external_id: external_id.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Attach an advisory payment figure (never used for accounting)
    pub fn with_claimed_amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Attach an advisory sender (never used for identity)
    pub fn with_claimed_sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Encode as a notification payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a notification payload
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.is_empty() {
            return Err(OracleError::malformed("empty payload"));
        }
        serde_json::from_slice(payload).map_err(|e| OracleError::malformed(e.to_string()))
    }
}

/// Terms a request is created under and must be settled under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTerms {
    /// Amount actually escrowed
    pub amount: Amount,
    pub callback_address: Address,
    pub callback_selector: Selector,
    pub external_id: ExternalId,
    /// Recorded and committed to, not enforced
    pub expiration: DateTime<Utc>,
}

/// Hex digest binding a request's terms
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitmentDigest(pub String);

impl fmt::Display for CommitmentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An open request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRequest {
    /// Only this identity may cancel
    pub requester: Address,
    pub spec_id: SpecId,
    pub terms: RequestTerms,
    pub commitment: CommitmentDigest,
    pub created_at: DateTime<Utc>,
}

/// State of a request id
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RequestSlot {
    /// Escrowed and awaiting exactly one of fulfillment or cancellation
    Open(OpenRequest),
    /// Never created, fulfilled, or cancelled
    #[default]
    Absent,
}

impl RequestSlot {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    pub fn as_open(&self) -> Option<&OpenRequest> {
        match self {
            Self::Open(open) => Some(open),
            Self::Absent => None,
        }
    }

    /// Close the slot, returning what was open
    pub fn take(&mut self) -> Option<OpenRequest> {
        match std::mem::take(self) {
            Self::Open(open) => Some(open),
            Self::Absent => None,
        }
    }
}
