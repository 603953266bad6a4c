//! Broker events for off-chain discovery and audit
//!
//! Events are recorded in the order the broker's state transitions happen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, CallbackOutcome, RequestId, SpecId};

/// Events emitted by the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OracleEvent {
    /// A paid request was opened; the operator discovers work through this
    RunRequest {
        internal_id: RequestId,
        requester: Address,
        spec_id: SpecId,
        amount: Amount,
        version: u64,
        data: serde_json::Value,
        timestamp: DateTime<Utc>,
    },

    /// Ownership moved (`None` when renounced)
    OwnershipTransferred {
        previous_owner: Option<Address>,
        new_owner: Option<Address>,
        timestamp: DateTime<Utc>,
    },

    /// Request settled to the operator and its callback attempted
    RequestFulfilled {
        internal_id: RequestId,
        amount: Amount,
        outcome: CallbackOutcome,
        timestamp: DateTime<Utc>,
    },

    /// Request cancelled and refunded to its requester
    RequestCancelled {
        internal_id: RequestId,
        requester: Address,
        refunded: Amount,
        timestamp: DateTime<Utc>,
    },

    /// Earned funds paid out
    Withdrawn {
        to: Address,
        amount: Amount,
        timestamp: DateTime<Utc>,
    },
}

impl OracleEvent {
    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunRequest { .. } => "RunRequest",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
            Self::RequestFulfilled { .. } => "RequestFulfilled",
            Self::RequestCancelled { .. } => "RequestCancelled",
            Self::Withdrawn { .. } => "Withdrawn",
        }
    }

    /// Request the event concerns, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            Self::RunRequest { internal_id, .. }
            | Self::RequestFulfilled { internal_id, .. }
            | Self::RequestCancelled { internal_id, .. } => Some(internal_id),
            Self::OwnershipTransferred { .. } | Self::Withdrawn { .. } => None,
        }
    }
}
