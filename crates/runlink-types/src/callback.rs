//! Callback outcome types
//!
//! A consumer callback can fail in many ways. None of them is a broker error:
//! they are captured as a [`CallbackOutcome`] and reported alongside a
//! successful fulfillment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::OracleError;

/// Why a consumer callback did not complete
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallbackFault {
    /// Consumer reverted with a reason
    #[error("callback reverted: {reason}")]
    Reverted { reason: String },

    /// Consumer panicked (assertion failure, arithmetic fault, ...)
    #[error("callback panicked: {message}")]
    Panicked { message: String },

    /// A broker call made from inside the callback was rejected
    #[error("re-entrant call rejected: {error}")]
    Rejected { error: OracleError },

    /// Consumer made more broker calls than the callback budget allows
    #[error("callback exhausted its budget of {limit} broker calls")]
    BudgetExhausted { limit: u32 },

    /// Callback would exceed the nested callback depth
    #[error("callback depth limit {limit} exceeded")]
    DepthExceeded { limit: u32 },

    /// Consumer does not recognise the selector
    #[error("no entry point for selector {selector}")]
    UnknownSelector { selector: String },
}

impl CallbackFault {
    pub fn revert(reason: impl Into<String>) -> Self {
        Self::Reverted {
            reason: reason.into(),
        }
    }
}

impl From<OracleError> for CallbackFault {
    fn from(error: OracleError) -> Self {
        Self::Rejected { error }
    }
}

/// Result of invoking a consumer callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// The callback ran to completion
    Delivered,
    /// The callback failed; the failure stayed inside the callback
    Faulted { fault: CallbackFault },
    /// No code at the callback address
    NoCode,
}

impl CallbackOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    pub fn fault(&self) -> Option<&CallbackFault> {
        match self {
            Self::Faulted { fault } => Some(fault),
            _ => None,
        }
    }
}
