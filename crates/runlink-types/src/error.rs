//! Error types for Runlink
//!
//! Every broker error is a synchronous rejection of the current call. A call
//! that returns an error has had no effect on shared state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for Runlink operations
pub type Result<T> = std::result::Result<T, OracleError>;

/// Runlink error types
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum OracleError {
    // ========================================================================
    // Access Errors
    // ========================================================================

    /// Wrong caller identity for the attempted operation
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Payment notification from anything but the payment token
    #[error("Unauthorized caller {caller}: only the payment token may notify payments")]
    UnauthorizedCaller { caller: String },

    // ========================================================================
    // Request Errors
    // ========================================================================

    /// No open commitment for the id (never existed, fulfilled or cancelled)
    #[error("Unknown request {request_id}")]
    UnknownRequest { request_id: String },

    /// Caller-supplied terms do not hash to the stored commitment
    #[error("Terms for request {request_id} do not match the stored commitment")]
    TermMismatch { request_id: String },

    /// The request id is already open
    #[error("Request {request_id} is already open")]
    DuplicateRequest { request_id: String },

    // ========================================================================
    // Payment Errors
    // ========================================================================

    /// Payload could not be decoded into a work request
    #[error("Malformed payload: {reason}")]
    MalformedPayload { reason: String },

    /// Request creation attempted without an accompanying payment
    #[error("Payment required: requests must arrive through the payment token")]
    PaymentRequired,

    /// Withdrawal exceeds the earned balance
    #[error("Insufficient withdrawable balance: requested {requested}, available {available}")]
    InsufficientWithdrawable { requested: u128, available: u128 },

    /// Token transfer exceeds the sender's balance
    #[error("Insufficient balance for {account}: requested {requested}, available {available}")]
    InsufficientBalance {
        account: String,
        requested: u128,
        available: u128,
    },

    /// Amount overflow during arithmetic
    #[error("Amount overflow during arithmetic operation")]
    AmountOverflow,

    /// Escrow accounting no longer balances
    #[error("Conservation violation: held {held}, withdrawable {withdrawable}, reserved {reserved}")]
    ConservationViolation {
        held: u128,
        withdrawable: u128,
        reserved: u128,
    },

    // ========================================================================
    // General Errors
    // ========================================================================

    /// Invalid input
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    /// Serialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl OracleError {
    /// Create an unauthorized error
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed payload error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }

    /// Check if the error stems from the caller's input rather than broker state
    pub fn is_caller_error(&self) -> bool {
        !matches!(
            self,
            Self::AmountOverflow | Self::ConservationViolation { .. } | Self::Serialization { .. }
        )
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::UnauthorizedCaller { .. } => "UNAUTHORIZED_CALLER",
            Self::UnknownRequest { .. } => "UNKNOWN_REQUEST",
            Self::TermMismatch { .. } => "TERM_MISMATCH",
            Self::DuplicateRequest { .. } => "DUPLICATE_REQUEST",
            Self::MalformedPayload { .. } => "MALFORMED_PAYLOAD",
            Self::PaymentRequired => "PAYMENT_REQUIRED",
            Self::InsufficientWithdrawable { .. } => "INSUFFICIENT_WITHDRAWABLE",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::ConservationViolation { .. } => "CONSERVATION_VIOLATION",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::Serialization { .. } => "SERIALIZATION_ERROR",
        }
    }
}

impl From<serde_json::Error> for OracleError {
    fn from(e: serde_json::Error) -> Self {
        OracleError::Serialization {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = OracleError::InsufficientWithdrawable {
            requested: 101,
            available: 100,
        };
        assert_eq!(err.error_code(), "INSUFFICIENT_WITHDRAWABLE");
        assert_eq!(OracleError::PaymentRequired.error_code(), "PAYMENT_REQUIRED");
    }

    #[test]
    fn test_caller_errors() {
        assert!(OracleError::unauthorized("not owner").is_caller_error());
        assert!(!OracleError::AmountOverflow.is_caller_error());
    }

    #[test]
    fn test_display() {
        let err = OracleError::UnknownRequest {
            request_id: "0xdead".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown request 0xdead");
    }
}
