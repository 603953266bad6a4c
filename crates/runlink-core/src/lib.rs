//! Runlink Core - Payment-escrowed request/callback broker
//!
//! A requester pays the broker through the payment token and names a
//! callback; the operator later fulfills the request, earning the payment,
//! and the broker delivers the response to the callback. Requesters may
//! cancel open requests for a full refund.
//!
//! # Guarantees
//!
//! 1. A request terminates at most once, by fulfillment or by cancellation
//! 2. Funds reserved for open requests are never withdrawable
//! 3. Payment sender and amount come from the token, never from the payload
//! 4. Fulfillment terms must match the commitment recorded at creation
//! 5. Broker state is final before any consumer code runs
//! 6. No consumer behaviour can fail a fulfillment

pub mod access;
pub mod config;
pub mod consumer;
pub mod crypto;
mod gateway;
pub mod invoker;
pub mod ledger;
pub mod oracle;
pub mod registry;
pub mod shared;
pub mod token;

pub use access::*;
pub use config::*;
pub use consumer::*;
pub use crypto::*;
pub use invoker::*;
pub use ledger::*;
pub use oracle::*;
pub use registry::*;
pub use shared::*;
pub use token::*;
