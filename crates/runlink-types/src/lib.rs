//! Runlink Types - Canonical domain types for the payment-escrowed request broker
//!
//! This crate contains the foundational types shared by the broker and its
//! tooling, with zero dependencies on other runlink crates:
//!
//! - Identity types (Address, RequestId, ExternalId, SpecId, Selector)
//! - Token amounts with checked arithmetic
//! - Work request payloads, request terms and request slots
//! - Callback outcomes and faults
//! - Broker events and errors
//!
//! # Request Lifecycle
//!
//! ```text
//! payment + payload ─→ Open(terms) ─┬─ fulfill ─→ Absent (settled to operator)
//!                                   └─ cancel  ─→ Absent (refunded to requester)
//! ```

pub mod identity;
pub mod amount;
pub mod request;
pub mod callback;
pub mod event;
pub mod error;

pub use identity::*;
pub use amount::*;
pub use request::*;
pub use callback::*;
pub use event::*;
pub use error::*;

/// Version of the Runlink types schema
pub const TYPES_VERSION: &str = "0.1.0";
