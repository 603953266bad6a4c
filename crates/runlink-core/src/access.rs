//! Single-owner access control
//!
//! The owner is the operator: the only identity allowed to fulfill requests
//! and withdraw earnings. Cancellation is gated by request ownership instead
//! and never consults this module.

use serde::{Deserialize, Serialize};
use tracing::info;

use runlink_types::{Address, OracleError, Result};

/// Ownership change produced by a successful transfer or renunciation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipChange {
    pub previous_owner: Option<Address>,
    pub new_owner: Option<Address>,
}

/// Owner gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Option<Address>,
}

impl AccessControl {
    pub fn new(owner: Address) -> Self {
        Self { owner: Some(owner) }
    }

    /// Current owner; `None` once renounced
    pub fn owner(&self) -> Option<&Address> {
        self.owner.as_ref()
    }

    pub fn is_owner(&self, caller: &Address) -> bool {
        self.owner.as_ref() == Some(caller)
    }

    /// Fail with `Unauthorized` unless `caller` is the owner
    pub fn require_owner(&self, caller: &Address) -> Result<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(OracleError::unauthorized(format!(
                "{} is not the owner",
                caller
            )))
        }
    }

    /// Hand ownership to `new_owner`
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<OwnershipChange> {
        self.require_owner(caller)?;
        if new_owner.is_zero() {
            return Err(OracleError::invalid_input(
                "new_owner",
                "ownership cannot be transferred to the zero address",
            ));
        }

        let previous_owner = self.owner.replace(new_owner);
        info!("Ownership transferred from {} to {}", caller, new_owner);
        Ok(OwnershipChange {
            previous_owner,
            new_owner: Some(new_owner),
        })
    }

    /// Give up ownership; owner-gated operations become unreachable
    pub fn renounce_ownership(&mut self, caller: &Address) -> Result<OwnershipChange> {
        self.require_owner(caller)?;
        let previous_owner = self.owner.take();
        info!("Ownership renounced by {}", caller);
        Ok(OwnershipChange {
            previous_owner,
            new_owner: None,
        })
    }
}
