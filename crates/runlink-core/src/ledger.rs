//! Escrow ledger
//!
//! Two scalars describe every unit of token the broker holds:
//!
//! - `total_held`: everything received for requests and not yet paid out
//! - `withdrawable`: the earned part of `total_held`
//!
//! The difference is reserved for open requests. Every method keeps
//! `withdrawable <= total_held`, and payouts restore the ledger if the token
//! refuses the transfer.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use runlink_types::{Address, Amount, OracleError, Result};

use crate::token::PaymentLedger;

/// Broker-wide escrow accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowLedger {
    total_held: Amount,
    withdrawable: Amount,
}

impl EscrowLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_held(&self) -> Amount {
        self.total_held
    }

    pub fn withdrawable(&self) -> Amount {
        self.withdrawable
    }

    /// Funds backing open requests
    pub fn reserved(&self) -> Amount {
        self.total_held
            .checked_sub(self.withdrawable)
            .unwrap_or_default()
    }

    /// Record a payment that has already arrived; it lands as reserved
    pub fn receive(&mut self, amount: Amount) -> Result<()> {
        self.total_held = self
            .total_held
            .checked_add(amount)
            .ok_or(OracleError::AmountOverflow)?;
        Ok(())
    }

    /// Undo [`receive`](Self::receive) for a payment whose request was rejected
    pub fn unreceive(&mut self, amount: Amount) -> Result<()> {
        let reserved = self.reserved();
        if amount > reserved {
            return Err(self.violation(reserved));
        }
        self.total_held = Amount::new(self.total_held.0 - amount.0);
        Ok(())
    }

    /// Move `amount` from reserved to withdrawable
    pub fn settle(&mut self, amount: Amount) -> Result<()> {
        let reserved = self.reserved();
        if amount > reserved {
            return Err(self.violation(reserved));
        }
        self.withdrawable = Amount::new(self.withdrawable.0 + amount.0);
        Ok(())
    }

    /// Pay reserved funds back to a requester
    pub fn refund(
        &mut self,
        token: &mut dyn PaymentLedger,
        holder: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        let reserved = self.reserved();
        if amount > reserved {
            return Err(self.violation(reserved));
        }

        let before = *self;
        self.total_held = Amount::new(self.total_held.0 - amount.0);
        if let Err(e) = token.transfer(holder, to, amount) {
            warn!("Refund of {} to {} reverted: {}", amount, to, e);
            *self = before;
            return Err(e);
        }

        info!("Refunded {} to {}", amount, to);
        Ok(())
    }

    /// Pay earned funds out
    pub fn withdraw(
        &mut self,
        token: &mut dyn PaymentLedger,
        holder: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        if amount > self.withdrawable {
            return Err(OracleError::InsufficientWithdrawable {
                requested: amount.0,
                available: self.withdrawable.0,
            });
        }

        let before = *self;
        self.withdrawable = Amount::new(self.withdrawable.0 - amount.0);
        self.total_held = Amount::new(self.total_held.0 - amount.0);
        if let Err(e) = token.transfer(holder, to, amount) {
            warn!("Withdrawal of {} to {} reverted: {}", amount, to, e);
            *self = before;
            return Err(e);
        }

        info!("Withdrew {} to {}", amount, to);
        Ok(())
    }

    fn violation(&self, reserved: Amount) -> OracleError {
        OracleError::ConservationViolation {
            held: self.total_held.0,
            withdrawable: self.withdrawable.0,
            reserved: reserved.0,
        }
    }
}
