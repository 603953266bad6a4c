//! Payment token seam
//!
//! The broker never keeps balances of its own: funds live in an external
//! fungible-token ledger reached through [`PaymentLedger`]. The in-memory
//! implementation backs tests, the CLI and embedded use.

use std::collections::HashMap;

use tracing::debug;

use runlink_types::{Address, Amount, OracleError, Result};

/// External fungible-token ledger used for payment
pub trait PaymentLedger: Send {
    /// Address of the token contract; the only caller trusted to notify payments
    fn address(&self) -> &Address;

    /// Balance held by `account`
    fn balance_of(&self, account: &Address) -> Amount;

    /// Move `amount` from `from` to `to`, all or nothing
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<()>;
}

/// In-memory token ledger
#[derive(Debug, Clone)]
pub struct InMemoryToken {
    address: Address,
    balances: HashMap<Address, Amount>,
}

impl InMemoryToken {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            balances: HashMap::new(),
        }
    }

    /// Builder-style initial balance
    pub fn with_balance(mut self, account: Address, amount: Amount) -> Self {
        self.balances.insert(account, amount);
        self
    }

    /// Credit new tokens to `account`
    pub fn mint(&mut self, account: Address, amount: Amount) -> Result<Amount> {
        let balance = self.balances.entry(account).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(OracleError::AmountOverflow)?;
        Ok(*balance)
    }

    /// Sum of all balances
    pub fn total_supply(&self) -> Option<Amount> {
        Amount::checked_sum(self.balances.values().copied())
    }
}

impl PaymentLedger for InMemoryToken {
    fn address(&self) -> &Address {
        &self.address
    }

    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<()> {
        let from_balance = self.balance_of(from);
        let new_from = from_balance
            .checked_sub(amount)
            .ok_or_else(|| OracleError::InsufficientBalance {
                account: from.to_string(),
                requested: amount.0,
                available: from_balance.0,
            })?;

        if from == to {
            return Ok(());
        }

        let new_to = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(OracleError::AmountOverflow)?;

        self.balances.insert(*from, new_from);
        self.balances.insert(*to, new_to);
        debug!("Token transfer: {} from {} to {}", amount, from, to);
        Ok(())
    }
}
