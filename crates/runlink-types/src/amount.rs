//! Payment amounts
//!
//! Amounts are whole base units of the payment token. All arithmetic is
//! checked; the broker never wraps or saturates a balance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount of the payment token in base units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(pub u128);

impl Amount {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Whole tokens at 18 decimals
    pub fn tokens(whole: u64) -> Self {
        Self(u128::from(whole) * 1_000_000_000_000_000_000)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked sum over an iterator of amounts
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::zero(), |acc, amount| acc.checked_add(amount))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}
