//! Amount type in smallest currency units
//!
//! Custodia amounts are plain u64 values in the smallest unit of the single
//! governed currency. Limit fields reuse the same type with `0` meaning
//! "unlimited", mirroring how the wallet's limit storage behaves.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An amount in smallest currency units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(pub u64);

impl Amount {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Per-transaction and daily spending caps for a child account.
///
/// `0` means unlimited for either field, matching the registry defaults a
/// freshly registered child starts with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingLimits {
    /// Maximum per single transaction (`0` = unlimited)
    pub per_tx: Amount,
    /// Maximum per calendar day (`0` = unlimited)
    pub daily: Amount,
}

impl SpendingLimits {
    pub fn new(per_tx: Amount, daily: Amount) -> Self {
        Self { per_tx, daily }
    }

    /// Unlimited in both dimensions (the defaults for a new child).
    pub fn unlimited() -> Self {
        Self::default()
    }
}
