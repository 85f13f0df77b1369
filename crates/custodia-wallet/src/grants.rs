//! Temporary limit grants
//!
//! A grant is an additive, time-boxed increase to a child's daily ceiling.
//! At most one grant is live per child; a new approval replaces any prior
//! one (no stacking). Expired grants are ignored at read time rather than
//! deleted eagerly.

use chrono::{DateTime, Duration, Utc};
use custodia_types::{AccountId, Amount, CustodiaError, Result};
use serde::{Deserialize, Serialize};

use crate::state::WalletState;

/// A time-boxed addition to the daily spending ceiling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TempGrant {
    /// Extra allowance on top of the configured daily limit
    pub amount: Amount,
    /// Instant after which the grant has no effect
    pub expires_at: DateTime<Utc>,
}

impl WalletState {
    /// Replace `child`'s grant with `{amount, now + valid_seconds}`.
    ///
    /// The caller must be the registered parent; `valid_seconds` must be
    /// positive.
    pub fn approve_temp(
        &mut self,
        parent: &AccountId,
        child: &AccountId,
        amount: Amount,
        valid_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        self.account_for_parent(parent, child)?;
        if valid_seconds <= 0 {
            return Err(CustodiaError::InvalidDuration {
                seconds: valid_seconds,
            });
        }
        let expires_at = now + Duration::seconds(valid_seconds);
        self.grants.insert(*child, TempGrant { amount, expires_at });
        Ok(expires_at)
    }

    /// Grant amount still in effect at `now`; expired or absent grants
    /// contribute zero.
    pub fn active_grant(&self, child: &AccountId, now: DateTime<Utc>) -> Amount {
        match self.grants.get(child) {
            Some(grant) if grant.expires_at > now => grant.amount,
            _ => Amount::zero(),
        }
    }
}
