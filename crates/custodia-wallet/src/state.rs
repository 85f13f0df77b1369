//! Wallet state: account registry, freeze control, merchant whitelist
//!
//! `WalletState` is the one mutable state object behind the engine. Every
//! component (registry, freeze, whitelist, daily window, grants) is a set of
//! methods over it, so a single lock acquisition covers any cross-component
//! sequence without torn reads.

use std::collections::HashMap;

use custodia_types::{AccountId, Amount, CustodiaError, Result, SpendingLimits};
use serde::{Deserialize, Serialize};

use crate::grants::TempGrant;
use crate::window::DaySpend;

/// A child account under custody.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Owning identity; set once at creation, never re-parented
    pub parent: AccountId,
    /// When true, every payment attempt is rejected
    pub frozen: bool,
    /// Spending caps (`0` = unlimited)
    pub limits: SpendingLimits,
}

impl Account {
    fn new(parent: AccountId) -> Self {
        Self {
            parent,
            frozen: false,
            limits: SpendingLimits::unlimited(),
        }
    }
}

/// All mutable engine state, owned exclusively by [`SpendingWallet`].
///
/// [`SpendingWallet`]: crate::SpendingWallet
#[derive(Debug, Default)]
pub struct WalletState {
    /// Registered child accounts
    pub(crate) accounts: HashMap<AccountId, Account>,
    /// Rolling daily spend, one authoritative record per child
    pub(crate) day_spend: HashMap<AccountId, DaySpend>,
    /// At most one active temp grant per child
    pub(crate) grants: HashMap<AccountId, TempGrant>,
    /// (parent, merchant) allow flags, default-deny
    pub(crate) whitelist: HashMap<(AccountId, AccountId), bool>,
}

impl WalletState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Account registry ─────────────────────────────────────────────────

    /// Register `child` under `parent`.
    ///
    /// A child address can be registered at most once globally; re-parenting
    /// is not a thing.
    pub fn add_child(&mut self, parent: AccountId, child: AccountId) -> Result<()> {
        if self.accounts.contains_key(&child) {
            return Err(CustodiaError::AlreadyRegistered {
                child: child.to_string(),
            });
        }
        self.accounts.insert(child, Account::new(parent));
        Ok(())
    }

    /// Look up the registered parent of `child`.
    pub fn parent_of(&self, child: &AccountId) -> Option<AccountId> {
        self.accounts.get(child).map(|a| a.parent)
    }

    /// Fetch `child`'s account, verifying `caller` is its parent.
    ///
    /// `UnknownAccount` for unregistered children, `NotAuthorized` when the
    /// caller is not the stored parent.
    pub(crate) fn account_for_parent(
        &mut self,
        caller: &AccountId,
        child: &AccountId,
    ) -> Result<&mut Account> {
        let account = self
            .accounts
            .get_mut(child)
            .ok_or(CustodiaError::UnknownAccount {
                child: child.to_string(),
            })?;
        if &account.parent != caller {
            return Err(CustodiaError::NotAuthorized {
                caller: caller.to_string(),
                child: child.to_string(),
            });
        }
        Ok(account)
    }

    /// Overwrite both limits atomically.
    pub fn set_limits(
        &mut self,
        parent: &AccountId,
        child: &AccountId,
        limits: SpendingLimits,
    ) -> Result<()> {
        let account = self.account_for_parent(parent, child)?;
        account.limits = limits;
        Ok(())
    }

    /// Current limits; unknown accounts read as the unlimited defaults.
    pub fn limits_of(&self, child: &AccountId) -> SpendingLimits {
        self.accounts
            .get(child)
            .map(|a| a.limits)
            .unwrap_or_default()
    }

    // ── Freeze control ───────────────────────────────────────────────────

    /// Overwrite the frozen flag.
    pub fn set_frozen(&mut self, parent: &AccountId, child: &AccountId, frozen: bool) -> Result<()> {
        let account = self.account_for_parent(parent, child)?;
        account.frozen = frozen;
        Ok(())
    }

    /// Unknown accounts report `false`.
    pub fn is_frozen(&self, child: &AccountId) -> bool {
        self.accounts.get(child).map(|a| a.frozen).unwrap_or(false)
    }

    // ── Merchant whitelist ───────────────────────────────────────────────

    /// Set the allow flag for `(parent, merchant)`.
    ///
    /// The whitelist is scoped per parent, so a caller can only ever affect
    /// entries keyed by its own identity.
    pub fn set_merchant(&mut self, parent: AccountId, merchant: AccountId, allowed: bool) {
        self.whitelist.insert((parent, merchant), allowed);
    }

    /// Absent entries are `false` (default-deny).
    pub fn is_whitelisted(&self, parent: &AccountId, merchant: &AccountId) -> bool {
        self.whitelist
            .get(&(*parent, *merchant))
            .copied()
            .unwrap_or(false)
    }

    /// Effective daily ceiling for `child`: `None` means unlimited.
    ///
    /// An active temp grant is additive on top of the configured daily
    /// limit; it does not lift an unlimited (`0`) configuration into a
    /// bounded one.
    pub(crate) fn effective_daily_limit(
        &self,
        child: &AccountId,
        daily: Amount,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Option<Amount> {
        if daily.is_zero() {
            return None;
        }
        let grant = self.active_grant(child, now);
        Some(Amount(daily.0.saturating_add(grant.0)))
    }
}
