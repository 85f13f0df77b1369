//! Custodia Vault - Timelocked custody for delayed fund release
//!
//! A parent deposits funds for a child with a future unlock time. The child
//! may withdraw only once the unlock time has passed; the parent may release
//! the full balance early at any moment. Funds sit in a dedicated custody
//! account on the shared ledger while locked, so every unit is accounted for
//! between deposit and payout.
//!
//! Deposits for the same child accumulate into one balance, and the most
//! recent deposit's unlock time wins (single-batch semantics — the observed
//! interface exposes exactly one unlock time per child). Both release paths
//! pay out the full balance, never a part of it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use custodia_ledger::{EntryReason, Ledger};
use custodia_types::{AccountId, Amount, CustodiaError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

/// Custody record for one child.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VaultDeposit {
    /// The parent that funds (and may early-release) this entry
    pub parent: AccountId,
    /// Cumulative balance held for the child
    pub amount: Amount,
    /// Instant after which the child may withdraw
    pub unlock_at: DateTime<Utc>,
}

/// The timelocked savings vault.
///
/// Clone-cheap handle; all clones share the same records and ledger.
#[derive(Clone)]
pub struct SavingsVault {
    /// Custody records keyed by child
    deposits: Arc<RwLock<HashMap<AccountId, VaultDeposit>>>,
    /// Shared fund ledger
    ledger: Ledger,
    /// The ledger account holding all locked funds
    custody: AccountId,
}

impl SavingsVault {
    /// Create a vault settling through `ledger`.
    pub fn new(ledger: Ledger) -> Self {
        Self {
            deposits: Arc::new(RwLock::new(HashMap::new())),
            ledger,
            custody: AccountId::new(),
        }
    }

    /// The ledger account where locked funds sit.
    pub fn custody_account(&self) -> &AccountId {
        &self.custody
    }

    /// Deposit `amount` from `parent` for `child`, locked until `unlock_at`.
    ///
    /// Deposits accumulate into the child's single balance; `unlock_at` is
    /// overwritten with the value given here, so a later deposit can extend
    /// or shorten the lock. Only the entry's original parent may add to it.
    pub async fn deposit_for(
        &self,
        parent: &AccountId,
        child: &AccountId,
        unlock_at: DateTime<Utc>,
        amount: Amount,
    ) -> Result<Amount> {
        if amount.is_zero() {
            return Err(CustodiaError::InvalidAmount {
                message: "vault deposit must be greater than zero".to_string(),
            });
        }

        let mut deposits = self.deposits.write().await;
        let new_balance = match deposits.get(child) {
            Some(existing) => {
                if &existing.parent != parent {
                    return Err(CustodiaError::NotAuthorized {
                        caller: parent.to_string(),
                        child: child.to_string(),
                    });
                }
                existing.amount.checked_add(amount).ok_or_else(|| {
                    CustodiaError::InvalidAmount {
                        message: "vault balance overflow".to_string(),
                    }
                })?
            }
            None => amount,
        };

        // Funds move first; a failed transfer leaves the record untouched.
        self.ledger
            .transfer(
                parent,
                &self.custody,
                amount,
                EntryReason::VaultLock { child: *child },
            )
            .await?;

        deposits.insert(
            *child,
            VaultDeposit {
                parent: *parent,
                amount: new_balance,
                unlock_at,
            },
        );

        info!(%child, %amount, %unlock_at, balance = %new_balance, "vault deposit");
        Ok(new_balance)
    }

    /// Parent-initiated early release: pays the full balance to the child
    /// immediately, regardless of the unlock time.
    pub async fn release_to_child(&self, parent: &AccountId, child: &AccountId) -> Result<Amount> {
        let mut deposits = self.deposits.write().await;
        let entry = deposits.get(child).ok_or(CustodiaError::UnknownAccount {
            child: child.to_string(),
        })?;
        if &entry.parent != parent {
            return Err(CustodiaError::NotAuthorized {
                caller: parent.to_string(),
                child: child.to_string(),
            });
        }

        let amount = entry.amount;
        self.ledger
            .transfer(
                &self.custody,
                child,
                amount,
                EntryReason::VaultRelease { child: *child },
            )
            .await?;
        deposits.remove(child);

        info!(%child, %amount, "vault released early by parent");
        Ok(amount)
    }

    /// Child-initiated withdrawal, permitted only once `now >= unlock_at`.
    pub async fn child_withdraw(&self, child: &AccountId, now: DateTime<Utc>) -> Result<Amount> {
        let mut deposits = self.deposits.write().await;
        let entry = deposits.get(child).ok_or(CustodiaError::UnknownAccount {
            child: child.to_string(),
        })?;
        if now < entry.unlock_at {
            return Err(CustodiaError::VaultLocked {
                child: child.to_string(),
                unlock_at: entry.unlock_at.to_rfc3339(),
            });
        }

        let amount = entry.amount;
        self.ledger
            .transfer(
                &self.custody,
                child,
                amount,
                EntryReason::VaultWithdraw { child: *child },
            )
            .await?;
        deposits.remove(child);

        info!(%child, %amount, "vault withdrawn by child");
        Ok(amount)
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Balance held for `child`; zero for unknown children.
    pub async fn balance_of(&self, child: &AccountId) -> Amount {
        let deposits = self.deposits.read().await;
        deposits.get(child).map(|d| d.amount).unwrap_or(Amount::zero())
    }

    /// Unlock time for `child`'s balance, if any is held.
    pub async fn unlock_at(&self, child: &AccountId) -> Option<DateTime<Utc>> {
        let deposits = self.deposits.read().await;
        deposits.get(child).map(|d| d.unlock_at)
    }
}
