//! Custodia Ledger - Single-asset fund ledger
//!
//! The ledger is:
//! - Account-keyed by `AccountId` (parents, children, merchants, and the
//!   vault custody account all live in one address space)
//! - Append-only (entries are immutable once recorded)
//! - Reason-tagged (every entry says why the money moved)
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. A transfer debits and credits atomically, or does nothing at all
//! 3. Every entry has a reason
//!
//! Policy decisions live upstream in `custodia-wallet`; the ledger only
//! refuses movements that are arithmetically impossible (insufficient funds,
//! overflow, zero amounts).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use custodia_types::{AccountId, Amount, CustodiaError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Unique identifier for a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new() -> Self {
        Self(format!("entry_{}", Uuid::new_v4()))
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

/// Type of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    /// Credit (increase) to an account
    Credit,
    /// Debit (decrease) from an account
    Debit,
}

/// Reason for a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryReason {
    /// External funding of an account (demo seeding, top-ups)
    Deposit,
    /// Policy-approved payment; the other leg of the transfer
    Payment { counterparty: AccountId },
    /// Parent locked funds into the savings vault for a child
    VaultLock { child: AccountId },
    /// Parent released vault funds to the child before unlock
    VaultRelease { child: AccountId },
    /// Child withdrew matured vault funds
    VaultWithdraw { child: AccountId },
}

/// A single ledger entry (one side of a movement)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: EntryId,
    pub account: AccountId,
    pub entry_type: EntryType,
    pub amount: Amount,
    pub balance_after: Amount,
    pub reason: EntryReason,
    pub created_at: DateTime<Utc>,
}

/// The Custodia fund ledger
///
/// Tracks one balance per account plus the append-only entry history.
/// Thread-safe and designed for concurrent access.
#[derive(Clone)]
pub struct Ledger {
    /// Account balances
    accounts: Arc<RwLock<HashMap<AccountId, Amount>>>,
    /// All entries (append-only)
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
}

impl Ledger {
    /// Create a new in-memory ledger
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get the balance of an account (zero for unknown accounts)
    pub async fn balance(&self, account: &AccountId) -> Amount {
        let accounts = self.accounts.read().await;
        accounts.get(account).copied().unwrap_or(Amount::zero())
    }

    /// Credit an account from outside the system (funding / seeding).
    ///
    /// Returns the new balance.
    pub async fn deposit(&self, account: &AccountId, amount: Amount) -> Result<Amount> {
        if amount.is_zero() {
            return Err(CustodiaError::InvalidAmount {
                message: "deposit amount must be greater than zero".to_string(),
            });
        }

        let mut accounts = self.accounts.write().await;
        let mut entries = self.entries.write().await;

        let balance = accounts.entry(*account).or_insert_with(Amount::zero);
        let new_balance =
            balance
                .checked_add(amount)
                .ok_or_else(|| CustodiaError::InvalidAmount {
                    message: "balance overflow".to_string(),
                })?;
        *balance = new_balance;

        entries.push(LedgerEntry {
            entry_id: EntryId::new(),
            account: *account,
            entry_type: EntryType::Credit,
            amount,
            balance_after: new_balance,
            reason: EntryReason::Deposit,
            created_at: Utc::now(),
        });

        debug!(%account, %amount, %new_balance, "ledger deposit");
        Ok(new_balance)
    }

    /// Move funds between two accounts.
    ///
    /// Atomic: both sides are validated (sufficient balance on `from`, no
    /// overflow on `to`) before either is touched, so a failed transfer
    /// leaves no partial state. Each side gets an entry tagged with `reason`.
    pub async fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
        reason: EntryReason,
    ) -> Result<(EntryId, EntryId)> {
        if amount.is_zero() {
            return Err(CustodiaError::InvalidAmount {
                message: "transfer amount must be greater than zero".to_string(),
            });
        }
        if from == to {
            return Err(CustodiaError::InvalidAmount {
                message: "transfer requires two distinct accounts".to_string(),
            });
        }

        let mut accounts = self.accounts.write().await;
        let mut entries = self.entries.write().await;

        let from_balance = accounts.get(from).copied().unwrap_or(Amount::zero());
        let to_balance = accounts.get(to).copied().unwrap_or(Amount::zero());

        // Validate both legs before mutating either.
        let new_from =
            from_balance
                .checked_sub(amount)
                .ok_or(CustodiaError::InsufficientFunds {
                    available: from_balance.0,
                    required: amount.0,
                })?;
        let new_to = to_balance
            .checked_add(amount)
            .ok_or_else(|| CustodiaError::InvalidAmount {
                message: "recipient balance overflow".to_string(),
            })?;

        accounts.insert(*from, new_from);
        accounts.insert(*to, new_to);

        let now = Utc::now();
        let debit = LedgerEntry {
            entry_id: EntryId::new(),
            account: *from,
            entry_type: EntryType::Debit,
            amount,
            balance_after: new_from,
            reason: reason.clone(),
            created_at: now,
        };
        let credit = LedgerEntry {
            entry_id: EntryId::new(),
            account: *to,
            entry_type: EntryType::Credit,
            amount,
            balance_after: new_to,
            reason,
            created_at: now,
        };

        let ids = (debit.entry_id.clone(), credit.entry_id.clone());
        entries.push(debit);
        entries.push(credit);

        debug!(%from, %to, %amount, "ledger transfer");
        Ok(ids)
    }

    /// Get all entries for an account
    pub async fn account_entries(&self, account: &AccountId) -> Vec<LedgerEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| &e.account == account)
            .cloned()
            .collect()
    }

    /// Get recent entries (newest first)
    pub async fn recent_entries(&self, limit: usize) -> Vec<LedgerEntry> {
        let entries = self.entries.read().await;
        entries.iter().rev().take(limit).cloned().collect()
    }

    /// Get the total number of entries
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
