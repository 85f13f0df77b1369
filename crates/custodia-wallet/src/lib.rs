//! Custodia Wallet - Spending-limit policy engine
//!
//! A custodial parent governs the spending of its child accounts against a
//! whitelisted set of merchants:
//!
//! - per-transaction and rolling daily caps (`0` = unlimited)
//! - a freeze switch that overrides everything else
//! - a per-parent merchant whitelist (default-deny)
//! - time-boxed temp grants that raise the daily ceiling additively
//!
//! The engine is a single serializing authority: every mutation runs under
//! one write lock over [`WalletState`], so the check sequence of a payment
//! can never interleave with another mutation on the same state. Funds move
//! through [`custodia_ledger::Ledger`]; the transfer happens before the
//! spend window is updated and a transfer failure aborts the whole payment
//! with no partial state.
//!
//! Domain events go out on a broadcast channel only after the corresponding
//! mutation has committed.

pub mod grants;
pub mod state;
pub mod window;

pub use grants::TempGrant;
pub use state::{Account, WalletState};
pub use window::DaySpend;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use custodia_ledger::{EntryReason, Ledger};
use custodia_types::{AccountId, Amount, CustodiaError, Result, SpendingLimits, WalletEvent};
use tokio::sync::{broadcast, RwLock};
use tracing::info;

/// Capacity of the domain-event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The spending-limit policy engine.
///
/// Clone-cheap handle; all clones share the same state, ledger, and event
/// channel.
#[derive(Clone)]
pub struct SpendingWallet {
    state: Arc<RwLock<WalletState>>,
    ledger: Ledger,
    events: broadcast::Sender<WalletEvent>,
}

impl SpendingWallet {
    /// Create an engine settling through `ledger`.
    pub fn new(ledger: Ledger) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(WalletState::new())),
            ledger,
            events,
        }
    }

    /// The fund ledger this engine settles through.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Subscribe to domain events (payments, grants, freezes).
    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }

    /// Emit after commit; a missing or lagging subscriber is not an error.
    fn emit(&self, event: WalletEvent) {
        let _ = self.events.send(event);
    }

    // ── Commands ─────────────────────────────────────────────────────────

    /// Register `child` under `parent` with unlimited limits and unfrozen.
    pub async fn add_child(&self, parent: AccountId, child: AccountId) -> Result<()> {
        let mut state = self.state.write().await;
        state.add_child(parent, child)?;
        info!(%parent, %child, "child registered");
        Ok(())
    }

    /// Overwrite both of `child`'s limits atomically.
    pub async fn set_limits(
        &self,
        parent: &AccountId,
        child: &AccountId,
        limits: SpendingLimits,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.set_limits(parent, child, limits)?;
        info!(%child, per_tx = %limits.per_tx, daily = %limits.daily, "limits updated");
        Ok(())
    }

    /// Set `child`'s frozen flag. Emits [`WalletEvent::Frozen`].
    pub async fn set_frozen(
        &self,
        parent: &AccountId,
        child: &AccountId,
        frozen: bool,
    ) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.set_frozen(parent, child, frozen)?;
        }
        info!(%child, frozen, "freeze flag updated");
        self.emit(WalletEvent::Frozen {
            parent: *parent,
            child: *child,
            is_frozen: frozen,
        });
        Ok(())
    }

    /// Set the allow flag for `(parent, merchant)`.
    pub async fn set_merchant(&self, parent: AccountId, merchant: AccountId, allowed: bool) {
        let mut state = self.state.write().await;
        state.set_merchant(parent, merchant, allowed);
        info!(%parent, %merchant, allowed, "merchant whitelist updated");
    }

    /// Record a child's wish for a higher limit.
    ///
    /// Purely informational: nothing about enforcement changes, the parent
    /// UI just gets a [`WalletEvent::TempRequested`] to act on. Deliberately
    /// decoupled from [`approve_temp`](Self::approve_temp) — the parent may
    /// approve any amount, or none.
    pub async fn request_temp_limit(&self, child: AccountId, amount: Amount) {
        info!(%child, %amount, "temp limit requested");
        self.emit(WalletEvent::TempRequested { child, amount });
    }

    /// Approve a temp grant of `amount` for `valid_seconds` from `now`.
    ///
    /// Replaces any existing grant. Emits [`WalletEvent::TempApproved`].
    pub async fn approve_temp(
        &self,
        parent: &AccountId,
        child: &AccountId,
        amount: Amount,
        valid_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let expires_at = {
            let mut state = self.state.write().await;
            state.approve_temp(parent, child, amount, valid_seconds, now)?
        };
        info!(%child, %amount, %expires_at, "temp grant approved");
        self.emit(WalletEvent::TempApproved {
            parent: *parent,
            child: *child,
            amount,
            expires_at,
        });
        Ok(expires_at)
    }

    /// Attempt a payment from `child` to `merchant` at `now`.
    ///
    /// Check order: registration, freeze, whitelist, per-transaction cap,
    /// daily cap (with any active grant), then the fund transfer, then the
    /// spend-window update. The transfer is never observably committed
    /// before all checks pass, and the window is never updated if the
    /// transfer fails. Emits [`WalletEvent::Payment`] on success.
    pub async fn pay(
        &self,
        child: &AccountId,
        merchant: &AccountId,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<()> {
        // Write lock held across checks, transfer, and window update:
        // two concurrent pays must not both read spent_today before either
        // records its spend.
        let mut state = self.state.write().await;

        let account = state
            .accounts
            .get(child)
            .ok_or(CustodiaError::UnknownAccount {
                child: child.to_string(),
            })?;
        let parent = account.parent;
        let limits = account.limits;

        if account.frozen {
            return Err(CustodiaError::AccountFrozen {
                child: child.to_string(),
            });
        }

        if !state.is_whitelisted(&parent, merchant) {
            return Err(CustodiaError::MerchantNotWhitelisted {
                merchant: merchant.to_string(),
            });
        }

        if !limits.per_tx.is_zero() && amount > limits.per_tx {
            return Err(CustodiaError::PerTxLimitExceeded {
                amount: amount.0,
                limit: limits.per_tx.0,
            });
        }

        let spent = state.spent_today(child, now);
        if let Some(ceiling) = state.effective_daily_limit(child, limits.daily, now) {
            let projected = spent.0.saturating_add(amount.0);
            if projected > ceiling.0 {
                return Err(CustodiaError::DailyLimitExceeded {
                    amount: amount.0,
                    spent: spent.0,
                    limit: ceiling.0,
                });
            }
        }

        // Funds move before the window is written; a transfer failure
        // (insufficient balance, zero amount) aborts with the window
        // untouched.
        self.ledger
            .transfer(
                child,
                merchant,
                amount,
                EntryReason::Payment {
                    counterparty: *merchant,
                },
            )
            .await?;

        state.record_spend(child, amount, now);
        drop(state);

        info!(%child, %merchant, %amount, "payment settled");
        self.emit(WalletEvent::Payment {
            child: *child,
            merchant: *merchant,
            amount,
        });
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// `(per_tx, daily)` limits; unknown accounts read as unlimited.
    pub async fn limits_of(&self, child: &AccountId) -> SpendingLimits {
        self.state.read().await.limits_of(child)
    }

    /// `(spent, day_index)` for the day containing `now`.
    pub async fn daily_spent(&self, child: &AccountId, now: DateTime<Utc>) -> (Amount, i64) {
        self.state.read().await.daily_spent(child, now)
    }

    /// Frozen flag; unknown accounts report `false`.
    pub async fn is_frozen(&self, child: &AccountId) -> bool {
        self.state.read().await.is_frozen(child)
    }

    /// Allow flag for `(parent, merchant)`; default-deny.
    pub async fn is_whitelisted(&self, parent: &AccountId, merchant: &AccountId) -> bool {
        self.state.read().await.is_whitelisted(parent, merchant)
    }

    /// Grant amount still in effect at `now`.
    pub async fn active_grant(&self, child: &AccountId, now: DateTime<Utc>) -> Amount {
        self.state.read().await.active_grant(child, now)
    }

    /// Registered parent of `child`, if any.
    pub async fn parent_of(&self, child: &AccountId) -> Option<AccountId> {
        self.state.read().await.parent_of(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use custodia_types::SECONDS_PER_DAY;

    fn at(ts: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(ts, 0).unwrap()
    }

    fn at_day(day: i64) -> DateTime<Utc> {
        at(day * SECONDS_PER_DAY + 3600)
    }

    /// Engine with a funded, registered, whitelisted child.
    async fn setup() -> (SpendingWallet, AccountId, AccountId, AccountId) {
        let wallet = SpendingWallet::new(Ledger::new());
        let parent = AccountId::new();
        let child = AccountId::new();
        let merchant = AccountId::new();

        wallet.ledger().deposit(&child, Amount::new(10_000)).await.unwrap();
        wallet.add_child(parent, child).await.unwrap();
        wallet.set_merchant(parent, merchant, true).await;
        (wallet, parent, child, merchant)
    }

    #[tokio::test]
    async fn test_unknown_child_cannot_pay() {
        let wallet = SpendingWallet::new(Ledger::new());
        let result = wallet
            .pay(&AccountId::new(), &AccountId::new(), Amount::new(1), at(0))
            .await;
        assert!(matches!(result, Err(CustodiaError::UnknownAccount { .. })));
    }

    #[tokio::test]
    async fn test_freeze_precedence() {
        let (wallet, parent, child, merchant) = setup().await;
        wallet.set_frozen(&parent, &child, true).await.unwrap();

        // Frozen wins regardless of limits or whitelist state
        let result = wallet.pay(&child, &merchant, Amount::new(1), at(0)).await;
        assert!(matches!(result, Err(CustodiaError::AccountFrozen { .. })));

        wallet.set_frozen(&parent, &child, false).await.unwrap();
        wallet.pay(&child, &merchant, Amount::new(1), at(0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_whitelist_default_deny() {
        let (wallet, _, child, _) = setup().await;
        let unknown_merchant = AccountId::new();

        let result = wallet
            .pay(&child, &unknown_merchant, Amount::new(1), at(0))
            .await;
        assert!(matches!(
            result,
            Err(CustodiaError::MerchantNotWhitelisted { .. })
        ));
    }

    #[tokio::test]
    async fn test_per_tx_limit() {
        let (wallet, parent, child, merchant) = setup().await;
        wallet
            .set_limits(
                &parent,
                &child,
                SpendingLimits::new(Amount::new(10), Amount::zero()),
            )
            .await
            .unwrap();

        let result = wallet.pay(&child, &merchant, Amount::new(11), at(0)).await;
        assert!(matches!(
            result,
            Err(CustodiaError::PerTxLimitExceeded { amount: 11, limit: 10 })
        ));

        wallet.pay(&child, &merchant, Amount::new(10), at(0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_daily_cap_never_exceeded() {
        let (wallet, parent, child, merchant) = setup().await;
        wallet
            .set_limits(
                &parent,
                &child,
                SpendingLimits::new(Amount::zero(), Amount::new(20)),
            )
            .await
            .unwrap();

        let mut accepted = 0u64;
        for _ in 0..10 {
            if wallet.pay(&child, &merchant, Amount::new(7), at(100)).await.is_ok() {
                accepted += 7;
            }
        }
        // 7 + 7 accepted, third would make 21 > 20
        assert_eq!(accepted, 14);
        assert_eq!(
            wallet.daily_spent(&child, at(100)).await,
            (Amount::new(14), 0)
        );
    }

    #[tokio::test]
    async fn test_day_rollover_resets_cap() {
        let (wallet, parent, child, merchant) = setup().await;
        wallet
            .set_limits(
                &parent,
                &child,
                SpendingLimits::new(Amount::zero(), Amount::new(20)),
            )
            .await
            .unwrap();

        wallet.pay(&child, &merchant, Amount::new(20), at_day(5)).await.unwrap();
        let result = wallet.pay(&child, &merchant, Amount::new(1), at_day(5)).await;
        assert!(matches!(result, Err(CustodiaError::DailyLimitExceeded { .. })));

        // Fresh day, fresh window
        wallet.pay(&child, &merchant, Amount::new(20), at_day(6)).await.unwrap();
    }

    #[tokio::test]
    async fn test_grant_raises_daily_ceiling_until_expiry() {
        let (wallet, parent, child, merchant) = setup().await;
        wallet
            .set_limits(
                &parent,
                &child,
                SpendingLimits::new(Amount::zero(), Amount::new(20)),
            )
            .await
            .unwrap();

        wallet.pay(&child, &merchant, Amount::new(20), at(0)).await.unwrap();

        // Grant of 5 valid for 100s: ceiling is 25 while live
        wallet
            .approve_temp(&parent, &child, Amount::new(5), 100, at(0))
            .await
            .unwrap();
        wallet.pay(&child, &merchant, Amount::new(5), at(50)).await.unwrap();

        // After expiry the grant contributes nothing
        let result = wallet.pay(&child, &merchant, Amount::new(1), at(200)).await;
        assert!(matches!(result, Err(CustodiaError::DailyLimitExceeded { .. })));
    }

    #[tokio::test]
    async fn test_grant_does_not_bound_unlimited_daily() {
        let (wallet, parent, child, merchant) = setup().await;

        // daily = 0 stays unlimited even with a grant live
        wallet
            .approve_temp(&parent, &child, Amount::new(1), 100, at(0))
            .await
            .unwrap();
        wallet.pay(&child, &merchant, Amount::new(5_000), at(10)).await.unwrap();
    }

    #[tokio::test]
    async fn test_transfer_failure_leaves_window_untouched() {
        let (wallet, parent, child, merchant) = setup().await;
        wallet
            .set_limits(
                &parent,
                &child,
                SpendingLimits::new(Amount::zero(), Amount::new(50_000)),
            )
            .await
            .unwrap();

        // Child holds 10_000; checks pass but the transfer fails
        let result = wallet
            .pay(&child, &merchant, Amount::new(20_000), at(0))
            .await;
        assert!(matches!(
            result,
            Err(CustodiaError::InsufficientFunds { .. })
        ));
        assert_eq!(wallet.daily_spent(&child, at(0)).await.0, Amount::zero());
        assert_eq!(wallet.ledger().balance(&child).await, Amount::new(10_000));
    }

    #[tokio::test]
    async fn test_payment_emits_event_after_commit() {
        let (wallet, _, child, merchant) = setup().await;
        let mut events = wallet.subscribe();

        wallet.pay(&child, &merchant, Amount::new(9), at(0)).await.unwrap();

        match events.recv().await.unwrap() {
            WalletEvent::Payment {
                child: c,
                merchant: m,
                amount,
            } => {
                assert_eq!((c, m, amount), (child, merchant, Amount::new(9)));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_and_freeze_events() {
        let (wallet, parent, child, _) = setup().await;
        let mut events = wallet.subscribe();

        wallet.request_temp_limit(child, Amount::new(50)).await;
        wallet.set_frozen(&parent, &child, true).await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            WalletEvent::TempRequested {
                child,
                amount: Amount::new(50)
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            WalletEvent::Frozen {
                parent,
                child,
                is_frozen: true
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_pays_respect_daily_cap() {
        let (wallet, parent, child, merchant) = setup().await;
        wallet
            .set_limits(
                &parent,
                &child,
                SpendingLimits::new(Amount::zero(), Amount::new(100)),
            )
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let w = wallet.clone();
            handles.push(tokio::spawn(async move {
                w.pay(&child, &merchant, Amount::new(30), at(500)).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        // 3 * 30 = 90 fits, a fourth would be 120 > 100
        assert_eq!(ok, 3);
        assert_eq!(
            wallet.daily_spent(&child, at(500)).await.0,
            Amount::new(90)
        );
        assert_eq!(wallet.ledger().balance(&merchant).await, Amount::new(90));
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let (wallet, parent, child, merchant) = setup().await;
        wallet
            .set_limits(
                &parent,
                &child,
                SpendingLimits::new(Amount::new(10), Amount::new(20)),
            )
            .await
            .unwrap();

        wallet.pay(&child, &merchant, Amount::new(8), at(0)).await.unwrap();
        assert_eq!(wallet.daily_spent(&child, at(0)).await.0, Amount::new(8));

        wallet.pay(&child, &merchant, Amount::new(8), at(0)).await.unwrap();
        assert_eq!(wallet.daily_spent(&child, at(0)).await.0, Amount::new(16));

        // 8 <= 10, so the per-tx cap is not the cause; 16 + 8 = 24 > 20 is
        let result = wallet.pay(&child, &merchant, Amount::new(8), at(0)).await;
        assert!(matches!(
            result,
            Err(CustodiaError::DailyLimitExceeded {
                amount: 8,
                spent: 16,
                limit: 20
            })
        ));

        // Grant lifts the ceiling to 30: 16 + 8 = 24 <= 30
        wallet
            .approve_temp(&parent, &child, Amount::new(10), 3600, at(0))
            .await
            .unwrap();
        wallet.pay(&child, &merchant, Amount::new(8), at(1)).await.unwrap();
        assert_eq!(wallet.daily_spent(&child, at(1)).await.0, Amount::new(24));
    }
}
