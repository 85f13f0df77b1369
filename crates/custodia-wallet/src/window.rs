//! Rolling daily spend window
//!
//! One record per child tracks cumulative spend for a single day index. A
//! record from an earlier day is stale and reads as zero; it is overwritten
//! the next time a spend is recorded (lazy reset, no sweeper).

use chrono::{DateTime, Utc};
use custodia_types::{day_index, AccountId, Amount};
use serde::{Deserialize, Serialize};

use crate::state::WalletState;

/// Cumulative spend for one account on one day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DaySpend {
    /// Day-index bucket this record belongs to
    pub day: i64,
    /// Total accepted spend within that day
    pub spent: Amount,
}

impl WalletState {
    /// Spend already recorded for `account` in the day containing `now`.
    ///
    /// A stored record older than the current day reads as zero without
    /// being deleted.
    pub fn spent_today(&self, account: &AccountId, now: DateTime<Utc>) -> Amount {
        let today = day_index(now);
        match self.day_spend.get(account) {
            Some(record) if record.day >= today => record.spent,
            _ => Amount::zero(),
        }
    }

    /// The authoritative `(spent, day_index)` pair for `account` at `now`.
    pub fn daily_spent(&self, account: &AccountId, now: DateTime<Utc>) -> (Amount, i64) {
        (self.spent_today(account, now), day_index(now))
    }

    /// Add `amount` to `account`'s total for the day containing `now`.
    ///
    /// Never rejects; capacity checking happens upstream in the payment
    /// pipeline. A stale record is replaced by a fresh one for today before
    /// the addition.
    pub fn record_spend(&mut self, account: &AccountId, amount: Amount, now: DateTime<Utc>) {
        let today = day_index(now);
        let record = self.day_spend.entry(*account).or_insert(DaySpend {
            day: today,
            spent: Amount::zero(),
        });
        if record.day < today {
            record.day = today;
            record.spent = Amount::zero();
        }
        record.spent = Amount(record.spent.0.saturating_add(amount.0));
    }
}
