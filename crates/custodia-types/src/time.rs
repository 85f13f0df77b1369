//! Day-index helpers for the rolling daily spend window
//!
//! A day index is the number of whole days since the Unix epoch,
//! `floor(timestamp / 86400)`. Day windows and grant expiry are lazy: the
//! engine compares indices and timestamps at access time and never runs a
//! background sweep.

use chrono::{DateTime, Utc};

/// Seconds in a calendar day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days elapsed since the Unix epoch at `now`.
///
/// Uses euclidean division so pre-epoch timestamps still bucket into
/// well-ordered indices.
pub fn day_index(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(SECONDS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_index_buckets() {
        let t0 = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(day_index(t0), 0);

        let end_of_day = Utc.timestamp_opt(SECONDS_PER_DAY - 1, 0).unwrap();
        assert_eq!(day_index(end_of_day), 0);

        let next_day = Utc.timestamp_opt(SECONDS_PER_DAY, 0).unwrap();
        assert_eq!(day_index(next_day), 1);

        let day_five = Utc.timestamp_opt(5 * SECONDS_PER_DAY + 123, 0).unwrap();
        assert_eq!(day_index(day_five), 5);
    }

    #[test]
    fn test_pre_epoch_orders_correctly() {
        let before = Utc.timestamp_opt(-1, 0).unwrap();
        assert_eq!(day_index(before), -1);
        assert!(day_index(before) < day_index(Utc.timestamp_opt(0, 0).unwrap()));
    }
}
