//! Domain events emitted by the policy engine
//!
//! Events are broadcast to external subscribers (websocket fan-out, log
//! panels, parent dashboards). The engine emits an event only after the
//! corresponding state mutation has committed; subscribers can therefore
//! treat every event as fact, not intent.

use crate::{AccountId, Amount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted during wallet operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WalletEvent {
    /// A policy-approved payment settled from child to merchant
    Payment {
        child: AccountId,
        merchant: AccountId,
        amount: Amount,
    },

    /// A child asked its parent for a temporary limit increase
    TempRequested { child: AccountId, amount: Amount },

    /// A parent approved a temporary limit increase
    TempApproved {
        parent: AccountId,
        child: AccountId,
        amount: Amount,
        expires_at: DateTime<Utc>,
    },

    /// A parent changed a child's frozen flag
    Frozen {
        parent: AccountId,
        child: AccountId,
        is_frozen: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_tag() {
        let event = WalletEvent::TempRequested {
            child: AccountId::new(),
            amount: Amount::new(5),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TempRequested");
    }
}
