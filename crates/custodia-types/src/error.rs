//! Error types for Custodia
//!
//! Every rejection is a definitive policy decision returned synchronously to
//! the caller. Nothing here is transient: the engine never retries, and no
//! error is swallowed.

use thiserror::Error;

/// Result type for Custodia operations
pub type Result<T> = std::result::Result<T, CustodiaError>;

/// Custodia error taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodiaError {
    // ========================================================================
    // Registry Errors
    // ========================================================================

    /// Child address is already registered under a parent
    #[error("Account {child} is already registered")]
    AlreadyRegistered { child: String },

    /// Child address was never registered
    #[error("Account {child} is not registered")]
    UnknownAccount { child: String },

    /// Caller is not the registered parent of the child
    #[error("{caller} is not authorized to manage {child}")]
    NotAuthorized { caller: String, child: String },

    // ========================================================================
    // Payment Errors
    // ========================================================================

    /// Child account is frozen
    #[error("Account {child} is frozen")]
    AccountFrozen { child: String },

    /// Merchant is not on the parent's whitelist
    #[error("Merchant {merchant} is not whitelisted for this parent")]
    MerchantNotWhitelisted { merchant: String },

    /// Payment exceeds the per-transaction cap
    #[error("Amount {amount} exceeds per-transaction limit {limit}")]
    PerTxLimitExceeded { amount: u64, limit: u64 },

    /// Payment would push the day's spend over the effective daily cap
    #[error("Spending {amount} would exceed daily limit: spent {spent}, effective limit {limit}")]
    DailyLimitExceeded { amount: u64, spent: u64, limit: u64 },

    /// Payer cannot cover the transfer
    #[error("Insufficient funds: have {available}, need {required}")]
    InsufficientFunds { available: u64, required: u64 },

    // ========================================================================
    // Grant Errors
    // ========================================================================

    /// Temp grant validity window must be positive
    #[error("Invalid grant duration: {seconds} seconds")]
    InvalidDuration { seconds: i64 },

    // ========================================================================
    // Vault Errors
    // ========================================================================

    /// Child-initiated withdrawal attempted before the unlock time
    #[error("Vault for {child} is locked until {unlock_at}")]
    VaultLocked { child: String, unlock_at: String },

    // ========================================================================
    // Shared Errors
    // ========================================================================

    /// Zero or overflowing amount where a positive one is required
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },
}
