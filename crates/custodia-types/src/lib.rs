//! Custodia Types - Canonical domain types for the spending-limit engine
//!
//! This crate contains all foundational types for Custodia with zero
//! dependencies on other custodia crates:
//!
//! - Identity types (`AccountId`)
//! - Integer amounts in smallest currency units
//! - The error taxonomy (`CustodiaError`)
//! - Domain events consumed by external fan-out layers
//! - Day-index helpers for the rolling daily spend window
//!
//! # Architectural Invariants
//!
//! 1. Every child account has exactly one parent, assigned at creation
//! 2. Policy rejections are typed errors, never panics
//! 3. Expiry and day rollover are pure functions of a caller-supplied clock
//! 4. Events are emitted only after state has committed

pub mod amount;
pub mod error;
pub mod events;
pub mod identity;
pub mod time;

pub use amount::*;
pub use error::*;
pub use events::*;
pub use identity::*;
pub use time::*;

/// Version of the Custodia types schema
pub const TYPES_VERSION: &str = "0.1.0";
