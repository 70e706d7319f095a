//! pegkeeper Common Library
//!
//! Shared types, constants, and utilities for the stabilization engine
//! crates: the trading pool, the fair-value oracle, the intervention
//! engine and the stabilization monitor.
//!
//! ## Feedback Loop
//!
//! ```text
//! caller -> TradingPool::swap -> PostTradeObserver::on_swap (monitor)
//!                                   |  deviation > threshold
//!                                   v
//!                       InterventionEngine::intervene
//!                                   |
//!                                   v
//!                       TradingPool::swap (nested, observer no-ops)
//! ```
//!
//! ## Conventions
//!
//! - Amounts are `u128` in each asset's native decimals
//! - Fair value and pool price are `u128` on the 1e18 scale
//! - All arithmetic is checked; see [`math`]
//! - Every restricted entry point takes the caller [`Address`] explicitly

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod math;
pub mod observer;
pub mod primary_market;
pub mod types;

// Re-exports for convenience
pub use config::*;
pub use errors::*;
pub use events::*;
pub use observer::*;
pub use types::*;
