//! Error Types for the Stabilization Engine
//!
//! One typed error for every component. Authorization, liquidity and
//! arithmetic errors abort the whole enclosing operation; the monitor is
//! the only caller that swallows errors (from automatic interventions).

use thiserror::Error;

use crate::types::{Address, PoolId};

/// Result type alias for stabilization engine operations
pub type PegResult<T> = Result<T, PegError>;

/// Arithmetic fault kinds. Always checked, never wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFault {
    /// Result exceeds the representable range
    Overflow,
    /// Subtraction below zero
    Underflow,
    /// Division by zero
    DivisionByZero,
}

/// Main error enum for all protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PegError {
    // ============ Authorization Errors ============
    /// Caller is not authorized for this operation
    #[error("unauthorized caller: expected {expected:02x?}, got {actual:02x?}")]
    Unauthorized { expected: Address, actual: Address },

    // ============ Liquidity / Balance Errors ============
    /// Pool reserve is zero or a swap would exhaust it
    #[error("insufficient pool liquidity: available {available}, requested {requested}")]
    InsufficientLiquidity { available: u128, requested: u128 },

    /// Engine ledger has nothing to intervene with
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: u128, requested: u128 },

    /// Swap output rounds down to nothing
    #[error("swap output rounds to zero")]
    InsufficientOutputAmount,

    // ============ Math Errors ============
    /// Overflow, underflow or division by zero
    #[error("arithmetic error: {0:?}")]
    Arithmetic(MathFault),

    // ============ State Errors ============
    /// Pool was already initialized
    #[error("pool already initialized")]
    AlreadyInitialized,

    /// Pool has not been initialized yet
    #[error("pool not initialized")]
    NotInitialized,

    /// Notification or query for a pool this component does not watch
    #[error("unknown pool {pool_id:02x?}")]
    UnknownPool { pool_id: PoolId },

    /// Engine interventions are paused by the operator
    #[error("interventions are paused")]
    InterventionsPaused,

    // ============ Input Validation Errors ============
    /// Zero amount not allowed
    #[error("zero amount not allowed")]
    ZeroAmount,

    /// Invalid input parameter
    #[error("invalid parameter `{param}`: {reason}")]
    InvalidParameter { param: &'static str, reason: &'static str },
}

impl PegError {
    /// Shorthand for `PegError::Arithmetic(MathFault::Overflow)`
    pub const OVERFLOW: PegError = PegError::Arithmetic(MathFault::Overflow);
    /// Shorthand for `PegError::Arithmetic(MathFault::Underflow)`
    pub const UNDERFLOW: PegError = PegError::Arithmetic(MathFault::Underflow);
    /// Shorthand for `PegError::Arithmetic(MathFault::DivisionByZero)`
    pub const DIVISION_BY_ZERO: PegError = PegError::Arithmetic(MathFault::DivisionByZero);

    /// Returns a stable error code for logging and diagnostic events
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "E001_UNAUTHORIZED",
            Self::InsufficientLiquidity { .. } => "E010_INSUFFICIENT_LIQUIDITY",
            Self::InsufficientBalance { .. } => "E011_INSUFFICIENT_BALANCE",
            Self::InsufficientOutputAmount => "E012_INSUFFICIENT_OUTPUT",
            Self::Arithmetic(MathFault::Overflow) => "E020_OVERFLOW",
            Self::Arithmetic(MathFault::Underflow) => "E021_UNDERFLOW",
            Self::Arithmetic(MathFault::DivisionByZero) => "E022_DIV_ZERO",
            Self::AlreadyInitialized => "E030_ALREADY_INITIALIZED",
            Self::NotInitialized => "E031_NOT_INITIALIZED",
            Self::UnknownPool { .. } => "E032_UNKNOWN_POOL",
            Self::InterventionsPaused => "E033_INTERVENTIONS_PAUSED",
            Self::ZeroAmount => "E040_ZERO_AMOUNT",
            Self::InvalidParameter { .. } => "E041_INVALID_PARAM",
        }
    }

    /// Returns true for overflow, underflow and division by zero
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Self::Arithmetic(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_error_codes_unique() {
        let errors = [
            PegError::Unauthorized { expected: [0u8; 32], actual: [1u8; 32] },
            PegError::InsufficientLiquidity { available: 0, requested: 1 },
            PegError::InsufficientBalance { available: 0, requested: 1 },
            PegError::InsufficientOutputAmount,
            PegError::OVERFLOW,
            PegError::UNDERFLOW,
            PegError::DIVISION_BY_ZERO,
            PegError::AlreadyInitialized,
            PegError::NotInitialized,
            PegError::UnknownPool { pool_id: [9u8; 32] },
            PegError::InterventionsPaused,
            PegError::ZeroAmount,
            PegError::InvalidParameter { param: "x", reason: "y" },
        ];

        let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        let unique: BTreeSet<_> = codes.iter().collect();
        assert_eq!(codes.len(), unique.len(), "Error codes must be unique");
    }

    #[test]
    fn test_arithmetic_classification() {
        assert!(PegError::OVERFLOW.is_arithmetic());
        assert!(PegError::DIVISION_BY_ZERO.is_arithmetic());
        assert!(!PegError::ZeroAmount.is_arithmetic());
    }

    #[test]
    fn test_display_mentions_amounts() {
        let err = PegError::InsufficientBalance { available: 0, requested: 42 };
        assert_eq!(err.to_string(), "insufficient balance: available 0, requested 42");
    }
}
