//! Core Types for the Stabilization Engine
//!
//! Identities, trade directions and the values that flow between the
//! pool, the monitor and the intervention engine.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::pool::POOL_ID_DOMAIN;

/// Type alias for caller identities (32-byte key hash)
pub type Address = [u8; 32];

/// Type alias for asset identifiers
pub type AssetId = [u8; 32];

/// Type alias for pool identifiers
pub type PoolId = [u8; 32];

/// The zero address. Never a valid role holder.
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Derive the deterministic id of the pool trading `asset_a` against `asset_b`.
///
/// Order matters: A is the synthetic asset whose price is quoted in B.
pub fn derive_pool_id(asset_a: &AssetId, asset_b: &AssetId) -> PoolId {
    let mut hasher = Sha256::new();
    hasher.update(POOL_ID_DOMAIN);
    hasher.update(asset_a);
    hasher.update(asset_b);
    let result = hasher.finalize();
    let mut id = [0u8; 32];
    id.copy_from_slice(&result);
    id
}

// ============ Assets & Directions ============

/// One side of the pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum Asset {
    /// The synthetic asset (priced against B)
    #[default]
    A,
    /// The quote asset
    B,
}

impl Asset {
    /// The other side of the pair
    pub fn other(self) -> Self {
        match self {
            Asset::A => Asset::B,
            Asset::B => Asset::A,
        }
    }
}

/// Direction of a pool swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum SwapDirection {
    /// Pay asset A, receive asset B
    AToB,
    /// Pay asset B, receive asset A
    BToA,
}

impl SwapDirection {
    /// Asset paid into the pool
    pub fn input_asset(self) -> Asset {
        match self {
            SwapDirection::AToB => Asset::A,
            SwapDirection::BToA => Asset::B,
        }
    }

    /// Asset paid out of the pool
    pub fn output_asset(self) -> Asset {
        self.input_asset().other()
    }
}

/// Direction of a corrective intervention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum InterventionDirection {
    /// Pool price below fair value: supply B, buy A
    BuySupport,
    /// Pool price at or above fair value: supply A, sell it for B
    SellCap,
}

impl InterventionDirection {
    /// Direction implied by a pool price relative to the fair value
    pub fn from_prices(pool_price: u128, fair_value: u128) -> Self {
        if pool_price < fair_value {
            InterventionDirection::BuySupport
        } else {
            InterventionDirection::SellCap
        }
    }

    /// Asset the engine spends from its own reserve
    pub fn supplied_asset(self) -> Asset {
        match self {
            InterventionDirection::BuySupport => Asset::B,
            InterventionDirection::SellCap => Asset::A,
        }
    }

    /// The pool swap that executes this intervention
    pub fn swap_direction(self) -> SwapDirection {
        match self {
            InterventionDirection::BuySupport => SwapDirection::BToA,
            InterventionDirection::SellCap => SwapDirection::AToB,
        }
    }
}

// ============ Ephemeral Results ============

/// Outcome of one pool swap. Consumed by the post-trade observer, not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct SwapResult {
    /// Swap direction
    pub direction: SwapDirection,
    /// Gross input, native units of the input asset
    pub amount_in: u128,
    /// Output, native units of the output asset
    pub amount_out: u128,
    /// Pool fee retained from the input
    pub fee_amount: u128,
}

/// Audit record of one executed intervention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct InterventionRecord {
    /// Intervention direction
    pub direction: InterventionDirection,
    /// Amount of the supplied asset taken from the engine reserve (fee included)
    pub amount_in: u128,
    /// Amount received from the counter-swap
    pub amount_out: u128,
    /// Fee retained, in the supplied asset
    pub fee_charged: u128,
    /// Fee credited to `accumulated_fees`, in the fee-denomination asset
    pub fee_booked: u128,
    /// Deviation that triggered the intervention
    pub deviation_bps: u64,
}
