//! Protocol Constants
//!
//! All magic numbers and default configuration values for the
//! stabilization engine. Runtime configuration structs in
//! [`crate::config`] take their defaults from here.

/// Fixed-point precision
pub mod precision {
    /// Basis points denominator (10_000 bps = 100%)
    pub const BPS_DENOMINATOR: u64 = 10_000;

    /// Decimal places of fair value and pool price
    pub const PRICE_DECIMALS: u8 = 18;

    /// One unit on the price scale (1.0 = 1e18)
    pub const PRICE_SCALE: u128 = 1_000_000_000_000_000_000;

    /// Highest native decimal scale an asset may declare.
    /// Amounts are normalized *up* to the price scale, never down.
    pub const MAX_ASSET_DECIMALS: u8 = PRICE_DECIMALS;
}

/// Trading pool defaults
pub mod pool {
    /// Default swap fee (0.3%)
    pub const DEFAULT_FEE_BPS: u16 = 30;

    /// Maximum swap fee (10%)
    pub const MAX_FEE_BPS: u16 = 1_000;

    /// Domain tag mixed into the pool id hash
    pub const POOL_ID_DOMAIN: &[u8] = b"pegkeeper/pool/v1";
}

/// Stabilization monitor defaults
pub mod stabilization {
    /// Deviation above which an intervention is triggered (5%)
    pub const THRESHOLD_BPS: u64 = 500;

    /// Upper bound accepted for a configured threshold (100%)
    pub const MAX_THRESHOLD_BPS: u64 = 10_000;
}

/// Intervention engine defaults
pub mod intervention {
    /// Fee retained from every intervention (0.5%)
    pub const INTERVENTION_FEE_BPS: u64 = 50;

    /// Maximum configurable intervention fee (10%)
    pub const MAX_INTERVENTION_FEE_BPS: u64 = 1_000;

    /// Divisor of the proportional sizing policy.
    ///
    /// `amount = held * deviation_bps / 100_000`, so a 10% deviation
    /// commits 1% of the held balance and a 100% deviation commits 10%.
    pub const PROPORTIONAL_SIZING_DIVISOR_BPS: u64 = 100_000;

    /// Fraction committed by the fixed-fraction sizing policy (50%)
    pub const FIXED_FRACTION_SIZING_BPS: u64 = 5_000;
}

/// Oracle bounds
pub mod oracle {
    /// Maximum risk score (100%)
    pub const MAX_RISK_BPS: u16 = 10_000;
}

/// Primary-market (mint/redeem) quote parameters
pub mod primary_market {
    /// Base redemption penalty (3%)
    pub const REDEMPTION_BASE_PENALTY_BPS: u64 = 300;

    /// Risk score divisor for the redemption penalty
    pub const REDEMPTION_RISK_DIVISOR: u64 = 10;

    /// Redemption penalty cap (50%)
    pub const MAX_REDEMPTION_PENALTY_BPS: u64 = 5_000;

    /// Base mint premium (0.5%)
    pub const MINT_BASE_PREMIUM_BPS: u64 = 50;

    /// Risk score divisor for the mint premium
    pub const MINT_RISK_DIVISOR: u64 = 20;

    /// Mint premium cap (20%)
    pub const MAX_MINT_PREMIUM_BPS: u64 = 2_000;
}
