//! Mathematical Utilities for the Stabilization Engine
//!
//! Checked fixed-point arithmetic. Amounts are `u128` in native asset
//! units; every product is formed in 256-bit width and narrowed back
//! with an explicit overflow check.

use log::debug;
use primitive_types::U256;

use crate::constants::precision::{BPS_DENOMINATOR, MAX_ASSET_DECIMALS, PRICE_DECIMALS};
use crate::errors::{PegError, PegResult};

/// Narrow a 256-bit intermediate back to `u128`
fn narrow(value: U256) -> PegResult<u128> {
    if value > U256::from(u128::MAX) {
        debug!("256-bit intermediate {} does not fit in u128", value);
        return Err(PegError::OVERFLOW);
    }
    Ok(value.as_u128())
}

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> PegResult<u128> {
    a.checked_add(b).ok_or(PegError::OVERFLOW)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> PegResult<u128> {
    a.checked_sub(b).ok_or(PegError::UNDERFLOW)
}

/// `floor(a * b / denominator)` with a 256-bit intermediate product
pub fn mul_div(a: u128, b: u128, denominator: u128) -> PegResult<u128> {
    if denominator == 0 {
        return Err(PegError::DIVISION_BY_ZERO);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(PegError::OVERFLOW)?;
    narrow(product / U256::from(denominator))
}

/// `amount * bps / 10_000`, rounded down
pub fn bps_of(amount: u128, bps: u64) -> PegResult<u128> {
    mul_div(amount, bps as u128, BPS_DENOMINATOR as u128)
}

/// `amount * (10_000 - bps) / 10_000`, rounded down
pub fn apply_bps_discount(amount: u128, bps: u64) -> PegResult<u128> {
    let keep_bps = BPS_DENOMINATOR.checked_sub(bps).ok_or(PegError::UNDERFLOW)?;
    mul_div(amount, keep_bps as u128, BPS_DENOMINATOR as u128)
}

/// Rescale an amount between two native decimal scales.
///
/// Scaling down truncates. Scaling up fails with `Overflow` instead of
/// saturating.
pub fn normalize_amount(amount: u128, from_decimals: u8, to_decimals: u8) -> PegResult<u128> {
    if from_decimals == to_decimals {
        return Ok(amount);
    }

    if from_decimals > to_decimals {
        let divisor = 10u128
            .checked_pow((from_decimals - to_decimals) as u32)
            .ok_or(PegError::OVERFLOW)?;
        Ok(amount / divisor)
    } else {
        let multiplier = 10u128
            .checked_pow((to_decimals - from_decimals) as u32)
            .ok_or(PegError::OVERFLOW)?;
        amount.checked_mul(multiplier).ok_or_else(|| {
            debug!(
                "rescaling {} from {} to {} decimals overflows",
                amount, from_decimals, to_decimals
            );
            PegError::OVERFLOW
        })
    }
}

/// Spot price of A quoted in B on the 18-decimal price scale.
///
/// Both reserves are lifted to 18 decimals so that a 6-decimal asset and
/// an 18-decimal asset compare on equal terms. The scale factors are
/// folded into one 256-bit quotient:
///
/// price = reserve_b * 10^(18 + dec_a) / (reserve_a * 10^dec_b)
///
/// A zero reserve is a liquidity failure, never an infinite price.
pub fn spot_price(
    reserve_a: u128,
    decimals_a: u8,
    reserve_b: u128,
    decimals_b: u8,
) -> PegResult<u128> {
    if reserve_a == 0 || reserve_b == 0 {
        return Err(PegError::InsufficientLiquidity {
            available: reserve_a.min(reserve_b),
            requested: 1,
        });
    }
    if decimals_a > MAX_ASSET_DECIMALS || decimals_b > MAX_ASSET_DECIMALS {
        return Err(PegError::InvalidParameter {
            param: "decimals",
            reason: "exceeds the 18-decimal price scale",
        });
    }

    let numerator = U256::from(reserve_b)
        .checked_mul(U256::exp10(PRICE_DECIMALS as usize + decimals_a as usize))
        .ok_or(PegError::OVERFLOW)?;
    let denominator = U256::from(reserve_a)
        .checked_mul(U256::exp10(decimals_b as usize))
        .ok_or(PegError::OVERFLOW)?;

    narrow(numerator / denominator)
}

/// Relative distance of `price` from `reference`, in basis points.
///
/// deviation_bps = |price - reference| * 10_000 / reference
///
/// The magnitude does not depend on which side is larger; only the
/// reference in the denominator matters. Saturates at `u64::MAX`.
pub fn deviation_bps(price: u128, reference: u128) -> PegResult<u64> {
    if reference == 0 {
        return Err(PegError::DIVISION_BY_ZERO);
    }

    let diff = price.abs_diff(reference);
    let deviation = U256::from(diff)
        .checked_mul(U256::from(BPS_DENOMINATOR))
        .ok_or(PegError::OVERFLOW)?
        / U256::from(reference);

    if deviation > U256::from(u64::MAX) {
        return Ok(u64::MAX);
    }
    Ok(deviation.as_u64())
}

/// Quote of a constant-product swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantProductQuote {
    /// Input after the pool fee
    pub amount_in_net: u128,
    /// Fee retained by the pool (stays in the reserve)
    pub fee_amount: u128,
    /// Output paid to the trader
    pub amount_out: u128,
}

/// Exact-input constant-product swap.
///
/// amount_in_net = amount_in * (10_000 - fee_bps) / 10_000
/// amount_out    = reserve_out * amount_in_net / (reserve_in + amount_in_net)
///
/// Fails with `InsufficientLiquidity` if the output reserve is empty or
/// the output would drain it.
pub fn constant_product_out(
    reserve_in: u128,
    reserve_out: u128,
    amount_in: u128,
    fee_bps: u16,
) -> PegResult<ConstantProductQuote> {
    if reserve_out == 0 {
        return Err(PegError::InsufficientLiquidity {
            available: 0,
            requested: amount_in,
        });
    }

    let amount_in_net = apply_bps_discount(amount_in, fee_bps as u64)?;
    let fee_amount = safe_sub(amount_in, amount_in_net)?;
    let denominator = safe_add(reserve_in, amount_in_net)?;
    let amount_out = mul_div(reserve_out, amount_in_net, denominator)?;

    if amount_out >= reserve_out {
        return Err(PegError::InsufficientLiquidity {
            available: reserve_out,
            requested: amount_out,
        });
    }

    Ok(ConstantProductQuote {
        amount_in_net,
        fee_amount,
        amount_out,
    })
}

/// Value `amount` of one asset in another at a reserve ratio.
///
/// result = amount * reserve_to / reserve_from
///
/// Both reserves are in native units, so the decimal scales cancel.
pub fn convert_at_reserve_ratio(
    amount: u128,
    reserve_from: u128,
    reserve_to: u128,
) -> PegResult<u128> {
    if reserve_from == 0 {
        return Err(PegError::InsufficientLiquidity {
            available: 0,
            requested: amount,
        });
    }
    mul_div(amount, reserve_to, reserve_from)
}

/// Constant-product invariant `k = reserve_a * reserve_b` in 256-bit width
pub fn constant_product_k(reserve_a: u128, reserve_b: u128) -> U256 {
    // u128 * u128 always fits in 256 bits
    U256::from(reserve_a) * U256::from(reserve_b)
}
