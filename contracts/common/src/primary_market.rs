//! Primary Market Quotes
//!
//! Mint and redeem the synthetic asset directly against collateral at the
//! oracle's fair value, minus a risk-scaled penalty. The mint/burn gate
//! itself lives elsewhere; these are the pricing formulas it uses.
//!
//! ## Penalty Schedule
//!
//! - Redemption: `min(300 + risk / 10, 5000)` bps
//! - Mint: `min(50 + risk / 20, 2000)` bps
//!
//! Higher oracle risk widens both spreads, which makes primary-market
//! arbitrage against the pool less attractive when the NAV is uncertain.

use crate::constants::precision::{PRICE_DECIMALS, PRICE_SCALE};
use crate::constants::primary_market::*;
use crate::errors::{PegError, PegResult};
use crate::math::{apply_bps_discount, mul_div, normalize_amount, safe_sub};

/// Priced primary-market operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryMarketQuote {
    /// Amount handed in, native units of the input asset
    pub amount_in: u128,
    /// Value before the penalty, native units of the output asset
    pub gross_out: u128,
    /// Penalty applied (bps)
    pub penalty_bps: u64,
    /// Penalty withheld, native units of the output asset
    pub penalty_amount: u128,
    /// Amount paid out, native units of the output asset
    pub amount_out: u128,
}

/// Redemption penalty for a given oracle risk score
pub fn redemption_penalty_bps(risk_bps: u64) -> u64 {
    REDEMPTION_BASE_PENALTY_BPS
        .saturating_add(risk_bps / REDEMPTION_RISK_DIVISOR)
        .min(MAX_REDEMPTION_PENALTY_BPS)
}

/// Mint premium for a given oracle risk score
pub fn mint_premium_bps(risk_bps: u64) -> u64 {
    MINT_BASE_PREMIUM_BPS
        .saturating_add(risk_bps / MINT_RISK_DIVISOR)
        .min(MAX_MINT_PREMIUM_BPS)
}

fn validate_quote_inputs(amount: u128, nav: u128, from_decimals: u8, to_decimals: u8) -> PegResult<()> {
    if amount == 0 {
        return Err(PegError::ZeroAmount);
    }
    if nav == 0 {
        return Err(PegError::DIVISION_BY_ZERO);
    }
    if from_decimals > PRICE_DECIMALS || to_decimals > PRICE_DECIMALS {
        return Err(PegError::InvalidParameter {
            param: "decimals",
            reason: "exceeds the 18-decimal price scale",
        });
    }
    Ok(())
}

/// Quote redeeming `amount` synthetic units for collateral.
///
/// out = amount * nav / 1e18 * (10_000 - penalty) / 10_000
///
/// `amount` is in synthetic decimals; the result is rescaled to
/// collateral decimals.
pub fn quote_redemption(
    amount: u128,
    nav: u128,
    risk_bps: u64,
    synthetic_decimals: u8,
    collateral_decimals: u8,
) -> PegResult<PrimaryMarketQuote> {
    validate_quote_inputs(amount, nav, synthetic_decimals, collateral_decimals)?;

    let value = mul_div(amount, nav, PRICE_SCALE)?;
    let gross_out = normalize_amount(value, synthetic_decimals, collateral_decimals)?;
    let penalty_bps = redemption_penalty_bps(risk_bps);
    let amount_out = apply_bps_discount(gross_out, penalty_bps)?;

    Ok(PrimaryMarketQuote {
        amount_in: amount,
        gross_out,
        penalty_bps,
        penalty_amount: safe_sub(gross_out, amount_out)?,
        amount_out,
    })
}

/// Quote minting synthetic units against `collateral`.
///
/// out = collateral * 1e18 / nav * (10_000 - premium) / 10_000
///
/// `collateral` is in collateral decimals; the result is rescaled to
/// synthetic decimals.
pub fn quote_mint(
    collateral: u128,
    nav: u128,
    risk_bps: u64,
    collateral_decimals: u8,
    synthetic_decimals: u8,
) -> PegResult<PrimaryMarketQuote> {
    validate_quote_inputs(collateral, nav, collateral_decimals, synthetic_decimals)?;

    let units = mul_div(collateral, PRICE_SCALE, nav)?;
    let gross_out = normalize_amount(units, collateral_decimals, synthetic_decimals)?;
    let premium_bps = mint_premium_bps(risk_bps);
    let amount_out = apply_bps_discount(gross_out, premium_bps)?;

    Ok(PrimaryMarketQuote {
        amount_in: collateral,
        gross_out,
        penalty_bps: premium_bps,
        penalty_amount: safe_sub(gross_out, amount_out)?,
        amount_out,
    })
}
