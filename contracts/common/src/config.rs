//! Runtime Configuration
//!
//! Serde-deserializable parameter sets for each component. Defaults come
//! from [`crate::constants`]; every set validates itself before a
//! component accepts it.

use serde::{Deserialize, Serialize};

use crate::constants::{intervention, oracle, pool, precision, stabilization};
use crate::errors::{PegError, PegResult};
use crate::math::{bps_of, mul_div};
use crate::types::{Address, Asset, AssetId, ZERO_ADDRESS};

/// One asset of the pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Asset identifier
    pub id: AssetId,
    /// Ticker, for logs only
    pub symbol: String,
    /// Native decimal places
    pub decimals: u8,
}

impl AssetConfig {
    /// Create an asset config
    pub fn new(id: AssetId, symbol: &str, decimals: u8) -> Self {
        Self {
            id,
            symbol: symbol.to_string(),
            decimals,
        }
    }

    /// Validate decimals against the price scale
    pub fn validate(&self) -> PegResult<()> {
        if self.decimals > precision::MAX_ASSET_DECIMALS {
            return Err(PegError::InvalidParameter {
                param: "decimals",
                reason: "exceeds the 18-decimal price scale",
            });
        }
        Ok(())
    }
}

/// Trading pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Synthetic asset
    pub asset_a: AssetConfig,
    /// Quote asset
    pub asset_b: AssetConfig,
    /// Swap fee in bps
    pub fee_bps: u16,
    /// May register the post-trade observer
    pub admin: Address,
}

impl PoolConfig {
    /// Decimals of one side of the pair
    pub fn decimals(&self, asset: Asset) -> u8 {
        match asset {
            Asset::A => self.asset_a.decimals,
            Asset::B => self.asset_b.decimals,
        }
    }

    /// Validate the pool configuration
    pub fn validate(&self) -> PegResult<()> {
        self.asset_a.validate()?;
        self.asset_b.validate()?;

        if self.asset_a.id == self.asset_b.id {
            return Err(PegError::InvalidParameter {
                param: "asset_b",
                reason: "identical to asset_a",
            });
        }

        if self.fee_bps > pool::MAX_FEE_BPS {
            return Err(PegError::InvalidParameter {
                param: "fee_bps",
                reason: "above maximum pool fee",
            });
        }

        if self.admin == ZERO_ADDRESS {
            return Err(PegError::InvalidParameter {
                param: "admin",
                reason: "zero address",
            });
        }

        Ok(())
    }
}

/// Stabilization monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Identity the monitor presents to the intervention engine
    pub address: Address,
    /// Deviation strictly above which an intervention fires
    pub threshold_bps: u64,
}

impl MonitorConfig {
    /// Config with the default 5% threshold
    pub fn new(address: Address) -> Self {
        Self {
            address,
            threshold_bps: stabilization::THRESHOLD_BPS,
        }
    }

    /// Validate the monitor configuration
    pub fn validate(&self) -> PegResult<()> {
        if self.address == ZERO_ADDRESS {
            return Err(PegError::InvalidParameter {
                param: "address",
                reason: "zero address",
            });
        }
        if self.threshold_bps > stabilization::MAX_THRESHOLD_BPS {
            return Err(PegError::InvalidParameter {
                param: "threshold_bps",
                reason: "above 100%",
            });
        }
        Ok(())
    }
}

/// How much of the held balance a single intervention commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizingPolicy {
    /// `min(held, held * deviation_bps / divisor_bps)`
    ProportionalToDeviation { divisor_bps: u64 },
    /// `held * fraction_bps / 10_000`, independent of deviation
    FixedFraction { fraction_bps: u64 },
}

impl Default for SizingPolicy {
    fn default() -> Self {
        SizingPolicy::ProportionalToDeviation {
            divisor_bps: intervention::PROPORTIONAL_SIZING_DIVISOR_BPS,
        }
    }
}

impl SizingPolicy {
    /// Amount of `held` to commit for a given deviation
    pub fn size(&self, held: u128, deviation_bps: u64) -> PegResult<u128> {
        match *self {
            SizingPolicy::ProportionalToDeviation { divisor_bps } => {
                let amount = mul_div(held, deviation_bps as u128, divisor_bps as u128)?;
                Ok(amount.min(held))
            }
            SizingPolicy::FixedFraction { fraction_bps } => bps_of(held, fraction_bps),
        }
    }

    /// Validate the policy parameters
    pub fn validate(&self) -> PegResult<()> {
        match *self {
            SizingPolicy::ProportionalToDeviation { divisor_bps } if divisor_bps == 0 => {
                Err(PegError::InvalidParameter {
                    param: "divisor_bps",
                    reason: "must be non-zero",
                })
            }
            SizingPolicy::FixedFraction { fraction_bps }
                if fraction_bps == 0 || fraction_bps > precision::BPS_DENOMINATOR =>
            {
                Err(PegError::InvalidParameter {
                    param: "fraction_bps",
                    reason: "must be within (0, 10000]",
                })
            }
            _ => Ok(()),
        }
    }
}

/// Intervention engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// May withdraw fees and administer the engine
    pub operator: Address,
    /// Only caller allowed to trigger `intervene`
    pub monitor: Address,
    /// Identity the engine trades under
    pub address: Address,
    /// Fee retained from every intervention
    pub intervention_fee_bps: u64,
    /// Intervention sizing policy
    pub sizing: SizingPolicy,
    /// Asset `accumulated_fees` is denominated in
    pub fee_asset: Asset,
}

impl EngineConfig {
    /// Config with default fee, sizing and fee asset
    pub fn new(operator: Address, monitor: Address, address: Address) -> Self {
        Self {
            operator,
            monitor,
            address,
            intervention_fee_bps: intervention::INTERVENTION_FEE_BPS,
            sizing: SizingPolicy::default(),
            fee_asset: Asset::A,
        }
    }

    /// Validate the engine configuration
    pub fn validate(&self) -> PegResult<()> {
        for (param, address) in [
            ("operator", self.operator),
            ("monitor", self.monitor),
            ("address", self.address),
        ] {
            if address == ZERO_ADDRESS {
                return Err(PegError::InvalidParameter {
                    param,
                    reason: "zero address",
                });
            }
        }

        if self.intervention_fee_bps > intervention::MAX_INTERVENTION_FEE_BPS {
            return Err(PegError::InvalidParameter {
                param: "intervention_fee_bps",
                reason: "above maximum intervention fee",
            });
        }

        self.sizing.validate()
    }
}

/// Oracle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Single authorized writer
    pub updater: Address,
    /// Initial fair value (1e18 scale)
    pub fair_value: u128,
    /// Initial risk score (bps)
    pub risk_bps: u16,
}

impl OracleConfig {
    /// Validate the oracle configuration
    pub fn validate(&self) -> PegResult<()> {
        if self.updater == ZERO_ADDRESS {
            return Err(PegError::InvalidParameter {
                param: "updater",
                reason: "zero address",
            });
        }
        if self.fair_value == 0 {
            return Err(PegError::ZeroAmount);
        }
        if self.risk_bps > oracle::MAX_RISK_BPS {
            return Err(PegError::InvalidParameter {
                param: "risk_bps",
                reason: "above 100%",
            });
        }
        Ok(())
    }
}

/// Everything needed to assemble a full stabilization stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackConfig {
    /// Pool parameters
    pub pool: PoolConfig,
    /// Oracle parameters
    pub oracle: OracleConfig,
    /// Monitor parameters
    pub monitor: MonitorConfig,
    /// Engine parameters
    pub engine: EngineConfig,
}

impl StackConfig {
    /// Validate every part and their cross-references
    pub fn validate(&self) -> PegResult<()> {
        self.pool.validate()?;
        self.oracle.validate()?;
        self.monitor.validate()?;
        self.engine.validate()?;

        if self.engine.monitor != self.monitor.address {
            return Err(PegError::InvalidParameter {
                param: "engine.monitor",
                reason: "does not match monitor address",
            });
        }
        Ok(())
    }
}
