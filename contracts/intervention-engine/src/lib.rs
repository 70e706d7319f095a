//! Intervention Engine Contract
//!
//! Holds a pre-funded reserve of both assets, separate from the pool's
//! reserves, and spends it on corrective counter-swaps when the
//! stabilization monitor asks. A fee is retained from every intervention.
//!
//! ## Intervention Flow
//!
//! 1. Caller must be the monitor; engine must not be paused
//! 2. Size the trade from the held balance of the supplied asset
//! 3. Split off the intervention fee
//! 4. Swap the net amount against the pool (re-enters the pool, and
//!    through it the monitor, which ignores the nested notification)
//! 5. Book the fee, converting it into the fee-denomination asset at the
//!    post-swap reserve ratio
//! 6. Debit the supplied asset, credit the received asset
//!
//! Any failure after step 4 rolls back both the ledger and the pool.
//!
//! ## Known Soft Spot
//!
//! The cross-asset fee valuation in step 5 uses the pool's *current*
//! reserves. Someone who moves the pool right before an intervention
//! changes what the fee is booked at. It is a point-in-time valuation,
//! not a settlement rate.

use std::cell::RefCell;
use std::rc::Rc;

use borsh::{BorshDeserialize, BorshSerialize};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use pegkeeper_common::{
    config::EngineConfig,
    errors::{PegError, PegResult},
    events::{EventLog, EventType, PegEvent},
    math::{bps_of, convert_at_reserve_ratio, safe_add, safe_sub},
    types::{Address, Asset, InterventionDirection, InterventionRecord, ZERO_ADDRESS},
};
use pegkeeper_trading_pool::TradingPool;

// ============ Ledger ============

/// The engine's own warchest. Independent of the pool reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct InterventionLedger {
    /// Held asset A, native units
    pub balance_a: u128,
    /// Held asset B, native units
    pub balance_b: u128,
    /// Fees retained, in the fee-denomination asset
    pub accumulated_fees: u128,
    /// May withdraw fees and administer the engine
    pub operator: Address,
    /// Interventions refused while set
    pub paused: bool,
}

impl InterventionLedger {
    /// Empty ledger
    pub fn new(operator: Address) -> Self {
        Self {
            balance_a: 0,
            balance_b: 0,
            accumulated_fees: 0,
            operator,
            paused: false,
        }
    }

    /// Held balance of one asset
    pub fn balance(&self, asset: Asset) -> u128 {
        match asset {
            Asset::A => self.balance_a,
            Asset::B => self.balance_b,
        }
    }

    fn balance_mut(&mut self, asset: Asset) -> &mut u128 {
        match asset {
            Asset::A => &mut self.balance_a,
            Asset::B => &mut self.balance_b,
        }
    }

    fn credit(&mut self, asset: Asset, amount: u128) -> PegResult<()> {
        let balance = self.balance_mut(asset);
        *balance = safe_add(*balance, amount)?;
        Ok(())
    }

    fn debit(&mut self, asset: Asset, amount: u128) -> PegResult<()> {
        let available = self.balance(asset);
        if amount > available {
            return Err(PegError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        let balance = self.balance_mut(asset);
        *balance = safe_sub(*balance, amount)?;
        Ok(())
    }
}

// ============ Engine ============

/// Executes corrective counter-swaps from its own reserve
pub struct InterventionEngine {
    config: EngineConfig,
    pool: Rc<TradingPool>,
    ledger: RefCell<InterventionLedger>,
    events: RefCell<EventLog>,
}

impl InterventionEngine {
    /// Create an unfunded engine trading against `pool`
    pub fn new(config: EngineConfig, pool: Rc<TradingPool>) -> PegResult<Self> {
        config.validate()?;

        Ok(Self {
            ledger: RefCell::new(InterventionLedger::new(config.operator)),
            config,
            pool,
            events: RefCell::new(EventLog::new()),
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ============ Funding ============

    /// Permissionless top-up of asset A
    pub fn fund_a(&self, from: Address, amount: u128) -> PegResult<()> {
        self.fund(from, Asset::A, amount)
    }

    /// Permissionless top-up of asset B
    pub fn fund_b(&self, from: Address, amount: u128) -> PegResult<()> {
        self.fund(from, Asset::B, amount)
    }

    /// Pull `amount` of `asset` from `from` into the reserve.
    ///
    /// No per-depositor attribution: deposits become engine property.
    pub fn fund(&self, from: Address, asset: Asset, amount: u128) -> PegResult<()> {
        if amount == 0 {
            return Err(PegError::ZeroAmount);
        }

        self.ledger.borrow_mut().credit(asset, amount)?;

        self.events
            .borrow_mut()
            .emit(PegEvent::InterventionFunded { from, asset, amount });
        info!("intervention reserve funded: {} of {:?}", amount, asset);

        Ok(())
    }

    // ============ Intervention ============

    /// Execute one corrective counter-swap. Monitor only.
    ///
    /// All-or-nothing: on error, the ledger and the pool are exactly as
    /// they were before the call.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not the configured monitor
    /// - `InterventionsPaused` while paused
    /// - `InsufficientBalance` if the sized amount is zero
    /// - any error of the counter-swap
    pub fn intervene(
        &self,
        caller: Address,
        direction: InterventionDirection,
        deviation_bps: u64,
    ) -> PegResult<InterventionRecord> {
        if caller != self.config.monitor {
            return Err(PegError::Unauthorized {
                expected: self.config.monitor,
                actual: caller,
            });
        }

        if self.ledger.borrow().paused {
            return Err(PegError::InterventionsPaused);
        }

        let pool_checkpoint = self.pool.checkpoint();
        let ledger_before = *self.ledger.borrow();

        match self.execute_intervention(direction, deviation_bps) {
            Ok(record) => {
                self.events.borrow_mut().emit(PegEvent::InterventionExecuted {
                    direction: record.direction,
                    amount_in: record.amount_in,
                    amount_out: record.amount_out,
                    fee_charged: record.fee_charged,
                    fee_booked: record.fee_booked,
                    deviation_bps: record.deviation_bps,
                });
                info!(
                    "intervention {:?} at {} bps: in {} out {} fee {}",
                    direction, deviation_bps, record.amount_in, record.amount_out, record.fee_charged
                );
                Ok(record)
            }
            Err(err) => {
                *self.ledger.borrow_mut() = ledger_before;
                self.pool.restore(pool_checkpoint)?;
                debug!("intervention rolled back: {}", err.code());
                Err(err)
            }
        }
    }

    fn execute_intervention(
        &self,
        direction: InterventionDirection,
        deviation_bps: u64,
    ) -> PegResult<InterventionRecord> {
        let supplied = direction.supplied_asset();
        let received = supplied.other();

        // 1. Size against the held balance of the supplied asset
        let held = self.ledger.borrow().balance(supplied);
        let amount = self.config.sizing.size(held, deviation_bps)?;
        if amount == 0 {
            return Err(PegError::InsufficientBalance {
                available: held,
                requested: amount,
            });
        }

        // 2. Fee comes out of the sized amount; only the rest is traded
        let fee = bps_of(amount, self.config.intervention_fee_bps)?;
        let net_amount = safe_sub(amount, fee)?;

        // 3. Spend before swapping; no ledger borrow is held across the swap
        self.ledger.borrow_mut().debit(supplied, amount)?;

        let swap = self
            .pool
            .swap(self.config.address, direction.swap_direction(), net_amount)?;

        // 4. Book the fee at the post-swap reserves
        let fee_booked = self.value_in_fee_asset(supplied, fee)?;

        let mut ledger = self.ledger.borrow_mut();
        ledger.credit(received, swap.amount_out)?;
        ledger.accumulated_fees = safe_add(ledger.accumulated_fees, fee_booked)?;

        Ok(InterventionRecord {
            direction,
            amount_in: amount,
            amount_out: swap.amount_out,
            fee_charged: fee,
            fee_booked,
            deviation_bps,
        })
    }

    /// Value `amount` of `asset` in the fee-denomination asset.
    fn value_in_fee_asset(&self, asset: Asset, amount: u128) -> PegResult<u128> {
        if asset == self.config.fee_asset {
            return Ok(amount);
        }

        // Reserve ratio in native units on both sides: the decimal
        // scales cancel, so no normalization is applied here.
        let (reserve_a, reserve_b) = self.pool.get_reserves();
        let (reserve_from, reserve_to) = match asset {
            Asset::A => (reserve_a, reserve_b),
            Asset::B => (reserve_b, reserve_a),
        };
        convert_at_reserve_ratio(amount, reserve_from, reserve_to)
    }

    // ============ Operator Functions ============

    /// Pay out all accumulated fees to the operator. Operator only.
    ///
    /// Returns the amount transferred; a second call right after returns 0.
    pub fn withdraw_fees(&self, caller: Address) -> PegResult<u128> {
        let amount = {
            let mut ledger = self.ledger.borrow_mut();
            if caller != ledger.operator {
                return Err(PegError::Unauthorized {
                    expected: ledger.operator,
                    actual: caller,
                });
            }

            let amount = ledger.accumulated_fees;
            ledger.accumulated_fees = 0;
            amount
        };

        self.events.borrow_mut().emit(PegEvent::FeesWithdrawn {
            operator: caller,
            asset: self.config.fee_asset,
            amount,
        });
        info!("fees withdrawn: {}", amount);

        Ok(amount)
    }

    /// Hand the operator role to `new_operator`. Operator only.
    pub fn set_operator(&self, caller: Address, new_operator: Address) -> PegResult<()> {
        let mut ledger = self.ledger.borrow_mut();
        if caller != ledger.operator {
            return Err(PegError::Unauthorized {
                expected: ledger.operator,
                actual: caller,
            });
        }
        if new_operator == ZERO_ADDRESS {
            return Err(PegError::InvalidParameter {
                param: "operator",
                reason: "zero address",
            });
        }

        let old_operator = ledger.operator;
        ledger.operator = new_operator;

        self.events.borrow_mut().emit(PegEvent::OperatorChanged {
            old_operator,
            new_operator,
        });
        Ok(())
    }

    /// Pause or resume interventions. Operator only.
    pub fn set_paused(&self, caller: Address, paused: bool) -> PegResult<()> {
        let mut ledger = self.ledger.borrow_mut();
        if caller != ledger.operator {
            return Err(PegError::Unauthorized {
                expected: ledger.operator,
                actual: caller,
            });
        }

        ledger.paused = paused;
        self.events
            .borrow_mut()
            .emit(PegEvent::InterventionsPauseChanged { paused });
        info!("interventions {}", if paused { "paused" } else { "resumed" });
        Ok(())
    }

    // ============ Query Functions ============

    /// Held balances (A, B)
    pub fn get_balances(&self) -> (u128, u128) {
        let ledger = self.ledger.borrow();
        (ledger.balance_a, ledger.balance_b)
    }

    /// Fees accrued since the last withdrawal
    pub fn get_accumulated_fees(&self) -> u128 {
        self.ledger.borrow().accumulated_fees
    }

    /// Copy of the full ledger
    pub fn ledger(&self) -> InterventionLedger {
        *self.ledger.borrow()
    }

    /// All events emitted so far
    pub fn events(&self) -> Vec<PegEvent> {
        self.events.borrow().events().to_vec()
    }

    /// Number of events of one type
    pub fn event_count(&self, event_type: EventType) -> usize {
        self.events.borrow().count(event_type)
    }
}

// ============ Tests ============
