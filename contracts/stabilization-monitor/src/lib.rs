//! Stabilization Monitor Contract
//!
//! Post-trade observer of the trading pool. After every swap it compares
//! the pool's spot price with the oracle's fair value and, when the gap is
//! wider than the threshold, asks the intervention engine for exactly one
//! corrective counter-swap.
//!
//! ## Reentrancy
//!
//! The engine's counter-swap goes back through the pool, which notifies
//! this monitor again. A two-phase guard bounds the chain:
//!
//! ```text
//! Idle --(deviation > threshold)--> Intervening --(guard dropped)--> Idle
//!                                        |
//!                     nested on_swap: returns immediately
//! ```
//!
//! The guard is released on every exit path, including unwinding.
//!
//! ## Best Effort
//!
//! Stabilization never fails a trade. An intervention error, or an error
//! while evaluating the post-swap state, is logged and recorded as a
//! diagnostic event; the originating swap stands.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use pegkeeper_common::{
    config::{MonitorConfig, StackConfig},
    errors::{PegError, PegResult},
    events::{EventLog, EventType, PegEvent},
    math::deviation_bps,
    observer::PostTradeObserver,
    types::{Address, InterventionDirection, PoolId, SwapResult},
};
use pegkeeper_fair_value_oracle::FairValueOracle;
use pegkeeper_intervention_engine::InterventionEngine;
use pegkeeper_trading_pool::TradingPool;

#[cfg(test)]
mod integration_tests;

// ============ Phase and Guard ============

/// Per-call-stack reentrancy phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MonitorPhase {
    #[default]
    Idle,
    Intervening,
}

/// Holds the monitor in `Intervening` for its lifetime
struct InterventionGuard<'a> {
    phase: &'a Cell<MonitorPhase>,
}

impl<'a> InterventionGuard<'a> {
    fn enter(phase: &'a Cell<MonitorPhase>) -> Self {
        phase.set(MonitorPhase::Intervening);
        Self { phase }
    }
}

impl Drop for InterventionGuard<'_> {
    fn drop(&mut self) {
        self.phase.set(MonitorPhase::Idle);
    }
}

// ============ Results ============

/// Read-only stabilization diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilizationCheck {
    /// Deviation is strictly above the threshold
    pub should_trigger: bool,
    /// Direction an intervention would take
    pub direction: InterventionDirection,
    /// |pool_price - fair_value| * 10_000 / fair_value
    pub deviation_bps: u64,
    /// Pool spot price (1e18 scale)
    pub pool_price: u128,
    /// Oracle fair value (1e18 scale)
    pub fair_value: u128,
}

/// Monitor counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MonitorStats {
    /// Notifications received for the watched pool, nested ones included.
    /// A counter-swap rolled back by a failed intervention is not counted.
    pub swaps_observed: u64,
    /// Nested notifications ignored while intervening (same rollback rule)
    pub reentrant_skips: u64,
    /// Calls made to the engine
    pub interventions_attempted: u64,
    /// Engine calls that returned an error
    pub interventions_failed: u64,
}

// ============ Monitor ============

/// Watches one pool against one oracle and drives one engine
pub struct StabilizationMonitor {
    config: MonitorConfig,
    pool: Rc<TradingPool>,
    oracle: Rc<FairValueOracle>,
    engine: Rc<InterventionEngine>,
    phase: Cell<MonitorPhase>,
    stats: Cell<MonitorStats>,
    events: RefCell<EventLog>,
}

impl StabilizationMonitor {
    /// Create a monitor. The engine must accept `config.address` as its monitor.
    pub fn new(
        config: MonitorConfig,
        pool: Rc<TradingPool>,
        oracle: Rc<FairValueOracle>,
        engine: Rc<InterventionEngine>,
    ) -> PegResult<Self> {
        config.validate()?;

        if engine.config().monitor != config.address {
            return Err(PegError::InvalidParameter {
                param: "address",
                reason: "engine does not accept this monitor",
            });
        }

        Ok(Self {
            config,
            pool,
            oracle,
            engine,
            phase: Cell::new(MonitorPhase::Idle),
            stats: Cell::new(MonitorStats::default()),
            events: RefCell::new(EventLog::new()),
        })
    }

    /// Identity presented to the engine
    pub fn address(&self) -> Address {
        self.config.address
    }

    /// Monitor configuration
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Current reentrancy phase; `Idle` between top-level calls
    pub fn phase(&self) -> MonitorPhase {
        self.phase.get()
    }

    /// Counters since construction
    pub fn stats(&self) -> MonitorStats {
        self.stats.get()
    }

    /// Read-only diagnostic of the watched pool. No side effects.
    ///
    /// # Errors
    /// - `UnknownPool` for any pool other than the watched one
    /// - errors reading the pool price (e.g. `NotInitialized`)
    pub fn check_stabilization(&self, pool_id: &PoolId) -> PegResult<StabilizationCheck> {
        if *pool_id != self.pool.id() {
            return Err(PegError::UnknownPool { pool_id: *pool_id });
        }
        self.evaluate()
    }

    /// All events emitted so far
    pub fn events(&self) -> Vec<PegEvent> {
        self.events.borrow().events().to_vec()
    }

    /// Number of events of one type
    pub fn event_count(&self, event_type: EventType) -> usize {
        self.events.borrow().count(event_type)
    }

    fn evaluate(&self) -> PegResult<StabilizationCheck> {
        let pool_price = self.pool.get_price()?;
        let (fair_value, _risk) = self.oracle.read();
        let deviation = deviation_bps(pool_price, fair_value)?;

        Ok(StabilizationCheck {
            should_trigger: deviation > self.config.threshold_bps,
            direction: InterventionDirection::from_prices(pool_price, fair_value),
            deviation_bps: deviation,
            pool_price,
            fair_value,
        })
    }

    fn record(&self, update: impl FnOnce(&mut MonitorStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }
}

impl PostTradeObserver for StabilizationMonitor {
    fn on_swap(&self, pool_id: &PoolId, _result: &SwapResult) {
        if *pool_id != self.pool.id() {
            debug!("ignoring swap notification from a foreign pool");
            return;
        }
        self.record(|s| s.swaps_observed = s.swaps_observed.saturating_add(1));

        // 1. Nested notification from our own counter-swap
        if self.phase.get() == MonitorPhase::Intervening {
            self.record(|s| s.reentrant_skips = s.reentrant_skips.saturating_add(1));
            debug!("nested swap during intervention, skipping");
            return;
        }

        // 2. Evaluate; failures here must not reach the swapper either
        let check = match self.evaluate() {
            Ok(check) => check,
            Err(err) => {
                warn!("stabilization check failed: {}", err);
                self.events.borrow_mut().emit(PegEvent::StabilizationCheckFailed {
                    pool_id: *pool_id,
                    error_code: err.code().to_string(),
                });
                return;
            }
        };

        // 3. Within band
        if !check.should_trigger {
            return;
        }

        // 4. One intervention, guard held until the end of scope
        let _guard = InterventionGuard::enter(&self.phase);
        self.record(|s| s.interventions_attempted = s.interventions_attempted.saturating_add(1));
        let stats_before = self.stats.get();
        info!(
            "deviation {} bps above threshold {} bps, intervening {:?}",
            check.deviation_bps, self.config.threshold_bps, check.direction
        );

        if let Err(err) = self
            .engine
            .intervene(self.config.address, check.direction, check.deviation_bps)
        {
            // The engine undid its counter-swap; so do the nested counters
            self.stats.set(stats_before);
            self.record(|s| s.interventions_failed = s.interventions_failed.saturating_add(1));
            warn!("intervention failed: {}", err);
            self.events.borrow_mut().emit(PegEvent::InterventionFailed {
                pool_id: *pool_id,
                direction: check.direction,
                deviation_bps: check.deviation_bps,
                error_code: err.code().to_string(),
            });
        }
    }
}

// ============ Wiring ============

/// A fully wired pool, oracle, engine and monitor
pub struct StabilizationStack {
    pub pool: Rc<TradingPool>,
    pub oracle: Rc<FairValueOracle>,
    pub engine: Rc<InterventionEngine>,
    pub monitor: Rc<StabilizationMonitor>,
}

impl StabilizationStack {
    /// Build every component and register the monitor as the pool observer.
    ///
    /// The pool is returned uninitialized.
    pub fn build(config: &StackConfig) -> PegResult<Self> {
        config.validate()?;

        let oracle = Rc::new(FairValueOracle::new(&config.oracle)?);
        let pool = Rc::new(TradingPool::new(config.pool.clone())?);
        let engine = Rc::new(InterventionEngine::new(
            config.engine.clone(),
            Rc::clone(&pool),
        )?);
        let monitor = Rc::new(StabilizationMonitor::new(
            config.monitor.clone(),
            Rc::clone(&pool),
            Rc::clone(&oracle),
            Rc::clone(&engine),
        )?);

        // Pool holds the monitor weakly; the stack owns it
        let observer: Rc<dyn PostTradeObserver> = monitor.clone();
        pool.set_observer(config.pool.admin, Rc::downgrade(&observer))?;

        info!(
            "stabilization stack ready for {}/{}",
            config.pool.asset_a.symbol, config.pool.asset_b.symbol
        );

        Ok(Self {
            pool,
            oracle,
            engine,
            monitor,
        })
    }
}
