//! Trading Pool Contract
//!
//! Constant-product market maker for exactly one pair (A quoted in B)
//! with a fixed swap fee.
//!
//! ## Post-Trade Hook
//!
//! After every swap has updated the reserves, the pool synchronously
//! notifies its registered [`PostTradeObserver`] before returning to the
//! caller. The pool releases its own state before the call, so the
//! observer may swap against the pool again:
//!
//! ```text
//! swap()
//!   compute quote      (no state touched on failure)
//!   update reserves    (both sides at once)
//!   emit Swap
//!   observer.on_swap() (may re-enter swap)
//!   return result
//! ```

use std::cell::RefCell;
use std::rc::Weak;

use borsh::{BorshDeserialize, BorshSerialize};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use pegkeeper_common::{
    config::PoolConfig,
    errors::{PegError, PegResult},
    events::{EventLog, EventType, PegEvent},
    math::{constant_product_out, safe_add, safe_sub, spot_price},
    observer::PostTradeObserver,
    types::{derive_pool_id, Address, PoolId, SwapDirection, SwapResult},
};

// ============ Pool State ============

/// Persistent pool state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PoolState {
    /// Reserve of asset A, native units
    pub reserve_a: u128,
    /// Reserve of asset B, native units
    pub reserve_b: u128,
    /// Swap fee (bps)
    pub fee_bps: u16,
    /// Whether initial reserves have been set
    pub initialized: bool,
}

impl PoolState {
    /// Empty, uninitialized pool
    pub fn new(fee_bps: u16) -> Self {
        Self {
            reserve_a: 0,
            reserve_b: 0,
            fee_bps,
            initialized: false,
        }
    }

    /// (reserve_in, reserve_out) for a swap direction
    fn reserves_for(&self, direction: SwapDirection) -> (u128, u128) {
        match direction {
            SwapDirection::AToB => (self.reserve_a, self.reserve_b),
            SwapDirection::BToA => (self.reserve_b, self.reserve_a),
        }
    }

    /// Quote a swap against this state without mutating it
    fn quote(&self, direction: SwapDirection, amount_in: u128) -> PegResult<SwapResult> {
        if !self.initialized {
            return Err(PegError::NotInitialized);
        }
        if amount_in == 0 {
            return Err(PegError::ZeroAmount);
        }

        let (reserve_in, reserve_out) = self.reserves_for(direction);
        let quote = constant_product_out(reserve_in, reserve_out, amount_in, self.fee_bps)?;

        if quote.amount_out == 0 {
            return Err(PegError::InsufficientOutputAmount);
        }

        Ok(SwapResult {
            direction,
            amount_in,
            amount_out: quote.amount_out,
            fee_amount: quote.fee_amount,
        })
    }

    /// State after applying a quoted swap. The fee stays in the input reserve.
    fn after_swap(&self, result: &SwapResult) -> PegResult<PoolState> {
        let mut next = *self;
        match result.direction {
            SwapDirection::AToB => {
                next.reserve_a = safe_add(self.reserve_a, result.amount_in)?;
                next.reserve_b = safe_sub(self.reserve_b, result.amount_out)?;
            }
            SwapDirection::BToA => {
                next.reserve_b = safe_add(self.reserve_b, result.amount_in)?;
                next.reserve_a = safe_sub(self.reserve_a, result.amount_out)?;
            }
        }
        Ok(next)
    }
}

/// Opaque snapshot for rolling a pool back to an earlier point.
///
/// Taken by callers that compose a swap into a larger all-or-nothing
/// operation.
#[derive(Debug, Clone)]
pub struct PoolCheckpoint {
    pool_id: PoolId,
    state: PoolState,
    event_len: usize,
}

// ============ Trading Pool ============

/// Constant-product pool with a post-trade observer
pub struct TradingPool {
    id: PoolId,
    config: PoolConfig,
    state: RefCell<PoolState>,
    observer: RefCell<Option<Weak<dyn PostTradeObserver>>>,
    events: RefCell<EventLog>,
}

impl TradingPool {
    /// Create an uninitialized pool for the configured pair
    pub fn new(config: PoolConfig) -> PegResult<Self> {
        config.validate()?;

        let id = derive_pool_id(&config.asset_a.id, &config.asset_b.id);
        info!(
            "pool {}/{} created, fee {} bps",
            config.asset_a.symbol, config.asset_b.symbol, config.fee_bps
        );

        Ok(Self {
            id,
            state: RefCell::new(PoolState::new(config.fee_bps)),
            config,
            observer: RefCell::new(None),
            events: RefCell::new(EventLog::new()),
        })
    }

    /// Pool identity
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Copy of the current state
    pub fn state(&self) -> PoolState {
        *self.state.borrow()
    }

    /// Set the initial reserves. Only once.
    pub fn initialize(&self, reserve_a0: u128, reserve_b0: u128) -> PegResult<()> {
        {
            let mut state = self.state.borrow_mut();
            if state.initialized {
                return Err(PegError::AlreadyInitialized);
            }
            if reserve_a0 == 0 || reserve_b0 == 0 {
                return Err(PegError::ZeroAmount);
            }

            state.reserve_a = reserve_a0;
            state.reserve_b = reserve_b0;
            state.initialized = true;
        }

        self.events.borrow_mut().emit(PegEvent::PoolInitialized {
            pool_id: self.id,
            reserve_a: reserve_a0,
            reserve_b: reserve_b0,
        });
        info!("pool initialized with reserves {} / {}", reserve_a0, reserve_b0);

        Ok(())
    }

    /// Increase both reserves. Single-provider model, no LP shares.
    pub fn add_liquidity(&self, provider: Address, amount_a: u128, amount_b: u128) -> PegResult<()> {
        {
            let mut state = self.state.borrow_mut();
            if !state.initialized {
                return Err(PegError::NotInitialized);
            }
            if amount_a == 0 && amount_b == 0 {
                return Err(PegError::ZeroAmount);
            }

            let reserve_a = safe_add(state.reserve_a, amount_a)?;
            let reserve_b = safe_add(state.reserve_b, amount_b)?;
            state.reserve_a = reserve_a;
            state.reserve_b = reserve_b;
        }

        self.events.borrow_mut().emit(PegEvent::LiquidityAdded {
            pool_id: self.id,
            provider,
            amount_a,
            amount_b,
        });
        info!("liquidity added: {} A, {} B", amount_a, amount_b);

        Ok(())
    }

    /// Read-only swap quote against the current reserves
    pub fn quote_swap(&self, direction: SwapDirection, amount_in: u128) -> PegResult<SwapResult> {
        self.state.borrow().quote(direction, amount_in)
    }

    /// Exact-input swap.
    ///
    /// Reserves are updated atomically; on error nothing changes. The
    /// registered observer runs after the update and before this returns.
    ///
    /// # Errors
    /// - `NotInitialized` before `initialize`
    /// - `ZeroAmount` for a zero input
    /// - `InsufficientLiquidity` if the output reserve is empty or would be drained
    /// - `InsufficientOutputAmount` if the output floors to zero
    /// - `Arithmetic` on overflow
    pub fn swap(
        &self,
        trader: Address,
        direction: SwapDirection,
        amount_in: u128,
    ) -> PegResult<SwapResult> {
        let result = {
            let mut state = self.state.borrow_mut();
            let result = state.quote(direction, amount_in)?;
            *state = state.after_swap(&result)?;
            result
        };

        self.events.borrow_mut().emit(PegEvent::Swap {
            pool_id: self.id,
            trader,
            direction,
            amount_in: result.amount_in,
            amount_out: result.amount_out,
            fee: result.fee_amount,
        });
        debug!(
            "swap {:?}: in {} out {} fee {}",
            direction, result.amount_in, result.amount_out, result.fee_amount
        );

        self.notify_observer(&result);

        Ok(result)
    }

    /// Spot price of A in B, 18-decimal fixed point, decimals normalized
    pub fn get_price(&self) -> PegResult<u128> {
        let state = self.state.borrow();
        if !state.initialized {
            return Err(PegError::NotInitialized);
        }
        spot_price(
            state.reserve_a,
            self.config.asset_a.decimals,
            state.reserve_b,
            self.config.asset_b.decimals,
        )
    }

    /// Current reserves (A, B), native units
    pub fn get_reserves(&self) -> (u128, u128) {
        let state = self.state.borrow();
        (state.reserve_a, state.reserve_b)
    }

    /// Register the post-trade observer. Admin only.
    ///
    /// The observer is held weakly; a dropped observer is simply skipped.
    pub fn set_observer(
        &self,
        caller: Address,
        observer: Weak<dyn PostTradeObserver>,
    ) -> PegResult<()> {
        if caller != self.config.admin {
            return Err(PegError::Unauthorized {
                expected: self.config.admin,
                actual: caller,
            });
        }

        *self.observer.borrow_mut() = Some(observer);
        self.events
            .borrow_mut()
            .emit(PegEvent::ObserverRegistered { pool_id: self.id });
        info!("post-trade observer registered");

        Ok(())
    }

    /// Snapshot reserves and event log position
    pub fn checkpoint(&self) -> PoolCheckpoint {
        PoolCheckpoint {
            pool_id: self.id,
            state: *self.state.borrow(),
            event_len: self.events.borrow().len(),
        }
    }

    /// Roll reserves and events back to a checkpoint of this pool
    pub fn restore(&self, checkpoint: PoolCheckpoint) -> PegResult<()> {
        if checkpoint.pool_id != self.id {
            return Err(PegError::UnknownPool {
                pool_id: checkpoint.pool_id,
            });
        }

        *self.state.borrow_mut() = checkpoint.state;
        self.events.borrow_mut().truncate(checkpoint.event_len);
        debug!("pool restored to checkpoint");

        Ok(())
    }

    /// All events emitted so far
    pub fn events(&self) -> Vec<PegEvent> {
        self.events.borrow().events().to_vec()
    }

    /// Number of events of one type
    pub fn event_count(&self, event_type: EventType) -> usize {
        self.events.borrow().count(event_type)
    }

    fn notify_observer(&self, result: &SwapResult) {
        // Upgrade first so no borrow is held across the callback
        let observer = self.observer.borrow().as_ref().and_then(Weak::upgrade);
        if let Some(observer) = observer {
            observer.on_swap(&self.id, result);
        }
    }
}

// ============ Tests ============
