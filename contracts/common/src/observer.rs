//! Post-Trade Observer Capability
//!
//! The pool holds a reference to one observer and notifies it after every
//! reserve update, before the swap returns to its caller. The observer may
//! call back into the pool.

use crate::types::{PoolId, SwapResult};

/// Capability invoked synchronously after each pool swap.
///
/// Implementations must not fail the swap: there is no error channel.
/// Anything that goes wrong is the observer's to log.
pub trait PostTradeObserver {
    /// Called once per swap, after reserves have been updated
    fn on_swap(&self, pool_id: &PoolId, result: &SwapResult);
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PostTradeObserver for NoopObserver {
    fn on_swap(&self, _pool_id: &PoolId, _result: &SwapResult) {}
}
