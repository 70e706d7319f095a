//! Protocol Events
//!
//! Events are emitted during execution and can be indexed off-chain for
//! analytics and alerting. Each component collects its own events in an
//! [`EventLog`].

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::types::{Address, Asset, InterventionDirection, PoolId, SwapDirection};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Pool Events (0x01 - 0x1F)
    PoolInitialized = 0x01,
    LiquidityAdded = 0x02,
    Swap = 0x03,
    ObserverRegistered = 0x04,

    // Oracle Events (0x20 - 0x3F)
    FairValueUpdated = 0x20,
    UpdaterChanged = 0x21,

    // Engine Events (0x40 - 0x5F)
    InterventionFunded = 0x40,
    InterventionExecuted = 0x41,
    FeesWithdrawn = 0x42,
    OperatorChanged = 0x43,
    InterventionsPauseChanged = 0x44,

    // Monitor Diagnostics (0x60 - 0x7F)
    InterventionFailed = 0x60,
    StabilizationCheckFailed = 0x61,
}

/// Main event enum containing all protocol events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum PegEvent {
    // ============ Pool Events ============

    /// Emitted once when the pool receives its initial reserves
    PoolInitialized {
        pool_id: PoolId,
        reserve_a: u128,
        reserve_b: u128,
    },

    /// Emitted when liquidity is added
    LiquidityAdded {
        pool_id: PoolId,
        provider: Address,
        amount_a: u128,
        amount_b: u128,
    },

    /// Emitted on every swap, including intervention counter-swaps
    Swap {
        pool_id: PoolId,
        trader: Address,
        direction: SwapDirection,
        amount_in: u128,
        amount_out: u128,
        fee: u128,
    },

    /// Emitted when a post-trade observer is registered
    ObserverRegistered { pool_id: PoolId },

    // ============ Oracle Events ============

    /// Emitted when the fair value and risk score are overwritten
    FairValueUpdated {
        old_fair_value: u128,
        new_fair_value: u128,
        risk_bps: u16,
    },

    /// Emitted when the writer role moves
    UpdaterChanged {
        old_updater: Address,
        new_updater: Address,
    },

    // ============ Engine Events ============

    /// Emitted on a permissionless top-up of the intervention reserve
    InterventionFunded {
        from: Address,
        asset: Asset,
        amount: u128,
    },

    /// Emitted for every successful intervention
    InterventionExecuted {
        direction: InterventionDirection,
        amount_in: u128,
        amount_out: u128,
        fee_charged: u128,
        fee_booked: u128,
        deviation_bps: u64,
    },

    /// Emitted when the operator withdraws accumulated fees
    FeesWithdrawn {
        operator: Address,
        asset: Asset,
        amount: u128,
    },

    /// Emitted when the operator role moves
    OperatorChanged {
        old_operator: Address,
        new_operator: Address,
    },

    /// Emitted when interventions are paused or resumed
    InterventionsPauseChanged { paused: bool },

    // ============ Monitor Diagnostics ============

    /// An automatic intervention failed and was swallowed
    InterventionFailed {
        pool_id: PoolId,
        direction: InterventionDirection,
        deviation_bps: u64,
        error_code: String,
    },

    /// The post-swap deviation could not be evaluated
    StabilizationCheckFailed { pool_id: PoolId, error_code: String },
}

impl PegEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::PoolInitialized { .. } => EventType::PoolInitialized,
            Self::LiquidityAdded { .. } => EventType::LiquidityAdded,
            Self::Swap { .. } => EventType::Swap,
            Self::ObserverRegistered { .. } => EventType::ObserverRegistered,
            Self::FairValueUpdated { .. } => EventType::FairValueUpdated,
            Self::UpdaterChanged { .. } => EventType::UpdaterChanged,
            Self::InterventionFunded { .. } => EventType::InterventionFunded,
            Self::InterventionExecuted { .. } => EventType::InterventionExecuted,
            Self::FeesWithdrawn { .. } => EventType::FeesWithdrawn,
            Self::OperatorChanged { .. } => EventType::OperatorChanged,
            Self::InterventionsPauseChanged { .. } => EventType::InterventionsPauseChanged,
            Self::InterventionFailed { .. } => EventType::InterventionFailed,
            Self::StabilizationCheckFailed { .. } => EventType::StabilizationCheckFailed,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<PegEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: PegEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[PegEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<PegEvent> {
        self.events
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&PegEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Count events of one type
    pub fn count(&self, event_type: EventType) -> usize {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop events emitted after the log had `len` entries (rollback)
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
