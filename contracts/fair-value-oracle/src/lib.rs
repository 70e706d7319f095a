//! Fair Value Oracle Contract
//!
//! Trusted push oracle for the synthetic asset's fair value (NAV) and a
//! risk score. A single authorized updater overwrites both fields; reads
//! are unrestricted and O(1).
//!
//! There is deliberately no averaging, staleness check or multi-source
//! aggregation here. Liveness is the job of the external updater process.

use std::cell::RefCell;

use borsh::{BorshDeserialize, BorshSerialize};
use log::info;
use serde::{Deserialize, Serialize};

use pegkeeper_common::{
    config::OracleConfig,
    constants::oracle::MAX_RISK_BPS,
    errors::{PegError, PegResult},
    events::{EventLog, EventType, PegEvent},
    types::{Address, ZERO_ADDRESS},
};

// ============ Oracle State ============

/// Oracle contract state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct OracleState {
    /// Fair value, 1e18 fixed point
    pub fair_value: u128,
    /// Risk score (bps)
    pub risk_bps: u16,
    /// Only identity allowed to write
    pub updater: Address,
}

/// Trusted single-writer fair value feed
pub struct FairValueOracle {
    state: RefCell<OracleState>,
    events: RefCell<EventLog>,
}

impl FairValueOracle {
    /// Create an oracle with an initial reading
    pub fn new(config: &OracleConfig) -> PegResult<Self> {
        config.validate()?;

        Ok(Self {
            state: RefCell::new(OracleState {
                fair_value: config.fair_value,
                risk_bps: config.risk_bps,
                updater: config.updater,
            }),
            events: RefCell::new(EventLog::new()),
        })
    }

    /// Overwrite fair value and risk score. Updater only.
    ///
    /// # Errors
    /// - `Unauthorized` for any caller other than the updater
    /// - `ZeroAmount` for a zero fair value
    /// - `InvalidParameter` for a risk score above 100%
    pub fn update(&self, caller: Address, new_fair_value: u128, new_risk_bps: u16) -> PegResult<()> {
        let mut state = self.state.borrow_mut();

        // 1. Only updater can write
        if caller != state.updater {
            return Err(PegError::Unauthorized {
                expected: state.updater,
                actual: caller,
            });
        }

        // 2. A zero fair value would make every deviation undefined
        if new_fair_value == 0 {
            return Err(PegError::ZeroAmount);
        }

        // 3. Risk is a percentage
        if new_risk_bps > MAX_RISK_BPS {
            return Err(PegError::InvalidParameter {
                param: "risk_bps",
                reason: "above 100%",
            });
        }

        let old_fair_value = state.fair_value;
        state.fair_value = new_fair_value;
        state.risk_bps = new_risk_bps;

        self.events.borrow_mut().emit(PegEvent::FairValueUpdated {
            old_fair_value,
            new_fair_value,
            risk_bps: new_risk_bps,
        });
        info!(
            "fair value updated {} -> {} (risk {} bps)",
            old_fair_value, new_fair_value, new_risk_bps
        );

        Ok(())
    }

    /// Hand the writer role to `new_updater`. The old updater loses access
    /// in the same operation.
    pub fn set_updater(&self, caller: Address, new_updater: Address) -> PegResult<()> {
        let mut state = self.state.borrow_mut();

        if caller != state.updater {
            return Err(PegError::Unauthorized {
                expected: state.updater,
                actual: caller,
            });
        }

        if new_updater == ZERO_ADDRESS {
            return Err(PegError::InvalidParameter {
                param: "updater",
                reason: "zero address",
            });
        }

        let old_updater = state.updater;
        state.updater = new_updater;

        self.events.borrow_mut().emit(PegEvent::UpdaterChanged {
            old_updater,
            new_updater,
        });
        info!("oracle updater changed");

        Ok(())
    }

    /// Current (fair value, risk score)
    pub fn read(&self) -> (u128, u16) {
        let state = self.state.borrow();
        (state.fair_value, state.risk_bps)
    }

    /// Current writer
    pub fn updater(&self) -> Address {
        self.state.borrow().updater
    }

    /// Copy of the full state
    pub fn state(&self) -> OracleState {
        *self.state.borrow()
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
