//! End-to-end tests of the pool -> monitor -> engine -> pool loop

use proptest::prelude::*;

use pegkeeper_common::{
    config::{AssetConfig, EngineConfig, MonitorConfig, OracleConfig, PoolConfig, StackConfig},
    constants::precision::PRICE_SCALE,
    errors::PegError,
    events::{EventType, PegEvent},
    math::{deviation_bps, spot_price},
    observer::PostTradeObserver,
    types::{Address, InterventionDirection, SwapDirection},
};

use crate::{MonitorPhase, StabilizationStack};

const ADMIN: Address = [1u8; 32];
const UPDATER: Address = [2u8; 32];
const MONITOR: Address = [3u8; 32];
const OPERATOR: Address = [4u8; 32];
const ENGINE: Address = [5u8; 32];
const TRADER: Address = [6u8; 32];
const FUNDER: Address = [7u8; 32];
const STRANGER: Address = [99u8; 32];

const ONE_USDC: u128 = 1_000_000;
const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn create_test_config(decimals_a: u8, decimals_b: u8) -> StackConfig {
    StackConfig {
        pool: PoolConfig {
            asset_a: AssetConfig::new([10u8; 32], "sNAV", decimals_a),
            asset_b: AssetConfig::new([11u8; 32], "USDX", decimals_b),
            fee_bps: 30,
            admin: ADMIN,
        },
        oracle: OracleConfig {
            updater: UPDATER,
            fair_value: PRICE_SCALE,
            risk_bps: 0,
        },
        monitor: MonitorConfig::new(MONITOR),
        engine: EngineConfig::new(OPERATOR, MONITOR, ENGINE),
    }
}

/// 100k/100k pool at 1:1, fair value 1.00, engine funded as given
fn create_test_stack(fund_a: u128, fund_b: u128) -> StabilizationStack {
    init_logging();
    let stack = StabilizationStack::build(&create_test_config(18, 18)).unwrap();
    stack.pool.initialize(100_000, 100_000).unwrap();
    if fund_a > 0 {
        stack.engine.fund_a(FUNDER, fund_a).unwrap();
    }
    if fund_b > 0 {
        stack.engine.fund_b(FUNDER, fund_b).unwrap();
    }
    stack
}

fn failed_intervention_codes(stack: &StabilizationStack) -> Vec<String> {
    stack
        .monitor
        .events()
        .into_iter()
        .filter_map(|event| match event {
            PegEvent::InterventionFailed { error_code, .. } => Some(error_code),
            _ => None,
        })
        .collect()
}

// ============ Scenarios ============

#[test]
fn test_large_sell_triggers_buy_support() {
    let stack = create_test_stack(0, 50_000);

    let result = stack.pool.swap(TRADER, SwapDirection::AToB, 30_000).unwrap();
    assert_eq!(result.amount_out, 23_023);

    // Pool moved to 130_000 / 76_977, price ~0.592, deviation 4078 bps.
    // Engine commits 2_039 B (fee 10), receives 3_327 A.
    let (balance_a, balance_b) = stack.engine.get_balances();
    assert!(balance_b < 50_000);
    assert_eq!((balance_a, balance_b), (3_327, 47_961));
    assert_eq!(stack.engine.get_accumulated_fees(), 16);
    assert_eq!(stack.pool.get_reserves(), (126_673, 79_006));

    let executed: Vec<PegEvent> = stack
        .engine
        .events()
        .into_iter()
        .filter(|e| e.event_type() == EventType::InterventionExecuted)
        .collect();
    assert_eq!(executed.len(), 1);
    assert!(matches!(
        executed[0],
        PegEvent::InterventionExecuted {
            direction: InterventionDirection::BuySupport,
            deviation_bps: 4_078,
            ..
        }
    ));

    // Original swap plus the counter-swap
    assert_eq!(stack.pool.event_count(EventType::Swap), 2);
    assert_eq!(stack.monitor.phase(), MonitorPhase::Idle);
}

#[test]
fn test_large_buy_triggers_sell_cap() {
    let stack = create_test_stack(50_000, 0);

    stack.pool.swap(TRADER, SwapDirection::BToA, 30_000).unwrap();

    // Price ~1.689, deviation 6888 bps: engine sells 3_444 A (fee 17)
    let (balance_a, balance_b) = stack.engine.get_balances();
    assert_eq!(balance_a, 46_556);
    assert!(balance_b > 0);
    // Fee collected in A, which is also the fee asset
    assert_eq!(stack.engine.get_accumulated_fees(), 17);
}

#[test]
fn test_unfunded_engine_failure_is_swallowed() {
    let stack = create_test_stack(0, 0);

    let result = stack.pool.swap(TRADER, SwapDirection::AToB, 30_000);

    // The swap stands even though the intervention failed
    assert!(result.is_ok());
    assert_eq!(stack.pool.get_reserves(), (130_000, 76_977));
    assert_eq!(stack.pool.event_count(EventType::Swap), 1);
    assert_eq!(stack.engine.event_count(EventType::InterventionExecuted), 0);

    let expected = PegError::InsufficientBalance {
        available: 0,
        requested: 0,
    }
    .code();
    assert_eq!(failed_intervention_codes(&stack), vec![expected.to_string()]);

    let stats = stack.monitor.stats();
    assert_eq!(stats.interventions_attempted, 1);
    assert_eq!(stats.interventions_failed, 1);
    assert_eq!(stack.monitor.phase(), MonitorPhase::Idle);
}

#[test]
fn test_rolled_back_counter_swap_is_not_counted() {
    // Crediting the received A overflows after the counter-swap succeeds
    let stack = create_test_stack(u128::MAX - 1, 50_000);

    stack.pool.swap(TRADER, SwapDirection::AToB, 30_000).unwrap();

    assert_eq!(stack.pool.get_reserves(), (130_000, 76_977));
    assert_eq!(stack.pool.event_count(EventType::Swap), 1);
    assert_eq!(stack.engine.get_balances(), (u128::MAX - 1, 50_000));

    let stats = stack.monitor.stats();
    assert_eq!(stats.swaps_observed, 1);
    assert_eq!(stats.reentrant_skips, 0);
    assert_eq!(stats.interventions_attempted, 1);
    assert_eq!(stats.interventions_failed, 1);
    assert_eq!(
        failed_intervention_codes(&stack),
        vec![PegError::OVERFLOW.code().to_string()]
    );
}

#[test]
fn test_restricted_entry_points() {
    let stack = create_test_stack(0, 50_000);

    assert!(matches!(
        stack
            .engine
            .intervene(STRANGER, InterventionDirection::BuySupport, 4_000),
        Err(PegError::Unauthorized { .. })
    ));
    assert!(matches!(
        stack.engine.withdraw_fees(STRANGER),
        Err(PegError::Unauthorized { .. })
    ));
    assert!(matches!(
        stack.oracle.update(STRANGER, PRICE_SCALE * 2, 0),
        Err(PegError::Unauthorized { .. })
    ));
    assert!(matches!(
        stack.pool.set_observer(STRANGER, std::rc::Weak::<crate::StabilizationMonitor>::new()),
        Err(PegError::Unauthorized { .. })
    ));
    assert_eq!(stack.engine.get_balances(), (0, 50_000));
}

// ============ Properties ============

#[test]
fn test_small_swap_does_not_intervene() {
    let stack = create_test_stack(50_000, 50_000);

    stack.pool.swap(TRADER, SwapDirection::AToB, 1_000).unwrap();

    let check = stack.monitor.check_stabilization(&stack.pool.id()).unwrap();
    assert!(!check.should_trigger);
    assert!(check.deviation_bps <= 500);
    assert_eq!(stack.engine.get_balances(), (50_000, 50_000));
    assert_eq!(stack.monitor.stats().interventions_attempted, 0);
}

#[test]
fn test_single_intervention_despite_residual_deviation() {
    let stack = create_test_stack(0, 50_000);

    stack.pool.swap(TRADER, SwapDirection::AToB, 30_000).unwrap();

    // Still far off-peg after the correction, but no second round
    let check = stack.monitor.check_stabilization(&stack.pool.id()).unwrap();
    assert!(check.should_trigger);

    let stats = stack.monitor.stats();
    assert_eq!(stats.swaps_observed, 2);
    assert_eq!(stats.reentrant_skips, 1);
    assert_eq!(stats.interventions_attempted, 1);
    assert_eq!(stack.engine.event_count(EventType::InterventionExecuted), 1);
}

#[test]
fn test_guard_released_between_swaps() {
    let stack = create_test_stack(0, 50_000);

    stack.pool.swap(TRADER, SwapDirection::AToB, 30_000).unwrap();
    assert_eq!(stack.monitor.phase(), MonitorPhase::Idle);
    stack.pool.swap(TRADER, SwapDirection::AToB, 1_000).unwrap();

    // Each top-level swap gets its own intervention
    assert_eq!(stack.monitor.stats().interventions_attempted, 2);
    assert_eq!(stack.engine.event_count(EventType::InterventionExecuted), 2);
}

#[test]
fn test_guard_released_after_failure() {
    let stack = create_test_stack(0, 0);

    stack.pool.swap(TRADER, SwapDirection::AToB, 30_000).unwrap();
    assert_eq!(stack.monitor.phase(), MonitorPhase::Idle);

    stack.engine.fund_b(FUNDER, 50_000).unwrap();
    stack.pool.swap(TRADER, SwapDirection::AToB, 100).unwrap();

    assert_eq!(stack.engine.event_count(EventType::InterventionExecuted), 1);
    assert_eq!(stack.monitor.stats().interventions_failed, 1);
}

#[test]
fn test_withdraw_fees_after_intervention() {
    let stack = create_test_stack(0, 50_000);
    stack.pool.swap(TRADER, SwapDirection::AToB, 30_000).unwrap();

    let fees = stack.engine.get_accumulated_fees();
    assert!(fees > 0);
    assert_eq!(stack.engine.withdraw_fees(OPERATOR).unwrap(), fees);
    assert_eq!(stack.engine.withdraw_fees(OPERATOR).unwrap(), 0);
}

#[test]
fn test_paused_engine_is_swallowed() {
    let stack = create_test_stack(0, 50_000);
    stack.engine.set_paused(OPERATOR, true).unwrap();

    stack.pool.swap(TRADER, SwapDirection::AToB, 30_000).unwrap();

    assert_eq!(
        failed_intervention_codes(&stack),
        vec![PegError::InterventionsPaused.code().to_string()]
    );
    assert_eq!(stack.engine.get_balances(), (0, 50_000));
}

#[test]
fn test_oracle_update_moves_the_band() {
    let stack = create_test_stack(0, 50_000);

    // Pool at 1.00, NAV revalued to 1.10: a tiny trade now triggers support
    stack.oracle.update(UPDATER, PRICE_SCALE * 110 / 100, 500).unwrap();
    stack.pool.swap(TRADER, SwapDirection::BToA, 100).unwrap();

    assert_eq!(stack.engine.event_count(EventType::InterventionExecuted), 1);
    let (balance_a, _) = stack.engine.get_balances();
    assert!(balance_a > 0);
}

// ============ Diagnostics ============

#[test]
fn test_check_stabilization_is_read_only() {
    let stack = create_test_stack(0, 0);
    stack.pool.swap(TRADER, SwapDirection::AToB, 30_000).unwrap();
    let reserves = stack.pool.get_reserves();
    let events = stack.monitor.events().len();

    let check = stack.monitor.check_stabilization(&stack.pool.id()).unwrap();

    assert!(check.should_trigger);
    assert_eq!(check.direction, InterventionDirection::BuySupport);
    assert_eq!(check.deviation_bps, 4_078);
    assert_eq!(check.fair_value, PRICE_SCALE);
    assert_eq!(stack.pool.get_reserves(), reserves);
    assert_eq!(stack.monitor.events().len(), events);
}

#[test]
fn test_foreign_pool_is_ignored() {
    let stack = create_test_stack(0, 50_000);
    let foreign = [0xABu8; 32];

    assert_eq!(
        stack.monitor.check_stabilization(&foreign),
        Err(PegError::UnknownPool { pool_id: foreign })
    );

    let result = stack.pool.quote_swap(SwapDirection::AToB, 30_000).unwrap();
    stack.monitor.on_swap(&foreign, &result);
    assert_eq!(stack.monitor.stats().swaps_observed, 0);
    assert_eq!(stack.engine.get_balances(), (0, 50_000));
}

#[test]
fn test_evaluation_failure_is_reported() {
    init_logging();
    // Pool never initialized: the price read fails
    let stack = StabilizationStack::build(&create_test_config(18, 18)).unwrap();
    let result = pegkeeper_common::types::SwapResult {
        direction: SwapDirection::AToB,
        amount_in: 1,
        amount_out: 1,
        fee_amount: 0,
    };

    stack.monitor.on_swap(&stack.pool.id(), &result);

    assert_eq!(stack.monitor.event_count(EventType::StabilizationCheckFailed), 1);
    assert_eq!(stack.monitor.stats().interventions_attempted, 0);
}

#[test]
fn test_mixed_decimals_pool() {
    init_logging();
    // A has 18 decimals, B has 6
    let stack = StabilizationStack::build(&create_test_config(18, 6)).unwrap();
    stack
        .pool
        .initialize(100_000 * ONE_TOKEN, 100_000 * ONE_USDC)
        .unwrap();
    assert_eq!(stack.pool.get_price().unwrap(), PRICE_SCALE);

    stack.engine.fund_b(FUNDER, 50_000 * ONE_USDC).unwrap();
    stack
        .pool
        .swap(TRADER, SwapDirection::AToB, 30_000 * ONE_TOKEN)
        .unwrap();

    assert_eq!(stack.engine.event_count(EventType::InterventionExecuted), 1);
    let (balance_a, balance_b) = stack.engine.get_balances();
    assert!(balance_a > 3_000 * ONE_TOKEN);
    assert!(balance_b < 50_000 * ONE_USDC);

    // ~10 USDC of fee booked as ~16 A at the post-swap ratio
    let fees = stack.engine.get_accumulated_fees();
    assert!(fees > 10 * ONE_TOKEN && fees < 20 * ONE_TOKEN);
}

#[test]
fn test_stack_rejects_mismatched_monitor() {
    let mut config = create_test_config(18, 18);
    config.engine.monitor = STRANGER;
    assert!(StabilizationStack::build(&config).is_err());
}

proptest! {
    #[test]
    fn prop_intervenes_only_above_threshold(
        amount in 10u128..=60_000u128,
        a_to_b in any::<bool>(),
    ) {
        let stack = create_test_stack(50_000, 50_000);
        let direction = if a_to_b { SwapDirection::AToB } else { SwapDirection::BToA };

        // Post-swap deviation, computed without touching the pool
        let quote = stack.pool.quote_swap(direction, amount).unwrap();
        let (reserve_a, reserve_b) = stack.pool.get_reserves();
        let (after_a, after_b) = match direction {
            SwapDirection::AToB => (reserve_a + amount, reserve_b - quote.amount_out),
            SwapDirection::BToA => (reserve_a - quote.amount_out, reserve_b + amount),
        };
        let price = spot_price(after_a, 18, after_b, 18).unwrap();
        let deviation = deviation_bps(price, PRICE_SCALE).unwrap();

        stack.pool.swap(TRADER, direction, amount).unwrap();

        let stats = stack.monitor.stats();
        if deviation <= 500 {
            prop_assert_eq!(stats.interventions_attempted, 0);
            prop_assert_eq!(stack.engine.get_balances(), (50_000, 50_000));
        } else {
            prop_assert_eq!(stats.interventions_attempted, 1);
        }
        prop_assert_eq!(stack.monitor.phase(), MonitorPhase::Idle);
    }
}
