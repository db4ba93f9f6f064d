use pretty_assertions::assert_eq;
use rosca_forecast_core::config::ForecastConfig;
use rosca_forecast_core::growth::scheduler::GrowthBase;
use rosca_forecast_core::interest::nii::NiiMethod;
use rosca_forecast_core::simulation::driver::{run_forecast, simulate};
use rosca_forecast_core::validation::check_config;
use rosca_forecast_core::RoscaError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

// ===========================================================================
// Fixtures
// ===========================================================================

/// The single-product launch case: 1M market, 10% TAM, 10% start, one
/// 3-month product with a 1,000 installment paid out in slot 1.
fn launch_config() -> ForecastConfig {
    serde_json::from_value(json!({
        "market": {
            "total_market": 1_000_000,
            "tam_pct": 10,
            "start_pct": 10,
            "acquisition_rate_pct": 10
        },
        "calendar": { "collection_day": 1, "payout_day": 20 },
        "risk": {
            "base_rate_pct": 11,
            "spread_pct": 1,
            "default_rate_pct": 0
        },
        "product": {
            "durations": [3],
            "duration_shares": { "1": { "3": 100 } },
            "slabs": { "3": [ { "amount": 1000, "share_pct": 100 } ] },
            "slots": { "3": [ { "slot": 1, "fee_pct": 2, "share_pct": 100 } ] }
        }
    }))
    .unwrap()
}

/// Three durations, several slabs, a blocked slot, defaults and a rest period.
fn portfolio_config() -> ForecastConfig {
    serde_json::from_value(json!({
        "market": {
            "total_market": 5_000_000,
            "tam_pct": 20,
            "start_pct": 5,
            "acquisition_rate_pct": 4,
            "annual_tam_growth_pct": 10,
            "cap_to_tam": true
        },
        "calendar": { "collection_day": 5, "payout_day": 25 },
        "risk": {
            "base_rate_pct": 11,
            "spread_pct": 1.5,
            "default_rate_pct": 3,
            "pre_payout_default_share_pct": 40,
            "pre_payout_recovery_pct": 25,
            "rest_period_months": 2
        },
        "product": {
            "durations": [3, 6, 10],
            "duration_shares": {
                "1": { "3": 50, "6": 30, "10": 20 },
                "3": { "3": 30, "6": 40, "10": 30 }
            },
            "slabs": {
                "3": [
                    { "amount": 1000, "share_pct": 33.3 },
                    { "amount": 2000, "share_pct": 33.3 },
                    { "amount": 5000, "share_pct": 33.4 }
                ],
                "6": [
                    { "amount": 2000, "share_pct": 60 },
                    { "amount": 10000, "share_pct": 40 }
                ],
                "10": [ { "amount": 2500, "share_pct": 100 } ]
            },
            "slots": {
                "3": [
                    { "slot": 1, "fee_pct": 4, "share_pct": 50 },
                    { "slot": 2, "fee_pct": 2, "blocked": true, "share_pct": 0 },
                    { "slot": 3, "fee_pct": 0, "share_pct": 50 }
                ],
                "6": [
                    { "slot": 1, "fee_pct": 5, "share_pct": 20 },
                    { "slot": 2, "fee_pct": 4, "share_pct": 20 },
                    { "slot": 3, "fee_pct": 3, "share_pct": 20 },
                    { "slot": 4, "fee_pct": 2, "share_pct": 20 },
                    { "slot": 5, "fee_pct": 1, "share_pct": 20 },
                    { "slot": 6, "fee_pct": 0, "blocked": true, "share_pct": 0 }
                ],
                "10": [
                    { "slot": 1, "fee_pct": 6, "share_pct": 25 },
                    { "slot": 4, "fee_pct": 3, "share_pct": 25 },
                    { "slot": 7, "fee_pct": 1, "share_pct": 25 },
                    { "slot": 10, "fee_pct": 0, "share_pct": 25 }
                ]
            }
        },
        "profit_share": { "platform_pct": 60, "partner_pct": 40 }
    }))
    .unwrap()
}

// ===========================================================================
// Launch scenario
// ===========================================================================

#[test]
fn test_launch_month_one_cohort() {
    let result = run_forecast(&launch_config()).unwrap();
    let out = &result.result;

    let first: Vec<_> = out.cohorts.iter().filter(|c| c.month_index == 0).collect();
    assert_eq!(first.len(), 1);
    let c = first[0];

    assert_eq!(c.users, 10_000);
    assert_eq!(c.commitment_per_user, dec!(3000));
    assert_eq!(c.fee_per_user, dec!(60));
    assert_eq!(c.total_fee, dec!(600_000));
    assert_eq!(c.total_default_loss, Decimal::ZERO);
    assert_eq!(c.payout_due_month_index, 0);

    // Only the January installment is held before the 20 Jan payout: 19 days.
    let expected_nii = dec!(1000) * dec!(0.12) / dec!(365) * dec!(19) * dec!(10_000);
    assert!((c.total_nii - expected_nii).abs() < dec!(0.0001));
    assert!(c.total_nii > Decimal::ZERO);
    assert_eq!(c.lifetime_profit, c.total_fee + c.total_nii);
}

#[test]
fn test_cumulative_growth_base_month_two() {
    let (out, _) = simulate(&launch_config()).unwrap();
    assert_eq!(out.growth_log[0].new_users, 10_000);
    assert_eq!(out.growth_log[1].new_users, 1_000);
    assert_eq!(out.growth_log[1].rejoining_users, 0);
}

#[test]
fn test_last_month_new_growth_base_decays() {
    let mut config = launch_config();
    config.policy.growth_base = GrowthBase::LastMonthNew;
    let (out, _) = simulate(&config).unwrap();
    assert_eq!(out.growth_log[1].new_users, 1_000);
    assert_eq!(out.growth_log[2].new_users, 100);
    assert_eq!(out.growth_log[3].new_users, 10);
}

#[test]
fn test_flat_month_nii_policy() {
    let mut config = launch_config();
    config.policy.nii_method = NiiMethod::FlatMonth;
    let (out, _) = simulate(&config).unwrap();
    // 3000 × 0.01 × 3 months per user.
    assert_eq!(out.cohorts[0].total_nii, dec!(90) * dec!(10_000));
}

#[test]
fn test_policy_defaults_when_omitted() {
    let config = launch_config();
    assert_eq!(config.policy.growth_base, GrowthBase::CumulativeNew);
    assert_eq!(config.policy.nii_method, NiiMethod::DayPrecise);
    assert_eq!(config.risk.pre_payout_default_share_pct, dec!(50));
    assert_eq!(config.profit_share.platform_pct, dec!(50));
}

// ===========================================================================
// Portfolio properties
// ===========================================================================

#[test]
fn test_every_month_conserves_onboarding() {
    let (out, _) = simulate(&portfolio_config()).unwrap();
    for g in &out.growth_log {
        let placed: u64 = out.cohorts.iter().filter(|c| c.month_index == g.month_index).map(|c| c.users).sum();
        assert_eq!(placed, g.onboarding, "month {}", g.month);
        assert_eq!(g.stranded_users, 0);
    }
}

#[test]
fn test_blocked_slots_never_appear() {
    let (out, _) = simulate(&portfolio_config()).unwrap();
    assert!(!out.cohorts.is_empty());
    assert!(!out.cohorts.iter().any(|c| c.duration == 3 && c.slot == 2));
    assert!(!out.cohorts.iter().any(|c| c.duration == 6 && c.slot == 6));
}

#[test]
fn test_rejoins_land_exactly_at_duration_plus_rest() {
    let config = portfolio_config();
    let rest = config.risk.rest_period_months;
    let (out, _) = simulate(&config).unwrap();

    for c in &out.cohorts {
        let target = c.month_index + c.duration + rest;
        assert_eq!(c.rejoin_users, c.users - c.total_defaulters);
        if target < 60 {
            assert_eq!(c.rejoin_month_index, Some(target));
        } else {
            assert_eq!(c.rejoin_month_index, None);
        }
    }
    for g in &out.growth_log {
        let due: u64 = out
            .cohorts
            .iter()
            .filter(|c| c.rejoin_month_index == Some(g.month_index))
            .map(|c| c.rejoin_users)
            .sum();
        assert_eq!(g.rejoining_users, due, "month {}", g.month);
    }
    // Shortest cycle is 3 months plus 2 months rest.
    assert!(out.growth_log[..5].iter().all(|g| g.rejoining_users == 0));
    assert!(out.growth_log[5].rejoining_users > 0);
}

#[test]
fn test_default_loss_bounded_by_commitment() {
    let (out, _) = simulate(&portfolio_config()).unwrap();
    for c in &out.cohorts {
        assert!(c.total_default_loss >= Decimal::ZERO);
        assert!(c.total_default_loss <= c.total_commitment());
        assert_eq!(c.pre_payout_defaulters + c.post_payout_defaulters, c.total_defaulters);
        assert!(c.external_capital_required >= Decimal::ZERO);
    }
}

#[test]
fn test_tam_cap_holds_each_year() {
    let config = portfolio_config();
    let (out, _) = simulate(&config).unwrap();
    let tam = config.market.tam();
    for year in 1..=5u32 {
        let new_users: u64 = out.growth_log.iter().filter(|g| g.year == year).map(|g| g.new_users).sum();
        let ceiling = out.growth_log.iter().find(|g| g.year == year).and_then(|g| g.tam_ceiling).unwrap();
        assert!(new_users <= ceiling);
        assert!(ceiling >= tam);
    }
}

#[test]
fn test_tables_align_with_cohorts() {
    let (out, _) = simulate(&portfolio_config()).unwrap();
    assert_eq!(out.deposit_log.len(), out.cohorts.len());
    assert_eq!(out.default_log.len(), out.cohorts.len());
    assert_eq!(out.lifecycle_log.len(), out.cohorts.len());
    for (c, d) in out.cohorts.iter().zip(&out.deposit_log) {
        assert_eq!(c.label, d.cohort);
        assert_eq!(d.installment_cash, c.installment * Decimal::from(c.users));
    }
    assert_eq!(out.totals.cohorts, out.cohorts.len());
}

#[test]
fn test_runs_are_deterministic() {
    let config = portfolio_config();
    let (a, wa) = simulate(&config).unwrap();
    let (b, wb) = simulate(&config).unwrap();
    assert_eq!(a, b);
    assert_eq!(wa, wb);
}

// ===========================================================================
// Validation
// ===========================================================================

#[test]
fn test_misconfigured_shares_warn_but_run() {
    let mut config = launch_config();
    config.product.slots.get_mut(&3).unwrap()[0].share_pct = dec!(80);
    let result = run_forecast(&config).unwrap();
    assert!(result.warnings.iter().any(|w| w.contains("slot shares sum to 80%")));
    assert_eq!(result.result.growth_log[0].allocated_users, 10_000);
}

#[test]
fn test_malformed_config_rejected_before_running() {
    let mut config = launch_config();
    config.product.slots.get_mut(&3).unwrap()[0].slot = 7;
    match run_forecast(&config) {
        Err(RoscaError::InvalidInput { field, .. }) => assert_eq!(field, "product.slots.3"),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}

#[test]
fn test_runaway_acquisition_is_rejected_not_panicking() {
    let mut config = launch_config();
    config.market.acquisition_rate_pct = dec!(100);
    let outcome = std::panic::catch_unwind(|| simulate(&config));
    match outcome {
        Ok(Err(RoscaError::InvalidConfiguration(reason))) => assert!(reason.contains("exceeds")),
        Ok(other) => panic!("expected InvalidConfiguration, got {other:?}"),
        Err(_) => panic!("simulation panicked on a compounding user base"),
    }
}

#[test]
fn test_first_year_takes_earliest_configured_mix() {
    let mut config = portfolio_config();
    let year_one = config.product.duration_shares.remove(&1).unwrap();
    config.product.duration_shares.insert(2, year_one);
    let (out, warnings) = simulate(&config).unwrap();
    assert!(warnings.iter().any(|w| w.contains("years before year 2")));
    let durations: Vec<u32> = out.cohorts_in_month(0).map(|c| c.duration).collect();
    assert!(durations.contains(&3) && durations.contains(&6) && durations.contains(&10));
    let three: u64 = out.cohorts_in_month(0).filter(|c| c.duration == 3).map(|c| c.users).sum();
    // Year 2's 50% share applies in month 1: half of 50,000.
    assert_eq!(three, 25_000);
}

#[test]
fn test_check_config_on_portfolio() {
    let report = check_config(&portfolio_config()).unwrap().result;
    assert!(report.valid);
    assert_eq!(report.tam, 1_000_000);
    assert_eq!(report.initial_new_users, 50_000);
    // 3×2 + 2×5 + 1×4
    assert_eq!(report.cohort_combinations, 20);
    assert!(report.warnings.is_empty());
}
