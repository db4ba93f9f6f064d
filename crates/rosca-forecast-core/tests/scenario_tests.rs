use pretty_assertions::assert_eq;
use rosca_forecast_core::scenarios::runner::{run_scenarios, ScenarioSetInput};
use rosca_forecast_core::simulation::driver::simulate;
use rosca_forecast_core::summary::aggregate::{forecast_summary, summarize_forecast};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn base_config() -> Value {
    json!({
        "calendar": { "collection_day": 1, "payout_day": 15 },
        "risk": {
            "base_rate_pct": 11,
            "spread_pct": 1,
            "default_rate_pct": 2,
            "pre_payout_default_share_pct": 50,
            "pre_payout_recovery_pct": 50,
            "rest_period_months": 1
        },
        "product": {
            "durations": [3, 6],
            "duration_shares": { "1": { "3": 60, "6": 40 } },
            "slabs": {
                "3": [ { "amount": 1000, "share_pct": 100 } ],
                "6": [ { "amount": 2000, "share_pct": 100 } ]
            },
            "slots": {
                "3": [
                    { "slot": 1, "fee_pct": 3, "share_pct": 50 },
                    { "slot": 3, "fee_pct": 0, "share_pct": 50 }
                ],
                "6": [
                    { "slot": 1, "fee_pct": 5, "share_pct": 50 },
                    { "slot": 6, "fee_pct": 0, "share_pct": 50 }
                ]
            }
        },
        "profit_share": { "platform_pct": 70, "partner_pct": 30 }
    })
}

fn market(total: u64, acquisition: u32) -> Value {
    json!({
        "total_market": total,
        "tam_pct": 10,
        "start_pct": 10,
        "acquisition_rate_pct": acquisition
    })
}

fn scenario_set() -> ScenarioSetInput {
    let mut base = base_config();
    base["market"] = market(1_000_000, 5);
    serde_json::from_value(json!({
        "base": base,
        "scenarios": [
            { "name": "conservative", "market": market(500_000, 2) },
            { "name": "base", "market": market(1_000_000, 5) },
            { "name": "aggressive", "market": market(2_000_000, 8), "growth_base": "last_month_total" }
        ]
    }))
    .unwrap()
}

// ===========================================================================
// Summaries
// ===========================================================================

#[test]
fn test_yearly_totals_match_cohort_totals() {
    let set = scenario_set();
    let (out, _) = simulate(&set.base).unwrap();
    let summary = summarize_forecast(&out, &set.base).unwrap();

    assert_eq!(summary.monthly.len(), 60);
    assert_eq!(summary.yearly.len(), 5);
    assert_eq!(summary.totals.measures.profit, out.totals.lifetime_profit);
    assert_eq!(summary.totals.measures.fee_income, out.totals.total_fee);
    assert_eq!(summary.totals.measures.users, out.totals.onboarded_users);
    assert_eq!(summary.totals.measures.new_users, out.totals.new_users);
}

#[test]
fn test_payouts_fall_in_due_month() {
    let set = scenario_set();
    let (out, _) = simulate(&set.base).unwrap();
    let summary = summarize_forecast(&out, &set.base).unwrap();

    let scheduled: Decimal = out.cohorts.iter().map(|c| c.payout_scheduled).sum();
    let in_horizon: Decimal = summary.monthly.iter().map(|m| m.measures.payouts_due).sum();
    assert_eq!(in_horizon + summary.totals.payouts_beyond_horizon, scheduled);

    // Slot 6 of the 6-month product pays five months after joining.
    let late = out
        .cohorts
        .iter()
        .find(|c| c.month_index == 0 && c.duration == 6 && c.slot == 6)
        .unwrap();
    assert_eq!(late.payout_due_month_index, 5);
}

#[test]
fn test_profit_share_splits_each_year() {
    let set = scenario_set();
    let summary = forecast_summary(&set.base).unwrap().result;
    for row in &summary.profit_share {
        assert_eq!(row.platform_share + row.partner_share, row.profit);
        assert_eq!(row.platform_share, row.profit * dec!(70) / dec!(100));
    }
    assert_eq!(
        summary.totals.platform_profit + summary.totals.partner_profit,
        summary.totals.measures.profit
    );
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[test]
fn test_each_scenario_matches_its_standalone_run() {
    let set = scenario_set();
    let result = run_scenarios(&set).unwrap().result;
    assert_eq!(result.comparisons.len(), 3);

    for (scenario, comparison) in set.scenarios.iter().zip(&result.comparisons) {
        let mut config = set.base.clone();
        config.market = scenario.market.clone();
        if let Some(growth_base) = scenario.growth_base {
            config.policy.growth_base = growth_base;
        }
        let (alone, _) = simulate(&config).unwrap();
        assert_eq!(comparison.name, scenario.name);
        assert_eq!(comparison.total_profit, alone.totals.lifetime_profit);
        assert_eq!(comparison.total_onboarded, alone.totals.onboarded_users);
        assert_eq!(comparison.cohorts, alone.cohorts.len());
    }
}

#[test]
fn test_base_config_untouched_by_scenarios() {
    let set = scenario_set();
    let before = set.base.clone();
    run_scenarios(&set).unwrap();
    assert_eq!(set.base, before);
}

#[test]
fn test_comparison_fields() {
    let result = run_scenarios(&scenario_set()).unwrap().result;
    let conservative = &result.comparisons[0];
    assert_eq!(conservative.tam, 50_000);
    assert_eq!(conservative.initial_new_users, 5_000);
    assert_eq!(conservative.profit_vs_first, Decimal::ZERO);
    assert_eq!(result.details.len(), 3);
    assert_eq!(result.details[2].yearly.len(), 5);
    assert!(result.most_profitable.is_some());
}
