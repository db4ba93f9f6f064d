use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

use log::info;

use crate::config::{ForecastConfig, MarketConfig};
use crate::growth::scheduler::GrowthBase;
use crate::simulation::driver::simulate;
use crate::summary::aggregate::{summarize_forecast, YearlySummaryRow};
use crate::{types::*, RoscaError, RoscaResult};

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// One named market outlook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub name: String,
    pub market: MarketConfig,
    /// Overrides the shared acquisition policy for this scenario only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_base: Option<GrowthBase>,
}

/// Shared product, risk and calendar settings plus the scenarios to compare.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSetInput {
    pub base: ForecastConfig,
    pub scenarios: Vec<ScenarioDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub name: String,
    pub tam: UserCount,
    pub initial_new_users: UserCount,
    pub total_new_users: UserCount,
    pub total_rejoining_users: UserCount,
    pub total_onboarded: UserCount,
    pub cohorts: usize,
    pub total_fee: Money,
    pub total_nii: Money,
    pub total_default_loss: Money,
    pub total_profit: Money,
    /// Largest external capital need in any single month.
    pub peak_external_capital: Money,
    /// Profit relative to the first scenario.
    pub profit_vs_first: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDetail {
    pub name: String,
    pub yearly: Vec<YearlySummaryRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSetOutput {
    pub comparisons: Vec<ScenarioComparison>,
    pub details: Vec<ScenarioDetail>,
    pub most_profitable: Option<String>,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Forecast each scenario in isolation and compare the results.
///
/// Every scenario gets its own copy of the base configuration with its
/// market section swapped in, so the result for a scenario is the same as
/// running it on its own.
pub fn run_scenarios(input: &ScenarioSetInput) -> RoscaResult<ComputationOutput<ScenarioSetOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.scenarios.is_empty() {
        return Err(RoscaError::InsufficientData(
            "At least one scenario required".into(),
        ));
    }
    let mut names = BTreeSet::new();
    for s in &input.scenarios {
        if !names.insert(s.name.as_str()) {
            return Err(RoscaError::InvalidInput {
                field: format!("scenario:{}", s.name),
                reason: "Scenario names must be unique".into(),
            });
        }
    }

    let mut comparisons = Vec::with_capacity(input.scenarios.len());
    let mut details = Vec::with_capacity(input.scenarios.len());

    for scenario in &input.scenarios {
        let config = scenario_config(&input.base, scenario);
        info!("scenario '{}': running", scenario.name);

        let (output, run_warnings) = simulate(&config)?;
        warnings.extend(run_warnings.into_iter().map(|w| format!("[{}] {w}", scenario.name)));

        let summary = summarize_forecast(&output, &config)?;
        let peak_external_capital = summary
            .monthly
            .iter()
            .map(|m| m.measures.external_capital_required)
            .max()
            .unwrap_or(Decimal::ZERO);

        let totals = &output.totals;
        comparisons.push(ScenarioComparison {
            name: scenario.name.clone(),
            tam: config.market.tam(),
            initial_new_users: config.market.initial_new_users(),
            total_new_users: totals.new_users,
            total_rejoining_users: totals.rejoining_users,
            total_onboarded: totals.onboarded_users,
            cohorts: totals.cohorts,
            total_fee: totals.total_fee,
            total_nii: totals.total_nii,
            total_default_loss: totals.total_default_loss,
            total_profit: totals.lifetime_profit,
            peak_external_capital,
            profit_vs_first: Decimal::ZERO,
        });
        details.push(ScenarioDetail {
            name: scenario.name.clone(),
            yearly: summary.yearly,
        });
    }

    if let Some(first_profit) = comparisons.first().map(|c| c.total_profit) {
        for c in comparisons.iter_mut() {
            c.profit_vs_first = c.total_profit - first_profit;
        }
    }
    let most_profitable = comparisons
        .iter()
        .max_by(|a, b| a.total_profit.cmp(&b.total_profit))
        .map(|c| c.name.clone());

    let output = ScenarioSetOutput {
        comparisons,
        details,
        most_profitable,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Independent ROSCA forecasts per market scenario",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn scenario_config(base: &ForecastConfig, scenario: &ScenarioDefinition) -> ForecastConfig {
    let mut config = base.clone();
    config.market = scenario.market.clone();
    if let Some(growth_base) = scenario.growth_base {
        config.policy.growth_base = growth_base;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sample_config;
    use crate::simulation::driver::run_forecast;
    use rust_decimal_macros::dec;

    fn scenario(name: &str, acquisition: Decimal) -> ScenarioDefinition {
        let mut market = sample_config().market;
        market.acquisition_rate_pct = acquisition;
        ScenarioDefinition {
            name: name.into(),
            market,
            growth_base: None,
        }
    }

    #[test]
    fn test_scenarios_match_standalone_runs() {
        let input = ScenarioSetInput {
            base: sample_config(),
            scenarios: vec![scenario("slow", dec!(2)), scenario("fast", dec!(8))],
        };
        let out = run_scenarios(&input).unwrap().result;
        assert_eq!(out.comparisons.len(), 2);

        let mut fast = sample_config();
        fast.market.acquisition_rate_pct = dec!(8);
        let alone = run_forecast(&fast).unwrap().result;
        assert_eq!(out.comparisons[1].total_profit, alone.totals.lifetime_profit);
        assert_eq!(out.comparisons[1].total_onboarded, alone.totals.onboarded_users);
        assert_eq!(out.most_profitable.as_deref(), Some("fast"));
        assert_eq!(out.comparisons[0].profit_vs_first, Decimal::ZERO);
    }

    #[test]
    fn test_order_does_not_leak_between_scenarios() {
        let a = ScenarioSetInput {
            base: sample_config(),
            scenarios: vec![scenario("x", dec!(3)), scenario("y", dec!(6))],
        };
        let b = ScenarioSetInput {
            base: sample_config(),
            scenarios: vec![scenario("y", dec!(6)), scenario("x", dec!(3))],
        };
        let ra = run_scenarios(&a).unwrap().result;
        let rb = run_scenarios(&b).unwrap().result;
        assert_eq!(ra.comparisons[0].total_profit, rb.comparisons[1].total_profit);
        assert_eq!(ra.comparisons[1].total_onboarded, rb.comparisons[0].total_onboarded);
    }

    #[test]
    fn test_rejects_empty_and_duplicate_names() {
        let empty = ScenarioSetInput {
            base: sample_config(),
            scenarios: vec![],
        };
        assert!(run_scenarios(&empty).is_err());

        let dup = ScenarioSetInput {
            base: sample_config(),
            scenarios: vec![scenario("a", dec!(1)), scenario("a", dec!(2))],
        };
        assert!(run_scenarios(&dup).is_err());
    }
}
