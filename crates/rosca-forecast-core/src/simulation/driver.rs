use std::time::Instant;

use log::{debug, info, warn};
use rust_decimal::Decimal;

use super::tables::*;
use crate::allocation::apportion::apportion_counts;
use crate::cohort::generator::CohortGenerator;
use crate::cohort::record::Cohort;
use crate::config::{ForecastConfig, FORECAST_HORIZON_MONTHS};
use crate::growth::scheduler::{GrowthScheduler, MonthIntake};
use crate::validation::validate_config;
use crate::{types::*, RoscaResult};

/// Validate `config` and simulate the full horizon.
///
/// Returns the tables plus any validation and run warnings. All mutable state
/// lives in this call; nothing survives it.
pub fn simulate(config: &ForecastConfig) -> RoscaResult<(ForecastOutput, Vec<String>)> {
    let mut warnings = validate_config(config)?;

    let generator = CohortGenerator::new(config)?;
    let mut scheduler = GrowthScheduler::new(&config.market, config.policy.growth_base);
    let mut output = ForecastOutput::default();

    info!(
        "forecast start: tam={} initial_new={} durations={:?}",
        config.market.tam(),
        config.market.initial_new_users(),
        config.product.durations
    );

    for month in 0..FORECAST_HORIZON_MONTHS {
        let intake = scheduler.begin_month(month)?;
        let cohorts = generator.generate(month, intake.onboarding)?;

        for c in &cohorts {
            if let Some(rejoin_month) = c.rejoin_month_index {
                scheduler.schedule_rejoin(rejoin_month, c.rejoin_users)?;
            }
        }

        let allocated: UserCount = cohorts.iter().map(|c| c.users).sum();
        if allocated < intake.onboarding {
            warn!(
                "month {}: {} of {} onboarded users matched no cohort",
                month + 1,
                intake.onboarding - allocated,
                intake.onboarding
            );
        }
        debug!(
            "month {}: onboarding={} allocated={} cohorts={}",
            month + 1,
            intake.onboarding,
            allocated,
            cohorts.len()
        );

        output.lifecycle_log.extend(lifecycle_rows(&intake, &cohorts, allocated));
        output.growth_log.push(GrowthLogRow::new(
            &intake,
            generator.calendar().month_label(month),
            allocated,
            cohorts.len(),
        ));
        for c in &cohorts {
            output.deposit_log.push(DepositLogRow::from(c));
            output.default_log.push(DefaultLogRow::from(c));
        }
        output.cohorts.extend(cohorts);

        scheduler.end_month(&intake)?;
    }

    output.totals = ForecastTotals::from_tables(&output.cohorts, &output.growth_log)?;

    if output.totals.stranded_users > 0 {
        warnings.push(format!(
            "{} onboarded users could not be placed in any cohort.",
            output.totals.stranded_users
        ));
    }
    if output.totals.capped_users > 0 {
        warnings.push(format!(
            "TAM cap turned away {} new users over the horizon.",
            output.totals.capped_users
        ));
    }

    info!(
        "forecast done: cohorts={} onboarded={} profit={}",
        output.totals.cohorts, output.totals.onboarded_users, output.totals.lifetime_profit
    );

    Ok((output, warnings))
}

/// Run a forecast and wrap the tables in the standard output envelope.
pub fn run_forecast(config: &ForecastConfig) -> RoscaResult<ComputationOutput<ForecastOutput>> {
    let start = Instant::now();
    let (output, warnings) = simulate(config)?;
    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "ROSCA cohort simulation (largest-remainder apportionment, 60-month horizon)",
        config,
        warnings,
        elapsed,
        output,
    ))
}

/// Split each cohort's users into new and rejoining members.
///
/// The allocated users take the month's new:rejoining ratio, then the new
/// users are spread over cohorts in proportion to size, so the per-cohort
/// figures add up to the month totals exactly.
fn lifecycle_rows(intake: &MonthIntake, cohorts: &[Cohort], allocated: UserCount) -> Vec<LifecycleRow> {
    let split = apportion_counts(
        allocated,
        [
            Decimal::from(intake.new_users),
            Decimal::from(intake.rejoining_users),
        ],
    );
    let allocated_new = split.first().copied().unwrap_or(0);
    let new_by_cohort = apportion_counts(allocated_new, cohorts.iter().map(|c| Decimal::from(c.users)));

    cohorts
        .iter()
        .zip(new_by_cohort)
        .map(|(c, new_users)| {
            let new_users = new_users.min(c.users);
            LifecycleRow {
                cohort: c.label.clone(),
                month: c.month,
                year: c.year,
                new_users,
                rejoining_users: c.users - new_users,
                cohort_users: c.users,
                month_onboarding: intake.onboarding,
                rejoin_users: c.rejoin_users,
                rejoin_month: c.rejoin_month_index.map(|m| m + 1),
            }
        })
        .collect()
}
