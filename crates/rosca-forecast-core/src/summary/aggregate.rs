use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::profit_share::{profit_share, ProfitShareRow};
use crate::cohort::record::Cohort;
use crate::config::{ForecastConfig, FORECAST_HORIZON_MONTHS, FORECAST_YEARS};
use crate::simulation::driver::simulate;
use crate::simulation::tables::ForecastOutput;
use crate::{types::*, RoscaResult};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Measures shared by the monthly and yearly views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodMeasures {
    /// Users placed in cohorts that joined in the period.
    pub users: UserCount,
    pub new_users: UserCount,
    pub rejoining_users: UserCount,
    pub fee_income: Money,
    pub nii: Money,
    pub default_loss: Money,
    pub profit: Money,
    pub cash_collected: Money,
    /// Payouts falling due in the period, whichever month the cohort joined.
    pub payouts_due: Money,
    pub external_capital_required: Money,
}

impl PeriodMeasures {
    fn add(&mut self, other: &PeriodMeasures) -> RoscaResult<()> {
        self.users = add_users(self.users, other.users)?;
        self.new_users = add_users(self.new_users, other.new_users)?;
        self.rejoining_users = add_users(self.rejoining_users, other.rejoining_users)?;
        self.fee_income = add_money(self.fee_income, other.fee_income)?;
        self.nii = add_money(self.nii, other.nii)?;
        self.default_loss = add_money(self.default_loss, other.default_loss)?;
        self.profit = add_money(self.profit, other.profit)?;
        self.cash_collected = add_money(self.cash_collected, other.cash_collected)?;
        self.payouts_due = add_money(self.payouts_due, other.payouts_due)?;
        self.external_capital_required = add_money(self.external_capital_required, other.external_capital_required)?;
        Ok(())
    }

    /// Fold one cohort's joining-month measures in.
    fn add_cohort(&mut self, c: &Cohort) -> RoscaResult<()> {
        self.users = add_users(self.users, c.users)?;
        self.fee_income = add_money(self.fee_income, c.total_fee)?;
        self.nii = add_money(self.nii, c.total_nii)?;
        self.default_loss = add_money(self.default_loss, c.total_default_loss)?;
        self.profit = add_money(self.profit, c.lifetime_profit)?;
        self.cash_collected = add_money(self.cash_collected, c.cash_collected)?;
        self.external_capital_required = add_money(self.external_capital_required, c.external_capital_required)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummaryRow {
    pub month_index: MonthIndex,
    pub month: u32,
    pub year: u32,
    pub label: String,
    #[serde(flatten)]
    pub measures: PeriodMeasures,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlySummaryRow {
    pub year: u32,
    #[serde(flatten)]
    pub measures: PeriodMeasures,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    #[serde(flatten)]
    pub measures: PeriodMeasures,
    /// Payouts owed by late cohorts after the last forecast month.
    pub payouts_beyond_horizon: Money,
    pub platform_profit: Money,
    pub partner_profit: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub monthly: Vec<MonthlySummaryRow>,
    pub yearly: Vec<YearlySummaryRow>,
    pub profit_share: Vec<ProfitShareRow>,
    pub totals: SummaryTotals,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// One row per forecast month. Cohort measures land in the joining month;
/// payouts land in the month they fall due.
pub fn monthly_summary(output: &ForecastOutput) -> RoscaResult<Vec<MonthlySummaryRow>> {
    let mut rows: Vec<MonthlySummaryRow> = (0..FORECAST_HORIZON_MONTHS)
        .map(|m| MonthlySummaryRow {
            month_index: m,
            month: m + 1,
            year: year_of(m),
            label: output
                .growth_log
                .get(m as usize)
                .map(|g| g.label.clone())
                .unwrap_or_else(|| format!("M{}", m + 1)),
            measures: PeriodMeasures::default(),
        })
        .collect();

    for g in &output.growth_log {
        if let Some(row) = rows.get_mut(g.month_index as usize) {
            row.measures.new_users = g.new_users;
            row.measures.rejoining_users = g.rejoining_users;
        }
    }

    for c in &output.cohorts {
        if let Some(row) = rows.get_mut(c.month_index as usize) {
            row.measures.add_cohort(c)?;
        }
        if let Some(row) = rows.get_mut(c.payout_due_month_index as usize) {
            row.measures.payouts_due = add_money(row.measures.payouts_due, c.payout_scheduled)?;
        }
    }

    Ok(rows)
}

/// Monthly rows grouped into forecast years 1..=5.
pub fn yearly_summary(monthly: &[MonthlySummaryRow]) -> RoscaResult<Vec<YearlySummaryRow>> {
    let mut rows: Vec<YearlySummaryRow> = (1..=FORECAST_YEARS)
        .map(|year| YearlySummaryRow {
            year,
            measures: PeriodMeasures::default(),
        })
        .collect();

    for m in monthly {
        if let Some(row) = rows.iter_mut().find(|r| r.year == m.year) {
            row.measures.add(&m.measures)?;
        }
    }

    Ok(rows)
}

/// Monthly, yearly and profit-share views of a finished run.
pub fn summarize_forecast(output: &ForecastOutput, config: &ForecastConfig) -> RoscaResult<ForecastSummary> {
    let monthly = monthly_summary(output)?;
    let yearly = yearly_summary(&monthly)?;
    let shares = profit_share(&yearly, &config.profit_share)?;

    let mut totals = SummaryTotals::default();
    for y in &yearly {
        totals.measures.add(&y.measures)?;
    }
    totals.payouts_beyond_horizon = output
        .cohorts
        .iter()
        .filter(|c| c.payout_due_month_index >= FORECAST_HORIZON_MONTHS)
        .try_fold(Decimal::ZERO, |acc, c| add_money(acc, c.payout_scheduled))?;
    for s in &shares {
        totals.platform_profit = add_money(totals.platform_profit, s.platform_share)?;
        totals.partner_profit = add_money(totals.partner_profit, s.partner_share)?;
    }

    Ok(ForecastSummary {
        monthly,
        yearly,
        profit_share: shares,
        totals,
    })
}

/// Run a forecast and return only its summaries.
pub fn forecast_summary(config: &ForecastConfig) -> RoscaResult<ComputationOutput<ForecastSummary>> {
    let start = Instant::now();
    let (output, warnings) = simulate(config)?;
    let summary = summarize_forecast(&output, config)?;
    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "ROSCA forecast summary (monthly, yearly, profit share)",
        config,
        warnings,
        elapsed,
        summary,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfitShareConfig;
    use rust_decimal_macros::dec;

    fn cohort(month_index: MonthIndex, slot: u32, users: UserCount, profit: Decimal) -> Cohort {
        Cohort {
            label: Cohort::cohort_label(month_index, 3, slot, dec!(1000)),
            month_index,
            month: month_index + 1,
            year: year_of(month_index),
            duration: 3,
            installment: dec!(1000),
            slot,
            users,
            commitment_per_user: dec!(3000),
            fee_pct: dec!(1),
            fee_per_user: dec!(30),
            total_fee: dec!(30) * Decimal::from(users),
            total_nii: dec!(5),
            total_defaulters: 0,
            pre_payout_defaulters: 0,
            post_payout_defaulters: 0,
            pre_payout_loss: Decimal::ZERO,
            post_payout_loss: Decimal::ZERO,
            total_default_loss: Decimal::ZERO,
            lifetime_profit: profit,
            cash_collected: dec!(1000) * Decimal::from(users),
            payout_due_month_index: month_index + slot - 1,
            payout_scheduled: dec!(3000) * Decimal::from(users),
            external_capital_required: Decimal::ZERO,
            rejoin_users: users,
            rejoin_month_index: None,
        }
    }

    fn output(cohorts: Vec<Cohort>) -> ForecastOutput {
        ForecastOutput {
            cohorts,
            ..ForecastOutput::default()
        }
    }

    #[test]
    fn test_payouts_grouped_by_due_month() {
        let out = output(vec![cohort(0, 1, 10, dec!(100)), cohort(0, 3, 10, dec!(100))]);
        let monthly = monthly_summary(&out).unwrap();
        assert_eq!(monthly.len(), 60);
        assert_eq!(monthly[0].measures.users, 20);
        assert_eq!(monthly[0].measures.payouts_due, dec!(30000));
        assert_eq!(monthly[1].measures.payouts_due, Decimal::ZERO);
        assert_eq!(monthly[2].measures.payouts_due, dec!(30000));
        assert_eq!(monthly[2].measures.users, 0);
    }

    #[test]
    fn test_yearly_groups_months() {
        let out = output(vec![
            cohort(0, 1, 10, dec!(100)),
            cohort(11, 1, 5, dec!(50)),
            cohort(12, 1, 7, dec!(70)),
        ]);
        let yearly = yearly_summary(&monthly_summary(&out).unwrap()).unwrap();
        assert_eq!(yearly.len(), 5);
        assert_eq!(yearly[0].measures.users, 15);
        assert_eq!(yearly[0].measures.profit, dec!(150));
        assert_eq!(yearly[1].measures.profit, dec!(70));
        assert_eq!(yearly[4].measures.users, 0);
    }

    #[test]
    fn test_summary_totals_and_late_payouts() {
        let out = output(vec![cohort(0, 1, 10, dec!(100)), cohort(59, 3, 2, dec!(40))]);
        let mut config = crate::config::sample_config();
        config.profit_share = ProfitShareConfig {
            platform_pct: dec!(60),
            partner_pct: dec!(40),
        };
        let summary = summarize_forecast(&out, &config).unwrap();
        assert_eq!(summary.totals.measures.profit, dec!(140));
        assert_eq!(summary.totals.payouts_beyond_horizon, dec!(6000));
        assert_eq!(summary.totals.platform_profit, dec!(84));
        assert_eq!(summary.totals.partner_profit, dec!(56));
    }

    #[test]
    fn test_measure_overflow_is_an_error() {
        let out = output(vec![cohort(0, 1, 10, Decimal::MAX), cohort(1, 1, 10, Decimal::MAX)]);
        let monthly = monthly_summary(&out).unwrap();
        assert!(yearly_summary(&monthly).is_err());
    }
}
