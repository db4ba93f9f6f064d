use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cohort::record::Cohort;
use crate::growth::scheduler::MonthIntake;
use crate::{types::*, RoscaResult};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Cash taken in from a cohort in its joining month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositLogRow {
    pub cohort: String,
    pub month: u32,
    pub payout_month: u32,
    pub users: UserCount,
    pub installment: Money,
    pub installment_cash: Money,
    /// Total commitment the cohort will pay in over the cycle.
    pub deposit_held: Money,
    pub avg_monthly_nii: Money,
}

impl From<&Cohort> for DepositLogRow {
    fn from(c: &Cohort) -> Self {
        Self {
            cohort: c.label.clone(),
            month: c.month,
            payout_month: c.payout_due_month_index + 1,
            users: c.users,
            installment: c.installment,
            installment_cash: c.cash_collected,
            deposit_held: c.total_commitment(),
            avg_monthly_nii: if c.duration == 0 {
                Decimal::ZERO
            } else {
                c.total_nii / Decimal::from(c.duration)
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultLogRow {
    pub cohort: String,
    pub month: u32,
    pub year: u32,
    pub users: UserCount,
    pub pre_payout_defaulters: UserCount,
    pub post_payout_defaulters: UserCount,
    pub pre_payout_loss: Money,
    pub post_payout_loss: Money,
    pub total_loss: Money,
}

impl From<&Cohort> for DefaultLogRow {
    fn from(c: &Cohort) -> Self {
        Self {
            cohort: c.label.clone(),
            month: c.month,
            year: c.year,
            users: c.users,
            pre_payout_defaulters: c.pre_payout_defaulters,
            post_payout_defaulters: c.post_payout_defaulters,
            pre_payout_loss: c.pre_payout_loss,
            post_payout_loss: c.post_payout_loss,
            total_loss: c.total_default_loss,
        }
    }
}

/// How a cohort's members split between first-time and returning users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleRow {
    pub cohort: String,
    pub month: u32,
    pub year: u32,
    pub new_users: UserCount,
    pub rejoining_users: UserCount,
    pub cohort_users: UserCount,
    /// New + rejoining users onboarded across the whole month.
    pub month_onboarding: UserCount,
    pub rejoin_users: UserCount,
    pub rejoin_month: Option<u32>,
}

/// Month-level user flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthLogRow {
    pub month_index: MonthIndex,
    pub month: u32,
    pub year: u32,
    pub label: String,
    pub new_users: UserCount,
    pub rejoining_users: UserCount,
    pub onboarding: UserCount,
    pub allocated_users: UserCount,
    /// Onboarded users no cohort could take (empty durations or blocked slots).
    pub stranded_users: UserCount,
    pub capped_users: UserCount,
    pub cohorts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tam_ceiling: Option<UserCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tam_used: Option<UserCount>,
}

impl GrowthLogRow {
    pub fn new(intake: &MonthIntake, label: String, allocated_users: UserCount, cohorts: usize) -> Self {
        Self {
            month_index: intake.month_index,
            month: intake.month_index + 1,
            year: year_of(intake.month_index),
            label,
            new_users: intake.new_users,
            rejoining_users: intake.rejoining_users,
            onboarding: intake.onboarding,
            allocated_users,
            stranded_users: intake.onboarding.saturating_sub(allocated_users),
            capped_users: intake.capped_users,
            cohorts,
            tam_ceiling: intake.tam_ceiling,
            tam_used: intake.tam_used,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Run-level totals across every cohort and month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastTotals {
    pub cohorts: usize,
    pub new_users: UserCount,
    pub rejoining_users: UserCount,
    pub onboarded_users: UserCount,
    pub stranded_users: UserCount,
    pub capped_users: UserCount,
    pub total_fee: Money,
    pub total_nii: Money,
    pub total_default_loss: Money,
    pub lifetime_profit: Money,
    pub external_capital_required: Money,
}

impl ForecastTotals {
    pub fn from_tables(cohorts: &[Cohort], growth: &[GrowthLogRow]) -> RoscaResult<Self> {
        let mut totals = Self {
            cohorts: cohorts.len(),
            ..Self::default()
        };
        for row in growth {
            totals.new_users = add_users(totals.new_users, row.new_users)?;
            totals.rejoining_users = add_users(totals.rejoining_users, row.rejoining_users)?;
            totals.onboarded_users = add_users(totals.onboarded_users, row.allocated_users)?;
            totals.stranded_users = add_users(totals.stranded_users, row.stranded_users)?;
            totals.capped_users = add_users(totals.capped_users, row.capped_users)?;
        }
        for c in cohorts {
            totals.total_fee = add_money(totals.total_fee, c.total_fee)?;
            totals.total_nii = add_money(totals.total_nii, c.total_nii)?;
            totals.total_default_loss = add_money(totals.total_default_loss, c.total_default_loss)?;
            totals.lifetime_profit = add_money(totals.lifetime_profit, c.lifetime_profit)?;
            totals.external_capital_required =
                add_money(totals.external_capital_required, c.external_capital_required)?;
        }
        Ok(totals)
    }
}

/// Every table produced by one forecast run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastOutput {
    pub cohorts: Vec<Cohort>,
    pub deposit_log: Vec<DepositLogRow>,
    pub default_log: Vec<DefaultLogRow>,
    pub lifecycle_log: Vec<LifecycleRow>,
    pub growth_log: Vec<GrowthLogRow>,
    pub totals: ForecastTotals,
}

impl ForecastOutput {
    /// Cohorts that joined in `month_index`.
    pub fn cohorts_in_month(&self, month_index: MonthIndex) -> impl Iterator<Item = &Cohort> {
        self.cohorts.iter().filter(move |c| c.month_index == month_index)
    }
}
