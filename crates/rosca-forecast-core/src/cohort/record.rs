use serde::{Deserialize, Serialize};

use crate::types::*;

/// All users who join in one month with the same duration, installment and
/// payout slot.
///
/// Built once by the cohort generator and never mutated afterwards. Money
/// fields are lifetime totals for the whole cohort unless named per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    /// Stable identifier, `M{month}-D{duration}-S{slot}-{installment}`.
    pub label: String,
    pub month_index: MonthIndex,
    /// One-based month number (month_index + 1).
    pub month: u32,
    pub year: u32,
    pub duration: u32,
    pub installment: Money,
    pub slot: u32,
    pub users: UserCount,

    /// installment × duration.
    pub commitment_per_user: Money,
    pub fee_pct: Percent,
    pub fee_per_user: Money,
    pub total_fee: Money,
    pub total_nii: Money,

    pub total_defaulters: UserCount,
    pub pre_payout_defaulters: UserCount,
    pub post_payout_defaulters: UserCount,
    pub pre_payout_loss: Money,
    pub post_payout_loss: Money,
    pub total_default_loss: Money,

    /// Fee income + NII − default loss.
    pub lifetime_profit: Money,
    /// Installments collected in the joining month.
    pub cash_collected: Money,

    pub payout_due_month_index: MonthIndex,
    /// Pool paid out to the slot's members. Pre-payout defaulters never
    /// receive their turn.
    pub payout_scheduled: Money,
    /// Shortfall when losses exceed fee income plus NII.
    pub external_capital_required: Money,

    /// Non-defaulting members who become eligible to rejoin.
    pub rejoin_users: UserCount,
    /// Month those members rejoin; `None` past the forecast horizon.
    pub rejoin_month_index: Option<MonthIndex>,
}

impl Cohort {
    pub fn cohort_label(month_index: MonthIndex, duration: u32, slot: u32, installment: Money) -> String {
        format!(
            "M{}-D{}-S{}-{}",
            month_index + 1,
            duration,
            slot,
            installment.normalize()
        )
    }

    /// Total committed by all members over the cycle.
    pub fn total_commitment(&self) -> Money {
        self.commitment_per_user * rust_decimal::Decimal::from(self.users)
    }
}
