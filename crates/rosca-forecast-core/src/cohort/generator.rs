//! Cohort emission for one simulated month.
//!
//! Onboarding users are split down the product hierarchy, duration → slab →
//! unblocked slot, with the largest-remainder apportioner at every level. A
//! branch that receives no users stops there. Every surviving leaf becomes
//! one [`Cohort`] with its lifetime economics priced up front.

use rust_decimal::Decimal;

use super::record::Cohort;
use crate::allocation::apportion::apportion;
use crate::config::{ForecastConfig, FORECAST_HORIZON_MONTHS};
use crate::interest::calendar::Calendar;
use crate::interest::nii::{cohort_lifetime_nii, CohortTerms, NiiMethod};
use crate::risk::default_loss::{cohort_default_loss, DefaultAssumptions};
use crate::{types::*, RoscaResult};

/// Prices and emits cohorts. Holds only values derived from the immutable
/// configuration, so one generator serves every month of a run.
#[derive(Debug)]
pub struct CohortGenerator<'a> {
    config: &'a ForecastConfig,
    calendar: Calendar,
    annual_rate: Rate,
    assumptions: DefaultAssumptions,
    nii_method: NiiMethod,
}

impl<'a> CohortGenerator<'a> {
    pub fn new(config: &'a ForecastConfig) -> RoscaResult<Self> {
        let risk = &config.risk;
        Ok(Self {
            config,
            calendar: Calendar::from_config(&config.calendar)?,
            annual_rate: risk.annual_rate(),
            assumptions: DefaultAssumptions {
                default_rate: pct_to_rate(risk.default_rate_pct),
                pre_payout_share: pct_to_rate(risk.pre_payout_default_share_pct),
                recovery_rate: pct_to_rate(risk.pre_payout_recovery_pct),
            },
            nii_method: config.policy.nii_method,
        })
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Emit the cohorts for `onboarding` users joining in `month`.
    ///
    /// Cohorts come out in configuration order: durations as listed, then
    /// slabs, then slots.
    pub fn generate(&self, month: MonthIndex, onboarding: UserCount) -> RoscaResult<Vec<Cohort>> {
        let mut cohorts = Vec::new();
        if onboarding == 0 {
            return Ok(cohorts);
        }

        let product = &self.config.product;
        let duration_shares = product.duration_shares_for_year(year_of(month));

        for (duration, duration_users) in apportion(onboarding, &duration_shares) {
            if duration_users == 0 || duration == 0 {
                continue;
            }

            let slab_shares: Vec<(Money, Percent)> = product
                .slabs_for(duration)
                .iter()
                .map(|s| (s.amount, s.share_pct))
                .collect();

            for (installment, slab_users) in apportion(duration_users, &slab_shares) {
                if slab_users == 0 {
                    continue;
                }

                let slot_shares: Vec<((u32, Percent), Percent)> = product
                    .open_slots(duration)
                    .map(|s| ((s.slot, s.fee_pct), s.share_pct))
                    .collect();

                for ((slot, fee_pct), users) in apportion(slab_users, &slot_shares) {
                    if users == 0 {
                        continue;
                    }
                    let terms = CohortTerms {
                        joining_month: month,
                        duration,
                        installment,
                        slot,
                    };
                    cohorts.push(self.price(&terms, fee_pct, users)?);
                }
            }
        }

        Ok(cohorts)
    }

    fn price(&self, terms: &CohortTerms, fee_pct: Percent, users: UserCount) -> RoscaResult<Cohort> {
        let headcount = Decimal::from(users);
        let commitment = terms.commitment()?;
        // Total commitment bounds the fee, loss, cash and payout products.
        mul_money(commitment, headcount)?;

        let fee_per_user = mul_money(commitment, pct_to_rate(fee_pct))?;
        let total_fee = mul_money(fee_per_user, headcount)?;
        let total_nii = round_money(cohort_lifetime_nii(
            self.nii_method,
            &self.calendar,
            self.annual_rate,
            terms,
            users,
        )?);
        let loss = cohort_default_loss(users, commitment, &self.assumptions)?;

        let income = add_money(total_fee, total_nii)?;
        let rejoin_month = terms
            .joining_month
            .saturating_add(terms.duration)
            .saturating_add(self.config.risk.rest_period_months);

        Ok(Cohort {
            label: Cohort::cohort_label(terms.joining_month, terms.duration, terms.slot, terms.installment),
            month_index: terms.joining_month,
            month: terms.joining_month + 1,
            year: year_of(terms.joining_month),
            duration: terms.duration,
            installment: terms.installment,
            slot: terms.slot,
            users,
            commitment_per_user: commitment,
            fee_pct,
            fee_per_user,
            total_fee,
            total_nii,
            total_defaulters: loss.total_defaulters,
            pre_payout_defaulters: loss.pre_payout_defaulters,
            post_payout_defaulters: loss.post_payout_defaulters,
            pre_payout_loss: loss.pre_payout_loss,
            post_payout_loss: loss.post_payout_loss,
            total_default_loss: loss.total_loss,
            lifetime_profit: income - loss.total_loss,
            cash_collected: mul_money(terms.installment, headcount)?,
            payout_due_month_index: terms.payout_month(),
            payout_scheduled: mul_money(commitment, Decimal::from(users - loss.pre_payout_defaulters))?,
            external_capital_required: (loss.total_loss - income).max(Decimal::ZERO),
            rejoin_users: loss.survivors(users),
            rejoin_month_index: (rejoin_month < FORECAST_HORIZON_MONTHS).then_some(rejoin_month),
        })
    }
}
