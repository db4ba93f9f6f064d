use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::calendar::{days_between, Calendar};
use crate::{types::*, RoscaError, RoscaResult};

/// Day-count basis for interest on held funds.
const DAYS_PER_YEAR: Decimal = dec!(365);

/// How interest on collected-but-unpaid funds is estimated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NiiMethod {
    /// Each installment earns interest for the actual days between its
    /// collection date and the cohort's payout date.
    #[default]
    DayPrecise,
    /// The full commitment earns one month of interest for every month from
    /// the payout slot to the end of the cycle.
    FlatMonth,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Interest earned on one installment held from `collected` until `paid_out`.
///
/// Zero when the payout is not after the collection.
pub fn installment_nii(
    installment: Money,
    annual_rate: Rate,
    collected: NaiveDate,
    paid_out: NaiveDate,
) -> RoscaResult<Money> {
    let days = days_between(collected, paid_out);
    if days <= 0 {
        return Ok(Decimal::ZERO);
    }
    mul_money(mul_money(installment, annual_rate)? / DAYS_PER_YEAR, Decimal::from(days))
}

/// The product terms a cohort's interest depends on.
#[derive(Debug, Clone, Copy)]
pub struct CohortTerms {
    pub joining_month: MonthIndex,
    pub duration: u32,
    pub installment: Money,
    pub slot: u32,
}

impl CohortTerms {
    /// Installment × duration; errors when the product leaves the decimal range.
    pub fn commitment(&self) -> RoscaResult<Money> {
        mul_money(self.installment, Decimal::from(self.duration))
    }

    pub fn payout_month(&self) -> MonthIndex {
        self.joining_month.saturating_add(self.slot.saturating_sub(1))
    }
}

/// Lifetime NII earned on one member of a cohort.
pub fn nii_per_user(
    method: NiiMethod,
    calendar: &Calendar,
    annual_rate: Rate,
    terms: &CohortTerms,
) -> RoscaResult<Money> {
    match method {
        NiiMethod::DayPrecise => {
            let payout = calendar.payout_date(terms.payout_month())?;
            let mut total = Decimal::ZERO;
            for k in 0..terms.duration {
                let collected = calendar.collection_date(terms.joining_month + k)?;
                total = add_money(total, installment_nii(terms.installment, annual_rate, collected, payout)?)?;
            }
            Ok(total)
        }
        NiiMethod::FlatMonth => {
            let months = (terms.duration + 1).saturating_sub(terms.slot);
            mul_money(mul_money(terms.commitment()?, annual_rate)? / dec!(12), Decimal::from(months))
        }
    }
}

/// Lifetime NII for all members of a cohort.
pub fn cohort_lifetime_nii(
    method: NiiMethod,
    calendar: &Calendar,
    annual_rate: Rate,
    terms: &CohortTerms,
    users: UserCount,
) -> RoscaResult<Money> {
    mul_money(nii_per_user(method, calendar, annual_rate, terms)?, Decimal::from(users))
}

// ---------------------------------------------------------------------------
// Standalone operation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NiiInput {
    pub installment: Money,
    pub annual_rate_pct: Percent,
    pub collection_month: MonthIndex,
    pub collection_day: u32,
    pub payout_month: MonthIndex,
    pub payout_day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NiiOutput {
    pub collection_date: NaiveDate,
    pub payout_date: NaiveDate,
    pub days_held: i64,
    pub daily_rate: Rate,
    pub nii: Money,
}

/// Interest on a single installment between two calendar positions.
pub fn calculate_installment_nii(input: &NiiInput) -> RoscaResult<ComputationOutput<NiiOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.installment < Decimal::ZERO {
        return Err(RoscaError::InvalidInput {
            field: "installment".into(),
            reason: "Installment cannot be negative.".into(),
        });
    }
    if input.annual_rate_pct < Decimal::ZERO {
        return Err(RoscaError::InvalidInput {
            field: "annual_rate_pct".into(),
            reason: "Rate cannot be negative.".into(),
        });
    }

    let reference = input
        .start_date
        .or_else(|| NaiveDate::from_ymd_opt(2025, 1, 1))
        .ok_or_else(|| RoscaError::DateError("no reference date".into()))?;
    let calendar = Calendar::new(reference, input.collection_day, input.payout_day)?;
    let collection_date = calendar.collection_date(input.collection_month)?;
    let payout_date = calendar.payout_date(input.payout_month)?;

    let days = days_between(collection_date, payout_date);
    if days <= 0 {
        warnings.push("Payout is not after collection; no interest accrues.".into());
    }
    let annual_rate = pct_to_rate(input.annual_rate_pct);

    let output = NiiOutput {
        collection_date,
        payout_date,
        days_held: days.max(0),
        daily_rate: annual_rate / DAYS_PER_YEAR,
        nii: installment_nii(input.installment, annual_rate, collection_date, payout_date)?,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Actual/365 simple interest on a held installment",
        input,
        warnings,
        elapsed,
        output,
    ))
}
