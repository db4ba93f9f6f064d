use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::{types::*, RoscaError, RoscaResult};

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Credit-risk assumptions applied to every cohort, as decimal rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultAssumptions {
    pub default_rate: Rate,
    pub pre_payout_share: Rate,
    pub recovery_rate: Rate,
}

/// Lifetime default outcome for one cohort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultLoss {
    pub total_defaulters: UserCount,
    pub pre_payout_defaulters: UserCount,
    pub post_payout_defaulters: UserCount,
    pub pre_payout_loss: Money,
    pub post_payout_loss: Money,
    pub total_loss: Money,
}

impl DefaultLoss {
    /// Members who complete the cycle without defaulting.
    pub fn survivors(&self, users: UserCount) -> UserCount {
        users.saturating_sub(self.total_defaulters)
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Split a cohort's defaulters into pre- and post-payout groups and price the
/// loss.
///
/// A pre-payout defaulter forfeits their commitment net of recovery. A
/// post-payout defaulter has already drawn the pool, so the full commitment
/// is lost.
pub fn cohort_default_loss(
    users: UserCount,
    commitment: Money,
    assumptions: &DefaultAssumptions,
) -> RoscaResult<DefaultLoss> {
    if users == 0 {
        return Ok(DefaultLoss::default());
    }

    let total_defaulters = round_users(mul_money(Decimal::from(users), assumptions.default_rate)?)?.min(users);
    let pre_payout_defaulters =
        round_users(mul_money(Decimal::from(total_defaulters), assumptions.pre_payout_share)?)?.min(total_defaulters);
    let post_payout_defaulters = total_defaulters - pre_payout_defaulters;

    let recovery = assumptions.recovery_rate.clamp(Decimal::ZERO, Decimal::ONE);
    let commitment = commitment.max(Decimal::ZERO);

    let pre_payout_loss = mul_money(
        mul_money(Decimal::from(pre_payout_defaulters), commitment)?,
        Decimal::ONE - recovery,
    )?;
    let post_payout_loss = mul_money(Decimal::from(post_payout_defaulters), commitment)?;

    Ok(DefaultLoss {
        total_defaulters,
        pre_payout_defaulters,
        post_payout_defaulters,
        pre_payout_loss,
        post_payout_loss,
        total_loss: add_money(pre_payout_loss, post_payout_loss)?,
    })
}

// ---------------------------------------------------------------------------
// Standalone operation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultLossInput {
    pub users: UserCount,
    pub commitment: Money,
    pub default_rate_pct: Percent,
    pub pre_payout_share_pct: Percent,
    #[serde(default)]
    pub recovery_pct: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultLossOutput {
    #[serde(flatten)]
    pub loss: DefaultLoss,
    pub survivors: UserCount,
    /// Total loss as a share of the cohort's total commitment.
    pub loss_ratio: Rate,
}

pub fn calculate_default_loss(input: &DefaultLossInput) -> RoscaResult<ComputationOutput<DefaultLossOutput>> {
    let start = Instant::now();
    let warnings: Vec<String> = Vec::new();

    if input.commitment < Decimal::ZERO {
        return Err(RoscaError::InvalidInput {
            field: "commitment".into(),
            reason: "Commitment cannot be negative.".into(),
        });
    }
    for (field, value) in [
        ("default_rate_pct", input.default_rate_pct),
        ("pre_payout_share_pct", input.pre_payout_share_pct),
        ("recovery_pct", input.recovery_pct),
    ] {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(RoscaError::InvalidInput {
                field: field.into(),
                reason: "Must be between 0 and 100.".into(),
            });
        }
    }

    let assumptions = DefaultAssumptions {
        default_rate: pct_to_rate(input.default_rate_pct),
        pre_payout_share: pct_to_rate(input.pre_payout_share_pct),
        recovery_rate: pct_to_rate(input.recovery_pct),
    };
    let loss = cohort_default_loss(input.users, input.commitment, &assumptions)?;

    let exposure = mul_money(Decimal::from(input.users), input.commitment)?;
    let loss_ratio = if exposure.is_zero() {
        Decimal::ZERO
    } else {
        loss.total_loss / exposure
    };

    let output = DefaultLossOutput {
        survivors: loss.survivors(input.users),
        loss,
        loss_ratio,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Pre/post-payout default split with pre-payout recovery",
        input,
        warnings,
        elapsed,
        output,
    ))
}
