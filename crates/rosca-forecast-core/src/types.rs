use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::{RoscaError, RoscaResult};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%).
pub type Rate = Decimal;

/// Percentages expressed in points (5 = 5%), as entered by operators.
/// Convert with [`pct_to_rate`] before multiplying.
pub type Percent = Decimal;

/// Whole users. Cohort sizes are never fractional.
pub type UserCount = u64;

/// Zero-based simulation month (0 = first simulated month).
pub type MonthIndex = u32;

/// Convert percentage points into a decimal rate.
pub fn pct_to_rate(pct: Percent) -> Rate {
    pct / dec!(100)
}

/// One-based calendar year of the simulation a month belongs to.
pub fn year_of(month_index: MonthIndex) -> u32 {
    month_index / 12 + 1
}

/// Round a non-negative decimal quantity of users to a whole count.
///
/// Uses banker's rounding (half to even). Negative values clamp to zero; a
/// count too large for [`UserCount`] is an error.
pub fn round_users(value: Decimal) -> RoscaResult<UserCount> {
    if value <= Decimal::ZERO {
        return Ok(0);
    }
    value.round().to_u64().ok_or_else(|| {
        RoscaError::InvalidConfiguration(format!(
            "User count {} exceeds the supported maximum of {}.",
            value.round(),
            UserCount::MAX
        ))
    })
}

/// Checked sum of two user counts.
pub fn add_users(a: UserCount, b: UserCount) -> RoscaResult<UserCount> {
    a.checked_add(b).ok_or_else(|| {
        RoscaError::InvalidConfiguration(format!(
            "User count {a} + {b} exceeds the supported maximum of {}.",
            UserCount::MAX
        ))
    })
}

/// Checked product of two money amounts or an amount and a rate.
pub fn mul_money(a: Decimal, b: Decimal) -> RoscaResult<Money> {
    a.checked_mul(b)
        .ok_or_else(|| RoscaError::InvalidConfiguration(format!("Amount {a} × {b} is out of range.")))
}

/// Checked sum of two money amounts.
pub fn add_money(a: Money, b: Money) -> RoscaResult<Money> {
    a.checked_add(b)
        .ok_or_else(|| RoscaError::InvalidConfiguration(format!("Amount {a} + {b} is out of range.")))
}

/// Decimal places kept on cohort-level interest totals.
pub const MONEY_DP: u32 = 6;

/// Round a money amount to [`MONEY_DP`] places (half to even).
pub fn round_money(value: Money) -> Money {
    value.round_dp(MONEY_DP)
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
