//! Largest-remainder (Hamilton) apportionment of whole users across
//! percentage shares.
//!
//! Every level of the cohort hierarchy (duration → slab → slot) splits an
//! integer user count with this function, so no users are lost or invented
//! to rounding:
//!
//! 1. Shares are weighted in exact integer arithmetic at nine decimal places.
//!    Weights are normalised by their sum, so shares that do not add up to
//!    100 are tolerated deterministically rather than rejected.
//! 2. Each key receives `floor(total × weight / sum)`.
//! 3. The units left over go one at a time to the keys with the largest
//!    fractional remainders. Ties go to the key listed first.
//!
//! Zero or negative shares always receive zero.

use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::RoscaError;
use crate::types::{with_metadata, ComputationOutput, Percent, UserCount};
use crate::RoscaResult;

/// Decimal places a share is resolved to before integer apportionment.
const SHARE_SCALE: u32 = 9;

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Split `total` across `shares`, preserving the input order of keys.
///
/// The returned counts always sum to `total` unless every share is zero, in
/// which case every count is zero.
pub fn apportion<K: Clone>(total: UserCount, shares: &[(K, Percent)]) -> Vec<(K, UserCount)> {
    let counts = apportion_counts(total, shares.iter().map(|(_, s)| *s));
    shares
        .iter()
        .zip(counts)
        .map(|((key, _), count)| (key.clone(), count))
        .collect()
}

/// Positional variant of [`apportion`]: one count per share, same order.
pub fn apportion_counts(total: UserCount, shares: impl IntoIterator<Item = Percent>) -> Vec<UserCount> {
    let weights: Vec<u128> = shares.into_iter().map(share_weight).collect();
    let mut counts = vec![0u64; weights.len()];

    let sum = weights.iter().fold(0u128, |acc, w| acc.saturating_add(*w));
    if total == 0 || sum == 0 {
        return counts;
    }

    let mut allocated: UserCount = 0;
    // (position, fractional remainder numerator)
    let mut remainders: Vec<(usize, u128)> = Vec::with_capacity(weights.len());
    for (idx, weight) in weights.iter().enumerate() {
        if *weight == 0 {
            continue;
        }
        let numerator = u128::from(total).saturating_mul(*weight);
        let quota = u64::try_from(numerator / sum).unwrap_or(total);
        counts[idx] = quota;
        allocated = allocated.saturating_add(quota);
        remainders.push((idx, numerator % sum));
    }

    let mut leftover = total.saturating_sub(allocated);
    if leftover == 0 {
        return counts;
    }

    // Stable sort keeps input order among equal remainders.
    remainders.sort_by(|a, b| b.1.cmp(&a.1));
    for (idx, _) in &remainders {
        if leftover == 0 {
            break;
        }
        counts[*idx] += 1;
        leftover -= 1;
    }
    // Only reachable when weights saturated; keep the total exact anyway.
    if leftover > 0 {
        if let Some((idx, _)) = remainders.first() {
            counts[*idx] += leftover;
        }
    }

    counts
}

/// Integer weight of a percentage share at `SHARE_SCALE` decimal places.
fn share_weight(share: Percent) -> u128 {
    if share <= Decimal::ZERO {
        return 0;
    }
    let mut scaled = share.round_dp(SHARE_SCALE);
    scaled.rescale(SHARE_SCALE);
    let mantissa = u128::try_from(scaled.mantissa()).unwrap_or(0);
    // rescale() keeps a smaller scale when the value would overflow.
    let missing = SHARE_SCALE.saturating_sub(scaled.scale());
    mantissa.saturating_mul(10u128.pow(missing))
}

// ---------------------------------------------------------------------------
// Standalone operation
// ---------------------------------------------------------------------------

/// A named share for the standalone apportionment operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareEntry {
    pub key: String,
    pub share_pct: Percent,
}

/// Input for apportioning a user count across named shares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApportionInput {
    pub total: UserCount,
    pub shares: Vec<ShareEntry>,
}

/// One key's allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRow {
    pub key: String,
    pub share_pct: Percent,
    /// Real-valued allocation before rounding (after normalisation).
    pub exact: Decimal,
    pub allocated: UserCount,
}

/// Output of the standalone apportionment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApportionOutput {
    pub total: UserCount,
    pub allocated_total: UserCount,
    pub allocations: Vec<AllocationRow>,
}

/// Apportion a user count across named shares, reporting exact and rounded
/// allocations.
pub fn apportion_users(input: &ApportionInput) -> RoscaResult<ComputationOutput<ApportionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.shares.is_empty() {
        return Err(RoscaError::InsufficientData(
            "At least one share is required.".into(),
        ));
    }
    for entry in &input.shares {
        if entry.share_pct < Decimal::ZERO || entry.share_pct > dec!(100) {
            return Err(RoscaError::InvalidInput {
                field: format!("shares.{}", entry.key),
                reason: format!("Share must be between 0 and 100, got {}.", entry.share_pct),
            });
        }
    }

    let share_sum: Decimal = input.shares.iter().map(|s| s.share_pct).sum();
    if share_sum.is_zero() {
        warnings.push("All shares are zero; nothing was allocated.".into());
    } else if share_sum != dec!(100) {
        warnings.push(format!(
            "Shares sum to {share_sum}%, not 100%; allocations were normalised."
        ));
    }

    let pairs: Vec<(String, Percent)> = input
        .shares
        .iter()
        .map(|s| (s.key.clone(), s.share_pct))
        .collect();
    let counts = apportion(input.total, &pairs);

    let allocations: Vec<AllocationRow> = input
        .shares
        .iter()
        .zip(counts)
        .map(|(entry, (_, allocated))| AllocationRow {
            key: entry.key.clone(),
            share_pct: entry.share_pct,
            exact: if share_sum.is_zero() {
                Decimal::ZERO
            } else {
                Decimal::from(input.total) * entry.share_pct / share_sum
            },
            allocated,
        })
        .collect();
    let allocated_total = allocations.iter().map(|a| a.allocated).sum();

    let output = ApportionOutput {
        total: input.total,
        allocated_total,
        allocations,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Largest-remainder (Hamilton) apportionment",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
