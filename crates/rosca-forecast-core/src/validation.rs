//! Configuration checks run before a forecast.
//!
//! Malformed shape is an error. Share groups that do not add up to 100 are
//! only warnings: the apportioner normalises them deterministically, and the
//! caller decides whether the result is acceptable.

use std::collections::BTreeSet;
use std::time::Instant;

use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{ForecastConfig, FORECAST_YEARS, MAX_DAY_OF_MONTH};
use crate::{types::*, RoscaError, RoscaResult};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub tam: UserCount,
    pub initial_new_users: UserCount,
    pub durations: Vec<u32>,
    pub configured_years: Vec<u32>,
    pub cohort_combinations: usize,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Reject malformed configuration and return share-group warnings.
pub fn validate_config(config: &ForecastConfig) -> RoscaResult<Vec<String>> {
    validate_market(config)?;
    validate_calendar(config)?;
    validate_risk(config)?;
    validate_product(config)?;
    check_pct("profit_share.platform_pct", config.profit_share.platform_pct)?;
    check_pct("profit_share.partner_pct", config.profit_share.partner_pct)?;

    let warnings = share_warnings(config);
    for w in &warnings {
        warn!("{w}");
    }
    Ok(warnings)
}

/// [`validate_config`] wrapped in the standard output envelope.
pub fn check_config(config: &ForecastConfig) -> RoscaResult<ComputationOutput<ValidationReport>> {
    let start = Instant::now();
    let warnings = validate_config(config)?;

    let product = &config.product;
    let cohort_combinations = product
        .durations
        .iter()
        .map(|d| product.slabs_for(*d).len() * product.open_slots(*d).count())
        .sum();

    let report = ValidationReport {
        valid: true,
        tam: config.market.tam(),
        initial_new_users: config.market.initial_new_users(),
        durations: product.durations.clone(),
        configured_years: product.duration_shares.keys().copied().collect(),
        cohort_combinations,
        warnings: warnings.clone(),
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Forecast configuration validation",
        config,
        warnings,
        elapsed,
        report,
    ))
}

fn validate_market(config: &ForecastConfig) -> RoscaResult<()> {
    let market = &config.market;
    check_pct("market.tam_pct", market.tam_pct)?;
    check_pct("market.start_pct", market.start_pct)?;
    check_non_negative("market.acquisition_rate_pct", market.acquisition_rate_pct)?;
    if market.annual_tam_growth_pct <= -HUNDRED {
        return Err(RoscaError::InvalidInput {
            field: "market.annual_tam_growth_pct".into(),
            reason: "Annual TAM growth must be greater than -100%.".into(),
        });
    }
    Ok(())
}

fn validate_calendar(config: &ForecastConfig) -> RoscaResult<()> {
    for (field, day) in [
        ("calendar.collection_day", config.calendar.collection_day),
        ("calendar.payout_day", config.calendar.payout_day),
    ] {
        if day == 0 || day > MAX_DAY_OF_MONTH {
            return Err(RoscaError::InvalidInput {
                field: field.into(),
                reason: format!("Day of month must be between 1 and {MAX_DAY_OF_MONTH}."),
            });
        }
    }
    Ok(())
}

fn validate_risk(config: &ForecastConfig) -> RoscaResult<()> {
    let risk = &config.risk;
    check_non_negative("risk.base_rate_pct", risk.base_rate_pct)?;
    check_non_negative("risk.spread_pct", risk.spread_pct)?;
    check_pct("risk.default_rate_pct", risk.default_rate_pct)?;
    check_pct("risk.pre_payout_default_share_pct", risk.pre_payout_default_share_pct)?;
    check_pct("risk.pre_payout_recovery_pct", risk.pre_payout_recovery_pct)?;
    Ok(())
}

fn validate_product(config: &ForecastConfig) -> RoscaResult<()> {
    let product = &config.product;
    if product.durations.is_empty() {
        return Err(RoscaError::InvalidConfiguration(
            "At least one duration must be allowed.".into(),
        ));
    }

    let mut seen = BTreeSet::new();
    for d in &product.durations {
        if *d == 0 {
            return Err(RoscaError::InvalidInput {
                field: "product.durations".into(),
                reason: "Durations must be positive.".into(),
            });
        }
        if !seen.insert(*d) {
            return Err(RoscaError::InvalidInput {
                field: "product.durations".into(),
                reason: format!("Duration {d} is listed twice."),
            });
        }
    }

    for (year, shares) in &product.duration_shares {
        if *year == 0 || *year > FORECAST_YEARS {
            return Err(RoscaError::InvalidInput {
                field: "product.duration_shares".into(),
                reason: format!("Year {year} is outside 1..={FORECAST_YEARS}."),
            });
        }
        for (d, pct) in shares {
            check_pct(&format!("product.duration_shares.{year}.{d}"), *pct)?;
        }
    }

    for (d, slabs) in &product.slabs {
        let mut amounts = BTreeSet::new();
        for slab in slabs {
            if slab.amount <= Decimal::ZERO {
                return Err(RoscaError::InvalidInput {
                    field: format!("product.slabs.{d}"),
                    reason: "Installment amounts must be positive.".into(),
                });
            }
            if !amounts.insert(slab.amount.normalize()) {
                return Err(RoscaError::InvalidInput {
                    field: format!("product.slabs.{d}"),
                    reason: format!("Installment {} is listed twice.", slab.amount),
                });
            }
            check_pct(&format!("product.slabs.{d}.share_pct"), slab.share_pct)?;
        }
    }

    for (d, slots) in &product.slots {
        let mut numbers = BTreeSet::new();
        for slot in slots {
            if slot.slot == 0 || slot.slot > *d {
                return Err(RoscaError::InvalidInput {
                    field: format!("product.slots.{d}"),
                    reason: format!("Slot {} is outside 1..={d}.", slot.slot),
                });
            }
            if !numbers.insert(slot.slot) {
                return Err(RoscaError::InvalidInput {
                    field: format!("product.slots.{d}"),
                    reason: format!("Slot {} is listed twice.", slot.slot),
                });
            }
            check_pct(&format!("product.slots.{d}.{}.fee_pct", slot.slot), slot.fee_pct)?;
            check_pct(&format!("product.slots.{d}.{}.share_pct", slot.slot), slot.share_pct)?;
        }
    }

    Ok(())
}

fn share_warnings(config: &ForecastConfig) -> Vec<String> {
    let product = &config.product;
    let allowed: BTreeSet<u32> = product.durations.iter().copied().collect();
    let mut warnings = Vec::new();

    match product.duration_shares.keys().next() {
        None => warnings.push("No duration shares configured; onboarding is split evenly across durations.".into()),
        Some(&first) if first > 1 => warnings.push(format!(
            "No duration shares for years before year {first}; those years use year {first}'s shares."
        )),
        Some(_) => {}
    }
    for (year, shares) in &product.duration_shares {
        let total: Decimal = shares
            .iter()
            .filter(|(d, _)| allowed.contains(d))
            .map(|(_, pct)| *pct)
            .sum();
        if total != HUNDRED {
            warnings.push(format!("Year {year} duration shares sum to {total}%, not 100%."));
        }
        for d in shares.keys().filter(|d| !allowed.contains(d)) {
            warnings.push(format!("Year {year} assigns a share to duration {d}, which is not allowed; ignored."));
        }
    }

    for d in &product.durations {
        let slabs = product.slabs_for(*d);
        if slabs.is_empty() {
            warnings.push(format!("Duration {d} has no installment slabs; users routed there are stranded."));
        } else {
            let total: Decimal = slabs.iter().map(|s| s.share_pct).sum();
            if total != HUNDRED {
                warnings.push(format!("Duration {d} slab shares sum to {total}%, not 100%."));
            }
        }

        if product.open_slots(*d).next().is_none() {
            warnings.push(format!("Duration {d} has no unblocked slots; users routed there are stranded."));
        } else {
            let total: Decimal = product.open_slots(*d).map(|s| s.share_pct).sum();
            if total != HUNDRED {
                warnings.push(format!("Duration {d} unblocked slot shares sum to {total}%, not 100%."));
            }
        }
    }

    let orphaned: BTreeSet<u32> = product
        .slabs
        .keys()
        .chain(product.slots.keys())
        .filter(|d| !allowed.contains(d))
        .copied()
        .collect();
    for d in orphaned {
        warnings.push(format!("Duration {d} has slabs or slots configured but is not allowed; ignored."));
    }

    let split = config.profit_share.platform_pct + config.profit_share.partner_pct;
    if split != HUNDRED {
        warnings.push(format!("Profit share split sums to {split}%, not 100%."));
    }

    warnings
}

fn check_pct(field: &str, value: Percent) -> RoscaResult<()> {
    if value < Decimal::ZERO || value > HUNDRED {
        return Err(RoscaError::InvalidInput {
            field: field.into(),
            reason: format!("Percentage must be between 0 and 100, got {value}."),
        });
    }
    Ok(())
}

fn check_non_negative(field: &str, value: Decimal) -> RoscaResult<()> {
    if value < Decimal::ZERO {
        return Err(RoscaError::InvalidInput {
            field: field.into(),
            reason: "Cannot be negative.".into(),
        });
    }
    Ok(())
}
