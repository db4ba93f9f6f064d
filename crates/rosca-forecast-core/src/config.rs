//! Forecast configuration.
//!
//! One immutable [`ForecastConfig`] drives one simulation run. Nothing in the
//! engine reads ambient or global state; scenario runs clone the config and
//! replace the market section.
//!
//! Percentages are in points (`Percent`, 10 = 10%) because that is how the
//! product team enters them; the engine converts with `pct_to_rate`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::growth::scheduler::GrowthBase;
use crate::interest::nii::NiiMethod;
use crate::types::{pct_to_rate, Money, Percent, Rate, UserCount};

/// Number of months every forecast covers (five years).
pub const FORECAST_HORIZON_MONTHS: u32 = 60;

/// Number of forecast years that carry their own duration mix.
pub const FORECAST_YEARS: u32 = 5;

/// Latest day-of-month accepted for collection and payout dates.
pub const MAX_DAY_OF_MONTH: u32 = 28;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Market sizing and acquisition parameters. This is the part of the
/// configuration that varies between scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Total market size (people).
    pub total_market: UserCount,
    /// Share of the total market that is addressable (TAM).
    pub tam_pct: Percent,
    /// Share of TAM onboarded as new users in the first month.
    pub start_pct: Percent,
    /// Monthly acquisition rate applied to the growth base.
    pub acquisition_rate_pct: Percent,
    /// Growth of the TAM ceiling applied at every year boundary.
    #[serde(default)]
    pub annual_tam_growth_pct: Percent,
    /// Clamp new users so that each calendar year never exceeds its TAM ceiling.
    #[serde(default)]
    pub cap_to_tam: bool,
}

impl MarketConfig {
    /// Total addressable market: floor(total_market × tam%).
    pub fn tam(&self) -> UserCount {
        share_of(self.total_market, self.tam_pct)
    }

    /// New users in month 1: floor(TAM × start%).
    pub fn initial_new_users(&self) -> UserCount {
        share_of(self.tam(), self.start_pct)
    }

    pub fn acquisition_rate(&self) -> Rate {
        pct_to_rate(self.acquisition_rate_pct)
    }
}

/// Calendar anchors. Only relative offsets matter, so the start date fixes a
/// reference calendar rather than a real launch date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Day of month installments are collected (1..=28).
    pub collection_day: u32,
    /// Day of month payouts are made (1..=28).
    pub payout_day: u32,
    /// First day of month index 0.
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()
}

/// Yield and credit-risk parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Base interest rate (e.g. KIBOR) earned on held funds.
    pub base_rate_pct: Percent,
    /// Spread over the base rate.
    pub spread_pct: Percent,
    /// Share of a cohort's users that default over the product lifetime.
    pub default_rate_pct: Percent,
    /// Share of defaulters who default before receiving their payout.
    #[serde(default = "default_pre_payout_share")]
    pub pre_payout_default_share_pct: Percent,
    /// Share of a pre-payout defaulter's commitment that is recovered.
    #[serde(default)]
    pub pre_payout_recovery_pct: Percent,
    /// Months a completed member waits before being eligible to rejoin.
    #[serde(default)]
    pub rest_period_months: u32,
}

fn default_pre_payout_share() -> Percent {
    dec!(50)
}

impl RiskConfig {
    /// Annual rate earned on held funds: base + spread.
    pub fn annual_rate(&self) -> Rate {
        pct_to_rate(self.base_rate_pct + self.spread_pct)
    }
}

/// An installment amount offered for a duration and its share of users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabConfig {
    pub amount: Money,
    pub share_pct: Percent,
}

/// A payout position within a duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotConfig {
    /// Payout order, 1..=duration.
    pub slot: u32,
    /// Fee charged on the total commitment.
    pub fee_pct: Percent,
    /// Blocked slots are never assigned and their share is not apportioned.
    #[serde(default)]
    pub blocked: bool,
    /// Share of users among the unblocked slots.
    pub share_pct: Percent,
}

/// Product structure: durations, installment slabs and payout slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    /// Allowed durations in months, in the order ties are broken.
    pub durations: Vec<u32>,
    /// Year (1..=5) → duration → share of that year's onboarding.
    #[serde(default)]
    pub duration_shares: BTreeMap<u32, BTreeMap<u32, Percent>>,
    /// Duration → installment slabs.
    pub slabs: BTreeMap<u32, Vec<SlabConfig>>,
    /// Duration → payout slots.
    pub slots: BTreeMap<u32, Vec<SlotConfig>>,
}

impl ProductConfig {
    /// Duration mix for a forecast year.
    ///
    /// Falls back to the latest configured year at or before `year`, and
    /// years before the first configured one take that first year's mix.
    /// With no configured year at all the allowed durations share evenly.
    /// Shares for durations outside the allowed set are dropped.
    pub fn duration_shares_for_year(&self, year: u32) -> Vec<(u32, Percent)> {
        let configured = self
            .duration_shares
            .range(..=year)
            .next_back()
            .or_else(|| self.duration_shares.iter().next())
            .map(|(_, m)| m);

        match configured {
            Some(shares) => self
                .durations
                .iter()
                .map(|d| (*d, shares.get(d).copied().unwrap_or(Decimal::ZERO)))
                .collect(),
            None => self.durations.iter().map(|d| (*d, Decimal::ONE)).collect(),
        }
    }

    pub fn slabs_for(&self, duration: u32) -> &[SlabConfig] {
        self.slabs.get(&duration).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn slots_for(&self, duration: u32) -> &[SlotConfig] {
        self.slots.get(&duration).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Unblocked slots of a duration, in configured order.
    pub fn open_slots(&self, duration: u32) -> impl Iterator<Item = &SlotConfig> {
        self.slots_for(duration).iter().filter(|s| !s.blocked)
    }
}

/// Profit split between the platform and its funding partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitShareConfig {
    pub platform_pct: Percent,
    pub partner_pct: Percent,
}

impl Default for ProfitShareConfig {
    fn default() -> Self {
        Self {
            platform_pct: dec!(50),
            partner_pct: dec!(50),
        }
    }
}

/// Modelling choices where the product definition has historically varied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub growth_base: GrowthBase,
    #[serde(default)]
    pub nii_method: NiiMethod,
}

/// Complete configuration for one forecast run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub market: MarketConfig,
    pub calendar: CalendarConfig,
    pub risk: RiskConfig,
    pub product: ProductConfig,
    #[serde(default)]
    pub profit_share: ProfitShareConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// floor(total × pct%), with the percentage held to 0..=100 so the result
/// never exceeds `total`.
fn share_of(total: UserCount, pct: Percent) -> UserCount {
    let rate = pct_to_rate(pct).clamp(Decimal::ZERO, Decimal::ONE);
    (Decimal::from(total) * rate).floor().to_u64().unwrap_or(total)
}

/// Single-product configuration used across unit tests: one 3-month
/// duration, one 1,000 slab, slot 1 at a 2% fee.
#[cfg(test)]
pub(crate) fn sample_config() -> ForecastConfig {
    ForecastConfig {
        market: MarketConfig {
            total_market: 1_000_000,
            tam_pct: dec!(10),
            start_pct: dec!(10),
            acquisition_rate_pct: dec!(10),
            annual_tam_growth_pct: Decimal::ZERO,
            cap_to_tam: false,
        },
        calendar: CalendarConfig {
            collection_day: 1,
            payout_day: 20,
            start_date: default_start_date(),
        },
        risk: RiskConfig {
            base_rate_pct: dec!(11),
            spread_pct: dec!(1),
            default_rate_pct: Decimal::ZERO,
            pre_payout_default_share_pct: dec!(50),
            pre_payout_recovery_pct: Decimal::ZERO,
            rest_period_months: 0,
        },
        product: ProductConfig {
            durations: vec![3],
            duration_shares: BTreeMap::from([(1, BTreeMap::from([(3, dec!(100))]))]),
            slabs: BTreeMap::from([(
                3,
                vec![SlabConfig {
                    amount: dec!(1000),
                    share_pct: dec!(100),
                }],
            )]),
            slots: BTreeMap::from([(
                3,
                vec![SlotConfig {
                    slot: 1,
                    fee_pct: dec!(2),
                    blocked: false,
                    share_pct: dec!(100),
                }],
            )]),
        },
        profit_share: ProfitShareConfig::default(),
        policy: PolicyConfig::default(),
    }
}
