use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::aggregate::YearlySummaryRow;
use crate::config::ProfitShareConfig;
use crate::{types::*, RoscaResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitShareRow {
    pub year: u32,
    pub profit: Money,
    pub platform_pct: Percent,
    pub partner_pct: Percent,
    pub platform_share: Money,
    pub partner_share: Money,
}

/// Split each year's profit between the platform and its partner.
///
/// Percentages that do not add up to 100 are normalised; if both are zero
/// neither side receives anything. Losses are shared in the same ratio.
pub fn profit_share(yearly: &[YearlySummaryRow], split: &ProfitShareConfig) -> RoscaResult<Vec<ProfitShareRow>> {
    let platform = split.platform_pct.max(Decimal::ZERO);
    let partner = split.partner_pct.max(Decimal::ZERO);
    let total = add_money(platform, partner)?;

    yearly
        .iter()
        .map(|y| -> RoscaResult<ProfitShareRow> {
            let profit = y.measures.profit;
            let (platform_share, partner_share) = if total.is_zero() {
                (Decimal::ZERO, Decimal::ZERO)
            } else {
                let platform_share = mul_money(profit, platform)? / total;
                (platform_share, profit - platform_share)
            };
            Ok(ProfitShareRow {
                year: y.year,
                profit,
                platform_pct: split.platform_pct,
                partner_pct: split.partner_pct,
                platform_share,
                partner_share,
            })
        })
        .collect()
}
