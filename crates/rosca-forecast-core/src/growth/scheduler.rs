//! Month-to-month user bookkeeping: new-user acquisition, the rejoin
//! schedule, and the optional per-year TAM ceiling.
//!
//! All state here belongs to a single run. The scheduler only looks forward:
//! rejoins are registered for months strictly after the current one and
//! drained when that month begins.

use std::collections::BTreeMap;

use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{MarketConfig, FORECAST_HORIZON_MONTHS};
use crate::{types::*, RoscaResult};

/// Which user count next month's acquisition is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthBase {
    /// Every new user acquired so far. Acquisition compounds on the whole
    /// historical base and is never reset.
    #[default]
    CumulativeNew,
    /// Only the current month's new users.
    LastMonthNew,
    /// The current month's new and rejoining users.
    LastMonthTotal,
}

// ---------------------------------------------------------------------------
// Rejoin schedule
// ---------------------------------------------------------------------------

/// Future month → users becoming eligible to rejoin that month.
#[derive(Debug, Clone, Default)]
pub struct RejoinSchedule {
    pending: BTreeMap<MonthIndex, UserCount>,
    horizon: MonthIndex,
}

impl RejoinSchedule {
    pub fn new(horizon: MonthIndex) -> Self {
        Self {
            pending: BTreeMap::new(),
            horizon,
        }
    }

    /// Register `users` for `month`. Returns false when the month is past the
    /// horizon and nothing was scheduled.
    pub fn schedule(&mut self, month: MonthIndex, users: UserCount) -> RoscaResult<bool> {
        if month >= self.horizon {
            return Ok(false);
        }
        if users > 0 {
            let slot = self.pending.entry(month).or_insert(0);
            *slot = add_users(*slot, users)?;
        }
        Ok(true)
    }

    /// Remove and return everything due in `month`.
    pub fn take(&mut self, month: MonthIndex) -> UserCount {
        self.pending.remove(&month).unwrap_or(0)
    }

    pub fn pending(&self, month: MonthIndex) -> UserCount {
        self.pending.get(&month).copied().unwrap_or(0)
    }

    pub fn total_pending(&self) -> RoscaResult<UserCount> {
        self.pending.values().try_fold(0, |acc, users| add_users(acc, *users))
    }
}

// ---------------------------------------------------------------------------
// TAM cap
// ---------------------------------------------------------------------------

/// Per-calendar-year ceiling on new users.
///
/// Year `y` allows `floor(TAM × (1 + g)^(y − 1))` new users; the used
/// counter resets at every year boundary.
#[derive(Debug, Clone)]
pub struct TamCap {
    year: u32,
    ceiling: UserCount,
    ceiling_exact: Decimal,
    growth_factor: Decimal,
    used: UserCount,
}

impl TamCap {
    pub fn new(tam: UserCount, annual_growth_pct: Percent) -> Self {
        Self {
            year: 1,
            ceiling: tam,
            ceiling_exact: Decimal::from(tam),
            growth_factor: Decimal::ONE + pct_to_rate(annual_growth_pct),
            used: 0,
        }
    }

    pub fn ceiling(&self) -> UserCount {
        self.ceiling
    }

    pub fn used(&self) -> UserCount {
        self.used
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    /// Advance to `year`, growing the ceiling once per boundary crossed.
    pub fn roll_to(&mut self, year: u32) -> RoscaResult<()> {
        while self.year < year {
            self.year += 1;
            self.ceiling_exact = mul_money(self.ceiling_exact, self.growth_factor)?.max(Decimal::ZERO);
            self.ceiling = round_users(self.ceiling_exact.floor())?;
            self.used = 0;
        }
        Ok(())
    }

    /// Admit up to `requested` new users this year; returns how many fit.
    pub fn admit(&mut self, requested: UserCount) -> UserCount {
        let room = self.ceiling().saturating_sub(self.used);
        let admitted = requested.min(room);
        self.used += admitted;
        admitted
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// User counts for one month, fixed when the month begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthIntake {
    pub month_index: MonthIndex,
    pub new_users: UserCount,
    pub rejoining_users: UserCount,
    /// new + rejoining, handed to the cohort generator.
    pub onboarding: UserCount,
    /// New users the TAM cap turned away this month.
    pub capped_users: UserCount,
    pub tam_ceiling: Option<UserCount>,
    pub tam_used: Option<UserCount>,
}

#[derive(Debug, Clone)]
pub struct GrowthScheduler {
    growth_base: GrowthBase,
    acquisition_rate: Rate,
    next_new: UserCount,
    cumulative_new: UserCount,
    rejoins: RejoinSchedule,
    cap: Option<TamCap>,
}

impl GrowthScheduler {
    pub fn new(market: &MarketConfig, growth_base: GrowthBase) -> Self {
        Self {
            growth_base,
            acquisition_rate: market.acquisition_rate(),
            next_new: market.initial_new_users(),
            cumulative_new: 0,
            rejoins: RejoinSchedule::new(FORECAST_HORIZON_MONTHS),
            cap: market
                .cap_to_tam
                .then(|| TamCap::new(market.tam(), market.annual_tam_growth_pct)),
        }
    }

    /// Fix this month's new and rejoining counts.
    pub fn begin_month(&mut self, month: MonthIndex) -> RoscaResult<MonthIntake> {
        let requested = self.next_new;
        let mut new_users = requested;

        if let Some(cap) = self.cap.as_mut() {
            cap.roll_to(year_of(month))?;
            new_users = cap.admit(requested);
            if new_users < requested {
                warn!(
                    "month {}: TAM ceiling {} reached, {} new users turned away",
                    month + 1,
                    cap.ceiling(),
                    requested - new_users
                );
            }
        }

        self.cumulative_new = add_users(self.cumulative_new, new_users)?;
        let rejoining_users = self.rejoins.take(month);

        debug!(
            "month {}: new={} rejoining={} cumulative_new={}",
            month + 1,
            new_users,
            rejoining_users,
            self.cumulative_new
        );

        Ok(MonthIntake {
            month_index: month,
            new_users,
            rejoining_users,
            onboarding: add_users(new_users, rejoining_users)?,
            capped_users: requested - new_users,
            tam_ceiling: self.cap.as_ref().map(TamCap::ceiling),
            tam_used: self.cap.as_ref().map(TamCap::used),
        })
    }

    /// Register survivors of a cohort to rejoin in `month`.
    pub fn schedule_rejoin(&mut self, month: MonthIndex, users: UserCount) -> RoscaResult<bool> {
        self.rejoins.schedule(month, users)
    }

    /// Compute next month's requested new users from this month's intake.
    ///
    /// Fails when compounding acquisition produces more users than a
    /// [`UserCount`] can hold.
    pub fn end_month(&mut self, intake: &MonthIntake) -> RoscaResult<()> {
        let base = match self.growth_base {
            GrowthBase::CumulativeNew => self.cumulative_new,
            GrowthBase::LastMonthNew => intake.new_users,
            GrowthBase::LastMonthTotal => intake.onboarding,
        };
        self.next_new = round_users(mul_money(Decimal::from(base), self.acquisition_rate)?)?;
        Ok(())
    }

    pub fn cumulative_new(&self) -> UserCount {
        self.cumulative_new
    }

    pub fn rejoins(&self) -> &RejoinSchedule {
        &self.rejoins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoscaError;
    use rust_decimal_macros::dec;

    fn market() -> MarketConfig {
        MarketConfig {
            total_market: 1_000_000,
            tam_pct: dec!(10),
            start_pct: dec!(10),
            acquisition_rate_pct: dec!(10),
            annual_tam_growth_pct: Decimal::ZERO,
            cap_to_tam: false,
        }
    }

    fn run_months(scheduler: &mut GrowthScheduler, months: u32) -> Vec<MonthIntake> {
        (0..months)
            .map(|m| {
                let intake = scheduler.begin_month(m).unwrap();
                scheduler.end_month(&intake).unwrap();
                intake
            })
            .collect()
    }

    #[test]
    fn test_cumulative_growth_base() {
        let mut s = GrowthScheduler::new(&market(), GrowthBase::CumulativeNew);
        let intakes = run_months(&mut s, 3);
        assert_eq!(intakes[0].new_users, 10_000);
        assert_eq!(intakes[1].new_users, 1_000);
        // 11,000 × 0.1
        assert_eq!(intakes[2].new_users, 1_100);
        assert_eq!(s.cumulative_new(), 12_100);
    }

    #[test]
    fn test_last_month_new_growth_base() {
        let mut s = GrowthScheduler::new(&market(), GrowthBase::LastMonthNew);
        let intakes = run_months(&mut s, 3);
        assert_eq!(intakes[1].new_users, 1_000);
        assert_eq!(intakes[2].new_users, 100);
    }

    #[test]
    fn test_last_month_total_includes_rejoins() {
        let mut s = GrowthScheduler::new(&market(), GrowthBase::LastMonthTotal);
        s.schedule_rejoin(1, 4_000).unwrap();
        let intakes = run_months(&mut s, 3);
        assert_eq!(intakes[1].rejoining_users, 4_000);
        assert_eq!(intakes[1].onboarding, 5_000);
        assert_eq!(intakes[2].new_users, 500);
    }

    #[test]
    fn test_rejoin_schedule_drains_once() {
        let mut r = RejoinSchedule::new(60);
        assert!(r.schedule(5, 10).unwrap());
        assert!(r.schedule(5, 7).unwrap());
        assert!(!r.schedule(60, 99).unwrap());
        assert_eq!(r.pending(4), 0);
        assert_eq!(r.take(5), 17);
        assert_eq!(r.take(5), 0);
        assert_eq!(r.total_pending().unwrap(), 0);
    }

    #[test]
    fn test_tam_cap_clamps_and_resets_yearly() {
        let mut m = market();
        m.cap_to_tam = true;
        m.total_market = 100_000; // TAM 10,000; month 1 = 1,000
        m.acquisition_rate_pct = dec!(100);
        m.annual_tam_growth_pct = dec!(10);
        let mut s = GrowthScheduler::new(&m, GrowthBase::CumulativeNew);
        let intakes = run_months(&mut s, 14);

        let year_one: u64 = intakes[..12].iter().map(|i| i.new_users).sum();
        assert_eq!(year_one, 10_000);
        assert!(intakes[..12].iter().all(|i| i.tam_ceiling == Some(10_000)));
        assert!(intakes[..12].iter().any(|i| i.capped_users > 0));

        // Year 2 ceiling grows 10% and the used counter starts over.
        assert_eq!(intakes[12].tam_ceiling, Some(11_000));
        assert_eq!(intakes[12].new_users, 10_000);
        assert_eq!(intakes[12].tam_used, Some(intakes[12].new_users));
    }

    #[test]
    fn test_tam_cap_clamps_first_month() {
        let mut m = market();
        m.cap_to_tam = true;
        m.start_pct = dec!(100);
        m.tam_pct = dec!(10);
        let mut s = GrowthScheduler::new(&m, GrowthBase::CumulativeNew);
        let first = s.begin_month(0).unwrap();
        assert_eq!(first.new_users, 100_000);
        s.end_month(&first).unwrap();
        let second = s.begin_month(1).unwrap();
        assert_eq!(second.new_users, 0);
        assert_eq!(second.capped_users, 10_000);
    }

    #[test]
    fn test_runaway_acquisition_is_an_error() {
        let mut m = market();
        m.acquisition_rate_pct = dec!(100);
        let mut s = GrowthScheduler::new(&m, GrowthBase::CumulativeNew);
        let failed = (0..60u32).find_map(|month| {
            let step = s.begin_month(month).and_then(|intake| s.end_month(&intake));
            step.err().map(|e| (month, e))
        });
        let (month, err) = failed.unwrap();
        assert!(month > 40);
        assert!(matches!(err, RoscaError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_rejoin_overflow_is_an_error() {
        let mut r = RejoinSchedule::new(60);
        r.schedule(3, u64::MAX).unwrap();
        assert!(r.schedule(3, 1).is_err());
    }

    #[test]
    fn test_tam_cap_ceiling_compounds() {
        let mut cap = TamCap::new(1_000, dec!(10));
        cap.roll_to(3).unwrap();
        assert_eq!(cap.ceiling(), 1_210);
        assert_eq!(cap.year(), 3);
    }
}
