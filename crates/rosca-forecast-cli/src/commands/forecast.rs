use clap::{Args, ValueEnum};
use serde_json::Value;

use rosca_forecast_core::config::ForecastConfig;
use rosca_forecast_core::simulation::driver;

use super::narrow_result;
use crate::input;

/// Which forecast table to print
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ForecastTable {
    /// Every table plus run totals
    All,
    /// One row per cohort
    Cohorts,
    /// Cash collected per cohort in its joining month
    Deposits,
    /// Pre/post-payout defaulters and losses per cohort
    Defaults,
    /// New vs rejoining members per cohort
    Lifecycle,
    /// Month-level user flow
    Growth,
    /// Run totals only
    Totals,
}

impl ForecastTable {
    fn key(self) -> Option<&'static str> {
        match self {
            ForecastTable::All => None,
            ForecastTable::Cohorts => Some("cohorts"),
            ForecastTable::Deposits => Some("deposit_log"),
            ForecastTable::Defaults => Some("default_log"),
            ForecastTable::Lifecycle => Some("lifecycle_log"),
            ForecastTable::Growth => Some("growth_log"),
            ForecastTable::Totals => Some("totals"),
        }
    }
}

/// Arguments for a forecast run
#[derive(Args)]
pub struct ForecastArgs {
    /// Path to a JSON or YAML forecast configuration
    #[arg(long)]
    pub input: Option<String>,

    /// Table to print
    #[arg(long, value_enum, default_value = "all")]
    pub table: ForecastTable,
}

pub fn run_forecast(args: ForecastArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config: ForecastConfig = input::read_required(args.input.as_deref(), "forecast")?;
    let result = driver::run_forecast(&config)?;
    let value = serde_json::to_value(result)?;
    Ok(match args.table.key() {
        Some(key) => narrow_result(value, key),
        None => value,
    })
}
