use clap::{Args, ValueEnum};
use serde_json::Value;

use rosca_forecast_core::config::ForecastConfig;
use rosca_forecast_core::summary::aggregate;

use super::narrow_result;
use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SummaryView {
    All,
    Monthly,
    Yearly,
    ProfitShare,
    Totals,
}

/// Arguments for forecast summaries
#[derive(Args)]
pub struct SummaryArgs {
    /// Path to a JSON or YAML forecast configuration
    #[arg(long)]
    pub input: Option<String>,

    /// Summary view to print
    #[arg(long, value_enum, default_value = "all")]
    pub view: SummaryView,
}

pub fn run_summary(args: SummaryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config: ForecastConfig = input::read_required(args.input.as_deref(), "summary")?;
    let result = aggregate::forecast_summary(&config)?;
    let value = serde_json::to_value(result)?;

    let key = match args.view {
        SummaryView::All => return Ok(value),
        SummaryView::Monthly => "monthly",
        SummaryView::Yearly => "yearly",
        SummaryView::ProfitShare => "profit_share",
        SummaryView::Totals => "totals",
    };
    Ok(narrow_result(value, key))
}
