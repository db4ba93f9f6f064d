use clap::Args;
use serde_json::Value;

use rosca_forecast_core::scenarios::runner::{self, ScenarioSetInput};

use super::narrow_result;
use crate::input;

/// Arguments for a multi-scenario comparison
#[derive(Args)]
pub struct ScenariosArgs {
    /// Path to a JSON or YAML file with `base` config and `scenarios`
    #[arg(long)]
    pub input: Option<String>,

    /// Print only the comparison rows
    #[arg(long)]
    pub compare_only: bool,
}

pub fn run_scenarios(args: ScenariosArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let set: ScenarioSetInput = input::read_required(args.input.as_deref(), "scenarios")?;
    let result = runner::run_scenarios(&set)?;
    let value = serde_json::to_value(result)?;

    if args.compare_only {
        return Ok(narrow_result(value, "comparisons"));
    }
    Ok(value)
}
