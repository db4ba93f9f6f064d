use clap::Args;
use serde_json::Value;

use rosca_forecast_core::config::ForecastConfig;
use rosca_forecast_core::validation;

use crate::input;

/// Arguments for configuration validation
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to a JSON or YAML forecast configuration
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_validate(args: ValidateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config: ForecastConfig = input::read_required(args.input.as_deref(), "validate")?;
    let result = validation::check_config(&config)?;
    Ok(serde_json::to_value(result)?)
}
