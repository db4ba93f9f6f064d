use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use rosca_forecast_core::config::ForecastConfig;
use rosca_forecast_core::RoscaResult;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse JSON input, run one core operation, and return its output as JSON.
fn json_call<I, O>(input_json: &str, op: impl FnOnce(&I) -> RoscaResult<O>) -> NapiResult<String>
where
    I: DeserializeOwned,
    O: Serialize,
{
    let input: I = serde_json::from_str(input_json).map_err(to_napi_error)?;
    let output = op(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Forecast
// ---------------------------------------------------------------------------

#[napi]
pub fn run_forecast(config_json: String) -> NapiResult<String> {
    json_call::<ForecastConfig, _>(&config_json, rosca_forecast_core::simulation::driver::run_forecast)
}

#[napi]
pub fn forecast_summary(config_json: String) -> NapiResult<String> {
    json_call::<ForecastConfig, _>(&config_json, rosca_forecast_core::summary::aggregate::forecast_summary)
}

#[napi]
pub fn validate_config(config_json: String) -> NapiResult<String> {
    json_call::<ForecastConfig, _>(&config_json, rosca_forecast_core::validation::check_config)
}

#[napi]
pub fn run_scenarios(input_json: String) -> NapiResult<String> {
    json_call(&input_json, rosca_forecast_core::scenarios::runner::run_scenarios)
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

#[napi]
pub fn apportion_users(input_json: String) -> NapiResult<String> {
    json_call(&input_json, rosca_forecast_core::allocation::apportion::apportion_users)
}

#[napi]
pub fn installment_nii(input_json: String) -> NapiResult<String> {
    json_call(&input_json, rosca_forecast_core::interest::nii::calculate_installment_nii)
}

#[napi]
pub fn default_loss(input_json: String) -> NapiResult<String> {
    json_call(&input_json, rosca_forecast_core::risk::default_loss::calculate_default_loss)
}
