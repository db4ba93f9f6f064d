//! Cohort simulation and apportionment engine for multi-year ROSCA
//! (rotating savings and credit association) forecasts.
//!
//! One [`config::ForecastConfig`] drives one deterministic 60-month run:
//! monthly onboarding is split across duration, installment slab and payout
//! slot with exact largest-remainder apportionment, and every resulting
//! cohort is priced for fees, interest on held funds and default losses.

pub mod error;
pub mod types;

pub mod allocation;
pub mod cohort;
pub mod config;
pub mod growth;
pub mod interest;
pub mod risk;
pub mod simulation;
pub mod validation;

#[cfg(feature = "summary")]
pub mod summary;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use error::RoscaError;
pub use types::*;

/// Standard result type for all forecast operations
pub type RoscaResult<T> = Result<T, RoscaError>;
