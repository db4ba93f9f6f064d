use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use rosca_forecast_core::allocation::apportion::{self, ApportionInput, ShareEntry};
use rosca_forecast_core::interest::nii::{self, NiiInput};
use rosca_forecast_core::risk::default_loss::{self, DefaultLossInput};

use crate::input;

/// Arguments for splitting a user count across percentage shares
#[derive(Args)]
pub struct ApportionArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Users to split
    #[arg(long)]
    pub total: Option<u64>,

    /// Shares as key=pct pairs (comma-separated, e.g. "3m=60,6m=40")
    #[arg(long, value_delimiter = ',')]
    pub shares: Option<Vec<String>>,
}

pub fn run_apportion(args: ApportionArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let apportion_input: ApportionInput = if let Some(ref path) = args.input {
        input::file::read_config(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let total = args.total.ok_or("--total is required (or provide --input)")?;
        let raw = args.shares.ok_or("--shares is required (or provide --input)")?;
        let shares = raw
            .iter()
            .map(|pair| parse_share(pair))
            .collect::<Result<Vec<_>, _>>()?;
        ApportionInput { total, shares }
    };

    let result = apportion::apportion_users(&apportion_input)?;
    Ok(serde_json::to_value(result)?)
}

fn parse_share(pair: &str) -> Result<ShareEntry, Box<dyn std::error::Error>> {
    let (key, pct) = pair
        .split_once('=')
        .ok_or_else(|| format!("Share must be key=pct, got '{pair}'"))?;
    let share_pct: Decimal = pct
        .trim()
        .parse()
        .map_err(|e| format!("Invalid share percentage '{pct}': {e}"))?;
    Ok(ShareEntry {
        key: key.trim().to_string(),
        share_pct,
    })
}

/// Arguments for interest on a single held installment
#[derive(Args)]
pub struct NiiArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Installment amount
    #[arg(long)]
    pub installment: Option<Decimal>,

    /// Annual rate in percent (base + spread)
    #[arg(long)]
    pub annual_rate_pct: Option<Decimal>,

    /// Zero-based month the installment is collected
    #[arg(long, default_value_t = 0)]
    pub collection_month: u32,

    /// Day of month the installment is collected
    #[arg(long, default_value_t = 1)]
    pub collection_day: u32,

    /// Zero-based month of the payout
    #[arg(long, default_value_t = 0)]
    pub payout_month: u32,

    /// Day of month of the payout
    #[arg(long)]
    pub payout_day: Option<u32>,
}

pub fn run_nii(args: NiiArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let nii_input: NiiInput = if let Some(ref path) = args.input {
        input::file::read_config(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        NiiInput {
            installment: args
                .installment
                .ok_or("--installment is required (or provide --input)")?,
            annual_rate_pct: args
                .annual_rate_pct
                .ok_or("--annual-rate-pct is required (or provide --input)")?,
            collection_month: args.collection_month,
            collection_day: args.collection_day,
            payout_month: args.payout_month,
            payout_day: args
                .payout_day
                .ok_or("--payout-day is required (or provide --input)")?,
            start_date: None,
        }
    };

    let result = nii::calculate_installment_nii(&nii_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for a cohort's default loss
#[derive(Args)]
pub struct DefaultLossArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Users in the cohort
    #[arg(long)]
    pub users: Option<u64>,

    /// Total commitment per user (installment × duration)
    #[arg(long)]
    pub commitment: Option<Decimal>,

    /// Share of users who default, in percent
    #[arg(long)]
    pub default_rate_pct: Option<Decimal>,

    /// Share of defaulters who default before payout, in percent
    #[arg(long, default_value = "50")]
    pub pre_payout_share_pct: Decimal,

    /// Share of a pre-payout defaulter's commitment recovered, in percent
    #[arg(long, default_value = "0")]
    pub recovery_pct: Decimal,
}

pub fn run_default_loss(args: DefaultLossArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loss_input: DefaultLossInput = if let Some(ref path) = args.input {
        input::file::read_config(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        DefaultLossInput {
            users: args.users.ok_or("--users is required (or provide --input)")?,
            commitment: args
                .commitment
                .ok_or("--commitment is required (or provide --input)")?,
            default_rate_pct: args
                .default_rate_pct
                .ok_or("--default-rate-pct is required (or provide --input)")?,
            pre_payout_share_pct: args.pre_payout_share_pct,
            recovery_pct: args.recovery_pct,
        }
    };

    let result = default_loss::calculate_default_loss(&loss_input)?;
    Ok(serde_json::to_value(result)?)
}
