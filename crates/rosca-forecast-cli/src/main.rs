mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::forecast::ForecastArgs;
use commands::scenarios::ScenariosArgs;
use commands::summary::SummaryArgs;
use commands::tools::{ApportionArgs, DefaultLossArgs, NiiArgs};
use commands::validate::ValidateArgs;

/// Multi-year ROSCA cohort forecasting
#[derive(Parser)]
#[command(
    name = "rosca",
    version,
    about = "Multi-year ROSCA cohort forecasting",
    long_about = "Simulates monthly cohorts of savings-pool members over a five-year \
                  horizon with exact apportionment across durations, installment slabs \
                  and payout slots, and reports fees, interest, default losses and profit."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a 60-month cohort forecast
    Forecast(ForecastArgs),
    /// Monthly, yearly and profit-share summaries of a forecast
    Summary(SummaryArgs),
    /// Check a forecast configuration without running it
    Validate(ValidateArgs),
    /// Compare forecasts across market scenarios
    Scenarios(ScenariosArgs),
    /// Split a user count across percentage shares
    Apportion(ApportionArgs),
    /// Interest earned on one held installment
    Nii(NiiArgs),
    /// Default loss for one cohort
    DefaultLoss(DefaultLossArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Forecast(args) => commands::forecast::run_forecast(args),
        Commands::Summary(args) => commands::summary::run_summary(args),
        Commands::Validate(args) => commands::validate::run_validate(args),
        Commands::Scenarios(args) => commands::scenarios::run_scenarios(args),
        Commands::Apportion(args) => commands::tools::run_apportion(args),
        Commands::Nii(args) => commands::tools::run_nii(args),
        Commands::DefaultLoss(args) => commands::tools::run_default_loss(args),
        Commands::Version => {
            println!("rosca {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
