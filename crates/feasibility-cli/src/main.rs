mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::extract::ExtractArgs;
use commands::irr::IrrArgs;
use commands::scenario::{ScenarioArgs, ScenarioSetArgs};
use commands::sensitivity::{SensitivityArgs, TornadoArgs};

/// Project feasibility what-if analysis
#[derive(Parser)]
#[command(
    name = "fsim",
    version,
    about = "Project feasibility scenarios and IRR what-if analysis",
    long_about = "Loads the base case of a project feasibility workbook (commercial \
                  summary, cash-flow summary, investment assumptions) and re-computes \
                  cash flows and IRR under price, cost, volume and investment shocks \
                  with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level for diagnostics on stderr (overridden by RUST_LOG)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the base financial model from a workbook
    Extract(ExtractArgs),
    /// Run one scenario and solve its IRR
    Scenario(ScenarioArgs),
    /// Probability-weighted IRR over a set of named scenarios
    Scenarios(ScenarioSetArgs),
    /// Two-way IRR sensitivity grid over scenario drivers
    Sensitivity(SensitivityArgs),
    /// IRR at the low and high bound of each driver
    Tornado(TornadoArgs),
    /// Solve the IRR of an arbitrary cash-flow series
    Irr(IrrArgs),
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
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Extract(args) => commands::extract::run_extract(args),
        Commands::Scenario(args) => commands::scenario::run_scenario(args),
        Commands::Scenarios(args) => commands::scenario::run_scenario_set(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Tornado(args) => commands::sensitivity::run_tornado(args),
        Commands::Irr(args) => commands::irr::run_irr(args),
        Commands::Version => {
            println!("fsim {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
