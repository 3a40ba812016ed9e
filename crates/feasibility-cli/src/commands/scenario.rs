use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Instant;

use feasibility_core::scenarios::scenario::{self, ScenarioSetInput};
use feasibility_core::scenarios::ScenarioParameters;
use feasibility_core::with_metadata;

use super::ProjectArgs;
use crate::input;

/// Arguments for a single what-if run
#[derive(Args)]
pub struct ScenarioArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Path to a JSON/YAML file with the four deltas (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Selling price change in percent (e.g. 5 for +5%)
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub price: Decimal,

    /// Production cost change in percent
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub cost: Decimal,

    /// Sales volume change in percent
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub volume: Decimal,

    /// Initial investment change in percent
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub investment: Decimal,
}

pub fn run_scenario(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params: ScenarioParameters = if let Some(ref path) = args.input {
        input::file::read_config(path)?
    } else if let Some(params) = input::stdin::read_stdin()? {
        params
    } else {
        ScenarioParameters {
            price_delta: args.price,
            cost_delta: args.cost,
            volume_delta: args.volume,
            investment_delta: args.investment,
        }
    };

    let engine = args.project.engine()?;
    let start = Instant::now();
    let run = engine.run_scenario(&params)?;
    tracing::info!(sim_irr = %run.sim_irr, irr_change = %run.irr_change, "scenario solved");

    let elapsed = start.elapsed().as_micros() as u64;
    let output = with_metadata(
        "Additive four-driver cash-flow shock with bracketed IRR",
        &serde_json::json!({
            "project": engine.base_model().project_name,
            "base_irr": engine.base_model().base_irr,
            "assumptions": engine.assumptions(),
        }),
        Vec::new(),
        elapsed,
        run,
    );
    Ok(serde_json::to_value(output)?)
}

/// Arguments for a probability-weighted scenario set
#[derive(Args)]
pub struct ScenarioSetArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Path to a JSON/YAML file with named scenarios and probabilities
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_scenario_set(args: ScenarioSetArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let set: ScenarioSetInput = if let Some(ref path) = args.input {
        input::file::read_config(path)?
    } else if let Some(set) = input::stdin::read_stdin()? {
        set
    } else {
        return Err("--input <scenarios.json> or stdin required for a scenario set".into());
    };

    let engine = args.project.engine()?;
    let result = scenario::analyze_scenarios(&engine, &set)?;
    Ok(serde_json::to_value(result)?)
}
