use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

use feasibility_core::time_value::{self, IrrSolverConfig};
use feasibility_core::with_metadata;

use crate::input;

/// Arguments for a standalone IRR solve
#[derive(Args)]
pub struct IrrArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Cash flows with the outlay first (comma-separated, e.g. "-100,50,50,50")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,
}

#[derive(Debug, Deserialize)]
struct IrrInput {
    cash_flows: Vec<Decimal>,
    #[serde(default)]
    solver: IrrSolverConfig,
}

#[derive(Debug, Serialize)]
struct IrrOutput {
    irr: Decimal,
    npv_at_irr: Decimal,
    periods: usize,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let irr_input: IrrInput = if let Some(ref path) = args.input {
        input::file::read_config(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        IrrInput {
            cash_flows: args
                .cash_flows
                .ok_or("--cash-flows is required (or provide --input)")?,
            solver: IrrSolverConfig::default(),
        }
    };

    let start = Instant::now();
    let irr = time_value::solve_irr_with(&irr_input.cash_flows, &irr_input.solver)?;
    let npv_at_irr = time_value::npv(irr, &irr_input.cash_flows)?;

    let elapsed = start.elapsed().as_micros() as u64;
    let output = with_metadata(
        "Bracketed IRR (grid scan, Newton with bisection fallback)",
        &irr_input.solver,
        Vec::new(),
        elapsed,
        IrrOutput {
            irr,
            npv_at_irr,
            periods: irr_input.cash_flows.len(),
        },
    );
    Ok(serde_json::to_value(output)?)
}
