use clap::Args;
use serde_json::Value;

use feasibility_core::scenarios::sensitivity::{
    self, ScenarioDriver, SensitivityInput, SensitivityVariable,
};
use feasibility_core::scenarios::ScenarioParameters;

use super::ProjectArgs;
use crate::input;

/// Arguments for the IRR sensitivity grid
#[derive(Args)]
pub struct SensitivityArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// First driver to sweep, as driver:min:max:step
    /// (e.g. "price:-20:20:5"; drivers are price, cost, volume, investment)
    #[arg(long, allow_hyphen_values = true)]
    pub var1: String,

    /// Second driver (optional; without it the grid has a single column)
    #[arg(long, allow_hyphen_values = true)]
    pub var2: Option<String>,

    /// Deltas held fixed for drivers not being swept (JSON or YAML)
    #[arg(long)]
    pub base: Option<String>,
}

/// Pin a driver other than `swept` at its base value so a one-way sweep
/// fits the two-way grid.
fn fixed_companion(swept: ScenarioDriver, base: &ScenarioParameters) -> SensitivityVariable {
    let driver = ScenarioDriver::ALL
        .into_iter()
        .find(|d| *d != swept)
        .unwrap_or(ScenarioDriver::Volume);
    let value = driver.get(base);
    SensitivityVariable {
        driver,
        min: value,
        max: value,
        step: rust_decimal::Decimal::ONE,
    }
}

fn read_base(path: &Option<String>) -> Result<ScenarioParameters, Box<dyn std::error::Error>> {
    match path {
        Some(p) => input::file::read_config(p),
        None => Ok(ScenarioParameters::default()),
    }
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let base = read_base(&args.base)?;
    let variable_1: SensitivityVariable = args.var1.parse()?;
    let variable_2 = match args.var2 {
        Some(ref spec) => spec.parse()?,
        None => fixed_companion(variable_1.driver, &base),
    };

    let engine = args.project.engine()?;
    let input = SensitivityInput {
        base,
        variable_1,
        variable_2,
    };
    let result = sensitivity::irr_sensitivity(&engine, &input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the one-way tornado sweep
#[derive(Args)]
pub struct TornadoArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Deltas every bar starts from (JSON or YAML)
    #[arg(long)]
    pub base: Option<String>,
}

pub fn run_tornado(args: TornadoArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let base = read_base(&args.base)?;
    let engine = args.project.engine()?;
    let result = sensitivity::tornado(&engine, &base)?;
    Ok(serde_json::to_value(result)?)
}
