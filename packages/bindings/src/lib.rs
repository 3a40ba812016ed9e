use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use feasibility_core::extraction::{self, WorkbookLayout};
use feasibility_core::scenarios::scenario::{self, ScenarioSetInput};
use feasibility_core::scenarios::sensitivity::{self, SensitivityInput};
use feasibility_core::scenarios::{ScenarioAssumptions, ScenarioParameters};
use feasibility_core::time_value::{self, IrrSolverConfig};
use feasibility_core::{BaseFinancialModel, ProjectEngine};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Build an engine from a serialized base model and optional assumptions.
fn engine(model_json: &str, assumptions_json: Option<String>) -> NapiResult<ProjectEngine> {
    let model: BaseFinancialModel = serde_json::from_str(model_json).map_err(to_napi_error)?;
    let engine = ProjectEngine::new(Arc::new(model)).map_err(to_napi_error)?;
    match assumptions_json {
        Some(json) => {
            let assumptions: ScenarioAssumptions =
                serde_json::from_str(&json).map_err(to_napi_error)?;
            engine.with_assumptions(assumptions).map_err(to_napi_error)
        }
        None => Ok(engine),
    }
}

// ---------------------------------------------------------------------------
// Base model
// ---------------------------------------------------------------------------

#[napi]
pub fn extract_model(path: String, layout_json: Option<String>) -> NapiResult<String> {
    let layout: WorkbookLayout = match layout_json {
        Some(json) => serde_json::from_str(&json).map_err(to_napi_error)?,
        None => WorkbookLayout::default(),
    };
    let output = extraction::extract_file(Path::new(&path), &layout).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[napi]
pub fn run_scenario(
    model_json: String,
    params_json: String,
    assumptions_json: Option<String>,
) -> NapiResult<String> {
    let engine = engine(&model_json, assumptions_json)?;
    let params: ScenarioParameters = serde_json::from_str(&params_json).map_err(to_napi_error)?;
    let output = engine.run_scenario(&params).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn scenario_set(
    model_json: String,
    input_json: String,
    assumptions_json: Option<String>,
) -> NapiResult<String> {
    let engine = engine(&model_json, assumptions_json)?;
    let input: ScenarioSetInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = scenario::analyze_scenarios(&engine, &input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn sensitivity_grid(
    model_json: String,
    input_json: String,
    assumptions_json: Option<String>,
) -> NapiResult<String> {
    let engine = engine(&model_json, assumptions_json)?;
    let input: SensitivityInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = sensitivity::irr_sensitivity(&engine, &input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn tornado(
    model_json: String,
    base_json: Option<String>,
    assumptions_json: Option<String>,
) -> NapiResult<String> {
    let engine = engine(&model_json, assumptions_json)?;
    let base: ScenarioParameters = match base_json {
        Some(json) => serde_json::from_str(&json).map_err(to_napi_error)?,
        None => ScenarioParameters::default(),
    };
    let output = sensitivity::tornado(&engine, &base).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// IRR
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct IrrRequest {
    cash_flows: Vec<Decimal>,
    #[serde(default)]
    solver: IrrSolverConfig,
}

/// Solve `{"cash_flows": [...], "solver": {...}}` and return the rate as a string.
#[napi]
pub fn solve_irr(input_json: String) -> NapiResult<String> {
    let request: IrrRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let irr = time_value::solve_irr_with(&request.cash_flows, &request.solver)
        .map_err(to_napi_error)?;
    Ok(irr.to_string())
}
