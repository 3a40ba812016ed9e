use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::simulator::ScenarioParameters;
use crate::engine::ProjectEngine;
use crate::error::FeasibilityError;
use crate::types::*;
use crate::FeasibilityResult;

/// A named set of deltas with its probability weight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedScenario {
    pub name: String,
    pub probability: Rate,
    #[serde(default)]
    pub parameters: ScenarioParameters,
}

/// Input for weighted scenario analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSetInput {
    pub scenarios: Vec<NamedScenario>,
}

/// Result for a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub probability: Rate,
    pub irr: Rate,
    /// IRR minus the zero-delta IRR, in rate units
    pub deviation_from_base: Rate,
    pub sim_investment: Money,
    pub total_cash_flow: Money,
}

/// Output of weighted scenario analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSetOutput {
    pub base_irr: Rate,
    pub results: Vec<ScenarioResult>,
    pub probability_weighted_irr: Rate,
}

/// Run a bear/base/bull style scenario set and weight the resulting IRRs.
///
/// Probabilities must sum to 1.0 (within 0.001). Any scenario whose IRR
/// cannot be solved aborts the analysis, since the weighted figure would
/// be meaningless without it.
pub fn analyze_scenarios(
    engine: &ProjectEngine,
    input: &ScenarioSetInput,
) -> FeasibilityResult<ComputationOutput<ScenarioSetOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.scenarios.is_empty() {
        return Err(FeasibilityError::InsufficientData(
            "At least one scenario required".into(),
        ));
    }

    for s in &input.scenarios {
        if s.probability < Decimal::ZERO || s.probability > Decimal::ONE {
            return Err(FeasibilityError::InvalidInput {
                field: format!("scenario:{} probability", s.name),
                reason: "Probability must be between 0 and 1".into(),
            });
        }
    }

    let prob_tolerance = dec!(0.001);
    let prob_sum: Decimal = input.scenarios.iter().map(|s| s.probability).sum();
    if (prob_sum - Decimal::ONE).abs() > prob_tolerance {
        return Err(FeasibilityError::InvalidInput {
            field: "probabilities".into(),
            reason: format!("Probabilities must sum to 1.0 (got {prob_sum})"),
        });
    }
    if prob_sum != Decimal::ONE {
        warnings.push(format!(
            "Probabilities sum to {prob_sum}; treated as approximately 1.0"
        ));
    }

    let base_irr = engine.run_scenario(&ScenarioParameters::default())?.sim_irr;

    let mut results = Vec::with_capacity(input.scenarios.len());
    let mut probability_weighted_irr = Decimal::ZERO;

    for scenario in &input.scenarios {
        let run = engine.run_scenario(&scenario.parameters)?;
        probability_weighted_irr += scenario.probability * run.sim_irr;

        results.push(ScenarioResult {
            name: scenario.name.clone(),
            probability: scenario.probability,
            irr: run.sim_irr,
            deviation_from_base: run.sim_irr - base_irr,
            sim_investment: run.sim_investment,
            total_cash_flow: run.sim_cash_flow.iter().sum(),
        });
    }

    let output = ScenarioSetOutput {
        base_irr,
        results,
        probability_weighted_irr,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Probability-weighted scenario IRR",
        &serde_json::json!({
            "num_scenarios": input.scenarios.len(),
            "project": engine.base_model().project_name,
        }),
        warnings,
        elapsed,
        output,
    ))
}
