use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;

use super::simulator::{DeltaBounds, ScenarioAssumptions, ScenarioParameters};
use crate::engine::ProjectEngine;
use crate::error::FeasibilityError;
use crate::types::*;
use crate::FeasibilityResult;

/// One of the four scenario drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioDriver {
    Price,
    Cost,
    Volume,
    Investment,
}

impl ScenarioDriver {
    pub const ALL: [ScenarioDriver; 4] = [
        ScenarioDriver::Price,
        ScenarioDriver::Cost,
        ScenarioDriver::Volume,
        ScenarioDriver::Investment,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioDriver::Price => "price",
            ScenarioDriver::Cost => "cost",
            ScenarioDriver::Volume => "volume",
            ScenarioDriver::Investment => "investment",
        }
    }

    pub fn get(&self, params: &ScenarioParameters) -> Percent {
        match self {
            ScenarioDriver::Price => params.price_delta,
            ScenarioDriver::Cost => params.cost_delta,
            ScenarioDriver::Volume => params.volume_delta,
            ScenarioDriver::Investment => params.investment_delta,
        }
    }

    /// Copy of `params` with this driver set to `value`.
    pub fn with(&self, params: &ScenarioParameters, value: Percent) -> ScenarioParameters {
        let mut out = *params;
        match self {
            ScenarioDriver::Price => out.price_delta = value,
            ScenarioDriver::Cost => out.cost_delta = value,
            ScenarioDriver::Volume => out.volume_delta = value,
            ScenarioDriver::Investment => out.investment_delta = value,
        }
        out
    }

    pub fn bounds<'a>(&self, assumptions: &'a ScenarioAssumptions) -> &'a DeltaBounds {
        match self {
            ScenarioDriver::Price => &assumptions.price_bounds,
            ScenarioDriver::Cost => &assumptions.cost_bounds,
            ScenarioDriver::Volume => &assumptions.volume_bounds,
            ScenarioDriver::Investment => &assumptions.investment_bounds,
        }
    }
}

impl FromStr for ScenarioDriver {
    type Err = FeasibilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "price" => Ok(ScenarioDriver::Price),
            "cost" => Ok(ScenarioDriver::Cost),
            "volume" => Ok(ScenarioDriver::Volume),
            "investment" | "capex" => Ok(ScenarioDriver::Investment),
            other => Err(FeasibilityError::InvalidInput {
                field: "driver".into(),
                reason: format!(
                    "Unknown driver '{other}'. Available drivers: price, cost, volume, investment"
                ),
            }),
        }
    }
}

/// A driver swept from min to max with step (all in percent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityVariable {
    pub driver: ScenarioDriver,
    pub min: Percent,
    pub max: Percent,
    pub step: Percent,
}

impl FromStr for SensitivityVariable {
    type Err = FeasibilityError;

    /// Parse `driver:min:max:step`, e.g. `price:-20:20:5`.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = spec.split(':').collect();
        if parts.len() != 4 {
            return Err(FeasibilityError::InvalidInput {
                field: "variable".into(),
                reason: format!("Sensitivity variable must be driver:min:max:step, got '{spec}'"),
            });
        }
        let number = |s: &str| {
            Decimal::from_str(s.trim()).map_err(|e| FeasibilityError::InvalidInput {
                field: format!("variable:{}", parts[0]),
                reason: format!("'{s}' is not a number ({e})"),
            })
        };
        Ok(SensitivityVariable {
            driver: parts[0].parse()?,
            min: number(parts[1])?,
            max: number(parts[2])?,
            step: number(parts[3])?,
        })
    }
}

/// Input for 2-way IRR sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    /// Deltas held fixed for the drivers not being swept
    #[serde(default)]
    pub base: ScenarioParameters,
    /// First driver to sweep (matrix rows)
    pub variable_1: SensitivityVariable,
    /// Second driver to sweep (matrix columns)
    pub variable_2: SensitivityVariable,
}

/// Output of 2-way IRR sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub variable_1_name: String,
    pub variable_2_name: String,
    pub variable_1_values: Vec<Percent>,
    pub variable_2_values: Vec<Percent>,
    /// Matrix[i][j] = IRR when variable_1 = variable_1_values[i], variable_2 = variable_2_values[j];
    /// `None` where the IRR could not be solved
    pub matrix: Vec<Vec<Option<Rate>>>,
    /// IRR at the cell closest to the base parameters
    pub base_case_value: Option<Rate>,
    /// Position of the base case in the matrix (row, col)
    pub base_case_position: (usize, usize),
}

/// Most points a single sweep axis may produce.
pub const MAX_SWEEP_POINTS: usize = 1000;

/// Generate the sweep values for a sensitivity variable from min to max with step.
fn generate_sweep_values(var: &SensitivityVariable) -> FeasibilityResult<Vec<Percent>> {
    if var.step <= Decimal::ZERO {
        return Err(FeasibilityError::InvalidInput {
            field: format!("variable:{}", var.driver.name()),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(FeasibilityError::InvalidInput {
            field: format!("variable:{}", var.driver.name()),
            reason: "Min must be <= max".into(),
        });
    }
    let points = (var.max - var.min)
        .checked_div(var.step)
        .map(|n| n.ceil() + Decimal::ONE);
    if !points.is_some_and(|n| n <= Decimal::from(MAX_SWEEP_POINTS)) {
        return Err(FeasibilityError::InvalidInput {
            field: format!("variable:{}", var.driver.name()),
            reason: format!("Sweep would exceed {MAX_SWEEP_POINTS} points; use a larger step"),
        });
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current += var.step;
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    Ok(values)
}

/// Find the closest index to a target value in a sorted list.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Evaluate a 2-way sensitivity grid using a provided scenario function.
///
/// `eval_fn` receives the full parameter set for each cell. Cells that fail
/// become `None` plus a warning; the grid itself only fails on bad ranges.
pub fn evaluate_sensitivity<F>(
    input: &SensitivityInput,
    eval_fn: F,
) -> FeasibilityResult<ComputationOutput<SensitivityOutput>>
where
    F: Fn(&ScenarioParameters) -> FeasibilityResult<Rate>,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.variable_1.driver == input.variable_2.driver {
        return Err(FeasibilityError::InvalidInput {
            field: "variable_2".into(),
            reason: "The two sensitivity variables must sweep different drivers".into(),
        });
    }

    let v1_values = generate_sweep_values(&input.variable_1)?;
    let v2_values = generate_sweep_values(&input.variable_2)?;
    let (d1, d2) = (input.variable_1.driver, input.variable_2.driver);

    let mut matrix = Vec::with_capacity(v1_values.len());

    for v1 in &v1_values {
        let mut row = Vec::with_capacity(v2_values.len());
        for v2 in &v2_values {
            let params = d2.with(&d1.with(&input.base, *v1), *v2);
            match eval_fn(&params) {
                Ok(val) => row.push(Some(val)),
                Err(e) => {
                    warnings.push(format!(
                        "Evaluation failed at ({}={v1}%, {}={v2}%): {e}",
                        d1.name(),
                        d2.name()
                    ));
                    row.push(None);
                }
            }
        }
        matrix.push(row);
    }

    let base_row = closest_index(&v1_values, d1.get(&input.base));
    let base_col = closest_index(&v2_values, d2.get(&input.base));
    let base_case_value = matrix[base_row][base_col];

    let output = SensitivityOutput {
        variable_1_name: d1.name().to_string(),
        variable_2_name: d2.name().to_string(),
        variable_1_values: v1_values,
        variable_2_values: v2_values,
        matrix,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way IRR Sensitivity Analysis",
        &serde_json::json!({
            "variable_1": d1.name(),
            "variable_2": d2.name(),
            "base": input.base,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// 2-way IRR grid over an engine's base model.
pub fn irr_sensitivity(
    engine: &ProjectEngine,
    input: &SensitivityInput,
) -> FeasibilityResult<ComputationOutput<SensitivityOutput>> {
    evaluate_sensitivity(input, |params| {
        engine.run_scenario(params).map(|s| s.sim_irr)
    })
}

/// IRR at the low and high bound of one driver, others held at base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TornadoBar {
    pub driver: ScenarioDriver,
    pub low_delta: Percent,
    pub high_delta: Percent,
    pub irr_at_low: Option<Rate>,
    pub irr_at_high: Option<Rate>,
    /// `|irr_at_high - irr_at_low|` when both solved
    pub swing: Option<Rate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TornadoOutput {
    pub base_irr: Option<Rate>,
    /// Bars ordered by swing, largest first
    pub bars: Vec<TornadoBar>,
}

/// One-way sweep of every driver to its configured bounds.
pub fn tornado(
    engine: &ProjectEngine,
    base: &ScenarioParameters,
) -> FeasibilityResult<ComputationOutput<TornadoOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mut solve = |params: ScenarioParameters, label: String| match engine.run_scenario(&params) {
        Ok(s) => Some(s.sim_irr),
        Err(e) => {
            warnings.push(format!("{label}: {e}"));
            None
        }
    };

    let base_irr = solve(*base, "base".into());

    let mut bars: Vec<TornadoBar> = ScenarioDriver::ALL
        .iter()
        .map(|driver| {
            let bounds = driver.bounds(engine.assumptions());
            let irr_at_low = solve(
                driver.with(base, bounds.min),
                format!("{}={}%", driver.name(), bounds.min),
            );
            let irr_at_high = solve(
                driver.with(base, bounds.max),
                format!("{}={}%", driver.name(), bounds.max),
            );
            TornadoBar {
                driver: *driver,
                low_delta: bounds.min,
                high_delta: bounds.max,
                irr_at_low,
                irr_at_high,
                swing: irr_at_low.zip(irr_at_high).map(|(lo, hi)| (hi - lo).abs()),
            }
        })
        .collect();

    bars.sort_by(|a, b| b.swing.unwrap_or_default().cmp(&a.swing.unwrap_or_default()));

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "One-way IRR sensitivity (tornado) at configured driver bounds",
        &serde_json::json!({ "base": base, "assumptions": engine.assumptions() }),
        warnings,
        elapsed,
        TornadoOutput { base_irr, bars },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_input() -> SensitivityInput {
        SensitivityInput {
            base: ScenarioParameters::default(),
            variable_1: "price:-10:10:5".parse().unwrap(),
            variable_2: "volume:-20:20:10".parse().unwrap(),
        }
    }

    #[test]
    fn test_parse_variable() {
        let var: SensitivityVariable = "capex:-20:20:10".parse().unwrap();
        assert_eq!(var.driver, ScenarioDriver::Investment);
        assert_eq!(var.min, dec!(-20));
        assert_eq!(var.step, dec!(10));
        assert!("price:-20:20".parse::<SensitivityVariable>().is_err());
        assert!("margin:0:1:1".parse::<SensitivityVariable>().is_err());
    }

    #[test]
    fn test_oversized_sweep_rejected() {
        let mut input = sample_input();
        input.variable_1 = "price:-20:20:0.0001".parse().unwrap();
        let calls = std::cell::Cell::new(0);
        let err = evaluate_sensitivity(&input, |_| {
            calls.set(calls.get() + 1);
            Ok(dec!(0.10))
        })
        .unwrap_err();
        assert!(err.to_string().contains("1000 points"));
        assert_eq!(calls.get(), 0);

        let widest: SensitivityVariable = "price:0:999:1".parse().unwrap();
        assert_eq!(generate_sweep_values(&widest).unwrap().len(), MAX_SWEEP_POINTS);
    }

    #[test]
    fn test_evaluate_sensitivity() {
        let input = sample_input();
        // Toy model: IRR moves 1bp per price point and 0.5bp per volume point
        let result = evaluate_sensitivity(&input, |p| {
            Ok(dec!(0.10) + p.price_delta / dec!(10000) + p.volume_delta / dec!(20000))
        })
        .unwrap();
        let out = &result.result;

        assert_eq!(out.variable_1_values.len(), 5);
        assert_eq!(out.variable_2_values.len(), 5);
        assert_eq!(out.base_case_position, (2, 2));
        assert_eq!(out.base_case_value, Some(dec!(0.10)));
        assert_eq!(out.matrix[4][4], Some(dec!(0.102)));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_failed_cells_become_warnings() {
        let input = sample_input();
        let result = evaluate_sensitivity(&input, |p| {
            if p.price_delta < Decimal::ZERO {
                Err(FeasibilityError::InsufficientData("toy failure".into()))
            } else {
                Ok(dec!(0.1))
            }
        })
        .unwrap();
        assert_eq!(result.result.matrix[0][0], None);
        assert_eq!(result.result.matrix[2][0], Some(dec!(0.1)));
        assert_eq!(result.warnings.len(), 10);
    }

    #[test]
    fn test_max_included_when_step_overshoots() {
        let var: SensitivityVariable = "price:0:10:4".parse().unwrap();
        assert_eq!(
            generate_sweep_values(&var).unwrap(),
            vec![dec!(0), dec!(4), dec!(8), dec!(10)]
        );
    }

    #[test]
    fn test_same_driver_twice_rejected() {
        let input = SensitivityInput {
            base: ScenarioParameters::default(),
            variable_1: "price:-10:10:5".parse().unwrap(),
            variable_2: "price:-10:10:5".parse().unwrap(),
        };
        assert!(evaluate_sensitivity(&input, |_| Ok(Decimal::ZERO)).is_err());
    }
}
