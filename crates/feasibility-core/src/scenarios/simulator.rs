use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FeasibilityError;
use crate::model::BaseFinancialModel;
use crate::time_value::{solve_irr_with, IrrSolverConfig};
use crate::types::*;
use crate::FeasibilityResult;

/// User-supplied percentage shocks for one scenario run (5 = +5%).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParameters {
    pub price_delta: Percent,
    pub cost_delta: Percent,
    pub volume_delta: Percent,
    pub investment_delta: Percent,
}

impl ScenarioParameters {
    pub fn is_base_case(&self) -> bool {
        self.price_delta.is_zero()
            && self.cost_delta.is_zero()
            && self.volume_delta.is_zero()
            && self.investment_delta.is_zero()
    }
}

/// Inclusive range a delta may take.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaBounds {
    pub min: Percent,
    pub max: Percent,
}

impl DeltaBounds {
    pub fn symmetric(limit: Percent) -> Self {
        DeltaBounds {
            min: -limit,
            max: limit,
        }
    }

    pub fn contains(&self, value: Percent) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Fixed constants of the scenario formula and the slider ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioAssumptions {
    /// Corporate tax rate applied to price and cost impacts
    pub tax_rate: Rate,
    /// Reference selling price per unit
    pub reference_unit_price: Money,
    /// Reference production cost per unit
    pub reference_unit_cost: Money,
    pub price_bounds: DeltaBounds,
    pub cost_bounds: DeltaBounds,
    pub volume_bounds: DeltaBounds,
    pub investment_bounds: DeltaBounds,
}

impl Default for ScenarioAssumptions {
    fn default() -> Self {
        ScenarioAssumptions {
            tax_rate: dec!(0.22),
            reference_unit_price: dec!(1200),
            reference_unit_cost: dec!(850),
            price_bounds: DeltaBounds::symmetric(dec!(20)),
            cost_bounds: DeltaBounds::symmetric(dec!(20)),
            volume_bounds: DeltaBounds::symmetric(dec!(30)),
            investment_bounds: DeltaBounds::symmetric(dec!(20)),
        }
    }
}

impl ScenarioAssumptions {
    pub fn validate(&self) -> FeasibilityResult<()> {
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE {
            return Err(FeasibilityError::InvalidInput {
                field: "tax_rate".into(),
                reason: "Tax rate must be between 0 and 1".into(),
            });
        }
        for (field, bounds) in [
            ("price_bounds", &self.price_bounds),
            ("cost_bounds", &self.cost_bounds),
            ("volume_bounds", &self.volume_bounds),
            ("investment_bounds", &self.investment_bounds),
        ] {
            if bounds.min > bounds.max {
                return Err(FeasibilityError::InvalidInput {
                    field: field.into(),
                    reason: "Min must be <= max".into(),
                });
            }
        }
        if self.investment_bounds.min <= dec!(-100) {
            return Err(FeasibilityError::InvalidInput {
                field: "investment_bounds".into(),
                reason: "Investment cannot be cut by 100% or more".into(),
            });
        }
        Ok(())
    }

    /// Reject deltas outside the configured ranges.
    pub fn check(&self, params: &ScenarioParameters) -> FeasibilityResult<()> {
        for (field, value, bounds) in [
            ("price_delta", params.price_delta, &self.price_bounds),
            ("cost_delta", params.cost_delta, &self.cost_bounds),
            ("volume_delta", params.volume_delta, &self.volume_bounds),
            ("investment_delta", params.investment_delta, &self.investment_bounds),
        ] {
            if !bounds.contains(value) {
                return Err(FeasibilityError::InvalidInput {
                    field: field.into(),
                    reason: format!(
                        "{value}% is outside the allowed range [{}%, {}%]",
                        bounds.min, bounds.max
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Scenario cash flows before the IRR is solved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedCashFlows {
    pub sim_cash_flow: Vec<Money>,
    pub sim_investment: Money,
}

impl ProjectedCashFlows {
    /// `[-sim_investment, sim_cash_flow...]`
    pub fn irr_series(&self) -> Vec<Money> {
        std::iter::once(-self.sim_investment)
            .chain(self.sim_cash_flow.iter().copied())
            .collect()
    }
}

/// Output of one scenario run. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioCashFlowModel {
    pub parameters: ScenarioParameters,
    pub years: Vec<i32>,
    pub sim_cash_flow: Vec<Money>,
    pub sim_investment: Money,
    pub sim_irr: Rate,
    /// `sim_irr - base_irr`
    pub irr_change: Rate,
}

/// Apply the four deltas to the base case.
///
/// Each driver adds its own term; there are no cross effects:
///
/// ```text
/// price[t]  = price_delta/100 * unit_price * volume[t] * (1 - tax)
/// cost[t]   = cost_delta/100  * unit_cost  * volume[t] * (1 - tax)
/// volume[t] = volume_delta/100 * cf[t]
/// sim[t]    = cf[t] + price[t] + volume[t] - cost[t]
/// ```
pub fn project_cash_flows(
    model: &BaseFinancialModel,
    params: &ScenarioParameters,
    assumptions: &ScenarioAssumptions,
) -> FeasibilityResult<ProjectedCashFlows> {
    assumptions.check(params)?;

    if params.is_base_case() {
        return Ok(ProjectedCashFlows {
            sim_cash_flow: model.base_cash_flow.clone(),
            sim_investment: model.investment,
        });
    }

    let after_tax = Decimal::ONE - assumptions.tax_rate;
    let price_per_unit = params.price_delta / dec!(100) * assumptions.reference_unit_price * after_tax;
    let cost_per_unit = params.cost_delta / dec!(100) * assumptions.reference_unit_cost * after_tax;
    let volume_factor = params.volume_delta / dec!(100);

    let sim_cash_flow = model
        .base_cash_flow
        .iter()
        .zip(&model.base_volumes)
        .map(|(cf, volume)| {
            let price_impact = price_per_unit * volume;
            let cost_impact = cost_per_unit * volume;
            let volume_impact = volume_factor * cf;
            cf + price_impact + volume_impact - cost_impact
        })
        .collect();

    Ok(ProjectedCashFlows {
        sim_cash_flow,
        sim_investment: model.investment * (Decimal::ONE + params.investment_delta / dec!(100)),
    })
}

/// Run one scenario: project the cash flows and solve their IRR.
pub fn simulate(
    model: &BaseFinancialModel,
    params: &ScenarioParameters,
    assumptions: &ScenarioAssumptions,
    solver: &IrrSolverConfig,
) -> FeasibilityResult<ScenarioCashFlowModel> {
    let projected = project_cash_flows(model, params, assumptions)?;
    let sim_irr = solve_irr_with(&projected.irr_series(), solver)?;

    Ok(ScenarioCashFlowModel {
        parameters: *params,
        years: model.years.clone(),
        sim_cash_flow: projected.sim_cash_flow,
        sim_investment: projected.sim_investment,
        sim_irr,
        irr_change: sim_irr - model.base_irr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvergenceReason;

    fn model() -> BaseFinancialModel {
        BaseFinancialModel {
            project_name: "Line 3".into(),
            base_irr: dec!(0.195),
            reference_npv: Decimal::ZERO,
            years: vec![2025, 2026, 2027],
            base_cash_flow: vec![dec!(100000000), dec!(200000000), dec!(300000000)],
            base_volumes: vec![dec!(800000); 3],
            investment: dec!(400000000),
        }
    }

    #[test]
    fn test_zero_deltas_reproduce_base() {
        let m = model();
        let p = project_cash_flows(&m, &ScenarioParameters::default(), &ScenarioAssumptions::default())
            .unwrap();
        assert_eq!(p.sim_cash_flow, m.base_cash_flow);
        assert_eq!(p.sim_investment, m.investment);
    }

    #[test]
    fn test_price_delta_adds_after_tax_margin() {
        let params = ScenarioParameters {
            price_delta: dec!(5),
            ..Default::default()
        };
        let p = project_cash_flows(&model(), &params, &ScenarioAssumptions::default()).unwrap();
        // 0.05 * 1200 * 800,000 * 0.78 = 37,440,000
        assert_eq!(p.sim_cash_flow[0], dec!(137440000));
    }

    #[test]
    fn test_cost_delta_reduces_cash_flow() {
        let params = ScenarioParameters {
            cost_delta: dec!(10),
            ..Default::default()
        };
        let p = project_cash_flows(&model(), &params, &ScenarioAssumptions::default()).unwrap();
        // 0.10 * 850 * 800,000 * 0.78 = 53,040,000
        assert_eq!(p.sim_cash_flow[1], dec!(146960000));
    }

    #[test]
    fn test_volume_delta_scales_cash_flow() {
        let params = ScenarioParameters {
            volume_delta: dec!(-30),
            ..Default::default()
        };
        let p = project_cash_flows(&model(), &params, &ScenarioAssumptions::default()).unwrap();
        assert_eq!(p.sim_cash_flow[2], dec!(210000000));
    }

    #[test]
    fn test_investment_delta_scales_outlay() {
        let params = ScenarioParameters {
            investment_delta: dec!(20),
            ..Default::default()
        };
        let p = project_cash_flows(&model(), &params, &ScenarioAssumptions::default()).unwrap();
        assert_eq!(p.sim_investment, dec!(480000000));
        assert_eq!(p.irr_series()[0], dec!(-480000000));
    }

    #[test]
    fn test_out_of_range_delta_rejected() {
        let params = ScenarioParameters {
            volume_delta: dec!(31),
            ..Default::default()
        };
        match project_cash_flows(&model(), &params, &ScenarioAssumptions::default()) {
            Err(FeasibilityError::InvalidInput { field, .. }) => assert_eq!(field, "volume_delta"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_higher_price_raises_irr() {
        let m = model();
        let a = ScenarioAssumptions::default();
        let solver = IrrSolverConfig::default();
        let base = simulate(&m, &ScenarioParameters::default(), &a, &solver).unwrap();
        let up = simulate(
            &m,
            &ScenarioParameters {
                price_delta: dec!(10),
                ..Default::default()
            },
            &a,
            &solver,
        )
        .unwrap();
        assert!(up.sim_irr > base.sim_irr);
        assert_eq!(up.irr_change, up.sim_irr - m.base_irr);
    }

    #[test]
    fn test_unsolvable_scenario_surfaces_series() {
        let mut m = model();
        m.base_cash_flow = vec![dec!(1000), dec!(1000), dec!(1000)];
        let params = ScenarioParameters {
            cost_delta: dec!(20),
            ..Default::default()
        };
        match simulate(&m, &params, &ScenarioAssumptions::default(), &IrrSolverConfig::default()) {
            Err(FeasibilityError::NoConvergence {
                reason, cash_flows, ..
            }) => {
                assert_eq!(reason, ConvergenceReason::NoSignChange);
                assert_eq!(cash_flows.len(), 4);
                assert!(cash_flows.iter().all(|cf| *cf < Decimal::ZERO));
            }
            other => panic!("expected NoConvergence, got {other:?}"),
        }
    }

    #[test]
    fn test_assumptions_validation() {
        let mut a = ScenarioAssumptions::default();
        a.tax_rate = dec!(1.5);
        assert!(a.validate().is_err());
        assert!(ScenarioAssumptions::default().validate().is_ok());
    }
}
