use std::sync::Arc;

use crate::model::BaseFinancialModel;
use crate::scenarios::{simulate, ScenarioAssumptions, ScenarioCashFlowModel, ScenarioParameters};
use crate::time_value::{solve_irr_with, IrrSolverConfig};
use crate::types::Rate;
use crate::FeasibilityResult;

/// Read-only handle the presentation layer holds for one loaded project.
///
/// Cloning is cheap: the base model is shared behind an `Arc` and never
/// mutated, so one handle can serve any number of sessions. Scenario
/// parameters and results stay with the caller.
#[derive(Debug, Clone)]
pub struct ProjectEngine {
    model: Arc<BaseFinancialModel>,
    assumptions: ScenarioAssumptions,
    solver: IrrSolverConfig,
}

impl ProjectEngine {
    /// Wrap a model after checking its invariants.
    pub fn new(model: Arc<BaseFinancialModel>) -> FeasibilityResult<Self> {
        model.validate()?;
        Ok(ProjectEngine {
            model,
            assumptions: ScenarioAssumptions::default(),
            solver: IrrSolverConfig::default(),
        })
    }

    pub fn with_assumptions(mut self, assumptions: ScenarioAssumptions) -> FeasibilityResult<Self> {
        assumptions.validate()?;
        self.assumptions = assumptions;
        Ok(self)
    }

    pub fn with_solver(mut self, solver: IrrSolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Read-only snapshot of the base case.
    pub fn base_model(&self) -> &BaseFinancialModel {
        &self.model
    }

    pub fn shared_model(&self) -> Arc<BaseFinancialModel> {
        Arc::clone(&self.model)
    }

    pub fn assumptions(&self) -> &ScenarioAssumptions {
        &self.assumptions
    }

    /// Recompute the scenario cash flows and IRR for one parameter set.
    pub fn run_scenario(&self, params: &ScenarioParameters) -> FeasibilityResult<ScenarioCashFlowModel> {
        simulate(&self.model, params, &self.assumptions, &self.solver)
    }

    /// IRR of the unshocked base series, as solved here rather than read
    /// from the workbook.
    pub fn solved_base_irr(&self) -> FeasibilityResult<Rate> {
        solve_irr_with(&self.model.cash_flow_series(), &self.solver)
    }
}
