pub mod simulator;

#[cfg(feature = "analysis")]
pub mod scenario;

#[cfg(feature = "analysis")]
pub mod sensitivity;

pub use simulator::{
    project_cash_flows, simulate, DeltaBounds, ProjectedCashFlows, ScenarioAssumptions,
    ScenarioCashFlowModel, ScenarioParameters,
};
