pub mod cache;
pub mod engine;
pub mod error;
pub mod extraction;
pub mod model;
pub mod scenarios;
pub mod source;
pub mod time_value;
pub mod types;

pub use engine::ProjectEngine;
pub use error::{ConvergenceReason, FeasibilityError};
pub use model::BaseFinancialModel;
pub use types::*;

/// Standard result type for all feasibility operations
pub type FeasibilityResult<T> = Result<T, FeasibilityError>;
