use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FeasibilityError;
use crate::types::{Money, Rate, Volume};
use crate::FeasibilityResult;

pub const DEFAULT_PROJECT_NAME: &str = "Unnamed Project";

/// The project's base case as extracted and normalized from the workbook.
///
/// Built once per source load and shared read-only by every scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseFinancialModel {
    pub project_name: String,
    /// Reference IRR as a fraction (0.384 = 38.4%)
    pub base_irr: Rate,
    /// Reference NPV as recorded in the workbook (display only)
    #[serde(default)]
    pub reference_npv: Money,
    /// Period labels, strictly increasing
    pub years: Vec<i32>,
    /// Net cash flow per period, index-aligned with `years`
    pub base_cash_flow: Vec<Money>,
    /// Unit sales volume per period, index-aligned with `years`
    pub base_volumes: Vec<Volume>,
    /// Period-0 outflow, positive, same unit as `base_cash_flow`
    pub investment: Money,
}

impl BaseFinancialModel {
    /// Mean of the base cash-flow series (zero for an empty series).
    pub fn mean_cash_flow(&self) -> Money {
        mean(&self.base_cash_flow)
    }

    /// The full IRR series: `[-investment, cf_1, ..., cf_N]`.
    pub fn cash_flow_series(&self) -> Vec<Money> {
        std::iter::once(-self.investment)
            .chain(self.base_cash_flow.iter().copied())
            .collect()
    }

    /// Check the structural invariants every consumer relies on.
    pub fn validate(&self) -> FeasibilityResult<()> {
        if self.years.is_empty() {
            return Err(FeasibilityError::InsufficientData(
                "model has no periods".into(),
            ));
        }
        if self.base_cash_flow.len() != self.years.len()
            || self.base_volumes.len() != self.years.len()
        {
            return Err(FeasibilityError::InvalidInput {
                field: "base_cash_flow/base_volumes".into(),
                reason: format!(
                    "series lengths differ: {} years, {} cash flows, {} volumes",
                    self.years.len(),
                    self.base_cash_flow.len(),
                    self.base_volumes.len()
                ),
            });
        }
        if let Some(pair) = self.years.windows(2).find(|w| w[1] <= w[0]) {
            return Err(FeasibilityError::InvalidInput {
                field: "years".into(),
                reason: format!("years must be strictly increasing ({} then {})", pair[0], pair[1]),
            });
        }
        if let Some(v) = self.base_volumes.iter().find(|v| v.is_sign_negative() && !v.is_zero()) {
            return Err(FeasibilityError::InvalidInput {
                field: "base_volumes".into(),
                reason: format!("volumes must be non-negative, found {v}"),
            });
        }
        if self.investment <= Decimal::ZERO {
            return Err(FeasibilityError::InvalidInput {
                field: "investment".into(),
                reason: "Investment must be positive".into(),
            });
        }
        Ok(())
    }
}

pub(crate) fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len() as u64)
}
