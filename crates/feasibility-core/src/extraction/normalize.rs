use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::model::{mean, BaseFinancialModel};
use crate::types::{Money, Rate};

/// Investment above this, against mean cash flow below it, signals a unit mismatch.
pub const MAGNITUDE_THRESHOLD: Decimal = dec!(1000000);

/// A correction the normalizer applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Normalization {
    RateRescaled { from: Rate, to: Rate },
    InvestmentRescaled { from: Money, to: Money },
}

impl std::fmt::Display for Normalization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Normalization::RateRescaled { from, to } => {
                write!(f, "reference IRR {from} read as a percentage, rescaled to {to}")
            }
            Normalization::InvestmentRescaled { from, to } => write!(
                f,
                "investment {from} looks like base currency units against a cash flow in millions, rescaled to {to}"
            ),
        }
    }
}

/// Percentage-scale correction: a rate whose magnitude exceeds 1 is divided by 100.
pub fn normalize_rate(rate: Rate) -> Rate {
    if rate.abs() > Decimal::ONE {
        rate / dec!(100)
    } else {
        rate
    }
}

/// Magnitude-unit correction for an investment recorded in a smaller unit
/// than the cash-flow series.
///
/// Heuristic: a small project with a genuinely large cash flow, or a large
/// investment against a small one, is rescaled wrongly.
pub fn normalize_investment(investment: Money, cash_flow: &[Money]) -> Money {
    if investment > MAGNITUDE_THRESHOLD && mean(cash_flow) < MAGNITUDE_THRESHOLD {
        investment / MAGNITUDE_THRESHOLD
    } else {
        investment
    }
}

/// Apply both corrections to a model, returning what changed.
pub fn normalize_model(model: &mut BaseFinancialModel) -> Vec<Normalization> {
    let mut applied = Vec::new();

    let rate = normalize_rate(model.base_irr);
    if rate != model.base_irr {
        applied.push(Normalization::RateRescaled {
            from: model.base_irr,
            to: rate,
        });
        model.base_irr = rate;
    }

    let investment = normalize_investment(model.investment, &model.base_cash_flow);
    if investment != model.investment {
        applied.push(Normalization::InvestmentRescaled {
            from: model.investment,
            to: investment,
        });
        model.investment = investment;
    }

    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rescaled() {
        assert_eq!(normalize_rate(dec!(38.4)), dec!(0.384));
        assert_eq!(normalize_rate(dec!(-12.5)), dec!(-0.125));
    }

    #[test]
    fn test_rate_correction_idempotent() {
        for raw in [dec!(38.4), dec!(0.384), dec!(1), dec!(100), dec!(-0.05), dec!(1.01)] {
            let once = normalize_rate(raw);
            assert_eq!(normalize_rate(once), once, "not idempotent for {raw}");
            assert!(once.abs() <= Decimal::ONE);
        }
    }

    #[test]
    fn test_investment_rescaled_against_small_cash_flow() {
        let cf = vec![dec!(400), dec!(500), dec!(600)];
        assert_eq!(normalize_investment(dec!(2000000), &cf), dec!(2));
    }

    #[test]
    fn test_investment_kept_when_units_agree() {
        let cf = vec![dec!(33326857), dec!(198276334)];
        assert_eq!(normalize_investment(dec!(590000000), &cf), dec!(590000000));
        assert_eq!(normalize_investment(dec!(590), &[dec!(100)]), dec!(590));
    }

    #[test]
    fn test_normalize_model_reports_changes() {
        let mut model = BaseFinancialModel {
            project_name: "p".into(),
            base_irr: dec!(38.4),
            reference_npv: Decimal::ZERO,
            years: vec![2025, 2026],
            base_cash_flow: vec![dec!(500), dec!(500)],
            base_volumes: vec![dec!(1), dec!(1)],
            investment: dec!(2000000),
        };
        let applied = normalize_model(&mut model);
        assert_eq!(applied.len(), 2);
        assert_eq!(model.base_irr, dec!(0.384));
        assert_eq!(model.investment, dec!(2));
        assert!(normalize_model(&mut model).is_empty());
    }
}
