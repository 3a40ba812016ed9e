use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{ConvergenceReason, FeasibilityError};
use crate::types::{Money, Rate};
use crate::FeasibilityResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 1000;

/// Bracket width below which the rate is as precise as Decimal allows.
const RATE_EPSILON: Decimal = dec!(0.000000000000000001);

/// Grid spacing used to look for NPV sign changes.
const FINE_STEP: Decimal = dec!(0.01);
const COARSE_STEP: Decimal = dec!(0.1);
const FINE_GRID_END: Decimal = dec!(1.0);

/// Settings for the bracketed IRR search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IrrSolverConfig {
    /// Lowest rate considered (must be > -100%)
    pub lower_bound: Rate,
    /// Highest rate considered
    pub upper_bound: Rate,
    /// Absolute NPV tolerance at which a rate is accepted
    pub tolerance: Decimal,
    /// Newton/bisection iteration budget once a bracket is found
    pub max_iterations: u32,
}

impl Default for IrrSolverConfig {
    fn default() -> Self {
        IrrSolverConfig {
            lower_bound: dec!(-0.99),
            upper_bound: dec!(10.0),
            tolerance: CONVERGENCE_THRESHOLD,
            max_iterations: MAX_IRR_ITERATIONS,
        }
    }
}

/// Net Present Value of a series of cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> FeasibilityResult<Money> {
    if rate <= dec!(-1) {
        return Err(FeasibilityError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    npv_and_slope(rate, cash_flows)
        .map(|(value, _)| value)
        .ok_or_else(|| FeasibilityError::DivisionByZero {
            context: format!("NPV discount factor at rate {rate}"),
        })
}

/// NPV and its first derivative with respect to the rate.
///
/// Returns `None` when a discount factor underflows to zero or a term
/// overflows Decimal's range.
fn npv_and_slope(rate: Rate, cash_flows: &[Money]) -> Option<(Money, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut value = Decimal::ZERO;
    let mut slope = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r)?;
        }
        if discount.is_zero() {
            return None;
        }
        value = value.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let term = Decimal::from(t as i64)
                .checked_mul(*cf)?
                .checked_div(discount.checked_mul(one_plus_r)?)?;
            slope = slope.checked_sub(term)?;
        }
    }

    Some((value, slope))
}

fn has_sign_change(cash_flows: &[Money]) -> bool {
    let any_negative = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    let any_positive = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    any_negative && any_positive
}

/// A root candidate found by the grid scan.
#[derive(Debug, Clone, Copy)]
enum Bracket {
    Exact(Rate),
    Between(Rate, Rate),
}

impl Bracket {
    fn distance_to_zero(&self) -> Decimal {
        match *self {
            Bracket::Exact(r) => r.abs(),
            Bracket::Between(lo, hi) => {
                if lo <= Decimal::ZERO && hi >= Decimal::ZERO {
                    Decimal::ZERO
                } else {
                    lo.abs().min(hi.abs())
                }
            }
        }
    }
}

fn scan_grid(config: &IrrSolverConfig) -> Vec<Rate> {
    let mut points = Vec::new();
    let mut current = config.lower_bound;
    while current < config.upper_bound {
        points.push(current);
        current += if current < FINE_GRID_END {
            FINE_STEP
        } else {
            COARSE_STEP
        };
    }
    points.push(config.upper_bound);
    points
}

/// Every NPV sign change (or exact zero) on the scan grid.
fn find_brackets(cash_flows: &[Money], config: &IrrSolverConfig) -> Vec<Bracket> {
    let samples: Vec<(Rate, Money)> = scan_grid(config)
        .into_iter()
        .filter_map(|r| npv_and_slope(r, cash_flows).map(|(v, _)| (r, v)))
        .collect();

    let mut brackets = Vec::new();
    for (i, &(rate, value)) in samples.iter().enumerate() {
        if value.is_zero() {
            brackets.push(Bracket::Exact(rate));
            continue;
        }
        if let Some(&(next_rate, next_value)) = samples.get(i + 1) {
            if !next_value.is_zero() && value.is_sign_negative() != next_value.is_sign_negative()
            {
                brackets.push(Bracket::Between(rate, next_rate));
            }
        }
    }
    brackets
}

/// Internal Rate of Return with the default solver settings.
///
/// `cash_flows[0]` is the period-0 flow (normally the negative investment).
pub fn solve_irr(cash_flows: &[Money]) -> FeasibilityResult<Rate> {
    solve_irr_with(cash_flows, &IrrSolverConfig::default())
}

/// Internal Rate of Return using a safeguarded Newton-Raphson search.
///
/// The rate domain is scanned for NPV sign changes first. When several roots
/// exist the one nearest zero is refined. Newton steps that leave the bracket
/// (or meet a zero derivative) fall back to bisection.
pub fn solve_irr_with(cash_flows: &[Money], config: &IrrSolverConfig) -> FeasibilityResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(FeasibilityError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    if config.lower_bound <= dec!(-1) || config.lower_bound >= config.upper_bound {
        return Err(FeasibilityError::InvalidInput {
            field: "irr_solver".into(),
            reason: "Rate domain must satisfy -100% < lower_bound < upper_bound".into(),
        });
    }
    if !has_sign_change(cash_flows) {
        return Err(no_convergence(ConvergenceReason::NoSignChange, 0, cash_flows));
    }

    let bracket = find_brackets(cash_flows, config)
        .into_iter()
        .min_by_key(|b| b.distance_to_zero())
        .ok_or_else(|| no_convergence(ConvergenceReason::NoBracket, 0, cash_flows))?;

    match bracket {
        Bracket::Exact(rate) => Ok(rate),
        Bracket::Between(lo, hi) => refine(cash_flows, lo, hi, config),
    }
}

fn refine(cash_flows: &[Money], lo: Rate, hi: Rate, config: &IrrSolverConfig) -> FeasibilityResult<Rate> {
    let (mut lo, mut hi) = (lo, hi);
    let (mut npv_lo, _) = npv_and_slope(lo, cash_flows)
        .ok_or_else(|| no_convergence(ConvergenceReason::NoBracket, 0, cash_flows))?;
    let mut rate = (lo + hi) / dec!(2);

    for i in 1..=config.max_iterations {
        let (value, slope) = npv_and_slope(rate, cash_flows)
            .ok_or_else(|| no_convergence(ConvergenceReason::NoBracket, i, cash_flows))?;

        if value.abs() < config.tolerance {
            tracing::debug!(iterations = i, %rate, "IRR converged");
            return Ok(rate);
        }

        if value.is_sign_negative() == npv_lo.is_sign_negative() {
            lo = rate;
            npv_lo = value;
        } else {
            hi = rate;
        }

        if (hi - lo).abs() < RATE_EPSILON {
            tracing::debug!(iterations = i, %rate, "IRR bracket collapsed");
            return Ok(rate);
        }

        let newton = if slope.is_zero() {
            None
        } else {
            value.checked_div(slope).and_then(|step| rate.checked_sub(step))
        };
        let (low, high) = (lo.min(hi), lo.max(hi));
        rate = match newton {
            Some(next) if next > low && next < high => next,
            _ => (lo + hi) / dec!(2),
        };
    }

    Err(no_convergence(
        ConvergenceReason::IterationLimit,
        config.max_iterations,
        cash_flows,
    ))
}

fn no_convergence(reason: ConvergenceReason, iterations: u32, cash_flows: &[Money]) -> FeasibilityError {
    FeasibilityError::NoConvergence {
        reason,
        iterations,
        cash_flows: cash_flows.to_vec(),
    }
}
