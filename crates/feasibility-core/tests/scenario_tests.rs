use feasibility_core::cache::ModelCache;
use feasibility_core::error::ConvergenceReason;
use feasibility_core::extraction::{self, normalize_investment, normalize_rate, WorkbookLayout};
use feasibility_core::scenarios::scenario::{analyze_scenarios, NamedScenario, ScenarioSetInput};
use feasibility_core::scenarios::sensitivity::{
    irr_sensitivity, tornado, ScenarioDriver, SensitivityInput,
};
use feasibility_core::scenarios::{ScenarioAssumptions, ScenarioParameters};
use feasibility_core::time_value::{npv, solve_irr};
use feasibility_core::{BaseFinancialModel, FeasibilityError, ProjectEngine};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/feasibility.json")
}

fn load(path: &Path) -> feasibility_core::FeasibilityResult<BaseFinancialModel> {
    extraction::extract_file(path, &WorkbookLayout::default()).map(|out| out.result)
}

fn engine() -> ProjectEngine {
    ProjectEngine::new(Arc::new(load(&fixture_path()).unwrap())).unwrap()
}

// ===========================================================================
// Base case
// ===========================================================================

#[test]
fn test_zero_scenario_reproduces_workbook_irr() {
    let engine = engine();
    let run = engine.run_scenario(&ScenarioParameters::default()).unwrap();

    assert_eq!(engine.base_model().base_irr, dec!(0.195));
    assert!(
        (run.sim_irr - engine.base_model().base_irr).abs() < dec!(0.0001),
        "solved {} vs stored {}",
        run.sim_irr,
        engine.base_model().base_irr
    );
    assert!((run.sim_irr - dec!(0.19506)).abs() < dec!(0.00001));
}

#[test]
fn test_zero_scenario_copies_base_series_exactly() {
    let engine = engine();
    let run = engine.run_scenario(&ScenarioParameters::default()).unwrap();
    let base = engine.base_model();

    assert_eq!(run.sim_cash_flow, base.base_cash_flow);
    assert_eq!(run.sim_investment, base.investment);
    assert_eq!(run.years, base.years);
    assert_eq!(run.irr_change, run.sim_irr - base.base_irr);
}

#[test]
fn test_solved_irr_zeroes_npv_of_documented_series() {
    let engine = engine();
    let series = engine.base_model().cash_flow_series();
    let irr = engine.solved_base_irr().unwrap();
    assert!(npv(irr, &series).unwrap().abs() < dec!(0.000001));
}

// ===========================================================================
// Shocks
// ===========================================================================

#[test]
fn test_price_shock_lifts_every_period_by_after_tax_margin() {
    let engine = engine();
    let params = ScenarioParameters {
        price_delta: dec!(5),
        ..Default::default()
    };
    let run = engine.run_scenario(&params).unwrap();
    for (sim, base) in run.sim_cash_flow.iter().zip(&engine.base_model().base_cash_flow) {
        assert_eq!(sim - base, dec!(37440000));
    }
    assert!(run.irr_change > Decimal::ZERO);
}

#[test]
fn test_investment_overrun_lowers_irr() {
    let engine = engine();
    let base = engine.run_scenario(&ScenarioParameters::default()).unwrap();
    let overrun = engine
        .run_scenario(&ScenarioParameters {
            investment_delta: dec!(20),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(overrun.sim_investment, dec!(708000000));
    assert!(overrun.sim_irr < base.sim_irr);
}

#[test]
fn test_slider_limits_enforced() {
    let engine = engine();
    let err = engine
        .run_scenario(&ScenarioParameters {
            price_delta: dec!(25),
            ..Default::default()
        })
        .unwrap_err();
    assert!(err.to_string().contains("price_delta"));
}

#[test]
fn test_widened_bounds_from_assumptions() {
    let mut assumptions = ScenarioAssumptions::default();
    assumptions.price_bounds.max = dec!(50);
    let engine = engine().with_assumptions(assumptions).unwrap();
    assert!(engine
        .run_scenario(&ScenarioParameters {
            price_delta: dec!(25),
            ..Default::default()
        })
        .is_ok());
}

// ===========================================================================
// Solver
// ===========================================================================

#[test]
fn test_simple_irr() {
    let flows = [dec!(-100), dec!(50), dec!(50), dec!(50)];
    let irr = solve_irr(&flows).unwrap();
    assert!((irr - dec!(0.23375)).abs() < dec!(0.0001));
    assert!(npv(irr, &flows).unwrap().abs() < dec!(0.000001));
}

#[test]
fn test_all_negative_series_does_not_converge() {
    match solve_irr(&[dec!(-100), dec!(-50), dec!(-50)]) {
        Err(FeasibilityError::NoConvergence {
            reason, cash_flows, ..
        }) => {
            assert_eq!(reason, ConvergenceReason::NoSignChange);
            assert_eq!(cash_flows, vec![dec!(-100), dec!(-50), dec!(-50)]);
        }
        other => panic!("expected NoConvergence, got {other:?}"),
    }
}

#[test]
fn test_magnitude_corrections() {
    assert_eq!(normalize_rate(dec!(19.5)), dec!(0.195));
    assert_eq!(normalize_rate(dec!(0.195)), dec!(0.195));
    assert_eq!(
        normalize_investment(dec!(2000000), &[dec!(1), dec!(1)]),
        dec!(2)
    );
    assert_eq!(
        normalize_investment(dec!(2000000), &[dec!(1000000), dec!(3000000)]),
        dec!(2000000)
    );
}

// ===========================================================================
// Analysis over a loaded project
// ===========================================================================

#[test]
fn test_sensitivity_grid_centres_on_base() {
    let engine = engine();
    let input = SensitivityInput {
        base: ScenarioParameters::default(),
        variable_1: "price:-10:10:10".parse().unwrap(),
        variable_2: "volume:-10:10:10".parse().unwrap(),
    };
    let out = irr_sensitivity(&engine, &input).unwrap().result;

    assert_eq!(out.variable_1_values, vec![dec!(-10), dec!(0), dec!(10)]);
    assert_eq!(out.base_case_position, (1, 1));
    assert_eq!(
        out.base_case_value,
        Some(engine.solved_base_irr().unwrap())
    );

    // Rising price and rising volume both help
    let m = &out.matrix;
    assert!(m[0][1] < m[1][1] && m[1][1] < m[2][1]);
    assert!(m[1][0] < m[1][1] && m[1][1] < m[1][2]);
}

#[test]
fn test_tornado_orders_by_swing() {
    let out = tornado(&engine(), &ScenarioParameters::default())
        .unwrap()
        .result;
    assert_eq!(out.bars.len(), ScenarioDriver::ALL.len());
    let swings: Vec<Decimal> = out.bars.iter().map(|b| b.swing.unwrap()).collect();
    assert!(swings.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_weighted_scenarios_over_fixture() {
    let scenario = |name: &str, probability, price_delta| NamedScenario {
        name: name.into(),
        probability,
        parameters: ScenarioParameters {
            price_delta,
            ..Default::default()
        },
    };
    let input = ScenarioSetInput {
        scenarios: vec![
            scenario("Downside", dec!(0.3), dec!(-10)),
            scenario("Plan", dec!(0.4), Decimal::ZERO),
            scenario("Upside", dec!(0.3), dec!(10)),
        ],
    };
    let out = analyze_scenarios(&engine(), &input).unwrap().result;
    assert!(out.results[0].irr < out.base_irr);
    assert!(out.results[2].irr > out.base_irr);
    assert!(out.probability_weighted_irr > out.results[0].irr);
    assert!(out.probability_weighted_irr < out.results[2].irr);
}

// ===========================================================================
// Cache
// ===========================================================================

#[test]
fn test_cache_serves_repeated_loads() {
    let mut cache = ModelCache::new();
    let first = cache.get_or_load(&fixture_path(), load).unwrap();
    let second = cache.get_or_load(&fixture_path(), load).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let a = ProjectEngine::new(first).unwrap();
    let b = ProjectEngine::new(second).unwrap();
    assert_eq!(
        a.run_scenario(&ScenarioParameters::default()).unwrap(),
        b.run_scenario(&ScenarioParameters::default()).unwrap()
    );
}
