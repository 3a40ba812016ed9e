pub mod coerce;
pub mod layout;
pub mod locator;
pub mod normalize;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::Path;
use std::time::Instant;

use crate::error::FeasibilityError;
use crate::model::{BaseFinancialModel, DEFAULT_PROJECT_NAME};
use crate::source::workbook::InMemoryWorkbook;
use crate::source::{Cell, Sheet, TabularSource};
use crate::types::*;
use crate::FeasibilityResult;

pub use coerce::{coerce, coerce_cell, Coerced};
pub use layout::{CellRef, WorkbookLayout};
pub use locator::{locate, RowLocation};
pub use normalize::{normalize_investment, normalize_model, normalize_rate, Normalization};

fn is_blank(cell: &Cell) -> bool {
    match cell {
        Cell::Empty => true,
        Cell::Text(s) => s.trim().is_empty(),
        Cell::Number(_) => false,
    }
}

fn read_number(sheet: &Sheet, row: usize, col: usize, warnings: &mut Vec<String>) -> Decimal {
    let coerced = coerce_cell(sheet.cell(row, col));
    if let Some(reason) = coerced.warning {
        tracing::warn!(sheet = %sheet.name, row, col, %reason, "cell coerced to zero");
        warnings.push(format!(
            "{} row {row} col {col}: {reason}; using 0",
            sheet.name
        ));
    }
    coerced.value
}

/// Read the years row over the period columns, trimmed of trailing blank cells.
fn read_years(
    sheet: &Sheet,
    row: usize,
    layout: &WorkbookLayout,
    warnings: &mut Vec<String>,
) -> Vec<Decimal> {
    let cols = layout.period_cols();
    let cells = sheet.row_slice(row, cols.clone());
    let len = cells.iter().rposition(|c| !is_blank(c)).map_or(0, |i| i + 1);
    cols.take(len)
        .map(|col| read_number(sheet, row, col, warnings))
        .collect()
}

/// Read exactly `periods` cells from `row`; blank cells coerce to zero.
///
/// Returns `None` when every cell in the span is blank.
fn read_series(
    sheet: &Sheet,
    row: usize,
    first_col: usize,
    periods: usize,
    warnings: &mut Vec<String>,
) -> Option<Vec<Decimal>> {
    let cols = first_col..first_col + periods;
    if sheet.row_slice(row, cols.clone()).iter().all(|c| is_blank(c)) {
        return None;
    }
    Some(
        cols.map(|col| read_number(sheet, row, col, warnings))
            .collect(),
    )
}

fn read_project_name(sheet: &Sheet, at: CellRef) -> String {
    match sheet.cell(at.row, at.col) {
        Cell::Text(s) if !s.trim().is_empty() && s.trim() != "nan" => s.trim().to_string(),
        Cell::Number(n) => n.normalize().to_string(),
        _ => DEFAULT_PROJECT_NAME.to_string(),
    }
}

fn to_years(
    sheet: &Sheet,
    row: usize,
    first_col: usize,
    raw: &[Decimal],
) -> FeasibilityResult<Vec<i32>> {
    raw.iter()
        .enumerate()
        .map(|(i, y)| {
            y.fract()
                .is_zero()
                .then(|| y.to_i32())
                .flatten()
                .ok_or_else(|| {
                    FeasibilityError::extraction_at(
                        &sheet.name,
                        row,
                        Some(first_col + i),
                        format!("period label {y} is not an integer year"),
                    )
                })
        })
        .collect()
}

fn located(sheet: &Sheet, what: &str, loc: &RowLocation, warnings: &mut Vec<String>) {
    match &loc.matched {
        Some(label) => {
            tracing::debug!(sheet = %sheet.name, row = loc.row, label = %label, "{what} row located by keyword")
        }
        None => {
            tracing::warn!(sheet = %sheet.name, row = loc.row, "no {what} keyword found, using fixed row");
            warnings.push(format!(
                "{}: no {what} label found, using fixed row {}",
                sheet.name, loc.row
            ));
        }
    }
}

/// Build the base financial model from a feasibility workbook.
///
/// The years row decides the number of periods; the cash-flow and volume
/// rows are read over exactly that span. Individual unreadable or blank
/// cells degrade to zero. A missing sheet, an all-blank series or a broken
/// invariant aborts the build with an extraction error naming the sheet and
/// row.
pub fn extract<S: TabularSource + ?Sized>(
    source: &mut S,
    layout: &WorkbookLayout,
) -> FeasibilityResult<ComputationOutput<BaseFinancialModel>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let commercial = source.read_sheet(&layout.commercial_sheet)?;
    let summary = source.read_sheet(&layout.summary_sheet)?;
    let assumptions = source.read_sheet(&layout.assumptions_sheet)?;

    // Commercial summary: name and reference figures
    let project_name = read_project_name(&commercial, layout.project_name);
    let reference_npv = read_number(
        &commercial,
        layout.reference_npv.row,
        layout.reference_npv.col,
        &mut warnings,
    );
    let raw_irr = read_number(
        &commercial,
        layout.reference_irr.row,
        layout.reference_irr.col,
        &mut warnings,
    );

    // Cash-flow summary: years, cash flow, volumes
    let raw_years = read_years(&summary, layout.years_row, layout, &mut warnings);
    if raw_years.is_empty() {
        return Err(FeasibilityError::extraction_at(
            &summary.name,
            layout.years_row,
            None,
            "years series is empty",
        ));
    }
    let years = to_years(&summary, layout.years_row, layout.first_period_col, &raw_years)?;

    let periods = years.len();
    let series = |what: &str, loc: &RowLocation, warnings: &mut Vec<String>| {
        read_series(&summary, loc.row, layout.first_period_col, periods, warnings).ok_or_else(
            || {
                FeasibilityError::extraction_at(
                    &summary.name,
                    loc.row,
                    None,
                    format!("{what} series is empty"),
                )
            },
        )
    };

    let cash_loc = locate(&summary, &layout.cash_flow_keywords, layout.cash_flow_row);
    located(&summary, "cash flow", &cash_loc, &mut warnings);
    let base_cash_flow = series("cash flow", &cash_loc, &mut warnings)?;

    let volume_loc = locate(&summary, &layout.volume_keywords, layout.volume_row);
    located(&summary, "volume", &volume_loc, &mut warnings);
    let base_volumes = series("volume", &volume_loc, &mut warnings)?;

    if let Some(i) = years.windows(2).position(|w| w[1] <= w[0]) {
        return Err(FeasibilityError::extraction_at(
            &summary.name,
            layout.years_row,
            Some(layout.first_period_col + i + 1),
            format!("years must be strictly increasing ({} then {})", years[i], years[i + 1]),
        ));
    }
    if let Some(i) = base_volumes.iter().position(|v| *v < Decimal::ZERO) {
        return Err(FeasibilityError::extraction_at(
            &summary.name,
            volume_loc.row,
            Some(layout.first_period_col + i),
            format!("volume {} is negative", base_volumes[i]),
        ));
    }

    // Assumptions: investment
    let investment = read_number(
        &assumptions,
        layout.investment.row,
        layout.investment.col,
        &mut warnings,
    );
    if investment <= Decimal::ZERO {
        return Err(FeasibilityError::extraction_at(
            &assumptions.name,
            layout.investment.row,
            Some(layout.investment.col),
            format!("investment must be positive, found {investment}"),
        ));
    }

    let mut model = BaseFinancialModel {
        project_name,
        base_irr: raw_irr,
        reference_npv,
        years,
        base_cash_flow,
        base_volumes,
        investment,
    };

    for correction in normalize_model(&mut model) {
        tracing::info!(%correction, "normalized model");
        warnings.push(correction.to_string());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Workbook extraction (keyword row location, best-effort coercion, unit normalization)",
        &serde_json::json!({
            "source": source.source_id(),
            "layout": layout,
            "cash_flow_row": cash_loc.row,
            "volume_row": volume_loc.row,
        }),
        warnings,
        elapsed,
        model,
    ))
}

/// Open a workbook file and extract the model from it.
///
/// `.json` files are read as an [`InMemoryWorkbook`]; anything else goes
/// through the spreadsheet reader when the `xlsx` feature is enabled.
pub fn extract_file(
    path: &Path,
    layout: &WorkbookLayout,
) -> FeasibilityResult<ComputationOutput<BaseFinancialModel>> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let mut workbook = InMemoryWorkbook::from_json_file(path)?;
        return extract(&mut workbook, layout);
    }

    #[cfg(feature = "xlsx")]
    {
        let mut workbook = crate::source::xlsx::XlsxWorkbook::open(path)?;
        extract(&mut workbook, layout)
    }

    #[cfg(not(feature = "xlsx"))]
    {
        Err(FeasibilityError::InvalidInput {
            field: "path".into(),
            reason: format!(
                "'{}' is not a JSON workbook and spreadsheet support is disabled",
                path.display()
            ),
        })
    }
}
