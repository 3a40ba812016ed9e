use serde::{Deserialize, Serialize};

/// A fixed 0-based cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub const fn new(row: usize, col: usize) -> Self {
        CellRef { row, col }
    }
}

/// Sheet names, coordinates and row keywords of the feasibility workbook.
///
/// Defaults describe the historical layout; any field can be overridden
/// from JSON when a workbook revision moves things around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookLayout {
    pub commercial_sheet: String,
    pub summary_sheet: String,
    pub assumptions_sheet: String,

    pub project_name: CellRef,
    pub reference_npv: CellRef,
    pub reference_irr: CellRef,
    pub investment: CellRef,

    pub years_row: usize,
    pub cash_flow_row: usize,
    pub volume_row: usize,
    /// First column holding a period value (column 0 carries labels)
    pub first_period_col: usize,
    /// Maximum number of periods read from each series row
    pub max_periods: usize,

    pub cash_flow_keywords: Vec<String>,
    pub volume_keywords: Vec<String>,
}

impl Default for WorkbookLayout {
    fn default() -> Self {
        WorkbookLayout {
            commercial_sheet: "Commercial Input".into(),
            summary_sheet: "summary".into(),
            assumptions_sheet: "AP 1. Assumption".into(),
            project_name: CellRef::new(6, 2),
            reference_npv: CellRef::new(6, 5),
            reference_irr: CellRef::new(7, 5),
            investment: CellRef::new(13, 2),
            years_row: 6,
            cash_flow_row: 39,
            volume_row: 7,
            first_period_col: 1,
            max_periods: 7,
            cash_flow_keywords: vec![
                "Net cash flow".into(),
                "Net Cash Flow".into(),
                "순현금흐름".into(),
            ],
            volume_keywords: vec![
                "Sales volume".into(),
                "Sales Volume".into(),
                "판매량".into(),
            ],
        }
    }
}

impl WorkbookLayout {
    pub fn period_cols(&self) -> std::ops::Range<usize> {
        self.first_period_col..self.first_period_col + self.max_periods
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override_keeps_defaults() {
        let layout: WorkbookLayout =
            serde_json::from_str(r#"{"summary_sheet": "CF", "cash_flow_row": 41}"#).unwrap();
        assert_eq!(layout.summary_sheet, "CF");
        assert_eq!(layout.cash_flow_row, 41);
        assert_eq!(layout.commercial_sheet, "Commercial Input");
        assert_eq!(layout.period_cols(), 1..8);
    }
}
