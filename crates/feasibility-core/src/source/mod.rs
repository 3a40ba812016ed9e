pub mod workbook;

#[cfg(feature = "xlsx")]
pub mod xlsx;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::FeasibilityResult;

/// A single spreadsheet cell as handed over by a tabular reader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Number(Decimal),
    Text(String),
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<Decimal> for Cell {
    fn from(d: Decimal) -> Self {
        Cell::Number(d)
    }
}

/// A 0-based grid of cells. Rows may be ragged; missing cells read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

static EMPTY: Cell = Cell::Empty;

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Sheet {
            name: name.into(),
            rows,
        }
    }

    /// Cell at (row, col), or `Cell::Empty` outside the used range.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Cells `cols` of `row`, padding with empties past the row's end.
    pub fn row_slice(&self, row: usize, cols: std::ops::Range<usize>) -> Vec<&Cell> {
        cols.map(|c| self.cell(row, c)).collect()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// Named-sheet tabular reader. Implementations perform any blocking I/O.
pub trait TabularSource {
    /// Read one sheet by name. A missing sheet is an extraction error.
    fn read_sheet(&mut self, sheet_name: &str) -> FeasibilityResult<Sheet>;

    /// Human-readable identity for logs and error messages.
    fn source_id(&self) -> String;
}
