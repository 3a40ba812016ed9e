use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::{Cell, Sheet, TabularSource};
use crate::error::FeasibilityError;
use crate::FeasibilityResult;

/// A workbook held entirely in memory.
///
/// The JSON form maps sheet names to row-major grids:
/// `{"sheets": {"summary": [[null, 2024, 2025], ...]}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryWorkbook {
    #[serde(default)]
    pub id: String,
    pub sheets: BTreeMap<String, Vec<Vec<Cell>>>,
}

impl InMemoryWorkbook {
    pub fn new(id: impl Into<String>) -> Self {
        InMemoryWorkbook {
            id: id.into(),
            sheets: BTreeMap::new(),
        }
    }

    /// Set a single cell, growing the sheet as needed.
    pub fn set(&mut self, sheet: &str, row: usize, col: usize, cell: impl Into<Cell>) {
        let grid = self.sheets.entry(sheet.to_string()).or_default();
        if grid.len() <= row {
            grid.resize_with(row + 1, Vec::new);
        }
        let cells = &mut grid[row];
        if cells.len() <= col {
            cells.resize(col + 1, Cell::Empty);
        }
        cells[col] = cell.into();
    }

    pub fn from_json_str(json: &str) -> FeasibilityResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> FeasibilityResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut workbook = Self::from_json_str(&contents)?;
        if workbook.id.is_empty() {
            workbook.id = path.display().to_string();
        }
        Ok(workbook)
    }
}

impl TabularSource for InMemoryWorkbook {
    fn read_sheet(&mut self, sheet_name: &str) -> FeasibilityResult<Sheet> {
        self.sheets
            .get(sheet_name)
            .map(|rows| Sheet::new(sheet_name, rows.clone()))
            .ok_or_else(|| FeasibilityError::extraction(sheet_name, "required sheet is missing"))
    }

    fn source_id(&self) -> String {
        self.id.clone()
    }
}
