use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::{Cell, Sheet, TabularSource};
use crate::error::FeasibilityError;
use crate::FeasibilityResult;

/// Excel-family workbook (xlsx, xls, xlsb, ods) read through calamine.
pub struct XlsxWorkbook {
    path: PathBuf,
    workbook: Sheets<BufReader<File>>,
}

impl XlsxWorkbook {
    pub fn open(path: &Path) -> FeasibilityResult<Self> {
        let workbook = open_workbook_auto(path).map_err(|e| {
            FeasibilityError::Io(format!("Failed to open '{}': {}", path.display(), e))
        })?;
        Ok(XlsxWorkbook {
            path: path.to_path_buf(),
            workbook,
        })
    }
}

fn convert(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Decimal::from_f64(*f).map_or(Cell::Empty, Cell::Number),
        Data::Int(i) => Cell::Number(Decimal::from(*i)),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Decimal::from_f64(dt.as_f64()).map_or(Cell::Empty, Cell::Number),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("#{e:?}")),
    }
}

impl TabularSource for XlsxWorkbook {
    fn read_sheet(&mut self, sheet_name: &str) -> FeasibilityResult<Sheet> {
        if !self.workbook.sheet_names().iter().any(|n| n == sheet_name) {
            return Err(FeasibilityError::extraction(
                sheet_name,
                "required sheet is missing",
            ));
        }
        let range = self
            .workbook
            .worksheet_range(sheet_name)
            .map_err(|e| FeasibilityError::extraction(sheet_name, e.to_string()))?;

        // calamine trims leading empty rows/columns; restore absolute positions
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
        for data_row in range.rows() {
            let mut cells = vec![Cell::Empty; col_offset];
            cells.extend(data_row.iter().map(convert));
            rows.push(cells);
        }

        tracing::debug!(sheet = sheet_name, rows = rows.len(), "read worksheet");
        Ok(Sheet::new(sheet_name, rows))
    }

    fn source_id(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_convert_cells() {
        assert_eq!(convert(&Data::Empty), Cell::Empty);
        assert_eq!(convert(&Data::Int(2024)), Cell::Number(dec!(2024)));
        assert_eq!(convert(&Data::Float(38.5)), Cell::Number(dec!(38.5)));
        assert_eq!(
            convert(&Data::String("1,200 KRW".into())),
            Cell::Text("1,200 KRW".into())
        );
    }

    #[test]
    fn test_offset_range_keeps_absolute_positions() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/offset.xlsx");
        let mut workbook = XlsxWorkbook::open(&path).unwrap();
        let sheet = workbook.read_sheet("summary").unwrap();

        // Used range is B3:D5
        assert_eq!(sheet.height(), 5);
        assert_eq!(sheet.cell(0, 0), &Cell::Empty);
        assert_eq!(sheet.cell(2, 0), &Cell::Empty);
        assert_eq!(sheet.cell(2, 1), &Cell::Text("Net cash flow".into()));
        assert_eq!(sheet.cell(2, 2), &Cell::Number(dec!(2025)));
        assert_eq!(sheet.cell(2, 3), &Cell::Number(dec!(100.5)));
        assert_eq!(sheet.cell(3, 2), &Cell::Empty);
        assert_eq!(sheet.cell(4, 2), &Cell::Number(dec!(7)));
    }

    #[test]
    fn test_absent_sheet_is_extraction_error() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/offset.xlsx");
        let mut workbook = XlsxWorkbook::open(&path).unwrap();
        assert!(matches!(
            workbook.read_sheet("Assumptions"),
            Err(FeasibilityError::Extraction { .. })
        ));
    }
}
