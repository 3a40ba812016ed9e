use serde::{Deserialize, Serialize};

use crate::source::Sheet;

/// Where a series was found, and whether a keyword or the fallback decided it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowLocation {
    pub row: usize,
    /// The label text that matched, `None` when the fallback row was used
    pub matched: Option<String>,
}

impl RowLocation {
    pub fn is_fallback(&self) -> bool {
        self.matched.is_none()
    }
}

/// Find the row whose first-column label contains any of `patterns`.
///
/// Matching is case-sensitive substring search. When several rows match the
/// last one wins; when none match `fallback_row` is returned unchanged.
pub fn locate(sheet: &Sheet, patterns: &[String], fallback_row: usize) -> RowLocation {
    let found = (0..sheet.height())
        .filter_map(|row| {
            let label = sheet.cell(row, 0).as_text()?;
            patterns
                .iter()
                .any(|p| !p.is_empty() && label.contains(p.as_str()))
                .then(|| (row, label.trim().to_string()))
        })
        .last();

    match found {
        Some((row, label)) => RowLocation {
            row,
            matched: Some(label),
        },
        None => RowLocation {
            row: fallback_row,
            matched: None,
        },
    }
}
