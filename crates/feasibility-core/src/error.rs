use rust_decimal::Decimal;
use thiserror::Error;

/// Why the IRR solver gave up on a cash-flow series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceReason {
    /// Every flow has the same sign (or is zero), so no rate zeroes NPV.
    NoSignChange,
    /// NPV never changes sign inside the search domain.
    NoBracket,
    /// The iteration budget ran out before NPV reached tolerance.
    IterationLimit,
}

impl std::fmt::Display for ConvergenceReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvergenceReason::NoSignChange => {
                write!(f, "cash flows have no sign change")
            }
            ConvergenceReason::NoBracket => {
                write!(f, "no NPV sign change inside the rate domain")
            }
            ConvergenceReason::IterationLimit => write!(f, "iteration limit reached"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FeasibilityError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Extraction failed on sheet '{sheet}'{}: {reason}", location(.row, .col))]
    Extraction {
        sheet: String,
        row: Option<usize>,
        col: Option<usize>,
        reason: String,
    },

    #[error("IRR did not converge after {iterations} iterations ({reason}); cash flows: {}", render_flows(.cash_flows))]
    NoConvergence {
        reason: ConvergenceReason,
        iterations: u32,
        cash_flows: Vec<Decimal>,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl FeasibilityError {
    pub(crate) fn extraction(sheet: &str, reason: impl Into<String>) -> Self {
        FeasibilityError::Extraction {
            sheet: sheet.to_string(),
            row: None,
            col: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn extraction_at(
        sheet: &str,
        row: usize,
        col: Option<usize>,
        reason: impl Into<String>,
    ) -> Self {
        FeasibilityError::Extraction {
            sheet: sheet.to_string(),
            row: Some(row),
            col,
            reason: reason.into(),
        }
    }
}

fn location(row: &Option<usize>, col: &Option<usize>) -> String {
    match (*row, *col) {
        (Some(r), Some(c)) => format!(" at row {r}, col {c}"),
        (Some(r), None) => format!(" at row {r}"),
        (None, Some(c)) => format!(" at col {c}"),
        (None, None) => String::new(),
    }
}

fn render_flows(flows: &[Decimal]) -> String {
    let parts: Vec<String> = flows.iter().map(|cf| cf.normalize().to_string()).collect();
    format!("[{}]", parts.join(", "))
}

impl From<serde_json::Error> for FeasibilityError {
    fn from(e: serde_json::Error) -> Self {
        FeasibilityError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for FeasibilityError {
    fn from(e: std::io::Error) -> Self {
        FeasibilityError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_extraction_message_names_sheet_and_row() {
        let err = FeasibilityError::extraction_at("summary", 39, None, "cash flow series is empty");
        assert_eq!(
            err.to_string(),
            "Extraction failed on sheet 'summary' at row 39: cash flow series is empty"
        );
    }

    #[test]
    fn test_no_convergence_message_lists_flows() {
        let err = FeasibilityError::NoConvergence {
            reason: ConvergenceReason::NoSignChange,
            iterations: 0,
            cash_flows: vec![dec!(-100), dec!(-50.0)],
        };
        let msg = err.to_string();
        assert!(msg.contains("no sign change"));
        assert!(msg.contains("[-100, -50]"));
    }
}
