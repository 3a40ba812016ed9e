use rust_decimal::Decimal;
use std::str::FromStr;

use crate::source::Cell;

/// Substrings stripped from text cells before parsing.
const NOISE: &[&str] = &[",", "%", "KRW", "₩", "$"];

/// Result of a best-effort conversion: the value plus an optional diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub value: Decimal,
    pub warning: Option<String>,
}

impl Coerced {
    fn ok(value: Decimal) -> Self {
        Coerced {
            value,
            warning: None,
        }
    }

    fn failed(reason: String) -> Self {
        Coerced {
            value: Decimal::ZERO,
            warning: Some(reason),
        }
    }
}

/// Convert a cell to a number, falling back to zero.
///
/// Never fails; see [`coerce_cell`] for the diagnostic.
pub fn coerce(cell: &Cell) -> Decimal {
    coerce_cell(cell).value
}

/// Convert a cell to a number, reporting why a non-empty cell became zero.
pub fn coerce_cell(cell: &Cell) -> Coerced {
    match cell {
        Cell::Empty => Coerced::ok(Decimal::ZERO),
        Cell::Number(n) => Coerced::ok(*n),
        Cell::Text(text) => {
            let cleaned = strip_noise(text);
            if cleaned.is_empty() {
                return Coerced::ok(Decimal::ZERO);
            }
            match parse_number(&cleaned) {
                Some(value) => Coerced::ok(value),
                None => Coerced::failed(format!("could not parse '{text}' as a number")),
            }
        }
    }
}

/// Missing-value markers a workbook export may leave behind.
fn is_missing_marker(s: &str) -> bool {
    matches!(s, "nan" | "NaN" | "-" | "#N/A")
}

fn strip_noise(text: &str) -> String {
    let mut cleaned = text.to_string();
    for token in NOISE {
        cleaned = cleaned.replace(token, "");
    }
    let cleaned = cleaned.trim();
    if is_missing_marker(cleaned) {
        String::new()
    } else {
        cleaned.to_string()
    }
}

fn parse_number(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn text(s: &str) -> Cell {
        Cell::Text(s.into())
    }

    #[test]
    fn test_thousands_and_currency() {
        assert_eq!(coerce(&text("1,234,567 KRW")), dec!(1234567));
        assert_eq!(coerce(&text("₩ 590,000,000")), dec!(590000000));
    }

    #[test]
    fn test_percent_sign() {
        assert_eq!(coerce(&text("38.4%")), dec!(38.4));
    }

    #[test]
    fn test_missing_values() {
        assert_eq!(coerce(&Cell::Empty), Decimal::ZERO);
        assert_eq!(coerce_cell(&text("  ")).warning, None);
        assert_eq!(coerce_cell(&text("nan")).warning, None);
    }

    #[test]
    fn test_unparseable_text_falls_back_with_warning() {
        let result = coerce_cell(&text("not a number"));
        assert_eq!(result.value, Decimal::ZERO);
        assert!(result.warning.unwrap().contains("not a number"));
    }

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(coerce(&Cell::Number(dec!(-12.5))), dec!(-12.5));
        assert_eq!(coerce(&text("-33,326,857")), dec!(-33326857));
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(coerce(&text("1.5e6")), dec!(1500000));
    }
}
