//! Plain values produced by resolving tokens

use crate::context::EvaluationSettings;
use crate::error::CalculationError;
use crate::token::Token;
use biffcalc_core::{date, format_number, CellError, CellValue};

/// A resolved operand or final result
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    /// Row-major 2D array
    Array(Vec<Vec<FormulaValue>>),
    Empty,
}

impl FormulaValue {
    /// Numeric value of numbers and booleans
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(true) => Some(1.0),
            FormulaValue::Boolean(false) => Some(0.0),
            _ => None,
        }
    }

    /// Coerce to a number for arithmetic
    ///
    /// Numeric text parses, date text becomes a serial number and blanks
    /// count as zero when `blank_as_zero` is set.
    pub fn coerce_number(&self, settings: &EvaluationSettings) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            FormulaValue::Empty => settings.blank_as_zero.then_some(0.0),
            FormulaValue::String(s) if s.trim().is_empty() => settings.blank_as_zero.then_some(0.0),
            FormulaValue::String(s) => parse_number_text(s)
                .or_else(|| date::parse_date_serial(s, settings.date_1904)),
            FormulaValue::Error(_) | FormulaValue::Array(_) => None,
        }
    }

    /// Text form as seen by concatenation and text comparisons
    pub fn as_string(&self) -> String {
        match self {
            FormulaValue::Number(n) => format_number(*n),
            FormulaValue::String(s) => s.clone(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) => CellError::Value.to_string(),
        }
    }

    /// Whether the text form reads `true` (any case)
    pub fn is_true_text(&self) -> bool {
        self.as_string().eq_ignore_ascii_case("true")
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    pub fn get_error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, FormulaValue::Array(_))
    }

    /// Top-left element of an array, or the value itself
    pub fn first(&self) -> &FormulaValue {
        match self {
            FormulaValue::Array(rows) => rows
                .first()
                .and_then(|row| row.first())
                .map(FormulaValue::first)
                .unwrap_or(&FormulaValue::Empty),
            other => other,
        }
    }

    /// Flatten to row-major elements plus the column count of the first row
    pub fn into_elements(self) -> (Vec<FormulaValue>, usize) {
        match self {
            FormulaValue::Array(rows) => {
                let cols = rows.first().map(Vec::len).unwrap_or(0);
                (rows.into_iter().flatten().collect(), cols)
            }
            other => (vec![other], 1),
        }
    }

    /// Build an array of `cols` columns from row-major elements
    pub fn from_elements(elements: Vec<FormulaValue>, cols: usize) -> Self {
        let cols = cols.max(1);
        let mut rows = Vec::with_capacity(elements.len().div_ceil(cols));
        let mut iter = elements.into_iter().peekable();
        while iter.peek().is_some() {
            rows.push(iter.by_ref().take(cols).collect());
        }
        FormulaValue::Array(rows)
    }

    /// Wrap as a token for the value stack
    pub fn into_token(self) -> Token {
        match self {
            FormulaValue::Number(n) => Token::Number(n),
            FormulaValue::String(s) => Token::Text(s),
            FormulaValue::Boolean(b) => Token::Boolean(b),
            FormulaValue::Error(e) => Token::error(e),
            FormulaValue::Empty => Token::Blank,
            FormulaValue::Array(rows) => Token::Array {
                rows: rows
                    .into_iter()
                    .map(|row| row.into_iter().map(CellValue::from).collect())
                    .collect(),
            },
        }
    }
}

impl From<CellValue> for FormulaValue {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(n),
            CellValue::String(s) => FormulaValue::String(s),
            CellValue::Boolean(b) => FormulaValue::Boolean(b),
            CellValue::Error(e) => FormulaValue::Error(e),
        }
    }
}

impl From<FormulaValue> for CellValue {
    fn from(value: FormulaValue) -> Self {
        match value {
            FormulaValue::Empty => CellValue::Empty,
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::String(s) => CellValue::String(s),
            FormulaValue::Boolean(b) => CellValue::Boolean(b),
            FormulaValue::Error(e) => CellValue::Error(e),
            FormulaValue::Array(_) => CellValue::Error(CellError::Value),
        }
    }
}

impl From<CalculationError> for FormulaValue {
    fn from(error: CalculationError) -> Self {
        FormulaValue::Error(error.cell_error())
    }
}

/// Parse numeric text (`"12"`, `" -3.5e2 "`); rejects infinities and NaN
pub fn parse_number_text(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_coerce_number() {
        let settings = EvaluationSettings::default();
        assert_eq!(FormulaValue::String(" 12 ".into()).coerce_number(&settings), Some(12.0));
        assert_eq!(FormulaValue::Boolean(true).coerce_number(&settings), Some(1.0));
        assert_eq!(FormulaValue::Empty.coerce_number(&settings), Some(0.0));
        assert_eq!(FormulaValue::String("abc".into()).coerce_number(&settings), None);
        assert_eq!(FormulaValue::String("inf".into()).coerce_number(&settings), None);
        assert_eq!(
            FormulaValue::String("2024-01-15".into()).coerce_number(&settings),
            Some(45306.0)
        );

        let strict = settings.with_blank_as_zero(false);
        assert_eq!(FormulaValue::Empty.coerce_number(&strict), None);
    }

    #[test]
    fn test_elements_round_trip_shape() {
        let array = FormulaValue::Array(vec![
            vec![FormulaValue::Number(1.0), FormulaValue::Number(2.0)],
            vec![FormulaValue::Number(3.0), FormulaValue::Number(4.0)],
        ]);
        let (elements, cols) = array.clone().into_elements();
        assert_eq!(cols, 2);
        assert_eq!(elements.len(), 4);
        assert_eq!(FormulaValue::from_elements(elements, cols), array);
    }

    #[test]
    fn test_first_and_text() {
        let array = FormulaValue::Array(vec![vec![FormulaValue::Boolean(true)]]);
        assert_eq!(array.first(), &FormulaValue::Boolean(true));
        assert!(array.first().is_true_text());
        assert_eq!(FormulaValue::Number(5.5).as_string(), "5.5");
        assert_eq!(FormulaValue::Error(CellError::Na).as_string(), "#N/A");
    }
}
