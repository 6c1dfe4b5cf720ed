//! `= <> < <= > >=`

use std::cmp::Ordering;

use super::broadcast;
use crate::context::EvaluationContext;
use crate::error::FormulaResult;
use crate::token::{OperatorKind, Token};
use crate::value::{parse_number_text, FormulaValue};

/// Tolerance for numeric equality
pub const DOUBLE_PRECISION: f64 = 1e-8;

pub(super) fn calculate(
    kind: OperatorKind,
    lhs: &Token,
    rhs: &Token,
    ctx: &EvaluationContext,
) -> FormulaResult<Token> {
    let left = lhs.value(ctx)?;
    let right = rhs.value(ctx)?;

    if matches!(kind, OperatorKind::Equal | OperatorKind::NotEqual)
        && (is_empty_array(&left) || is_empty_array(&right))
    {
        return Ok(Token::array(vec![vec![false.into()]]));
    }

    Ok(broadcast(left, right, |a, b| compare(kind, a, b)).into_token())
}

fn is_empty_array(value: &FormulaValue) -> bool {
    matches!(value, FormulaValue::Array(rows) if rows.iter().all(Vec::is_empty))
}

/// Numeric view used by comparisons: numbers, booleans and numeric text
fn numeric(value: &FormulaValue) -> Option<f64> {
    match value {
        FormulaValue::String(s) => parse_number_text(s),
        other => other.as_number(),
    }
}

/// Compare two scalars
///
/// A blank operand reads as `0` against a numeric operand and as `""`
/// otherwise. Two numeric operands compare as numbers (equality within
/// [`DOUBLE_PRECISION`]); anything else compares as case-insensitive text.
fn compare(kind: OperatorKind, a: &FormulaValue, b: &FormulaValue) -> FormulaValue {
    if let Some(e) = a.get_error().or_else(|| b.get_error()) {
        return FormulaValue::Error(e);
    }

    let mut x = numeric(a);
    let mut y = numeric(b);
    if matches!(a, FormulaValue::Empty) && y.is_some() {
        x = Some(0.0);
    }
    if matches!(b, FormulaValue::Empty) && x.is_some() {
        y = Some(0.0);
    }

    let result = match (x, y) {
        (Some(x), Some(y)) => match kind {
            OperatorKind::Equal => (x - y).abs() < DOUBLE_PRECISION,
            OperatorKind::NotEqual => (x - y).abs() >= DOUBLE_PRECISION,
            OperatorKind::LessThan => x < y,
            OperatorKind::LessEqual => x <= y,
            OperatorKind::GreaterThan => x > y,
            OperatorKind::GreaterEqual => x >= y,
            _ => return FormulaValue::Error(biffcalc_core::CellError::Value),
        },
        _ => {
            let ordering = a.as_string().to_uppercase().cmp(&b.as_string().to_uppercase());
            match kind {
                OperatorKind::Equal => ordering == Ordering::Equal,
                OperatorKind::NotEqual => ordering != Ordering::Equal,
                OperatorKind::LessThan => ordering == Ordering::Less,
                OperatorKind::LessEqual => ordering != Ordering::Greater,
                OperatorKind::GreaterThan => ordering == Ordering::Greater,
                OperatorKind::GreaterEqual => ordering != Ordering::Less,
                _ => return FormulaValue::Error(biffcalc_core::CellError::Value),
            }
        }
    };
    FormulaValue::Boolean(result)
}
