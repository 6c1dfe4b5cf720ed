//! Unary minus and percent

use biffcalc_core::CellError;

use super::map_elements;
use crate::context::EvaluationContext;
use crate::error::FormulaResult;
use crate::token::{OperatorKind, Token};
use crate::value::FormulaValue;

pub(super) fn calculate(
    kind: OperatorKind,
    operand: &Token,
    ctx: &EvaluationContext,
) -> FormulaResult<Token> {
    // Integers keep their type under negation.
    if let (OperatorKind::UnaryMinus, Token::Integer(i)) = (kind, operand) {
        return Ok(match i.checked_neg() {
            Some(n) => Token::Integer(n),
            None => Token::Number(-(*i as f64)),
        });
    }

    let settings = ctx.settings;
    let value = operand.value(ctx)?;
    let result = map_elements(value, |v| {
        if let Some(e) = v.get_error() {
            return FormulaValue::Error(e);
        }
        match v.coerce_number(&settings) {
            Some(n) if kind == OperatorKind::Percent => FormulaValue::Number(n / 100.0),
            Some(n) => FormulaValue::Number(0.0 - n),
            None => FormulaValue::Error(CellError::Value),
        }
    });
    Ok(result.into_token())
}
