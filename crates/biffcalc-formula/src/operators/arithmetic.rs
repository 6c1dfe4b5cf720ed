//! `+ - * / ^`

use biffcalc_core::CellError;

use super::broadcast;
use crate::context::{EvaluationContext, EvaluationSettings};
use crate::error::FormulaResult;
use crate::token::{OperatorKind, Token};
use crate::value::FormulaValue;

pub(super) fn calculate(
    kind: OperatorKind,
    lhs: &Token,
    rhs: &Token,
    ctx: &EvaluationContext,
) -> FormulaResult<Token> {
    let left = lhs.value(ctx)?;
    let right = rhs.value(ctx)?;
    let settings = ctx.settings;
    let result = broadcast(left, right, |a, b| apply(kind, a, b, &settings));
    Ok(result.into_token())
}

/// Scalar rule shared by all five operators
fn apply(
    kind: OperatorKind,
    a: &FormulaValue,
    b: &FormulaValue,
    settings: &EvaluationSettings,
) -> FormulaValue {
    // Power reports any non-numeric operand, errors included, as #VALUE!.
    if let Some(e) = a.get_error().or_else(|| b.get_error()) {
        return match kind {
            OperatorKind::Power => FormulaValue::Error(CellError::Value),
            _ => FormulaValue::Error(e),
        };
    }
    let (Some(x), Some(y)) = (a.coerce_number(settings), b.coerce_number(settings)) else {
        return FormulaValue::Error(CellError::Value);
    };

    let result = match kind {
        OperatorKind::Add => x + y,
        OperatorKind::Subtract => x - y,
        OperatorKind::Multiply => x * y,
        OperatorKind::Divide => {
            if y == 0.0 {
                return FormulaValue::Error(CellError::Div0);
            }
            x / y
        }
        OperatorKind::Power => x.powf(y),
        _ => return FormulaValue::Error(CellError::Value),
    };

    if result.is_finite() {
        FormulaValue::Number(result)
    } else {
        FormulaValue::Error(CellError::Num)
    }
}
