//! Operator semantics
//!
//! Value operators resolve their operands first (cell references become
//! cell values, areas become arrays) and then apply a scalar rule. When an
//! operand is an array the rule is applied element by element and the
//! result keeps the array's shape. Reference operators work on the
//! references themselves and never look at cell contents.

mod arithmetic;
mod comparison;
mod reference;
mod text;
mod unary;

use biffcalc_core::CellError;

use crate::context::EvaluationContext;
use crate::error::FormulaResult;
use crate::token::{OperatorKind, Token};
use crate::value::FormulaValue;

pub use comparison::DOUBLE_PRECISION;

/// Apply `kind` to operands given in left-to-right order
///
/// A wrong operand count yields a `#VALUE!` token.
pub fn calculate(
    kind: OperatorKind,
    operands: &[Token],
    ctx: &EvaluationContext,
) -> FormulaResult<Token> {
    if operands.len() != kind.arity() {
        log::debug!(
            "operator {:?} called with {} operand(s), expected {}",
            kind,
            operands.len(),
            kind.arity()
        );
        return Ok(Token::error(CellError::Value));
    }

    if kind.is_reference_operator() {
        return reference::calculate(kind, &operands[0], &operands[1], ctx);
    }
    if kind == OperatorKind::UnaryPlus {
        return Ok(operands[0].clone());
    }

    // An error literal propagates unchanged, circular flag included.
    if let Some(error) = operands.iter().find(|t| t.is_error()) {
        if kind == OperatorKind::Power {
            return Ok(Token::error(CellError::Value));
        }
        return Ok(error.clone());
    }

    match kind {
        OperatorKind::Add
        | OperatorKind::Subtract
        | OperatorKind::Multiply
        | OperatorKind::Divide
        | OperatorKind::Power => arithmetic::calculate(kind, &operands[0], &operands[1], ctx),
        OperatorKind::Concat => text::concat(&operands[0], &operands[1], ctx),
        OperatorKind::UnaryMinus | OperatorKind::Percent => {
            unary::calculate(kind, &operands[0], ctx)
        }
        _ => comparison::calculate(kind, &operands[0], &operands[1], ctx),
    }
}

/// Combine two values with `op`, broadcasting over arrays
///
/// Array/scalar pairs apply `op` to every element; two arrays must hold the
/// same number of elements and pair up in row-major order. The result takes
/// the shape of the array operand.
pub(crate) fn broadcast<F>(lhs: FormulaValue, rhs: FormulaValue, op: F) -> FormulaValue
where
    F: Fn(&FormulaValue, &FormulaValue) -> FormulaValue,
{
    match (lhs.is_array(), rhs.is_array()) {
        (false, false) => op(&lhs, &rhs),
        (true, false) => {
            let (elements, cols) = lhs.into_elements();
            let results = elements.iter().map(|v| op(v, &rhs)).collect();
            FormulaValue::from_elements(results, cols)
        }
        (false, true) => {
            let (elements, cols) = rhs.into_elements();
            let results = elements.iter().map(|v| op(&lhs, v)).collect();
            FormulaValue::from_elements(results, cols)
        }
        (true, true) => {
            let (left, cols) = lhs.into_elements();
            let (right, _) = rhs.into_elements();
            if left.len() != right.len() {
                log::debug!(
                    "array operands differ in size ({} vs {})",
                    left.len(),
                    right.len()
                );
                return FormulaValue::Error(CellError::Value);
            }
            let results = left.iter().zip(&right).map(|(a, b)| op(a, b)).collect();
            FormulaValue::from_elements(results, cols)
        }
    }
}

/// Apply `op` to a value, element-wise for arrays
pub(crate) fn map_elements<F>(value: FormulaValue, op: F) -> FormulaValue
where
    F: Fn(&FormulaValue) -> FormulaValue,
{
    if value.is_array() {
        let (elements, cols) = value.into_elements();
        FormulaValue::from_elements(elements.iter().map(op).collect(), cols)
    } else {
        op(&value)
    }
}
