//! Information functions

use biffcalc_core::CellError;

use crate::context::EvaluationContext;
use crate::error::FormulaResult;
use crate::token::Token;
use crate::value::FormulaValue;

/// Resolve the single argument of an IS* function
///
/// A reference that fails to resolve reads as its error value. Arrays are
/// represented by their top-left element.
fn tested_value(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Option<FormulaValue>> {
    let [arg] = args else {
        return Ok(None);
    };
    let value = match arg.value(ctx) {
        Ok(value) => value,
        Err(e) => match e.as_calculation() {
            Some(calc) => FormulaValue::from(calc),
            None => return Err(e),
        },
    };
    Ok(Some(value.first().clone()))
}

fn is(args: &[Token], ctx: &EvaluationContext, test: fn(&FormulaValue) -> bool) -> FormulaResult<Token> {
    Ok(match tested_value(args, ctx)? {
        Some(value) => Token::Boolean(test(&value)),
        None => Token::error(CellError::Value),
    })
}

/// ISBLANK(value)
pub fn fn_isblank(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    is(args, ctx, |v| matches!(v, FormulaValue::Empty))
}

/// ISNUMBER(value)
pub fn fn_isnumber(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    is(args, ctx, |v| matches!(v, FormulaValue::Number(_)))
}

/// ISTEXT(value)
pub fn fn_istext(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    is(args, ctx, |v| matches!(v, FormulaValue::String(_)))
}

/// ISLOGICAL(value)
pub fn fn_islogical(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    is(args, ctx, |v| matches!(v, FormulaValue::Boolean(_)))
}

/// ISERROR(value)
pub fn fn_iserror(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    is(args, ctx, FormulaValue::is_error)
}

/// ISERR(value) - any error except #N/A
pub fn fn_iserr(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    is(args, ctx, |v| v.is_error() && v.get_error() != Some(CellError::Na))
}

/// ISNA(value)
pub fn fn_isna(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    is(args, ctx, |v| v.get_error() == Some(CellError::Na))
}

/// NA()
pub fn fn_na(_args: &[Token], _ctx: &EvaluationContext) -> FormulaResult<Token> {
    Ok(Token::error(CellError::Na))
}
