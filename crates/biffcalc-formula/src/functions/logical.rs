//! Logical functions

use biffcalc_core::CellError;

use super::flatten_args;
use crate::context::EvaluationContext;
use crate::error::FormulaResult;
use crate::token::Token;
use crate::value::FormulaValue;

/// Truth value of a scalar
///
/// Booleans are themselves and text counts only when it reads `true` or
/// `false` (any case). Numbers are neither.
fn truth(value: &FormulaValue) -> Option<bool> {
    match value {
        FormulaValue::Boolean(b) => Some(*b),
        FormulaValue::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        FormulaValue::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Element `index` of an array branch, or a scalar branch as-is
fn pick(branch: &FormulaValue, index: usize) -> FormulaValue {
    match branch {
        FormulaValue::Array(rows) => rows
            .iter()
            .flatten()
            .nth(index)
            .cloned()
            .unwrap_or(FormulaValue::Error(CellError::Na)),
        other => other.clone(),
    }
}

/// An omitted IF branch evaluates to zero
fn branch(arg: Option<&Token>) -> Token {
    match arg {
        None | Some(Token::Missing) => Token::Number(0.0),
        Some(token) => token.clone(),
    }
}

/// IF(condition, [value_if_true], [value_if_false])
///
/// A scalar condition selects one of the branch tokens unchanged, so a
/// reference branch stays a reference. An array condition selects element
/// by element; array branches are indexed in step and run out as `#N/A`.
pub fn fn_if(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    let Some(condition) = args.first().filter(|_| args.len() <= 3) else {
        return Ok(Token::error(CellError::Value));
    };
    let if_true = branch(args.get(1));
    let if_false = branch(args.get(2));

    let condition = if condition.is_reference() {
        match condition.value(ctx) {
            Ok(value) => value,
            Err(e) => {
                log::debug!("IF condition {} did not resolve: {}", condition, e);
                return Ok(Token::error(CellError::Value));
            }
        }
    } else {
        condition.value(ctx)?
    };

    match condition {
        FormulaValue::Array(_) => {
            let true_values = if_true.value(ctx)?;
            let false_values = if_false.value(ctx)?;
            let (conditions, cols) = condition.into_elements();
            let results = conditions
                .iter()
                .enumerate()
                .map(|(i, c)| match c {
                    FormulaValue::Error(e) => FormulaValue::Error(*e),
                    c if truth(c) == Some(true) => pick(&true_values, i),
                    _ => pick(&false_values, i),
                })
                .collect();
            Ok(FormulaValue::from_elements(results, cols).into_token())
        }
        FormulaValue::Error(e) => Ok(Token::error(e)),
        c if truth(&c) == Some(true) => Ok(if_true),
        _ => Ok(if_false),
    }
}

/// AND(logical1, [logical2], ...)
///
/// Stops at the first false component; later arguments are not resolved.
pub fn fn_and(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    for arg in args {
        for component in flatten_args(std::slice::from_ref(arg), ctx)? {
            if truth(&component.value(ctx)?) == Some(false) {
                return Ok(Token::Boolean(false));
            }
        }
    }
    Ok(Token::Boolean(true))
}

/// OR(logical1, [logical2], ...)
pub fn fn_or(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    for arg in args {
        for component in flatten_args(std::slice::from_ref(arg), ctx)? {
            if truth(&component.value(ctx)?) == Some(true) {
                return Ok(Token::Boolean(true));
            }
        }
    }
    Ok(Token::Boolean(false))
}

/// NOT(logical)
pub fn fn_not(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    let [arg] = args else {
        return Ok(Token::error(CellError::Value));
    };
    let value = arg.value(ctx)?;
    Ok(Token::Boolean(truth(value.first()) == Some(false)))
}

/// IFERROR(value, value_if_error)
///
/// Arrays are checked element by element.
pub fn fn_iferror(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    let [value, fallback] = args else {
        return Ok(Token::error(CellError::Value));
    };

    let resolved = match value.value(ctx) {
        Ok(resolved) => resolved,
        Err(e) if e.as_calculation().is_some() => return Ok(fallback.clone()),
        Err(e) => return Err(e),
    };

    if resolved.is_array() {
        let replacement = fallback.value(ctx)?;
        let (elements, cols) = resolved.into_elements();
        let results = elements
            .into_iter()
            .enumerate()
            .map(|(i, v)| if v.is_error() { pick(&replacement, i) } else { v })
            .collect();
        return Ok(FormulaValue::from_elements(results, cols).into_token());
    }

    if resolved.is_error() {
        Ok(fallback.clone())
    } else {
        Ok(value.clone())
    }
}

/// TRUE()
pub fn fn_true(_args: &[Token], _ctx: &EvaluationContext) -> FormulaResult<Token> {
    Ok(Token::Boolean(true))
}

/// FALSE()
pub fn fn_false(_args: &[Token], _ctx: &EvaluationContext) -> FormulaResult<Token> {
    Ok(Token::Boolean(false))
}
