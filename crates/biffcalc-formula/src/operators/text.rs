//! `&`

use biffcalc_core::CellError;

use crate::context::EvaluationContext;
use crate::error::FormulaResult;
use crate::token::Token;
use crate::value::FormulaValue;

/// Join the text forms of two scalars
///
/// Array operands are not supported and produce `#VALUE!`.
pub(super) fn concat(lhs: &Token, rhs: &Token, ctx: &EvaluationContext) -> FormulaResult<Token> {
    let left = lhs.value(ctx)?;
    let right = rhs.value(ctx)?;

    if left.is_array() || right.is_array() {
        log::warn!("concatenation of array operands is not supported");
        return Ok(Token::error(CellError::Value));
    }
    if let Some(e) = left.get_error().or_else(|| right.get_error()) {
        return Ok(Token::error(e));
    }

    let mut joined = left.as_string();
    joined.push_str(&right.as_string());
    Ok(FormulaValue::String(joined).into_token())
}

#[cfg(test)]
mod tests {
    use super::*;
    use biffcalc_core::CellValue;
    use pretty_assertions::assert_eq;

    fn join(lhs: Token, rhs: Token) -> Token {
        concat(&lhs, &rhs, &EvaluationContext::simple()).unwrap()
    }

    #[test]
    fn test_concat_text_forms() {
        assert_eq!(join(Token::text("a"), Token::text("b")), Token::text("ab"));
        assert_eq!(join(Token::Integer(5), Token::text("x")), Token::text("5x"));
        assert_eq!(join(Token::Number(5.5), Token::Blank), Token::text("5.5"));
        assert_eq!(join(Token::Number(5.0), Token::Number(3.0)), Token::text("53"));
        assert_eq!(
            join(Token::Boolean(true), Token::Number(1.0)),
            Token::text("TRUE1")
        );
    }

    #[test]
    fn test_concat_rejects_arrays() {
        let array = Token::array(vec![vec![CellValue::from("a")]]);
        assert_eq!(
            join(array, Token::text("b")),
            Token::error(CellError::Value)
        );
    }
}
