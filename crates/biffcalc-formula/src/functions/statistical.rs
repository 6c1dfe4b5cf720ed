//! Statistical functions

use biffcalc_core::{CellError, CellValue};

use super::criteria::Criteria;
use crate::context::EvaluationContext;
use crate::error::FormulaResult;
use crate::token::Token;

/// COUNTIF(range, criteria)
pub fn fn_countif(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    let [range, criteria] = args else {
        return Ok(Token::error(CellError::Value));
    };
    let criteria = Criteria::from_value(&criteria.value(ctx)?);
    let cells = range
        .components(ctx)?
        .unwrap_or_else(|| vec![range.clone()]);

    let mut count = 0usize;
    for cell in &cells {
        let value: CellValue = cell.value(ctx)?.first().clone().into();
        if criteria.matches(&value, ctx.settings.date_1904) {
            count += 1;
        }
    }
    Ok(Token::Number(count as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_countif() {
        let ctx = EvaluationContext::simple();
        let values = Token::array(vec![
            vec![CellValue::Number(1.0), CellValue::Number(5.0)],
            vec![CellValue::from("five"), CellValue::Number(5.0)],
        ]);
        assert_eq!(
            fn_countif(&[values.clone(), Token::Integer(5)], &ctx).unwrap(),
            Token::Number(2.0)
        );
        assert_eq!(
            fn_countif(&[values.clone(), Token::text("<>5")], &ctx).unwrap(),
            Token::Number(2.0)
        );
        assert_eq!(
            fn_countif(&[values, Token::text("F*")], &ctx).unwrap(),
            Token::Number(1.0)
        );
    }

    #[test]
    fn test_countif_arity() {
        let ctx = EvaluationContext::simple();
        assert_eq!(
            fn_countif(&[Token::Integer(1)], &ctx).unwrap(),
            Token::error(CellError::Value)
        );
    }
}
