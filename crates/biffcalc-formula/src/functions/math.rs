//! Math functions

use biffcalc_core::{CellAddress, CellValue, MAX_COLS, MAX_ROWS};

use super::criteria::Criteria;
use super::flatten_values;
use crate::context::EvaluationContext;
use crate::error::{CalculationError, FormulaResult};
use crate::token::Token;
use crate::value::{parse_number_text, FormulaValue};

/// Numbers among the arguments
///
/// Inside references and arrays only numbers count. A value typed directly
/// as an argument also counts as a boolean (`TRUE` is 1) or as numeric text,
/// and any other text there is `#VALUE!`. Blanks are skipped and an error
/// anywhere fails the call with that error.
pub(crate) fn collect_numbers(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Vec<f64>> {
    let mut numbers = Vec::new();
    for arg in args {
        if let Token::Error { circular: true, .. } = arg {
            return Err(CalculationError::Circular.into());
        }
        let components = match arg.components(ctx)? {
            Some(components) => components,
            None if arg.is_reference() => vec![arg.clone()],
            None => {
                match arg.value(ctx)? {
                    FormulaValue::Number(n) => numbers.push(n),
                    FormulaValue::Boolean(b) => numbers.push(if b { 1.0 } else { 0.0 }),
                    FormulaValue::String(s) => {
                        numbers.push(parse_number_text(&s).ok_or(CalculationError::Value)?)
                    }
                    FormulaValue::Error(e) => return Err(CalculationError::from(e).into()),
                    value @ FormulaValue::Array(_) => push_numbers(value, &mut numbers)?,
                    FormulaValue::Empty => {}
                }
                continue;
            }
        };
        for token in components {
            if let Token::Error { circular: true, .. } = token {
                return Err(CalculationError::Circular.into());
            }
            push_numbers(token.value(ctx)?, &mut numbers)?;
        }
    }
    Ok(numbers)
}

/// Numeric elements of a referenced or array value
fn push_numbers(value: FormulaValue, numbers: &mut Vec<f64>) -> FormulaResult<()> {
    let (values, _) = value.into_elements();
    for value in values {
        match value {
            FormulaValue::Number(n) => numbers.push(n),
            FormulaValue::Error(e) => return Err(CalculationError::from(e).into()),
            _ => {}
        }
    }
    Ok(())
}

fn total(numbers: &[f64]) -> f64 {
    numbers.iter().fold(0.0, |sum, n| sum + n)
}

/// Cells of a range argument, or the argument itself
fn cells(arg: &Token, ctx: &EvaluationContext) -> FormulaResult<Vec<Token>> {
    Ok(arg.components(ctx)?.unwrap_or_else(|| vec![arg.clone()]))
}

/// SUM(number1, [number2], ...)
pub fn fn_sum(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    let numbers = collect_numbers(args, ctx)?;
    Ok(Token::Number(total(&numbers)))
}

/// AVERAGE(number1, [number2], ...)
pub fn fn_average(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    let numbers = collect_numbers(args, ctx)?;
    if numbers.is_empty() {
        return Err(CalculationError::DivZero.into());
    }
    Ok(Token::Number(total(&numbers) / numbers.len() as f64))
}

/// MIN(number1, [number2], ...); 0 when there are no numbers
pub fn fn_min(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    let numbers = collect_numbers(args, ctx)?;
    let min = numbers.into_iter().reduce(f64::min).unwrap_or(0.0);
    Ok(Token::Number(min))
}

/// MAX(number1, [number2], ...); 0 when there are no numbers
pub fn fn_max(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    let numbers = collect_numbers(args, ctx)?;
    let max = numbers.into_iter().reduce(f64::max).unwrap_or(0.0);
    Ok(Token::Number(max))
}

/// COUNT(value1, [value2], ...) - numeric values only, errors ignored
pub fn fn_count(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    let count = flatten_values(args, ctx)?
        .iter()
        .filter(|v| matches!(v, FormulaValue::Number(_)))
        .count();
    Ok(Token::Number(count as f64))
}

/// Rows and columns of a criteria range holding `count` cells
fn shape(range: &Token, count: usize) -> (u32, u16) {
    match range {
        Token::RangeRef { .. } | Token::CellRef { .. } => range
            .area()
            .map_or((1, 1), |area| (area.row_count(), area.col_count())),
        Token::Array { rows } => (
            rows.len() as u32,
            rows.first().map_or(0, |row| row.len() as u16),
        ),
        _ => (1, count.min(u16::MAX as usize) as u16),
    }
}

/// A sum reference grown or shrunk to `rows` x `cols` from its top-left
/// cell, clipped at the sheet edge
///
/// Other operands are used as they are.
fn resize(sum_range: &Token, (rows, cols): (u32, u16)) -> Token {
    let (sheet, first) = match (sum_range, sum_range.area()) {
        (Token::RangeRef { sheet, .. } | Token::CellRef { sheet, .. }, Some(area)) => {
            (sheet.clone(), area.start)
        }
        _ => return sum_range.clone(),
    };
    let last = CellAddress::new(
        first.row.saturating_add(rows.saturating_sub(1)).min(MAX_ROWS - 1),
        first.col.saturating_add(cols.saturating_sub(1)).min(MAX_COLS - 1),
    );
    Token::RangeRef { sheet, first, last }
}

/// SUMIF(range, criteria, [sum_range])
///
/// `sum_range` (default: `range` itself) takes the shape of `range` from its
/// top-left cell, so `SUMIF(A1:A3, ">0", B1)` sums over B1:B3. Cells are
/// paired in row-major order.
pub fn fn_sumif(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    let (Some(range), Some(criteria)) = (args.first(), args.get(1)) else {
        return Ok(Token::error(biffcalc_core::CellError::Value));
    };
    let criteria = Criteria::from_value(&criteria.value(ctx)?);
    let range_cells = cells(range, ctx)?;
    let sum_cells = match args.get(2) {
        Some(sum_range) => cells(&resize(sum_range, shape(range, range_cells.len())), ctx)?,
        None => range_cells.clone(),
    };

    let mut sum = 0.0;
    for (i, cell) in range_cells.iter().enumerate() {
        let value: CellValue = cell.value(ctx)?.first().clone().into();
        if !criteria.matches(&value, ctx.settings.date_1904) {
            continue;
        }
        let Some(target) = sum_cells.get(i) else {
            continue;
        };
        match target.value(ctx)?.first() {
            FormulaValue::Number(n) => sum += n,
            FormulaValue::Error(e) => return Err(CalculationError::from(*e).into()),
            _ => {}
        }
    }
    Ok(Token::Number(sum))
}
