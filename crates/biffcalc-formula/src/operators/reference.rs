//! Reference operators: intersection, union and range
//!
//! Each operand is first expanded into a list of references. Cell and area
//! references are taken as they are, text and constant arrays are read as
//! reference text (`"A1,B2"`, `{"A1:B2"}`) and names are evaluated to their
//! target. Union and range flatten earlier reference lists to single cells;
//! intersection keeps their areas whole.

use ahash::AHashSet;
use biffcalc_core::CellRange;

use crate::context::EvaluationContext;
use crate::error::{CalculationError, FormulaResult};
use crate::evaluator::evaluate_nested;
use crate::token::{OperatorKind, Reference, Token};

pub(super) fn calculate(
    kind: OperatorKind,
    lhs: &Token,
    rhs: &Token,
    ctx: &EvaluationContext,
) -> FormulaResult<Token> {
    let split_lists = kind != OperatorKind::Intersect;
    let first = expand(lhs, split_lists, ctx)?;
    let second = expand(rhs, split_lists, ctx)?;

    let refs = match kind {
        OperatorKind::Union => union(first, second),
        OperatorKind::Intersect => intersect(&first, &second),
        _ => vec![bounding_area(first.iter().chain(&second))?],
    };
    Ok(Token::ReferenceList(refs))
}

/// Read an operand as a list of references
fn expand(token: &Token, split_lists: bool, ctx: &EvaluationContext) -> FormulaResult<Vec<Reference>> {
    let refs = match token {
        Token::CellRef { sheet, address } => vec![Reference::cell(sheet.clone(), *address)],
        Token::RangeRef { sheet, first, last } => {
            vec![Reference::area(sheet.clone(), CellRange::new(*first, *last))]
        }
        Token::NameRef { .. } | Token::SharedFormula { .. } => {
            let nested = ctx.nested()?;
            let definition = match token {
                Token::NameRef { id } => ctx.resolver.resolve_name(*id)?,
                Token::SharedFormula { anchor } => ctx.resolver.resolve_shared_formula(*anchor)?,
                _ => Vec::new(),
            };
            let target = evaluate_nested(&definition, &nested)?;
            expand(&target, split_lists, &nested)?
        }
        Token::Text(text) => text
            .split(',')
            .map(Reference::parse)
            .collect::<Result<Vec<_>, _>>()?,
        Token::Array { rows } => {
            let mut refs = Vec::new();
            for value in rows.iter().flatten() {
                let text = value.as_string().ok_or(CalculationError::Value)?;
                refs.push(Reference::parse(text)?);
            }
            refs
        }
        Token::ReferenceList(list) if split_lists => {
            list.iter().flat_map(Reference::cells).collect()
        }
        Token::ReferenceList(list) => list.clone(),
        Token::Error { .. } => Vec::new(),
        other => {
            log::debug!("{} cannot be used as a reference", other);
            return Err(CalculationError::Value.into());
        }
    };
    Ok(refs)
}

fn union(mut first: Vec<Reference>, second: Vec<Reference>) -> Vec<Reference> {
    first.extend(second);
    first
}

/// Cells covered by both operands
///
/// Areas are overlapped pair by pair and only the overlaps are split into
/// cells. A cell reached through several overlaps is listed once. Sheet
/// qualifiers are not compared; results carry the sheet of `first`.
fn intersect(first: &[Reference], second: &[Reference]) -> Vec<Reference> {
    let mut seen = AHashSet::new();
    let mut common = Vec::new();
    for reference in first {
        let Some(range) = reference.range() else {
            continue;
        };
        for other in second {
            let Some(overlap) = other.range().and_then(|r| range.intersect(&r)) else {
                continue;
            };
            for address in overlap.cells() {
                if seen.insert((address.row, address.col)) {
                    common.push(Reference::cell(reference.sheet().map(str::to_string), address));
                }
            }
        }
    }
    common
}

/// Smallest area covering every reference
fn bounding_area<'a, I>(refs: I) -> FormulaResult<Reference>
where
    I: IntoIterator<Item = &'a Reference>,
{
    let mut sheet = None;
    let mut bounds: Option<CellRange> = None;
    for reference in refs {
        let Some(range) = reference.range() else {
            return Err(CalculationError::Ref.into());
        };
        if sheet.is_none() {
            sheet = reference.sheet().map(str::to_string);
        }
        bounds = Some(match bounds {
            None => range,
            Some(b) => b.extend_to(&range.start).extend_to(&range.end),
        });
    }
    bounds
        .map(|range| Reference::area(sheet, range))
        .ok_or_else(|| CalculationError::Null.into())
}
