//! Token-stack evaluator
//!
//! Tokens are consumed in stored (postfix) order. Operands are pushed onto
//! a value stack; operators and functions pop their operands, restore them
//! to left-to-right order and push their result. Shared-formula tokens are
//! replaced in the input by the body they point to. A well-formed sequence
//! leaves exactly one value behind.
//!
//! Calculation failures (division by zero, unresolvable references, circular
//! dependencies) never abort an evaluation: they are trapped and replaced by
//! an error token, which then propagates like any other value.

use crate::context::{EvaluationContext, EvaluationSettings, ResolverContext};
use crate::error::{FormulaError, FormulaResult};
use crate::functions;
use crate::operators;
use crate::token::{ControlKind, Token};
use crate::value::FormulaValue;
use biffcalc_core::CellError;

/// Evaluates token sequences against a resolver
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    settings: EvaluationSettings,
}

impl Evaluator {
    pub fn new(settings: EvaluationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    /// Context over `resolver` carrying this evaluator's settings
    pub fn context<'a>(&self, resolver: &'a dyn ResolverContext) -> EvaluationContext<'a> {
        EvaluationContext::new(resolver, self.settings)
    }

    /// Evaluate to the final token, references left unresolved
    pub fn evaluate_to_token(
        &self,
        tokens: &[Token],
        resolver: &dyn ResolverContext,
    ) -> FormulaResult<Token> {
        run(tokens, &self.context(resolver))
    }

    /// Evaluate to a plain value
    ///
    /// A reference result is resolved (a single cell to its value, an area to
    /// an array).
    pub fn evaluate(
        &self,
        tokens: &[Token],
        resolver: &dyn ResolverContext,
    ) -> FormulaResult<FormulaValue> {
        let ctx = self.context(resolver);
        let result = run(tokens, &ctx)?;
        match result.value(&ctx) {
            Ok(value) => Ok(value),
            Err(e) => match e.as_calculation() {
                Some(calc) => Ok(FormulaValue::Error(calc.cell_error())),
                None => Err(e),
            },
        }
    }
}

/// Evaluate with default settings
pub fn evaluate(tokens: &[Token], resolver: &dyn ResolverContext) -> FormulaResult<FormulaValue> {
    Evaluator::default().evaluate(tokens, resolver)
}

/// Evaluate with default settings, keeping the final token
pub fn evaluate_to_token(tokens: &[Token], resolver: &dyn ResolverContext) -> FormulaResult<Token> {
    Evaluator::default().evaluate_to_token(tokens, resolver)
}

/// Evaluate a name definition or shared-formula body inside another
/// evaluation
///
/// A circular error result is raised again so the caller traps it with its
/// circular marker intact.
pub(crate) fn evaluate_nested(tokens: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    match run(tokens, ctx)? {
        Token::Error { circular: true, .. } => {
            Err(crate::error::CalculationError::Circular.into())
        }
        token => Ok(token),
    }
}

fn run(tokens: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
    let mut input: Vec<Token> = tokens.iter().rev().cloned().collect();
    let mut values: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut splices = 0usize;

    while let Some(token) = input.pop() {
        log::trace!("token {:?} (stack depth {})", token, values.len());
        match token {
            Token::SharedFormula { anchor } => {
                splices += 1;
                if splices > ctx.settings.max_nesting_depth {
                    log::warn!("shared formula at {} expands without end", anchor);
                    values.push(Token::from_calculation(
                        crate::error::CalculationError::Circular,
                    ));
                    continue;
                }
                match ctx.resolver.resolve_shared_formula(anchor) {
                    Ok(body) => input.extend(body.into_iter().rev()),
                    Err(e) => values.push(trap(Err(e))?),
                }
            }
            Token::Control(ControlKind::AttrSum) => {
                let args = pop_operands(&mut values, 1, &token)?;
                values.push(trap(functions::math::fn_sum(&args, ctx))?);
            }
            Token::Control(_) => {}
            Token::Operator(kind) => {
                let args = pop_operands(&mut values, kind.arity(), &token)?;
                values.push(trap(operators::calculate(kind, &args, ctx))?);
            }
            Token::Function { id, arg_count, .. } => {
                let args = pop_operands(&mut values, arg_count as usize, &token)?;
                values.push(trap(functions::registry().call(id, &args, ctx))?);
            }
            operand => values.push(operand),
        }
    }

    match values.len() {
        1 => Ok(values.pop().unwrap_or(Token::error(CellError::Value))),
        remaining => {
            log::warn!(
                "token sequence left {} value(s) on the stack instead of one",
                remaining
            );
            Err(FormulaError::UnbalancedStack { remaining })
        }
    }
}

/// Pop `count` operands in call (left-to-right) order
fn pop_operands(values: &mut Vec<Token>, count: usize, token: &Token) -> FormulaResult<Vec<Token>> {
    if values.len() < count {
        log::warn!(
            "{} needs {} operand(s) but the stack holds {}",
            token,
            count,
            values.len()
        );
        return Err(FormulaError::StackUnderflow {
            token: token.to_string(),
            needed: count,
            available: values.len(),
        });
    }
    Ok(values.split_off(values.len() - count))
}

/// Replace a calculation failure with its error token
fn trap(result: FormulaResult<Token>) -> FormulaResult<Token> {
    match result {
        Ok(token) => Ok(token),
        Err(e) => match e.as_calculation() {
            Some(calc) => {
                log::debug!("trapped {}", e);
                Ok(Token::from_calculation(calc))
            }
            None => Err(e),
        },
    }
}
