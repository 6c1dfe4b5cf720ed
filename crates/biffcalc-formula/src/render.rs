//! Render token sequences as formula text

use crate::error::{FormulaError, FormulaResult};
use crate::functions;
use crate::token::{ControlKind, OperatorKind, Token};

/// Rebuild infix formula text (without the leading `=`) from postfix tokens
///
/// Parentheses appear only where a paren token was stored.
pub fn render_formula(tokens: &[Token]) -> FormulaResult<String> {
    let mut stack: Vec<String> = Vec::with_capacity(tokens.len());

    for token in tokens {
        match token {
            Token::Operator(kind) if kind.is_unary() => {
                let operand = pop(&mut stack, 1, token)?.concat();
                stack.push(match kind {
                    OperatorKind::Percent => format!("{}%", operand),
                    _ => format!("{}{}", kind.symbol(), operand),
                });
            }
            Token::Operator(kind) => {
                let operands = pop(&mut stack, 2, token)?;
                stack.push(operands.join(kind.symbol()));
            }
            Token::Control(ControlKind::Paren) => {
                let inner = pop(&mut stack, 1, token)?.concat();
                stack.push(format!("({})", inner));
            }
            Token::Control(ControlKind::AttrSum) => {
                let inner = pop(&mut stack, 1, token)?.concat();
                stack.push(format!("SUM({})", inner));
            }
            Token::Control(_) => {}
            Token::Function { id, arg_count, .. } => {
                let args = pop(&mut stack, *arg_count as usize, token)?;
                let name = functions::registry()
                    .get(*id)
                    .map(|def| def.name.to_string())
                    .unwrap_or_else(|| format!("FUNC{}", id));
                stack.push(format!("{}({})", name, args.join(",")));
            }
            operand => stack.push(operand.to_string()),
        }
    }

    match stack.len() {
        1 => Ok(stack.concat()),
        remaining => Err(FormulaError::UnbalancedStack { remaining }),
    }
}

fn pop(stack: &mut Vec<String>, count: usize, token: &Token) -> FormulaResult<Vec<String>> {
    if stack.len() < count {
        return Err(FormulaError::StackUnderflow {
            token: token.to_string(),
            needed: count,
            available: stack.len(),
        });
    }
    Ok(stack.split_off(stack.len() - count))
}
