//! # biffcalc-formula
//!
//! Evaluator for BIFF8 parsed-token (Ptg) formulas.
//!
//! This crate provides:
//! - The token model ([`Token`]) and its construction from opcode bytes
//! - Operator semantics with array broadcasting
//! - Built-in functions dispatched by BIFF function id
//! - A stack-machine [`Evaluator`] that resolves cells, names and shared
//!   formulas through a host-supplied [`ResolverContext`]
//! - Criteria matching used by SUMIF and COUNTIF
//!
//! ## Example
//!
//! ```rust
//! use biffcalc_formula::{evaluate, EmptyResolver, FormulaValue, OperatorKind, Token};
//!
//! // 1 + 2 * 3, stored in postfix order
//! let tokens = [
//!     Token::Integer(1),
//!     Token::Integer(2),
//!     Token::Integer(3),
//!     Token::Operator(OperatorKind::Multiply),
//!     Token::Operator(OperatorKind::Add),
//! ];
//! assert_eq!(evaluate(&tokens, &EmptyResolver).unwrap(), FormulaValue::Number(7.0));
//! ```

pub mod context;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod operators;
pub mod render;
pub mod token;
pub mod value;

pub use context::{EmptyResolver, EvaluationContext, EvaluationSettings, ResolverContext};
pub use error::{CalculationError, FormulaError, FormulaResult};
pub use evaluator::{evaluate, evaluate_to_token, Evaluator};
pub use functions::criteria::{
    compare, split_leading_operator, translate_wildcard, Criteria, CriteriaOperator,
    WildcardPattern,
};
pub use functions::{registry, FunctionDef, FunctionRegistry};
pub use render::render_formula;
pub use token::{ControlKind, OperatorKind, Reference, Token};
pub use value::FormulaValue;
