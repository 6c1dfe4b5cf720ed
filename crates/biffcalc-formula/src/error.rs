//! Formula error types
//!
//! Two layers of failure exist while a token sequence is evaluated:
//!
//! - [`CalculationError`] is a spreadsheet-level failure (division by zero,
//!   an unresolvable reference, a circular dependency). The evaluator traps
//!   it and pushes an error token in place of the failed result.
//! - Every other [`FormulaError`] variant is a defect in the token sequence or
//!   in the host (an unknown function id, a stack imbalance) and aborts the
//!   evaluation.

use biffcalc_core::CellError;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// A spreadsheet-level calculation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CalculationError {
    #[error("empty intersection or invalid range")]
    Null,

    #[error("attempted to divide by zero")]
    DivZero,

    #[error("wrong type of operand")]
    Value,

    #[error("invalid cell reference")]
    Ref,

    #[error("unrecognized name")]
    Name,

    #[error("invalid numeric value")]
    Num,

    #[error("value not available")]
    Na,

    /// A formula (directly or through other cells) depends on itself
    #[error("circular reference detected")]
    Circular,
}

impl CalculationError {
    /// The error code shown in a cell for this failure
    ///
    /// Circular references surface as `#VALUE!`.
    pub fn cell_error(self) -> CellError {
        match self {
            CalculationError::Null => CellError::Null,
            CalculationError::DivZero => CellError::Div0,
            CalculationError::Value | CalculationError::Circular => CellError::Value,
            CalculationError::Ref => CellError::Ref,
            CalculationError::Name => CellError::Name,
            CalculationError::Num => CellError::Num,
            CalculationError::Na => CellError::Na,
        }
    }

    /// Whether this is a circular-reference failure
    pub fn is_circular(self) -> bool {
        matches!(self, CalculationError::Circular)
    }
}

impl From<CellError> for CalculationError {
    fn from(error: CellError) -> Self {
        match error {
            CellError::Null => CalculationError::Null,
            CellError::Div0 => CalculationError::DivZero,
            CellError::Value => CalculationError::Value,
            CellError::Ref => CalculationError::Ref,
            CellError::Name => CalculationError::Name,
            CellError::Num => CalculationError::Num,
            CellError::Na => CalculationError::Na,
        }
    }
}

/// Errors that can occur during formula evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Spreadsheet-level failure, converted to an error token by the evaluator
    #[error("calculation error: {0}")]
    Calculation(#[from] CalculationError),

    /// A token appeared where it cannot be used as a value
    #[error("unsupported token: {0}")]
    UnsupportedToken(String),

    /// Function id with no implementation
    #[error("function {id} is not supported")]
    FunctionNotSupported { id: u16 },

    /// Opcode byte that does not map to any token
    #[error("unknown token opcode 0x{0:02X}")]
    UnknownOpcode(u8),

    /// An operator or function found fewer operands than its arity
    #[error("stack underflow at {token}: needed {needed} operand(s), {available} available")]
    StackUnderflow {
        token: String,
        needed: usize,
        available: usize,
    },

    /// Evaluation finished with other than exactly one value on the stack
    #[error("unbalanced token sequence: {remaining} value(s) left on the stack")]
    UnbalancedStack { remaining: usize },

    /// Reference the resolver cannot interpret
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Defined-name index with no definition
    #[error("unknown defined name #{0}")]
    UnknownName(u16),
}

impl FormulaError {
    /// The calculation failure this error stands for, if it is trappable
    ///
    /// Reference and name lookups that fail inside a resolver count as
    /// calculation failures (`#REF!` and `#NAME?`). Everything else is fatal.
    pub fn as_calculation(&self) -> Option<CalculationError> {
        match self {
            FormulaError::Calculation(e) => Some(*e),
            FormulaError::InvalidReference(_) => Some(CalculationError::Ref),
            FormulaError::UnknownName(_) => Some(CalculationError::Name),
            _ => None,
        }
    }
}
