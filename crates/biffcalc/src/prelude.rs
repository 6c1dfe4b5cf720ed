//! Prelude module - common imports for biffcalc users
//!
//! ```rust
//! use biffcalc::prelude::*;
//! ```

pub use crate::{
    // Cell types
    CellAddress,
    CellError,
    CellRange,
    CellValue,

    // Errors
    CalculationError,
    Error,
    FormulaError,
    Result,

    // Evaluation
    EvaluationSettings,
    Evaluator,
    FormulaValue,
    ResolverContext,

    // Tokens
    OperatorKind,
    Token,

    // Main types
    Workbook,
    WorkbookCalculationExt,
    Worksheet,
};
