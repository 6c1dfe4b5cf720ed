//! # biffcalc
//!
//! Evaluate BIFF8 parsed-token formulas.
//!
//! Legacy `.xls` workbooks store formulas as sequences of parsed tokens in
//! reverse Polish order. This crate evaluates such sequences and provides an
//! in-memory [`Workbook`] to evaluate them against.
//!
//! ## Features
//!
//! - Arithmetic, comparison, text and reference operators with array
//!   broadcasting
//! - Built-in functions dispatched by BIFF function id (IF, AND, OR, NOT,
//!   IFERROR, SUM, SUMIF, COUNTIF, ...)
//! - Defined names and shared formulas
//! - Circular reference detection across formula cells
//!
//! ## Example
//!
//! ```rust
//! use biffcalc::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_cell_value("A1", 42.0).unwrap();
//! // =A1*2
//! sheet
//!     .set_cell_formula(
//!         "B1",
//!         vec![
//!             Token::reference("A1").unwrap(),
//!             Token::Integer(2),
//!             Token::operator(OperatorKind::Multiply),
//!         ],
//!     )
//!     .unwrap();
//!
//! assert_eq!(workbook.evaluate_cell(0, "B1").unwrap(), CellValue::Number(84.0));
//! ```

pub mod calculation;
pub mod error;
pub mod prelude;
pub mod workbook;
pub mod worksheet;

pub use calculation::{
    CalculationStats, WorkbookCalculationExt, WorkbookResolver, MAX_DEPENDENCY_DEPTH,
};
pub use error::{Error, Result};
pub use workbook::{DefinedName, Workbook};
pub use worksheet::{Cell, Worksheet};

// Re-export core types
pub use biffcalc_core::{
    CellAddress, CellError, CellRange, CellValue, SheetReference, MAX_COLS, MAX_ROWS,
    MAX_SHEET_NAME_LEN,
};

// Re-export formula types
pub use biffcalc_formula::{
    evaluate, evaluate_to_token, render_formula, CalculationError, ControlKind, Criteria,
    CriteriaOperator, EmptyResolver, EvaluationContext, EvaluationSettings, Evaluator,
    FormulaError, FormulaResult, FormulaValue, OperatorKind, Reference, ResolverContext, Token,
};
