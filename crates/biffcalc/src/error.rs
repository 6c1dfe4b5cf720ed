//! Error type for the workbook layer

use biffcalc_formula::FormulaError;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or evaluating a [`Workbook`](crate::Workbook)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Addressing or sheet management failure
    #[error(transparent)]
    Core(#[from] biffcalc_core::Error),

    /// A formula could not be evaluated at all
    #[error("formula error: {0}")]
    Formula(#[from] FormulaError),

    /// Sheet index out of bounds
    #[error("Sheet index {0} out of bounds (count: {1})")]
    SheetOutOfBounds(usize, usize),

    /// Defined name is empty, malformed or already taken
    #[error("Invalid defined name: {0}")]
    InvalidName(String),
}
