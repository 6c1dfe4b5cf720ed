//! # biffcalc-core
//!
//! Core value types for the biffcalc formula engine.
//!
//! This crate provides the vocabulary shared by the evaluator and by callers
//! that feed it cell data:
//! - [`CellValue`] - A scalar cell value (number, string, boolean, error, empty)
//! - [`CellError`] - Spreadsheet error codes (`#DIV/0!`, `#VALUE!`, ...)
//! - [`CellAddress`] and [`CellRange`] - Cell addressing and rectangular areas
//! - [`SheetReference`] - A sheet-qualified cell or area as written in formula text
//! - [`date`] - Excel serial date conversion
//!
//! ## Example
//!
//! ```rust
//! use biffcalc_core::{CellAddress, CellRange, CellValue};
//!
//! let range = CellRange::parse("B2:A1").unwrap();
//! assert_eq!(range.start, CellAddress::new(0, 0));
//! assert_eq!(range.cells().count(), 4);
//!
//! assert_eq!(CellValue::Number(3.0).to_text(), "3");
//! ```

pub mod cell;
pub mod date;
pub mod error;

// Re-exports for convenience
pub use cell::{
    format_number, CellAddress, CellError, CellRange, CellRangeIterator, CellValue, SheetReference,
};
pub use error::{Error, Result};

/// Maximum number of rows in a BIFF8 worksheet
pub const MAX_ROWS: u32 = 65_536;

/// Maximum number of columns in a BIFF8 worksheet
pub const MAX_COLS: u16 = 256;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
