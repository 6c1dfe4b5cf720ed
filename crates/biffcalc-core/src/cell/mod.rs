//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - The scalar value held by a cell or produced by a formula
//! - [`CellError`] - Spreadsheet error codes
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A range of cells (e.g., "A1:B10")
//! - [`SheetReference`] - An optionally sheet-qualified address or range

mod address;
mod value;

pub use address::{CellAddress, CellRange, CellRangeIterator, SheetReference};
pub use value::{format_number, CellError, CellValue};
