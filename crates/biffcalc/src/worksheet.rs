//! Worksheet storage

use ahash::AHashMap;
use biffcalc_core::{CellAddress, CellValue, MAX_COLS, MAX_ROWS};
use biffcalc_formula::Token;

use crate::error::Result;

/// What a cell holds
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// A constant
    Value(CellValue),
    /// A formula in stored (postfix) token order
    Formula(Vec<Token>),
}

impl Cell {
    /// Check if the cell holds a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, Cell::Formula(_))
    }
}

/// A single sheet of a [`Workbook`](crate::Workbook)
///
/// Cells are keyed by `(row, col)`; absolute/relative flags on the address
/// used to store a cell are ignored.
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    name: String,
    cells: AHashMap<(u32, u16), Cell>,
    shared_formulas: AHashMap<(u32, u16), Vec<Token>>,
    calculated: AHashMap<(u32, u16), CellValue>,
}

impl Worksheet {
    /// Create an empty worksheet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Set a constant by A1 address
    pub fn set_cell_value(&mut self, address: &str, value: impl Into<CellValue>) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    /// Set a constant by zero-based position
    pub fn set_cell_value_at(
        &mut self,
        row: u32,
        col: u16,
        value: impl Into<CellValue>,
    ) -> Result<()> {
        check_bounds(row, col)?;
        match value.into() {
            CellValue::Empty => {
                self.cells.remove(&(row, col));
            }
            value => {
                self.cells.insert((row, col), Cell::Value(value));
            }
        }
        self.calculated.remove(&(row, col));
        Ok(())
    }

    /// Set a formula by A1 address
    pub fn set_cell_formula(&mut self, address: &str, tokens: Vec<Token>) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_formula_at(addr.row, addr.col, tokens)
    }

    /// Set a formula by zero-based position
    pub fn set_cell_formula_at(&mut self, row: u32, col: u16, tokens: Vec<Token>) -> Result<()> {
        check_bounds(row, col)?;
        self.cells.insert((row, col), Cell::Formula(tokens));
        self.calculated.remove(&(row, col));
        Ok(())
    }

    /// Register the instantiated body of a shared formula anchored at `anchor`
    ///
    /// Cells that use it hold `[Token::SharedFormula { anchor }]`.
    pub fn set_shared_formula(&mut self, anchor: &str, tokens: Vec<Token>) -> Result<()> {
        let addr = CellAddress::parse(anchor)?;
        self.shared_formulas.insert((addr.row, addr.col), tokens);
        Ok(())
    }

    /// Body of the shared formula anchored at `anchor`
    pub fn shared_formula(&self, anchor: CellAddress) -> Option<&[Token]> {
        self.shared_formulas
            .get(&(anchor.row, anchor.col))
            .map(Vec::as_slice)
    }

    /// Cell contents by zero-based position
    pub fn cell_at(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Cell contents at `address`
    pub fn cell(&self, address: CellAddress) -> Option<&Cell> {
        self.cell_at(address.row, address.col)
    }

    /// Constant value of a cell; formula cells and blanks yield `None`
    pub fn get_value_at(&self, row: u32, col: u16) -> Option<&CellValue> {
        match self.cells.get(&(row, col)) {
            Some(Cell::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Last result stored by [`Workbook::calculate`](crate::Workbook::calculate)
    pub fn get_calculated_value_at(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.calculated.get(&(row, col))
    }

    /// All formula cells as `(row, col, tokens)`, in row-major order
    pub fn formula_cells(&self) -> Vec<(u32, u16, &[Token])> {
        let mut cells: Vec<_> = self
            .cells
            .iter()
            .filter_map(|(&(row, col), cell)| match cell {
                Cell::Formula(tokens) => Some((row, col, tokens.as_slice())),
                Cell::Value(_) => None,
            })
            .collect();
        cells.sort_by_key(|&(row, col, _)| (row, col));
        cells
    }

    /// Number of non-blank cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn set_formula_result(&mut self, row: u32, col: u16, value: CellValue) {
        self.calculated.insert((row, col), value);
    }
}

fn check_bounds(row: u32, col: u16) -> Result<()> {
    if row >= MAX_ROWS {
        return Err(biffcalc_core::Error::RowOutOfBounds(row, MAX_ROWS - 1).into());
    }
    if col >= MAX_COLS {
        return Err(biffcalc_core::Error::ColumnOutOfBounds(col, MAX_COLS - 1).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_and_get_values() {
        let mut sheet = Worksheet::new("Data");
        sheet.set_cell_value("B3", 4.5).unwrap();
        sheet.set_cell_value_at(0, 0, "label").unwrap();

        assert_eq!(sheet.name(), "Data");
        assert_eq!(sheet.get_value_at(2, 1), Some(&CellValue::Number(4.5)));
        assert_eq!(sheet.get_value_at(0, 0), Some(&CellValue::from("label")));
        assert_eq!(sheet.cell_count(), 2);
    }

    #[test]
    fn test_empty_value_clears_cell() {
        let mut sheet = Worksheet::new("Data");
        sheet.set_cell_value("A1", 1.0).unwrap();
        sheet.set_cell_value("A1", CellValue::Empty).unwrap();
        assert_eq!(sheet.cell_at(0, 0), None);
    }

    #[test]
    fn test_formula_cells_sorted() {
        let mut sheet = Worksheet::new("Data");
        sheet.set_cell_formula("B2", vec![Token::Integer(2)]).unwrap();
        sheet.set_cell_formula("A1", vec![Token::Integer(1)]).unwrap();
        sheet.set_cell_value("A2", 3.0).unwrap();

        let cells: Vec<_> = sheet
            .formula_cells()
            .into_iter()
            .map(|(row, col, _)| (row, col))
            .collect();
        assert_eq!(cells, vec![(0, 0), (1, 1)]);
        assert!(sheet.cell_at(1, 1).unwrap().is_formula());
    }

    #[test]
    fn test_out_of_bounds() {
        let mut sheet = Worksheet::new("Data");
        assert!(matches!(
            sheet.set_cell_value_at(MAX_ROWS, 0, 1.0),
            Err(Error::Core(biffcalc_core::Error::RowOutOfBounds(..)))
        ));
        assert!(sheet.set_cell_value("not a cell", 1.0).is_err());
    }
}
