//! Formula calculation against a [`Workbook`]
//!
//! [`WorkbookResolver`] answers the evaluator's callbacks from workbook
//! data. A referenced formula cell is evaluated on demand, in the context of
//! its own sheet, and its result is cached for the lifetime of the resolver.
//! Cells currently being evaluated are tracked so that a reference back into
//! the chain is reported as a circular reference instead of recursing
//! forever.
//!
//! Nesting is bounded by [`MAX_DEPENDENCY_DEPTH`]. A longer chain is cut at
//! the limit, the cell it was cut at is evaluated on its own and the chain
//! is retried, now finding that cell in the cache.

use std::cell::{Cell as StdCell, RefCell};

use ahash::AHashMap;
use biffcalc_core::{CellAddress, CellError, CellValue};
use biffcalc_formula::{
    CalculationError, Evaluator, FormulaError, FormulaResult, FormulaValue, ResolverContext,
    Token,
};

use crate::error::Result;
use crate::workbook::Workbook;
use crate::worksheet::Cell;

/// Most formula cells evaluated inside one another before a chain is cut
pub const MAX_DEPENDENCY_DEPTH: usize = 32;

/// Statistics from a calculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Number of formula cells found
    pub formula_count: usize,
    /// Number of cells whose result was stored
    pub cells_calculated: usize,
    /// Number of cells whose result is an error value
    pub errors: usize,
    /// Number of cells whose value depends on a circular reference
    pub circular_references: usize,
}

/// Extension trait adding calculation to [`Workbook`]
pub trait WorkbookCalculationExt {
    /// Evaluate every formula cell and store its result
    ///
    /// Results are read back with
    /// [`Worksheet::get_calculated_value_at`](crate::Worksheet::get_calculated_value_at).
    fn calculate(&mut self) -> Result<CalculationStats>;
}

impl WorkbookCalculationExt for Workbook {
    fn calculate(&mut self) -> Result<CalculationStats> {
        let mut stats = CalculationStats::default();
        let mut results = Vec::new();

        {
            let resolver = WorkbookResolver::new(self, 0);
            for (sheet_idx, sheet) in self.worksheets().enumerate() {
                for (row, col, _) in sheet.formula_cells() {
                    stats.formula_count += 1;
                    let value = match resolver.cell_value(sheet_idx, CellAddress::new(row, col)) {
                        Ok(value) => value,
                        Err(e) => match e.as_calculation() {
                            Some(CalculationError::Circular) => {
                                stats.circular_references += 1;
                                CellValue::Error(CellError::Value)
                            }
                            Some(calc) => CellValue::Error(calc.cell_error()),
                            None => return Err(e.into()),
                        },
                    };
                    if value.is_error() {
                        stats.errors += 1;
                    }
                    results.push((sheet_idx, row, col, value));
                }
            }
        }

        let mut sheets: Vec<_> = self.worksheets_mut().collect();
        for (sheet_idx, row, col, value) in results {
            if let Some(sheet) = sheets.get_mut(sheet_idx) {
                sheet.set_formula_result(row, col, value);
                stats.cells_calculated += 1;
            }
        }

        log::debug!(
            "calculated {} formula cell(s), {} error(s), {} circular",
            stats.cells_calculated,
            stats.errors,
            stats.circular_references
        );
        Ok(stats)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellKey {
    sheet: usize,
    row: u32,
    col: u16,
}

/// [`ResolverContext`] backed by a [`Workbook`]
///
/// Unqualified references resolve against the sheet of the formula being
/// evaluated; sheet names are matched case-insensitively and an unknown
/// sheet is a `#REF!`.
pub struct WorkbookResolver<'a> {
    workbook: &'a Workbook,
    evaluator: Evaluator,
    current_sheet: StdCell<usize>,
    in_progress: RefCell<Vec<CellKey>>,
    /// First cell reached past the depth limit in the current attempt
    deferred: StdCell<Option<CellKey>>,
    cache: RefCell<AHashMap<CellKey, FormulaResult<CellValue>>>,
}

impl<'a> WorkbookResolver<'a> {
    /// Resolver for formulas living on sheet `sheet`
    pub fn new(workbook: &'a Workbook, sheet: usize) -> Self {
        Self {
            workbook,
            evaluator: Evaluator::new(*workbook.settings()),
            current_sheet: StdCell::new(sheet),
            in_progress: RefCell::new(Vec::new()),
            deferred: StdCell::new(None),
            cache: RefCell::new(AHashMap::new()),
        }
    }

    /// Evaluate a token sequence on the resolver's sheet
    pub fn evaluate(&self, tokens: &[Token]) -> FormulaResult<FormulaValue> {
        self.evaluator.evaluate(tokens, self)
    }

    /// Value of a cell, evaluating it first if it holds a formula
    ///
    /// Calculation failures come back as `Err`; in particular a cell that
    /// depends on itself yields [`CalculationError::Circular`].
    pub fn cell_value(&self, sheet: usize, address: CellAddress) -> FormulaResult<CellValue> {
        let key = CellKey {
            sheet,
            row: address.row,
            col: address.col,
        };
        if !self.in_progress.borrow().is_empty() {
            return self.lookup(key);
        }

        let mut pending = vec![key];
        loop {
            let next = pending[pending.len() - 1];
            let mut result = self.lookup(next);
            match self.deferred.take() {
                Some(deeper) if !pending.contains(&deeper) => {
                    log::trace!("evaluating {:?} before retrying {:?}", deeper, next);
                    pending.push(deeper);
                    continue;
                }
                // Cut twice at the same cell: the chain runs back into itself
                Some(_) => result = Err(CalculationError::Circular.into()),
                None => {}
            }
            pending.pop();
            if pending.is_empty() {
                return result;
            }
            self.cache.borrow_mut().insert(next, result);
        }
    }

    fn lookup(&self, key: CellKey) -> FormulaResult<CellValue> {
        let worksheet = self
            .workbook
            .worksheet(key.sheet)
            .ok_or(CalculationError::Ref)?;
        let address = CellAddress::new(key.row, key.col);
        let tokens = match worksheet.cell(address) {
            None => return Ok(CellValue::Empty),
            Some(Cell::Value(value)) => return Ok(value.clone()),
            Some(Cell::Formula(tokens)) => tokens,
        };

        if let Some(result) = self.cache.borrow().get(&key) {
            return result.clone();
        }
        {
            let in_progress = self.in_progress.borrow();
            if in_progress.contains(&key) {
                log::debug!(
                    "circular reference through {}!{}",
                    worksheet.name(),
                    address
                );
                return Err(CalculationError::Circular.into());
            }
            if in_progress.len() >= MAX_DEPENDENCY_DEPTH {
                log::debug!(
                    "dependency chain cut at {}!{} after {} cells",
                    worksheet.name(),
                    address,
                    MAX_DEPENDENCY_DEPTH
                );
                if self.deferred.get().is_none() {
                    self.deferred.set(Some(key));
                }
                return Err(CalculationError::Value.into());
            }
        }

        self.in_progress.borrow_mut().push(key);
        let previous = self.current_sheet.replace(key.sheet);
        let result = self.evaluate_formula(tokens, worksheet.name(), address);
        self.current_sheet.set(previous);
        self.in_progress.borrow_mut().pop();

        let value = result?;
        // Values seen after a cut may depend on it and are recomputed on retry
        if self.deferred.get().is_none() {
            self.cache.borrow_mut().insert(key, Ok(value.clone()));
        }
        Ok(value)
    }

    fn evaluate_formula(
        &self,
        tokens: &[Token],
        sheet_name: &str,
        address: CellAddress,
    ) -> FormulaResult<CellValue> {
        let token = match self.evaluator.evaluate_to_token(tokens, self) {
            Ok(token) => token,
            Err(e) => {
                log::warn!(
                    "evaluation error at {}!{}: {}",
                    sheet_name,
                    address,
                    e
                );
                return Ok(CellValue::Error(CellError::Value));
            }
        };
        if let Token::Error {
            circular: true, ..
        } = token
        {
            return Err(CalculationError::Circular.into());
        }

        // A cell holds one value; an array result keeps its top-left element.
        let value = token.value(&self.evaluator.context(self))?;
        Ok(CellValue::from(value.first().clone()))
    }

    fn sheet_index(&self, sheet: Option<&str>) -> FormulaResult<usize> {
        match sheet {
            None => Ok(self.current_sheet.get()),
            Some(name) => self.workbook.sheet_index(name).ok_or_else(|| {
                log::debug!("reference to unknown sheet '{}'", name);
                CalculationError::Ref.into()
            }),
        }
    }
}

impl ResolverContext for WorkbookResolver<'_> {
    fn resolve_cell(&self, sheet: Option<&str>, address: CellAddress) -> FormulaResult<CellValue> {
        let sheet = self.sheet_index(sheet)?;
        self.cell_value(sheet, address)
    }

    fn resolve_name(&self, id: u16) -> FormulaResult<Vec<Token>> {
        self.workbook
            .defined_name(id)
            .map(|name| name.tokens.clone())
            .ok_or(FormulaError::UnknownName(id))
    }

    fn resolve_shared_formula(&self, anchor: CellAddress) -> FormulaResult<Vec<Token>> {
        self.workbook
            .worksheet(self.current_sheet.get())
            .and_then(|sheet| sheet.shared_formula(anchor))
            .map(<[Token]>::to_vec)
            .ok_or_else(|| {
                FormulaError::InvalidReference(format!("no shared formula anchored at {}", anchor))
            })
    }
}

impl std::fmt::Debug for WorkbookResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkbookResolver")
            .field("current_sheet", &self.current_sheet.get())
            .field("in_progress", &self.in_progress.borrow().len())
            .field("cached", &self.cache.borrow().len())
            .finish_non_exhaustive()
    }
}
