//! Evaluation context
//!
//! The evaluator never owns cell data. Everything outside the token sequence
//! (cell contents, defined names, shared-formula bodies) is fetched through a
//! [`ResolverContext`] supplied by the host, and the knobs that change
//! coercion rules travel alongside it in [`EvaluationSettings`].

use crate::error::{CalculationError, FormulaError, FormulaResult};
use crate::token::Token;
use biffcalc_core::{CellAddress, CellRange, CellValue};

/// Host callbacks for everything a formula can refer to
///
/// Sheet names are `None` for references to the sheet that owns the formula.
/// An unresolvable reference should be reported as
/// [`CalculationError::Ref`] (or [`FormulaError::InvalidReference`]) so that
/// it surfaces as a `#REF!` token instead of aborting the evaluation.
pub trait ResolverContext {
    /// Current value of a single cell
    fn resolve_cell(&self, sheet: Option<&str>, address: CellAddress) -> FormulaResult<CellValue>;

    /// Values of a rectangular area, one `Vec` per row
    fn resolve_range(
        &self,
        sheet: Option<&str>,
        range: CellRange,
    ) -> FormulaResult<Vec<Vec<CellValue>>> {
        let mut rows = Vec::with_capacity(range.row_count() as usize);
        for row in range.start.row..=range.end.row {
            let mut values = Vec::with_capacity(range.col_count() as usize);
            for col in range.start.col..=range.end.col {
                values.push(self.resolve_cell(sheet, CellAddress::new(row, col))?);
            }
            rows.push(values);
        }
        Ok(rows)
    }

    /// Token sequence a defined name (by index) stands for
    fn resolve_name(&self, id: u16) -> FormulaResult<Vec<Token>> {
        Err(FormulaError::UnknownName(id))
    }

    /// Token sequence of the shared formula anchored at `anchor`
    fn resolve_shared_formula(&self, anchor: CellAddress) -> FormulaResult<Vec<Token>> {
        Err(FormulaError::InvalidReference(format!(
            "no shared formula anchored at {}",
            anchor
        )))
    }
}

/// Resolver with no data: every cell is empty and nothing else resolves
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyResolver;

impl ResolverContext for EmptyResolver {
    fn resolve_cell(&self, _sheet: Option<&str>, _address: CellAddress) -> FormulaResult<CellValue> {
        Ok(CellValue::Empty)
    }
}

static EMPTY_RESOLVER: EmptyResolver = EmptyResolver;

/// Options that change how operands are coerced
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationSettings {
    /// Treat blank operands as zero in arithmetic (otherwise `#VALUE!`)
    pub blank_as_zero: bool,
    /// Use the 1904 date system when date text is coerced to a serial
    pub date_1904: bool,
    /// How deeply names and shared formulas may expand into each other
    pub max_nesting_depth: usize,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            blank_as_zero: true,
            date_1904: false,
            max_nesting_depth: 64,
        }
    }
}

impl EvaluationSettings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set blank-as-zero coercion
    pub fn with_blank_as_zero(mut self, enabled: bool) -> Self {
        self.blank_as_zero = enabled;
        self
    }

    /// Set the date system
    pub fn with_date_1904(mut self, enabled: bool) -> Self {
        self.date_1904 = enabled;
        self
    }

    /// Set the nesting limit for names and shared formulas
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }
}

/// Everything an operator or function may consult while it runs
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Source of cell, name and shared-formula data
    pub resolver: &'a dyn ResolverContext,
    /// Coercion settings
    pub settings: EvaluationSettings,
    depth: usize,
}

impl<'a> EvaluationContext<'a> {
    /// Create a context over `resolver`
    pub fn new(resolver: &'a dyn ResolverContext, settings: EvaluationSettings) -> Self {
        Self {
            resolver,
            settings,
            depth: 0,
        }
    }

    /// Current name/shared-formula nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Context for evaluating a nested token sequence
    ///
    /// Fails with [`CalculationError::Circular`] once the nesting limit is
    /// exceeded, which is how a name that refers to itself terminates.
    pub fn nested(&self) -> FormulaResult<Self> {
        if self.depth >= self.settings.max_nesting_depth {
            log::warn!(
                "nesting depth {} exceeded while expanding names or shared formulas",
                self.settings.max_nesting_depth
            );
            return Err(CalculationError::Circular.into());
        }
        Ok(Self {
            depth: self.depth + 1,
            ..*self
        })
    }
}

impl EvaluationContext<'static> {
    /// Context with no cell data and default settings
    pub fn simple() -> Self {
        Self::new(&EMPTY_RESOLVER, EvaluationSettings::default())
    }
}

impl std::fmt::Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("settings", &self.settings)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}
