//! Workbook type - sheets, defined names and evaluation settings

use biffcalc_core::{CellAddress, CellValue, MAX_SHEET_NAME_LEN};
use biffcalc_formula::{EvaluationSettings, FormulaValue, Token};

use crate::calculation::WorkbookResolver;
use crate::error::{Error, Result};
use crate::worksheet::Worksheet;

/// A formula-level defined name
#[derive(Debug, Clone, PartialEq)]
pub struct DefinedName {
    /// Name as written in formula text
    pub name: String,
    /// Token sequence the name stands for
    pub tokens: Vec<Token>,
}

/// An in-memory workbook that formulas can be evaluated against
///
/// Defined names are addressed by 1-based index, the way `tName` tokens
/// store them.
#[derive(Debug, Clone)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    names: Vec<DefinedName>,
    settings: EvaluationSettings,
}

impl Workbook {
    /// Create a workbook with a single sheet named `Sheet1`
    pub fn new() -> Self {
        Self {
            worksheets: vec![Worksheet::new("Sheet1")],
            names: Vec::new(),
            settings: EvaluationSettings::default(),
        }
    }

    /// Create a workbook with no worksheets
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
            names: Vec::new(),
            settings: EvaluationSettings::default(),
        }
    }

    /// Replace the evaluation settings
    pub fn with_settings(mut self, settings: EvaluationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut EvaluationSettings {
        &mut self.settings
    }

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Get a worksheet by index
    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Get a mutable worksheet by index
    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    /// Get a worksheet by name (case-insensitive)
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheet_index(name).and_then(|i| self.worksheets.get(i))
    }

    /// Get the index of a worksheet by name (case-insensitive)
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets
            .iter()
            .position(|ws| ws.name().eq_ignore_ascii_case(name))
    }

    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    pub(crate) fn worksheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.worksheets.iter_mut()
    }

    /// Add a worksheet with a generated name (`SheetN`)
    pub fn add_worksheet(&mut self) -> Result<usize> {
        let name = self.generate_sheet_name();
        self.add_worksheet_with_name(&name)
    }

    /// Add a worksheet with the given name
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.validate_sheet_name(name, None)?;
        self.worksheets.push(Worksheet::new(name));
        Ok(self.worksheets.len() - 1)
    }

    /// Rename a worksheet
    ///
    /// Formulas refer to sheets by name, so references to the old name
    /// become `#REF!`.
    pub fn rename_worksheet(&mut self, index: usize, new_name: &str) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.validate_sheet_name(new_name, Some(index))?;
        self.worksheets[index].set_name(new_name);
        Ok(())
    }

    /// Define a name and return its 1-based index
    pub fn define_name(&mut self, name: &str, tokens: Vec<Token>) -> Result<u16> {
        let name = name.trim();
        let valid_start = name
            .chars()
            .next()
            .map(|c| c.is_alphabetic() || c == '_' || c == '\\')
            .unwrap_or(false);
        if !valid_start || name.chars().any(char::is_whitespace) {
            return Err(Error::InvalidName(name.to_string()));
        }
        if self.name_id(name).is_some() {
            return Err(Error::InvalidName(format!("'{}' is already defined", name)));
        }
        if self.names.len() >= u16::MAX as usize {
            return Err(Error::InvalidName(format!("too many names to add '{}'", name)));
        }
        self.names.push(DefinedName {
            name: name.to_string(),
            tokens,
        });
        Ok(self.names.len() as u16)
    }

    /// Index of a defined name (case-insensitive)
    pub fn name_id(&self, name: &str) -> Option<u16> {
        self.names
            .iter()
            .position(|n| n.name.eq_ignore_ascii_case(name))
            .map(|i| (i + 1) as u16)
    }

    /// Defined name by 1-based index
    pub fn defined_name(&self, id: u16) -> Option<&DefinedName> {
        (id as usize)
            .checked_sub(1)
            .and_then(|i| self.names.get(i))
    }

    /// Evaluate a token sequence as if it lived on sheet `sheet`
    pub fn evaluate(&self, sheet: usize, tokens: &[Token]) -> Result<FormulaValue> {
        self.check_sheet(sheet)?;
        let resolver = WorkbookResolver::new(self, sheet);
        Ok(resolver.evaluate(tokens)?)
    }

    /// Current value of a cell, evaluating it if it holds a formula
    pub fn evaluate_cell(&self, sheet: usize, address: &str) -> Result<CellValue> {
        self.check_sheet(sheet)?;
        let address = CellAddress::parse(address)?;
        let resolver = WorkbookResolver::new(self, sheet);
        match resolver.cell_value(sheet, address) {
            Ok(value) => Ok(value),
            Err(e) => match e.as_calculation() {
                Some(calc) => Ok(CellValue::Error(calc.cell_error())),
                None => Err(e.into()),
            },
        }
    }

    fn check_sheet(&self, sheet: usize) -> Result<()> {
        if sheet >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(sheet, self.worksheets.len()));
        }
        Ok(())
    }

    fn validate_sheet_name(&self, name: &str, exclude_index: Option<usize>) -> Result<()> {
        if name.is_empty() {
            return Err(biffcalc_core::Error::InvalidSheetName(
                "Sheet name cannot be empty".into(),
            )
            .into());
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(biffcalc_core::Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            ))
            .into());
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(biffcalc_core::Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            ))
            .into());
        }

        let taken = self
            .worksheets
            .iter()
            .enumerate()
            .any(|(i, ws)| Some(i) != exclude_index && ws.name().eq_ignore_ascii_case(name));
        if taken {
            return Err(biffcalc_core::Error::DuplicateSheetName(name.into()).into());
        }
        Ok(())
    }

    fn generate_sheet_name(&self) -> String {
        let mut n = self.worksheets.len() + 1;
        loop {
            let name = format!("Sheet{}", n);
            if self.validate_sheet_name(&name, None).is_ok() {
                return name;
            }
            n += 1;
        }
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}
