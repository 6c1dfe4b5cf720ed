//! Cell address, area and sheet-qualified reference types

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell address (e.g., "A1", "$B$2")
///
/// Rows and columns are 0-based. The `$` markers of A1 notation are kept as
/// absolute flags; a BIFF8 reference token stores the same information as
/// "relative" bits, which are simply the negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., IV=255)
    pub col: u16,
    /// Whether the row reference is absolute ($)
    pub row_absolute: bool,
    /// Whether the column reference is absolute ($)
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a new cell address with relative references
    pub fn new(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, false, false)
    }

    /// Create a new cell address with specified absolute/relative flags
    pub fn with_absolute(row: u32, col: u16, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Create an absolute cell address ($A$1 style)
    pub fn absolute(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, true, true)
    }

    /// Same cell, ignoring the absolute/relative flags
    pub fn same_cell(&self, other: &CellAddress) -> bool {
        self.row == other.row && self.col == other.col
    }

    /// Parse a cell address from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use biffcalc_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$B$2").unwrap();
    /// assert_eq!((addr.row, addr.col), (1, 1));
    /// assert!(addr.row_absolute && addr.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let (col_absolute, rest) = strip_dollar(s);
        let letters_len = rest
            .bytes()
            .take_while(|b| b.is_ascii_alphabetic())
            .count();
        if letters_len == 0 {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }
        let col = Self::letters_to_column(&rest[..letters_len])?;

        let (row_absolute, digits) = strip_dollar(&rest[letters_len..]);
        if digits.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!(
                "invalid row number in '{}'",
                s
            )));
        }

        let row: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;
        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }
        let row = row - 1;
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }

        Ok(Self::with_absolute(row, col, row_absolute, col_absolute))
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u16) -> String {
        let mut letters = Vec::new();
        let mut n = col as u32 + 1;

        while n > 0 {
            n -= 1;
            letters.push((n % 26) as u8 + b'A');
            n /= 26;
        }

        letters.iter().rev().map(|b| *b as char).collect()
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col > MAX_COLS as u32 {
                return Err(Error::ColumnOutOfBounds(
                    col.min(u16::MAX as u32) as u16 - 1,
                    MAX_COLS - 1,
                ));
            }
        }

        Ok((col - 1) as u16)
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.col_absolute { "$" } else { "" },
            Self::column_to_letters(self.col),
            if self.row_absolute { "$" } else { "" },
            self.row + 1
        )
    }

    /// Create a range from this address to another
    pub fn to(&self, other: CellAddress) -> CellRange {
        CellRange::new(*self, other)
    }
}

fn strip_dollar(s: &str) -> (bool, &str) {
    match s.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, s),
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular range of cells (e.g., "A1:B10")
///
/// Construction always normalizes the corners so that `start` is the
/// top-left and `end` the bottom-right cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRange {
    /// Start address (top-left)
    pub start: CellAddress,
    /// End address (bottom-right)
    pub end: CellAddress,
}

impl CellRange {
    /// Create a new cell range from any two corners
    pub fn new(first: CellAddress, last: CellAddress) -> Self {
        let (top, bottom) = if first.row <= last.row {
            ((first.row, first.row_absolute), (last.row, last.row_absolute))
        } else {
            ((last.row, last.row_absolute), (first.row, first.row_absolute))
        };
        let (left, right) = if first.col <= last.col {
            ((first.col, first.col_absolute), (last.col, last.col_absolute))
        } else {
            ((last.col, last.col_absolute), (first.col, first.col_absolute))
        };

        Self {
            start: CellAddress::with_absolute(top.0, left.0, top.1, left.1),
            end: CellAddress::with_absolute(bottom.0, right.0, bottom.1, right.1),
        }
    }

    /// Create a range from row/column indices
    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse a range from A1:B10 notation (a lone address gives a single cell)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((first, last)) => {
                let first = CellAddress::parse(first)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                let last = CellAddress::parse(last)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                Ok(Self::new(first, last))
            }
            None => CellAddress::parse(s).map(Self::single),
        }
    }

    /// Whether the range covers exactly one cell
    pub fn is_single_cell(&self) -> bool {
        self.start.same_cell(&self.end)
    }

    /// Check if a cell is within this range
    pub fn contains(&self, addr: &CellAddress) -> bool {
        (self.start.row..=self.end.row).contains(&addr.row)
            && (self.start.col..=self.end.col).contains(&addr.col)
    }

    /// Get the number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Get the number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Get the total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    /// Check if this range overlaps with another
    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.start.row <= other.end.row
            && self.end.row >= other.start.row
            && self.start.col <= other.end.col
            && self.end.col >= other.start.col
    }

    /// Get the intersection of two ranges, if any
    pub fn intersect(&self, other: &CellRange) -> Option<CellRange> {
        if !self.overlaps(other) {
            return None;
        }

        Some(CellRange::from_indices(
            self.start.row.max(other.start.row),
            self.start.col.max(other.start.col),
            self.end.row.min(other.end.row),
            self.end.col.min(other.end.col),
        ))
    }

    /// Smallest range covering both this range and `addr`
    pub fn extend_to(&self, addr: &CellAddress) -> CellRange {
        CellRange::from_indices(
            self.start.row.min(addr.row),
            self.start.col.min(addr.col),
            self.end.row.max(addr.row),
            self.end.col.max(addr.col),
        )
    }

    /// Iterate over all cell addresses in the range (row by row)
    pub fn cells(&self) -> CellRangeIterator {
        CellRangeIterator {
            range: *self,
            current_row: self.start.row,
            current_col: self.start.col,
            remaining: self.cell_count() as usize,
        }
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        if self.start == self.end {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start.to_a1_string(), self.end.to_a1_string())
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Iterator over cells in a range
pub struct CellRangeIterator {
    range: CellRange,
    current_row: u32,
    current_col: u16,
    remaining: usize,
}

impl Iterator for CellRangeIterator {
    type Item = CellAddress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let addr = CellAddress::new(self.current_row, self.current_col);
        self.remaining -= 1;

        if self.current_col == self.range.end.col {
            self.current_col = self.range.start.col;
            self.current_row += 1;
        } else {
            self.current_col += 1;
        }

        Some(addr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for CellRangeIterator {}

/// A cell or area reference as written in formula text, optionally
/// qualified with a sheet name (`Sheet2!A1`, `'Q1 Data'!B2:C9`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetReference {
    /// Sheet name, `None` for the sheet the formula lives on
    pub sheet: Option<String>,
    /// Referenced cells
    pub range: CellRange,
    /// Whether the text used area notation (`A1:A1` stays an area)
    pub is_area: bool,
}

impl SheetReference {
    /// Parse `[sheet!]A1` or `[sheet!]A1:B2`
    ///
    /// Quoted sheet names may contain `!` and escaped quotes (`''`).
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (sheet, location) = match s.rfind('!') {
            Some(pos) => (Some(unquote_sheet(&s[..pos])?), &s[pos + 1..]),
            None => (None, s),
        };

        let is_area = location.contains(':');
        let range = CellRange::parse(location)?;
        Ok(Self {
            sheet,
            range,
            is_area,
        })
    }

    /// Reference to a single cell
    pub fn cell(sheet: Option<String>, addr: CellAddress) -> Self {
        Self {
            sheet,
            range: CellRange::single(addr),
            is_area: false,
        }
    }
}

fn unquote_sheet(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let name = match raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => raw.to_string(),
    };
    if name.is_empty() || name.chars().count() > crate::MAX_SHEET_NAME_LEN {
        return Err(Error::InvalidSheetName(name));
    }
    Ok(name)
}

impl fmt::Display for SheetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            if sheet
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
            {
                write!(f, "{}!", sheet)?;
            } else {
                write!(f, "'{}'!", sheet.replace('\'', "''"))?;
            }
        }
        if self.is_area && self.range.start == self.range.end {
            write!(f, "{}:{}", self.range.start, self.range.end)
        } else {
            write!(f, "{}", self.range)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_to_letters() {
        assert_eq!(CellAddress::column_to_letters(0), "A");
        assert_eq!(CellAddress::column_to_letters(25), "Z");
        assert_eq!(CellAddress::column_to_letters(26), "AA");
        assert_eq!(CellAddress::column_to_letters(255), "IV"); // last BIFF8 column
    }

    #[test]
    fn test_letters_to_column() {
        assert_eq!(CellAddress::letters_to_column("A").unwrap(), 0);
        assert_eq!(CellAddress::letters_to_column("ab").unwrap(), 27);
        assert_eq!(CellAddress::letters_to_column("IV").unwrap(), 255);
        assert!(CellAddress::letters_to_column("IW").is_err());
        assert!(CellAddress::letters_to_column("XFD").is_err());
    }

    #[test]
    fn test_cell_address_parse() {
        let addr = CellAddress::parse("C7").unwrap();
        assert_eq!((addr.row, addr.col), (6, 2));
        assert!(!addr.row_absolute && !addr.col_absolute);

        let addr = CellAddress::parse("$A1").unwrap();
        assert!(addr.col_absolute);
        assert!(!addr.row_absolute);

        let addr = CellAddress::parse("A$1").unwrap();
        assert!(!addr.col_absolute);
        assert!(addr.row_absolute);

        let addr = CellAddress::parse("IV65536").unwrap();
        assert_eq!((addr.row, addr.col), (65535, 255));
    }

    #[test]
    fn test_cell_address_parse_errors() {
        assert!(CellAddress::parse("").is_err());
        assert!(CellAddress::parse("A").is_err());
        assert!(CellAddress::parse("7").is_err());
        assert!(CellAddress::parse("A0").is_err());
        assert!(CellAddress::parse("A1x").is_err());
        assert!(CellAddress::parse("A65537").is_err());
    }

    #[test]
    fn test_cell_address_display() {
        assert_eq!(CellAddress::new(0, 0).to_string(), "A1");
        assert_eq!(CellAddress::new(99, 2).to_string(), "C100");
        assert_eq!(CellAddress::absolute(0, 27).to_string(), "$AB$1");
    }

    #[test]
    fn test_cell_range_normalizes_corners() {
        let range = CellRange::parse("C3:A1").unwrap();
        assert_eq!(range.start, CellAddress::new(0, 0));
        assert_eq!(range.end, CellAddress::new(2, 2));

        let range = CellRange::new(CellAddress::new(0, 3), CellAddress::new(4, 1));
        assert_eq!(range.to_string(), "B1:D5");
    }

    #[test]
    fn test_cell_range_contains_and_intersect() {
        let a = CellRange::parse("A1:B2").unwrap();
        let b = CellRange::parse("B2:C3").unwrap();

        assert!(a.contains(&CellAddress::new(1, 1)));
        assert!(!a.contains(&CellAddress::new(2, 2)));
        assert_eq!(a.intersect(&b), Some(CellRange::parse("B2").unwrap()));
        assert_eq!(a.intersect(&CellRange::parse("D4").unwrap()), None);
    }

    #[test]
    fn test_cell_range_extend_to() {
        let range = CellRange::parse("B2").unwrap();
        let grown = range.extend_to(&CellAddress::new(4, 0));
        assert_eq!(grown.to_string(), "A2:B5");
    }

    #[test]
    fn test_cell_range_iterator() {
        let cells: Vec<_> = CellRange::parse("A1:B2").unwrap().cells().collect();
        assert_eq!(
            cells,
            vec![
                CellAddress::new(0, 0),
                CellAddress::new(0, 1),
                CellAddress::new(1, 0),
                CellAddress::new(1, 1),
            ]
        );
        assert_eq!(CellRange::parse("C3").unwrap().cells().len(), 1);
    }

    #[test]
    fn test_sheet_reference_parse() {
        let r = SheetReference::parse("Sheet2!B3").unwrap();
        assert_eq!(r.sheet.as_deref(), Some("Sheet2"));
        assert_eq!(r.range, CellRange::parse("B3").unwrap());
        assert!(!r.is_area);

        let r = SheetReference::parse("'Q1 Data'!A1:C4").unwrap();
        assert_eq!(r.sheet.as_deref(), Some("Q1 Data"));
        assert!(r.is_area);
        assert_eq!(r.to_string(), "'Q1 Data'!A1:C4");

        let r = SheetReference::parse("$A$1").unwrap();
        assert_eq!(r.sheet, None);

        assert!(SheetReference::parse("!A1").is_err());
        assert!(SheetReference::parse("Sheet1!").is_err());
    }

    #[test]
    fn test_sheet_name_length_counts_characters() {
        // 31 two-byte characters fit; a 32nd does not
        let name = "é".repeat(31);
        let r = SheetReference::parse(&format!("'{}'!A1", name)).unwrap();
        assert_eq!(r.sheet.as_deref(), Some(name.as_str()));

        let too_long = "é".repeat(32);
        assert!(SheetReference::parse(&format!("'{}'!A1", too_long)).is_err());
    }
}
