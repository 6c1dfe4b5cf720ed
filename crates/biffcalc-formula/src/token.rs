//! Parsed-token (Ptg) model
//!
//! A BIFF8 formula is stored as a postfix sequence of tokens. Operand tokens
//! (literals, references, arrays) push a value; operator, control and
//! function tokens pop their operands and push a result. This module models
//! those tokens independent of their binary layout, plus the conversions
//! from the raw opcode bytes a record decoder produces.

use std::fmt;

use biffcalc_core::{CellAddress, CellError, CellRange, CellValue, SheetReference};

use crate::context::EvaluationContext;
use crate::error::{CalculationError, FormulaError, FormulaResult};
use crate::evaluator::evaluate_nested;
use crate::functions;
use crate::value::FormulaValue;

/// BIFF8 token opcodes (base class, without the reference/value/array bits)
pub mod opcode {
    pub const EXP: u8 = 0x01;
    pub const ADD: u8 = 0x03;
    pub const SUB: u8 = 0x04;
    pub const MUL: u8 = 0x05;
    pub const DIV: u8 = 0x06;
    pub const POWER: u8 = 0x07;
    pub const CONCAT: u8 = 0x08;
    pub const LT: u8 = 0x09;
    pub const LE: u8 = 0x0A;
    pub const EQ: u8 = 0x0B;
    pub const GE: u8 = 0x0C;
    pub const GT: u8 = 0x0D;
    pub const NE: u8 = 0x0E;
    pub const ISECT: u8 = 0x0F;
    pub const UNION: u8 = 0x10;
    pub const RANGE: u8 = 0x11;
    pub const UPLUS: u8 = 0x12;
    pub const UMINUS: u8 = 0x13;
    pub const PERCENT: u8 = 0x14;
    pub const PAREN: u8 = 0x15;
    pub const MISS_ARG: u8 = 0x16;
    pub const STR: u8 = 0x17;
    pub const ATTR: u8 = 0x19;
    pub const ERR: u8 = 0x1C;
    pub const BOOL: u8 = 0x1D;
    pub const INT: u8 = 0x1E;
    pub const NUM: u8 = 0x1F;
    pub const ARRAY: u8 = 0x20;
    pub const FUNC: u8 = 0x21;
    pub const FUNC_VAR: u8 = 0x22;
    pub const NAME: u8 = 0x23;
    pub const REF: u8 = 0x24;
    pub const AREA: u8 = 0x25;
    pub const REF_3D: u8 = 0x3A;
    pub const AREA_3D: u8 = 0x3B;

    /// Token class bits of classified opcodes
    pub const CLASS_MASK: u8 = 0x60;
    /// Array class (`0x40` is value class, `0x20` reference class)
    pub const CLASS_ARRAY: u8 = 0x60;
}

/// Option bits of the `tAttr` token
pub mod attr {
    pub const VOLATILE: u8 = 0x01;
    pub const IF: u8 = 0x02;
    pub const CHOOSE: u8 = 0x04;
    pub const GOTO: u8 = 0x08;
    pub const SUM: u8 = 0x10;
    pub const SPACE: u8 = 0x40;
}

/// Binary and unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Concat,
    LessThan,
    LessEqual,
    Equal,
    GreaterEqual,
    GreaterThan,
    NotEqual,
    /// Reference intersection (space)
    Intersect,
    /// Reference union (comma)
    Union,
    /// Bounding area (colon)
    Range,
    UnaryPlus,
    UnaryMinus,
    Percent,
}

impl OperatorKind {
    /// Map an opcode byte to its operator
    pub fn from_opcode(code: u8) -> Option<Self> {
        let kind = match code {
            opcode::ADD => OperatorKind::Add,
            opcode::SUB => OperatorKind::Subtract,
            opcode::MUL => OperatorKind::Multiply,
            opcode::DIV => OperatorKind::Divide,
            opcode::POWER => OperatorKind::Power,
            opcode::CONCAT => OperatorKind::Concat,
            opcode::LT => OperatorKind::LessThan,
            opcode::LE => OperatorKind::LessEqual,
            opcode::EQ => OperatorKind::Equal,
            opcode::GE => OperatorKind::GreaterEqual,
            opcode::GT => OperatorKind::GreaterThan,
            opcode::NE => OperatorKind::NotEqual,
            opcode::ISECT => OperatorKind::Intersect,
            opcode::UNION => OperatorKind::Union,
            opcode::RANGE => OperatorKind::Range,
            opcode::UPLUS => OperatorKind::UnaryPlus,
            opcode::UMINUS => OperatorKind::UnaryMinus,
            opcode::PERCENT => OperatorKind::Percent,
            _ => return None,
        };
        Some(kind)
    }

    pub fn opcode(self) -> u8 {
        match self {
            OperatorKind::Add => opcode::ADD,
            OperatorKind::Subtract => opcode::SUB,
            OperatorKind::Multiply => opcode::MUL,
            OperatorKind::Divide => opcode::DIV,
            OperatorKind::Power => opcode::POWER,
            OperatorKind::Concat => opcode::CONCAT,
            OperatorKind::LessThan => opcode::LT,
            OperatorKind::LessEqual => opcode::LE,
            OperatorKind::Equal => opcode::EQ,
            OperatorKind::GreaterEqual => opcode::GE,
            OperatorKind::GreaterThan => opcode::GT,
            OperatorKind::NotEqual => opcode::NE,
            OperatorKind::Intersect => opcode::ISECT,
            OperatorKind::Union => opcode::UNION,
            OperatorKind::Range => opcode::RANGE,
            OperatorKind::UnaryPlus => opcode::UPLUS,
            OperatorKind::UnaryMinus => opcode::UMINUS,
            OperatorKind::Percent => opcode::PERCENT,
        }
    }

    /// Number of operands consumed
    pub fn arity(self) -> usize {
        if self.is_unary() {
            1
        } else {
            2
        }
    }

    pub fn is_unary(self) -> bool {
        matches!(
            self,
            OperatorKind::UnaryPlus | OperatorKind::UnaryMinus | OperatorKind::Percent
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            OperatorKind::LessThan
                | OperatorKind::LessEqual
                | OperatorKind::Equal
                | OperatorKind::GreaterEqual
                | OperatorKind::GreaterThan
                | OperatorKind::NotEqual
        )
    }

    /// Operators that combine references rather than values
    pub fn is_reference_operator(self) -> bool {
        matches!(
            self,
            OperatorKind::Intersect | OperatorKind::Union | OperatorKind::Range
        )
    }

    /// Operator text as written in a formula
    pub fn symbol(self) -> &'static str {
        match self {
            OperatorKind::Add | OperatorKind::UnaryPlus => "+",
            OperatorKind::Subtract | OperatorKind::UnaryMinus => "-",
            OperatorKind::Multiply => "*",
            OperatorKind::Divide => "/",
            OperatorKind::Power => "^",
            OperatorKind::Concat => "&",
            OperatorKind::LessThan => "<",
            OperatorKind::LessEqual => "<=",
            OperatorKind::Equal => "=",
            OperatorKind::GreaterEqual => ">=",
            OperatorKind::GreaterThan => ">",
            OperatorKind::NotEqual => "<>",
            OperatorKind::Intersect => " ",
            OperatorKind::Union => ",",
            OperatorKind::Range => ":",
            OperatorKind::Percent => "%",
        }
    }
}

/// Tokens that steer evaluation or display without computing anything
/// (except [`ControlKind::AttrSum`], a one-argument SUM)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    /// Explicit parentheses, kept for display only
    Paren,
    AttrSum,
    AttrIf,
    AttrChoose,
    AttrGoto,
    AttrSpace,
    AttrVolatile,
}

impl ControlKind {
    /// Classify a `tAttr` token from its option byte
    ///
    /// Several bits may be set at once (a volatile space, for example); the
    /// bit that changes evaluation wins.
    pub fn from_attr_bits(bits: u8) -> Option<Self> {
        if bits & attr::SUM != 0 {
            Some(ControlKind::AttrSum)
        } else if bits & attr::IF != 0 {
            Some(ControlKind::AttrIf)
        } else if bits & attr::CHOOSE != 0 {
            Some(ControlKind::AttrChoose)
        } else if bits & attr::GOTO != 0 {
            Some(ControlKind::AttrGoto)
        } else if bits & attr::SPACE != 0 {
            Some(ControlKind::AttrSpace)
        } else if bits & attr::VOLATILE != 0 {
            Some(ControlKind::AttrVolatile)
        } else {
            None
        }
    }

    pub fn arity(self) -> usize {
        match self {
            ControlKind::AttrSum => 1,
            _ => 0,
        }
    }
}

/// One entry of a reference list produced by the reference operators
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    Cell {
        sheet: Option<String>,
        address: CellAddress,
    },
    Area {
        sheet: Option<String>,
        range: CellRange,
    },
    /// A `#REF!` or `#NULL!` placeholder
    Invalid(CellError),
}

impl Reference {
    pub fn cell(sheet: Option<String>, address: CellAddress) -> Self {
        Reference::Cell { sheet, address }
    }

    pub fn area(sheet: Option<String>, range: CellRange) -> Self {
        Reference::Area { sheet, range }
    }

    /// Parse reference text such as `Sheet1!A1`, `B2:C3` or `#REF!`
    pub fn parse(text: &str) -> Result<Self, CalculationError> {
        let text = text.trim();
        match CellError::from_str(text) {
            Some(e @ (CellError::Ref | CellError::Null)) => return Ok(Reference::Invalid(e)),
            Some(_) => return Err(CalculationError::Value),
            None => {}
        }
        let parsed = SheetReference::parse(text).map_err(|_| CalculationError::Value)?;
        if parsed.is_area {
            Ok(Reference::area(parsed.sheet, parsed.range))
        } else {
            Ok(Reference::cell(parsed.sheet, parsed.range.start))
        }
    }

    pub fn sheet(&self) -> Option<&str> {
        match self {
            Reference::Cell { sheet, .. } | Reference::Area { sheet, .. } => sheet.as_deref(),
            Reference::Invalid(_) => None,
        }
    }

    /// Area covered by this reference
    pub fn range(&self) -> Option<CellRange> {
        match self {
            Reference::Cell { address, .. } => Some(CellRange::single(*address)),
            Reference::Area { range, .. } => Some(*range),
            Reference::Invalid(_) => None,
        }
    }

    /// Split an area into its single cells (row-major)
    pub fn cells(&self) -> Vec<Reference> {
        match self {
            Reference::Area { sheet, range } => range
                .cells()
                .map(|address| Reference::cell(sheet.clone(), address))
                .collect(),
            other => vec![other.clone()],
        }
    }

    /// Equivalent operand token
    pub fn to_token(&self) -> Token {
        match self {
            Reference::Cell { sheet, address } => Token::CellRef {
                sheet: sheet.clone(),
                address: *address,
            },
            Reference::Area { sheet, range } => Token::RangeRef {
                sheet: sheet.clone(),
                first: range.start,
                last: range.end,
            },
            Reference::Invalid(e) => Token::error(*e),
        }
    }

    /// Resolve to the referenced value(s)
    pub fn value(&self, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
        match self {
            Reference::Cell { sheet, address } => Ok(ctx
                .resolver
                .resolve_cell(sheet.as_deref(), *address)?
                .into()),
            Reference::Area { sheet, range } => {
                let rows = ctx.resolver.resolve_range(sheet.as_deref(), *range)?;
                Ok(rows_to_value(rows))
            }
            Reference::Invalid(e) => Ok(FormulaValue::Error(*e)),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Cell { sheet, address } => {
                write!(f, "{}", SheetReference::cell(sheet.clone(), *address))
            }
            Reference::Area { sheet, range } => write!(
                f,
                "{}",
                SheetReference {
                    sheet: sheet.clone(),
                    range: *range,
                    is_area: true,
                }
            ),
            Reference::Invalid(e) => write!(f, "{}", e),
        }
    }
}

/// A single parsed formula token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Floating-point literal (`tNum`)
    Number(f64),
    /// Integer literal (`tInt`, 0..=65535 on disk)
    Integer(i32),
    /// String literal (`tStr`)
    Text(String),
    /// Boolean literal (`tBool`)
    Boolean(bool),
    /// Error literal or computed error
    ///
    /// `circular` marks errors caused by a circular reference; they display
    /// as `#VALUE!`.
    Error { error: CellError, circular: bool },
    /// Omitted function argument (`tMissArg`)
    Missing,
    /// Empty value
    Blank,
    /// Single-cell reference (`tRef`, `tRef3d`)
    CellRef {
        sheet: Option<String>,
        address: CellAddress,
    },
    /// Area reference (`tArea`, `tArea3d`); corners as stored, not normalized
    RangeRef {
        sheet: Option<String>,
        first: CellAddress,
        last: CellAddress,
    },
    /// Defined name by index (`tName`)
    NameRef { id: u16 },
    /// Inline constant array (`tArray`)
    Array { rows: Vec<Vec<CellValue>> },
    /// Pointer to a shared formula body (`tExp`)
    SharedFormula { anchor: CellAddress },
    /// Result of the reference operators
    ReferenceList(Vec<Reference>),
    Operator(OperatorKind),
    Control(ControlKind),
    /// Built-in function call (`tFunc`, `tFuncVar`)
    Function {
        id: u16,
        arg_count: u8,
        returns_array: bool,
    },
}

impl Token {
    /// Error token
    pub fn error(error: CellError) -> Self {
        Token::Error {
            error,
            circular: false,
        }
    }

    /// Error token for a trapped calculation failure
    pub fn from_calculation(error: CalculationError) -> Self {
        Token::Error {
            error: error.cell_error(),
            circular: error.is_circular(),
        }
    }

    pub fn text<S: Into<String>>(s: S) -> Self {
        Token::Text(s.into())
    }

    pub fn cell_ref(sheet: Option<&str>, address: CellAddress) -> Self {
        Token::CellRef {
            sheet: sheet.map(str::to_string),
            address,
        }
    }

    pub fn range_ref(sheet: Option<&str>, first: CellAddress, last: CellAddress) -> Self {
        Token::RangeRef {
            sheet: sheet.map(str::to_string),
            first,
            last,
        }
    }

    /// Reference token parsed from `A1`, `Sheet1!B2:C3` and similar text
    pub fn reference(text: &str) -> FormulaResult<Self> {
        match Reference::parse(text) {
            Ok(Reference::Invalid(_)) | Err(_) => {
                Err(FormulaError::InvalidReference(text.to_string()))
            }
            Ok(reference) => Ok(reference.to_token()),
        }
    }

    pub fn array(rows: Vec<Vec<CellValue>>) -> Self {
        Token::Array { rows }
    }

    pub fn operator(kind: OperatorKind) -> Self {
        Token::Operator(kind)
    }

    /// Function call token with a variable argument count
    ///
    /// The argument count is masked to 7 bits and the id to 15 bits, the
    /// widths of the `tFuncVar` fields.
    pub fn function(id: u16, arg_count: u8) -> Self {
        Token::Function {
            id: id & 0x7FFF,
            arg_count: arg_count & 0x7F,
            returns_array: false,
        }
    }

    /// Build an operator or control token from its opcode byte
    ///
    /// Covers the unclassified tokens that carry no payload.
    pub fn from_opcode(code: u8) -> FormulaResult<Self> {
        if let Some(kind) = OperatorKind::from_opcode(code) {
            return Ok(Token::Operator(kind));
        }
        match code {
            opcode::PAREN => Ok(Token::Control(ControlKind::Paren)),
            opcode::MISS_ARG => Ok(Token::Missing),
            _ => Err(FormulaError::UnknownOpcode(code)),
        }
    }

    /// Build a `tAttr` token from its option byte
    pub fn attr(bits: u8) -> FormulaResult<Self> {
        ControlKind::from_attr_bits(bits)
            .map(Token::Control)
            .ok_or(FormulaError::UnknownOpcode(opcode::ATTR))
    }

    /// Build a function token from a classified `tFunc`/`tFuncVar` opcode
    ///
    /// Fixed-arity calls (`tFunc`) carry no argument count; it comes from the
    /// function table. `tFuncVar` calls must supply `arg_count`.
    pub fn function_from_opcode(code: u8, id: u16, arg_count: Option<u8>) -> FormulaResult<Self> {
        let id = id & 0x7FFF;
        let returns_array = code & opcode::CLASS_MASK == opcode::CLASS_ARRAY;
        let base = (code & 0x1F) | 0x20;
        let arg_count = match (base, arg_count) {
            (opcode::FUNC_VAR, Some(count)) => count & 0x7F,
            (opcode::FUNC, _) => {
                let def = functions::registry()
                    .get(id)
                    .ok_or(FormulaError::FunctionNotSupported { id })?;
                def.min_args as u8
            }
            _ => return Err(FormulaError::UnknownOpcode(code)),
        };
        Ok(Token::Function {
            id,
            arg_count,
            returns_array,
        })
    }

    /// Base opcode of this token, if it has a single-byte encoding
    pub fn opcode(&self) -> Option<u8> {
        let code = match self {
            Token::Number(_) => opcode::NUM,
            Token::Integer(_) => opcode::INT,
            Token::Text(_) => opcode::STR,
            Token::Boolean(_) => opcode::BOOL,
            Token::Error { .. } => opcode::ERR,
            Token::Missing => opcode::MISS_ARG,
            Token::CellRef { sheet: None, .. } => opcode::REF,
            Token::CellRef { .. } => opcode::REF_3D,
            Token::RangeRef { sheet: None, .. } => opcode::AREA,
            Token::RangeRef { .. } => opcode::AREA_3D,
            Token::NameRef { .. } => opcode::NAME,
            Token::Array { .. } => opcode::ARRAY,
            Token::SharedFormula { .. } => opcode::EXP,
            Token::Operator(kind) => kind.opcode(),
            Token::Control(ControlKind::Paren) => opcode::PAREN,
            Token::Control(_) => opcode::ATTR,
            Token::Function { .. } => opcode::FUNC_VAR,
            Token::Blank | Token::ReferenceList(_) => return None,
        };
        Some(code)
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, Token::Operator(_))
    }

    pub fn is_control(&self) -> bool {
        matches!(self, Token::Control(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Token::Function { .. })
    }

    /// Tokens that push themselves onto the value stack
    pub fn is_operand(&self) -> bool {
        !(self.is_operator() || self.is_control() || self.is_function())
    }

    pub fn is_binary(&self) -> bool {
        self.arity() == Some(2) && self.is_operator()
    }

    /// Unary operators and the one-argument SUM attribute
    pub fn is_unary(&self) -> bool {
        match self {
            Token::Operator(kind) => kind.is_unary(),
            Token::Control(ControlKind::AttrSum) => true,
            _ => false,
        }
    }

    /// Tokens that consume nothing from the value stack
    pub fn is_standalone(&self) -> bool {
        self.arity() == Some(0)
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Token::CellRef { .. }
                | Token::RangeRef { .. }
                | Token::NameRef { .. }
                | Token::ReferenceList(_)
        )
    }

    /// Operands consumed; `None` for operand tokens
    pub fn arity(&self) -> Option<usize> {
        match self {
            Token::Operator(kind) => Some(kind.arity()),
            Token::Control(kind) => Some(kind.arity()),
            Token::Function { arg_count, .. } => Some(*arg_count as usize),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Token::Error { .. })
    }

    /// Normalized area of a range reference
    pub fn area(&self) -> Option<CellRange> {
        match self {
            Token::RangeRef { first, last, .. } => Some(CellRange::new(*first, *last)),
            Token::CellRef { address, .. } => Some(CellRange::single(*address)),
            _ => None,
        }
    }

    /// Element tokens of a composite operand
    ///
    /// Arrays yield their elements row-major, areas their cells, names what
    /// they refer to and reference lists their cells (invalid entries become
    /// error tokens). `None` for tokens that are not composites.
    pub fn components(&self, ctx: &EvaluationContext) -> FormulaResult<Option<Vec<Token>>> {
        let components = match self {
            Token::Array { rows } => rows
                .iter()
                .flatten()
                .map(|v| FormulaValue::from(v.clone()).into_token())
                .collect(),
            Token::RangeRef { sheet, .. } => self
                .area()
                .map(|range| {
                    range
                        .cells()
                        .map(|address| Token::CellRef {
                            sheet: sheet.clone(),
                            address,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            Token::NameRef { id } => {
                let nested = ctx.nested()?;
                let definition = ctx.resolver.resolve_name(*id)?;
                let target = evaluate_nested(&definition, &nested)?;
                match target.components(&nested)? {
                    Some(components) => components,
                    None => vec![target],
                }
            }
            Token::ReferenceList(refs) => refs
                .iter()
                .flat_map(Reference::cells)
                .map(|r| r.to_token())
                .collect(),
            _ => return Ok(None),
        };
        Ok(Some(components))
    }

    /// Resolve this operand to a plain value
    ///
    /// References are looked up through the resolver and names and shared
    /// formulas are evaluated. Operators, controls and functions are not
    /// values.
    pub fn value(&self, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
        match self {
            Token::Number(n) => Ok(FormulaValue::Number(*n)),
            Token::Integer(i) => Ok(FormulaValue::Number(*i as f64)),
            Token::Text(s) => Ok(FormulaValue::String(s.clone())),
            Token::Boolean(b) => Ok(FormulaValue::Boolean(*b)),
            Token::Error { error, .. } => Ok(FormulaValue::Error(*error)),
            Token::Missing | Token::Blank => Ok(FormulaValue::Empty),
            Token::CellRef { sheet, address } => Ok(ctx
                .resolver
                .resolve_cell(sheet.as_deref(), *address)?
                .into()),
            Token::RangeRef { sheet, first, last } => {
                let rows = ctx
                    .resolver
                    .resolve_range(sheet.as_deref(), CellRange::new(*first, *last))?;
                Ok(rows_to_value(rows))
            }
            Token::NameRef { id } => {
                let nested = ctx.nested()?;
                let definition = ctx.resolver.resolve_name(*id)?;
                evaluate_nested(&definition, &nested)?.value(&nested)
            }
            Token::SharedFormula { anchor } => {
                let nested = ctx.nested()?;
                let body = ctx.resolver.resolve_shared_formula(*anchor)?;
                evaluate_nested(&body, &nested)?.value(&nested)
            }
            Token::Array { rows } => Ok(rows_to_value(rows.clone())),
            Token::ReferenceList(refs) => match refs.as_slice() {
                [] => Err(CalculationError::Null.into()),
                [single] => single.value(ctx),
                many => {
                    let mut values = Vec::new();
                    for reference in many.iter().flat_map(Reference::cells) {
                        values.push(reference.value(ctx)?);
                    }
                    Ok(FormulaValue::Array(vec![values]))
                }
            },
            Token::Operator(_) | Token::Control(_) | Token::Function { .. } => {
                Err(FormulaError::UnsupportedToken(self.to_string()))
            }
        }
    }
}

pub(crate) fn rows_to_value(rows: Vec<Vec<CellValue>>) -> FormulaValue {
    FormulaValue::Array(
        rows.into_iter()
            .map(|row| row.into_iter().map(FormulaValue::from).collect())
            .collect(),
    )
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &CellValue) -> fmt::Result {
    match value {
        CellValue::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
        other => write!(f, "{}", other),
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", biffcalc_core::format_number(*n)),
            Token::Integer(i) => write!(f, "{}", i),
            Token::Text(s) => write_literal(f, &CellValue::String(s.clone())),
            Token::Boolean(true) => f.write_str("TRUE"),
            Token::Boolean(false) => f.write_str("FALSE"),
            Token::Error { error, .. } => write!(f, "{}", error),
            Token::Missing | Token::Blank => Ok(()),
            Token::CellRef { sheet, address } => {
                write!(f, "{}", SheetReference::cell(sheet.clone(), *address))
            }
            Token::RangeRef { sheet, first, last } => {
                if let Some(sheet) = sheet {
                    let qualified = SheetReference::cell(Some(sheet.clone()), *first).to_string();
                    write!(f, "{}:{}", qualified, last)
                } else {
                    write!(f, "{}:{}", first, last)
                }
            }
            Token::NameRef { id } => write!(f, "NAME({})", id),
            Token::Array { rows } => {
                f.write_str("{")?;
                for (r, row) in rows.iter().enumerate() {
                    if r > 0 {
                        f.write_str(";")?;
                    }
                    for (c, value) in row.iter().enumerate() {
                        if c > 0 {
                            f.write_str(",")?;
                        }
                        write_literal(f, value)?;
                    }
                }
                f.write_str("}")
            }
            Token::SharedFormula { anchor } => write!(f, "EXP({})", anchor),
            Token::ReferenceList(refs) => {
                for (i, reference) in refs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", reference)?;
                }
                Ok(())
            }
            Token::Operator(kind) => f.write_str(kind.symbol()),
            Token::Control(ControlKind::Paren) => f.write_str("()"),
            Token::Control(ControlKind::AttrSum) => f.write_str("SUM"),
            Token::Control(kind) => write!(f, "{:?}", kind),
            Token::Function { id, .. } => match functions::registry().get(*id) {
                Some(def) => f.write_str(def.name),
                None => write!(f, "FUNC{}", id),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn test_classification() {
        assert!(Token::Number(1.0).is_operand());
        assert!(Token::Missing.is_operand());
        assert!(Token::ReferenceList(vec![]).is_operand());
        assert!(Token::Operator(OperatorKind::Add).is_binary());
        assert!(!Token::Operator(OperatorKind::Add).is_unary());
        assert!(Token::Operator(OperatorKind::Percent).is_unary());
        assert!(Token::Control(ControlKind::AttrSum).is_unary());
        assert!(Token::Control(ControlKind::Paren).is_standalone());
        assert!(Token::function(34, 0).is_standalone());
        assert!(!Token::function(4, 2).is_standalone());
        assert_eq!(Token::Text("x".into()).arity(), None);
        assert_eq!(Token::function(4, 3).arity(), Some(3));
    }

    #[test]
    fn test_from_opcode() {
        assert_eq!(
            Token::from_opcode(0x03).unwrap(),
            Token::Operator(OperatorKind::Add)
        );
        assert_eq!(
            Token::from_opcode(0x11).unwrap(),
            Token::Operator(OperatorKind::Range)
        );
        assert_eq!(
            Token::from_opcode(0x15).unwrap(),
            Token::Control(ControlKind::Paren)
        );
        assert_eq!(Token::from_opcode(0x16).unwrap(), Token::Missing);
        assert_eq!(
            Token::from_opcode(0x02).unwrap_err(),
            FormulaError::UnknownOpcode(0x02)
        );
        for code in 0x03..=0x14u8 {
            let token = Token::from_opcode(code).unwrap();
            assert_eq!(token.opcode(), Some(code));
        }
    }

    #[test]
    fn test_attr_bits() {
        assert_eq!(ControlKind::from_attr_bits(0x10), Some(ControlKind::AttrSum));
        assert_eq!(ControlKind::from_attr_bits(0x02), Some(ControlKind::AttrIf));
        assert_eq!(ControlKind::from_attr_bits(0x41), Some(ControlKind::AttrSpace));
        assert_eq!(ControlKind::from_attr_bits(0x01), Some(ControlKind::AttrVolatile));
        assert_eq!(ControlKind::from_attr_bits(0x00), None);
        assert!(Token::attr(0x20).is_err());
    }

    #[test]
    fn test_function_tokens() {
        assert_eq!(
            Token::function(0x8004, 0xFF),
            Token::Function {
                id: 4,
                arg_count: 0x7F,
                returns_array: false
            }
        );
        // tFuncV (value class) NOT(x) has a fixed argument count
        assert_eq!(
            Token::function_from_opcode(0x41, 38, None).unwrap(),
            Token::Function {
                id: 38,
                arg_count: 1,
                returns_array: false
            }
        );
        assert_eq!(
            Token::function_from_opcode(0x62, 4, Some(3)).unwrap(),
            Token::Function {
                id: 4,
                arg_count: 3,
                returns_array: true
            }
        );
        assert_eq!(
            Token::function_from_opcode(0x21, 9999, None).unwrap_err(),
            FormulaError::FunctionNotSupported { id: 9999 }
        );
        assert!(Token::function_from_opcode(0x22, 4, None).is_err());
    }

    #[test]
    fn test_reference_parse() {
        assert_eq!(
            Reference::parse("Sheet2!B3").unwrap(),
            Reference::cell(Some("Sheet2".into()), addr("B3"))
        );
        assert_eq!(
            Reference::parse("A1:B2").unwrap(),
            Reference::area(None, CellRange::parse("A1:B2").unwrap())
        );
        assert_eq!(
            Reference::parse("#REF!").unwrap(),
            Reference::Invalid(CellError::Ref)
        );
        assert_eq!(Reference::parse("#N/A"), Err(CalculationError::Value));
        assert_eq!(Reference::parse("not a ref!!"), Err(CalculationError::Value));
    }

    #[test]
    fn test_components() {
        let ctx = EvaluationContext::simple();
        let array = Token::array(vec![
            vec![CellValue::Number(1.0), CellValue::from("a")],
            vec![CellValue::Boolean(true), CellValue::Empty],
        ]);
        assert_eq!(
            array.components(&ctx).unwrap(),
            Some(vec![
                Token::Number(1.0),
                Token::text("a"),
                Token::Boolean(true),
                Token::Blank
            ])
        );

        let range = Token::range_ref(None, addr("B2"), addr("A1"));
        let cells = range.components(&ctx).unwrap().unwrap();
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0], Token::cell_ref(None, addr("A1")));
        assert_eq!(cells[3], Token::cell_ref(None, addr("B2")));

        let list = Token::ReferenceList(vec![
            Reference::cell(None, addr("C1")),
            Reference::Invalid(CellError::Ref),
        ]);
        assert_eq!(
            list.components(&ctx).unwrap(),
            Some(vec![
                Token::cell_ref(None, addr("C1")),
                Token::error(CellError::Ref)
            ])
        );

        assert_eq!(Token::Number(3.0).components(&ctx).unwrap(), None);
    }

    #[test]
    fn test_value_of_reference_list() {
        let ctx = EvaluationContext::simple();
        assert_eq!(
            Token::ReferenceList(vec![]).value(&ctx).unwrap_err(),
            FormulaError::Calculation(CalculationError::Null)
        );
        assert_eq!(
            Token::ReferenceList(vec![Reference::Invalid(CellError::Ref)])
                .value(&ctx)
                .unwrap(),
            FormulaValue::Error(CellError::Ref)
        );
        assert!(Token::Operator(OperatorKind::Add).value(&ctx).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Token::Number(2.5).to_string(), "2.5");
        assert_eq!(Token::text("say \"hi\"").to_string(), "\"say \"\"hi\"\"\"");
        assert_eq!(Token::error(CellError::Div0).to_string(), "#DIV/0!");
        assert_eq!(
            Token::range_ref(Some("Data"), addr("A1"), addr("B2")).to_string(),
            "Data!A1:B2"
        );
        assert_eq!(
            Token::array(vec![
                vec![CellValue::Number(1.0), CellValue::from("x")],
                vec![CellValue::Boolean(false), CellValue::Number(0.5)],
            ])
            .to_string(),
            "{1,\"x\";FALSE,0.5}"
        );
        assert_eq!(Token::function(4, 2).to_string(), "SUM");
        assert_eq!(Token::function(600, 1).to_string(), "FUNC600");
    }
}
