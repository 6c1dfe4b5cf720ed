//! Criteria matching for SUMIF and COUNTIF
//!
//! A criteria string is an optional relational operator followed by an
//! operand: `">=10"`, `"<>apple"`, `"a*"`, `"50%"`. The operand may contain
//! wildcards (`*` any run, `?` exactly one character, `~` escapes the next
//! character) and compares case-insensitively.

use std::cmp::Ordering;
use std::str::FromStr;

use biffcalc_core::{date, format_number, CellValue};
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;

use crate::value::{parse_number_text, FormulaValue};

/// Relational operator at the front of a criteria string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriteriaOperator {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl CriteriaOperator {
    /// Parse operator text; an empty prefix means equality
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "" | "=" => Some(CriteriaOperator::Equal),
            "<>" => Some(CriteriaOperator::NotEqual),
            "<" => Some(CriteriaOperator::LessThan),
            "<=" => Some(CriteriaOperator::LessEqual),
            ">" => Some(CriteriaOperator::GreaterThan),
            ">=" => Some(CriteriaOperator::GreaterEqual),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CriteriaOperator::Equal => "=",
            CriteriaOperator::NotEqual => "<>",
            CriteriaOperator::LessThan => "<",
            CriteriaOperator::LessEqual => "<=",
            CriteriaOperator::GreaterThan => ">",
            CriteriaOperator::GreaterEqual => ">=",
        }
    }

    /// Decide from `criteria.cmp(value)`
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            CriteriaOperator::Equal => ordering == Ordering::Equal,
            CriteriaOperator::NotEqual => ordering != Ordering::Equal,
            CriteriaOperator::LessThan => ordering == Ordering::Greater,
            CriteriaOperator::LessEqual => ordering != Ordering::Less,
            CriteriaOperator::GreaterThan => ordering == Ordering::Less,
            CriteriaOperator::GreaterEqual => ordering != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Piece {
    Char(char),
    AnyRun,
    AnyOne,
}

/// A criteria operand prepared for matching
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    literal: String,
    regex: Option<Regex>,
}

impl WildcardPattern {
    /// Uppercased operand with escapes resolved and percentages applied
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Whether the operand contains unescaped wildcards
    pub fn has_wildcards(&self) -> bool {
        self.regex.is_some()
    }

    /// Match a whole text value
    pub fn is_match(&self, text: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(text),
            None => self.literal == text.to_uppercase(),
        }
    }
}

/// Translate a criteria operand into a matchable pattern
///
/// `*` becomes "any run", `?` "exactly one character" and `~` makes the
/// next character literal (`~~` is a literal tilde). A trailing `%` after a
/// plain number turns it into a fraction, so `50%` reads as `0.5`. The
/// operand is uppercased.
pub fn translate_wildcard(criteria: &str) -> WildcardPattern {
    let upper = criteria.to_uppercase();
    let mut pieces = Vec::with_capacity(upper.len());
    let mut chars = upper.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '~' => match chars.peek() {
                Some(&next @ ('*' | '?' | '~')) => {
                    chars.next();
                    pieces.push(Piece::Char(next));
                }
                _ => pieces.push(Piece::Char('~')),
            },
            '*' => pieces.push(Piece::AnyRun),
            '?' => pieces.push(Piece::AnyOne),
            '%' if chars.peek().is_none() => match percent_fraction(&pieces) {
                Some(fraction) => pieces = fraction.chars().map(Piece::Char).collect(),
                None => pieces.push(Piece::Char('%')),
            },
            other => pieces.push(Piece::Char(other)),
        }
    }

    let literal = pieces
        .iter()
        .map(|p| match p {
            Piece::Char(c) => *c,
            Piece::AnyRun => '*',
            Piece::AnyOne => '?',
        })
        .collect();

    let regex = if pieces.iter().any(|p| !matches!(p, Piece::Char(_))) {
        let mut pattern = String::from("^(?:");
        for piece in &pieces {
            match piece {
                Piece::Char(c) => pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
                Piece::AnyRun => pattern.push_str(".*"),
                Piece::AnyOne => pattern.push('.'),
            }
        }
        pattern.push_str(")$");
        match RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
        {
            Ok(regex) => Some(regex),
            Err(e) => {
                log::warn!("criteria pattern {:?} did not compile: {}", criteria, e);
                None
            }
        }
    } else {
        None
    };

    WildcardPattern { literal, regex }
}

/// `"50"` → `"0.5"` when the pieces are a plain decimal number
fn percent_fraction(pieces: &[Piece]) -> Option<String> {
    let text: String = pieces
        .iter()
        .map(|p| match p {
            Piece::Char(c) if c.is_ascii_digit() || *c == '.' => Some(*c),
            _ => None,
        })
        .collect::<Option<_>>()?;
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let value = Decimal::from_str(&text).ok()?;
    let fraction = value.checked_div(Decimal::ONE_HUNDRED)?;
    Some(fraction.normalize().to_string())
}

/// Length of the relational operator at the front of `criteria`
///
/// `">=10"` → 2, `"<>x"` → 2, `"abc"` → 0.
pub fn split_leading_operator(criteria: &str) -> usize {
    criteria
        .char_indices()
        .find(|(_, c)| !matches!(c, '<' | '>' | '='))
        .map(|(i, _)| i)
        .unwrap_or(criteria.len())
}

/// Test a cell value against a criteria operand
///
/// `criteria` is the operand without its operator. Booleans compare as
/// `true`/`false` text, strings by wildcard pattern or case-insensitive
/// text, and numbers numerically (falling back to a date serial and then
/// to text). Empty and error values never match.
pub fn compare(value: &CellValue, criteria: &str, op: CriteriaOperator) -> bool {
    let pattern = translate_wildcard(criteria);
    matches_pattern(value, criteria, &pattern, op, false)
}

fn matches_pattern(
    value: &CellValue,
    criteria: &str,
    pattern: &WildcardPattern,
    op: CriteriaOperator,
    date_1904: bool,
) -> bool {
    let ordering = match value {
        CellValue::Boolean(b) => {
            let wanted = criteria.trim().eq_ignore_ascii_case("true");
            Some(wanted.to_string().cmp(&b.to_string()))
        }
        CellValue::String(s) if pattern.has_wildcards() => Some(if pattern.is_match(s) {
            Ordering::Equal
        } else {
            Ordering::Less
        }),
        CellValue::String(s) => Some(pattern.literal().cmp(s.to_uppercase().as_str())),
        CellValue::Number(n) => match parse_number_text(pattern.literal())
            .or_else(|| date::parse_date_serial(criteria, date_1904))
        {
            Some(wanted) => wanted.partial_cmp(n),
            None => Some(pattern.literal().cmp(format_number(*n).to_uppercase().as_str())),
        },
        CellValue::Empty | CellValue::Error(_) => None,
    };
    ordering.map(|o| op.accepts(o)).unwrap_or(false)
}

/// A parsed criteria argument
#[derive(Debug, Clone)]
pub struct Criteria {
    operator: Option<CriteriaOperator>,
    operand: String,
    pattern: WildcardPattern,
}

impl Criteria {
    /// Parse criteria text such as `">=10"` or `"app*"`
    pub fn new(text: &str) -> Self {
        let split = split_leading_operator(text);
        let operator = CriteriaOperator::parse(&text[..split]);
        if operator.is_none() {
            log::debug!("unrecognized criteria operator {:?}", &text[..split]);
        }
        let operand = text[split..].to_string();
        let pattern = translate_wildcard(&operand);
        Self {
            operator,
            operand,
            pattern,
        }
    }

    /// Criteria from a function argument value
    pub fn from_value(value: &FormulaValue) -> Self {
        Self::new(&value.first().as_string())
    }

    pub fn operator(&self) -> Option<CriteriaOperator> {
        self.operator
    }

    pub fn operand(&self) -> &str {
        &self.operand
    }

    /// Check if a value matches; an unrecognized operator matches nothing
    pub fn matches(&self, value: &CellValue, date_1904: bool) -> bool {
        match self.operator {
            Some(op) => matches_pattern(value, &self.operand, &self.pattern, op, date_1904),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_translate_wildcard() {
        let pattern = translate_wildcard("a*c");
        assert!(pattern.has_wildcards());
        assert!(pattern.is_match("ABC"));
        assert!(pattern.is_match("ac"));
        assert!(pattern.is_match("aXYZc"));
        assert!(!pattern.is_match("abcd"));

        let mixed = translate_wildcard("AB*C?");
        assert!(mixed.is_match("ABXXXCZ"));
        assert!(!mixed.is_match("ABC"));

        let one = translate_wildcard("?x");
        assert!(one.is_match("ax"));
        assert!(!one.is_match("x"));
        assert!(!one.is_match("abx"));
    }

    #[test]
    fn test_tilde_escapes() {
        let star = translate_wildcard("a~*");
        assert!(!star.has_wildcards());
        assert_eq!(star.literal(), "A*");
        assert!(star.is_match("a*"));
        assert!(!star.is_match("ab"));

        let bare = translate_wildcard("~*");
        assert!(bare.is_match("*"));
        assert!(!bare.is_match("x"));
        assert!(!bare.is_match("**"));

        assert_eq!(translate_wildcard("~~").literal(), "~");
        assert_eq!(translate_wildcard("5~").literal(), "5~");
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let pattern = translate_wildcard("(1+1)*");
        assert!(pattern.is_match("(1+1)=2"));
        assert!(!pattern.is_match("11"));
    }

    #[test]
    fn test_percent_operand() {
        assert_eq!(translate_wildcard("50%").literal(), "0.5");
        assert_eq!(translate_wildcard("150%").literal(), "1.5");
        assert_eq!(translate_wildcard("abc%").literal(), "ABC%");
    }

    #[test]
    fn test_split_leading_operator() {
        assert_eq!(split_leading_operator(">=10"), 2);
        assert_eq!(split_leading_operator("<>apple"), 2);
        assert_eq!(split_leading_operator("<5"), 1);
        assert_eq!(split_leading_operator("apple"), 0);
        assert_eq!(split_leading_operator("*x"), 0);
        assert_eq!(split_leading_operator("="), 1);
    }

    #[test]
    fn test_compare_numbers() {
        let five = CellValue::Number(5.0);
        assert!(compare(&five, "5", CriteriaOperator::Equal));
        assert!(compare(&five, "10", CriteriaOperator::LessThan));
        assert!(!compare(&five, "5", CriteriaOperator::LessThan));
        assert!(compare(&five, "5", CriteriaOperator::LessEqual));
        assert!(compare(&five, "4", CriteriaOperator::GreaterThan));
        assert!(compare(&five, "5", CriteriaOperator::GreaterEqual));
        assert!(compare(&five, "6", CriteriaOperator::NotEqual));
        assert!(compare(&CellValue::Number(0.5), "50%", CriteriaOperator::Equal));
    }

    #[test]
    fn test_compare_dates() {
        let serial = CellValue::Number(45306.0);
        assert!(compare(&serial, "1/15/2024", CriteriaOperator::Equal));
        assert!(compare(&serial, "2024-01-01", CriteriaOperator::GreaterThan));
    }

    #[test]
    fn test_compare_text() {
        let apple = CellValue::from("Apple");
        assert!(compare(&apple, "apple", CriteriaOperator::Equal));
        assert!(compare(&apple, "ap*", CriteriaOperator::Equal));
        assert!(!compare(&apple, "b*", CriteriaOperator::Equal));
        assert!(compare(&apple, "b*", CriteriaOperator::NotEqual));
        assert!(compare(&apple, "banana", CriteriaOperator::LessThan));
        assert!(!compare(&apple, "5", CriteriaOperator::Equal));
    }

    #[test]
    fn test_compare_booleans_and_others() {
        assert!(compare(&CellValue::Boolean(true), "TRUE", CriteriaOperator::Equal));
        assert!(compare(&CellValue::Boolean(false), "true", CriteriaOperator::NotEqual));
        assert!(!compare(&CellValue::Empty, "", CriteriaOperator::Equal));
        assert!(!compare(
            &CellValue::Error(biffcalc_core::CellError::Na),
            "#N/A",
            CriteriaOperator::Equal
        ));
    }

    #[test]
    fn test_criteria_parsing() {
        let criteria = Criteria::new(">=10");
        assert_eq!(criteria.operator(), Some(CriteriaOperator::GreaterEqual));
        assert_eq!(criteria.operand(), "10");
        assert!(criteria.matches(&CellValue::Number(10.0), false));
        assert!(!criteria.matches(&CellValue::Number(9.0), false));

        let bogus = Criteria::new("=>5");
        assert_eq!(bogus.operator(), None);
        assert!(!bogus.matches(&CellValue::Number(5.0), false));

        let numeric = Criteria::from_value(&FormulaValue::Number(3.0));
        assert!(numeric.matches(&CellValue::Number(3.0), false));
    }
}
