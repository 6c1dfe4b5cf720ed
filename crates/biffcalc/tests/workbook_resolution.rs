//! Formulas evaluated against an in-memory workbook

use biffcalc::prelude::*;
use biffcalc::{CalculationStats, ControlKind, WorkbookResolver};
use biffcalc_formula::functions::ids;
use pretty_assertions::assert_eq;

fn op(kind: OperatorKind) -> Token {
    Token::Operator(kind)
}

fn r(text: &str) -> Token {
    Token::reference(text).unwrap()
}

/// Sheet1 holds a small sales table in A1:B5
fn sales_workbook() -> Workbook {
    let mut workbook = Workbook::new();
    let sheet = workbook.worksheet_mut(0).unwrap();
    let rows = [
        ("apples", 10.0),
        ("pears", 4.0),
        ("apricots", 6.0),
        ("plums", 1.0),
        ("Apples", 5.0),
    ];
    for (i, (fruit, qty)) in rows.iter().enumerate() {
        sheet.set_cell_value_at(i as u32, 0, *fruit).unwrap();
        sheet.set_cell_value_at(i as u32, 1, *qty).unwrap();
    }
    workbook
}

#[test]
fn test_sum_over_range() {
    let workbook = sales_workbook();
    let value = workbook
        .evaluate(0, &[r("B1:B5"), Token::Control(ControlKind::AttrSum)])
        .unwrap();
    assert_eq!(value, FormulaValue::Number(26.0));
}

#[test]
fn test_sumif_with_wildcard_criteria() {
    let workbook = sales_workbook();
    // SUMIF(A1:A5, "ap*", B1:B5)
    let tokens = [
        r("A1:A5"),
        Token::text("ap*"),
        r("B1:B5"),
        Token::function(ids::SUMIF, 3),
    ];
    assert_eq!(
        workbook.evaluate(0, &tokens).unwrap(),
        FormulaValue::Number(21.0)
    );
}

#[test]
fn test_sumif_sum_range_takes_criteria_shape() {
    let workbook = sales_workbook();
    // SUMIF(A1:A5, "ap*", B1) sums over B1:B5
    let single = [
        r("A1:A5"),
        Token::text("ap*"),
        r("B1"),
        Token::function(ids::SUMIF, 3),
    ];
    assert_eq!(
        workbook.evaluate(0, &single).unwrap(),
        FormulaValue::Number(21.0)
    );

    // A two-column sum range is narrowed to B1:B5 as well
    let wide = [
        r("A1:A5"),
        Token::text("ap*"),
        r("B1:C2"),
        Token::function(ids::SUMIF, 3),
    ];
    assert_eq!(
        workbook.evaluate(0, &wide).unwrap(),
        FormulaValue::Number(21.0)
    );
}

#[test]
fn test_sum_skips_text_and_booleans_in_references() {
    let mut workbook = sales_workbook();
    let sheet = workbook.worksheet_mut(0).unwrap();
    sheet.set_cell_value("C1", "7").unwrap();
    sheet.set_cell_value("C2", true).unwrap();

    // SUM(A1:C5, C1, TRUE, "4"): text and booleans in cells are skipped,
    // typed-in arguments are coerced
    let tokens = [
        r("A1:C5"),
        r("C1"),
        Token::Boolean(true),
        Token::text("4"),
        Token::function(ids::SUM, 4),
    ];
    assert_eq!(
        workbook.evaluate(0, &tokens).unwrap(),
        FormulaValue::Number(31.0)
    );
}

#[test]
fn test_countif_with_operator_criteria() {
    let workbook = sales_workbook();
    // COUNTIF(B1:B5, ">=5")
    let tokens = [r("B1:B5"), Token::text(">=5"), Token::function(ids::COUNTIF, 2)];
    assert_eq!(
        workbook.evaluate(0, &tokens).unwrap(),
        FormulaValue::Number(3.0)
    );
}

#[test]
fn test_sheet_qualified_references() {
    let mut workbook = sales_workbook();
    let idx = workbook.add_worksheet_with_name("Q1 Data").unwrap();
    let data = workbook.worksheet_mut(idx).unwrap();
    data.set_cell_value("A1", 100.0).unwrap();
    // Unqualified A1 on this sheet means 'Q1 Data'!A1
    data.set_cell_formula("A2", vec![r("A1"), Token::Integer(1), op(OperatorKind::Add)])
        .unwrap();

    let tokens = [r("'Q1 Data'!A2"), r("Sheet1!B1"), op(OperatorKind::Add)];
    assert_eq!(
        workbook.evaluate(0, &tokens).unwrap(),
        FormulaValue::Number(111.0)
    );

    let missing = [r("Nowhere!A1")];
    assert_eq!(
        workbook.evaluate(0, &missing).unwrap(),
        FormulaValue::Error(CellError::Ref)
    );
}

#[test]
fn test_defined_names() {
    let mut workbook = sales_workbook();
    let rate = workbook.define_name("Rate", vec![Token::Number(0.5)]).unwrap();
    let qty = workbook.define_name("Quantities", vec![r("Sheet1!B1:B5")]).unwrap();

    // Rate * SUM(Quantities)
    let tokens = [
        Token::NameRef { id: rate },
        Token::NameRef { id: qty },
        Token::function(ids::SUM, 1),
        op(OperatorKind::Multiply),
    ];
    assert_eq!(
        workbook.evaluate(0, &tokens).unwrap(),
        FormulaValue::Number(13.0)
    );

    assert_eq!(
        workbook.evaluate(0, &[Token::NameRef { id: 99 }]).unwrap(),
        FormulaValue::Error(CellError::Name)
    );
}

#[test]
fn test_self_referencing_name_terminates() {
    let mut workbook = Workbook::new();
    // Loop = Loop + 1; the first name defined gets index 1
    let id = workbook
        .define_name(
            "Loop",
            vec![Token::NameRef { id: 1 }, Token::Integer(1), op(OperatorKind::Add)],
        )
        .unwrap();
    assert_eq!(id, 1);

    assert_eq!(
        workbook.evaluate(0, &[Token::NameRef { id }]).unwrap(),
        FormulaValue::Error(CellError::Value)
    );
}

#[test]
fn test_shared_formula_expansion() {
    let mut workbook = Workbook::new();
    let sheet = workbook.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", 2.0).unwrap();
    sheet.set_cell_value("A2", 3.0).unwrap();
    sheet
        .set_shared_formula("B1", vec![r("A1"), r("A2"), op(OperatorKind::Multiply)])
        .unwrap();
    let anchor = CellAddress::parse("B1").unwrap();
    sheet
        .set_cell_formula("B1", vec![Token::SharedFormula { anchor }])
        .unwrap();
    // The shared body can sit in the middle of a larger expression
    sheet
        .set_cell_formula(
            "C1",
            vec![Token::SharedFormula { anchor }, Token::Integer(4), op(OperatorKind::Add)],
        )
        .unwrap();

    assert_eq!(workbook.evaluate_cell(0, "B1").unwrap(), CellValue::Number(6.0));
    assert_eq!(workbook.evaluate_cell(0, "C1").unwrap(), CellValue::Number(10.0));
}

#[test]
fn test_missing_shared_formula_is_an_error() {
    let workbook = Workbook::new();
    let anchor = CellAddress::parse("Z9").unwrap();
    assert_eq!(
        workbook.evaluate(0, &[Token::SharedFormula { anchor }]).unwrap(),
        FormulaValue::Error(CellError::Ref)
    );
}

#[test]
fn test_circular_references() {
    let mut workbook = Workbook::new();
    let sheet = workbook.worksheet_mut(0).unwrap();
    // A1 = B1 + 1, B1 = A1 * 2, C1 = A1 + 10
    sheet
        .set_cell_formula("A1", vec![r("B1"), Token::Integer(1), op(OperatorKind::Add)])
        .unwrap();
    sheet
        .set_cell_formula("B1", vec![r("A1"), Token::Integer(2), op(OperatorKind::Multiply)])
        .unwrap();
    sheet
        .set_cell_formula("C1", vec![r("A1"), Token::Integer(10), op(OperatorKind::Add)])
        .unwrap();
    sheet.set_cell_value("D1", 7.0).unwrap();

    // IFERROR catches the circular error like any other
    let guarded = [r("C1"), Token::Integer(0), Token::function(ids::IFERROR, 2)];
    assert_eq!(workbook.evaluate(0, &guarded).unwrap(), FormulaValue::Number(0.0));

    let resolver = WorkbookResolver::new(&workbook, 0);
    let token = biffcalc::evaluate_to_token(&[r("C1"), r("D1"), op(OperatorKind::Add)], &resolver)
        .unwrap();
    assert_eq!(
        token,
        Token::Error {
            error: CellError::Value,
            circular: true
        }
    );

    let stats = workbook.calculate().unwrap();
    assert_eq!(
        stats,
        CalculationStats {
            formula_count: 3,
            cells_calculated: 3,
            errors: 3,
            circular_references: 3,
        }
    );
    assert_eq!(
        workbook.evaluate_cell(0, "A1").unwrap(),
        CellValue::Error(CellError::Value)
    );
}

#[test]
fn test_calculate_stores_results() {
    let mut workbook = sales_workbook();
    let sheet = workbook.worksheet_mut(0).unwrap();
    // C1 = IF(B1 > 5, "big", "small"), C2 = B2 / 0
    sheet
        .set_cell_formula(
            "C1",
            vec![
                r("B1"),
                Token::Integer(5),
                op(OperatorKind::GreaterThan),
                Token::text("big"),
                Token::text("small"),
                Token::function(ids::IF, 3),
            ],
        )
        .unwrap();
    sheet
        .set_cell_formula("C2", vec![r("B2"), Token::Integer(0), op(OperatorKind::Divide)])
        .unwrap();

    let stats = workbook.calculate().unwrap();
    assert_eq!(stats.formula_count, 2);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.circular_references, 0);

    let sheet = workbook.worksheet(0).unwrap();
    assert_eq!(
        sheet.get_calculated_value_at(0, 2),
        Some(&CellValue::from("big"))
    );
    assert_eq!(
        sheet.get_calculated_value_at(1, 2),
        Some(&CellValue::Error(CellError::Div0))
    );
}

#[test]
fn test_blank_as_zero_setting() {
    let tokens = [r("Z1"), Token::Integer(1), op(OperatorKind::Add)];

    let workbook = Workbook::new();
    assert_eq!(workbook.evaluate(0, &tokens).unwrap(), FormulaValue::Number(1.0));

    let strict = Workbook::new().with_settings(EvaluationSettings::new().with_blank_as_zero(false));
    assert_eq!(
        strict.evaluate(0, &tokens).unwrap(),
        FormulaValue::Error(CellError::Value)
    );
}

#[test]
fn test_sheet_out_of_bounds() {
    let workbook = Workbook::new();
    assert_eq!(
        workbook.evaluate(3, &[Token::Integer(1)]),
        Err(Error::SheetOutOfBounds(3, 1))
    );
}
