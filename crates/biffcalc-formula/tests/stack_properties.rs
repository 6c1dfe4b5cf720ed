// Property-based tests for the token-stack evaluator.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use biffcalc_core::{CellError, CellValue};
use biffcalc_formula::{
    evaluate, split_leading_operator, translate_wildcard, EmptyResolver, FormulaError,
    FormulaValue, OperatorKind, Token,
};
use proptest::prelude::*;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn arb_operand() -> impl Strategy<Value = Token> {
    prop_oneof![
        3 => (-1000i32..1000).prop_map(Token::Integer),
        2 => (-1.0e6..1.0e6f64).prop_map(Token::Number),
        1 => r"[a-z0-9]{0,6}".prop_map(Token::Text),
        1 => any::<bool>().prop_map(Token::Boolean),
        1 => Just(Token::Blank),
    ]
}

fn arb_binary() -> impl Strategy<Value = OperatorKind> {
    prop_oneof![
        Just(OperatorKind::Add),
        Just(OperatorKind::Subtract),
        Just(OperatorKind::Multiply),
        Just(OperatorKind::Divide),
        Just(OperatorKind::Power),
        Just(OperatorKind::Concat),
        Just(OperatorKind::Equal),
        Just(OperatorKind::NotEqual),
        Just(OperatorKind::LessThan),
        Just(OperatorKind::GreaterEqual),
    ]
}

fn arb_unary() -> impl Strategy<Value = OperatorKind> {
    prop_oneof![
        Just(OperatorKind::UnaryMinus),
        Just(OperatorKind::UnaryPlus),
        Just(OperatorKind::Percent),
    ]
}

/// A well-formed postfix sequence producing exactly one value
fn arb_sequence() -> impl Strategy<Value = Vec<Token>> {
    let leaf = arb_operand().prop_map(|t| vec![t]);
    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone(), arb_binary()).prop_map(|(mut lhs, rhs, op)| {
                lhs.extend(rhs);
                lhs.push(Token::Operator(op));
                lhs
            }),
            (inner, arb_unary()).prop_map(|(mut operand, op)| {
                operand.push(Token::Operator(op));
                operand
            }),
        ]
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config())]

    #[test]
    fn well_formed_sequences_evaluate(tokens in arb_sequence()) {
        let result = evaluate(&tokens, &EmptyResolver);
        prop_assert!(result.is_ok(), "{:?} failed: {:?}", tokens, result);
    }

    #[test]
    fn extra_operand_is_reported(tokens in arb_sequence(), extra in arb_operand()) {
        let mut tokens = tokens;
        tokens.insert(0, extra);
        prop_assert_eq!(
            evaluate(&tokens, &EmptyResolver),
            Err(FormulaError::UnbalancedStack { remaining: 2 })
        );
    }

    #[test]
    fn missing_operand_is_reported(operand in arb_operand(), op in arb_binary()) {
        let tokens = [operand, Token::Operator(op)];
        let is_underflow = matches!(
            evaluate(&tokens, &EmptyResolver),
            Err(FormulaError::StackUnderflow { needed: 2, available: 1, .. })
        );
        prop_assert!(is_underflow);
    }

    #[test]
    fn addition_broadcasts_over_arrays(
        values in prop::collection::vec(-1.0e6..1.0e6f64, 1..12),
        scalar in -1.0e6..1.0e6f64,
    ) {
        let array = Token::array(vec![values.iter().map(|n| CellValue::Number(*n)).collect()]);
        let tokens = [array, Token::Number(scalar), Token::Operator(OperatorKind::Add)];
        let result = evaluate(&tokens, &EmptyResolver).unwrap();
        let expected = FormulaValue::Array(vec![values
            .iter()
            .map(|n| FormulaValue::Number(n + scalar))
            .collect()]);
        prop_assert_eq!(result, expected);
    }

    #[test]
    fn equality_is_symmetric(a in arb_operand(), b in arb_operand()) {
        let forward = evaluate(
            &[a.clone(), b.clone(), Token::Operator(OperatorKind::Equal)],
            &EmptyResolver,
        );
        let backward = evaluate(&[b, a, Token::Operator(OperatorKind::Equal)], &EmptyResolver);
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn division_matches_float_division(x in -1.0e6..1.0e6f64, y in -1.0e3..1.0e3f64) {
        let tokens = [Token::Number(x), Token::Number(y), Token::Operator(OperatorKind::Divide)];
        let expected = if y == 0.0 {
            FormulaValue::Error(CellError::Div0)
        } else if !(x / y).is_finite() {
            FormulaValue::Error(CellError::Num)
        } else {
            FormulaValue::Number(x / y)
        };
        prop_assert_eq!(evaluate(&tokens, &EmptyResolver).unwrap(), expected);
    }

    #[test]
    fn division_by_zero_is_an_error(x in -1.0e6..1.0e6f64) {
        let tokens = [Token::Number(x), Token::Integer(0), Token::Operator(OperatorKind::Divide)];
        prop_assert_eq!(
            evaluate(&tokens, &EmptyResolver).unwrap(),
            FormulaValue::Error(CellError::Div0)
        );
    }

    #[test]
    fn double_negation_is_identity(x in -1.0e9..1.0e9f64) {
        let tokens = [
            Token::Number(x),
            Token::Operator(OperatorKind::UnaryMinus),
            Token::Operator(OperatorKind::UnaryMinus),
        ];
        prop_assert_eq!(evaluate(&tokens, &EmptyResolver).unwrap(), FormulaValue::Number(x));
    }

    #[test]
    fn equality_tolerates_tiny_differences(x in -1.0e3..1.0e3f64, d in 0.0..5.0e-9f64) {
        let tokens = [Token::Number(x), Token::Number(x + d), Token::Operator(OperatorKind::Equal)];
        prop_assert_eq!(evaluate(&tokens, &EmptyResolver).unwrap(), FormulaValue::Boolean(true));
    }

    #[test]
    fn equality_rejects_larger_differences(x in -1.0e3..1.0e3f64, d in 1.0e-6..1.0f64) {
        let tokens = [Token::Number(x), Token::Number(x + d), Token::Operator(OperatorKind::Equal)];
        prop_assert_eq!(evaluate(&tokens, &EmptyResolver).unwrap(), FormulaValue::Boolean(false));
    }

    #[test]
    fn literal_criteria_match_themselves(text in r"[a-zA-Z0-9 .+()\[\]^$]{1,12}") {
        let pattern = translate_wildcard(&text);
        prop_assert!(!pattern.has_wildcards());
        prop_assert!(pattern.is_match(&text.to_lowercase()));
        prop_assert!(pattern.is_match(&text.to_uppercase()));
    }

    #[test]
    fn star_matches_any_suffix(prefix in r"[a-z]{1,5}", suffix in r"[a-z0-9 ]{0,8}") {
        let pattern = translate_wildcard(&format!("{}*", prefix));
        let candidate = format!("{}{}", prefix, suffix);
        prop_assert!(pattern.is_match(&candidate));
    }

    #[test]
    fn operator_prefix_is_split(
        op in prop_oneof![Just("="), Just("<"), Just("<="), Just(">"), Just(">="), Just("<>")],
        rest in r"[a-z0-9][a-z0-9]{0,6}",
    ) {
        let criteria = format!("{}{}", op, rest);
        prop_assert_eq!(split_leading_operator(&criteria), op.len());
    }
}
