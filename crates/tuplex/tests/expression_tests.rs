//! Parsing, binding and evaluation of expressions

use pretty_assertions::assert_eq;
use tuplex::*;

fn run(rt: &mut Runtime, scope: TupleId, src: &str) -> Vec<Outcome> {
    let expr = Expression::from_source(rt, scope, src).expect("parse failed");
    let outcomes = expr.evaluate(rt).expect("evaluation failed");
    expr.release(rt);
    outcomes
}

fn eval(src: &str) -> Outcome {
    let mut rt = Runtime::new();
    let scope = rt.global();
    run(&mut rt, scope, src)
        .into_iter()
        .last()
        .expect("no statements")
}

fn eval_int(src: &str) -> i32 {
    let outcome = eval(src);
    assert_eq!(outcome.signal, Signal::Normal, "`{src}` did not complete");
    outcome.value.value::<i32>().unwrap()
}

fn eval_bool(src: &str) -> bool {
    eval(src).value.value::<bool>().unwrap()
}

fn parse_errors(src: &str) -> (Vec<String>, DiagnosticBag) {
    let mut rt = Runtime::new();
    let scope = rt.global();
    let mut tokens = TokenBuffer::lex(src);
    let mut bag = DiagnosticBag::new();
    match Expression::parse(&mut rt, scope, &mut tokens, &mut bag) {
        Err(TuplexError::InvalidExpression { errors }) => (errors, bag),
        other => panic!("expected InvalidExpression, got {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Precedence
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_multiplication_binds_tighter() {
    assert_eq!(eval_int("1 + 2 * 3"), 7);
}

#[test]
fn test_parentheses_override_precedence() {
    assert_eq!(eval_int("(1 + 2) * 3"), 9);
}

#[test]
fn test_subtraction_is_left_associative() {
    assert_eq!(eval_int("10 - 4 - 3"), 3);
}

#[test]
fn test_unary_minus() {
    assert_eq!(eval_int("-2 * 3"), -6);
    assert_eq!(eval_int("2 * -3"), -6);
    assert_eq!(eval_int("- (1 + 2)"), -3);
}

#[test]
fn test_statements_evaluate_in_order() {
    let mut rt = Runtime::new();
    let scope = rt.global();
    let values: Vec<i32> = run(&mut rt, scope, "1 + 2; 3 - 4; 5 * 6; 8 / 2")
        .iter()
        .map(|o| o.value.value::<i32>().unwrap())
        .collect();
    assert_eq!(values, vec![3, -1, 30, 4]);
}

#[test]
fn test_empty_statements_are_skipped() {
    let mut rt = Runtime::new();
    let scope = rt.global();
    let expr = Expression::from_source(&mut rt, scope, ";; 1 ;;").unwrap();
    assert_eq!(expr.len(), 1);
    expr.release(&mut rt);
}

// ═══════════════════════════════════════════════════════════════════════
// Numbers
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_large_literal_is_long() {
    let outcome = eval("3000000000 + 1L");
    assert_eq!(outcome.value.ty(), &TypeTuple::name("long"));
    assert_eq!(outcome.value.value::<i64>().unwrap(), 3_000_000_001);
}

#[test]
fn test_float_arithmetic() {
    let outcome = eval("1.5 * 2.0");
    assert_eq!(outcome.value.value::<f64>().unwrap(), 3.0);
}

#[test]
fn test_division_by_zero_raises() {
    let outcome = eval("8 / 0");
    assert_eq!(outcome.signal, Signal::Raise);
    assert_eq!(
        outcome.value.value::<Name>().unwrap(),
        Name::new(conditions::DIVISION_BY_ZERO)
    );
}

#[test]
fn test_remainder_by_zero_raises() {
    assert_eq!(eval("8 % 0").signal, Signal::Raise);
}

#[test]
fn test_overflow_raises() {
    let outcome = eval("2147483647 + 1");
    assert_eq!(outcome.signal, Signal::Raise);
    assert_eq!(
        outcome.value.value::<Name>().unwrap(),
        Name::new(conditions::INTEGER_OVERFLOW)
    );
}

#[test]
fn test_bit_operations() {
    assert_eq!(eval_int("6 & 3"), 2);
    assert_eq!(eval_int("6 | 3"), 7);
    assert_eq!(eval_int("6 ^ 3"), 5);
    assert_eq!(eval_int("1 << 4"), 16);
    let bits = eval("0xf0 >> 4").value;
    assert_eq!(bits.ty(), &TypeTuple::name("bits"));
    assert_eq!(bits.value::<u64>().unwrap(), 0x0f);
}

#[test]
fn test_oversized_shift_raises() {
    let outcome = eval("1 << 40");
    assert_eq!(outcome.signal, Signal::Raise);
    assert_eq!(
        outcome.value.value::<Name>().unwrap(),
        Name::new(conditions::BIT_INDEX_OUT_OF_RANGE)
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Comparisons
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_integer_comparisons() {
    assert!(eval_bool("1 < 2"));
    assert!(!eval_bool("2 <= 1"));
    assert!(eval_bool("2 == 2"));
    assert_eq!(eval_int("1 <=> 2"), -1);
}

#[test]
fn test_float_relations_fall_back_to_compare() {
    assert!(eval_bool("3.0 < 4.0"));
    assert!(eval_bool("3.0 == 3.0"));
    assert!(eval_bool("4.0 != 3.0"));
    assert!(!eval_bool("4.0 <= 3.0"));
}

#[test]
fn test_fallback_renders_as_compare() {
    let mut rt = Runtime::new();
    let scope = rt.global();
    let expr = Expression::from_source(&mut rt, scope, "3.0 < 4.0").unwrap();
    assert_eq!(expr.to_text(&rt), "((3.0 <=> 4.0) < 0)");
    expr.release(&mut rt);
}

#[test]
fn test_float_compare_uses_total_order() {
    assert!(eval_bool("-0.0 < 0.0"));
    assert!(!eval_bool("0.0 == -0.0"));
    assert_eq!(eval_int("-0.0 <=> 0.0"), -1);
}

#[test]
fn test_text_comparison_and_concatenation() {
    assert!(eval_bool("\"abc\" < \"abd\""));
    let outcome = eval("\"tu\" + \"plex\"");
    assert_eq!(outcome.value.value::<String>().unwrap(), "tuplex");
}

#[test]
fn test_logic() {
    assert!(eval_bool("1 < 2 && 2 < 3"));
    assert!(eval_bool("!(1 > 2)"));
    assert!(eval_bool("not false || false"));
}

// ═══════════════════════════════════════════════════════════════════════
// Multi-token operators
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_if_then_else() {
    assert_eq!(eval_int("if 1 < 2 then 10 else 20"), 10);
    assert_eq!(eval_int("if 1 > 2 then 10 else 20"), 20);
}

#[test]
fn test_if_then_without_else() {
    assert_eq!(eval_int("if true then 5"), 5);
    assert!(eval("if false then 5").value.is_void());
}

#[test]
fn test_dangling_else_binds_inner() {
    assert_eq!(eval_int("if true then if false then 1 else 2"), 2);
}

#[test]
fn test_unchosen_branch_is_not_evaluated() {
    let outcome = eval("if true then 1 else 1 / 0");
    assert_eq!(outcome.signal, Signal::Normal);
    assert_eq!(outcome.value.value::<i32>().unwrap(), 1);
}

#[test]
fn test_select() {
    assert_eq!(eval_int("1 < 2 ? 3 + 4 : 0"), 7);
    assert_eq!(eval_int("false ? 1 : 2"), 2);
}

#[test]
fn test_is_and_is_not() {
    assert!(eval_bool("5 is int"));
    assert!(!eval_bool("5 is text"));
    assert!(eval_bool("5 is not text"));
    assert!(eval_bool("\"x\" is T(text)"));
}

// ═══════════════════════════════════════════════════════════════════════
// Signals
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_return_stops_evaluation() {
    let mut rt = Runtime::new();
    let scope = rt.global();
    let outcomes = run(&mut rt, scope, "1; return 2; 3");
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[1].signal, Signal::Return);
    assert_eq!(outcomes[1].value.value::<i32>().unwrap(), 2);
}

#[test]
fn test_user_raise() {
    let outcome = eval("raise not_ready");
    assert_eq!(outcome.signal, Signal::Raise);
    assert_eq!(outcome.value.value::<Name>().unwrap(), Name::new("not_ready"));
}

#[test]
fn test_break_and_continue() {
    assert_eq!(eval("break").signal, Signal::Break);
    assert_eq!(eval("continue").signal, Signal::Continue);
}

#[test]
fn test_raise_in_operand_propagates() {
    let outcome = eval("1 + 8 / 0");
    assert_eq!(outcome.signal, Signal::Raise);
}

// ═══════════════════════════════════════════════════════════════════════
// Variables and scopes
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_assignment_writes_variable() {
    let mut rt = Runtime::new();
    let scope = rt.create(TupleKind::Dynamic, Some(rt.global()));
    rt.add(scope, Some("x"), Attribute::of(1i32)).unwrap();
    let outcomes = run(&mut rt, scope, "x = 41; x += 1; x * 2");
    assert_eq!(outcomes[2].value.value::<i32>().unwrap(), 84);
    assert_eq!(rt.tuple(scope).unwrap().at::<i32>("x").unwrap(), 42);
}

#[test]
fn test_assignment_is_right_associative() {
    let mut rt = Runtime::new();
    let scope = rt.create(TupleKind::Dynamic, Some(rt.global()));
    rt.add(scope, Some("a"), Attribute::of(0i32)).unwrap();
    rt.add(scope, Some("b"), Attribute::of(0i32)).unwrap();
    run(&mut rt, scope, "a = b = 3");
    let tuple = rt.tuple(scope).unwrap();
    assert_eq!(tuple.at::<i32>("a").unwrap(), 3);
    assert_eq!(tuple.at::<i32>("b").unwrap(), 3);
}

#[test]
fn test_assignment_type_mismatch_is_an_error() {
    let mut rt = Runtime::new();
    let scope = rt.create(TupleKind::Dynamic, Some(rt.global()));
    rt.add(scope, Some("x"), Attribute::of(1i32)).unwrap();
    let expr = Expression::from_source(&mut rt, scope, "x = \"one\"").unwrap();
    let err = expr.evaluate(&mut rt).unwrap_err();
    assert!(matches!(err, TuplexError::IncompatibleType { .. }));
    expr.release(&mut rt);
}

#[test]
fn test_assignment_to_read_only_variable_is_denied() {
    let mut rt = Runtime::new();
    let scope = rt.create_with(TupleKind::Custom("ro".into()), Permissions::ADD, Some(rt.global()));
    rt.add(scope, Some("x"), Attribute::of(1i32)).unwrap();

    for src in ["x = 3", "x += 1"] {
        let expr = Expression::from_source(&mut rt, scope, src).unwrap();
        let err = expr.evaluate(&mut rt).unwrap_err();
        assert_eq!(err, TuplexError::access_denied("modify", "ro"), "`{src}`");
        expr.release(&mut rt);
    }
    assert_eq!(rt.tuple(scope).unwrap().at::<i32>("x").unwrap(), 1);

    // Reading is still fine
    let outcome = run(&mut rt, scope, "x + 1").remove(0);
    assert_eq!(outcome.value.value::<i32>().unwrap(), 2);
}

#[test]
fn test_reassigning_tuple_variable_frees_old_tuple() {
    let mut rt = Runtime::new();
    let global = rt.global();
    let scope = rt.create_with(TupleKind::Custom("module".into()), Permissions::all(), Some(global));
    let pair = TypeTuple::tree()
        .with_named("a", TypeTuple::name("int"))
        .unwrap()
        .with_named("b", TypeTuple::name("int"))
        .unwrap();
    rt.register_type(scope, "pair", pair).unwrap();
    let first = run(&mut rt, scope, "pair(1, 2)").remove(0).value;
    rt.add(scope, Some("p"), first).unwrap();

    let live = rt.live_tuples();
    for _ in 0..10 {
        run(&mut rt, scope, "p = pair(3, 4)");
    }
    assert_eq!(rt.live_tuples(), live);
    let p = rt.variable(scope, "p").unwrap().tuple_id().unwrap();
    assert_eq!(rt.tuple(p).unwrap().at::<i32>("a").unwrap(), 3);

    // Assigning from another variable copies; both stay alive.
    let second = run(&mut rt, scope, "pair(5, 6)").remove(0).value;
    rt.add(scope, Some("q"), second).unwrap();
    let live = rt.live_tuples();
    run(&mut rt, scope, "p = q");
    assert_eq!(rt.live_tuples(), live);

    let p = rt.variable(scope, "p").unwrap().tuple_id().unwrap();
    let q = rt.variable(scope, "q").unwrap().tuple_id().unwrap();
    assert_ne!(p, q);
    assert_eq!(rt.tuple(p).unwrap().at::<i32>("a").unwrap(), 5);
    assert_eq!(rt.tuple(q).unwrap().at::<i32>("b").unwrap(), 6);
}

#[test]
fn test_inner_variable_shadows_outer() {
    let mut rt = Runtime::new();
    let outer = rt.create(TupleKind::Dynamic, Some(rt.global()));
    let inner = rt.create(TupleKind::Dynamic, Some(outer));
    rt.add(outer, Some("x"), Attribute::of(1i32)).unwrap();
    rt.add(outer, Some("y"), Attribute::of(10i32)).unwrap();
    rt.add(inner, Some("x"), Attribute::of(2i32)).unwrap();
    let outcome = run(&mut rt, inner, "x + y").remove(0);
    assert_eq!(outcome.value.value::<i32>().unwrap(), 12);
}

#[test]
fn test_global_action_visible_from_nested_plain_tuple() {
    let mut rt = Runtime::new();
    let global = rt.global();
    let int = TypeTuple::name("int");
    let double = Signature::function("double", int.clone(), TypeTuple::of([int]));
    rt.register_action(
        global,
        Action::new(double, |_, stack| {
            let n = stack.pop_native::<i32>()?;
            stack.push_native(n * 2);
            Ok(Signal::Normal)
        }),
    )
    .unwrap();

    let outer = rt.create(TupleKind::Dynamic, Some(global));
    let nested = rt.create(TupleKind::Plain, Some(outer));
    let outcome = run(&mut rt, nested, "double(20) + 2").remove(0);
    assert_eq!(outcome.value.value::<i32>().unwrap(), 42);
}

#[test]
fn test_type_registered_in_inner_scope_is_invisible_from_sibling() {
    let mut rt = Runtime::new();
    let global = rt.global();
    let module = TupleKind::Custom("module".into());
    let inner = rt.create_with(module.clone(), Permissions::all(), Some(global));
    let sibling = rt.create_with(module, Permissions::all(), Some(global));

    let point = TypeTuple::tree()
        .with_named("x", TypeTuple::name("int"))
        .unwrap()
        .with_named("y", TypeTuple::name("int"))
        .unwrap();
    rt.register_type(inner, "point", point.clone()).unwrap();

    assert_eq!(rt.lookup_type(inner, "point"), Some(point));
    assert_eq!(rt.lookup_type(sibling, "point"), None);

    let outcome = run(&mut rt, inner, "point(y=2, x=1)").remove(0);
    let id = outcome.value.tuple_id().unwrap();
    assert_eq!(rt.tuple(id).unwrap().at::<i32>("x").unwrap(), 1);
    assert_eq!(rt.tuple(id).unwrap().at::<i32>("y").unwrap(), 2);
    rt.release(outcome.value);

    let err = Expression::from_source(&mut rt, sibling, "point(1, 2)").unwrap_err();
    assert!(matches!(err, TuplexError::InvalidExpression { .. }));
}

#[test]
fn test_unknown_identifier_is_a_name() {
    let outcome = eval("type_of(undefined_thing)");
    assert_eq!(outcome.value.value::<TypeTuple>().unwrap(), TypeTuple::name("name"));
}

// ═══════════════════════════════════════════════════════════════════════
// Functions and literals
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_builtin_functions() {
    assert_eq!(eval_int("abs(-7)"), 7);
    assert_eq!(eval_int("max(3, 9) - min(3, 9)"), 6);
    assert_eq!(eval_int("int(2.9) + int(40L)"), 42);
    assert_eq!(eval("float(3)").value.value::<f64>().unwrap(), 3.0);
    assert_eq!(eval("text(42)").value.value::<String>().unwrap(), "42");
}

#[test]
fn test_len_of_tuple_literal() {
    let mut rt = Runtime::new();
    let scope = rt.global();
    let before = rt.live_tuples();
    let outcome = run(&mut rt, scope, "len(P(1, 2, 3))").remove(0);
    assert_eq!(outcome.value.value::<u64>().unwrap(), 3);
    assert_eq!(rt.live_tuples(), before);
}

#[test]
fn test_literal_forms() {
    assert_eq!(eval("'x'").value.value::<char>().unwrap(), 'x');
    assert_eq!(eval("b'2a'").value.value::<u8>().unwrap(), 42);
    assert_eq!(eval("7u").value.ty(), &TypeTuple::name("index"));
    assert_eq!(
        eval("@a.b").value.value::<NamePath>().unwrap(),
        NamePath::parse("a.b")
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Rendering
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_render_fully_parenthesized() {
    let mut rt = Runtime::new();
    let scope = rt.global();
    let expr =
        Expression::from_source(&mut rt, scope, "1 + 2 * 3; if true then 1 else 2; max(1, 2)")
            .unwrap();
    assert_eq!(
        expr.to_text(&rt),
        "(1 + (2 * 3)); (if true then 1 else 2); max(1, 2)"
    );
    expr.release(&mut rt);
}

// ═══════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_missing_operand() {
    let (errors, bag) = parse_errors("1 +");
    assert_eq!(errors.len(), 1);
    assert!(bag.has_errors());
}

#[test]
fn test_each_bad_statement_reports_once() {
    let (errors, bag) = parse_errors("1 +; 2; (3");
    assert_eq!(errors.len(), 2);
    assert_eq!(bag.errors().count(), 2);
}

#[test]
fn test_no_matching_action() {
    let (errors, _) = parse_errors("1 + \"a\"");
    assert!(errors[0].contains("no action `+`"), "{errors:?}");
}

#[test]
fn test_unknown_function() {
    let (errors, _) = parse_errors("frobnicate(1)");
    assert!(errors[0].contains("frobnicate"), "{errors:?}");
}

#[test]
fn test_only_plain_tuples_in_expressions() {
    let (errors, _) = parse_errors("len(D(1))");
    assert!(errors[0].contains("plain"), "{errors:?}");
}

#[test]
fn test_invalid_input_is_reported_with_position() {
    let (_, bag) = parse_errors("1 +\n  #");
    let first = bag.errors().next().unwrap();
    assert_eq!((first.span.line, first.span.column), (2, 3));
}

#[test]
fn test_failed_parse_releases_literals() {
    let mut rt = Runtime::new();
    let scope = rt.global();
    let before = rt.live_tuples();
    assert!(Expression::from_source(&mut rt, scope, "len(P(1, 2)) + \"x\"").is_err());
    assert_eq!(rt.live_tuples(), before);
}

#[test]
fn test_evaluation_depth_limit() {
    let mut rt = Runtime::with_context(EvalContext::with_max_depth(4));
    let scope = rt.global();
    let expr = Expression::from_source(&mut rt, scope, "((((1 + 1) + 1) + 1) + 1) + 1").unwrap();
    let err = expr.evaluate(&mut rt).unwrap_err();
    assert!(matches!(err, TuplexError::DepthExceeded { max: 4, .. }));
    expr.release(&mut rt);
}

#[test]
fn test_parse_depth_limit() {
    let mut rt = Runtime::with_context(EvalContext::with_max_depth(3));
    let scope = rt.global();
    let err = Expression::from_source(&mut rt, scope, "f(f(f(f(1))))").unwrap_err();
    let TuplexError::InvalidExpression { errors } = err else {
        panic!("expected InvalidExpression");
    };
    assert!(errors[0].contains("nested deeper"), "{errors:?}");
}

#[test]
fn test_tuple_literal_depth_limit_in_expression() {
    let mut rt = Runtime::with_context(EvalContext::with_max_depth(3));
    let scope = rt.global();
    let before = rt.live_tuples();
    let err = Expression::from_source(&mut rt, scope, "len(P(((1))))").unwrap_err();
    let TuplexError::InvalidExpression { errors } = err else {
        panic!("expected InvalidExpression");
    };
    assert!(errors[0].contains("nested deeper"), "{errors:?}");
    assert_eq!(rt.live_tuples(), before);
}
