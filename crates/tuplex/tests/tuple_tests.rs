//! Tuple arena, permissions, scopes and text form

use pretty_assertions::assert_eq;
use tuplex::*;

fn parse(rt: &mut Runtime, src: &str) -> Option<Attribute> {
    let scope = rt.global();
    let mut tokens = TokenBuffer::lex(src);
    let mut diags = DiagnosticBag::new();
    parse_value(rt, scope, &mut tokens, &mut diags)
}

// ═══════════════════════════════════════════════════════════════════════
// Permissions
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_plain_tuple_has_fixed_shape() {
    let mut rt = Runtime::new();
    let id = rt
        .create_from(TupleKind::Plain, None, [(Some("x".to_string()), Attribute::of(1i32))])
        .unwrap();
    let err = rt.add(id, Some("y"), Attribute::of(2i32)).unwrap_err();
    assert_eq!(err, TuplexError::access_denied("add", "plain"));

    // Values stay modifiable
    rt.tuple_mut(id).unwrap().set("x", 5i32).unwrap();
    assert_eq!(rt.tuple(id).unwrap().at::<i32>("x").unwrap(), 5);
}

#[test]
fn test_duplicate_names_are_rejected() {
    let mut rt = Runtime::new();
    let id = rt.create(TupleKind::Dynamic, None);
    rt.add(id, Some("x"), Attribute::of(1i32)).unwrap();
    let err = rt.add(id, Some("x"), Attribute::of(2i32)).unwrap_err();
    assert_eq!(err, TuplexError::DuplicateName("x".to_string()));
    assert_eq!(rt.tuple(id).unwrap().len(), 1);
}

#[test]
fn test_unnamed_attributes_may_repeat() {
    let mut rt = Runtime::new();
    let id = rt.create(TupleKind::Dynamic, None);
    rt.add(id, None, Attribute::of(1i32)).unwrap();
    rt.add(id, None, Attribute::of(1i32)).unwrap();
    assert_eq!(rt.tuple(id).unwrap().len(), 2);
}

#[test]
fn test_data_tuple_refuses_dynamic_children() {
    let mut rt = Runtime::new();
    let id = rt.create(TupleKind::Data, None);
    rt.add_native(id, None, String::from("ok")).unwrap();
    rt.add_tuple(id, None, TupleKind::Data).unwrap();
    let live = rt.live_tuples();

    let err = rt.add_tuple(id, None, TupleKind::Dynamic).unwrap_err();
    assert!(matches!(err, TuplexError::AccessDenied { .. }));
    assert_eq!(rt.live_tuples(), live);
}

#[test]
fn test_custom_kind_uses_given_permissions() {
    let mut rt = Runtime::new();
    let locked = rt.create(TupleKind::Custom("record".into()), None);
    assert!(rt.add(locked, None, Attribute::of(1i32)).is_err());
    assert!(rt.register_type(locked, "pair", TypeTuple::name("int")).is_err());

    let open = rt.create_with(
        TupleKind::Custom("record".into()),
        Permissions::ADD | Permissions::REGISTER_TYPES,
        None,
    );
    rt.add(open, None, Attribute::of(1i32)).unwrap();
    assert!(rt.remove(open, 0usize).is_err());
    assert_eq!(rt.type_of(open).unwrap(), TypeTuple::name("record"));
}

#[test]
fn test_builtin_kinds_ignore_requested_permissions() {
    let mut rt = Runtime::new();
    let id = rt.create_with(TupleKind::Plain, Permissions::all(), None);
    assert_eq!(rt.tuple(id).unwrap().permissions(), Permissions::MODIFY);
}

// ═══════════════════════════════════════════════════════════════════════
// Lifetime
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_remove_and_stale_ids() {
    let mut rt = Runtime::new();
    let outer = rt.create(TupleKind::Dynamic, None);
    let inner = rt.add_tuple(outer, Some("inner"), TupleKind::Dynamic).unwrap();
    assert_eq!(rt.tuple(inner).unwrap().parent(), Some(outer));

    rt.remove(outer, "inner").unwrap();
    assert!(!rt.contains(inner));
    assert!(matches!(rt.tuple(inner), Err(TuplexError::NotFound(_))));

    // The freed slot is reused under a new generation.
    let reused = rt.create(TupleKind::Dynamic, None);
    assert_ne!(reused, inner);
    assert!(!rt.contains(inner));
}

#[test]
fn test_destroy_frees_nested_tuples() {
    let mut rt = Runtime::new();
    let before = rt.live_tuples();
    let outer = rt.create(TupleKind::Dynamic, None);
    let middle = rt.add_tuple(outer, None, TupleKind::Dynamic).unwrap();
    rt.add_tuple(middle, None, TupleKind::Dynamic).unwrap();
    assert_eq!(rt.live_tuples(), before + 3);

    rt.destroy(outer);
    assert_eq!(rt.live_tuples(), before);
}

#[test]
fn test_negative_keys_count_from_end() {
    let mut rt = Runtime::new();
    let id = rt.create(TupleKind::Dynamic, None);
    for n in 1..=3i32 {
        rt.add(id, None, Attribute::of(n)).unwrap();
    }
    let tuple = rt.tuple(id).unwrap();
    assert_eq!(tuple.at::<i32>(-1isize).unwrap(), 3);
    assert_eq!(tuple.at::<i32>(0usize).unwrap(), 1);
    assert!(tuple.at::<i32>(3usize).is_err());
}

// ═══════════════════════════════════════════════════════════════════════
// Scopes
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_scope_chain_ends_at_global() {
    let mut rt = Runtime::new();
    let global = rt.global();
    let outer = rt.create(TupleKind::Dynamic, Some(global));
    let inner = rt.create(TupleKind::Plain, Some(outer));

    let chain: Vec<TupleId> = rt.scope_chain(inner).collect();
    assert_eq!(chain, vec![inner, outer, global]);
    assert_eq!(rt.root_of(inner), global);
}

#[test]
fn test_variables_resolve_outward() {
    let mut rt = Runtime::new();
    let outer = rt.create(TupleKind::Dynamic, Some(rt.global()));
    let inner = rt.create(TupleKind::Dynamic, Some(outer));
    rt.add(outer, Some("n"), Attribute::of(1i32)).unwrap();

    assert_eq!(rt.lookup_variable(inner, "n"), Some((outer, 0)));
    assert!(rt.variable(inner, "missing").is_none());
}

#[test]
fn test_types_resolve_outward_only() {
    let mut rt = Runtime::new();
    let global = rt.global();
    let outer = rt.create_with(TupleKind::Custom("module".into()), Permissions::all(), Some(global));
    let inner = rt.create(TupleKind::Dynamic, Some(outer));
    let pair = TypeTuple::of([TypeTuple::name("int"), TypeTuple::name("int")]);
    rt.register_type(outer, "pair", pair.clone()).unwrap();

    assert_eq!(rt.lookup_type(inner, "pair"), Some(pair));
    assert_eq!(rt.lookup_type(global, "pair"), None);
    assert!(rt.is_type(global, "text"));
}

#[test]
fn test_register_type_twice_is_duplicate() {
    let mut rt = Runtime::new();
    let global = rt.global();
    rt.register_type(global, "meters", TypeTuple::name("float")).unwrap();
    let err = rt
        .register_type(global, "meters", TypeTuple::name("float"))
        .unwrap_err();
    assert_eq!(err, TuplexError::DuplicateName("meters".to_string()));
}

#[test]
fn test_failed_constructor_registration_rolls_back_type() {
    let mut rt = Runtime::new();
    // A detached root that may hold types but not actions
    let module = rt.create_with(
        TupleKind::Custom("module".into()),
        Permissions::REGISTER_TYPES,
        None,
    );
    let pair = TypeTuple::of([TypeTuple::name("int"), TypeTuple::name("int")]);
    let err = rt.register_type(module, "pair", pair.clone()).unwrap_err();
    assert_eq!(err, TuplexError::access_denied("register actions", "module"));
    assert_eq!(rt.lookup_type(module, "pair"), None);

    // Leaf types need no constructor.
    rt.register_type(module, "meters", TypeTuple::name("float")).unwrap();
    assert_eq!(rt.lookup_type(module, "meters"), Some(TypeTuple::name("float")));
}

// ═══════════════════════════════════════════════════════════════════════
// Text form
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_render_scalars_on_one_line() {
    let mut rt = Runtime::new();
    let id = rt
        .create_from(
            TupleKind::Plain,
            None,
            [
                (None, Attribute::of(1i32)),
                (Some("y".to_string()), Attribute::of(2i32)),
            ],
        )
        .unwrap();
    assert_eq!(rt.to_text(id).unwrap(), "P(1, y=2)");
}

#[test]
fn test_render_parse_round_trip() {
    let mut rt = Runtime::new();
    let src = "D(x=1, y=\"two\",\n  inner:\n    P(3, 4)\n)";
    let value = parse(&mut rt, src).unwrap();
    let id = value.tuple_id().unwrap();
    assert_eq!(rt.to_text(id).unwrap(), src);

    let tuple = rt.tuple(id).unwrap();
    assert_eq!(tuple.at::<String>("y").unwrap(), "two");
    let inner = tuple.attribute("inner").unwrap().tuple_id().unwrap();
    assert_eq!(rt.tuple(inner).unwrap().parent(), Some(id));
    assert_eq!(
        rt.type_of(inner).unwrap(),
        TypeTuple::of([TypeTuple::name("int"), TypeTuple::name("int")])
    );

    let text = rt.to_text(id).unwrap();
    let again = parse(&mut rt, &text).unwrap();
    assert_eq!(rt.to_text(again.tuple_id().unwrap()).unwrap(), text);
    rt.release(again);
    rt.release(value);
}

#[test]
fn test_bare_paren_keeps_enclosing_kind() {
    let mut rt = Runtime::new();
    let value = parse(&mut rt, "E(1, (2, 3))").unwrap();
    let id = value.tuple_id().unwrap();
    let child = rt.tuple(id).unwrap().attribute(1usize).unwrap().tuple_id().unwrap();
    assert_eq!(rt.tuple(child).unwrap().kind(), &TupleKind::Data);
    rt.release(value);
}

#[test]
fn test_data_literal_rejects_non_data_values() {
    let mut rt = Runtime::new();
    let before = rt.live_tuples();
    assert!(parse(&mut rt, "E(1, D(2))").is_none());
    assert_eq!(rt.live_tuples(), before);
}

#[test]
fn test_parse_value_reports_errors() {
    let mut rt = Runtime::new();
    let scope = rt.global();
    let mut tokens = TokenBuffer::lex("P(1 2)");
    let mut diags = DiagnosticBag::new();
    assert!(parse_value(&mut rt, scope, &mut tokens, &mut diags).is_none());
    assert_eq!(diags.errors().count(), 1);
}

#[test]
fn test_nested_literals_respect_depth_limit() {
    let mut rt = Runtime::with_context(EvalContext::with_max_depth(3));
    let before = rt.live_tuples();
    let within = parse(&mut rt, "P(((1)))").unwrap();
    rt.release(within);
    assert!(parse(&mut rt, "T(((int)))").is_some());

    let scope = rt.global();
    for src in ["P((((1))))", "T((((int))))"] {
        let mut tokens = TokenBuffer::lex(src);
        let mut diags = DiagnosticBag::new();
        assert!(parse_value(&mut rt, scope, &mut tokens, &mut diags).is_none(), "{src}");
        let errors: Vec<&Diagnostic> = diags.errors().collect();
        assert_eq!(errors.len(), 1, "{src}");
        assert!(errors[0].message.contains("nested deeper than 3"), "{src}");
    }
    assert_eq!(rt.live_tuples(), before);
}

#[test]
fn test_deeply_nested_literal_is_an_error() {
    let mut rt = Runtime::new();
    let before = rt.live_tuples();
    let src = format!("P({}1{})", "(".repeat(1000), ")".repeat(1000));
    assert!(parse(&mut rt, &src).is_none());
    assert_eq!(rt.live_tuples(), before);
}
