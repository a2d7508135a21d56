// tests/parser_tests.rs

use spl_toolkit::ast::{ArithOp, CompareOp, Expr, ExprKind, IdKind, Operation, OperationKind, OutputMode, Value};
use spl_toolkit::parser::{MAX_NESTING, ParseError, parse};
use std::time::{Duration, Instant};

fn init_ops(query: &str) -> Vec<Operation> {
    parse(query).unwrap().query.init.operations
}

fn stage_ops(query: &str, stage: usize) -> Vec<Operation> {
    parse(query).unwrap().query.commands[stage].operations.clone()
}

fn id_name(expr: &Expr) -> &str {
    &expr.as_id().expect("expected identifier").name
}

// ============================================================================
// Pipeline structure
// ============================================================================

#[test]
fn test_explicit_and_implicit_search() {
    let tree = parse("search src_ip=10.0.0.1").unwrap();
    assert_eq!(tree.query.init.command_name(), Some("search"));
    assert!(!tree.query.init.leading_pipe);

    let tree = parse("src_ip=10.0.0.1").unwrap();
    assert_eq!(tree.query.init.command_name(), None);
    assert_eq!(tree.query.init.operations.len(), 1);
}

#[test]
fn test_leading_pipe_generating_command() {
    let tree = parse("| tstats count from datamodel=Web by Web.src").unwrap();
    assert!(tree.query.init.leading_pipe);
    assert_eq!(tree.query.init.command_name(), Some("tstats"));
}

#[test]
fn test_piped_commands() {
    let tree = parse("search error | stats count by host | sort host | head 10").unwrap();
    let names: Vec<&str> = tree
        .query
        .commands
        .iter()
        .map(|c| c.command.name.as_str())
        .collect();
    assert_eq!(names, vec!["stats", "sort", "head"]);
}

#[test]
fn test_subquery() {
    let tree = parse("search index=main [ search index=threats | fields src_ip ]").unwrap();
    let subquery = tree.query.init.subquery.as_ref().expect("subquery");
    assert_eq!(subquery.init.command_name(), Some("search"));
    assert_eq!(subquery.commands.len(), 1);
    assert_eq!(subquery.commands[0].command.name, "fields");
}

#[test]
fn test_command_with_only_subquery() {
    let tree = parse("search a=1 | append [ search b=2 ]").unwrap();
    let append = &tree.query.commands[0];
    assert!(append.operations.is_empty());
    assert!(append.subquery.is_some());
}

// ============================================================================
// Operations
// ============================================================================

#[test]
fn test_key_value() {
    let ops = init_ops("search src_ip=10.0.0.1");
    match &ops[0].kind {
        OperationKind::KeyValue { field, op, value } => {
            assert_eq!(field.name, "src_ip");
            assert_eq!(field.kind, IdKind::FieldUse);
            assert_eq!(*op, CompareOp::Eq);
            assert!(matches!(value.as_value(), Some(Value::Number { text, .. }) if text == "10.0.0.1"));
        }
        other => panic!("Expected key-value, got {:?}", other),
    }
}

#[test]
fn test_comparison_operators() {
    let test_cases = vec![
        ("search a=1", CompareOp::Eq),
        ("search a!=1", CompareOp::Ne),
        ("search a>1", CompareOp::Gt),
        ("search a<1", CompareOp::Lt),
        ("search a>=1", CompareOp::Ge),
        ("search a<=1", CompareOp::Le),
    ];

    for (query, expected) in test_cases {
        match &init_ops(query)[0].kind {
            OperationKind::KeyValue { op, .. } => assert_eq!(*op, expected, "query: {}", query),
            other => panic!("Expected key-value for {}, got {:?}", query, other),
        }
    }
}

#[test]
fn test_function_name_as_field() {
    match &init_ops("search count<100")[0].kind {
        OperationKind::KeyValue { field, op, .. } => {
            assert_eq!(field.name, "count");
            assert_eq!(field.kind, IdKind::FunctionUse);
            assert_eq!(*op, CompareOp::Lt);
        }
        other => panic!("Expected key-value, got {:?}", other),
    }
}

#[test]
fn test_command_name_as_value() {
    let ops = init_ops("| tstats count from datamodel=Web");
    let from = ops[1].as_bare_expression().and_then(Expr::as_id).expect("from");
    assert_eq!(from.name, "from");
    assert_eq!(from.kind, IdKind::CommandUse);
}

#[test]
fn test_by_clause_with_commas() {
    let ops = stage_ops("search a=1 | stats count by host, user src", 0);
    assert!(matches!(&ops[0].kind, OperationKind::BareExpression(_)));
    match &ops[1].kind {
        OperationKind::By(ids) => {
            let names: Vec<&str> = ids.iter().map(|i| i.name.as_str()).collect();
            assert_eq!(names, vec!["host", "user", "src"]);
        }
        other => panic!("Expected by, got {:?}", other),
    }
}

#[test]
fn test_rename() {
    let ops = stage_ops("search a=1 | stats count(src_ip) AS c", 0);
    match &ops[0].kind {
        OperationKind::Rename { expr, alias } => {
            assert!(expr.is_call());
            assert_eq!(alias.name, "c");
        }
        other => panic!("Expected rename, got {:?}", other),
    }
}

#[test]
fn test_lookup_output_forms() {
    let ops = stage_ops("search a=1 | lookup users.csv username OUTPUT full_name", 0);
    assert_eq!(ops.len(), 2);
    match &ops[1].kind {
        OperationKind::OutputSingle { input, mode, output } => {
            assert_eq!(id_name(input), "username");
            assert_eq!(*mode, OutputMode::Output);
            assert_eq!(output.name, "full_name");
        }
        other => panic!("Expected single output, got {:?}", other),
    }

    // `geo` is the table, the pair before OUTPUTNEW the inputs
    let ops = stage_ops("search a=1 | lookup geo ip city OUTPUTNEW lat, lon", 0);
    assert_eq!(ops.len(), 2);
    match &ops[1].kind {
        OperationKind::OutputMulti { inputs, mode, outputs } => {
            assert_eq!(id_name(&inputs[0]), "ip");
            assert_eq!(id_name(&inputs[1]), "city");
            assert_eq!(*mode, OutputMode::OutputNew);
            assert_eq!(outputs[1].name, "lon");
        }
        other => panic!("Expected multi output, got {:?}", other),
    }
}

#[test]
fn test_in_and_like() {
    match &init_ops("search status IN (200, 404)")[0].kind {
        OperationKind::In { expr, items } => {
            assert_eq!(id_name(expr), "status");
            assert_eq!(items.len(), 2);
        }
        other => panic!("Expected in, got {:?}", other),
    }

    match &stage_ops("search a=1 | where name LIKE \"adm%\"", 0)[0].kind {
        OperationKind::Like { expr, pattern } => {
            assert_eq!(id_name(expr), "name");
            assert_eq!(pattern.text(), "\"adm%\"");
        }
        other => panic!("Expected like, got {:?}", other),
    }
}

#[test]
fn test_comma_separated_operations() {
    let ops = stage_ops("search a=1 | table host, src, dest", 0);
    assert_eq!(ops.len(), 3);
}

// ============================================================================
// Boolean precedence
// ============================================================================

#[test]
fn test_and_binds_tighter_than_or() {
    let ops = init_ops("search a=1 OR b=2 AND c=3");
    assert_eq!(ops.len(), 1);
    match &ops[0].kind {
        OperationKind::Or(_, rhs) => assert!(matches!(rhs.kind, OperationKind::And(_, _))),
        other => panic!("Expected or, got {:?}", other),
    }
}

#[test]
fn test_not_covers_and_chain() {
    let ops = init_ops("search NOT status=200 AND host=a");
    assert_eq!(ops.len(), 1);
    match &ops[0].kind {
        OperationKind::Not(inner) => assert!(matches!(inner.kind, OperationKind::And(_, _))),
        other => panic!("Expected not, got {:?}", other),
    }
}

#[test]
fn test_parenthesized_operation() {
    let ops = init_ops("search (status=404 OR status=500) host=web01");
    assert_eq!(ops.len(), 2);
    assert!(matches!(ops[0].kind, OperationKind::Paren(_)));
}

#[test]
fn test_lower_case_and_is_a_term() {
    let ops = init_ops("search a=1 and b=2");
    assert_eq!(ops.len(), 3);
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_arithmetic_precedence() {
    let ops = stage_ops("search x=1 | eval y = a + b * c", 0);
    match &ops[0].kind {
        OperationKind::KeyValue { value, .. } => match &value.kind {
            ExprKind::Binary { op: ArithOp::Add, rhs, .. } => {
                assert!(matches!(rhs.kind, ExprKind::Binary { op: ArithOp::Mult, .. }));
            }
            other => panic!("Expected addition, got {:?}", other),
        },
        other => panic!("Expected key-value, got {:?}", other),
    }
}

#[test]
fn test_signed_number() {
    match &stage_ops("search x=1 | eval y=-5", 0)[0].kind {
        OperationKind::KeyValue { value, .. } => {
            assert!(matches!(value.as_value(), Some(Value::Number { text, .. }) if text == "-5"));
        }
        other => panic!("Expected key-value, got {:?}", other),
    }
}

#[test]
fn test_wildcards() {
    match &init_ops("search host=web*")[0].kind {
        OperationKind::KeyValue { value, .. } => {
            assert!(matches!(value.kind, ExprKind::StartsWith(_)));
        }
        other => panic!("Expected key-value, got {:?}", other),
    }

    let expr_kind = |q: &str| init_ops(q)[0].as_bare_expression().cloned().map(|e| e.kind);
    assert!(matches!(expr_kind("search *error*"), Some(ExprKind::Contains(_))));
    assert!(matches!(expr_kind("search *error"), Some(ExprKind::EndsWith(_))));
    assert!(matches!(expr_kind("search *"), Some(ExprKind::Wildcard)));
}

#[test]
fn test_time_values() {
    let ops = init_ops("search earliest=-24h latest=now");
    match &ops[0].kind {
        OperationKind::KeyValue { field, value, .. } => {
            assert_eq!(field.kind, IdKind::FunctionUse);
            assert!(matches!(value.as_value(), Some(Value::Date(d)) if d.text == "-24h"));
        }
        other => panic!("Expected key-value, got {:?}", other),
    }
}

#[test]
fn test_path_expression() {
    match &init_ops("search source=/var/log/secure")[0].kind {
        OperationKind::KeyValue { value, .. } => match &value.kind {
            ExprKind::Path(segments) => assert_eq!(segments.len(), 3),
            other => panic!("Expected path, got {:?}", other),
        },
        other => panic!("Expected key-value, got {:?}", other),
    }
}

// ============================================================================
// Spans
// ============================================================================

#[test]
fn test_spans_cover_source_text() {
    let tree = parse("search  a = 1 /* c */ | stats count").unwrap();
    let op = &tree.query.init.operations[0];
    assert_eq!(tree.text(op.span), "a = 1");
    assert_eq!(tree.compact_text(op.span), "a=1");
    assert_eq!(tree.text(tree.query.commands[0].span), "stats count");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_empty_input() {
    let errors = parse("   ").unwrap_err();
    assert!(errors.is_empty_input());
    assert_eq!(errors.errors()[0], ParseError::EmptyInput);
}

#[test]
fn test_missing_command_after_pipe() {
    let errors = parse("search a=1 | | stats count").unwrap_err();
    assert_eq!(errors.len(), 1);
    let error = &errors.errors()[0];
    assert_eq!(error.line(), Some(1));
    assert_eq!(error.column(), Some(14));
    assert_eq!(error.message(), "mismatched input '|' expecting command");
}

#[test]
fn test_trailing_garbage() {
    let errors = parse("search a=1 )").unwrap_err();
    assert_eq!(
        errors.errors()[0].to_string(),
        "line 1:12 mismatched input ')' expecting {'|', <EOF>}"
    );
}

#[test]
fn test_errors_recovered_per_stage() {
    let errors = parse("search a=1 | | stats count | | head 5").unwrap_err();
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_lex_errors_surface_through_parse() {
    let errors = parse("search a=~").unwrap_err();
    assert!(matches!(errors.errors()[0], ParseError::Lex { .. }));
}

#[test]
fn test_unclosed_subquery() {
    assert!(parse("search a=1 [ search b=2").is_err());
}

// ============================================================================
// Pathological input
// ============================================================================

#[test]
fn test_long_wildcard_runs_parse_promptly() {
    let test_cases = vec![
        format!("search {}", "*".repeat(40)),
        format!("search {}", "* ".repeat(40)),
        format!("search x={}a{}", "*".repeat(40), "*".repeat(40)),
    ];

    for query in test_cases {
        let started = Instant::now();
        let _ = parse(&query);
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "\nQuery: {}\ntook {:?}",
            query,
            started.elapsed()
        );
    }

    assert!(parse(&format!("search {}", "*".repeat(40))).is_ok());
}

#[test]
fn test_moderate_nesting_parses() {
    let query = format!("search x={}a{}", "(".repeat(50), ")".repeat(50));
    assert!(parse(&query).is_ok());

    let query = format!("search {}a=1{}", "(".repeat(50), ")".repeat(50));
    assert!(parse(&query).is_ok());
}

#[test]
fn test_deep_nesting_is_an_error() {
    let test_cases = vec![
        format!("search x={}a{}", "(".repeat(3000), ")".repeat(3000)),
        format!("search {}a=1{}", "(".repeat(3000), ")".repeat(3000)),
        format!("search x=1 | eval y={}", "abs(".repeat(1000)),
        format!("search {}a=1{}", "[ search ".repeat(MAX_NESTING + 10), " ]".repeat(MAX_NESTING + 10)),
        format!("search {}a", "NOT ".repeat(2000)),
        format!("search x={}", "a^".repeat(2000) + "a"),
    ];

    for query in test_cases {
        let errors = parse(&query).unwrap_err();
        assert_eq!(errors.len(), 1, "\nQuery: {}...", &query[..40]);
        assert!(
            errors.errors()[0].message().starts_with("nesting too deep"),
            "\nQuery: {}...\nGot: {}",
            &query[..40],
            errors
        );
    }
}
