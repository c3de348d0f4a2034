use condition_checker::analysis::analysis_result::AnalysisError;
use condition_checker::analysis::ast::builder::AstBuilder;
use condition_checker::analysis::ast::node::{BinaryOp, NodeId, VarId};
use condition_checker::analysis::ast::tree::Ast;
use condition_checker::analysis::ast::value_type::ValueType;
use condition_checker::analysis::diagnostics::{CollectingSink, DiagnosticCause};
use condition_checker::analysis::global_context::GlobalContext;
use condition_checker::analysis::numerical::probe::probe;
use condition_checker::analysis::numerical::relation::{parse_comparison, Number};
use condition_checker::analysis::option::AnalysisOption;
use condition_checker::analysis::platform::Platform;
use condition_checker::checker::checker_trait::{CheckerTrait, CHECKS};
use condition_checker::checker::known_condition_checker::KnownConditionChecker;
use condition_checker::check_translation_unit;

fn analyze(ast: &Ast, options: AnalysisOption) -> CollectingSink {
    let _ = pretty_env_logger::try_init();
    let mut sink = CollectingSink::default();
    let info = check_translation_unit(ast, options, &mut sink).unwrap();
    assert_eq!(info.checks_run, CHECKS.len());
    assert_eq!(info.diagnostics_emitted, sink.diagnostics.len());
    sink
}

fn compare(b: &mut AstBuilder, var: VarId, op: BinaryOp, value: i64) -> NodeId {
    let r = b.var(var);
    let k = b.int(value);
    b.binary(op, r, k)
}

/// `if (cond) {}` as the only statement of `f`
fn if_in_function(mut b: AstBuilder, params: Vec<VarId>, mut stmts: Vec<NodeId>, cond: NodeId) -> Ast {
    let then = b.block(vec![]);
    let if_stmt = b.if_stmt(cond, then, None);
    stmts.push(if_stmt);
    let body = b.block(stmts);
    b.function("f", params, ValueType::int(), body);
    b.finish()
}

#[test]
fn test_mismatching_assignment_and_comparison() {
    // x = a & 4; if (x == 3) {}
    let mut b = AstBuilder::new("scenario.c");
    let a = b.argument("a", ValueType::int());
    let x = b.local("x", ValueType::int());
    b.line(1);
    let xr = b.var(x);
    let ar = b.var(a);
    let four = b.int(4);
    let masked = b.binary(BinaryOp::BitAnd, ar, four);
    let assign = b.assign(xr, masked);
    b.line(2);
    let cond = compare(&mut b, x, BinaryOp::Eq, 3);
    let ast = if_in_function(b, vec![a], vec![assign], cond);

    let sink = analyze(&ast, AnalysisOption::default());
    assert_eq!(sink.ids(), vec!["assignIfError"]);
    assert_eq!(
        sink.diagnostics[0].message,
        "Mismatching assignment and comparison, comparison 'x == 3' is always false."
    );
    assert_eq!(sink.diagnostics[0].primary_location().map(|l| l.line), Some(2));
}

#[test]
fn test_disjunction_always_true() {
    // if (x != 1 || x != 3) {}
    let mut b = AstBuilder::new("scenario.c");
    let x = b.argument("x", ValueType::int());
    let c1 = compare(&mut b, x, BinaryOp::Ne, 1);
    let c2 = compare(&mut b, x, BinaryOp::Ne, 3);
    let cond = b.binary(BinaryOp::LogicalOr, c1, c2);
    let ast = if_in_function(b, vec![x], vec![], cond);

    let sink = analyze(&ast, AnalysisOption::default());
    assert_eq!(sink.ids(), vec!["incorrectLogicOperator"]);
    assert_eq!(
        sink.diagnostics[0].message,
        "Logical disjunction always evaluates to true: x != 1 || x != 3."
    );
}

#[test]
fn test_redundant_condition() {
    // if (x > 5 && x != 1) {}
    let mut b = AstBuilder::new("scenario.c");
    let x = b.argument("x", ValueType::int());
    let c1 = compare(&mut b, x, BinaryOp::Gt, 5);
    let c2 = compare(&mut b, x, BinaryOp::Ne, 1);
    let cond = b.binary(BinaryOp::LogicalAnd, c1, c2);
    let ast = if_in_function(b, vec![x], vec![], cond);

    let sink = analyze(&ast, AnalysisOption::default());
    assert_eq!(sink.ids(), vec!["redundantCondition"]);
    assert_eq!(
        sink.diagnostics[0].message,
        "Redundant condition: The condition 'x != 1' is redundant since 'x > 5' is sufficient."
    );
}

#[test]
fn test_opposite_inner_condition() {
    // if (x < 1) { if (x > 5) {} }
    let mut b = AstBuilder::new("scenario.c");
    let x = b.argument("x", ValueType::int());
    b.line(1);
    let outer = compare(&mut b, x, BinaryOp::Lt, 1);
    b.line(2);
    let inner = compare(&mut b, x, BinaryOp::Gt, 5);
    let inner_body = b.block(vec![]);
    let inner_if = b.if_stmt(inner, inner_body, None);
    let outer_body = b.block(vec![inner_if]);
    let outer_if = b.if_stmt(outer, outer_body, None);
    let body = b.block(vec![outer_if]);
    b.function("f", vec![x], ValueType::int(), body);
    let ast = b.finish();

    let sink = analyze(&ast, AnalysisOption::default());
    assert_eq!(sink.ids(), vec!["oppositeInnerCondition"]);
    let diagnostic = &sink.diagnostics[0];
    assert_eq!(
        diagnostic.message,
        "Opposite inner 'if' condition leads to a dead code block."
    );
    assert_eq!(diagnostic.error_path.len(), 2);
    assert_eq!(diagnostic.error_path[0].0.line, 1);
    assert_eq!(diagnostic.error_path[1].0.line, 2);
}

#[test]
fn test_known_condition() {
    // if (n == 5) {} with n known to be 5
    let mut b = AstBuilder::new("scenario.c");
    let n = b.argument("n", ValueType::int());
    let nr = b.var(n);
    b.known(nr, 5);
    let five = b.int(5);
    let cond = b.binary(BinaryOp::Eq, nr, five);
    let ast = if_in_function(b, vec![n], vec![], cond);

    let sink = analyze(&ast, AnalysisOption::default());
    assert_eq!(sink.ids(), vec!["knownConditionTrueFalse"]);
    assert_eq!(sink.diagnostics[0].message, "Condition 'n == 5' is always true");
}

#[test]
fn test_value_out_of_type_range() {
    // unsigned char c; if (c == 256) {}
    let mut b = AstBuilder::new("scenario.c");
    let c = b.local("c", ValueType::uchar());
    let cond = compare(&mut b, c, BinaryOp::Eq, 256);
    let ast = if_in_function(b, vec![], vec![], cond);

    let options = AnalysisOption {
        platform: Platform::unix64(),
        ..AnalysisOption::default()
    };
    let sink = analyze(&ast, options);
    assert_eq!(sink.ids(), vec!["compareValueOutOfTypeRangeError"]);
    assert_eq!(
        sink.diagnostics[0].message,
        "Comparing expression of type 'unsigned char' against value 256. Condition is always false."
    );

    // Without known type sizes nothing is reported
    let sink = analyze(&ast, AnalysisOption::default());
    assert!(sink.diagnostics.is_empty());
}

#[test]
fn test_reporting_twice_adds_nothing() {
    let mut b = AstBuilder::new("scenario.c");
    let n = b.argument("n", ValueType::int());
    let nr = b.var(n);
    b.known(nr, 5);
    let five = b.int(5);
    let cond = b.binary(BinaryOp::Eq, nr, five);
    let ast = if_in_function(b, vec![n], vec![], cond);

    let mut context = GlobalContext::new(&ast, AnalysisOption::default());
    KnownConditionChecker::new(&mut context).run();
    assert_eq!(context.buffered_diagnostics.len(), 1);
    KnownConditionChecker::new(&mut context).run();
    assert_eq!(context.buffered_diagnostics.len(), 1);
}

#[test]
fn test_conjunction_is_symmetric() {
    let pairs = [
        (BinaryOp::Lt, 1, BinaryOp::Gt, 5),
        (BinaryOp::Gt, 5, BinaryOp::Ne, 1),
        (BinaryOp::Eq, 2, BinaryOp::Eq, 3),
        (BinaryOp::Le, 4, BinaryOp::Ge, 4),
    ];
    for (op1, v1, op2, v2) in pairs.iter().copied() {
        let build = |swap: bool| {
            let mut b = AstBuilder::new("scenario.c");
            let x = b.argument("x", ValueType::int());
            let c1 = compare(&mut b, x, op1, v1);
            let c2 = compare(&mut b, x, op2, v2);
            let cond = if swap {
                b.binary(BinaryOp::LogicalAnd, c2, c1)
            } else {
                b.binary(BinaryOp::LogicalAnd, c1, c2)
            };
            if_in_function(b, vec![x], vec![], cond)
        };
        let forward = analyze(&build(false), AnalysisOption::default());
        let backward = analyze(&build(true), AnalysisOption::default());
        assert_eq!(forward.ids(), backward.ids(), "{:?} {:?}", op1, op2);
    }
}

#[test]
fn test_float_probe_is_sound() {
    let ops = [
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::Lt,
        BinaryOp::Le,
        BinaryOp::Gt,
        BinaryOp::Ge,
    ];
    for op1 in ops.iter().copied() {
        for op2 in ops.iter().copied() {
            for (v1, v2) in [(1.0, 1.5), (2.5, 0.5), (1.0, 1.0)].iter().copied() {
                for conjunction in [true, false].iter().copied() {
                    let mut b = AstBuilder::new("scenario.c");
                    let d = b.local("d", ValueType::double());
                    let dr = b.var(d);
                    let k1 = b.float(v1);
                    let c1 = b.binary(op1, dr, k1);
                    let dr2 = b.var(d);
                    let k2 = b.float(v2);
                    let c2 = b.binary(op2, dr2, k2);
                    let ast = b.finish();
                    let first = parse_comparison(&ast, c1).unwrap();
                    let second = parse_comparison(&ast, c2).unwrap();
                    let outcome = probe(&first, &second, conjunction, false);

                    let sample = (-40..=40).map(|i| f64::from(i) / 8.0);
                    for x in sample {
                        let r1 = first.is_true_for(Number::Float(x));
                        let r2 = second.is_true_for(Number::Float(x));
                        let value = if conjunction { r1 && r2 } else { r1 || r2 };
                        if outcome.always_true {
                            assert!(value, "{:?} {} {:?} {} at {}", op1, v1, op2, v2, x);
                        }
                        if outcome.always_false {
                            assert!(!value, "{:?} {} {:?} {} at {}", op1, v1, op2, v2, x);
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn test_severity_and_cause_filters() {
    // x = a & 4; if (x == 3) {} reports a style finding
    let build = || {
        let mut b = AstBuilder::new("scenario.c");
        let a = b.argument("a", ValueType::int());
        let x = b.local("x", ValueType::int());
        let xr = b.var(x);
        let ar = b.var(a);
        let four = b.int(4);
        let masked = b.binary(BinaryOp::BitAnd, ar, four);
        let assign = b.assign(xr, masked);
        let cond = compare(&mut b, x, BinaryOp::Eq, 3);
        if_in_function(b, vec![a], vec![assign], cond)
    };
    let ast = build();

    let warnings_only = AnalysisOption {
        enable_style: false,
        ..AnalysisOption::default()
    };
    assert!(analyze(&ast, warnings_only).diagnostics.is_empty());

    let suppressed = AnalysisOption {
        suppressed_warnings: Some(vec![DiagnosticCause::Bitwise]),
        ..AnalysisOption::default()
    };
    assert!(analyze(&ast, suppressed).diagnostics.is_empty());
}

#[test]
fn test_diagnostics_are_in_source_order() {
    // line 1: if (x != 1 || x != 3) {}
    // line 2: if (n == 5) {} with n known to be 5
    let mut b = AstBuilder::new("scenario.c");
    let x = b.argument("x", ValueType::int());
    let n = b.argument("n", ValueType::int());
    b.line(1);
    let c1 = compare(&mut b, x, BinaryOp::Ne, 1);
    let c2 = compare(&mut b, x, BinaryOp::Ne, 3);
    let disjunction = b.binary(BinaryOp::LogicalOr, c1, c2);
    let then = b.block(vec![]);
    let first_if = b.if_stmt(disjunction, then, None);
    b.line(2);
    let nr = b.var(n);
    b.known(nr, 5);
    let five = b.int(5);
    let cond = b.binary(BinaryOp::Eq, nr, five);
    let ast = if_in_function(b, vec![x, n], vec![first_if], cond);

    let sink = analyze(&ast, AnalysisOption::default());
    assert_eq!(sink.ids(), vec!["incorrectLogicOperator", "knownConditionTrueFalse"]);
    let lines: Vec<u32> = sink
        .diagnostics
        .iter()
        .filter_map(|d| d.primary_location().map(|l| l.line))
        .collect();
    assert_eq!(lines, vec![1, 2]);
}

#[test]
fn test_stop_flag_cancels_the_pass() {
    let mut b = AstBuilder::new("scenario.c");
    let x = b.argument("x", ValueType::int());
    let c1 = compare(&mut b, x, BinaryOp::Ne, 1);
    let c2 = compare(&mut b, x, BinaryOp::Ne, 3);
    let cond = b.binary(BinaryOp::LogicalOr, c1, c2);
    let ast = if_in_function(b, vec![x], vec![], cond);

    let options = AnalysisOption::default();
    options.stop.stop();
    let mut sink = CollectingSink::default();
    let err = check_translation_unit(&ast, options, &mut sink).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::Cancelled)
    ));
    assert!(sink.diagnostics.is_empty());
}
