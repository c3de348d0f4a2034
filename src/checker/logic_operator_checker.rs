use crate::analysis::ast::node::{BinaryOp, NodeId};
use crate::analysis::ast::value_type::BaseType;
use crate::analysis::diagnostics::{Diagnostic, DiagnosticCause, Severity, CWE398, CWE570, CWE571};
use crate::analysis::global_context::GlobalContext;
use crate::analysis::heuristics;
use crate::analysis::numerical::probe::probe;
use crate::analysis::numerical::relation::{parse_comparison, sufficient_condition, Comparison, Sufficient};
use crate::checker::checker_trait::{scan_roots, CheckerTrait};

/// Finds `&&` and `||` whose two comparisons of the same expression make the whole
/// condition constant, or make one of the comparisons redundant.
pub struct LogicOperatorChecker<'ast, 'b> {
    context: &'b mut GlobalContext<'ast>,
}

impl<'ast, 'b> CheckerTrait<'ast, 'b> for LogicOperatorChecker<'ast, 'b> {
    fn new(context: &'b mut GlobalContext<'ast>) -> Self {
        Self { context }
    }

    fn run(&mut self) {
        info!("====== Logic Operator Checker starts ======");
        let ast = self.context.ast;
        for root in scan_roots(ast) {
            if self.context.should_stop() {
                break;
            }
            for id in ast.descendants(root) {
                if ast.node(id).is_logical() {
                    self.check_logic_operator(id);
                }
            }
        }
        info!("====== Logic Operator Checker ends ======");
    }
}

impl<'ast, 'b> LogicOperatorChecker<'ast, 'b> {
    fn check_logic_operator(&mut self, id: NodeId) {
        let ast = self.context.ast;
        let (lhs, rhs) = match ast.binary_operands(id) {
            Some(operands) => operands,
            None => return,
        };
        let op = match ast.node(id).binary_op() {
            Some(op) => op,
            None => return,
        };
        let conjunction = op == BinaryOp::LogicalAnd;

        // Compile-time dispatch
        if heuristics::in_constexpr_if(ast, id) {
            return;
        }

        if self.context.analysis_options.enable_style && self.check_absorption(id, op, lhs, rhs) {
            return;
        }

        // In `a && b && c` the left operand is itself an `&&`: compare its last comparison
        let comp1 = if ast.is_binary(lhs, op) {
            match ast.operand(lhs, 1) {
                Some(last) => last,
                None => return,
            }
        } else {
            lhs
        };
        let comp2 = rhs;
        let first = parse_comparison(ast, comp1);
        let second = parse_comparison(ast, comp2);
        let inconclusive = first.as_ref().map_or(false, |c| c.inconclusive)
            || second.as_ref().map_or(false, |c| c.inconclusive);
        if inconclusive && !self.context.analysis_options.inconclusive {
            return;
        }

        let unknown = |c: &Option<Comparison>| {
            c.as_ref()
                .and_then(|c| ast.value_type(c.base))
                .map_or(false, |vt| vt.base == BaseType::Unknown)
        };
        if unknown(&first) || unknown(&second) {
            return;
        }
        let is_float = |c: &Option<Comparison>| {
            c.as_ref().map_or(false, |c| {
                c.relation.value.is_float() || ast.value_type(c.base).map_or(false, |vt| vt.is_float())
            })
        };
        let float = is_float(&first) || is_float(&second);

        let opposite = if conjunction {
            self.context.mutually_exclusive(lhs, rhs)
        } else {
            self.context.opposite(lhs, rhs)
        };
        if !float && opposite {
            if self.context.analysis_options.enable_warning {
                self.incorrect_logic_operator_error(id, ast.expr_string(id), !conjunction, inconclusive);
            }
            return;
        }

        let (first, second) = match (first, second) {
            (Some(first), Some(second)) => (first, second),
            _ => return,
        };
        if self.context.same(comp1, comp2) || !self.context.same(first.base, second.base) {
            return;
        }
        if float && (first.relation.op.is_equality() || second.relation.op.is_equality()) {
            return;
        }

        let unsigned = ast.value_type(first.base).map_or(false, |vt| vt.is_unsigned());
        let outcome = probe(&first, &second, conjunction, unsigned);
        debug!("Probing {}: {:?}", ast.expr_string(id), outcome);
        let cond1 = first.describe(ast);
        let cond2 = second.describe(ast);

        if outcome.always_true || outcome.always_false {
            if self.context.analysis_options.enable_warning {
                let text = format!("{} {} {}", cond1, op.symbol(), cond2);
                self.incorrect_logic_operator_error(id, text, outcome.always_true, inconclusive);
            }
        } else if outcome.first_is_sufficient != outcome.second_is_sufficient {
            if !self.context.analysis_options.enable_style {
                return;
            }
            // The condition that holds whenever the other one does
            let (implying, implied) = if outcome.first_is_sufficient {
                (&cond1, &cond2)
            } else {
                (&cond2, &cond1)
            };
            let expected = match (conjunction, outcome.first_is_sufficient) {
                (true, true) | (false, false) => Sufficient::First,
                _ => Sufficient::Second,
            };
            let which = sufficient_condition(&first.effective(), &second.effective(), conjunction);
            let text = if which == expected {
                let (redundant, sufficient) = match which {
                    Sufficient::First => (&cond2, &cond1),
                    _ => (&cond1, &cond2),
                };
                format!(
                    "The condition '{}' is redundant since '{}' is sufficient.",
                    redundant, sufficient
                )
            } else {
                format!("If '{}', the comparison '{}' is always true.", implying, implied)
            };
            self.redundant_condition_error(id, text, inconclusive);
        }
    }

    /// `A && (!A || B)`, `A || (!A && B)`, `A && (A || B)` and `A || (A && B)`
    fn check_absorption(&mut self, id: NodeId, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> bool {
        let ast = self.context.ast;
        let inner_op = match ast.node(rhs).binary_op() {
            Some(inner) if inner.is_logical() && inner != op => inner,
            _ => return false,
        };
        let (inner_lhs, inner_rhs) = match ast.binary_operands(rhs) {
            Some(operands) => operands,
            None => return false,
        };
        let expr1 = ast.expr_string(lhs);
        let expr2 = ast.expr_string(inner_lhs);
        let expr3 = ast.expr_string(inner_rhs);
        let long = expr1.len() + expr2.len() + expr3.len() > 50;

        let text = if self.context.opposite(lhs, inner_lhs) {
            let (a, not_a, b) = if !long {
                (expr1, expr2, expr3)
            } else if expr1.starts_with('!') && !expr2.starts_with('!') {
                ("!A".to_owned(), "A".to_owned(), "C".to_owned())
            } else if !expr1.starts_with('!') && expr2.starts_with('!') {
                ("A".to_owned(), "!A".to_owned(), "C".to_owned())
            } else {
                ("A".to_owned(), "B".to_owned(), "C".to_owned())
            };
            format!(
                "{}. '{} {} ({} {} {})' is equivalent to '{} {} {}'",
                ast.expr_string(inner_lhs),
                a,
                op.symbol(),
                not_a,
                inner_op.symbol(),
                b,
                a,
                op.symbol(),
                b
            )
        } else if self.context.same(lhs, inner_lhs) {
            let (a, a2, b) = if long {
                ("A".to_owned(), "A".to_owned(), "B".to_owned())
            } else {
                (expr1, expr2, expr3)
            };
            format!(
                "{}. '{} {} ({} {} {})' is equivalent to '{}'",
                ast.expr_string(inner_lhs),
                a,
                op.symbol(),
                a2,
                inner_op.symbol(),
                b,
                a
            )
        } else {
            return false;
        };
        self.redundant_condition_error(id, text, false);
        true
    }

    fn incorrect_logic_operator_error(&mut self, id: NodeId, condition: String, always_true: bool, inconclusive: bool) {
        if self.context.diag(id) {
            return;
        }
        let ast = self.context.ast;
        let (message, cwe) = if always_true {
            (
                format!("Logical disjunction always evaluates to true: {}.", condition),
                CWE571,
            )
        } else {
            (
                format!("Logical conjunction always evaluates to false: {}.", condition),
                CWE570,
            )
        };
        let diagnostic = Diagnostic::new(
            "incorrectLogicOperator",
            Severity::Warning,
            message,
            cwe,
            DiagnosticCause::Logic,
        )
        .at(ast, id, "")
        .inconclusive(inconclusive);
        self.context.report(diagnostic);
    }

    fn redundant_condition_error(&mut self, id: NodeId, text: String, inconclusive: bool) {
        if self.context.diag(id) {
            return;
        }
        let ast = self.context.ast;
        let diagnostic = Diagnostic::new(
            "redundantCondition",
            Severity::Style,
            format!("Redundant condition: {}", text),
            CWE398,
            DiagnosticCause::Logic,
        )
        .at(ast, id, "")
        .inconclusive(inconclusive);
        self.context.report(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ast::builder::AstBuilder;
    use crate::analysis::ast::node::VarId;
    use crate::analysis::ast::tree::Ast;
    use crate::analysis::ast::value_type::ValueType;
    use crate::analysis::numerical::relation::Number;
    use crate::analysis::option::AnalysisOption;

    /// Every integer around the two constants
    fn dense_sample(a: &Comparison, b: &Comparison) -> Vec<i128> {
        let value = |c: &Comparison| match c.relation.value {
            Number::Int(v) => v,
            Number::Float(v) => v as i128,
        };
        let (lo, hi) = (value(a).min(value(b)), value(a).max(value(b)));
        (lo - 3..=hi + 3).collect()
    }

    fn compare(b: &mut AstBuilder, var: VarId, op: BinaryOp, v: i64) -> NodeId {
        let r = b.var(var);
        let k = b.int(v);
        b.binary(op, r, k)
    }

    fn check(ast: &Ast, options: AnalysisOption) -> Vec<Diagnostic> {
        let _ = pretty_env_logger::try_init();
        let mut context = GlobalContext::new(ast, options);
        LogicOperatorChecker::new(&mut context).run();
        context.buffered_diagnostics
    }

    fn combined(op1: BinaryOp, v1: i64, logic: BinaryOp, op2: BinaryOp, v2: i64) -> Vec<Diagnostic> {
        let mut b = AstBuilder::new("test.c");
        let x = b.local("x", ValueType::int());
        let c1 = compare(&mut b, x, op1, v1);
        let c2 = compare(&mut b, x, op2, v2);
        b.binary(logic, c1, c2);
        let ast = b.finish();
        check(&ast, AnalysisOption::default())
    }

    #[test]
    fn test_disjunction_always_true() {
        let diagnostics = combined(BinaryOp::Ne, 1, BinaryOp::LogicalOr, BinaryOp::Ne, 3);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].id, "incorrectLogicOperator");
        assert_eq!(
            diagnostics[0].message,
            "Logical disjunction always evaluates to true: x != 1 || x != 3."
        );
        assert_eq!(diagnostics[0].cwe, CWE571);
    }

    #[test]
    fn test_conjunction_always_false() {
        let diagnostics = combined(BinaryOp::Lt, 1, BinaryOp::LogicalAnd, BinaryOp::Gt, 5);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "Logical conjunction always evaluates to false: x < 1 && x > 5."
        );
        assert_eq!(diagnostics[0].cwe, CWE570);
    }

    #[test]
    fn test_redundant_condition() {
        let diagnostics = combined(BinaryOp::Gt, 5, BinaryOp::LogicalAnd, BinaryOp::Ne, 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "Redundant condition: The condition 'x != 1' is redundant since 'x > 5' is sufficient."
        );

        let diagnostics = combined(BinaryOp::Ne, 1, BinaryOp::LogicalAnd, BinaryOp::Gt, 5);
        assert_eq!(
            diagnostics[0].message,
            "Redundant condition: The condition 'x != 1' is redundant since 'x > 5' is sufficient."
        );

        let diagnostics = combined(BinaryOp::Gt, 5, BinaryOp::LogicalOr, BinaryOp::Ne, 1);
        assert_eq!(
            diagnostics[0].message,
            "Redundant condition: The condition 'x > 5' is redundant since 'x != 1' is sufficient."
        );
    }

    #[test]
    fn test_independent_conditions_are_silent() {
        assert!(combined(BinaryOp::Gt, 1, BinaryOp::LogicalAnd, BinaryOp::Lt, 5).is_empty());
        assert!(combined(BinaryOp::Eq, 1, BinaryOp::LogicalOr, BinaryOp::Eq, 2).is_empty());
    }

    #[test]
    fn test_identical_operands_are_skipped() {
        assert!(combined(BinaryOp::Gt, 1, BinaryOp::LogicalAnd, BinaryOp::Gt, 1).is_empty());
    }

    #[test]
    fn test_constexpr_if_is_skipped() {
        // if constexpr (x != 1 || x != 3) {} and if constexpr (x > 5 && x != 1) {}
        for (op1, v1, logic, op2, v2) in [
            (BinaryOp::Ne, 1, BinaryOp::LogicalOr, BinaryOp::Ne, 3),
            (BinaryOp::Gt, 5, BinaryOp::LogicalAnd, BinaryOp::Ne, 1),
        ]
        .iter()
        .copied()
        {
            let mut b = AstBuilder::new("test.cpp");
            let x = b.local("x", ValueType::int());
            let c1 = compare(&mut b, x, op1, v1);
            let c2 = compare(&mut b, x, op2, v2);
            let cond = b.binary(logic, c1, c2);
            let then = b.block(vec![]);
            let if_stmt = b.if_constexpr(cond, then, None);
            let body = b.block(vec![if_stmt]);
            b.function("f", vec![], ValueType::int(), body);
            let ast = b.finish();
            assert!(check(&ast, AnalysisOption::default()).is_empty());
        }
    }

    #[test]
    fn test_absorption() {
        // a && (!a || b)
        let mut b = AstBuilder::new("test.c");
        let a = b.local("a", ValueType::bool());
        let bv = b.local("b", ValueType::bool());
        let ar = b.var(a);
        let ar2 = b.var(a);
        let not_a = b.not(ar2);
        let br = b.var(bv);
        let inner = b.binary(BinaryOp::LogicalOr, not_a, br);
        b.binary(BinaryOp::LogicalAnd, ar, inner);
        let ast = b.finish();

        let diagnostics = check(&ast, AnalysisOption::default());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "Redundant condition: !a. 'a && (!a || b)' is equivalent to 'a && b'"
        );

        // a || (a && b)
        let mut b = AstBuilder::new("test.c");
        let a = b.local("a", ValueType::bool());
        let bv = b.local("b", ValueType::bool());
        let ar = b.var(a);
        let ar2 = b.var(a);
        let br = b.var(bv);
        let inner = b.binary(BinaryOp::LogicalAnd, ar2, br);
        b.binary(BinaryOp::LogicalOr, ar, inner);
        let ast = b.finish();

        let diagnostics = check(&ast, AnalysisOption::default());
        assert_eq!(
            diagnostics[0].message,
            "Redundant condition: a. 'a || (a && b)' is equivalent to 'a'"
        );
    }

    #[test]
    fn test_char_ordering_needs_inconclusive() {
        let build = || {
            let mut b = AstBuilder::new("test.c");
            let c = b.local("c", ValueType::char());
            let cr = b.var(c);
            let lo = b.char_lit('a');
            let ge = b.binary(BinaryOp::Ge, cr, lo);
            let cr2 = b.var(c);
            let hi = b.char_lit('A');
            let lt = b.binary(BinaryOp::Lt, cr2, hi);
            b.binary(BinaryOp::LogicalAnd, ge, lt);
            b.finish()
        };
        let ast = build();
        assert!(check(&ast, AnalysisOption::default()).is_empty());

        let options = AnalysisOption {
            inconclusive: true,
            ..AnalysisOption::default()
        };
        let diagnostics = check(&ast, options);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_inconclusive());
    }

    #[test]
    fn test_unsigned_base_skips_negative_probes() {
        // u > 0 || u < 5 only fails for negative values
        let mut b = AstBuilder::new("test.c");
        let u = b.local("u", ValueType::uint());
        let ge = compare(&mut b, u, BinaryOp::Gt, 0);
        let lt = compare(&mut b, u, BinaryOp::Lt, 5);
        b.binary(BinaryOp::LogicalOr, ge, lt);
        let ast = b.finish();
        let diagnostics = check(&ast, AnalysisOption::default());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].id, "incorrectLogicOperator");
    }

    #[test]
    fn test_probe_agrees_with_dense_sample() {
        let ops = [
            BinaryOp::Eq,
            BinaryOp::Ne,
            BinaryOp::Lt,
            BinaryOp::Le,
            BinaryOp::Gt,
            BinaryOp::Ge,
        ];
        for op1 in ops.iter() {
            for op2 in ops.iter() {
                for (v1, v2) in [(1, 3), (3, 1), (0, 1), (2, 2)].iter() {
                    for conjunction in [true, false].iter() {
                        let mut b = AstBuilder::new("test.c");
                        let x = b.local("x", ValueType::int());
                        let c1 = compare(&mut b, x, *op1, *v1);
                        let c2 = compare(&mut b, x, *op2, *v2);
                        let ast = b.finish();
                        let first = parse_comparison(&ast, c1).unwrap();
                        let second = parse_comparison(&ast, c2).unwrap();
                        let outcome = probe(&first, &second, *conjunction, false);
                        for x in dense_sample(&first, &second) {
                            let r1 = first.is_true_for(Number::Int(x));
                            let r2 = second.is_true_for(Number::Int(x));
                            let value = if *conjunction { r1 && r2 } else { r1 || r2 };
                            if outcome.always_true {
                                assert!(value, "{:?} {:?} at {}", op1, op2, x);
                            }
                            if outcome.always_false {
                                assert!(!value, "{:?} {:?} at {}", op1, op2, x);
                            }
                            if outcome.first_is_sufficient {
                                assert!(!r1 || r2);
                            }
                            if outcome.second_is_sufficient {
                                assert!(!r2 || r1);
                            }
                        }
                    }
                }
            }
        }
    }
}
