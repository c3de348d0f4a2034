use crate::analysis::ast::node::{BinaryOp, Keyword, NodeId, NodeKind};
use crate::analysis::ast::tree::Ast;
use crate::analysis::ast::value_fact::ProvenanceStep;
use crate::analysis::diagnostics::{Diagnostic, DiagnosticCause, Severity, CWE570, CWE571};
use crate::analysis::global_context::GlobalContext;
use crate::analysis::heuristics;
use crate::analysis::numerical::relation::RelOp;
use crate::checker::checker_trait::{scan_roots, CheckerTrait};

/// How the value of a condition is consumed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConditionUse {
    /// Controls an `if`, a loop or a ternary, possibly through `&&`, `||` and `!`
    Branch,
    /// Returned from the function
    Return,
    /// Any other comparison or logical expression
    Value,
}

/// The truth of a condition and the reasoning that led to it
struct Verdict {
    truth: bool,
    provenance: Vec<ProvenanceStep>,
}

/// Reports conditions that value flow proved to be always true or always false.
pub struct KnownConditionChecker<'ast, 'b> {
    context: &'b mut GlobalContext<'ast>,
}

impl<'ast, 'b> CheckerTrait<'ast, 'b> for KnownConditionChecker<'ast, 'b> {
    fn new(context: &'b mut GlobalContext<'ast>) -> Self {
        Self { context }
    }

    fn run(&mut self) {
        if !self.context.analysis_options.enable_style {
            return;
        }
        info!("====== Known Condition Checker starts ======");
        let ast = self.context.ast;
        for root in scan_roots(ast) {
            if self.context.should_stop() {
                break;
            }
            for id in ast.descendants(root) {
                self.check_condition(id);
            }
        }
        info!("====== Known Condition Checker ends ======");
    }
}

impl<'ast, 'b> KnownConditionChecker<'ast, 'b> {
    fn check_condition(&mut self, id: NodeId) {
        let ast = self.context.ast;
        let usage = match Self::condition_use(ast, id) {
            Some(usage) => usage,
            None => return,
        };
        let verdict = match Self::verdict(ast, id) {
            Some(verdict) => verdict,
            None => return,
        };
        if self.is_suppressed(id, usage) {
            return;
        }
        debug!("{} is always {}", ast.expr_string(id), verdict.truth);
        self.always_true_false_error(id, usage, verdict);
    }

    /// `None` when the node is not used as a truth value
    fn condition_use(ast: &Ast, id: NodeId) -> Option<ConditionUse> {
        let node = ast.node(id);
        let fallback = if node.is_comparison() || node.is_logical() {
            Some(ConditionUse::Value)
        } else {
            None
        };
        let mut current = id;
        while let Some(parent) = ast.parent(current) {
            let parent_node = ast.node(parent);
            if parent_node.is_logical() || parent_node.is_not() {
                current = parent;
                continue;
            }
            return match &parent_node.kind {
                NodeKind::Keyword(Keyword::If { .. })
                | NodeKind::Keyword(Keyword::While)
                | NodeKind::Keyword(Keyword::DoWhile)
                | NodeKind::Keyword(Keyword::For)
                    if ast.condition(parent) == Some(current) =>
                {
                    Some(ConditionUse::Branch)
                }
                NodeKind::Ternary if ast.operand(parent, 0) == Some(current) => Some(ConditionUse::Branch),
                NodeKind::Keyword(Keyword::Return) => Some(ConditionUse::Return),
                NodeKind::Keyword(Keyword::Throw) => Some(ConditionUse::Branch),
                _ => fallback,
            };
        }
        fallback
    }

    /// A known fact on the node itself, or the value folded from known operands
    fn verdict(ast: &Ast, id: NodeId) -> Option<Verdict> {
        if let Some(fact) = ast.facts(id).iter().find(|fact| fact.truth().is_some()) {
            return Some(Verdict {
                truth: fact.truth()?,
                provenance: fact.provenance.clone(),
            });
        }
        let mut provenance = Vec::new();
        let truth = Self::fold(ast, id, &mut provenance)?;
        Some(Verdict { truth, provenance })
    }

    fn known_operand(ast: &Ast, id: NodeId, provenance: &mut Vec<ProvenanceStep>) -> Option<i64> {
        let value = ast.known_int(id)?;
        if let Some(fact) = ast.known_int_fact(id) {
            provenance.extend(fact.provenance.iter().cloned());
        }
        Some(value)
    }

    fn fold(ast: &Ast, id: NodeId, provenance: &mut Vec<ProvenanceStep>) -> Option<bool> {
        if let Some(truth) = ast.facts(id).iter().find_map(|fact| fact.truth()) {
            if let Some(fact) = ast.known_int_fact(id) {
                provenance.extend(fact.provenance.iter().cloned());
            }
            return Some(truth);
        }
        let node = ast.node(id);
        if node.is_not() {
            return Some(!Self::fold(ast, ast.operand(id, 0)?, provenance)?);
        }
        let op = node.binary_op()?;
        let (lhs, rhs) = ast.binary_operands(id)?;
        if let Some(cmp) = RelOp::from_binary(op) {
            let l = Self::known_operand(ast, lhs, provenance)?;
            let r = Self::known_operand(ast, rhs, provenance)?;
            return Some(cmp.holds(l, r));
        }
        if !op.is_logical() {
            return None;
        }
        let conjunction = op == BinaryOp::LogicalAnd;
        let mut left_steps = Vec::new();
        let mut right_steps = Vec::new();
        let l = Self::fold(ast, lhs, &mut left_steps);
        let r = Self::fold(ast, rhs, &mut right_steps);
        // One operand decides the result on its own
        let short_circuit = !conjunction;
        if l == Some(short_circuit) {
            provenance.extend(left_steps);
            return Some(short_circuit);
        }
        if r == Some(short_circuit) {
            provenance.extend(right_steps);
            return Some(short_circuit);
        }
        match (l, r) {
            (Some(_), Some(_)) => {
                provenance.extend(left_steps);
                provenance.extend(right_steps);
                Some(!short_circuit)
            }
            _ => None,
        }
    }

    fn is_suppressed(&self, id: NodeId, usage: ConditionUse) -> bool {
        let ast = self.context.ast;
        let node = ast.node(id);

        if ast.has_bailout(id) || self.context.already_reported(id) {
            return true;
        }
        if heuristics::in_unevaluated_context(ast, id)
            || heuristics::in_template(ast, id)
            || heuristics::in_constexpr_if(ast, id)
        {
            return true;
        }
        if heuristics::macro_in_ancestors(ast, id) || heuristics::macro_in_subtree(ast, id) {
            return true;
        }
        if heuristics::is_literal_condition(ast, id) {
            return true;
        }
        if node.is_logical()
            && ast.operands(id).iter().any(|operand| {
                ast.known_int_fact(*operand).is_some() && !ast.node(*operand).is_number()
            })
        {
            return true;
        }
        if usage == ConditionUse::Return {
            let plain_value = matches!(
                node.kind,
                NodeKind::Identifier { .. } | NodeKind::Member { .. } | NodeKind::Call(_)
            ) || node.binary_op().map_or(false, |op| op.is_assignment());
            if plain_value || !heuristics::in_boolean_function(ast, id) {
                return true;
            }
        }
        if node.is_comparison() {
            if let Some((lhs, rhs)) = ast.binary_operands(id) {
                if self.context.same(lhs, rhs) && !heuristics::has_side_effects(ast, id) {
                    return true;
                }
            }
        }
        heuristics::is_const_expression(ast, id)
            || heuristics::is_unsigned_or_pointer_zero_compare(ast, id)
            || heuristics::is_sizeof_only(ast, id)
            || heuristics::is_stream_chain(ast, id)
    }

    fn always_true_false_error(&mut self, id: NodeId, usage: ConditionUse, verdict: Verdict) {
        if self.context.diag(id) {
            return;
        }
        let ast = self.context.ast;
        let subject = if usage == ConditionUse::Return {
            "Return value"
        } else {
            "Condition"
        };
        let message = format!(
            "{} '{}' is always {}",
            subject,
            ast.expr_string(id),
            verdict.truth
        );
        let cwe = if verdict.truth { CWE571 } else { CWE570 };
        let mut diagnostic = Diagnostic::new(
            "knownConditionTrueFalse",
            Severity::Style,
            message,
            cwe,
            DiagnosticCause::KnownCondition,
        );
        for step in verdict.provenance.iter() {
            diagnostic = diagnostic.at(ast, step.node, &step.explanation);
        }
        diagnostic = diagnostic.at(ast, id, "");
        self.context.report(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ast::builder::AstBuilder;
    use crate::analysis::ast::node::{CallInfo, VarId};
    use crate::analysis::ast::value_fact::ValueFact;
    use crate::analysis::ast::value_type::{BaseType, Sign, ValueType};
    use crate::analysis::option::AnalysisOption;

    fn void() -> ValueType {
        ValueType::new(BaseType::Void, Sign::Unknown)
    }

    fn check(ast: &Ast) -> Vec<Diagnostic> {
        let _ = pretty_env_logger::try_init();
        let mut context = GlobalContext::new(ast, AnalysisOption::default());
        KnownConditionChecker::new(&mut context).run();
        context.buffered_diagnostics
    }

    /// `n = 5; if (n == 5) {}` with the value of `n` known at the comparison
    fn known_comparison(b: &mut AstBuilder, n: VarId) -> (NodeId, NodeId) {
        b.line(2);
        let lhs = b.var(n);
        let five = b.int(5);
        let assign = b.assign(lhs, five);
        b.line(3);
        let nr = b.var(n);
        b.fact(nr, ValueFact::known_int(5).with_step(assign, "Assignment 'n=5'"));
        let five2 = b.int(5);
        let cmp = b.binary(BinaryOp::Eq, nr, five2);
        let body = b.block(vec![]);
        let if_stmt = b.if_stmt(cmp, body, None);
        (assign, if_stmt)
    }

    #[test]
    fn test_known_condition() {
        let mut b = AstBuilder::new("test.c");
        let n = b.local("n", ValueType::int());
        let (assign, if_stmt) = known_comparison(&mut b, n);
        let body = b.block(vec![assign, if_stmt]);
        b.function("f", vec![], void(), body);
        let ast = b.finish();

        let diagnostics = check(&ast);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Condition 'n == 5' is always true");
        assert_eq!(diagnostics[0].cwe, CWE571);
        assert_eq!(diagnostics[0].error_path.len(), 2);
        assert_eq!(diagnostics[0].error_path[0].1, "Assignment 'n=5'");
        assert_eq!(diagnostics[0].error_path[0].0.line, 2);
        assert_eq!(diagnostics[0].primary_location().map(|loc| loc.line), Some(3));
    }

    #[test]
    fn test_known_fact_on_condition() {
        let mut b = AstBuilder::new("test.c");
        let flag = b.local("flag", ValueType::bool());
        let fr = b.var(flag);
        b.known(fr, 0);
        let body = b.block(vec![]);
        let while_stmt = b.while_stmt(fr, body);
        let fbody = b.block(vec![while_stmt]);
        b.function("f", vec![], void(), fbody);
        let ast = b.finish();

        let diagnostics = check(&ast);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Condition 'flag' is always false");
        assert_eq!(diagnostics[0].cwe, CWE570);
    }

    #[test]
    fn test_impossible_zero_is_true() {
        let mut b = AstBuilder::new("test.c");
        let p = b.local("p", ValueType::int().pointer_to());
        let pr = b.var(p);
        b.fact(pr, ValueFact::impossible_int(0));
        let body = b.block(vec![]);
        let if_stmt = b.if_stmt(pr, body, None);
        let fbody = b.block(vec![if_stmt]);
        b.function("f", vec![], void(), fbody);
        let ast = b.finish();

        let diagnostics = check(&ast);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Condition 'p' is always true");
    }

    #[test]
    fn test_return_value() {
        // bool f(int x) { return x == 5; } with x known to be 5
        let mut b = AstBuilder::new("test.c");
        let x = b.argument("x", ValueType::int());
        let xr = b.var(x);
        b.known(xr, 5);
        let five = b.int(5);
        let cmp = b.binary(BinaryOp::Eq, xr, five);
        let ret = b.return_stmt(Some(cmp));
        let body = b.block(vec![ret]);
        b.function("f", vec![x], ValueType::bool(), body);
        let ast = b.finish();

        let diagnostics = check(&ast);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Return value 'x == 5' is always true");
    }

    #[test]
    fn test_return_in_int_function_is_silent() {
        let mut b = AstBuilder::new("test.c");
        let x = b.argument("x", ValueType::int());
        let xr = b.var(x);
        b.known(xr, 5);
        let five = b.int(5);
        let cmp = b.binary(BinaryOp::Eq, xr, five);
        let ret = b.return_stmt(Some(cmp));
        let body = b.block(vec![ret]);
        b.function("f", vec![x], ValueType::int(), body);
        let ast = b.finish();

        assert!(check(&ast).is_empty());
    }

    #[test]
    fn test_suppressions() {
        let mut b = AstBuilder::new("test.c");
        let n = b.local("n", ValueType::int());
        let mut statements = Vec::new();

        // if (1)
        let one = b.int(1);
        let body = b.block(vec![]);
        statements.push(b.if_stmt(one, body, None));

        // if (n == 5) with a bailout on the comparison
        let nr = b.var(n);
        b.known(nr, 5);
        let five = b.int(5);
        let cmp = b.binary(BinaryOp::Eq, nr, five);
        b.fact(cmp, ValueFact::bailout());
        let body = b.block(vec![]);
        statements.push(b.if_stmt(cmp, body, None));

        // if (n == LIMIT) with LIMIT from a macro
        let nr = b.var(n);
        b.known(nr, 5);
        let limit = b.int(5);
        b.macro_expanded(limit);
        let cmp = b.binary(BinaryOp::Eq, nr, limit);
        let body = b.block(vec![]);
        statements.push(b.if_stmt(cmp, body, None));

        // assert(n == 5)
        let nr = b.var(n);
        b.known(nr, 5);
        let five = b.int(5);
        let cmp = b.binary(BinaryOp::Eq, nr, five);
        statements.push(b.call(CallInfo::function("assert"), vec![cmp]));

        // if (sizeof(int) == 4)
        let int_name = b.name("int");
        let size = b.call(CallInfo::function("sizeof"), vec![int_name]);
        b.known(size, 4);
        let four = b.int(4);
        let cmp = b.binary(BinaryOp::Eq, size, four);
        let body = b.block(vec![]);
        statements.push(b.if_stmt(cmp, body, None));

        let fbody = b.block(statements);
        b.function("f", vec![], void(), fbody);
        let ast = b.finish();

        assert!(check(&ast).is_empty());
    }

    #[test]
    fn test_reporting_twice_adds_nothing() {
        let mut b = AstBuilder::new("test.c");
        let n = b.local("n", ValueType::int());
        let (assign, if_stmt) = known_comparison(&mut b, n);
        let body = b.block(vec![assign, if_stmt]);
        b.function("f", vec![], void(), body);
        let ast = b.finish();

        let mut context = GlobalContext::new(&ast, AnalysisOption::default());
        KnownConditionChecker::new(&mut context).run();
        KnownConditionChecker::new(&mut context).run();
        assert_eq!(context.buffered_diagnostics.len(), 1);
    }
}
