use crate::analysis::ast::node::{BinaryOp, NodeId, NodeKind};
use crate::analysis::ast::tree::Ast;
use crate::analysis::diagnostics::{Diagnostic, DiagnosticCause, Severity, CWE570};
use crate::analysis::global_context::GlobalContext;
use crate::analysis::numerical::relation::RelOp;
use crate::checker::checker_trait::{scan_roots, CheckerTrait};

/// What the compiler may turn an overflow test into
#[derive(Clone, Debug, PartialEq, Eq)]
enum Replacement {
    Constant(bool),
    Rewrite(String),
}

/// Finds overflow tests such as `x + 1 < x` that rely on signed integer or pointer
/// overflow, which is undefined behavior.
pub struct OverflowTestChecker<'ast, 'b> {
    context: &'b mut GlobalContext<'ast>,
}

impl<'ast, 'b> CheckerTrait<'ast, 'b> for OverflowTestChecker<'ast, 'b> {
    fn new(context: &'b mut GlobalContext<'ast>) -> Self {
        Self { context }
    }

    fn run(&mut self) {
        if !self.context.analysis_options.enable_warning {
            return;
        }
        info!("====== Overflow Test Checker starts ======");
        let ast = self.context.ast;
        for root in scan_roots(ast) {
            if self.context.should_stop() {
                break;
            }
            for id in ast.descendants(root) {
                self.check_comparison(id);
            }
        }
        info!("====== Overflow Test Checker ends ======");
    }
}

impl<'ast, 'b> OverflowTestChecker<'ast, 'b> {
    fn check_comparison(&mut self, id: NodeId) {
        let ast = self.context.ast;
        let cmp = match ast.node(id).binary_op().and_then(RelOp::from_binary) {
            Some(cmp) if !cmp.is_equality() => cmp,
            _ => return,
        };
        let (lhs, rhs) = match ast.binary_operands(id) {
            Some(operands) => operands,
            None => return,
        };
        for (arith, other_side, cmp) in [(lhs, rhs, cmp), (rhs, lhs, cmp.swap())].iter().copied() {
            if let Some(replacement) = self.check_side(arith, other_side, cmp) {
                let pointer = ast.value_type(arith).map_or(false, |vt| vt.is_pointer());
                self.invalid_test_for_overflow(id, pointer, replacement);
            }
        }
    }

    /// `arith cmp other_side` where `arith` is `e + c`, `c + e` or `e - c` and `e` is
    /// the same expression as `other_side`
    fn check_side(&self, arith: NodeId, other_side: NodeId, cmp: RelOp) -> Option<Replacement> {
        let ast = self.context.ast;
        let op = match ast.node(arith).binary_op() {
            Some(op @ BinaryOp::Add) | Some(op @ BinaryOp::Sub) => op,
            _ => return None,
        };
        let signed_or_pointer = ast
            .value_type(arith)
            .map_or(false, |vt| vt.is_signed_integer() || vt.is_pointer());
        if !signed_or_pointer {
            return None;
        }
        let (a, b) = ast.binary_operands(arith)?;
        for (expr, c) in [(a, b), (b, a)].iter().copied() {
            if op == BinaryOp::Sub && expr == b {
                continue;
            }
            if ast.has_known_int(expr) || !self.context.same(expr, other_side) {
                continue;
            }
            if let Some(replacement) = Self::replacement(ast, op, c, cmp) {
                debug!("Overflow test {} may become {:?}", ast.expr_string(arith), replacement);
                return Some(replacement);
            }
        }
        None
    }

    fn replacement(ast: &Ast, op: BinaryOp, c: NodeId, cmp: RelOp) -> Option<Replacement> {
        let node = ast.node(c);
        let positive_literal = node.is_number() && ast.known_int(c).map_or(false, |v| v > 0);
        let unsigned_value = !node.is_number()
            && ast
                .value_type(c)
                .map_or(false, |vt| vt.is_integral() && vt.is_unsigned());
        if positive_literal || unsigned_value {
            let result = match op {
                BinaryOp::Add => cmp == RelOp::Gt || cmp == RelOp::Ge,
                _ => cmp == RelOp::Lt || cmp == RelOp::Le,
            };
            return Some(Replacement::Constant(result));
        }
        let is_variable = node.variable.is_some() && matches!(node.kind, NodeKind::Identifier { .. });
        if !is_variable {
            return None;
        }
        let rewritten = if op == BinaryOp::Add { cmp } else { cmp.swap() };
        Some(Replacement::Rewrite(format!(
            "{} {} 0",
            ast.expr_string(c),
            rewritten
        )))
    }

    fn invalid_test_for_overflow(&mut self, id: NodeId, pointer: bool, replacement: Replacement) {
        if self.context.diag(id) {
            return;
        }
        let ast = self.context.ast;
        let overflow = if pointer {
            "pointer overflow"
        } else {
            "signed integer overflow"
        };
        let mut message = format!(
            "Invalid test for overflow '{}'; {} is undefined behavior.",
            ast.expr_string(id),
            overflow
        );
        match replacement {
            Replacement::Constant(result) => message.push_str(&format!(
                " Some mainstream compilers remove such overflow tests when optimising the code and assume it's always {}.",
                result
            )),
            Replacement::Rewrite(code) => message.push_str(&format!(
                " Some mainstream compilers removes handling of overflows when optimising the code and change the code to '{}'.",
                code
            )),
        }
        let diagnostic = Diagnostic::new(
            "invalidTestForOverflow",
            Severity::Warning,
            message,
            CWE570,
            DiagnosticCause::Overflow,
        )
        .at(ast, id, "");
        self.context.report(diagnostic);
    }
}
