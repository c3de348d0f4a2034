use crate::analysis::ast::node::{BinaryOp, Literal, NodeId};
use crate::analysis::ast::tree::Ast;
use crate::analysis::diagnostics::{Diagnostic, DiagnosticCause, Severity, CWE398, CWE571};
use crate::analysis::global_context::GlobalContext;
use crate::analysis::heuristics;
use crate::analysis::numerical::relation::RelOp;
use crate::checker::checker_trait::{scan_roots, CheckerTrait};

/// Decides `(X & k1) cmp k2` and `(X | k1) cmp k2` from the bits of the constants alone.
///
/// `X & k1` only has bits of `k1`, so it lies in `[0, k1]`; `X | k1` has all bits of `k1`,
/// so for unsigned `X` it is at least `k1`. Returns the constant truth value, if any.
pub fn classify(mask_op: BinaryOp, k1: i64, cmp: RelOp, k2: i64, masked_is_unsigned: bool) -> Option<bool> {
    if k1 < 0 || k2 < 0 {
        return None;
    }
    match (mask_op, cmp) {
        (BinaryOp::BitAnd, RelOp::Eq) | (BinaryOp::BitAnd, RelOp::Ne) if k1 & k2 != k2 => {
            Some(cmp == RelOp::Ne)
        }
        (BinaryOp::BitOr, RelOp::Eq) | (BinaryOp::BitOr, RelOp::Ne) if k1 | k2 != k2 => {
            Some(cmp == RelOp::Ne)
        }
        (BinaryOp::BitAnd, RelOp::Ge) | (BinaryOp::BitAnd, RelOp::Lt) if k1 < k2 => {
            Some(cmp == RelOp::Lt)
        }
        (BinaryOp::BitAnd, RelOp::Le) | (BinaryOp::BitAnd, RelOp::Gt) if k1 <= k2 => {
            Some(cmp == RelOp::Le)
        }
        (BinaryOp::BitOr, RelOp::Ge) | (BinaryOp::BitOr, RelOp::Lt) if masked_is_unsigned && k1 >= k2 => {
            Some(cmp == RelOp::Ge)
        }
        (BinaryOp::BitOr, RelOp::Le) | (BinaryOp::BitOr, RelOp::Gt) if masked_is_unsigned && k1 > k2 => {
            Some(cmp == RelOp::Gt)
        }
        _ => None,
    }
}

pub struct BitComparisonChecker<'ast, 'b> {
    context: &'b mut GlobalContext<'ast>,
}

impl<'ast, 'b> CheckerTrait<'ast, 'b> for BitComparisonChecker<'ast, 'b> {
    fn new(context: &'b mut GlobalContext<'ast>) -> Self {
        Self { context }
    }

    fn run(&mut self) {
        self.check_bad_bitmask();
        self.check_comparison();
    }
}

impl<'ast, 'b> BitComparisonChecker<'ast, 'b> {
    fn integer_literal(ast: &Ast, id: NodeId) -> Option<i64> {
        match ast.node(id).literal()? {
            Literal::Int { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Integer literals among the operands of a chain of the same bit operator
    fn chain_constants(ast: &Ast, id: NodeId, op: BinaryOp, constants: &mut Vec<i64>) {
        for operand in ast.operands(id).iter().copied() {
            if let Some(value) = Self::integer_literal(ast, operand) {
                constants.push(value);
            } else if ast.is_binary(operand, op) {
                Self::chain_constants(ast, operand, op, constants);
            }
        }
    }

    pub fn check_comparison(&mut self) {
        if !self.context.analysis_options.enable_style {
            return;
        }
        info!("====== Bit Comparison Checker starts ======");
        let ast = self.context.ast;
        for root in scan_roots(ast) {
            if self.context.should_stop() {
                break;
            }
            for id in ast.descendants(root) {
                self.check_comparison_at(id);
            }
        }
        info!("====== Bit Comparison Checker ends ======");
    }

    fn check_comparison_at(&mut self, id: NodeId) {
        let ast = self.context.ast;
        let node = ast.node(id);
        let cmp = match node.binary_op().and_then(RelOp::from_binary) {
            Some(cmp) => cmp,
            None => return,
        };
        if node.flags.macro_expanded {
            return;
        }
        let (lhs, rhs) = match ast.binary_operands(id) {
            Some(operands) => operands,
            None => return,
        };
        let (masked, k2, cmp) = match (Self::integer_literal(ast, lhs), Self::integer_literal(ast, rhs)) {
            (Some(k2), None) => (rhs, k2, cmp.swap()),
            (_, Some(k2)) => (lhs, k2, cmp),
            _ => return,
        };
        let mask_op = match ast.node(masked).binary_op() {
            Some(op @ BinaryOp::BitAnd) | Some(op @ BinaryOp::BitOr) => op,
            _ => return,
        };
        let masked_is_unsigned = ast
            .operands(masked)
            .iter()
            .find(|operand| Self::integer_literal(ast, **operand).is_none())
            .or_else(|| ast.operands(masked).first())
            .and_then(|operand| ast.value_type(*operand))
            .map_or(false, |vt| vt.is_unsigned());

        let mut constants = Vec::new();
        Self::chain_constants(ast, masked, mask_op, &mut constants);
        for k1 in constants {
            if let Some(result) = classify(mask_op, k1, cmp, k2, masked_is_unsigned) {
                debug!("{} is always {}", ast.expr_string(id), result);
                self.comparison_error(masked, mask_op, k1, cmp, k2, result);
            }
        }
    }

    fn comparison_error(&mut self, masked: NodeId, mask_op: BinaryOp, k1: i64, cmp: RelOp, k2: i64, result: bool) {
        let ast = self.context.ast;
        let expression = format!("(X {} 0x{:x}) {} 0x{:x}", mask_op.symbol(), k1, cmp, k2);
        let diagnostic = Diagnostic::new(
            "comparisonError",
            Severity::Style,
            format!("Expression '{}' is always {}.", expression, result),
            CWE398,
            DiagnosticCause::Bitwise,
        )
        .at(ast, masked, "");
        self.context.report(diagnostic);
    }

    pub fn check_bad_bitmask(&mut self) {
        info!("====== Bad Bitmask Checker starts ======");
        let ast = self.context.ast;
        for root in scan_roots(ast) {
            if self.context.should_stop() {
                break;
            }
            for id in ast.descendants(root) {
                self.check_bad_bitmask_at(id);
            }
        }
        info!("====== Bad Bitmask Checker ends ======");
    }

    fn check_bad_bitmask_at(&mut self, id: NodeId) {
        let ast = self.context.ast;
        if !ast.is_binary(id, BinaryOp::BitOr) || ast.parent(id).is_none() {
            return;
        }
        let (lhs, rhs) = match ast.binary_operands(id) {
            Some(operands) => operands,
            None => return,
        };
        let (v1, v2) = (ast.known_int(lhs), ast.known_int(rhs));

        let is_true = v1.map_or(false, |v| v != 0) || v2.map_or(false, |v| v != 0);
        if is_true && heuristics::is_boolean_context(ast, id) {
            self.bad_bitmask_error(id, false);
        }

        if heuristics::ifdef_in_subtree(ast, id) {
            return;
        }
        let zero1 = v1 == Some(0);
        let zero2 = v2 == Some(0);
        let expanded = |n: NodeId| ast.node(n).flags.macro_expanded;
        if (zero1 || zero2)
            && !expanded(id)
            && !(zero1 && expanded(lhs))
            && !(zero2 && expanded(rhs))
        {
            self.bad_bitmask_error(id, true);
        }
    }

    fn bad_bitmask_error(&mut self, id: NodeId, is_no_op: bool) {
        let (severity, message) = if is_no_op {
            (
                Severity::Style,
                "Operator '|' with one operand equal to zero is redundant.",
            )
        } else {
            (
                Severity::Warning,
                "Result of operator '|' is always true if one operand is non-zero. Did you intend to use '&'?",
            )
        };
        let ast = self.context.ast;
        let diagnostic = Diagnostic::new(
            "badBitmaskCheck",
            severity,
            message.to_owned(),
            CWE571,
            DiagnosticCause::Bitwise,
        )
        .at(ast, id, "");
        self.context.report(diagnostic);
    }
}
