use crate::analysis::ast::node::{BinaryOp, Keyword, NodeId, NodeKind, VarId};
use crate::analysis::ast::tree::Ast;
use crate::analysis::diagnostics::{Diagnostic, DiagnosticCause, Severity, CWE398};
use crate::analysis::global_context::GlobalContext;
use crate::checker::checker_trait::{scan_roots, CheckerTrait};

/// Tracks `x = y & k` (or `x = y | k`) through the statements that follow and reports
/// later masks or comparisons of `x` that contradict `k`.
pub struct AssignIfChecker<'ast, 'b> {
    context: &'b mut GlobalContext<'ast>,
}

/// A statement-level `var = expr & num` or `var = expr | num`
#[derive(Clone, Copy, Debug)]
struct BitmaskAssignment {
    node: NodeId,
    var: VarId,
    is_local: bool,
    bitop: BinaryOp,
    num: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScopeResult {
    /// The end of the scope or a jump was reached
    Done,
    /// The variable may have changed, stop tracking it
    Changed,
}

impl<'ast, 'b> CheckerTrait<'ast, 'b> for AssignIfChecker<'ast, 'b> {
    fn new(context: &'b mut GlobalContext<'ast>) -> Self {
        Self { context }
    }

    fn run(&mut self) {
        info!("====== Assign If Checker starts ======");
        let ast = self.context.ast;
        for root in scan_roots(ast) {
            if self.context.should_stop() {
                break;
            }
            for id in ast.descendants(root) {
                if let Some(assignment) = Self::bitmask_assignment(ast, id) {
                    debug!("Tracking bitmask assignment {}", ast.expr_string(id));
                    let following = Self::following_statements(ast, id);
                    self.parse_scope(&assignment, &following);
                }
            }
        }
        info!("====== Assign If Checker ends ======");
    }
}

impl<'ast, 'b> AssignIfChecker<'ast, 'b> {
    fn bitmask_assignment(ast: &Ast, id: NodeId) -> Option<BitmaskAssignment> {
        if !ast.is_binary(id, BinaryOp::Assign) {
            return None;
        }
        if !ast.parent(id).map_or(false, |p| ast.node(p).is_block()) {
            return None;
        }
        let (lhs, rhs) = ast.binary_operands(id)?;
        if !matches!(ast.node(lhs).kind, NodeKind::Identifier { .. }) {
            return None;
        }
        let var = ast.var_of(lhs)?;
        let bitop = ast
            .node(rhs)
            .binary_op()
            .filter(|op| matches!(op, BinaryOp::BitAnd | BinaryOp::BitOr))?;
        let (a, b) = ast.binary_operands(rhs)?;
        let num = ast.literal_int(a).or_else(|| ast.literal_int(b))?;
        if num < 0 && bitop == BinaryOp::BitOr {
            return None;
        }
        Some(BitmaskAssignment {
            node: id,
            var,
            is_local: ast.variable(var).flags.is_local,
            bitop,
            num,
        })
    }

    fn following_statements(ast: &Ast, stmt: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = stmt;
        while let Some(next) = ast.next_statement(current) {
            result.push(next);
            current = next;
        }
        result
    }

    fn changes_var(&self, assignment: &BitmaskAssignment, at: NodeId) -> bool {
        self.context
            .mutation
            .variable_changed_at(self.context.ast, assignment.var, at)
    }

    fn changed_within(&self, assignment: &BitmaskAssignment, subtree: NodeId) -> bool {
        let ast = self.context.ast;
        ast.descendants(subtree)
            .any(|n| self.changes_var(assignment, n))
    }

    fn parse_scope(&mut self, assignment: &BitmaskAssignment, statements: &[NodeId]) -> ScopeResult {
        let ast = self.context.ast;
        for stmt in statements.iter().copied() {
            match ast.node(stmt).keyword() {
                Some(Keyword::If { .. }) => {
                    if self.parse_branches(assignment, stmt) == ScopeResult::Changed {
                        return ScopeResult::Changed;
                    }
                }
                Some(Keyword::While) => {
                    if self.changed_within(assignment, stmt) {
                        return ScopeResult::Changed;
                    }
                    if !assignment.is_local {
                        continue;
                    }
                    if self.parse_branches(assignment, stmt) == ScopeResult::Changed {
                        return ScopeResult::Changed;
                    }
                }
                Some(Keyword::For) | Some(Keyword::DoWhile) => {
                    if self.changed_within(assignment, stmt) {
                        return ScopeResult::Changed;
                    }
                    return match ast.body(stmt) {
                        Some(body) => self.parse_scope(assignment, &ast.statements(body)),
                        None => ScopeResult::Done,
                    };
                }
                Some(Keyword::Switch) => {
                    if let Some(cond) = ast.condition(stmt) {
                        if self.changed_within(assignment, cond) {
                            return ScopeResult::Changed;
                        }
                    }
                    return match ast.body(stmt) {
                        Some(body) => self.parse_scope(assignment, &ast.statements(body)),
                        None => ScopeResult::Done,
                    };
                }
                Some(Keyword::Catch) => {
                    return match ast.body(stmt) {
                        Some(body) => self.parse_scope(assignment, &ast.statements(body)),
                        None => ScopeResult::Done,
                    };
                }
                None if ast.node(stmt).is_block() => {
                    return self.parse_scope(assignment, ast.operands(stmt));
                }
                keyword => {
                    for n in ast.descendants(stmt) {
                        self.check_mismatching_bit_and(assignment, n);
                        if self.changes_var(assignment, n) {
                            return ScopeResult::Changed;
                        }
                    }
                    if keyword.map_or(false, Keyword::is_jump) {
                        return ScopeResult::Done;
                    }
                }
            }
        }
        ScopeResult::Done
    }

    /// The condition of an `if` or `while`, then its branches
    fn parse_branches(&mut self, assignment: &BitmaskAssignment, stmt: NodeId) -> ScopeResult {
        let ast = self.context.ast;
        if let Some(cond) = ast.condition(stmt) {
            for n in ast.descendants(cond) {
                self.check_mismatching_bit_and(assignment, n);
                self.check_comparison(assignment, n);
                if self.changes_var(assignment, n) {
                    return ScopeResult::Changed;
                }
            }
        }
        let then_result = match ast.body(stmt) {
            Some(body) => self.parse_scope(assignment, &ast.statements(body)),
            None => ScopeResult::Done,
        };
        let else_result = match ast.else_branch(stmt) {
            Some(els) => self.parse_scope(assignment, &ast.statements(els)),
            None => ScopeResult::Done,
        };
        if then_result == ScopeResult::Changed || else_result == ScopeResult::Changed {
            ScopeResult::Changed
        } else {
            ScopeResult::Done
        }
    }

    /// `var & num2` or `var &= num2` with no bit in common with the assigned mask
    fn check_mismatching_bit_and(&mut self, assignment: &BitmaskAssignment, id: NodeId) {
        if assignment.bitop != BinaryOp::BitAnd {
            return;
        }
        let ast = self.context.ast;
        let (lhs, rhs) = match ast.binary_operands(id) {
            Some(operands) => operands,
            None => return,
        };
        let num2 = match ast.node(id).binary_op() {
            Some(BinaryOp::AndAssign) if ast.var_of(lhs) == Some(assignment.var) => {
                ast.literal_int(rhs)
            }
            Some(BinaryOp::BitAnd) if ast.var_of(lhs) == Some(assignment.var) => ast.literal_int(rhs),
            Some(BinaryOp::BitAnd) if ast.var_of(rhs) == Some(assignment.var) => ast.literal_int(lhs),
            _ => None,
        };
        if let Some(num2) = num2 {
            if assignment.num & num2 == 0 {
                self.mismatching_bit_and_error(assignment, id, num2);
            }
        }
    }

    /// `var == num2` or `var != num2` at the top of the condition's `&&`/`||` chain
    fn check_comparison(&mut self, assignment: &BitmaskAssignment, id: NodeId) {
        let ast = self.context.ast;
        let op = match ast.node(id).binary_op() {
            Some(op @ BinaryOp::Eq) | Some(op @ BinaryOp::Ne) => op,
            _ => return,
        };
        let at_top = ast.parent(id).map_or(false, |parent| {
            let node = ast.node(parent);
            node.is_logical() || ast.condition(parent) == Some(id)
        });
        if !at_top {
            return;
        }
        let (lhs, rhs) = match ast.binary_operands(id) {
            Some(operands) => operands,
            None => return,
        };
        let (var_side, num2) = if ast.var_of(lhs) == Some(assignment.var) {
            (lhs, ast.literal_int(rhs))
        } else if ast.var_of(rhs) == Some(assignment.var) {
            (rhs, ast.literal_int(lhs))
        } else {
            return;
        };
        let num2 = match num2 {
            Some(num2) if matches!(ast.node(var_side).kind, NodeKind::Identifier { .. }) => num2,
            _ => return,
        };
        let expected = if assignment.bitop == BinaryOp::BitAnd {
            num2
        } else {
            assignment.num
        };
        if assignment.num & num2 != expected {
            let condition = format!(
                "{} {} {}",
                ast.expr_string(var_side),
                op.symbol(),
                num2
            );
            self.assign_if_error(assignment, id, &condition, op == BinaryOp::Ne);
        }
    }

    fn assign_if_error(
        &mut self,
        assignment: &BitmaskAssignment,
        comparison: NodeId,
        condition: &str,
        result: bool,
    ) {
        if self.context.diag(comparison) {
            return;
        }
        let ast = self.context.ast;
        let diagnostic = Diagnostic::new(
            "assignIfError",
            Severity::Style,
            format!(
                "Mismatching assignment and comparison, comparison '{}' is always {}.",
                condition, result
            ),
            CWE398,
            DiagnosticCause::Bitwise,
        )
        .at(ast, assignment.node, "")
        .at(ast, comparison, "");
        self.context.report(diagnostic);
    }

    fn mismatching_bit_and_error(&mut self, assignment: &BitmaskAssignment, usage: NodeId, num2: i64) {
        let ast = self.context.ast;
        let diagnostic = Diagnostic::new(
            "mismatchingBitAnd",
            Severity::Style,
            format!(
                "Mismatching bitmasks. Result is always 0 (X = Y & 0x{:x}; Z = X & 0x{:x}; => Z=0).",
                assignment.num, num2
            ),
            CWE398,
            DiagnosticCause::Bitwise,
        )
        .at(ast, assignment.node, "")
        .at(ast, usage, "");
        self.context.report(diagnostic);
    }
}
