//! Compares a condition with the conditions around it: the `else if` branches of the
//! same chain, the conditions nested in its body, the conditions that follow an early
//! exit, and an identical `if` right after it.

use crate::analysis::ast::node::{BinaryOp, Keyword, Literal, NodeId, NodeKind, ScopeId, VarId};
use crate::analysis::ast::tree::Ast;
use crate::analysis::diagnostics::{Diagnostic, DiagnosticCause, Severity, CWE398};
use crate::analysis::global_context::GlobalContext;
use crate::analysis::heuristics;
use crate::checker::checker_trait::{scan_roots, CheckerTrait};
use std::ops::Range;

pub struct ConditionComparator<'ast, 'b> {
    context: &'b mut GlobalContext<'ast>,
}

/// Where the later conditions are searched
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanKind {
    /// Inside the body of the outer statement
    Inner,
    /// After an `if` whose body starts with a jump
    AfterEarlyExit,
}

/// What the outer condition depends on
struct ConditionDeps {
    vars: Vec<VarId>,
    /// Reads state that a call could change: globals, pointees, unresolved names
    nonlocal: bool,
    function_call: bool,
}

impl<'ast, 'b> CheckerTrait<'ast, 'b> for ConditionComparator<'ast, 'b> {
    fn new(context: &'b mut GlobalContext<'ast>) -> Self {
        Self { context }
    }

    fn run(&mut self) {
        self.check_duplicate_condition();
        self.check_else_if_chains();
        self.check_nested_conditions();
    }
}

/// Helpers
impl<'ast, 'b> ConditionComparator<'ast, 'b> {
    /// Statements of a kind, in source order, stopping at cancellation
    fn statements_of(&self, keep: impl Fn(&Ast, NodeId) -> bool) -> Vec<NodeId> {
        let ast = self.context.ast;
        let mut result = Vec::new();
        for root in scan_roots(ast) {
            if self.context.should_stop() {
                break;
            }
            result.extend(ast.descendants(root).filter(|id| keep(ast, *id)));
        }
        result
    }

    /// The `if` of an `else if`: an else branch that is an `if`, or a block holding only one
    fn else_if(ast: &Ast, if_stmt: NodeId) -> Option<NodeId> {
        let els = ast.else_branch(if_stmt)?;
        if ast.is_if(els) {
            return Some(els);
        }
        match ast.operands(els) {
            [only] if ast.node(els).is_block() && ast.is_if(*only) => Some(*only),
            _ => None,
        }
    }

    /// The expression changes from its own evaluation up to the start of `to`
    fn changed_until(&self, expr: NodeId, to: NodeId) -> bool {
        let ast = self.context.ast;
        self.context.mutation.changed_within(ast, expr, expr)
            || self.context.mutation.changed_between(ast, expr, expr, to)
    }

    fn root_of(ast: &Ast, id: NodeId) -> NodeId {
        ast.ancestors(id).last().unwrap_or(id)
    }

    fn is_aliased(&self, deps: &ConditionDeps, at: NodeId) -> bool {
        let ast = self.context.ast;
        let root = Self::root_of(ast, at);
        deps.vars
            .iter()
            .any(|var| heuristics::is_aliased(ast, *var, root))
    }

    fn is_non_const_call(ast: &Ast, id: NodeId) -> bool {
        match ast.node(id).call() {
            Some(info) => !info.is_const && !heuristics::is_unevaluated_call(ast, id),
            None => false,
        }
    }

    /// `'if'` or `'return'`, the statement a condition belongs to
    fn statement_name(ast: &Ast, cond: NodeId) -> &'static str {
        match ast.parent(cond).and_then(|p| ast.node(p).keyword()) {
            Some(Keyword::Return) => "return",
            _ => "if",
        }
    }

    fn is_exit(ast: &Ast, stmt: NodeId) -> bool {
        matches!(
            ast.node(stmt).keyword(),
            Some(Keyword::Return) | Some(Keyword::Throw) | Some(Keyword::Continue) | Some(Keyword::Break)
        )
    }

    /// The body leaves the enclosing block through a top-level jump
    fn exits(ast: &Ast, body: NodeId) -> bool {
        ast.statements(body).into_iter().any(|stmt| Self::is_exit(ast, stmt))
    }
}

/// Duplicate consecutive `if`
impl<'ast, 'b> ConditionComparator<'ast, 'b> {
    pub fn check_duplicate_condition(&mut self) {
        if !self.context.analysis_options.enable_style {
            return;
        }
        info!("====== Duplicate Condition Checker starts ======");
        let ast = self.context.ast;
        for if_stmt in self.statements_of(|ast, id| ast.is_if(id)) {
            let cond1 = match ast.condition(if_stmt) {
                Some(cond) => cond,
                None => continue,
            };
            if ast.has_known_int(cond1) || ast.else_branch(if_stmt).is_some() {
                continue;
            }
            // An exiting body is the early exit case, reported as a warning
            if ast.body(if_stmt).map_or(false, |body| Self::exits(ast, body)) {
                continue;
            }
            let next = match ast.next_statement(if_stmt) {
                Some(next) if ast.is_if(next) => next,
                _ => continue,
            };
            let cond2 = match ast.condition(next) {
                Some(cond) => cond,
                None => continue,
            };
            if !self.changed_until(cond1, cond2) && self.context.same(cond1, cond2) {
                self.duplicate_condition_error(cond1, cond2);
            }
        }
        info!("====== Duplicate Condition Checker ends ======");
    }

    fn duplicate_condition_error(&mut self, cond1: NodeId, cond2: NodeId) {
        let d1 = self.context.diag(cond1);
        let d2 = self.context.diag(cond2);
        if d1 && d2 {
            return;
        }
        let ast = self.context.ast;
        let diagnostic = Diagnostic::new(
            "duplicateCondition",
            Severity::Style,
            "The if condition is the same as the previous if condition".to_owned(),
            CWE398,
            DiagnosticCause::Comparison,
        )
        .at(ast, cond1, "First condition")
        .at(ast, cond2, "Second condition");
        self.context.report(diagnostic);
    }
}

/// `else if` chains
impl<'ast, 'b> ConditionComparator<'ast, 'b> {
    pub fn check_else_if_chains(&mut self) {
        if !self.context.analysis_options.enable_style {
            return;
        }
        info!("====== Else If Chain Checker starts ======");
        let ast = self.context.ast;
        for if_stmt in self.statements_of(|ast, id| ast.is_if(id)) {
            let cond1 = match ast.condition(if_stmt) {
                Some(cond) => cond,
                None => continue,
            };
            if ast.has_known_int(cond1) || self.context.already_reported(cond1) {
                continue;
            }
            let mut current = if_stmt;
            while let Some(next) = Self::else_if(ast, current) {
                current = next;
                let cond2 = match ast.condition(next) {
                    Some(cond) => cond,
                    None => continue,
                };
                if self.context.mutation.changed_between(ast, cond1, cond1, cond2) {
                    break;
                }
                if self.is_overlapping(cond1, cond2) {
                    self.overlapping_else_if_error(cond1, cond2);
                } else if self.context.opposite(cond1, cond2) {
                    self.opposite_else_if_error(cond1, cond2);
                }
            }
        }
        info!("====== Else If Chain Checker ends ======");
    }

    /// Whenever `cond2` is true, `cond1` is true too
    fn is_overlapping(&self, cond1: NodeId, cond2: NodeId) -> bool {
        if self.context.same(cond1, cond2) {
            return true;
        }
        let ast = self.context.ast;
        if !ast.is_binary(cond1, BinaryOp::BitAnd) {
            return false;
        }
        let split = |id: NodeId| -> Option<(NodeId, i64)> {
            let (lhs, rhs) = ast.binary_operands(id)?;
            let number = |n: NodeId| match ast.node(n).literal() {
                Some(Literal::Int { value, .. }) if *value >= 0 => Some(*value),
                _ => None,
            };
            match (number(lhs), number(rhs)) {
                (_, Some(value)) => Some((lhs, value)),
                (Some(value), None) => Some((rhs, value)),
                _ => None,
            }
        };
        let (expr1, value1) = match split(cond1) {
            Some(split) => split,
            None => return false,
        };
        let op2 = match ast.node(cond2).binary_op() {
            Some(op @ BinaryOp::BitAnd) | Some(op @ BinaryOp::Eq) => op,
            _ => return false,
        };
        let (expr2, value2) = match split(cond2) {
            Some(split) => split,
            None => return false,
        };
        if !self.context.same(expr1, expr2) {
            return false;
        }
        if op2 == BinaryOp::BitAnd {
            value1 & value2 == value2
        } else {
            value1 & value2 > 0
        }
    }

    fn overlapping_else_if_error(&mut self, cond1: NodeId, cond2: NodeId) {
        if self.context.diag(cond2) {
            return;
        }
        let ast = self.context.ast;
        let diagnostic = Diagnostic::new(
            "multiCondition",
            Severity::Style,
            format!(
                "Expression is always false because 'else if' condition matches previous condition at line {}.",
                ast.node(cond1).loc.line
            ),
            CWE398,
            DiagnosticCause::Comparison,
        )
        .at(ast, cond2, "");
        self.context.report(diagnostic);
    }

    fn opposite_else_if_error(&mut self, cond1: NodeId, cond2: NodeId) {
        let d1 = self.context.diag(cond1);
        let d2 = self.context.diag(cond2);
        if d1 && d2 {
            return;
        }
        let ast = self.context.ast;
        let diagnostic = Diagnostic::new(
            "multiCondition",
            Severity::Style,
            format!(
                "Expression is always true because 'else if' condition is opposite to previous condition at line {}.",
                ast.node(cond1).loc.line
            ),
            CWE398,
            DiagnosticCause::Comparison,
        )
        .at(ast, cond1, "first condition")
        .at(ast, cond2, "else if condition is opposite to first condition");
        self.context.report(diagnostic);
    }
}

/// Nested conditions and conditions after an early exit
impl<'ast, 'b> ConditionComparator<'ast, 'b> {
    pub fn check_nested_conditions(&mut self) {
        if !self.context.analysis_options.enable_warning {
            return;
        }
        info!("====== Nested Condition Checker starts ======");
        let ast = self.context.ast;
        let statements = self.statements_of(|ast, id| {
            matches!(
                ast.node(id).keyword(),
                Some(Keyword::If { .. }) | Some(Keyword::While) | Some(Keyword::For)
            )
        });
        for stmt in statements {
            let (cond1, body) = match (ast.condition(stmt), ast.body(stmt)) {
                (Some(cond), Some(body)) => (cond, body),
                _ => continue,
            };
            let deps = match Self::condition_deps(ast, cond1) {
                Some(deps) => deps,
                None => continue,
            };
            debug!("Comparing inner conditions with {}", ast.expr_string(cond1));

            let inner_start = ast.position(body) + if ast.node(body).is_block() { 1 } else { 0 };
            let inner = inner_start..ast.subtree_range(body).end;
            self.scan(ScanKind::Inner, cond1, &deps, inner, ast.scope_of(body));

            if ast.is_if(stmt) && Self::starts_with_exit(ast, body) {
                if let Some(block) = ast.parent(stmt).filter(|p| ast.node(*p).is_block()) {
                    let after = ast.subtree_range(body).end..ast.subtree_range(block).end;
                    self.scan(ScanKind::AfterEarlyExit, cond1, &deps, after, ast.scope_of(stmt));
                }
            }
        }
        info!("====== Nested Condition Checker ends ======");
    }

    /// Returns `None` when the condition calls a function that may change state
    fn condition_deps(ast: &Ast, cond: NodeId) -> Option<ConditionDeps> {
        let mut deps = ConditionDeps {
            vars: ast.variables_in(cond),
            nonlocal: false,
            function_call: false,
        };
        for n in ast.descendants(cond) {
            let node = ast.node(n);
            match &node.kind {
                NodeKind::Call(_) => {
                    if Self::is_non_const_call(ast, n) {
                        return None;
                    }
                    deps.function_call = true;
                }
                NodeKind::Identifier {
                    enumerator: None, ..
                } => match node.variable {
                    Some(var) => {
                        // Pointees and referents may be shared with anything
                        let flags = ast.variable(var).flags;
                        if !(flags.is_local || flags.is_argument) || flags.is_pointer || flags.is_reference {
                            deps.nonlocal = true;
                        }
                    }
                    None => deps.nonlocal = true,
                },
                _ => {}
            }
        }
        Some(deps)
    }

    fn starts_with_exit(ast: &Ast, body: NodeId) -> bool {
        ast.statements(body)
            .first()
            .map_or(false, |first| Self::is_exit(ast, *first))
    }

    /// Assignments and increments of variables that are not local to the function
    fn changes_nonlocal(ast: &Ast, at: NodeId) -> bool {
        let node = ast.node(at);
        let target = match &node.kind {
            NodeKind::Binary(op) if op.is_assignment() => node.operands.first(),
            NodeKind::Unary(op) if op.is_increment() => node.operands.first(),
            _ => None,
        };
        let target = match target {
            Some(target) => *target,
            None => return false,
        };
        ast.variables_in(target)
            .iter()
            .any(|var| !ast.variable(*var).is_local_storage())
    }

    fn scan(&mut self, kind: ScanKind, cond1: NodeId, deps: &ConditionDeps, range: Range<usize>, scope: ScopeId) {
        let ast = self.context.ast;
        for position in range {
            let tok = ast.at_position(position);
            if self.context.mutation.changed_at(ast, cond1, tok) {
                debug!("{} changes at {}", ast.expr_string(cond1), ast.node(tok).loc);
                break;
            }
            let keyword = ast.node(tok).keyword();

            let cond2 = match keyword {
                Some(Keyword::If { .. }) => ast.condition(tok),
                Some(Keyword::Return) => ast.operand(tok, 0),
                _ => None,
            };
            if let Some(cond2) = cond2 {
                if self.context.mutation.changed_within(ast, cond1, cond2) {
                    break;
                }
                match kind {
                    ScanKind::Inner => {
                        let is_return_var = keyword == Some(&Keyword::Return)
                            && !ast
                                .node(cond2)
                                .binary_op()
                                .map_or(false, |op| !op.is_assignment() && op != BinaryOp::Comma);
                        if !is_return_var {
                            self.compare_inner(cond1, cond1, cond2, deps);
                        }
                    }
                    ScanKind::AfterEarlyExit => {
                        if self.compare_after_exit(cond1, cond2, deps) {
                            break;
                        }
                    }
                }
            }

            if deps.nonlocal && Self::is_non_const_call(ast, tok) {
                break;
            }
            if deps.function_call && Self::changes_nonlocal(ast, tok) {
                break;
            }
            match keyword {
                Some(Keyword::Case) | Some(Keyword::Break) | Some(Keyword::Continue)
                | Some(Keyword::Return) | Some(Keyword::Throw)
                    if ast.scope_of(tok) == scope =>
                {
                    break
                }
                Some(Keyword::Label(_)) => break,
                Some(kw) if kw.is_loop() => {
                    let changed = deps.vars.iter().any(|var| {
                        ast.descendants(tok)
                            .any(|n| self.context.mutation.variable_changed_at(ast, *var, n))
                    });
                    if changed {
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    fn compare_inner(&mut self, cond1: NodeId, first: NodeId, cond2: NodeId, deps: &ConditionDeps) {
        let ast = self.context.ast;
        // Each operand of `a && b` holds in the body, the report goes to the operand
        if ast.is_binary(first, BinaryOp::LogicalAnd) {
            for operand in ast.operands(first).to_vec() {
                self.compare_inner(cond1, operand, cond2, deps);
            }
            return;
        }
        if ast.has_known_int(first) {
            return;
        }
        if self.context.mutually_exclusive(first, cond2) {
            if !self.is_aliased(deps, cond1) {
                self.inner_condition_error(first, cond2, true);
            }
        } else if self.context.same(first, cond2) {
            self.inner_condition_error(first, cond2, false);
        }
    }

    /// Returns true once a report was made
    fn compare_after_exit(&mut self, cond1: NodeId, second: NodeId, deps: &ConditionDeps) -> bool {
        let ast = self.context.ast;
        if ast.node(second).is_logical() {
            for operand in ast.operands(second).to_vec() {
                if self.compare_after_exit(cond1, operand, deps) {
                    return true;
                }
            }
            return false;
        }
        if ast.has_known_int(cond1) && ast.has_known_int(second) {
            return false;
        }
        if !self.context.same(cond1, second) || self.is_aliased(deps, cond1) {
            return false;
        }
        let ifdef = heuristics::ifdef_in_subtree(ast, cond1)
            || heuristics::ifdef_in_subtree(ast, second)
            || ast
                .nodes_between(cond1, second)
                .iter()
                .any(|n| ast.node(*n).flags.ifdef_span);
        if ifdef {
            return false;
        }
        self.early_exit_error(cond1, second);
        true
    }

    fn inner_condition_error(&mut self, cond1: NodeId, cond2: NodeId, opposite: bool) {
        let d1 = self.context.diag(cond1);
        let d2 = self.context.diag(cond2);
        if d1 && d2 {
            return;
        }
        let ast = self.context.ast;
        let s1 = ast.expr_string(cond1);
        let s2 = ast.expr_string(cond2);
        let statement = Self::statement_name(ast, cond2);
        let (id, message, explanation) = if opposite {
            (
                "oppositeInnerCondition",
                format!("Opposite inner '{}' condition leads to a dead code block.", statement),
                format!("opposite inner condition: {}", s2),
            )
        } else {
            (
                "identicalInnerCondition",
                format!("Identical inner '{}' condition is always true.", statement),
                format!("identical inner condition: {}", s2),
            )
        };
        let diagnostic = Diagnostic::new(id, Severity::Warning, message, CWE398, DiagnosticCause::Comparison)
            .at(ast, cond1, &format!("outer condition: {}", s1))
            .at(ast, cond2, &explanation);
        self.context.report(diagnostic);
    }

    fn early_exit_error(&mut self, cond1: NodeId, cond2: NodeId) {
        let d1 = self.context.diag(cond1);
        let d2 = self.context.diag(cond2);
        if d1 && d2 {
            return;
        }
        let ast = self.context.ast;
        let is_return_value = ast
            .parent(cond2)
            .map_or(false, |p| ast.node(p).keyword() == Some(&Keyword::Return));
        let cond = ast.expr_string(cond1);
        let value = if ast.is_bool_typed(cond2) { "false" } else { "0" };
        let (message, explanation) = if is_return_value {
            (
                format!(
                    "Identical condition and return expression '{}', return value is always {}",
                    cond, value
                ),
                format!("Returning identical expression '{}'", cond),
            )
        } else {
            (
                format!("Identical condition '{}', second condition is always false", cond),
                format!("Testing identical condition '{}'", cond),
            )
        };
        let diagnostic = Diagnostic::new(
            "identicalConditionAfterEarlyExit",
            Severity::Warning,
            message,
            CWE398,
            DiagnosticCause::Comparison,
        )
        .at(
            ast,
            cond1,
            &format!("If condition '{}' is true, the function will return/exit", cond),
        )
        .at(ast, cond2, &explanation);
        self.context.report(diagnostic);
    }
}
