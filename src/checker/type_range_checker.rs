use crate::analysis::ast::node::{BinaryOp, NodeId};
use crate::analysis::ast::tree::Ast;
use crate::analysis::diagnostics::{Diagnostic, DiagnosticCause, Severity, CWE398};
use crate::analysis::global_context::GlobalContext;
use crate::analysis::numerical::relation::RelOp;
use crate::checker::checker_trait::{scan_roots, CheckerTrait};

/// Comparisons whose result is fixed by the range of a type: a value outside the range
/// of the compared expression's type, or a modulo result compared with its divisor.
pub struct TypeRangeChecker<'ast, 'b> {
    context: &'b mut GlobalContext<'ast>,
}

impl<'ast, 'b> CheckerTrait<'ast, 'b> for TypeRangeChecker<'ast, 'b> {
    fn new(context: &'b mut GlobalContext<'ast>) -> Self {
        Self { context }
    }

    fn run(&mut self) {
        self.check_modulo();
        self.check_type_range();
    }
}

/// The truth of `value cmp e` (`value_on_left`) or `e cmp value` when `value` is
/// outside `[min, max]` or on one of its bounds
pub fn out_of_range_result(cmp: RelOp, value: i128, value_on_left: bool, min: i128, max: i128) -> Option<bool> {
    // Normalize to `e cmp value`
    let cmp = if value_on_left { cmp.swap() } else { cmp };
    if value < min || value > max {
        return Some(match cmp {
            RelOp::Eq => false,
            RelOp::Ne => true,
            RelOp::Lt | RelOp::Le => value > max,
            RelOp::Gt | RelOp::Ge => value < min,
        });
    }
    match cmp {
        RelOp::Ge if value == min => Some(true),
        RelOp::Lt if value == min => Some(false),
        RelOp::Le if value == max => Some(true),
        RelOp::Gt if value == max => Some(false),
        _ => None,
    }
}

/// Value-range comparisons
impl<'ast, 'b> TypeRangeChecker<'ast, 'b> {
    pub fn check_type_range(&mut self) {
        let platform = &self.context.analysis_options.platform;
        if !platform.has_known_type_ranges() || !self.context.analysis_options.enable_style {
            return;
        }
        info!("====== Type Range Checker starts ======");
        let ast = self.context.ast;
        for root in scan_roots(ast) {
            if self.context.should_stop() {
                break;
            }
            for id in ast.descendants(root) {
                self.check_type_range_at(id);
            }
        }
        info!("====== Type Range Checker ends ======");
    }

    fn check_type_range_at(&mut self, id: NodeId) {
        let ast = self.context.ast;
        let cmp = match ast.node(id).binary_op().and_then(RelOp::from_binary) {
            Some(cmp) => cmp,
            None => return,
        };
        let (lhs, rhs) = match ast.binary_operands(id) {
            Some(operands) => operands,
            None => return,
        };
        for (value_node, typed, value_on_left) in [(lhs, rhs, true), (rhs, lhs, false)].iter().copied() {
            let value = match ast.known_int(value_node) {
                Some(value) => i128::from(value),
                None => continue,
            };
            let value_type = match ast.value_type(typed) {
                Some(vt) if !vt.is_pointer() => vt,
                _ => continue,
            };
            let literal_type = ast.value_type(value_node);
            if value < 0 && literal_type.map_or(false, |vt| !vt.is_signed_integer()) {
                continue;
            }
            if literal_type.map_or(false, |vt| vt.is_type_equal(value_type)) {
                continue;
            }
            let (min, max) = match value_type.range(&self.context.analysis_options.platform) {
                Some(range) => range,
                None => continue,
            };
            if let Some(result) = out_of_range_result(cmp, value, value_on_left, min, max) {
                debug!(
                    "{} compares {} against [{}, {}]",
                    ast.expr_string(id),
                    value,
                    min,
                    max
                );
                self.compare_value_out_of_type_range_error(value_node, &value_type.to_string(), value, result);
            }
        }
    }

    fn compare_value_out_of_type_range_error(&mut self, value_node: NodeId, type_name: &str, value: i128, result: bool) {
        if self.context.diag(value_node) {
            return;
        }
        let ast = self.context.ast;
        let diagnostic = Diagnostic::new(
            "compareValueOutOfTypeRangeError",
            Severity::Style,
            format!(
                "Comparing expression of type '{}' against value {}. Condition is always {}.",
                type_name, value, result
            ),
            CWE398,
            DiagnosticCause::TypeRange,
        )
        .at(ast, value_node, "");
        self.context.report(diagnostic);
    }
}

/// Modulo comparisons
impl<'ast, 'b> TypeRangeChecker<'ast, 'b> {
    pub fn check_modulo(&mut self) {
        if !self.context.analysis_options.enable_warning {
            return;
        }
        info!("====== Modulo Comparison Checker starts ======");
        let ast = self.context.ast;
        for root in scan_roots(ast) {
            if self.context.should_stop() {
                break;
            }
            for id in ast.descendants(root) {
                if let Some(divisor) = Self::predetermined_modulo(ast, id) {
                    self.modulo_always_true_false_error(id, divisor);
                }
            }
        }
        info!("====== Modulo Comparison Checker ends ======");
    }

    /// The divisor of `(x % N) cmp M` or `M cmp (x % N)` when `N <= M`
    fn predetermined_modulo(ast: &Ast, id: NodeId) -> Option<NodeId> {
        if !ast.node(id).is_comparison() {
            return None;
        }
        let (lhs, rhs) = ast.binary_operands(id)?;
        let (modulo, num) = if ast.is_binary(lhs, BinaryOp::Rem) && ast.node(rhs).is_number() {
            (lhs, rhs)
        } else if ast.node(lhs).is_number() && ast.is_binary(rhs, BinaryOp::Rem) {
            (rhs, lhs)
        } else {
            return None;
        };
        let divisor = ast.operand(modulo, 1)?;
        let n = ast.literal_int(divisor)?;
        let m = ast.literal_int(num)?;
        if n <= m {
            Some(divisor)
        } else {
            None
        }
    }

    fn modulo_always_true_false_error(&mut self, id: NodeId, divisor: NodeId) {
        if self.context.diag(id) {
            return;
        }
        let ast = self.context.ast;
        let diagnostic = Diagnostic::new(
            "moduloAlwaysTrueFalse",
            Severity::Warning,
            format!(
                "Comparison of modulo result is predetermined, because it is always less than {}.",
                ast.expr_string(divisor)
            ),
            CWE398,
            DiagnosticCause::TypeRange,
        )
        .at(ast, id, "");
        self.context.report(diagnostic);
    }
}
