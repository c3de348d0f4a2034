use crate::analysis::ast::node::{BinaryOp, NodeId, NodeKind, ParamKind, UnaryOp, VarId};
use crate::analysis::ast::tree::Ast;
use crate::analysis::heuristics;

/// Answers whether the value of an expression could change at a program point.
/// Implementations must be conservative: when in doubt, report a change.
pub trait MutationOracle {
    /// Could evaluating node `at` (not its operands) change the value of `expr`?
    fn changed_at(&self, ast: &Ast, expr: NodeId, at: NodeId) -> bool;

    /// Could evaluating node `at` change the variable `var`?
    fn variable_changed_at(&self, ast: &Ast, var: VarId, at: NodeId) -> bool;

    /// Could `expr` change between the end of `from` and the start of `to`?
    fn changed_between(&self, ast: &Ast, expr: NodeId, from: NodeId, to: NodeId) -> bool {
        ast.nodes_between(from, to)
            .iter()
            .any(|at| self.changed_at(ast, expr, *at))
    }

    /// Could `expr` change anywhere inside `subtree`?
    fn changed_within(&self, ast: &Ast, expr: NodeId, subtree: NodeId) -> bool {
        ast.descendants(subtree)
            .any(|at| self.changed_at(ast, expr, at))
    }
}

/// Decides from the shape of the tree alone
#[derive(Clone, Copy, Debug, Default)]
pub struct SyntacticMutationOracle;

impl SyntacticMutationOracle {
    /// The variable whose storage an lvalue designates: `v`, `v.m`, `v[i]`, `(T)v`
    fn lvalue_root(ast: &Ast, mut id: NodeId) -> Option<VarId> {
        loop {
            let node = ast.node(id);
            match &node.kind {
                NodeKind::Identifier { .. } => return node.variable,
                NodeKind::Member { arrow: false, .. } | NodeKind::Subscript | NodeKind::Cast => {
                    id = *node.operands.first()?;
                }
                _ => return None,
            }
        }
    }

    /// Writes through a pointer or reference that may alias anything
    fn is_indirect_store(ast: &Ast, lvalue: NodeId) -> bool {
        let node = ast.node(lvalue);
        match &node.kind {
            NodeKind::Unary(UnaryOp::Deref) | NodeKind::Member { arrow: true, .. } => true,
            NodeKind::Subscript => node.operands.first().map_or(true, |array| {
                ast.value_type(*array).map_or(true, |vt| vt.is_pointer())
            }),
            NodeKind::Member { .. } | NodeKind::Cast => node
                .operands
                .first()
                .map_or(false, |inner| Self::is_indirect_store(ast, *inner)),
            _ => false,
        }
    }

    fn refers_to(ast: &Ast, id: NodeId, var: VarId) -> bool {
        Self::lvalue_root(ast, id) == Some(var)
    }

    /// `var` or `&var` passed to a parameter that can modify it
    fn passed_by_modifiable_reference(ast: &Ast, call: NodeId, var: VarId) -> bool {
        let node = ast.node(call);
        let info = match node.call() {
            Some(info) => info,
            None => return false,
        };
        if heuristics::is_unevaluated_call(ast, call) {
            return false;
        }
        let args = if info.method {
            node.operands.get(1..).unwrap_or(&[])
        } else {
            &node.operands[..]
        };
        args.iter().enumerate().any(|(index, arg)| {
            let by_address = ast.is_unary(*arg, UnaryOp::AddressOf)
                && ast
                    .operand(*arg, 0)
                    .map_or(false, |inner| Self::refers_to(ast, inner, var));
            let direct = Self::refers_to(ast, *arg, var);
            if !by_address && !direct {
                return false;
            }
            let param = info.params.as_ref().and_then(|params| params.get(index));
            match param {
                None => true,
                Some(ParamKind::Value) | Some(ParamKind::ConstReference) => by_address,
                Some(ParamKind::ConstPointer) => false,
                Some(ParamKind::Reference) | Some(ParamKind::Pointer) => true,
            }
        })
    }
}

impl MutationOracle for SyntacticMutationOracle {
    fn variable_changed_at(&self, ast: &Ast, var: VarId, at: NodeId) -> bool {
        let node = ast.node(at);
        let variable = ast.variable(var);
        match &node.kind {
            NodeKind::Binary(op) if op.is_assignment() => {
                let lhs = node.operands[0];
                Self::refers_to(ast, lhs, var)
                    || (!variable.is_local_storage() && Self::is_indirect_store(ast, lhs))
            }
            NodeKind::Binary(BinaryOp::Shr) => heuristics::stream_read_target(ast, at)
                .map_or(false, |target| Self::refers_to(ast, target, var)),
            NodeKind::Unary(op) if op.is_increment() => node
                .operands
                .first()
                .map_or(false, |operand| Self::refers_to(ast, *operand, var)),
            NodeKind::Unary(UnaryOp::AddressOf) => {
                // Taking the address outside of a call argument lets later stores alias it
                let operand_is_var = node
                    .operands
                    .first()
                    .map_or(false, |operand| Self::refers_to(ast, *operand, var));
                operand_is_var
                    && !ast
                        .parent(at)
                        .map_or(false, |parent| ast.node(parent).call().is_some())
            }
            NodeKind::Call(info) => {
                if heuristics::is_unevaluated_call(ast, at) {
                    return false;
                }
                if info.method && !info.is_const {
                    if let Some(object) = node.operands.first() {
                        if Self::refers_to(ast, *object, var) {
                            return true;
                        }
                    }
                }
                if Self::passed_by_modifiable_reference(ast, at, var) {
                    return true;
                }
                !info.is_const && !variable.is_local_storage()
            }
            _ => false,
        }
    }

    fn changed_at(&self, ast: &Ast, expr: NodeId, at: NodeId) -> bool {
        let vars = ast.variables_in(expr);
        if vars.iter().any(|var| self.variable_changed_at(ast, *var, at)) {
            return true;
        }
        // Expressions reading memory through pointers can change by any store or call
        let reads_memory = ast.descendants(expr).any(|n| {
            let node = ast.node(n);
            matches!(
                node.kind,
                NodeKind::Unary(UnaryOp::Deref) | NodeKind::Member { arrow: true, .. }
            ) || (node.kind == NodeKind::Subscript && Self::is_indirect_store(ast, n))
                || matches!(&node.kind, NodeKind::Call(info) if !info.is_const)
        });
        if !reads_memory {
            return false;
        }
        let node = ast.node(at);
        match &node.kind {
            NodeKind::Binary(op) if op.is_assignment() => Self::is_indirect_store(ast, node.operands[0]),
            NodeKind::Call(info) => !info.is_const && !heuristics::is_unevaluated_call(ast, at),
            _ => false,
        }
    }
}
