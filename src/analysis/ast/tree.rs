use super::node::{
    BinaryOp, FunctionId, Keyword, Literal, Node, NodeId, NodeKind, ScopeId, UnaryOp, VarId,
};
use super::scope::{FunctionInfo, Scope, Variable};
use super::value_fact::{FactPayload, ValueFact};
use super::value_type::ValueType;
use itertools::Itertools;
use std::ops::Range;

/// The expression tree of one translation unit.
///
/// Nodes live in an arena and refer to each other by `NodeId`. The tree is built once
/// through `AstBuilder` and is read-only afterwards. Besides parent links, `finish()`
/// computes the source-order (preorder) position of every node, so that "between two
/// program points" and "inside this subtree" are plain position ranges.
#[derive(Debug)]
pub struct Ast {
    pub(super) nodes: Vec<Node>,
    pub(super) variables: Vec<Variable>,
    pub(super) functions: Vec<FunctionInfo>,
    pub(super) scopes: Vec<Scope>,
    pub(super) node_scope: Vec<ScopeId>,
    pub(super) order: Vec<NodeId>,
    pub(super) position: Vec<usize>,
    pub(super) subtree_end: Vec<usize>,
}

pub struct Ancestors<'ast> {
    ast: &'ast Ast,
    current: Option<NodeId>,
}

impl<'ast> Iterator for Ancestors<'ast> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let next = self.current.and_then(|id| self.ast.parent(id));
        self.current = next;
        next
    }
}

/// Navigation
impl Ast {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn operands(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].operands
    }

    pub fn operand(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id.0].operands.get(index).copied()
    }

    /// Both operands of a binary operator node
    pub fn binary_operands(&self, id: NodeId) -> Option<(NodeId, NodeId)> {
        match (&self.node(id).kind, self.operands(id)) {
            (NodeKind::Binary(_), [lhs, rhs]) => Some((*lhs, *rhs)),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Strict ancestors, innermost first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            ast: self,
            current: Some(id),
        }
    }

    /// All nodes of the tree in source order
    pub fn preorder(&self) -> &[NodeId] {
        &self.order
    }

    pub fn position(&self, id: NodeId) -> usize {
        self.position[id.0]
    }

    pub fn at_position(&self, position: usize) -> NodeId {
        self.order[position]
    }

    /// Positions covered by the subtree rooted at `id`, `id` included
    pub fn subtree_range(&self, id: NodeId) -> Range<usize> {
        self.position(id)..self.subtree_end[id.0]
    }

    /// The subtree rooted at `id` in source order, `id` first
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.order[self.subtree_range(id)].iter().copied()
    }

    /// Returns true if `node` is `ancestor` or lies below it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.subtree_range(ancestor).contains(&self.position(node))
    }

    /// Nodes strictly after the subtree of `from` and strictly before `to`
    pub fn nodes_between(&self, from: NodeId, to: NodeId) -> &[NodeId] {
        let start = self.subtree_end[from.0];
        let end = self.position(to);
        if start < end {
            &self.order[start..end]
        } else {
            &[]
        }
    }
}

/// Symbols and scopes
impl Ast {
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn var_of(&self, id: NodeId) -> Option<VarId> {
        self.node(id).variable
    }

    /// Variables referenced anywhere in the subtree of `id`
    pub fn variables_in(&self, id: NodeId) -> Vec<VarId> {
        self.descendants(id)
            .filter_map(|n| self.var_of(n))
            .unique()
            .collect()
    }

    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &FunctionInfo)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FunctionId(i), f))
    }

    pub fn function(&self, id: FunctionId) -> &FunctionInfo {
        &self.functions[id.0]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Innermost scope containing the node
    pub fn scope_of(&self, id: NodeId) -> ScopeId {
        self.node_scope[id.0]
    }

    pub fn function_of(&self, id: NodeId) -> Option<FunctionId> {
        self.scope(self.scope_of(id)).function
    }
}

/// Statements
impl Ast {
    /// The controlling expression of `if`, `while`, `do`, `for` and `switch`
    pub fn condition(&self, stmt: NodeId) -> Option<NodeId> {
        let index = match self.node(stmt).keyword()? {
            Keyword::If { .. } | Keyword::While | Keyword::Switch => 0,
            Keyword::DoWhile | Keyword::For => 1,
            _ => return None,
        };
        self.operand(stmt, index)
            .filter(|c| self.node(*c).kind != NodeKind::Empty)
    }

    pub fn body(&self, stmt: NodeId) -> Option<NodeId> {
        let index = match self.node(stmt).keyword()? {
            Keyword::If { .. } | Keyword::While | Keyword::Switch => 1,
            Keyword::DoWhile | Keyword::Catch => 0,
            Keyword::For => 3,
            _ => return None,
        };
        self.operand(stmt, index)
    }

    pub fn else_branch(&self, if_stmt: NodeId) -> Option<NodeId> {
        match self.node(if_stmt).keyword()? {
            Keyword::If { .. } => self.operand(if_stmt, 2),
            _ => None,
        }
    }

    pub fn is_if(&self, id: NodeId) -> bool {
        matches!(self.node(id).keyword(), Some(Keyword::If { .. }))
    }

    /// Statements of a block, or the node itself for a single statement body
    pub fn statements(&self, body: NodeId) -> Vec<NodeId> {
        if self.node(body).is_block() {
            self.operands(body).to_vec()
        } else {
            vec![body]
        }
    }

    /// The statement following `stmt` in its block
    pub fn next_statement(&self, stmt: NodeId) -> Option<NodeId> {
        let parent = self.parent(stmt)?;
        if !self.node(parent).is_block() {
            return None;
        }
        let siblings = self.operands(parent);
        let index = siblings.iter().position(|s| *s == stmt)?;
        siblings.get(index + 1).copied()
    }
}

/// Values
impl Ast {
    pub fn value_type(&self, id: NodeId) -> Option<&ValueType> {
        self.node(id).value_type.as_ref()
    }

    pub fn facts(&self, id: NodeId) -> &[ValueFact] {
        &self.node(id).facts
    }

    /// The Known integer fact attached by value flow, if any
    pub fn known_int_fact(&self, id: NodeId) -> Option<&ValueFact> {
        self.facts(id)
            .iter()
            .find(|fact| fact.known_int_value().is_some())
    }

    /// The known integer value of a node: a Known fact, an integer literal or an enumerator
    pub fn known_int(&self, id: NodeId) -> Option<i64> {
        if let Some(v) = self.known_int_fact(id).and_then(ValueFact::known_int_value) {
            return Some(v);
        }
        match &self.node(id).kind {
            NodeKind::Literal(lit) => lit.int_value(),
            NodeKind::Identifier {
                enumerator: Some(v),
                ..
            } => Some(*v),
            _ => None,
        }
    }

    pub fn has_known_int(&self, id: NodeId) -> bool {
        self.known_int(id).is_some()
    }

    pub fn has_bailout(&self, id: NodeId) -> bool {
        self.facts(id)
            .iter()
            .any(|fact| fact.payload == FactPayload::Bailout)
    }

    /// Integer value of a numeric literal, ignoring value-flow facts
    pub fn literal_int(&self, id: NodeId) -> Option<i64> {
        match self.node(id).literal()? {
            Literal::Int { value, .. } | Literal::Char { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn is_bool_typed(&self, id: NodeId) -> bool {
        self.value_type(id).map_or(false, ValueType::is_bool)
    }
}

const PREC_TERNARY: u8 = 3;
const PREC_PREFIX: u8 = 14;
const PREC_POSTFIX: u8 = 15;
const PREC_PRIMARY: u8 = 16;

/// Rendering
impl Ast {
    fn precedence(&self, id: NodeId) -> u8 {
        match &self.node(id).kind {
            NodeKind::Binary(op) => op.precedence(),
            NodeKind::Unary(op) if op.is_postfix() => PREC_POSTFIX,
            NodeKind::Unary(_) | NodeKind::Cast => PREC_PREFIX,
            NodeKind::Call(_) | NodeKind::Member { .. } | NodeKind::Subscript => PREC_POSTFIX,
            NodeKind::Ternary => PREC_TERNARY,
            _ => PREC_PRIMARY,
        }
    }

    fn write_operand(&self, id: NodeId, min_precedence: u8, out: &mut String) {
        if self.precedence(id) < min_precedence {
            out.push('(');
            self.write_expr(id, out);
            out.push(')');
        } else {
            self.write_expr(id, out);
        }
    }

    fn write_expr(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        let ops = &node.operands;
        match &node.kind {
            NodeKind::Literal(lit) => out.push_str(&lit.text()),
            NodeKind::Identifier { name, .. } => out.push_str(name),
            NodeKind::Unary(op) => {
                if let Some(operand) = ops.first() {
                    if op.is_postfix() {
                        self.write_operand(*operand, PREC_POSTFIX, out);
                        out.push_str(op.symbol());
                    } else {
                        out.push_str(op.symbol());
                        self.write_operand(*operand, PREC_PREFIX, out);
                    }
                }
            }
            NodeKind::Binary(op) => {
                if let [lhs, rhs] = ops.as_slice() {
                    let p = op.precedence();
                    let (lhs_min, rhs_min) = if op.is_assignment() {
                        (p + 1, p)
                    } else {
                        (p, p + 1)
                    };
                    self.write_operand(*lhs, lhs_min, out);
                    if *op == BinaryOp::Comma {
                        out.push_str(", ");
                    } else {
                        out.push(' ');
                        out.push_str(op.symbol());
                        out.push(' ');
                    }
                    self.write_operand(*rhs, rhs_min, out);
                }
            }
            NodeKind::Call(info) => {
                let args = if info.method {
                    if let Some(object) = ops.first() {
                        self.write_operand(*object, PREC_POSTFIX, out);
                        let arrow = self.value_type(*object).map_or(false, ValueType::is_pointer);
                        out.push_str(if arrow { "->" } else { "." });
                    }
                    ops.get(1..).unwrap_or(&[])
                } else {
                    &ops[..]
                };
                out.push_str(&info.name);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_operand(*arg, BinaryOp::Assign.precedence(), out);
                }
                out.push(')');
            }
            NodeKind::Member { name, arrow } => {
                if let Some(object) = ops.first() {
                    self.write_operand(*object, PREC_POSTFIX, out);
                }
                out.push_str(if *arrow { "->" } else { "." });
                out.push_str(name);
            }
            NodeKind::Subscript => {
                if let [array, index] = ops.as_slice() {
                    self.write_operand(*array, PREC_POSTFIX, out);
                    out.push('[');
                    self.write_expr(*index, out);
                    out.push(']');
                }
            }
            NodeKind::Cast => {
                out.push('(');
                match &node.value_type {
                    Some(vt) => out.push_str(&vt.to_string()),
                    None => out.push('?'),
                }
                out.push(')');
                if let Some(operand) = ops.first() {
                    self.write_operand(*operand, PREC_PREFIX, out);
                }
            }
            NodeKind::Ternary => {
                if let [cond, then, els] = ops.as_slice() {
                    self.write_operand(*cond, PREC_TERNARY + 1, out);
                    out.push_str(" ? ");
                    self.write_operand(*then, PREC_TERNARY, out);
                    out.push_str(" : ");
                    self.write_operand(*els, PREC_TERNARY, out);
                }
            }
            NodeKind::Keyword(kw) => out.push_str(kw.name()),
            NodeKind::Block => out.push_str("{...}"),
            NodeKind::Empty => {}
        }
    }

    /// Source-like text of an expression, parenthesized where precedence requires it
    pub fn expr_string(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_expr(id, &mut out);
        out
    }
}

/// Helpers used across checkers
impl Ast {
    pub fn is_unary(&self, id: NodeId, op: UnaryOp) -> bool {
        self.node(id).unary_op() == Some(op)
    }

    pub fn is_binary(&self, id: NodeId, op: BinaryOp) -> bool {
        self.node(id).binary_op() == Some(op)
    }

    /// Operands of a chain of the same logical operator, left to right
    pub fn logical_chain(&self, id: NodeId, op: BinaryOp) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.binary_operands(current) {
                Some((lhs, rhs)) if self.is_binary(current, op) => {
                    stack.push(rhs);
                    stack.push(lhs);
                }
                _ => result.push(current),
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::super::builder::AstBuilder;
    use super::super::node::BinaryOp;
    use super::super::scope::ScopeKind;
    use super::super::value_type::ValueType;

    #[test]
    fn test_expr_string_parenthesizes() {
        let mut b = AstBuilder::new("test.c");
        let x = b.local("x", ValueType::int());
        let xr = b.var(x);
        let six = b.int_text(6, "0x6");
        let masked = b.binary(BinaryOp::BitAnd, xr, six);
        let one = b.int_text(1, "0x1");
        let cmp = b.binary(BinaryOp::Eq, masked, one);
        let ast = b.finish();
        assert_eq!(ast.expr_string(cmp), "(x & 0x6) == 0x1");
    }

    #[test]
    fn test_positions_and_scopes() {
        let mut b = AstBuilder::new("test.c");
        let x = b.argument("x", ValueType::int());
        let xr = b.var(x);
        let one = b.int(1);
        let cond = b.binary(BinaryOp::Lt, xr, one);
        let ret = b.return_stmt(None);
        let then = b.block(vec![ret]);
        let if_stmt = b.if_stmt(cond, then, None);
        let body = b.block(vec![if_stmt]);
        b.function("f", vec![x], ValueType::int(), body);
        let ast = b.finish();

        assert_eq!(ast.position(body), 0);
        assert!(ast.position(cond) < ast.position(ret));
        assert!(ast.contains(if_stmt, ret));
        assert!(!ast.contains(then, cond));
        assert_eq!(ast.scope(ast.scope_of(ret)).kind, ScopeKind::If);
        assert_eq!(ast.scope(ast.scope_of(cond)).kind, ScopeKind::Function);
        assert_eq!(ast.function(ast.function_of(ret).unwrap()).name, "f");
        assert_eq!(ast.nodes_between(cond, ret), &[then]);
    }

    #[test]
    fn test_logical_chain() {
        let mut b = AstBuilder::new("test.c");
        let a = b.name("a");
        let c = b.name("c");
        let d = b.name("d");
        let ac = b.binary(BinaryOp::LogicalAnd, a, c);
        let acd = b.binary(BinaryOp::LogicalAnd, ac, d);
        let ast = b.finish();
        assert_eq!(ast.logical_chain(acd, BinaryOp::LogicalAnd), vec![a, c, d]);
        assert_eq!(ast.logical_chain(acd, BinaryOp::LogicalOr), vec![acd]);
    }
}
