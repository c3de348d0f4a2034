use crate::analysis::ast::node::{BinaryOp, Literal, NodeId, NodeKind, UnaryOp};
use crate::analysis::ast::tree::Ast;
use crate::analysis::heuristics;
use crate::analysis::numerical::relation::{parse_comparison, Number, RelOp, Relation};

/// Answers whether two expressions always evaluate to the same value, to opposite
/// truth values, or can never be true together.
pub trait EquivalenceOracle {
    /// `a` and `b` evaluate to the same value, without side effects
    fn same(&self, ast: &Ast, a: NodeId, b: NodeId) -> bool;

    /// Exactly one of `a` and `b` is true, whatever the state
    fn opposite(&self, ast: &Ast, a: NodeId, b: NodeId) -> bool;

    /// `a` and `b` are never true at the same time
    fn mutually_exclusive(&self, ast: &Ast, a: NodeId, b: NodeId) -> bool {
        if self.opposite(ast, a, b) {
            return true;
        }
        for (conj, other) in [(a, b), (b, a)].iter() {
            if ast.is_binary(*conj, BinaryOp::LogicalAnd) {
                let operands = ast.logical_chain(*conj, BinaryOp::LogicalAnd);
                if operands
                    .iter()
                    .any(|operand| self.mutually_exclusive(ast, *operand, *other))
                {
                    return true;
                }
            }
        }
        if let (Some(ca), Some(cb)) = (parse_comparison(ast, a), parse_comparison(ast, b)) {
            if !ca.inconclusive && !cb.inconclusive && self.same(ast, ca.base, cb.base) {
                return ca.effective().disjoint_with(&cb.effective());
            }
        }
        match operand_relations(self, ast, a, b) {
            Some((ra, rb)) => ra.disjoint_with(&rb),
            None => false,
        }
    }
}

/// For two comparisons between the same pair of non-constant operands, the relations
/// they impose on `lhs - rhs` of the first one
fn operand_relations<O: EquivalenceOracle + ?Sized>(
    oracle: &O,
    ast: &Ast,
    a: NodeId,
    b: NodeId,
) -> Option<(Relation, Relation)> {
    let op_a = RelOp::from_binary(ast.node(a).binary_op()?)?;
    let op_b = RelOp::from_binary(ast.node(b).binary_op()?)?;
    let (a1, a2) = ast.binary_operands(a)?;
    let (b1, b2) = ast.binary_operands(b)?;
    if ast.has_known_int(a1) || ast.has_known_int(a2) {
        return None;
    }
    let op_b = if oracle.same(ast, a1, b1) && oracle.same(ast, a2, b2) {
        op_b
    } else if oracle.same(ast, a1, b2) && oracle.same(ast, a2, b1) {
        op_b.swap()
    } else {
        return None;
    };
    let integral = [a1, a2].iter().all(|n| {
        ast.value_type(*n)
            .map_or(false, |vt| vt.is_integral() || vt.is_pointer())
    });
    let zero = if integral {
        Number::Int(0)
    } else {
        Number::Float(0.0)
    };
    Some((Relation::new(op_a, zero), Relation::new(op_b, zero)))
}

/// Structural comparison of expression trees
#[derive(Clone, Copy, Debug, Default)]
pub struct StructuralEquivalence;

impl StructuralEquivalence {
    /// `!!x` is `x` and `p.get()` is `p`
    fn skip_transparent(ast: &Ast, mut id: NodeId) -> NodeId {
        loop {
            let node = ast.node(id);
            if node.is_not() {
                if let Some(inner) = ast.operand(id, 0) {
                    if ast.node(inner).is_not() {
                        if let Some(innermost) = ast.operand(inner, 0) {
                            id = innermost;
                            continue;
                        }
                    }
                }
            }
            if let Some(info) = node.call() {
                if info.method && info.name == "get" && node.operands.len() == 1 {
                    id = node.operands[0];
                    continue;
                }
            }
            return id;
        }
    }

    /// Literal value of a number, char, bool or enumerator
    fn constant_value(ast: &Ast, id: NodeId) -> Option<i64> {
        match &ast.node(id).kind {
            NodeKind::Literal(lit) => lit.int_value(),
            NodeKind::Identifier {
                enumerator: Some(v),
                ..
            } => Some(*v),
            _ => None,
        }
    }

    fn same_operands(&self, ast: &Ast, a: &[NodeId], b: &[NodeId]) -> bool {
        a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| self.same(ast, *x, *y))
    }
}

impl EquivalenceOracle for StructuralEquivalence {
    fn same(&self, ast: &Ast, a: NodeId, b: NodeId) -> bool {
        let a = Self::skip_transparent(ast, a);
        let b = Self::skip_transparent(ast, b);
        if let (Some(va), Some(vb)) = (Self::constant_value(ast, a), Self::constant_value(ast, b)) {
            return va == vb;
        }
        let (na, nb) = (ast.node(a), ast.node(b));
        match (&na.kind, &nb.kind) {
            (NodeKind::Literal(Literal::Float { value: x, .. }), NodeKind::Literal(Literal::Float { value: y, .. })) => {
                x == y
            }
            (NodeKind::Literal(Literal::Str(x)), NodeKind::Literal(Literal::Str(y))) => x == y,
            (NodeKind::Identifier { name: x, .. }, NodeKind::Identifier { name: y, .. }) => {
                match (na.variable, nb.variable) {
                    (Some(vx), Some(vy)) => vx == vy,
                    (None, None) => x == y,
                    _ => false,
                }
            }
            (NodeKind::Unary(x), NodeKind::Unary(y)) => {
                x == y && !x.is_increment() && self.same_operands(ast, &na.operands, &nb.operands)
            }
            (NodeKind::Binary(x), NodeKind::Binary(y)) => {
                if x.is_assignment() || y.is_assignment() {
                    return false;
                }
                let (a1, a2) = (na.operands[0], na.operands[1]);
                let (b1, b2) = (nb.operands[0], nb.operands[1]);
                if x == y && self.same(ast, a1, b1) && self.same(ast, a2, b2) {
                    return true;
                }
                let swapped = if x.is_commutative() {
                    x == y
                } else {
                    x.is_comparison() && x.swap_operands() == *y
                };
                swapped && self.same(ast, a1, b2) && self.same(ast, a2, b1)
            }
            (NodeKind::Call(x), NodeKind::Call(y)) => {
                x.name == y.name
                    && x.method == y.method
                    && x.is_const
                    && y.is_const
                    && self.same_operands(ast, &na.operands, &nb.operands)
            }
            (NodeKind::Member { name: x, arrow: ax }, NodeKind::Member { name: y, arrow: ay }) => {
                x == y && ax == ay && self.same_operands(ast, &na.operands, &nb.operands)
            }
            (NodeKind::Subscript, NodeKind::Subscript) | (NodeKind::Ternary, NodeKind::Ternary) => {
                self.same_operands(ast, &na.operands, &nb.operands)
            }
            (NodeKind::Cast, NodeKind::Cast) => {
                na.value_type == nb.value_type && self.same_operands(ast, &na.operands, &nb.operands)
            }
            _ => false,
        }
    }

    fn opposite(&self, ast: &Ast, a: NodeId, b: NodeId) -> bool {
        for (negation, other) in [(a, b), (b, a)].iter() {
            if ast.is_unary(*negation, UnaryOp::Not) {
                if let Some(inner) = ast.operand(*negation, 0) {
                    if self.same(ast, inner, *other) && !heuristics::has_side_effects(ast, inner) {
                        return true;
                    }
                }
            }
        }
        if let (Some(ca), Some(cb)) = (parse_comparison(ast, a), parse_comparison(ast, b)) {
            if !ca.inconclusive && !cb.inconclusive && self.same(ast, ca.base, cb.base) {
                return ca.effective().is_complement_of(&cb.effective());
            }
        }
        match operand_relations(self, ast, a, b) {
            Some((ra, rb)) => ra.is_complement_of(&rb),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ast::builder::AstBuilder;
    use crate::analysis::ast::node::{CallInfo, VarId};
    use crate::analysis::ast::value_type::ValueType;

    fn compare(b: &mut AstBuilder, var: VarId, op: BinaryOp, v: i64) -> NodeId {
        let r = b.var(var);
        let c = b.int(v);
        b.binary(op, r, c)
    }

    #[test]
    fn test_same() {
        let mut b = AstBuilder::new("test.c");
        let x = b.local("x", ValueType::int());
        let y = b.local("y", ValueType::int());
        let xr = b.var(x);
        let yr = b.var(y);
        let sum = b.binary(BinaryOp::Add, xr, yr);
        let yr2 = b.var(y);
        let xr2 = b.var(x);
        let sum2 = b.binary(BinaryOp::Add, yr2, xr2);
        let lt = compare(&mut b, x, BinaryOp::Lt, 3);
        let three = b.int(3);
        let xr3 = b.var(x);
        let gt = b.binary(BinaryOp::Gt, three, xr3);
        let xr4 = b.var(x);
        let not = b.not(xr4);
        let not_not = b.not(not);
        let xr5 = b.var(x);
        let ast = b.finish();

        let oracle = StructuralEquivalence;
        assert!(oracle.same(&ast, sum, sum2));
        assert!(oracle.same(&ast, lt, gt));
        assert!(oracle.same(&ast, not_not, xr5));
        assert!(!oracle.same(&ast, xr, yr));
    }

    #[test]
    fn test_calls_and_side_effects() {
        let mut b = AstBuilder::new("test.cpp");
        let s = b.local("s", ValueType::record());
        let sr = b.var(s);
        let size = b.method_call(sr, CallInfo::method("size", true), vec![]);
        let sr2 = b.var(s);
        let size2 = b.method_call(sr2, CallInfo::method("size", true), vec![]);
        let rand1 = b.call(CallInfo::function("rand"), vec![]);
        let rand2 = b.call(CallInfo::function("rand"), vec![]);
        let i = b.local("i", ValueType::int());
        let ir = b.var(i);
        let inc = b.unary(UnaryOp::PostInc, ir);
        let ir2 = b.var(i);
        let inc2 = b.unary(UnaryOp::PostInc, ir2);
        let p = b.local("p", ValueType::record());
        let pr = b.var(p);
        let get = b.method_call(pr, CallInfo::method("get", true), vec![]);
        let pr2 = b.var(p);
        let ast = b.finish();

        let oracle = StructuralEquivalence;
        assert!(oracle.same(&ast, size, size2));
        assert!(!oracle.same(&ast, rand1, rand2));
        assert!(!oracle.same(&ast, inc, inc2));
        assert!(oracle.same(&ast, get, pr2));
    }

    #[test]
    fn test_members_do_not_alias() {
        let mut b = AstBuilder::new("test.c");
        let s = b.local("s", ValueType::record());
        let sr = b.var(s);
        let a = b.member(sr, "a", false);
        let sr2 = b.var(s);
        let other = b.member(sr2, "b", false);
        let ast = b.finish();
        assert!(!StructuralEquivalence.same(&ast, a, other));
    }

    #[test]
    fn test_opposite_and_exclusive() {
        let mut b = AstBuilder::new("test.c");
        let x = b.local("x", ValueType::int());
        let lt1 = compare(&mut b, x, BinaryOp::Lt, 1);
        let ge1 = compare(&mut b, x, BinaryOp::Ge, 1);
        let gt5 = compare(&mut b, x, BinaryOp::Gt, 5);
        let xr = b.var(x);
        let xr2 = b.var(x);
        let not_x = b.not(xr2);
        let y = b.local("y", ValueType::int());
        let xa = b.var(x);
        let ya = b.var(y);
        let x_lt_y = b.binary(BinaryOp::Lt, xa, ya);
        let yb = b.var(y);
        let xb = b.var(x);
        let y_lt_x = b.binary(BinaryOp::Lt, yb, xb);
        let xc = b.var(x);
        let yc = b.var(y);
        let x_ge_y = b.binary(BinaryOp::Ge, xc, yc);
        let ast = b.finish();

        let oracle = StructuralEquivalence;
        assert!(oracle.opposite(&ast, lt1, ge1));
        assert!(!oracle.opposite(&ast, lt1, gt5));
        assert!(oracle.mutually_exclusive(&ast, lt1, gt5));
        assert!(oracle.opposite(&ast, xr, not_x));
        assert!(oracle.mutually_exclusive(&ast, x_lt_y, y_lt_x));
        assert!(!oracle.opposite(&ast, x_lt_y, y_lt_x));
        assert!(oracle.opposite(&ast, x_lt_y, x_ge_y));
    }
}
