//! Order relations between an expression and a constant, viewed as sets of values.

use crate::analysis::ast::node::{BinaryOp, Literal, NodeId, NodeKind};
use crate::analysis::ast::tree::Ast;
use crate::analysis::numerical::interval::{Bound, Interval, IntervalSet};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOp {
    pub fn from_binary(op: BinaryOp) -> Option<Self> {
        match op {
            BinaryOp::Eq => Some(RelOp::Eq),
            BinaryOp::Ne => Some(RelOp::Ne),
            BinaryOp::Lt => Some(RelOp::Lt),
            BinaryOp::Le => Some(RelOp::Le),
            BinaryOp::Gt => Some(RelOp::Gt),
            BinaryOp::Ge => Some(RelOp::Ge),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
        }
    }

    /// `!(a op b)` is `a negate(op) b`
    pub fn negate(self) -> Self {
        match self {
            RelOp::Eq => RelOp::Ne,
            RelOp::Ne => RelOp::Eq,
            RelOp::Lt => RelOp::Ge,
            RelOp::Le => RelOp::Gt,
            RelOp::Gt => RelOp::Le,
            RelOp::Ge => RelOp::Lt,
        }
    }

    /// `a op b` is `b swap(op) a`
    pub fn swap(self) -> Self {
        match self {
            RelOp::Lt => RelOp::Gt,
            RelOp::Le => RelOp::Ge,
            RelOp::Gt => RelOp::Lt,
            RelOp::Ge => RelOp::Le,
            op => op,
        }
    }

    pub fn is_equality(self) -> bool {
        matches!(self, RelOp::Eq | RelOp::Ne)
    }

    pub fn holds<T: PartialOrd>(self, lhs: T, rhs: T) -> bool {
        match self {
            RelOp::Eq => lhs == rhs,
            RelOp::Ne => lhs != rhs,
            RelOp::Lt => lhs < rhs,
            RelOp::Le => lhs <= rhs,
            RelOp::Gt => lhs > rhs,
            RelOp::Ge => lhs >= rhs,
        }
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Number::Float(_))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{}", v),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

/// `x op value` for an unnamed `x`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Relation {
    pub op: RelOp,
    pub value: Number,
}

impl Relation {
    pub fn new(op: RelOp, value: Number) -> Self {
        Relation { op, value }
    }

    pub fn negate(&self) -> Self {
        Relation::new(self.op.negate(), self.value)
    }

    pub fn holds_for(&self, x: Number) -> bool {
        match (x, self.value) {
            (Number::Int(x), Number::Int(v)) => self.op.holds(x, v),
            (x, v) => self.op.holds(x.as_f64(), v.as_f64()),
        }
    }

    /// The integers satisfying the relation, `None` for a float constant
    pub fn int_set(&self) -> Option<IntervalSet<i128>> {
        use Bound::*;
        let v = match self.value {
            Number::Int(v) => v,
            Number::Float(_) => return None,
        };
        let parts = match self.op {
            RelOp::Eq => vec![Interval::point(v)],
            RelOp::Ne => vec![
                Interval::new(NINF, Closed(v - 1)),
                Interval::new(Closed(v + 1), INF),
            ],
            RelOp::Lt => vec![Interval::new(NINF, Closed(v - 1))],
            RelOp::Le => vec![Interval::new(NINF, Closed(v))],
            RelOp::Gt => vec![Interval::new(Closed(v + 1), INF)],
            RelOp::Ge => vec![Interval::new(Closed(v), INF)],
        };
        Some(IntervalSet::new(parts))
    }

    /// The real numbers satisfying the relation
    pub fn real_set(&self) -> IntervalSet<f64> {
        use Bound::*;
        let v = self.value.as_f64();
        let parts = match self.op {
            RelOp::Eq => vec![Interval::point(v)],
            RelOp::Ne => vec![Interval::new(NINF, Open(v)), Interval::new(Open(v), INF)],
            RelOp::Lt => vec![Interval::new(NINF, Open(v))],
            RelOp::Le => vec![Interval::new(NINF, Closed(v))],
            RelOp::Gt => vec![Interval::new(Open(v), INF)],
            RelOp::Ge => vec![Interval::new(Closed(v), INF)],
        };
        IntervalSet::new(parts)
    }

    /// No value satisfies both relations. Integer relations are compared over the integers.
    pub fn disjoint_with(&self, other: &Relation) -> bool {
        match (self.int_set(), other.int_set()) {
            (Some(a), Some(b)) => a.is_disjoint(&b),
            _ => self.real_set().is_disjoint(&other.real_set()),
        }
    }

    /// Every value satisfying `self` satisfies `other`
    pub fn implies(&self, other: &Relation) -> bool {
        self.disjoint_with(&other.negate())
    }

    /// Exactly one of the two relations holds for every value
    pub fn is_complement_of(&self, other: &Relation) -> bool {
        self.implies(&other.negate()) && other.negate().implies(self)
    }

    fn real_implies(&self, other: &Relation) -> bool {
        self.real_set().is_disjoint(&other.negate().real_set())
    }
}

/// Which of two combined conditions makes the other one redundant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sufficient {
    First,
    Second,
    Neither,
}

/// Decides by real-interval containment which condition of `first && second`
/// (or `first || second` when `conjunction` is false) is sufficient on its own.
pub fn sufficient_condition(first: &Relation, second: &Relation, conjunction: bool) -> Sufficient {
    let first_in_second = first.real_implies(second);
    let second_in_first = second.real_implies(first);
    match (conjunction, first_in_second, second_in_first) {
        (true, true, _) | (false, _, true) => Sufficient::First,
        (true, _, true) | (false, true, _) => Sufficient::Second,
        _ => Sufficient::Neither,
    }
}

/// A boolean operand read as `[!] base op value`
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    pub base: NodeId,
    pub negated: bool,
    /// The relation as written, before applying `negated`
    pub relation: Relation,
    /// Spelling of the constant
    pub value_text: String,
    /// The operand was an explicit comparison rather than a bare expression
    pub explicit: bool,
    /// A char constant used with an ordering operator
    pub inconclusive: bool,
}

impl Comparison {
    /// The relation `base` must satisfy for the operand to be true
    pub fn effective(&self) -> Relation {
        if self.negated {
            self.relation.negate()
        } else {
            self.relation
        }
    }

    pub fn is_true_for(&self, x: Number) -> bool {
        self.relation.holds_for(x) != self.negated
    }

    /// Renders the operand as `x > 5`, `!(x > 5)`, `x` or `!x`
    pub fn describe(&self, ast: &Ast) -> String {
        let base = ast.expr_string(self.base);
        match (self.explicit, self.negated) {
            (true, false) => format!("{} {} {}", base, self.relation.op, self.value_text),
            (true, true) => format!("!({} {} {})", base, self.relation.op, self.value_text),
            (false, false) => base,
            (false, true) => format!("!{}", base),
        }
    }
}

/// A numeric constant operand: literal or enumerator. Returns the value, its spelling
/// and whether it is a char literal. Macro-expanded constants yield `Err(())`.
fn constant_operand(ast: &Ast, id: NodeId) -> Option<Result<(Number, String, bool), ()>> {
    let node = ast.node(id);
    let constant = match &node.kind {
        NodeKind::Literal(Literal::Int { value, text }) => {
            (Number::Int(i128::from(*value)), text.clone(), false)
        }
        NodeKind::Literal(Literal::Char { value, text }) => {
            (Number::Int(i128::from(*value)), text.clone(), true)
        }
        NodeKind::Literal(Literal::Float { value, text }) => (Number::Float(*value), text.clone(), false),
        NodeKind::Literal(_) => return Some(Err(())),
        NodeKind::Identifier {
            enumerator: Some(value),
            ..
        } => (Number::Int(i128::from(*value)), value.to_string(), false),
        _ => return None,
    };
    if node.flags.macro_expanded {
        Some(Err(()))
    } else {
        Some(Ok(constant))
    }
}

/// Reads a boolean operand as a comparison against a constant. Leading `!` toggle the
/// negation, a constant on the left flips the operator, and anything else is read as
/// `expr != 0`. Fails for macro-expanded constants and non-numeric literals.
pub fn parse_comparison(ast: &Ast, id: NodeId) -> Option<Comparison> {
    let mut negated = false;
    let mut current = id;
    while ast.node(current).is_not() {
        negated = !negated;
        current = ast.operand(current, 0)?;
    }

    let split = ast
        .binary_operands(current)
        .and_then(|(lhs, rhs)| Some((RelOp::from_binary(ast.node(current).binary_op()?)?, lhs, rhs)));

    let (base, op, constant, explicit) = match split {
        Some((op, lhs, rhs)) => match (constant_operand(ast, lhs), constant_operand(ast, rhs)) {
            (Some(Err(())), _) => return None,
            (Some(Ok(constant)), _) => (rhs, op.swap(), constant, true),
            (None, Some(Err(()))) => return None,
            (None, Some(Ok(constant))) => (lhs, op, constant, true),
            (None, None) => (current, RelOp::Ne, (Number::Int(0), "0".to_owned(), false), false),
        },
        None => (current, RelOp::Ne, (Number::Int(0), "0".to_owned(), false), false),
    };
    let (value, value_text, is_char) = constant;
    Some(Comparison {
        base,
        negated,
        relation: Relation::new(op, value),
        value_text,
        explicit,
        inconclusive: is_char && !op.is_equality(),
    })
}
