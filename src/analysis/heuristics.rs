//! Named predicates used to suppress findings in idioms where they would be noise.

use crate::analysis::ast::node::{BinaryOp, Keyword, Literal, NodeId, NodeKind, UnaryOp, VarId};
use crate::analysis::ast::tree::Ast;
use crate::analysis::ast::value_type::BaseType;
use std::collections::HashSet;

lazy_static! {
    /// Calls whose arguments are never evaluated at run time
    static ref UNEVALUATED_OPERATORS: HashSet<&'static str> = [
        "sizeof", "decltype", "typeid", "alignof", "_Alignof", "noexcept", "static_assert",
    ]
    .iter()
    .copied()
    .collect();

    /// Assertion macros and functions: a condition inside them is expected to be always true
    static ref ASSERT_LIKE: HashSet<&'static str> = [
        "assert", "ASSERT", "_ASSERT", "_ASSERTE", "BOOST_ASSERT", "Q_ASSERT", "DCHECK",
        "CHECK", "VERIFY", "g_assert", "assert_param", "ASSERT_TRUE", "ASSERT_FALSE",
        "EXPECT_TRUE", "EXPECT_FALSE", "static_assert",
    ]
    .iter()
    .copied()
    .collect();

    /// Standard stream objects
    static ref STREAM_OBJECTS: HashSet<&'static str> = [
        "cin", "cout", "cerr", "clog", "wcin", "wcout", "wcerr", "wclog",
        "std::cin", "std::cout", "std::cerr", "std::clog",
        "std::wcin", "std::wcout", "std::wcerr", "std::wclog",
    ]
    .iter()
    .copied()
    .collect();
}

fn call_name(ast: &Ast, id: NodeId) -> Option<&str> {
    ast.node(id).call().map(|info| info.name.as_str())
}

pub fn is_unevaluated_call(ast: &Ast, id: NodeId) -> bool {
    call_name(ast, id).map_or(false, |name| UNEVALUATED_OPERATORS.contains(name))
}

pub fn is_assert_like_call(ast: &Ast, id: NodeId) -> bool {
    call_name(ast, id).map_or(false, |name| ASSERT_LIKE.contains(name))
}

/// Inside `sizeof`, `decltype` and friends, or inside an assertion
pub fn in_unevaluated_context(ast: &Ast, id: NodeId) -> bool {
    ast.ancestors(id)
        .any(|a| is_unevaluated_call(ast, a) || is_assert_like_call(ast, a))
}

/// The node or one of its descendants comes from a macro expansion
pub fn macro_in_subtree(ast: &Ast, id: NodeId) -> bool {
    ast.descendants(id)
        .any(|n| ast.node(n).flags.macro_expanded)
}

/// The node or one of its ancestors comes from a macro expansion
pub fn macro_in_ancestors(ast: &Ast, id: NodeId) -> bool {
    ast.node(id).flags.macro_expanded
        || ast.ancestors(id).any(|a| ast.node(a).flags.macro_expanded)
}

pub fn ifdef_in_subtree(ast: &Ast, id: NodeId) -> bool {
    ast.descendants(id).any(|n| ast.node(n).flags.ifdef_span)
}

pub fn in_template(ast: &Ast, id: NodeId) -> bool {
    ast.node(id).flags.in_template || ast.ancestors(id).any(|a| ast.node(a).flags.in_template)
}

pub fn in_constexpr_if(ast: &Ast, id: NodeId) -> bool {
    ast.ancestors(id).any(|a| {
        matches!(
            ast.node(a).keyword(),
            Some(Keyword::If { constexpr: true })
        )
    })
}

/// The leftmost operand of a `<<` or `>>` chain is a stream
pub fn is_stream_chain(ast: &Ast, id: NodeId) -> bool {
    let op = match ast.node(id).binary_op() {
        Some(op @ BinaryOp::Shl) | Some(op @ BinaryOp::Shr) => op,
        _ => return false,
    };
    let mut leftmost = id;
    while ast.is_binary(leftmost, op) {
        match ast.operand(leftmost, 0) {
            Some(lhs) => leftmost = lhs,
            None => return false,
        }
    }
    match &ast.node(leftmost).kind {
        NodeKind::Identifier { name, .. } => {
            STREAM_OBJECTS.contains(name.as_str())
                || ast
                    .value_type(leftmost)
                    .map_or(false, |vt| vt.base == BaseType::Record && vt.pointer == 0)
        }
        _ => ast
            .value_type(leftmost)
            .map_or(false, |vt| vt.base == BaseType::Record && vt.pointer == 0),
    }
}

/// `stream >> target`: returns the node read into
pub fn stream_read_target(ast: &Ast, id: NodeId) -> Option<NodeId> {
    if ast.is_binary(id, BinaryOp::Shr) && is_stream_chain(ast, id) {
        ast.operand(id, 1)
    } else {
        None
    }
}

/// Increments, assignments or calls that may modify state
pub fn has_side_effects(ast: &Ast, id: NodeId) -> bool {
    ast.descendants(id).any(|n| {
        let node = ast.node(n);
        match &node.kind {
            NodeKind::Unary(op) => op.is_increment(),
            NodeKind::Binary(op) => op.is_assignment(),
            NodeKind::Call(info) => !info.is_const && !UNEVALUATED_OPERATORS.contains(info.name.as_str()),
            _ => false,
        }
    })
}

/// Made only of constants and const variables
pub fn is_const_expression(ast: &Ast, id: NodeId) -> bool {
    let node = ast.node(id);
    match &node.kind {
        NodeKind::Literal(_) => true,
        NodeKind::Identifier {
            enumerator: Some(_),
            ..
        } => true,
        NodeKind::Identifier { .. } => node.variable.map_or(false, |var| {
            let flags = ast.variable(var).flags;
            flags.is_const && !flags.is_pointer && !flags.is_reference
        }),
        NodeKind::Unary(op) => {
            !op.is_increment()
                && *op != UnaryOp::Deref
                && *op != UnaryOp::AddressOf
                && node.operands.iter().all(|o| is_const_expression(ast, *o))
        }
        NodeKind::Binary(op) => {
            !op.is_assignment() && node.operands.iter().all(|o| is_const_expression(ast, *o))
        }
        NodeKind::Cast | NodeKind::Ternary => {
            node.operands.iter().all(|o| is_const_expression(ast, *o))
        }
        NodeKind::Call(_) => is_unevaluated_call(ast, id),
        _ => false,
    }
}

/// Numbers and `sizeof` combined by arithmetic or comparisons, with at least one `sizeof`
pub fn is_sizeof_only(ast: &Ast, id: NodeId) -> bool {
    let mut has_sizeof = false;
    let mut has_other = false;
    let mut stack = vec![id];
    while let Some(n) = stack.pop() {
        let node = ast.node(n);
        if node.is_number() {
            continue;
        }
        if call_name(ast, n) == Some("sizeof") {
            has_sizeof = true;
            continue;
        }
        match node.binary_op() {
            Some(op) if op.is_comparison() || op.is_arithmetic() => {
                stack.extend(node.operands.iter().copied())
            }
            _ => has_other = true,
        }
    }
    has_sizeof && !has_other
}

/// The variable is a reference or has its address taken within `scope_root`
pub fn is_aliased(ast: &Ast, var: VarId, scope_root: NodeId) -> bool {
    if ast.variable(var).flags.is_reference {
        return true;
    }
    ast.descendants(scope_root).any(|n| {
        ast.is_unary(n, UnaryOp::AddressOf)
            && ast
                .operand(n, 0)
                .map_or(false, |operand| ast.var_of(operand) == Some(var))
    })
}

/// `x < 0`, `x >= 0`, `0 > x` or `0 <= x` with `x` unsigned or a pointer. Those are
/// reported by a dedicated check of the front end.
pub fn is_unsigned_or_pointer_zero_compare(ast: &Ast, id: NodeId) -> bool {
    let (lhs, rhs) = match ast.binary_operands(id) {
        Some(operands) => operands,
        None => return false,
    };
    let is_zero = |n: NodeId| ast.literal_int(n) == Some(0);
    let unsigned_or_pointer = |n: NodeId| {
        ast.value_type(n)
            .map_or(false, |vt| vt.is_pointer() || (vt.is_integral() && vt.is_unsigned()))
    };
    match ast.node(id).binary_op() {
        Some(BinaryOp::Lt) | Some(BinaryOp::Ge) => is_zero(rhs) && unsigned_or_pointer(lhs),
        Some(BinaryOp::Gt) | Some(BinaryOp::Le) => is_zero(lhs) && unsigned_or_pointer(rhs),
        _ => false,
    }
}

/// A literal or `!literal`
pub fn is_literal_condition(ast: &Ast, id: NodeId) -> bool {
    let node = ast.node(id);
    if node.is_literal() {
        return true;
    }
    node.is_not()
        && ast
            .operand(id, 0)
            .map_or(false, |operand| ast.node(operand).is_literal())
}

/// Returns true if the function `id` belongs to returns `bool`
pub fn in_boolean_function(ast: &Ast, id: NodeId) -> bool {
    ast.function_of(id)
        .map_or(false, |f| ast.function(f).return_type.is_bool())
}

/// The value of `id` is consumed as a truth value
pub fn is_boolean_context(ast: &Ast, id: NodeId) -> bool {
    let parent = match ast.parent(id) {
        Some(parent) => parent,
        None => return false,
    };
    let node = ast.node(parent);
    match &node.kind {
        NodeKind::Binary(op) if op.is_logical() => true,
        NodeKind::Unary(UnaryOp::Not) => true,
        NodeKind::Ternary => ast.operand(parent, 0) == Some(id),
        NodeKind::Binary(BinaryOp::Assign) => {
            ast.operand(parent, 1) == Some(id)
                && ast
                    .operand(parent, 0)
                    .and_then(|lhs| ast.var_of(lhs))
                    .map_or(false, |var| ast.variable(var).value_type.is_bool())
        }
        NodeKind::Keyword(Keyword::Return) => in_boolean_function(ast, id),
        NodeKind::Keyword(Keyword::Switch) => false,
        NodeKind::Keyword(_) => ast.condition(parent) == Some(id),
        _ => false,
    }
}

/// A string literal, e.g. in `assert(x && "message")`
pub fn is_string_literal(ast: &Ast, id: NodeId) -> bool {
    matches!(ast.node(id).literal(), Some(Literal::Str(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ast::builder::AstBuilder;
    use crate::analysis::ast::node::CallInfo;
    use crate::analysis::ast::value_type::ValueType;

    #[test]
    fn test_unevaluated_context() {
        let mut b = AstBuilder::new("test.c");
        let x = b.local("x", ValueType::int());
        let xr = b.var(x);
        let zero = b.int(0);
        let cmp = b.binary(BinaryOp::Eq, xr, zero);
        b.call(CallInfo::function("assert"), vec![cmp]);
        let yr = b.var(x);
        let one = b.int(1);
        let plain = b.binary(BinaryOp::Eq, yr, one);
        let ast = b.finish();
        assert!(in_unevaluated_context(&ast, cmp));
        assert!(in_unevaluated_context(&ast, xr));
        assert!(!in_unevaluated_context(&ast, plain));
    }

    #[test]
    fn test_stream_read() {
        let mut b = AstBuilder::new("test.cpp");
        let cin = b.name("std::cin");
        let x = b.local("x", ValueType::int());
        let xr = b.var(x);
        let read = b.binary(BinaryOp::Shr, cin, xr);
        let y = b.local("y", ValueType::int());
        let yr = b.var(y);
        let one = b.int(1);
        let shift = b.binary(BinaryOp::Shr, yr, one);
        let ast = b.finish();
        assert_eq!(stream_read_target(&ast, read), Some(xr));
        assert_eq!(stream_read_target(&ast, shift), None);
    }

    #[test]
    fn test_const_expression() {
        let mut b = AstBuilder::new("test.c");
        let n = b.local("N", ValueType::int().constant());
        let nr = b.var(n);
        let two = b.int(2);
        let product = b.binary(BinaryOp::Mul, nr, two);
        let x = b.local("x", ValueType::int());
        let xr = b.var(x);
        let three = b.int(3);
        let sum = b.binary(BinaryOp::Add, xr, three);
        let ast = b.finish();
        assert!(is_const_expression(&ast, product));
        assert!(!is_const_expression(&ast, sum));
    }

    #[test]
    fn test_sizeof_only() {
        let mut b = AstBuilder::new("test.c");
        let t = b.name("T");
        let size = b.call(CallInfo::function("sizeof"), vec![t]);
        let four = b.int(4);
        let cmp = b.binary(BinaryOp::Eq, size, four);
        let x = b.local("x", ValueType::int());
        let xr = b.var(x);
        let other_size = size_of_x(&mut b);
        let mixed = b.binary(BinaryOp::Eq, other_size, xr);
        let ast = b.finish();
        assert!(is_sizeof_only(&ast, cmp));
        assert!(!is_sizeof_only(&ast, mixed));

        fn size_of_x(b: &mut AstBuilder) -> NodeId {
            let t = b.name("U");
            b.call(CallInfo::function("sizeof"), vec![t])
        }
    }

    #[test]
    fn test_unsigned_zero_compare() {
        let mut b = AstBuilder::new("test.c");
        let u = b.local("u", ValueType::uint());
        let ur = b.var(u);
        let zero = b.int(0);
        let lt = b.binary(BinaryOp::Lt, ur, zero);
        let i = b.local("i", ValueType::int());
        let ir = b.var(i);
        let zero = b.int(0);
        let signed_lt = b.binary(BinaryOp::Lt, ir, zero);
        let ast = b.finish();
        assert!(is_unsigned_or_pointer_zero_compare(&ast, lt));
        assert!(!is_unsigned_or_pointer_zero_compare(&ast, signed_lt));
    }

    #[test]
    fn test_aliased() {
        let mut b = AstBuilder::new("test.c");
        let x = b.local("x", ValueType::int());
        let xr = b.var(x);
        let addr = b.unary(UnaryOp::AddressOf, xr);
        let p = b.local("p", ValueType::int().pointer_to());
        let pr = b.var(p);
        let init = b.assign(pr, addr);
        let body = b.block(vec![init]);
        let y = b.local("y", ValueType::int());
        let ast = b.finish();
        assert!(is_aliased(&ast, x, body));
        assert!(!is_aliased(&ast, y, body));
    }
}
