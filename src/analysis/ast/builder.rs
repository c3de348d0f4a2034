use super::node::{
    BinaryOp, CallInfo, FunctionId, Keyword, Literal, Node, NodeId, NodeKind, ScopeId, SourceLoc,
    UnaryOp, VarId,
};
use super::scope::{FunctionInfo, Scope, ScopeKind, Variable, VariableFlags};
use super::tree::Ast;
use super::value_fact::{FactPayload, ValueFact};
use super::value_type::ValueType;
use std::collections::HashMap;

/// Populates an `Ast`. Nodes are created bottom-up: operands first, then the node that
/// owns them. Every node must be used as an operand at most once.
pub struct AstBuilder {
    file: String,
    line: u32,
    column: u32,
    nodes: Vec<Node>,
    variables: Vec<Variable>,
    functions: Vec<FunctionInfo>,
}

/// Locations and variables
impl AstBuilder {
    pub fn new(file: &str) -> Self {
        Self {
            file: file.to_owned(),
            line: 1,
            column: 0,
            nodes: Vec::new(),
            variables: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Nodes created from now on are located on `line`
    pub fn line(&mut self, line: u32) -> &mut Self {
        self.line = line;
        self.column = 0;
        self
    }

    fn push(&mut self, kind: NodeKind, operands: Vec<NodeId>, value_type: Option<ValueType>) -> NodeId {
        self.column += 1;
        let loc = SourceLoc::new(&self.file, self.line, self.column);
        let mut node = Node::new(kind, operands, loc);
        node.value_type = value_type;
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn type_of(&self, id: NodeId) -> Option<ValueType> {
        self.nodes[id.0].value_type.clone()
    }

    pub fn declare(&mut self, name: &str, value_type: ValueType, mut flags: VariableFlags) -> VarId {
        flags.is_pointer |= value_type.is_pointer();
        flags.is_const |= value_type.is_const;
        self.variables.push(Variable::new(name, value_type, flags));
        VarId(self.variables.len() - 1)
    }

    pub fn local(&mut self, name: &str, value_type: ValueType) -> VarId {
        let flags = VariableFlags {
            is_local: true,
            ..VariableFlags::default()
        };
        self.declare(name, value_type, flags)
    }

    pub fn argument(&mut self, name: &str, value_type: ValueType) -> VarId {
        let flags = VariableFlags {
            is_argument: true,
            ..VariableFlags::default()
        };
        self.declare(name, value_type, flags)
    }

    pub fn global(&mut self, name: &str, value_type: ValueType) -> VarId {
        let flags = VariableFlags {
            is_global: true,
            ..VariableFlags::default()
        };
        self.declare(name, value_type, flags)
    }

    pub fn variable_flags(&mut self, var: VarId) -> &mut VariableFlags {
        &mut self.variables[var.0].flags
    }
}

/// Expressions
impl AstBuilder {
    pub fn int(&mut self, value: i64) -> NodeId {
        self.int_text(value, &value.to_string())
    }

    /// Integer literal spelled as `text`, e.g. `0x6`
    pub fn int_text(&mut self, value: i64, text: &str) -> NodeId {
        let literal = Literal::Int {
            value,
            text: text.to_owned(),
        };
        self.push(NodeKind::Literal(literal), vec![], Some(ValueType::int()))
    }

    pub fn uint(&mut self, value: i64) -> NodeId {
        let literal = Literal::Int {
            value,
            text: format!("{}U", value),
        };
        self.push(NodeKind::Literal(literal), vec![], Some(ValueType::uint()))
    }

    pub fn float(&mut self, value: f64) -> NodeId {
        let text = if value.fract() == 0.0 {
            format!("{:.1}", value)
        } else {
            value.to_string()
        };
        let literal = Literal::Float { value, text };
        self.push(NodeKind::Literal(literal), vec![], Some(ValueType::double()))
    }

    pub fn char_lit(&mut self, c: char) -> NodeId {
        let literal = Literal::Char {
            value: c as i64,
            text: format!("'{}'", c),
        };
        self.push(NodeKind::Literal(literal), vec![], Some(ValueType::char()))
    }

    pub fn bool_lit(&mut self, b: bool) -> NodeId {
        self.push(NodeKind::Literal(Literal::Bool(b)), vec![], Some(ValueType::bool()))
    }

    pub fn string_lit(&mut self, s: &str) -> NodeId {
        let vt = ValueType::char().constant().pointer_to();
        self.push(NodeKind::Literal(Literal::Str(s.to_owned())), vec![], Some(vt))
    }

    /// A reference to a declared variable
    pub fn var(&mut self, var: VarId) -> NodeId {
        let variable = &self.variables[var.0];
        let kind = NodeKind::Identifier {
            name: variable.name.clone(),
            enumerator: None,
        };
        let vt = Some(variable.value_type.clone());
        let id = self.push(kind, vec![], vt);
        self.nodes[id.0].variable = Some(var);
        id
    }

    pub fn enumerator(&mut self, name: &str, value: i64) -> NodeId {
        let kind = NodeKind::Identifier {
            name: name.to_owned(),
            enumerator: Some(value),
        };
        self.push(kind, vec![], Some(ValueType::int()))
    }

    /// An identifier the front end could not resolve
    pub fn name(&mut self, name: &str) -> NodeId {
        let kind = NodeKind::Identifier {
            name: name.to_owned(),
            enumerator: None,
        };
        self.push(kind, vec![], None)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeId) -> NodeId {
        let operand_type = self.type_of(operand);
        let vt = match op {
            UnaryOp::Not => Some(ValueType::bool()),
            UnaryOp::AddressOf => operand_type.map(ValueType::pointer_to),
            UnaryOp::Deref => operand_type.filter(ValueType::is_pointer).map(|mut vt| {
                vt.pointer -= 1;
                vt
            }),
            UnaryOp::Neg | UnaryOp::Plus | UnaryOp::BitNot => {
                operand_type.map(|vt| vt.promoted())
            }
            _ => operand_type,
        };
        self.push(NodeKind::Unary(op), vec![operand], vt)
    }

    pub fn not(&mut self, operand: NodeId) -> NodeId {
        self.unary(UnaryOp::Not, operand)
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        let vt = if op.is_comparison() || op.is_logical() {
            Some(ValueType::bool())
        } else if op.is_assignment() {
            self.type_of(lhs)
        } else if op == BinaryOp::Comma {
            self.type_of(rhs)
        } else if op == BinaryOp::Shl || op == BinaryOp::Shr {
            self.type_of(lhs).map(|vt| vt.promoted())
        } else {
            match (self.type_of(lhs), self.type_of(rhs)) {
                (Some(l), Some(r)) => Some(ValueType::arithmetic_result(&l, &r)),
                _ => None,
            }
        };
        self.push(NodeKind::Binary(op), vec![lhs, rhs], vt)
    }

    pub fn assign(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::Assign, lhs, rhs)
    }

    pub fn call(&mut self, info: CallInfo, args: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Call(info), args, None)
    }

    pub fn method_call(&mut self, object: NodeId, info: CallInfo, args: Vec<NodeId>) -> NodeId {
        let mut operands = vec![object];
        operands.extend(args);
        self.push(NodeKind::Call(CallInfo { method: true, ..info }), operands, None)
    }

    pub fn member(&mut self, object: NodeId, name: &str, arrow: bool) -> NodeId {
        let kind = NodeKind::Member {
            name: name.to_owned(),
            arrow,
        };
        self.push(kind, vec![object], None)
    }

    pub fn subscript(&mut self, array: NodeId, index: NodeId) -> NodeId {
        let vt = self.type_of(array).filter(ValueType::is_pointer).map(|mut vt| {
            vt.pointer -= 1;
            vt
        });
        self.push(NodeKind::Subscript, vec![array, index], vt)
    }

    pub fn cast(&mut self, value_type: ValueType, operand: NodeId) -> NodeId {
        self.push(NodeKind::Cast, vec![operand], Some(value_type))
    }

    pub fn ternary(&mut self, cond: NodeId, then: NodeId, els: NodeId) -> NodeId {
        let vt = self.type_of(then);
        self.push(NodeKind::Ternary, vec![cond, then, els], vt)
    }

    /// Overrides the static type computed for `id`
    pub fn set_type(&mut self, id: NodeId, value_type: ValueType) -> NodeId {
        self.nodes[id.0].value_type = Some(value_type);
        id
    }
}

/// Statements
impl AstBuilder {
    fn keyword(&mut self, keyword: Keyword, operands: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Keyword(keyword), operands, None)
    }

    pub fn empty(&mut self) -> NodeId {
        self.push(NodeKind::Empty, vec![], None)
    }

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Block, statements, None)
    }

    pub fn if_stmt(&mut self, cond: NodeId, then: NodeId, els: Option<NodeId>) -> NodeId {
        let mut operands = vec![cond, then];
        operands.extend(els);
        self.keyword(Keyword::If { constexpr: false }, operands)
    }

    pub fn if_constexpr(&mut self, cond: NodeId, then: NodeId, els: Option<NodeId>) -> NodeId {
        let mut operands = vec![cond, then];
        operands.extend(els);
        self.keyword(Keyword::If { constexpr: true }, operands)
    }

    pub fn while_stmt(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.keyword(Keyword::While, vec![cond, body])
    }

    pub fn do_while(&mut self, body: NodeId, cond: NodeId) -> NodeId {
        self.keyword(Keyword::DoWhile, vec![body, cond])
    }

    pub fn for_stmt(
        &mut self,
        init: Option<NodeId>,
        cond: Option<NodeId>,
        step: Option<NodeId>,
        body: NodeId,
    ) -> NodeId {
        let mut clause = |clause: Option<NodeId>| match clause {
            Some(id) => id,
            None => self.empty(),
        };
        let operands = vec![clause(init), clause(cond), clause(step), body];
        self.keyword(Keyword::For, operands)
    }

    pub fn switch_stmt(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.keyword(Keyword::Switch, vec![cond, body])
    }

    pub fn case_label(&mut self, value: NodeId) -> NodeId {
        self.keyword(Keyword::Case, vec![value])
    }

    pub fn default_label(&mut self) -> NodeId {
        self.keyword(Keyword::Default, vec![])
    }

    pub fn label(&mut self, name: &str) -> NodeId {
        self.keyword(Keyword::Label(name.to_owned()), vec![])
    }

    pub fn return_stmt(&mut self, value: Option<NodeId>) -> NodeId {
        self.keyword(Keyword::Return, value.into_iter().collect())
    }

    pub fn throw_stmt(&mut self, value: Option<NodeId>) -> NodeId {
        self.keyword(Keyword::Throw, value.into_iter().collect())
    }

    pub fn break_stmt(&mut self) -> NodeId {
        self.keyword(Keyword::Break, vec![])
    }

    pub fn continue_stmt(&mut self) -> NodeId {
        self.keyword(Keyword::Continue, vec![])
    }

    pub fn goto_stmt(&mut self, label: &str) -> NodeId {
        self.keyword(Keyword::Goto(label.to_owned()), vec![])
    }

    pub fn catch_block(&mut self, body: NodeId) -> NodeId {
        self.keyword(Keyword::Catch, vec![body])
    }

    pub fn function(
        &mut self,
        name: &str,
        params: Vec<VarId>,
        return_type: ValueType,
        body: NodeId,
    ) -> FunctionId {
        self.functions.push(FunctionInfo {
            name: name.to_owned(),
            params,
            return_type,
            body,
        });
        FunctionId(self.functions.len() - 1)
    }
}

/// Facts and provenance flags
impl AstBuilder {
    fn same_domain(a: &FactPayload, b: &FactPayload) -> bool {
        matches!(
            (a, b),
            (FactPayload::Int(_), FactPayload::Int(_)) | (FactPayload::Float(_), FactPayload::Float(_))
        )
    }

    /// Attaches a value fact. A Known fact replaces an earlier Known fact of the same domain.
    pub fn fact(&mut self, id: NodeId, fact: ValueFact) -> NodeId {
        let facts = &mut self.nodes[id.0].facts;
        if fact.is_known() && !fact.is_impossible() {
            if let Some(previous) = facts.iter_mut().find(|f| {
                f.is_known() && !f.is_impossible() && Self::same_domain(&f.payload, &fact.payload)
            }) {
                debug!("Replacing known fact {} with {}", previous, fact);
                *previous = fact;
                return id;
            }
        }
        facts.push(fact);
        id
    }

    pub fn known(&mut self, id: NodeId, value: i64) -> NodeId {
        self.fact(id, ValueFact::known_int(value))
    }

    pub fn macro_expanded(&mut self, id: NodeId) -> NodeId {
        self.nodes[id.0].flags.macro_expanded = true;
        id
    }

    pub fn in_template(&mut self, id: NodeId) -> NodeId {
        self.nodes[id.0].flags.in_template = true;
        id
    }

    pub fn ifdef_span(&mut self, id: NodeId) -> NodeId {
        self.nodes[id.0].flags.ifdef_span = true;
        id
    }
}

impl AstBuilder {
    /// The scope opened by operand `index` of a node of kind `kind`
    fn opened_scope(kind: &NodeKind, index: usize, child: &Node) -> Option<ScopeKind> {
        match kind {
            NodeKind::Keyword(keyword) => match (keyword, index) {
                (Keyword::If { .. }, 1) => Some(ScopeKind::If),
                (Keyword::If { .. }, 2) => Some(ScopeKind::Else),
                (Keyword::While, 1) => Some(ScopeKind::While),
                (Keyword::For, 3) => Some(ScopeKind::For),
                (Keyword::DoWhile, 0) => Some(ScopeKind::DoWhile),
                (Keyword::Switch, 1) => Some(ScopeKind::Switch),
                (Keyword::Catch, 0) => Some(ScopeKind::Catch),
                _ => None,
            },
            NodeKind::Block if child.is_block() => Some(ScopeKind::Other),
            _ => None,
        }
    }

    /// Links parents, lays out the nodes in source order and builds the scope tree
    pub fn finish(self) -> Ast {
        let AstBuilder {
            mut nodes,
            variables,
            functions,
            ..
        } = self;
        let count = nodes.len();

        for index in 0..count {
            for operand in nodes[index].operands.clone() {
                nodes[operand.0].parent = Some(NodeId(index));
            }
        }

        let function_bodies: HashMap<NodeId, FunctionId> = functions
            .iter()
            .enumerate()
            .map(|(i, f)| (f.body, FunctionId(i)))
            .collect();
        let mut roots: Vec<NodeId> = functions.iter().map(|f| f.body).collect();
        roots.extend(
            (0..count)
                .map(NodeId)
                .filter(|id| nodes[id.0].parent.is_none() && !function_bodies.contains_key(id)),
        );

        let mut scopes = vec![Scope {
            kind: ScopeKind::Global,
            body: None,
            parent: None,
            function: None,
        }];
        let mut node_scope = vec![ScopeId(0); count];
        let mut order = Vec::with_capacity(count);
        let mut position = vec![usize::MAX; count];

        for root in roots {
            let opens = function_bodies
                .get(&root)
                .map(|f| (ScopeKind::Function, Some(*f)));
            let mut stack = vec![(root, ScopeId(0), opens)];
            while let Some((id, outer, opens)) = stack.pop() {
                if position[id.0] != usize::MAX {
                    continue;
                }
                let scope = match opens {
                    Some((kind, function)) => {
                        scopes.push(Scope {
                            kind,
                            body: Some(id),
                            parent: Some(outer),
                            function: function.or(scopes[outer.0].function),
                        });
                        ScopeId(scopes.len() - 1)
                    }
                    None => outer,
                };
                node_scope[id.0] = scope;
                position[id.0] = order.len();
                order.push(id);
                let node = &nodes[id.0];
                for (index, child) in node.operands.iter().enumerate().rev() {
                    let opens = Self::opened_scope(&node.kind, index, &nodes[child.0])
                        .map(|kind| (kind, None));
                    stack.push((*child, scope, opens));
                }
            }
        }

        let mut subtree_end = vec![0; count];
        for id in order.iter().rev() {
            let end = nodes[id.0]
                .operands
                .iter()
                .map(|child| subtree_end[child.0])
                .max()
                .unwrap_or(position[id.0] + 1);
            subtree_end[id.0] = end.max(position[id.0] + 1);
        }

        debug!(
            "Built tree with {} nodes, {} scopes and {} functions",
            count,
            scopes.len(),
            functions.len()
        );

        Ast {
            nodes,
            variables,
            functions,
            scopes,
            node_scope,
            order,
            position,
            subtree_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_fact_replaces_known_fact() {
        let mut b = AstBuilder::new("test.c");
        let n = b.name("n");
        b.known(n, 1);
        b.fact(n, ValueFact::possible_int(3));
        b.known(n, 5);
        let ast = b.finish();
        assert_eq!(ast.facts(n).len(), 2);
        assert_eq!(ast.known_int(n), Some(5));
    }

    #[test]
    fn test_binary_types() {
        let mut b = AstBuilder::new("test.c");
        let c = b.local("c", ValueType::uchar());
        let cr = b.var(c);
        let one = b.int(1);
        let sum = b.binary(BinaryOp::Add, cr, one);
        let two = b.int(2);
        let cmp = b.binary(BinaryOp::Lt, sum, two);
        let ast = b.finish();
        assert_eq!(ast.value_type(sum), Some(&ValueType::int()));
        assert!(ast.is_bool_typed(cmp));
    }

    #[test]
    fn test_for_clauses_are_filled() {
        let mut b = AstBuilder::new("test.c");
        let body = b.block(vec![]);
        let for_stmt = b.for_stmt(None, None, None, body);
        let ast = b.finish();
        assert_eq!(ast.operands(for_stmt).len(), 4);
        assert_eq!(ast.condition(for_stmt), None);
        assert_eq!(ast.body(for_stmt), Some(body));
    }
}
