use super::value_fact::ValueFact;
use super::value_type::ValueType;
use std::fmt;

/// Index of a node in the `Ast` arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Index of a declared variable in the `Ast` variable table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

/// Index of a lexical scope
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

/// Index of a declared function
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub usize);

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceLoc {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLoc {
    pub fn new(file: &str, line: u32, column: u32) -> Self {
        Self {
            file: file.to_owned(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int { value: i64, text: String },
    Float { value: f64, text: String },
    Char { value: i64, text: String },
    Str(String),
    Bool(bool),
}

impl Literal {
    /// The integer value of the literal, chars and bools included
    pub fn int_value(&self) -> Option<i64> {
        match self {
            Literal::Int { value, .. } | Literal::Char { value, .. } => Some(*value),
            Literal::Bool(b) => Some(*b as i64),
            Literal::Float { .. } | Literal::Str(_) => None,
        }
    }

    pub fn text(&self) -> String {
        match self {
            Literal::Int { text, .. } | Literal::Float { text, .. } | Literal::Char { text, .. } => {
                text.clone()
            }
            Literal::Str(s) => format!("\"{}\"", s),
            Literal::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    Deref,
    AddressOf,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        use UnaryOp::*;
        match self {
            Not => "!",
            Neg => "-",
            Plus => "+",
            BitNot => "~",
            Deref => "*",
            AddressOf => "&",
            PreInc | PostInc => "++",
            PreDec | PostDec => "--",
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }

    pub fn is_increment(self) -> bool {
        use UnaryOp::*;
        matches!(self, PreInc | PreDec | PostInc | PostDec)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    Comma,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
            Shl => "<<",
            Shr => ">>",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            LogicalAnd => "&&",
            LogicalOr => "||",
            Assign => "=",
            AddAssign => "+=",
            SubAssign => "-=",
            MulAssign => "*=",
            DivAssign => "/=",
            RemAssign => "%=",
            ShlAssign => "<<=",
            ShrAssign => ">>=",
            AndAssign => "&=",
            OrAssign => "|=",
            XorAssign => "^=",
            Comma => ",",
        }
    }

    /// C operator precedence, higher binds tighter
    pub fn precedence(self) -> u8 {
        use BinaryOp::*;
        match self {
            Mul | Div | Rem => 13,
            Add | Sub => 12,
            Shl | Shr => 11,
            Lt | Le | Gt | Ge => 10,
            Eq | Ne => 9,
            BitAnd => 8,
            BitXor => 7,
            BitOr => 6,
            LogicalAnd => 5,
            LogicalOr => 4,
            Assign | AddAssign | SubAssign | MulAssign | DivAssign | RemAssign | ShlAssign
            | ShrAssign | AndAssign | OrAssign | XorAssign => 2,
            Comma => 1,
        }
    }

    pub fn is_comparison(self) -> bool {
        use BinaryOp::*;
        matches!(self, Eq | Ne | Lt | Le | Gt | Ge)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    pub fn is_assignment(self) -> bool {
        self.precedence() == 2
    }

    pub fn is_arithmetic(self) -> bool {
        use BinaryOp::*;
        matches!(self, Add | Sub | Mul | Div | Rem)
    }

    pub fn is_bitwise(self) -> bool {
        use BinaryOp::*;
        matches!(self, BitAnd | BitOr | BitXor | Shl | Shr)
    }

    pub fn is_commutative(self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            Add | Mul | BitAnd | BitOr | BitXor | Eq | Ne | LogicalAnd | LogicalOr
        )
    }

    /// The comparison that holds after swapping the operands: `a < b` is `b > a`
    pub fn swap_operands(self) -> Self {
        use BinaryOp::*;
        match self {
            Lt => Gt,
            Le => Ge,
            Gt => Lt,
            Ge => Le,
            op => op,
        }
    }
}

/// How a function parameter receives its argument
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Value,
    ConstReference,
    Reference,
    ConstPointer,
    Pointer,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallInfo {
    pub name: String,
    /// `operands[0]` is the object of a method call
    pub method: bool,
    /// The callee is known not to modify anything (const method or pure function)
    pub is_const: bool,
    /// Parameter kinds of the resolved callee, `None` when the callee is unknown
    pub params: Option<Vec<ParamKind>>,
}

impl CallInfo {
    pub fn function(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            method: false,
            is_const: false,
            params: None,
        }
    }

    pub fn method(name: &str, is_const: bool) -> Self {
        Self {
            name: name.to_owned(),
            method: true,
            is_const,
            params: None,
        }
    }

    pub fn with_params(mut self, params: Vec<ParamKind>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn pure(mut self) -> Self {
        self.is_const = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Keyword {
    If { constexpr: bool },
    While,
    DoWhile,
    For,
    Switch,
    Case,
    Default,
    Catch,
    Label(String),
    Return,
    Throw,
    Break,
    Continue,
    Goto(String),
}

impl Keyword {
    pub fn name(&self) -> &str {
        match self {
            Keyword::If { .. } => "if",
            Keyword::While => "while",
            Keyword::DoWhile => "do",
            Keyword::For => "for",
            Keyword::Switch => "switch",
            Keyword::Case => "case",
            Keyword::Default => "default",
            Keyword::Catch => "catch",
            Keyword::Label(name) => name,
            Keyword::Return => "return",
            Keyword::Throw => "throw",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Goto(_) => "goto",
        }
    }

    /// `return`, `throw`, `break`, `continue` and `goto` leave the current block
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            Keyword::Return | Keyword::Throw | Keyword::Break | Keyword::Continue | Keyword::Goto(_)
        )
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, Keyword::While | Keyword::DoWhile | Keyword::For)
    }
}

/// The shape of a node. Operand layout per kind:
///
/// - `Unary`, `Cast`, `Member`: `[operand]`
/// - `Binary`, `Subscript`: `[lhs, rhs]`
/// - `Call`: `[object?, args..]`
/// - `Ternary`: `[cond, then, else]`
/// - `If`: `[cond, then, else?]`, `While`/`Switch`: `[cond, body]`, `DoWhile`: `[body, cond]`,
///   `For`: `[init, cond, step, body]` with `Empty` for missing clauses
/// - `Return`/`Throw`/`Case`: `[value?]`, `Catch`: `[body]`
/// - `Block`: statements
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Literal(Literal),
    Identifier {
        name: String,
        /// Value of an enumerator constant
        enumerator: Option<i64>,
    },
    Unary(UnaryOp),
    Binary(BinaryOp),
    Call(CallInfo),
    Member {
        name: String,
        arrow: bool,
    },
    Subscript,
    Cast,
    Ternary,
    Keyword(Keyword),
    Block,
    Empty,
}

/// Provenance flags, only consulted by suppression rules
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeFlags {
    pub macro_expanded: bool,
    pub in_template: bool,
    pub ifdef_span: bool,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub operands: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub loc: SourceLoc,
    pub facts: Vec<ValueFact>,
    pub variable: Option<VarId>,
    pub value_type: Option<ValueType>,
    pub flags: NodeFlags,
}

impl Node {
    pub fn new(kind: NodeKind, operands: Vec<NodeId>, loc: SourceLoc) -> Self {
        Self {
            kind,
            operands,
            parent: None,
            loc,
            facts: Vec::new(),
            variable: None,
            value_type: None,
            flags: NodeFlags::default(),
        }
    }

    pub fn binary_op(&self) -> Option<BinaryOp> {
        match self.kind {
            NodeKind::Binary(op) => Some(op),
            _ => None,
        }
    }

    pub fn unary_op(&self) -> Option<UnaryOp> {
        match self.kind {
            NodeKind::Unary(op) => Some(op),
            _ => None,
        }
    }

    pub fn keyword(&self) -> Option<&Keyword> {
        match &self.kind {
            NodeKind::Keyword(kw) => Some(kw),
            _ => None,
        }
    }

    pub fn literal(&self) -> Option<&Literal> {
        match &self.kind {
            NodeKind::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn call(&self) -> Option<&CallInfo> {
        match &self.kind {
            NodeKind::Call(info) => Some(info),
            _ => None,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.binary_op().map_or(false, BinaryOp::is_comparison)
    }

    pub fn is_logical(&self) -> bool {
        self.binary_op().map_or(false, BinaryOp::is_logical)
    }

    pub fn is_not(&self) -> bool {
        self.unary_op() == Some(UnaryOp::Not)
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, NodeKind::Literal(_))
    }

    /// Numeric literal (int, float or char), booleans excluded
    pub fn is_number(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Literal(Literal::Int { .. })
                | NodeKind::Literal(Literal::Float { .. })
                | NodeKind::Literal(Literal::Char { .. })
        )
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, NodeKind::Block)
    }
}
