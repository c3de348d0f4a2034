use super::node::{FunctionId, NodeId, ScopeId, VarId};
use super::value_type::ValueType;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    If,
    Else,
    While,
    For,
    DoWhile,
    Switch,
    Catch,
    Other,
}

/// A lexical scope. `body` is `None` only for the global scope.
#[derive(Clone, Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub body: Option<NodeId>,
    pub parent: Option<ScopeId>,
    pub function: Option<FunctionId>,
}

#[derive(Clone, Debug)]
pub struct FunctionInfo {
    pub name: String,
    pub params: Vec<VarId>,
    pub return_type: ValueType,
    pub body: NodeId,
}

/// Storage class and shape of a declared variable
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VariableFlags {
    pub is_local: bool,
    pub is_argument: bool,
    pub is_const: bool,
    pub is_pointer: bool,
    pub is_reference: bool,
    pub is_array: bool,
    pub is_static: bool,
    pub is_global: bool,
}

#[derive(Clone, Debug)]
pub struct Variable {
    pub name: String,
    pub value_type: ValueType,
    pub flags: VariableFlags,
}

impl Variable {
    pub fn new(name: &str, value_type: ValueType, flags: VariableFlags) -> Self {
        Self {
            name: name.to_owned(),
            value_type,
            flags,
        }
    }

    /// Locals and by-value arguments live on the stack of the current function only
    pub fn is_local_storage(&self) -> bool {
        (self.flags.is_local || self.flags.is_argument)
            && !self.flags.is_static
            && !self.flags.is_reference
    }
}
