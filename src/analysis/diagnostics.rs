use crate::analysis::ast::node::{NodeId, SourceLoc};
use crate::analysis::ast::tree::Ast;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// Define the cause of a diagnostic message
/// Used to provide user options to suppress some specific kinds of warnings
/// So that we can decrease the false-positive rate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticCause {
    Bitwise,        // Bit masks compared or assigned inconsistently
    Comparison,     // Sibling or nested conditions
    Logic,          // Logical operators that are always true/false or redundant
    Overflow,       // Tests for signed or pointer overflow
    TypeRange,      // Comparisons against values outside the type range
    KnownCondition, // Conditions with a known value
    Other,          // Other
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Style,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Style => write!(f, "style"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagCertainty {
    Normal,
    Inconclusive,
}

pub const CWE398: u32 = 398;
pub const CWE570: u32 = 570;
pub const CWE571: u32 = 571;

/// A finding, with the locations that explain it.
/// The last entry of `error_path` is the primary location.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub error_path: Vec<(SourceLoc, String)>,
    pub id: &'static str,
    pub severity: Severity,
    pub message: String,
    pub cwe: u32,
    pub certainty: DiagCertainty,
    pub cause: DiagnosticCause,
}

impl Diagnostic {
    pub fn new(
        id: &'static str,
        severity: Severity,
        message: String,
        cwe: u32,
        cause: DiagnosticCause,
    ) -> Self {
        Self {
            error_path: Vec::new(),
            id,
            severity,
            message,
            cwe,
            certainty: DiagCertainty::Normal,
            cause,
        }
    }

    /// Appends a location to the error path
    pub fn at(mut self, ast: &Ast, node: NodeId, explanation: &str) -> Self {
        self.error_path
            .push((ast.node(node).loc.clone(), explanation.to_owned()));
        self
    }

    pub fn inconclusive(mut self, inconclusive: bool) -> Self {
        if inconclusive {
            self.certainty = DiagCertainty::Inconclusive;
        }
        self
    }

    pub fn is_inconclusive(&self) -> bool {
        self.certainty == DiagCertainty::Inconclusive
    }

    pub fn primary_location(&self) -> Option<&SourceLoc> {
        self.error_path.last().map(|(loc, _)| loc)
    }

    pub fn compare(x: &Diagnostic, y: &Diagnostic) -> Ordering {
        x.primary_location().cmp(&y.primary_location())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = self.primary_location() {
            write!(f, "{}: ", loc)?;
        }
        write!(f, "{}: {} [{}]", self.severity, self.message, self.id)?;
        if self.is_inconclusive() {
            write!(f, " (inconclusive)")?;
        }
        Ok(())
    }
}

/// Receives the diagnostics of a pass, in source order
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

#[derive(Debug, Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn ids(&self) -> Vec<&'static str> {
        self.diagnostics.iter().map(|d| d.id).collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

/// Nodes that already served as the basis of a report.
///
/// A node counts as reported if it, or any ancestor reached through `!`, `&&` and `||`,
/// is in the set, so one finding does not cascade into reports on its sub-conditions.
#[derive(Debug, Default)]
pub struct DiagCache {
    reported: HashSet<NodeId>,
}

impl DiagCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, ast: &Ast, node: NodeId) -> bool {
        if self.reported.contains(&node) {
            return true;
        }
        for ancestor in ast.ancestors(node) {
            let n = ast.node(ancestor);
            if !n.is_not() && !n.is_logical() {
                break;
            }
            if self.reported.contains(&ancestor) {
                return true;
            }
        }
        false
    }

    /// Returns true if `node` was already reported; otherwise records it and returns false
    pub fn check_and_insert(&mut self, ast: &Ast, node: NodeId) -> bool {
        if self.contains(ast, node) {
            return true;
        }
        self.reported.insert(node);
        false
    }

    pub fn len(&self) -> usize {
        self.reported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reported.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ast::builder::AstBuilder;
    use crate::analysis::ast::node::BinaryOp;
    use crate::analysis::ast::value_type::ValueType;

    #[test]
    fn test_cache_walks_logical_ancestors() {
        let mut b = AstBuilder::new("test.c");
        let x = b.local("x", ValueType::int());
        let xr = b.var(x);
        let one = b.int(1);
        let lhs = b.binary(BinaryOp::Eq, xr, one);
        let xr2 = b.var(x);
        let two = b.int(2);
        let rhs = b.binary(BinaryOp::Eq, xr2, two);
        let or = b.binary(BinaryOp::LogicalOr, lhs, rhs);
        let not = b.not(or);
        let ast = b.finish();

        let mut cache = DiagCache::new();
        assert!(!cache.check_and_insert(&ast, not));
        assert!(cache.check_and_insert(&ast, not));
        assert!(cache.contains(&ast, lhs));
        assert!(cache.contains(&ast, rhs));
        // Operands of the comparison are not reached through a logical chain
        assert!(!cache.contains(&ast, xr));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_compare_by_primary_location() {
        let mut b = AstBuilder::new("test.c");
        b.line(3);
        let early = b.int(1);
        b.line(7);
        let late = b.int(2);
        let ast = b.finish();

        let first = Diagnostic::new("a", Severity::Style, String::new(), CWE398, DiagnosticCause::Other)
            .at(&ast, late, "")
            .at(&ast, early, "");
        let second = Diagnostic::new("b", Severity::Style, String::new(), CWE398, DiagnosticCause::Other)
            .at(&ast, late, "");
        assert_eq!(Diagnostic::compare(&first, &second), Ordering::Less);
        assert_eq!(second.to_string(), "test.c:7:1: style:  [b]");
    }
}
