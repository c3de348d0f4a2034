use crate::analysis::ast::node::NodeId;
use crate::analysis::ast::tree::Ast;
use crate::analysis::diagnostics::{DiagCache, Diagnostic};
use crate::analysis::option::AnalysisOption;
use crate::analysis::oracle::equivalence::{EquivalenceOracle, StructuralEquivalence};
use crate::analysis::oracle::mutation::{MutationOracle, SyntacticMutationOracle};
use std::fmt;

/// Stores the global information of one pass over a translation unit
pub struct GlobalContext<'ast> {
    /// The expression tree under analysis, with value facts already attached
    pub ast: &'ast Ast,

    /// Customized options that may change the behavior of the analysis
    pub analysis_options: AnalysisOption,

    pub equivalence: Box<dyn EquivalenceOracle>,

    pub mutation: Box<dyn MutationOracle>,

    /// Nodes that already produced a report
    pub diag_cache: DiagCache,

    /// Generated diagnostic messages, in the order the checkers produced them
    pub buffered_diagnostics: Vec<Diagnostic>,
}

impl<'ast> fmt::Debug for GlobalContext<'ast> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalContext")
    }
}

impl<'ast> GlobalContext<'ast> {
    /// A context using the structural equivalence and syntactic mutation oracles
    pub fn new(ast: &'ast Ast, analysis_options: AnalysisOption) -> Self {
        Self::with_oracles(
            ast,
            analysis_options,
            Box::new(StructuralEquivalence),
            Box::new(SyntacticMutationOracle),
        )
    }

    pub fn with_oracles(
        ast: &'ast Ast,
        analysis_options: AnalysisOption,
        equivalence: Box<dyn EquivalenceOracle>,
        mutation: Box<dyn MutationOracle>,
    ) -> Self {
        info!("Initializing GlobalContext with {} nodes", ast.len());
        Self {
            ast,
            analysis_options,
            equivalence,
            mutation,
            diag_cache: DiagCache::new(),
            buffered_diagnostics: Vec::new(),
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        debug!("Buffered {} {}", diagnostic.id, diagnostic.message);
        self.buffered_diagnostics.push(diagnostic);
    }

    /// Returns true if `node` was already reported, otherwise marks it as reported
    pub fn diag(&mut self, node: NodeId) -> bool {
        self.diag_cache.check_and_insert(self.ast, node)
    }

    pub fn already_reported(&self, node: NodeId) -> bool {
        self.diag_cache.contains(self.ast, node)
    }

    pub fn should_stop(&self) -> bool {
        self.analysis_options.stop.is_stopped()
    }

    pub fn same(&self, a: NodeId, b: NodeId) -> bool {
        self.equivalence.same(self.ast, a, b)
    }

    pub fn opposite(&self, a: NodeId, b: NodeId) -> bool {
        self.equivalence.opposite(self.ast, a, b)
    }

    pub fn mutually_exclusive(&self, a: NodeId, b: NodeId) -> bool {
        self.equivalence.mutually_exclusive(self.ast, a, b)
    }
}
