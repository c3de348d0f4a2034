use crate::analysis::analysis_result::{AnalysisInfo, Result};
use crate::analysis::diagnostics::DiagnosticSink;
use crate::analysis::global_context::GlobalContext;

/// General trait for static analysis
/// Developers may reuse this trait to implement their own analysis
pub trait StaticAnalysis<'ast, 'a, 's> {
    fn new(context: &'a mut GlobalContext<'ast>, sink: &'s mut dyn DiagnosticSink) -> Self;
    fn run(&mut self) -> Result<AnalysisInfo>;
    /// Sends the buffered diagnostics to the sink, returns how many were emitted
    fn emit_diagnostics(&mut self) -> usize;
}
