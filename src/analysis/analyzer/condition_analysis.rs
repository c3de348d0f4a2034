use crate::analysis::analysis_result::{AnalysisError, AnalysisInfo, Result};
use crate::analysis::analyzer::analysis_trait::StaticAnalysis;
use crate::analysis::ast::tree::Ast;
use crate::analysis::diagnostics::{Diagnostic, DiagnosticSink};
use crate::analysis::global_context::GlobalContext;
use crate::analysis::option::AnalysisOption;
use crate::checker::checker_trait::CHECKS;
use std::time::Instant;

/// Runs every condition check over one translation unit and emits the diagnoses
pub struct ConditionAnalysis<'ast, 'a, 's> {
    /// The global context
    pub context: &'a mut GlobalContext<'ast>,
    sink: &'s mut dyn DiagnosticSink,
}

impl<'ast, 'a, 's> StaticAnalysis<'ast, 'a, 's> for ConditionAnalysis<'ast, 'a, 's> {
    fn new(context: &'a mut GlobalContext<'ast>, sink: &'s mut dyn DiagnosticSink) -> Self {
        ConditionAnalysis { context, sink }
    }

    fn emit_diagnostics(&mut self) -> usize {
        let mut diagnostics: Vec<Diagnostic> = std::mem::take(&mut self.context.buffered_diagnostics);

        // Stable: diagnoses at the same location keep the order of the checks
        diagnostics.sort_by(Diagnostic::compare);

        let options = &self.context.analysis_options;
        let diagnostics_to_emit: Vec<Diagnostic> = diagnostics
            .into_iter()
            .filter(|diag| options.is_enabled(diag.severity))
            .filter(|diag| options.inconclusive || !diag.is_inconclusive())
            .filter(|diag| {
                // According to `suppress_warnings` flag, filter out warnings that users want to ignore
                if options.is_suppressed(diag.cause) {
                    debug!("Suppressed {}", diag);
                    false
                } else {
                    true
                }
            })
            .collect();

        let count = diagnostics_to_emit.len();
        for diag in diagnostics_to_emit {
            self.sink.report(diag);
        }
        count
    }

    fn run(&mut self) -> Result<AnalysisInfo> {
        let timer = Instant::now();

        info!("================== Condition Analysis Starts ==================");
        info!("Platform: {:?}", self.context.analysis_options.platform.kind);

        let mut checks_run = 0;
        for check in CHECKS.iter() {
            if self.context.should_stop() {
                warn!("Analysis cancelled before {}", check.name);
                break;
            }
            debug!("Running {}", check.name);
            (check.run)(&mut *self.context);
            checks_run += 1;
        }

        info!("================== Condition Analysis Ends ==================");

        info!("================== Start To Output Diagnostics ==================");
        let diagnostics_emitted = self.emit_diagnostics();

        if self.context.should_stop() {
            return Err(AnalysisError::Cancelled.into());
        }

        Ok(AnalysisInfo {
            analysis_time: timer.elapsed(),
            checks_run,
            diagnostics_emitted,
        })
    }
}

/// Analyzes one translation unit whose value facts are already attached
pub fn check_translation_unit(
    ast: &Ast,
    options: AnalysisOption,
    sink: &mut dyn DiagnosticSink,
) -> Result<AnalysisInfo> {
    let mut context = GlobalContext::new(ast, options);
    let mut analysis = ConditionAnalysis::new(&mut context, sink);
    let info = analysis.run()?;
    info!("{:?}", info);
    Ok(info)
}
