use crate::analysis::analysis_result::{ConfigError, Result};
use crate::analysis::diagnostics::{DiagnosticCause, Severity};
use crate::analysis::platform::Platform;
use log::warn;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation, shared between the caller and a running pass
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug)]
pub struct AnalysisOption {
    pub platform: Platform,
    /// Report findings the checkers are not sure about
    pub inconclusive: bool,
    pub enable_style: bool,
    pub enable_warning: bool,
    pub suppressed_warnings: Option<Vec<DiagnosticCause>>,
    pub stop: StopFlag,
}

impl Default for AnalysisOption {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            inconclusive: false,
            enable_style: true,
            enable_warning: true,
            suppressed_warnings: None,
            stop: StopFlag::new(),
        }
    }
}

impl AnalysisOption {
    pub fn from_args(args: &mut Vec<String>) -> Self {
        let mut indices_to_remove = vec![];
        let mut res = Self::default();
        for (i, arg) in args.iter().enumerate() {
            if !arg.starts_with("--") {
                continue;
            }
            let value = args.get(i + 1).map(String::as_str);
            match &arg[2..] {
                "inconclusive" => {
                    res.inconclusive = true;
                    indices_to_remove.push(i);
                }
                "platform" => {
                    match value.map(Self::get_platform) {
                        Some(Ok(platform)) => res.platform = platform,
                        Some(Err(e)) => {
                            warn!("{}, use unspecified platform as default", e);
                            res.platform = Platform::unspecified();
                        }
                        None => warn!("Missing platform, use native platform as default"),
                    }
                    indices_to_remove.push(i);
                    if value.is_some() {
                        indices_to_remove.push(i + 1);
                    }
                }
                "enable" => {
                    match value.map(Self::get_enabled_severities) {
                        Some(Ok(enabled)) => {
                            res.enable_style = enabled.contains(&Severity::Style);
                            res.enable_warning = enabled.contains(&Severity::Warning);
                        }
                        _ => warn!("Invalid severity list, enable all severities by default"),
                    }
                    indices_to_remove.push(i);
                    if value.is_some() {
                        indices_to_remove.push(i + 1);
                    }
                }
                "suppress_warnings" => {
                    if let Some(suppressed_warnings) = value.and_then(Self::get_suppressed_warnings)
                    {
                        res.suppressed_warnings = Some(suppressed_warnings);
                    } else {
                        warn!("Invalid suppressed warning types, will not suppress any warnings by default");
                    }
                    indices_to_remove.push(i);
                    if value.is_some() {
                        indices_to_remove.push(i + 1);
                    }
                }
                _ => {}
            }
        }
        indices_to_remove.sort_unstable();
        indices_to_remove.dedup();
        indices_to_remove.reverse();
        Self::remove_multiple(args, &indices_to_remove);
        res
    }

    pub fn is_enabled(&self, severity: Severity) -> bool {
        match severity {
            Severity::Style => self.enable_style,
            Severity::Warning => self.enable_warning,
        }
    }

    pub fn is_suppressed(&self, cause: DiagnosticCause) -> bool {
        self.suppressed_warnings
            .as_ref()
            .map_or(false, |suppressed| suppressed.contains(&cause))
    }

    /// A preset name, or a path to a JSON platform file
    fn get_platform(arg: &str) -> Result<Platform> {
        if arg.ends_with(".json") {
            Platform::from_file(Path::new(arg))
        } else {
            Platform::from_name(arg)
        }
    }

    fn get_enabled_severities(arg: &str) -> Result<Vec<Severity>> {
        let mut res = Vec::new();
        for item in arg.split(',') {
            match item {
                "style" => res.push(Severity::Style),
                "warning" => res.push(Severity::Warning),
                "all" => res.extend_from_slice(&[Severity::Style, Severity::Warning]),
                _ => {
                    return Err(ConfigError::InvalidOption {
                        option: "enable".to_owned(),
                        value: arg.to_owned(),
                    }
                    .into())
                }
            }
        }
        Ok(res)
    }

    fn get_suppressed_warnings(arg: &str) -> Option<Vec<DiagnosticCause>> {
        let mut res = Vec::new();
        for ch in arg.chars() {
            match ch {
                'b' => res.push(DiagnosticCause::Bitwise),        // Bit masks
                'c' => res.push(DiagnosticCause::Comparison),     // Sibling/nested conditions
                'l' => res.push(DiagnosticCause::Logic),          // Logical operators
                'o' => res.push(DiagnosticCause::Overflow),       // Overflow tests
                't' => res.push(DiagnosticCause::TypeRange),      // Type ranges
                'k' => res.push(DiagnosticCause::KnownCondition), // Known conditions
                _ => return None,                                 // Invalid flags
            }
        }
        if res.is_empty() {
            None
        } else {
            Some(res)
        }
    }

    // Remove a list of indices from a vector
    // From https://stackoverflow.com/questions/57947441/remove-a-sequence-of-values-from-a-vec-in-rust
    fn remove_multiple<T>(source: &mut Vec<T>, indices_to_remove: &[usize]) -> Vec<T> {
        indices_to_remove
            .iter()
            .copied()
            .map(|i| source.swap_remove(i))
            .collect()
    }
}
