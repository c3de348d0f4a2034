use failure::Error;
use failure::Fail;
use std::fmt;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Debug for AnalysisInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnalysisInfo {{ checks: {}, diagnostics: {}, time: {:?} }}",
            self.checks_run, self.diagnostics_emitted, self.analysis_time
        )
    }
}

impl fmt::Debug for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnalysisError",)
    }
}

#[derive(Fail)]
pub enum AnalysisError {
    #[fail(display = "Analysis cancelled")]
    Cancelled,
}

/// Errors raised while building the configuration of a pass
#[derive(Debug, Fail)]
pub enum ConfigError {
    #[fail(display = "Cannot read platform file {}: {}", path, reason)]
    UnreadablePlatformFile { path: String, reason: String },
    #[fail(display = "Malformed platform description: {}", _0)]
    MalformedPlatform(String),
    #[fail(display = "Unknown platform '{}'", _0)]
    UnknownPlatform(String),
    #[fail(display = "Invalid value '{}' for option --{}", value, option)]
    InvalidOption { option: String, value: String },
}

pub struct AnalysisInfo {
    pub analysis_time: Duration,
    /// Number of checkers that ran to completion
    pub checks_run: usize,
    pub diagnostics_emitted: usize,
}
