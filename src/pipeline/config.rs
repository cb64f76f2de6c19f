use crate::scan::ScanConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the orchestrator does when a phase returns an error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the error in the state and run the next phase
    #[default]
    ContinueOnError,
    /// Stop the run at the first failing phase
    AbortOnError,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" | "continue_on_error" => Ok(FailurePolicy::ContinueOnError),
            "abort" | "abort_on_error" => Ok(FailurePolicy::AbortOnError),
            other => Err(format!(
                "unknown failure policy '{}', expected 'continue' or 'abort'",
                other
            )),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::ContinueOnError => f.write_str("continue"),
            FailurePolicy::AbortOnError => f.write_str("abort"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub failure_policy: FailurePolicy,
    pub scan: ScanConfig,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            scan: ScanConfig::default(),
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_scan_config(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}
