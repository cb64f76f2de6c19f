//! Technology stack classification
//!
//! - [`Platform`]: the closed set of primary platforms the generator knows
//! - [`TechStackProfile`]: what the classifier concluded about a snapshot
//! - [`classify`]: decision table over signal files and manifest contents

mod classifier;
mod manifest;

pub use classifier::{classify, classify_with_diagnostics, Classification};
pub use manifest::{NodeManifest, PythonManifest};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence awarded per independent signal, capped at 100
pub const CONFIDENCE_PER_SIGNAL: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "Node.js")]
    NodeJs,
    Python,
    Go,
    Rust,
    Java,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::NodeJs => "Node.js",
            Platform::Python => "Python",
            Platform::Go => "Go",
            Platform::Rust => "Rust",
            Platform::Java => "Java",
            Platform::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Platform::Unknown
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechStackProfile {
    pub primary: Platform,
    pub frontend: Vec<String>,
    pub backend: Vec<String>,
    pub database: Vec<String>,
    pub deployment: Vec<String>,
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    /// 0-100, grows with the number of independent signals matched
    pub confidence: u8,
}

impl TechStackProfile {
    pub fn unknown() -> Self {
        Self {
            primary: Platform::Unknown,
            frontend: Vec::new(),
            backend: Vec::new(),
            database: Vec::new(),
            deployment: Vec::new(),
            languages: Vec::new(),
            frameworks: Vec::new(),
            confidence: 0,
        }
    }

    pub fn confidence_for(signals: usize) -> u8 {
        let raw = signals.saturating_mul(CONFIDENCE_PER_SIGNAL as usize);
        raw.min(100) as u8
    }

    /// Case-insensitive substring search across every list in the profile
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.all_entries()
            .any(|entry| entry.to_lowercase().contains(&needle))
    }

    pub fn has_frontend(&self) -> bool {
        !self.frontend.is_empty()
    }

    pub fn has_backend(&self) -> bool {
        !self.backend.is_empty()
    }

    pub fn has_framework(&self, name: &str) -> bool {
        self.frameworks.iter().any(|f| f == name) || self.backend.iter().any(|b| b == name)
    }

    fn all_entries(&self) -> impl Iterator<Item = &String> {
        self.frontend
            .iter()
            .chain(&self.backend)
            .chain(&self.database)
            .chain(&self.deployment)
            .chain(&self.languages)
            .chain(&self.frameworks)
    }
}

impl Default for TechStackProfile {
    fn default() -> Self {
        Self::unknown()
    }
}
