//! Codebase profiling: summary statistics over a scanned inventory

mod rules;

pub use rules::{Matcher, PathRule, PathTag, RuleSet, DEFAULT_RULES};

use crate::scan::ProjectStructure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Canonical marker paths reported as key files when present
pub const KEY_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "go.mod",
    "Cargo.toml",
    "pom.xml",
    "build.gradle",
    "Dockerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    ".github/workflows",
    "README.md",
    "LICENSE",
    ".gitignore",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebaseAnalysis {
    pub file_count: usize,
    pub directories: usize,
    pub total_size: u64,
    pub has_tests: bool,
    pub has_documentation: bool,
    pub has_cicd: bool,
    pub key_files: Vec<String>,
}

pub fn profile(inventory: &ProjectStructure) -> CodebaseAnalysis {
    profile_with_rules(inventory, &RuleSet::default())
}

pub fn profile_with_rules(inventory: &ProjectStructure, rules: &RuleSet) -> CodebaseAnalysis {
    let mut analysis = CodebaseAnalysis::default();
    let mut tags = BTreeSet::new();

    for (path, entry) in inventory.iter() {
        if entry.is_file() {
            analysis.file_count += 1;
            analysis.total_size += entry.size;
        } else {
            analysis.directories += 1;
        }
        tags.extend(rules.tags_for(path));
    }

    analysis.has_tests = tags.contains(&PathTag::Tests);
    analysis.has_documentation = tags.contains(&PathTag::Documentation);
    analysis.has_cicd = tags.contains(&PathTag::CiCd);
    analysis.key_files = KEY_FILES
        .iter()
        .filter(|marker| inventory.contains(marker))
        .map(|marker| marker.to_string())
        .collect();

    analysis
}
