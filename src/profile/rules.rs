//! Path tagging rules
//!
//! The profiler never hard-codes substring checks in control flow; it asks a
//! [`RuleSet`] which tags a path carries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathTag {
    Tests,
    Documentation,
    CiCd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Case-sensitive substring
    Contains(&'static str),
    /// Substring compared after lower-casing the path; pattern must be lower-case
    ContainsIgnoreCase(&'static str),
}

impl Matcher {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Matcher::Contains(pattern) => path.contains(pattern),
            Matcher::ContainsIgnoreCase(pattern) => path.to_lowercase().contains(pattern),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRule {
    pub matcher: Matcher,
    pub tag: PathTag,
}

// Test rules are coarse substring checks: "latest.txt" or "inspect.py" tag
// as tests too.
pub const DEFAULT_RULES: &[PathRule] = &[
    PathRule {
        matcher: Matcher::Contains("test"),
        tag: PathTag::Tests,
    },
    PathRule {
        matcher: Matcher::Contains("spec"),
        tag: PathTag::Tests,
    },
    PathRule {
        matcher: Matcher::Contains("__tests__"),
        tag: PathTag::Tests,
    },
    PathRule {
        matcher: Matcher::ContainsIgnoreCase("readme"),
        tag: PathTag::Documentation,
    },
    PathRule {
        matcher: Matcher::ContainsIgnoreCase("docs"),
        tag: PathTag::Documentation,
    },
    PathRule {
        matcher: Matcher::Contains(".github/workflows"),
        tag: PathTag::CiCd,
    },
    PathRule {
        matcher: Matcher::Contains(".gitlab-ci"),
        tag: PathTag::CiCd,
    },
    PathRule {
        matcher: Matcher::Contains("Jenkinsfile"),
        tag: PathTag::CiCd,
    },
];

#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<PathRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<PathRule>) -> Self {
        Self { rules }
    }

    pub fn with_rule(mut self, rule: PathRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn tags_for(&self, path: &str) -> BTreeSet<PathTag> {
        self.rules
            .iter()
            .filter(|rule| rule.matcher.matches(path))
            .map(|rule| rule.tag)
            .collect()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }
}
