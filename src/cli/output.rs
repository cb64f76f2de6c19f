//! Output formatting for analysis reports
//!
//! JSON and YAML serialize the report as-is; the human format is a compact
//! terminal summary.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::StackpilotConfig;
use crate::pipeline::VerificationReport;
use crate::profile::CodebaseAnalysis;
use crate::service::ResultsResponse;
use crate::stack::TechStackProfile;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

/// What `analyze` and `inspect` print
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Repository URL or local path
    pub source: String,
    pub tech_stack: TechStackProfile,
    pub codebase_analysis: CodebaseAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationReport>,
    pub generated_files: Vec<String>,
    pub messages: Vec<String>,
    pub errors: Vec<String>,
}

impl From<&ResultsResponse> for AnalysisReport {
    fn from(results: &ResultsResponse) -> Self {
        Self {
            source: results.metadata.repo_url.clone(),
            tech_stack: results.tech_stack.clone(),
            codebase_analysis: results.codebase_analysis.clone(),
            verification: results.verification_results.clone(),
            generated_files: results.files.keys().cloned().collect(),
            messages: results
                .messages
                .iter()
                .map(|m| format!("[{}] {}", m.agent, m.message))
                .collect(),
            errors: results.errors.clone(),
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_report(&self, report: &AnalysisReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize analysis report to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("Failed to serialize analysis report to YAML")
            }
            OutputFormat::Human => Ok(self.format_report_human(report)),
        }
    }

    pub fn format_config(&self, config: &StackpilotConfig) -> Result<String> {
        let config_map: std::collections::BTreeMap<_, _> =
            config.to_display_map().into_iter().collect();
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&config_map)
                .context("Failed to serialize config to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&config_map).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human => Ok(config.to_string()),
        }
    }

    fn format_report_human(&self, report: &AnalysisReport) -> String {
        let stack = &report.tech_stack;
        let analysis = &report.codebase_analysis;
        let mut output = String::new();

        output.push_str(&format!("\u{2713} Analysis of {}\n", report.source));
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Platform:    {}\n", stack.primary));
        output.push_str(&format!("Languages:   {}\n", list_or_none(&stack.languages)));
        output.push_str(&format!("Frameworks:  {}\n", list_or_none(&stack.frameworks)));
        output.push_str(&format!("Databases:   {}\n", list_or_none(&stack.database)));

        let filled_blocks = (stack.confidence as usize / 10).min(10);
        let confidence_bar =
            "\u{2588}".repeat(filled_blocks) + &"\u{2591}".repeat(10 - filled_blocks);
        output.push_str(&format!(
            "Confidence:  {} {}%\n\n",
            confidence_bar, stack.confidence
        ));

        output.push_str("Codebase:\n");
        output.push_str(&format!(
            "\u{251C}\u{2500} Files:   {} in {} directories ({} bytes)\n",
            analysis.file_count, analysis.directories, analysis.total_size
        ));
        output.push_str(&format!(
            "\u{251C}\u{2500} Tests:   {}\n",
            yes_no(analysis.has_tests)
        ));
        output.push_str(&format!(
            "\u{251C}\u{2500} Docs:    {}\n",
            yes_no(analysis.has_documentation)
        ));
        output.push_str(&format!(
            "\u{2514}\u{2500} CI/CD:   {}\n\n",
            yes_no(analysis.has_cicd)
        ));

        output.push_str("Generated:\n");
        for (i, name) in report.generated_files.iter().enumerate() {
            let connector = if i + 1 == report.generated_files.len() {
                "\u{2514}"
            } else {
                "\u{251C}"
            };
            output.push_str(&format!("{}\u{2500} {}\n", connector, name));
        }

        if let Some(verification) = &report.verification {
            let verdict = if verification.passed {
                "passed"
            } else {
                "failed"
            };
            output.push_str(&format!("\nVerification: {}\n", verdict));
            for check in verification.failed_checks() {
                output.push_str(&format!("  \u{2717} {}: {}\n", check.name, check.detail));
            }
        }

        if !report.errors.is_empty() {
            output.push_str("\n\u{26A0} Errors:\n");
            for error in &report.errors {
                output.push_str(&format!("  - {}\n", error));
            }
        }

        output
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
