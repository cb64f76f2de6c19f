use super::llm_helper;
use crate::generate::{DOCKERFILE, ENV_EXAMPLE, GITHUB_ACTIONS};
use crate::llm::LLMClient;
use crate::pipeline::{
    AgentPhase, PhaseContribution, PipelineConfig, PipelineState, PipelineStep,
    VerificationCheck, VerificationReport,
};
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

pub const REPORT_FILE: &str = "verification-report.md";

/// Profiles below this confidence are flagged for manual review
pub const LOW_CONFIDENCE_THRESHOLD: u8 = 40;

const SYSTEM_PROMPT: &str = "You review generated deployment files. Reply with JSON only: \
{\"approved\": true|false, \"issues\": [\"...\"]}. List concrete problems, not style preferences.";

#[derive(Debug, Deserialize)]
struct ModelReview {
    approved: bool,
    #[serde(default)]
    issues: Vec<String>,
}

fn env_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9_]*=.*$").expect("static regex"))
}

/// Static checks over the generated artifacts plus an optional model review
pub struct VerifierPhase {
    llm_client: Arc<dyn LLMClient>,
    config: PipelineConfig,
}

impl VerifierPhase {
    pub fn new(llm_client: Arc<dyn LLMClient>, config: PipelineConfig) -> Self {
        Self { llm_client, config }
    }

    fn static_checks(state: &PipelineState) -> Vec<VerificationCheck> {
        let mut checks = Vec::new();

        let dockerfile = state.generated_file(DOCKERFILE).unwrap_or_default();
        let stages = dockerfile
            .lines()
            .filter(|l| l.trim_start().starts_with("FROM "))
            .count();
        checks.push(check(
            "dockerfile_base_image",
            stages > 0,
            format!("{} build stage(s)", stages),
        ));
        checks.push(check(
            "dockerfile_exposes_port",
            dockerfile.lines().any(|l| l.starts_with("EXPOSE ")),
            "EXPOSE instruction present".to_string(),
        ));

        let workflow = state.generated_file(GITHUB_ACTIONS).unwrap_or_default();
        let (valid, detail) = match serde_yaml::from_str::<serde_yaml::Value>(workflow) {
            Ok(doc) => match doc.get("jobs").and_then(|j| j.as_mapping()) {
                Some(jobs) if !jobs.is_empty() => (true, format!("{} job(s)", jobs.len())),
                _ => (false, "workflow defines no jobs".to_string()),
            },
            Err(err) => (false, format!("invalid YAML: {}", err)),
        };
        checks.push(check("workflow_valid_yaml", valid, detail));

        let env = state.generated_file(ENV_EXAMPLE).unwrap_or_default();
        let bad_lines: Vec<&str> = env
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .filter(|l| !env_line_pattern().is_match(l))
            .collect();
        let has_vars = env.lines().any(|l| env_line_pattern().is_match(l.trim()));
        checks.push(check(
            "env_template_well_formed",
            has_vars && bad_lines.is_empty(),
            if bad_lines.is_empty() {
                "all entries are KEY=value".to_string()
            } else {
                format!("malformed lines: {}", bad_lines.join(", "))
            },
        ));

        checks
    }

    async fn model_review(&self, state: &PipelineState) -> Option<String> {
        let stack = state
            .tech_stack()
            .map(|s| s.primary.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let prompt = format!(
            "Platform: {}\n\n{}:\n{}\n",
            stack,
            DOCKERFILE,
            state.generated_file(DOCKERFILE).unwrap_or_default()
        );

        let reply = match llm_helper::ask(
            self.llm_client.as_ref(),
            &self.config,
            self.name(),
            SYSTEM_PROMPT,
            prompt,
        )
        .await
        {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %format!("{:#}", err), "Model review unavailable");
                return None;
            }
        };

        match llm_helper::parse_json::<ModelReview>(&reply, self.name()) {
            Ok(review) if review.approved && review.issues.is_empty() => {
                Some("Approved with no issues.".to_string())
            }
            Ok(review) => {
                let verdict = if review.approved { "Approved" } else { "Not approved" };
                let mut out = format!("{}. Issues:", verdict);
                for issue in review.issues {
                    let _ = write!(out, "\n- {}", issue);
                }
                Some(out)
            }
            Err(_) => Some(reply.trim().to_string()),
        }
    }
}

fn check(name: &str, passed: bool, detail: String) -> VerificationCheck {
    VerificationCheck {
        name: name.to_string(),
        passed,
        detail,
    }
}

pub fn render_report(report: &VerificationReport, confidence: u8) -> String {
    let mut out = String::from("# Verification report\n\n");
    let _ = writeln!(
        out,
        "Result: **{}**",
        if report.passed { "passed" } else { "failed" }
    );
    let _ = writeln!(out, "Stack confidence: {}%", confidence);
    if report.low_confidence {
        let _ = writeln!(
            out,
            "\n> Low confidence stack detection. Review the generated files by hand."
        );
    }

    out.push_str("\n| Check | Status | Detail |\n|---|---|---|\n");
    for c in &report.checks {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            c.name,
            if c.passed { "pass" } else { "fail" },
            c.detail.replace('|', "\\|")
        );
    }

    if let Some(review) = &report.review {
        let _ = write!(out, "\n## Model review\n\n{}\n", review);
    }
    out
}

#[async_trait]
impl AgentPhase for VerifierPhase {
    fn name(&self) -> &'static str {
        "verifier"
    }

    fn step(&self) -> PipelineStep {
        PipelineStep::Verifying
    }

    async fn execute(&self, state: &PipelineState) -> Result<PhaseContribution> {
        let checks = Self::static_checks(state);
        let confidence = state.tech_stack().map(|s| s.confidence).unwrap_or(0);
        let review = self.model_review(state).await;

        let report = VerificationReport {
            passed: checks.iter().all(|c| c.passed),
            low_confidence: confidence < LOW_CONFIDENCE_THRESHOLD,
            checks,
            review,
        };

        let passed = report.checks.iter().filter(|c| c.passed).count();
        info!(
            passed,
            total = report.checks.len(),
            low_confidence = report.low_confidence,
            "Verification finished"
        );

        let mut contribution = PhaseContribution::new().with_message(format!(
            "Verification {}: {}/{} checks passed",
            if report.passed { "passed" } else { "failed" },
            passed,
            report.checks.len()
        ));
        if report.low_confidence {
            contribution = contribution.with_message(format!(
                "Low confidence stack detection ({}%), review artifacts manually",
                confidence
            ));
        }
        if report.review.is_none() {
            contribution = contribution.with_message("Model review skipped");
        }
        let failed: Vec<&str> = report.failed_checks().map(|c| c.name.as_str()).collect();
        if !failed.is_empty() {
            contribution = contribution.with_error(format!("failed checks: {}", failed.join(", ")));
        }

        contribution = contribution.with_file(REPORT_FILE, render_report(&report, confidence));
        contribution.verification = Some(report);
        Ok(contribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::generate;
    use crate::llm::{BackendError, MockLLMClient, MockResponse};
    use crate::profile::CodebaseAnalysis;
    use crate::scan::ProjectStructure;
    use crate::stack::{Platform, TechStackProfile};

    fn generated_state(confidence: u8) -> PipelineState {
        let mut stack = TechStackProfile::unknown();
        stack.primary = Platform::Go;
        stack.confidence = confidence;
        let artifacts =
            generate(&stack, &ProjectStructure::new(), &CodebaseAnalysis::default()).unwrap();

        let mut state = PipelineState::new("https://github.com/acme/svc", "/tmp/svc");
        let mut contribution = PhaseContribution {
            tech_stack: Some(stack),
            ..PhaseContribution::default()
        };
        for (name, content) in artifacts.named() {
            contribution = contribution.with_file(name, content);
        }
        state.apply("generator", contribution);
        state
    }

    fn failing_client() -> Arc<MockLLMClient> {
        let client = Arc::new(MockLLMClient::new());
        client.add_response(MockResponse::error(BackendError::TimeoutError { seconds: 1 }));
        client
    }

    #[tokio::test]
    async fn test_generated_artifacts_pass() {
        let client = Arc::new(MockLLMClient::new());
        client.add_response(MockResponse::text("```json\n{\"approved\": true, \"issues\": []}\n```"));
        let phase = VerifierPhase::new(client, PipelineConfig::default());

        let contribution = phase.execute(&generated_state(60)).await.unwrap();
        let report = contribution.verification.unwrap();

        assert!(report.passed, "{:?}", report.checks);
        assert!(!report.low_confidence);
        assert_eq!(report.review.as_deref(), Some("Approved with no issues."));
        assert!(contribution.errors.is_empty());
        assert!(contribution.generated_files[REPORT_FILE].contains("Result: **passed**"));
    }

    #[tokio::test]
    async fn test_low_confidence_is_flagged() {
        let phase = VerifierPhase::new(failing_client(), PipelineConfig::default());

        let contribution = phase.execute(&generated_state(20)).await.unwrap();
        let report = contribution.verification.unwrap();

        assert!(report.low_confidence);
        assert!(report.review.is_none());
        assert!(contribution.messages.iter().any(|m| m.contains("Low confidence")));
        assert!(contribution.messages.iter().any(|m| m == "Model review skipped"));
    }

    #[tokio::test]
    async fn test_missing_artifacts_fail_checks() {
        let phase = VerifierPhase::new(failing_client(), PipelineConfig::default());
        let state = PipelineState::new("https://github.com/acme/svc", "/tmp/svc");

        let contribution = phase.execute(&state).await.unwrap();
        let report = contribution.verification.unwrap();

        assert!(!report.passed);
        assert_eq!(report.failed_checks().count(), 4);
        assert_eq!(contribution.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_unstructured_review_kept_verbatim() {
        let client = Arc::new(MockLLMClient::new());
        client.add_response(MockResponse::text("Looks reasonable overall."));
        let phase = VerifierPhase::new(client, PipelineConfig::default());

        let contribution = phase.execute(&generated_state(60)).await.unwrap();

        assert_eq!(
            contribution.verification.unwrap().review.as_deref(),
            Some("Looks reasonable overall.")
        );
    }

    #[tokio::test]
    async fn test_review_lists_issues() {
        let client = Arc::new(MockLLMClient::new());
        client.add_response(MockResponse::text(
            "{\"approved\": false, \"issues\": [\"runs as root\"]}",
        ));
        let phase = VerifierPhase::new(client, PipelineConfig::default());

        let contribution = phase.execute(&generated_state(60)).await.unwrap();
        let review = contribution.verification.unwrap().review.unwrap();

        assert!(review.starts_with("Not approved"));
        assert!(review.contains("- runs as root"));
    }
}
