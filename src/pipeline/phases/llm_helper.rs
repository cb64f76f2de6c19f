use crate::llm::{LLMClient, LLMRequest};
use crate::pipeline::PipelineConfig;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::debug;

pub fn extract_json_from_markdown(content: &str) -> &str {
    let trimmed = content.trim();

    if let Some(start_idx) = trimmed.find("```json") {
        let after_fence = &trimmed[start_idx + 7..];
        if let Some(end_idx) = after_fence.find("```") {
            return after_fence[..end_idx].trim();
        }
    }

    if let Some(start_idx) = trimmed.find("```") {
        let after_fence = &trimmed[start_idx + 3..];
        if let Some(end_idx) = after_fence.find("```") {
            return after_fence[..end_idx].trim();
        }
    }

    trimmed
}

/// Sends a system + user prompt and returns the non-blank reply text
pub async fn ask(
    llm_client: &dyn LLMClient,
    config: &PipelineConfig,
    phase: &str,
    system: &str,
    user: String,
) -> Result<String> {
    let start = Instant::now();

    let request = LLMRequest::prompt(system, user)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens);

    let response = llm_client
        .chat(request)
        .await
        .with_context(|| format!("Failed to call LLM for {}", phase))?;

    debug!(
        phase,
        client = llm_client.name(),
        latency_ms = start.elapsed().as_millis() as u64,
        "LLM replied"
    );

    if response.is_blank() {
        bail!("LLM returned an empty reply for {}", phase);
    }
    Ok(response.content)
}

pub fn parse_json<T: DeserializeOwned>(content: &str, phase: &str) -> Result<T> {
    let json_content = extract_json_from_markdown(content);
    serde_json::from_str(json_content)
        .with_context(|| format!("Failed to parse {} response as JSON", phase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{BackendError, MockLLMClient, MockResponse};
    use serde::Deserialize;

    #[test]
    fn test_extract_json_from_fences() {
        assert_eq!(extract_json_from_markdown("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_json_from_markdown("text ```\n[1]\n``` tail"), "[1]");
        assert_eq!(extract_json_from_markdown("  {\"b\":2} "), "{\"b\":2}");
    }

    #[test]
    fn test_parse_json() {
        #[derive(Deserialize)]
        struct Reply {
            approved: bool,
        }

        let reply: Reply = parse_json("```json\n{\"approved\": true}\n```", "verifier").unwrap();
        assert!(reply.approved);
        assert!(parse_json::<Reply>("looks fine", "verifier").is_err());
    }

    #[tokio::test]
    async fn test_ask_rejects_blank_reply() {
        let client = MockLLMClient::new();
        client.add_response(MockResponse::text("   "));

        let result = ask(&client, &PipelineConfig::default(), "planner", "sys", "hi".into()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ask_propagates_backend_error() {
        let client = MockLLMClient::new();
        client.add_response(MockResponse::error(BackendError::TimeoutError { seconds: 5 }));

        let err = ask(&client, &PipelineConfig::default(), "planner", "sys", "hi".into())
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to call LLM for planner"));
    }
}
