//! Configuration management for stackpilot
//!
//! Settings come from environment variables, with defaults for everything.
//! `StackpilotConfig::default()` reads the environment; call
//! [`StackpilotConfig::validate`] before using the result.
//!
//! # Environment Variables
//!
//! - `STACKPILOT_PROVIDER`: LLM provider (ollama|openai|anthropic|gemini|xai|groq) - default: "ollama"
//! - `STACKPILOT_MODEL`: Model name - default: "qwen2.5-coder:7b" for Ollama
//! - `STACKPILOT_REQUEST_TIMEOUT`: LLM timeout in seconds - default: "60"
//! - `STACKPILOT_API_BASE_URL`: Custom LLM endpoint - optional
//! - `STACKPILOT_SCRATCH_DIR`: Root for per-session checkouts - default: system temp dir + "stackpilot-sessions"
//! - `STACKPILOT_ALLOWED_HOST`: Only repository host accepted - default: "github.com"
//! - `STACKPILOT_RETENTION_HOURS`: Idle hours before a session is purged - default: "24"
//! - `STACKPILOT_SWEEP_INTERVAL`: Seconds between retention sweeps - default: "3600"
//! - `STACKPILOT_FAILURE_POLICY`: continue|abort - default: "continue"
//! - `STACKPILOT_BIND_ADDR`: HTTP listen address - default: "127.0.0.1:8080"
//! - `STACKPILOT_LOG_LEVEL`: Logging level - default: "info"
//!
//! Provider credentials are read by genai directly (`OPENAI_API_KEY`,
//! `ANTHROPIC_API_KEY`, `GEMINI_API_KEY`, `XAI_API_KEY`, `GROQ_API_KEY`,
//! `OLLAMA_HOST`).

use crate::llm::{GenAIClient, LLMClient};
use crate::pipeline::{FailurePolicy, PipelineConfig};
use genai::adapter::AdapterKind;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5-coder:7b";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_ALLOWED_HOST: &str = "github.com";
const DEFAULT_RETENTION_HOURS: u64 = 24;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid provider: {0}. Valid options: ollama, openai, anthropic, gemini, xai, groq")]
    InvalidProvider(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone)]
pub struct StackpilotConfig {
    pub provider: AdapterKind,

    /// Provider-specific model name
    pub model: String,

    pub request_timeout_secs: u64,

    /// Routes every LLM request to this endpoint when set
    pub api_base_url: Option<String>,

    pub scratch_dir: PathBuf,

    pub allowed_host: String,

    pub retention_hours: u64,

    pub sweep_interval_secs: u64,

    pub failure_policy: FailurePolicy,

    pub bind_addr: String,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

pub fn parse_provider(value: &str) -> Result<AdapterKind, ConfigError> {
    let lower = value.trim().to_lowercase();
    let name = match lower.as_str() {
        "claude" => "anthropic",
        "grok" => "xai",
        other => other,
    };
    AdapterKind::from_lower_str(name).ok_or_else(|| ConfigError::InvalidProvider(value.to_string()))
}

fn default_model(provider: AdapterKind) -> String {
    match provider {
        AdapterKind::Ollama => DEFAULT_OLLAMA_MODEL,
        AdapterKind::OpenAI => "gpt-4o-mini",
        AdapterKind::Anthropic => "claude-3-5-haiku-latest",
        AdapterKind::Gemini => "gemini-2.0-flash",
        AdapterKind::Xai => "grok-3-mini",
        AdapterKind::Groq => "llama-3.1-8b-instant",
        _ => DEFAULT_OLLAMA_MODEL,
    }
    .to_string()
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Default for StackpilotConfig {
    /// Loads `STACKPILOT_*` variables, falling back to defaults for missing
    /// or unparsable values
    fn default() -> Self {
        let provider = env::var("STACKPILOT_PROVIDER")
            .ok()
            .and_then(|s| parse_provider(&s).ok())
            .unwrap_or(AdapterKind::Ollama);

        let model = env::var("STACKPILOT_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_model(provider));

        let api_base_url = env::var("STACKPILOT_API_BASE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty());

        let scratch_dir = env::var("STACKPILOT_SCRATCH_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("stackpilot-sessions"));

        let allowed_host = env::var("STACKPILOT_ALLOWED_HOST")
            .unwrap_or_else(|_| DEFAULT_ALLOWED_HOST.to_string())
            .to_lowercase();

        let log_level = env::var("STACKPILOT_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            provider,
            model,
            request_timeout_secs: env_parse(
                "STACKPILOT_REQUEST_TIMEOUT",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            api_base_url,
            scratch_dir,
            allowed_host,
            retention_hours: env_parse("STACKPILOT_RETENTION_HOURS", DEFAULT_RETENTION_HOURS),
            sweep_interval_secs: env_parse(
                "STACKPILOT_SWEEP_INTERVAL",
                DEFAULT_SWEEP_INTERVAL_SECS,
            ),
            failure_policy: env_parse("STACKPILOT_FAILURE_POLICY", FailurePolicy::default()),
            bind_addr: env::var("STACKPILOT_BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            log_level,
        }
    }
}

impl StackpilotConfig {
    /// Checks ranges, the log level and the bind address. Provider
    /// credentials are checked by genai on first use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if self.retention_hours == 0 {
            return Err(ConfigError::ValidationFailed(
                "Retention must be at least 1 hour".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Sweep interval must be at least 1 second".to_string(),
            ));
        }

        if self.allowed_host.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Allowed host cannot be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::ParseError {
                field: "STACKPILOT_BIND_ADDR".to_string(),
                error: e.to_string(),
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours.saturating_mul(3600))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new().with_failure_policy(self.failure_policy)
    }

    pub fn create_llm_client(&self) -> Arc<dyn LLMClient> {
        Arc::new(GenAIClient::new(
            self.provider,
            self.model.clone(),
            self.request_timeout(),
            self.api_base_url.clone(),
        ))
    }

    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("provider".to_string(), self.provider.as_str().to_string());
        map.insert("model".to_string(), self.model.clone());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        if let Some(ref url) = self.api_base_url {
            map.insert("api_base_url".to_string(), url.clone());
        }
        map.insert(
            "scratch_dir".to_string(),
            self.scratch_dir.display().to_string(),
        );
        map.insert("allowed_host".to_string(), self.allowed_host.clone());
        map.insert(
            "retention_hours".to_string(),
            self.retention_hours.to_string(),
        );
        map.insert(
            "sweep_interval_secs".to_string(),
            self.sweep_interval_secs.to_string(),
        );
        map.insert(
            "failure_policy".to_string(),
            self.failure_policy.to_string(),
        );
        map.insert("bind_addr".to_string(), self.bind_addr.clone());
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for StackpilotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stackpilot Configuration:")?;
        writeln!(f, "  Provider: {}", self.provider.as_str())?;
        writeln!(f, "  Model: {}", self.model)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        if let Some(ref url) = self.api_base_url {
            writeln!(f, "  API Base URL: {}", url)?;
        }
        writeln!(f, "  Scratch Dir: {}", self.scratch_dir.display())?;
        writeln!(f, "  Allowed Host: {}", self.allowed_host)?;
        writeln!(f, "  Retention: {}h", self.retention_hours)?;
        writeln!(f, "  Sweep Interval: {}s", self.sweep_interval_secs)?;
        writeln!(f, "  Failure Policy: {}", self.failure_policy)?;
        writeln!(f, "  Bind Address: {}", self.bind_addr)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn clear_all() -> Vec<EnvGuard> {
        [
            "STACKPILOT_PROVIDER",
            "STACKPILOT_MODEL",
            "STACKPILOT_REQUEST_TIMEOUT",
            "STACKPILOT_API_BASE_URL",
            "STACKPILOT_SCRATCH_DIR",
            "STACKPILOT_ALLOWED_HOST",
            "STACKPILOT_RETENTION_HOURS",
            "STACKPILOT_SWEEP_INTERVAL",
            "STACKPILOT_FAILURE_POLICY",
            "STACKPILOT_BIND_ADDR",
            "STACKPILOT_LOG_LEVEL",
        ]
        .iter()
        .map(|key| EnvGuard::unset(key))
        .collect()
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = clear_all();

        let config = StackpilotConfig::default();

        assert_eq!(config.provider, AdapterKind::Ollama);
        assert_eq!(config.model, DEFAULT_OLLAMA_MODEL);
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.api_base_url.is_none());
        assert!(config.scratch_dir.ends_with("stackpilot-sessions"));
        assert_eq!(config.allowed_host, "github.com");
        assert_eq!(config.retention(), Duration::from_secs(24 * 3600));
        assert_eq!(config.sweep_interval(), Duration::from_secs(3600));
        assert_eq!(config.failure_policy, FailurePolicy::ContinueOnError);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _cleared = clear_all();
        let _guards = vec![
            EnvGuard::set("STACKPILOT_PROVIDER", "claude"),
            EnvGuard::set("STACKPILOT_MODEL", "custom-model"),
            EnvGuard::set("STACKPILOT_REQUEST_TIMEOUT", "120"),
            EnvGuard::set("STACKPILOT_SCRATCH_DIR", "/var/tmp/sp"),
            EnvGuard::set("STACKPILOT_ALLOWED_HOST", "GitLab.com"),
            EnvGuard::set("STACKPILOT_RETENTION_HOURS", "2"),
            EnvGuard::set("STACKPILOT_FAILURE_POLICY", "abort"),
            EnvGuard::set("STACKPILOT_BIND_ADDR", "0.0.0.0:9000"),
            EnvGuard::set("STACKPILOT_LOG_LEVEL", "DEBUG"),
        ];

        let config = StackpilotConfig::default();

        assert_eq!(config.provider, AdapterKind::Anthropic);
        assert_eq!(config.model, "custom-model");
        assert_eq!(config.request_timeout(), Duration::from_secs(120));
        assert_eq!(config.scratch_dir, PathBuf::from("/var/tmp/sp"));
        assert_eq!(config.allowed_host, "gitlab.com");
        assert_eq!(config.retention_hours, 2);
        assert_eq!(config.failure_policy, FailurePolicy::AbortOnError);
        assert_eq!(config.socket_addr().unwrap().port(), 9000);
        assert_eq!(config.log_level, "debug");
        assert_eq!(
            config.pipeline_config().failure_policy,
            FailurePolicy::AbortOnError
        );
    }

    #[test]
    #[serial]
    fn test_unparsable_values_fall_back() {
        let _cleared = clear_all();
        let _guards = vec![
            EnvGuard::set("STACKPILOT_PROVIDER", "nonsense"),
            EnvGuard::set("STACKPILOT_REQUEST_TIMEOUT", "soon"),
            EnvGuard::set("STACKPILOT_FAILURE_POLICY", "maybe"),
        ];

        let config = StackpilotConfig::default();
        assert_eq!(config.provider, AdapterKind::Ollama);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.failure_policy, FailurePolicy::ContinueOnError);
    }

    #[test]
    #[serial]
    fn test_validation_rejects_bad_values() {
        let _cleared = clear_all();
        let base = StackpilotConfig::default();

        let mut config = base.clone();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.request_timeout_secs = 601;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.bind_addr = "localhost".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ParseError { .. })
        ));

        let mut config = base;
        config.retention_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retention_saturates_on_huge_hours() {
        let _guards = clear_all();

        let mut config = StackpilotConfig::default();
        config.retention_hours = u64::MAX;
        assert_eq!(config.retention(), Duration::from_secs(u64::MAX));

        config.retention_hours = u64::MAX / 3600 + 1;
        assert_eq!(config.retention(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_parse_provider_aliases() {
        assert_eq!(parse_provider("ollama").unwrap(), AdapterKind::Ollama);
        assert_eq!(parse_provider("OpenAI").unwrap(), AdapterKind::OpenAI);
        assert_eq!(parse_provider("grok").unwrap(), AdapterKind::Xai);
        assert_eq!(parse_provider("anthropic").unwrap(), AdapterKind::Anthropic);
        assert!(matches!(
            parse_provider("watson"),
            Err(ConfigError::InvalidProvider(_))
        ));
    }

    #[test]
    #[serial]
    fn test_config_display() {
        let _cleared = clear_all();
        let config = StackpilotConfig::default();
        let display = format!("{}", config);
        assert!(display.contains("Stackpilot Configuration:"));
        assert!(display.contains("Failure Policy: continue"));

        let map = config.to_display_map();
        assert!(map.contains_key("provider"));
        assert!(!map.contains_key("api_base_url"));
    }
}
