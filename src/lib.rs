//! stackpilot - repository analysis and deployment artifact generation
//!
//! A repository is cloned into a per-session scratch directory and handed to
//! four agents that run in a fixed order:
//!
//! 1. **Planner** asks the LLM for a deployment plan (default plan on failure)
//! 2. **Analyzer** scans the checkout, classifies the tech stack and profiles
//!    the codebase
//! 3. **Generator** writes a Dockerfile, a GitHub Actions workflow and an
//!    `.env.example`
//! 4. **Verifier** checks the artifacts statically and asks the LLM to review
//!
//! Each agent returns a [`PhaseContribution`]; the orchestrator merges it
//! into the [`PipelineState`], which only ever grows.
//!
//! # Example Usage
//!
//! ```no_run
//! use stackpilot::service::{AnalysisService, CloneRequest};
//! use stackpilot::StackpilotConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = AnalysisService::from_config(&StackpilotConfig::default())?;
//! let cloned = service
//!     .clone_repository(CloneRequest::new("https://github.com/acme/web"))
//!     .await?;
//! service.run_analysis(&cloned.session_id).await?;
//!
//! let results = service.results(&cloned.session_id).await?;
//! println!("{}", results.files["Dockerfile"]);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`acquire`]: URL validation and cloning into scratch storage
//! - [`scan`], [`stack`], [`profile`]: deterministic repository analysis
//! - [`generate`]: artifact templates
//! - [`pipeline`]: agents, state and orchestrator
//! - [`session`]: session lifecycle, registry and retention sweep
//! - [`service`]: the entry point used by [`server`] and [`cli`]

pub mod acquire;
pub mod cli;
pub mod config;
pub mod external;
pub mod generate;
pub mod llm;
pub mod pipeline;
pub mod profile;
pub mod progress;
pub mod scan;
pub mod server;
pub mod service;
pub mod session;
pub mod stack;
pub mod util;

pub use config::{ConfigError, StackpilotConfig};
pub use llm::{BackendError, LLMClient};
pub use pipeline::{
    FailurePolicy, PhaseContribution, PipelineConfig, PipelineError, PipelineOrchestrator,
    PipelineState, PipelineStep,
};
pub use service::{AnalysisService, ServiceError};
pub use session::{Session, SessionRegistry, SessionStatus};
pub use stack::{Platform, TechStackProfile};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
