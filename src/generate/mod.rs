//! Deployment artifact generation
//!
//! Three independent, deterministic renderers keyed by the classified stack:
//! a container build file, a GitHub Actions workflow and an environment
//! template. Unrecognized platforms get generic templates that are still
//! valid, never empty output.

mod ci;
mod dockerfile;
mod env;

pub use ci::generate_workflow;
pub use dockerfile::generate_dockerfile;
pub use env::generate_env_example;

use crate::profile::CodebaseAnalysis;
use crate::scan::ProjectStructure;
use crate::stack::{Platform, TechStackProfile};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DOCKERFILE: &str = "Dockerfile";
pub const GITHUB_ACTIONS: &str = "deploy.yml";
pub const ENV_EXAMPLE: &str = ".env.example";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifactSet {
    pub dockerfile: String,
    pub github_actions: String,
    pub env_example: String,
}

impl GeneratedArtifactSet {
    /// `(artifact name, content)` pairs in a stable order
    pub fn named(&self) -> [(&'static str, &str); 3] {
        [
            (DOCKERFILE, self.dockerfile.as_str()),
            (GITHUB_ACTIONS, self.github_actions.as_str()),
            (ENV_EXAMPLE, self.env_example.as_str()),
        ]
    }
}

pub fn generate(
    tech_stack: &TechStackProfile,
    project_structure: &ProjectStructure,
    codebase_analysis: &CodebaseAnalysis,
) -> Result<GeneratedArtifactSet> {
    let github_actions = generate_workflow(tech_stack, project_structure, codebase_analysis)
        .context("Failed to render GitHub Actions workflow")?;
    Ok(GeneratedArtifactSet {
        dockerfile: generate_dockerfile(tech_stack, project_structure),
        github_actions,
        env_example: generate_env_example(tech_stack),
    })
}

/// Node package manager, chosen by the lockfile at the repository root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodePackageManager {
    /// npm with `package-lock.json` or `npm-shrinkwrap.json`
    NpmLocked(&'static str),
    Yarn,
    /// npm without any lockfile
    Npm,
}

impl NodePackageManager {
    pub(crate) fn detect(structure: &ProjectStructure) -> Self {
        if let Some(lockfile) = ["package-lock.json", "npm-shrinkwrap.json"]
            .into_iter()
            .find(|name| structure.has_file(name))
        {
            NodePackageManager::NpmLocked(lockfile)
        } else if structure.has_file("yarn.lock") {
            NodePackageManager::Yarn
        } else {
            NodePackageManager::Npm
        }
    }

    pub(crate) fn lockfile(&self) -> Option<&'static str> {
        match self {
            NodePackageManager::NpmLocked(lockfile) => Some(lockfile),
            NodePackageManager::Yarn => Some("yarn.lock"),
            NodePackageManager::Npm => None,
        }
    }

    /// `cache` input for actions/setup-node, which needs a lockfile to key on
    pub(crate) fn setup_node_cache(&self) -> Option<&'static str> {
        match self {
            NodePackageManager::NpmLocked(_) => Some("npm"),
            NodePackageManager::Yarn => Some("yarn"),
            NodePackageManager::Npm => None,
        }
    }

    pub(crate) fn install(&self, production_only: bool) -> String {
        match (self, production_only) {
            (NodePackageManager::NpmLocked(_), false) => "npm ci".to_string(),
            (NodePackageManager::NpmLocked(_), true) => "npm ci --omit=dev".to_string(),
            (NodePackageManager::Yarn, false) => "yarn install --frozen-lockfile".to_string(),
            (NodePackageManager::Yarn, true) => {
                "yarn install --frozen-lockfile --production".to_string()
            }
            (NodePackageManager::Npm, false) => "npm install".to_string(),
            (NodePackageManager::Npm, true) => "npm install --omit=dev".to_string(),
        }
    }

    /// `COPY` line for the manifest and lockfile ahead of the install layer
    pub(crate) fn copy_manifests(&self) -> String {
        match self.lockfile() {
            Some(lockfile) => format!("COPY package.json {} ./", lockfile),
            None => "COPY package.json ./".to_string(),
        }
    }
}

/// Node stack that only ships a static frontend bundle
pub(crate) fn is_static_frontend(stack: &TechStackProfile) -> bool {
    stack.primary == Platform::NodeJs
        && stack.has_frontend()
        && !stack.has_backend()
        && stack.frameworks.iter().all(|f| f != "Next.js" && f != "Nuxt")
}

pub(crate) fn default_port(stack: &TechStackProfile) -> u16 {
    match stack.primary {
        Platform::NodeJs if is_static_frontend(stack) => 80,
        Platform::NodeJs => 3000,
        Platform::Python => 8000,
        Platform::Go | Platform::Rust | Platform::Java | Platform::Unknown => 8080,
    }
}
