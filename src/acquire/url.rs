//! Repository URL validation

use super::AcquireError;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const TOKEN_USER: &str = "x-access-token";

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https://([A-Za-z0-9.-]+)/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?/?$")
            .expect("repository URL pattern is valid")
    })
}

/// A validated `https://<host>/<owner>/<name>[.git]` repository reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    host: String,
    owner: String,
    name: String,
}

impl RepoUrl {
    pub fn parse(input: &str, allowed_host: &str) -> Result<Self, AcquireError> {
        let trimmed = input.trim();
        let invalid = |reason: &str| AcquireError::InvalidUrl {
            url: trimmed.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("repository URL is required"));
        }

        let captures = url_pattern()
            .captures(trimmed)
            .ok_or_else(|| invalid("expected https://<host>/<owner>/<name>[.git]"))?;

        let host = captures[1].to_lowercase();
        if host != allowed_host.to_lowercase() {
            return Err(invalid(&format!("host must be {}", allowed_host)));
        }

        let owner = captures[2].to_string();
        let name = captures[3].to_string();
        if name == "." || name == ".." || owner == "." || owner == ".." {
            return Err(invalid("owner and name must be real path segments"));
        }

        Ok(Self { host, owner, name })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo_name(&self) -> &str {
        &self.name
    }

    /// URL handed to the clone. A token goes into the credential slot of the
    /// URL; the transport never sees it as a header.
    pub fn clone_url(&self, auth_token: Option<&str>) -> String {
        match auth_token.filter(|t| !t.is_empty()) {
            Some(token) => format!(
                "https://{}:{}@{}/{}/{}.git",
                TOKEN_USER, token, self.host, self.owner, self.name
            ),
            None => format!("https://{}/{}/{}.git", self.host, self.owner, self.name),
        }
    }

    pub(crate) fn token_user() -> &'static str {
        TOKEN_USER
    }
}

impl fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://{}/{}/{}", self.host, self.owner, self.name)
    }
}
