//! Runtime configuration for Registrar.
//!
//! Settings come from the environment (optionally seeded from a `.env`
//! file via dotenvy) so the binary runs unmodified in a container or CI job.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading settings from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is absent or empty.
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    /// A variable is present but unusable.
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Settings for one Registrar process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Registry repository in `owner/name` form. All writes target this repo.
    pub repo_name: String,

    /// Branch the registry file lives on; pull requests merge into it.
    pub base_branch: String,

    /// Bearer token used for every API call against the registry repository.
    pub github_token: String,

    /// Shared secret for webhook delivery signatures. When unset, deliveries
    /// are accepted without verification.
    pub webhook_secret: Option<String>,
}

impl Settings {
    /// Load settings from the environment, reading `.env` first if present.
    pub fn from_env() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();

        let repo_name = require("REGISTRAR_REPO")?;
        if !repo_name.contains('/') {
            return Err(ConfigError::Invalid {
                var: "REGISTRAR_REPO",
                reason: format!("expected owner/name, got `{repo_name}`"),
            });
        }

        Ok(Self {
            repo_name,
            base_branch: optional("REGISTRAR_BASE_BRANCH").unwrap_or_else(|| "main".to_string()),
            github_token: require("GITHUB_TOKEN")?,
            webhook_secret: optional("REGISTRAR_WEBHOOK_SECRET"),
        })
    }

    /// Split the configured repository into `(owner, name)`.
    pub fn owner_and_repo(&self) -> (&str, &str) {
        self.repo_name.split_once('/').unwrap_or((self.repo_name.as_str(), ""))
    }
}

fn require(var: &'static str) -> ConfigResult<String> {
    optional(var).ok_or(ConfigError::Missing(var))
}

fn optional(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}
