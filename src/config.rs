//! config
//!
//! Explicit configuration for the object store client.
//!
//! Credentials and endpoints are plain values passed into
//! [`GitHubStore::new`], never process-global state; each test case can
//! build its own.
//!
//! [`GitHubStore::new`]: crate::store::github::GitHubStore::new

use thiserror::Error;

/// Default API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
pub const DEFAULT_USER_AGENT: &str = "treetop-cli";

/// Environment variable holding the bearer token.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The token environment variable is unset or empty.
    #[error("{TOKEN_ENV_VAR} is not set; a GitHub token is required")]
    MissingToken,
}

/// Object store client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token for the remote API
    pub token: String,
    /// API base URL (overridable for GitHub Enterprise)
    pub api_base: String,
    /// User-Agent header value
    pub user_agent: String,
}

impl Config {
    /// Create a configuration with the default API base.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Override the API base URL. A trailing slash is stripped.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        let api_base = api_base.into();
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Build a configuration from the environment.
    ///
    /// Reads the token from `GITHUB_TOKEN`; `api_base` overrides the
    /// default endpoint when given.
    pub fn from_env(api_base: Option<&str>) -> Result<Self, ConfigError> {
        let token = std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;
        let config = Self::new(token);
        Ok(match api_base {
            Some(base) => config.with_api_base(base),
            None => config,
        })
    }
}
