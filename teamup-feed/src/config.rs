use crate::types::{FeedError, FetchConfig, Result};
use std::env;
use url::Url;

pub const URL_VAR: &str = "SUPABASE_URL";
pub const API_KEY_VAR: &str = "SUPABASE_API";
pub const USER_AGENT_VAR: &str = "TEAMUP_USER_AGENT";
pub const TIMEOUT_VAR: &str = "TEAMUP_TIMEOUT_SECONDS";

/// Backend location and credentials plus HTTP client settings.
#[derive(Clone)]
pub struct AppConfig {
    pub base_url: Url,
    pub api_key: String,
    pub fetch: FetchConfig,
}

impl AppConfig {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(FeedError::Config(format!("{} must not be empty", API_KEY_VAR)));
        }
        Ok(Self {
            base_url: Url::parse(base_url)?,
            api_key,
            fetch: FetchConfig::default(),
        })
    }

    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, with a caller-supplied variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| FeedError::Config(format!("{} is not set", key)))
        };

        let base_url = required(URL_VAR)?;
        let api_key = required(API_KEY_VAR)?;

        let mut fetch = FetchConfig::default();
        if let Some(user_agent) = lookup(USER_AGENT_VAR) {
            fetch.user_agent = user_agent;
        }
        if let Some(timeout) = lookup(TIMEOUT_VAR) {
            fetch.timeout_seconds = timeout.trim().parse().map_err(|_| {
                FeedError::Config(format!("{} must be a whole number of seconds", TIMEOUT_VAR))
            })?;
        }

        Ok(Self::new(&base_url, api_key)?.with_fetch(fetch))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"***")
            .field("fetch", &self.fetch)
            .finish()
    }
}
