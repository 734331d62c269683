//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Prefetch pacing knobs.
///
/// The defaults reproduce the fixed constants of the original client: two
/// concurrent fetches, a one-second jitter window, and a one-second recency
/// threshold for deciding whether a channel is "hot" enough to jitter.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PrefetchConfig {
    /// Maximum simultaneous in-flight post fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    /// Upper bound of the randomized dispatch delay, in milliseconds.
    #[serde(default = "default_jitter_window_ms")]
    pub jitter_window_ms: u64,
    /// A channel whose last post is younger than this receives jitter.
    #[serde(default = "default_recency_threshold_ms")]
    pub recency_threshold_ms: u64,
    /// Page size for post-history fetches.
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: u32,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            jitter_window_ms: default_jitter_window_ms(),
            recency_threshold_ms: default_recency_threshold_ms(),
            posts_per_page: default_posts_per_page(),
        }
    }
}

fn default_concurrency() -> u32 {
    2
}

fn default_jitter_window_ms() -> u64 {
    1000
}

fn default_recency_threshold_ms() -> u64 {
    1000
}

fn default_posts_per_page() -> u32 {
    60
}

fn default_poll_interval_seconds() -> u64 {
    15
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(".prewarm/cache.db")
}

/// Global configuration parsed from `config.toml`.
///
/// The API token is loaded at runtime via OS keychain or environment
/// variable, never from the TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Base URL of the messaging server, e.g. `https://chat.example.com`.
    pub server_url: String,
    /// Team whose unread channels are prewarmed.
    pub team_id: String,
    /// Seconds between unread-state polls.
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    /// Path of the local `SQLite` post cache.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// Prefetch pacing knobs.
    #[serde(default)]
    pub prefetch: PrefetchConfig,
    /// Access token for the messaging server (populated at runtime).
    #[serde(skip)]
    pub api_token: String,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the API token from the OS keychain with env-var fallback.
    ///
    /// Tries the `channel-prewarm` keyring service first, then falls back
    /// to the `CHANNEL_PREWARM_API_TOKEN` environment variable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither keychain nor env var provide
    /// the token.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.api_token = load_credential("api_token", "CHANNEL_PREWARM_API_TOKEN").await?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(AppError::Config("server_url must not be empty".into()));
        }
        if self.server_url.ends_with('/') {
            return Err(AppError::Config(
                "server_url must not carry a trailing slash".into(),
            ));
        }
        if self.team_id.is_empty() {
            return Err(AppError::Config("team_id must not be empty".into()));
        }
        if self.prefetch.concurrency == 0 {
            return Err(AppError::Config(
                "prefetch.concurrency must be greater than zero".into(),
            ));
        }
        if self.prefetch.posts_per_page == 0 {
            return Err(AppError::Config(
                "prefetch.posts_per_page must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // Try OS keychain first via spawn_blocking (keyring is synchronous I/O).
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new("channel-prewarm", &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    // Fallback to environment variable.
    env::var(env_key).map_err(|_| {
        AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))
    })
}
