//! Configuration loading for Pacer.
//!
//! The config file lives at `~/.pacer/config.toml` (or wherever
//! `PACER_CONFIG` points):
//!
//! ```toml
//! [executor]
//! delay_ms = 1000
//! policy = "start_to_start"      # or "finish_to_start"
//!
//! [http]
//! base_url = "https://api.example.com/v1"
//! auth_scheme = "Bearer"
//! auth_token = "${EXAMPLE_API_TOKEN}"
//! user_agent = "pacer/0.0"
//! timeout_seconds = 30
//! ```
//!
//! Raw sections below mirror the file one-to-one with `Option` fields. They
//! are resolved into the validated `pacer-types` settings at this boundary;
//! nothing downstream sees an unvalidated value.

mod env;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use pacer_types::{AuthHeader, DelayPolicy, ExecutorSettings, HttpSettings, SettingsError};

pub use env::{CONFIG_PATH_VAR, DELAY_MS_VAR, POLICY_VAR, expand_env_vars};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("missing required config key `{0}`")]
    MissingKey(&'static str),
    #[error("invalid value for `{key}`: {source}")]
    Invalid {
        key: &'static str,
        source: SettingsError,
    },
    #[error("invalid value {value:?} in ${var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    /// The config file this error is about, when it came from reading one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PacerConfig {
    pub executor: Option<ExecutorConfig>,
    pub http: Option<HttpConfig>,
}

/// `[executor]` section. `delay_ms` is required whenever the section exists.
#[derive(Debug, Default, Deserialize)]
pub struct ExecutorConfig {
    pub delay_ms: Option<u64>,
    pub policy: Option<DelayPolicy>,
}

/// `[http]` section. String values support `${ENV_VAR}` expansion.
#[derive(Default, Deserialize)]
pub struct HttpConfig {
    pub base_url: Option<String>,
    pub auth_scheme: Option<String>,
    pub auth_token: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_seconds: Option<u64>,
}

// Manual Debug impl to prevent leaking tokens in logs.
impl fmt::Debug for HttpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConfig")
            .field("base_url", &self.base_url)
            .field("auth_scheme", &self.auth_scheme)
            .field(
                "auth_token",
                &if self.auth_token.is_some() {
                    "[REDACTED]"
                } else {
                    "None"
                },
            )
            .field("user_agent", &self.user_agent)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Fully-validated configuration, ready to build an executor and client from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub executor: ExecutorSettings,
    pub http: HttpSettings,
}

impl PacerConfig {
    /// Load from the default location. `Ok(None)` when no file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    /// Load from an explicit path. `Ok(None)` when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file");
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {}: {}", path.display(), err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Resolve the `[executor]` section. Defaults apply when it is absent.
    pub fn executor_settings(&self) -> Result<ExecutorSettings, ConfigError> {
        let Some(section) = &self.executor else {
            return Ok(ExecutorSettings::default());
        };
        let delay_ms = section
            .delay_ms
            .ok_or(ConfigError::MissingKey("executor.delay_ms"))?;
        Ok(ExecutorSettings::from_millis(
            delay_ms,
            section.policy.unwrap_or_default(),
        ))
    }

    /// Resolve the `[http]` section, expanding `${VAR}` references.
    pub fn http_settings(&self) -> Result<HttpSettings, ConfigError> {
        self.http_settings_with(|name| std::env::var(name).ok())
    }

    fn http_settings_with<F>(&self, lookup: F) -> Result<HttpSettings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(section) = &self.http else {
            return Ok(HttpSettings::default());
        };
        let expand = |value: &Option<String>| {
            value
                .as_deref()
                .map(|v| env::expand_with(v, &lookup))
                .filter(|v| !v.trim().is_empty())
        };

        let mut settings = HttpSettings::new();

        if let Some(base) = expand(&section.base_url) {
            settings = settings
                .with_base_url(&base)
                .map_err(|source| ConfigError::Invalid {
                    key: "http.base_url",
                    source,
                })?;
        }

        match (expand(&section.auth_scheme), expand(&section.auth_token)) {
            (Some(scheme), Some(token)) => {
                let auth =
                    AuthHeader::new(scheme, token).map_err(|source| ConfigError::Invalid {
                        key: "http.auth_token",
                        source,
                    })?;
                settings = settings.with_auth(auth);
            }
            (Some(_), None) => return Err(ConfigError::MissingKey("http.auth_token")),
            (None, Some(_)) => return Err(ConfigError::MissingKey("http.auth_scheme")),
            (None, None) => {}
        }

        if let Some(user_agent) = expand(&section.user_agent) {
            settings =
                settings
                    .with_user_agent(user_agent)
                    .map_err(|source| ConfigError::Invalid {
                        key: "http.user_agent",
                        source,
                    })?;
        }

        if let Some(secs) = section.timeout_seconds {
            settings = settings
                .with_timeout(Duration::from_secs(secs))
                .map_err(|source| ConfigError::Invalid {
                    key: "http.timeout_seconds",
                    source,
                })?;
        }

        Ok(settings)
    }

    /// Resolve everything and apply `PACER_*` environment overrides.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let executor = apply_env_overrides(self.executor_settings()?)?;
        Ok(ResolvedConfig {
            executor,
            http: self.http_settings()?,
        })
    }
}

/// Apply `PACER_DELAY_MS` / `PACER_POLICY` from the process environment.
pub fn apply_env_overrides(settings: ExecutorSettings) -> Result<ExecutorSettings, ConfigError> {
    overrides_from(settings, |name| std::env::var(name).ok())
}

fn overrides_from<F>(mut settings: ExecutorSettings, lookup: F) -> Result<ExecutorSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(DELAY_MS_VAR) {
        let delay_ms = raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnv {
                var: DELAY_MS_VAR,
                value: raw.clone(),
                reason: e.to_string(),
            })?;
        settings = settings.with_delay(Duration::from_millis(delay_ms));
    }
    if let Some(raw) = lookup(POLICY_VAR) {
        let policy = raw
            .parse::<DelayPolicy>()
            .map_err(|e| ConfigError::InvalidEnv {
                var: POLICY_VAR,
                value: raw.clone(),
                reason: e.to_string(),
            })?;
        settings = settings.with_policy(policy);
    }
    Ok(settings)
}

/// `$PACER_CONFIG` if set, otherwise `~/.pacer/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(CONFIG_PATH_VAR)
        && !explicit.trim().is_empty()
    {
        return Some(PathBuf::from(explicit));
    }
    dirs::home_dir().map(|home| home.join(".pacer").join("config.toml"))
}
