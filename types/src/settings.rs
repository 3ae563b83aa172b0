//! Resolved configuration types shared across crates.
//!
//! These types represent fully-validated, resolved configuration state.
//! Raw TOML deserialization structs (with `Option` fields) stay private in
//! `pacer-config`. The config loader resolves them into these types at the
//! parse boundary.
//!
//! Existence of a value is the proof of its validity.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::DelayPolicy;

/// Delay used when neither the config file nor the command line names one.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },
    #[error("unsupported URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),
    #[error("relative target '{0}' requires a configured base_url")]
    RelativeWithoutBase(String),
    #[error("auth scheme must not be empty")]
    EmptyAuthScheme,
    #[error("auth token must not be empty")]
    EmptyAuthToken,
    #[error("header value for {0} contains control characters")]
    InvalidHeaderValue(&'static str),
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

/// Executor timing: how long to hold off between dispatches, and from which
/// event the hold-off is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorSettings {
    delay: Duration,
    policy: DelayPolicy,
}

impl ExecutorSettings {
    #[must_use]
    pub const fn new(delay: Duration, policy: DelayPolicy) -> Self {
        Self { delay, policy }
    }

    #[must_use]
    pub const fn from_millis(delay_ms: u64, policy: DelayPolicy) -> Self {
        Self::new(Duration::from_millis(delay_ms), policy)
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub const fn policy(&self) -> DelayPolicy {
        self.policy
    }

    #[must_use]
    pub const fn with_delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    #[must_use]
    pub const fn with_policy(self, policy: DelayPolicy) -> Self {
        Self { policy, ..self }
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY, DelayPolicy::default())
    }
}

/// `Authorization: <scheme> <token>` pair, e.g. `Bearer abc123` or `Bot xyz`.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeader {
    scheme: String,
    token: String,
}

impl AuthHeader {
    pub fn new(scheme: impl Into<String>, token: impl Into<String>) -> Result<Self, SettingsError> {
        let scheme = scheme.into().trim().to_string();
        let token = token.into().trim().to_string();
        if scheme.is_empty() {
            return Err(SettingsError::EmptyAuthScheme);
        }
        if token.is_empty() {
            return Err(SettingsError::EmptyAuthToken);
        }
        if scheme.chars().any(char::is_control) || token.chars().any(char::is_control) {
            return Err(SettingsError::InvalidHeaderValue("Authorization"));
        }
        Ok(Self { scheme, token })
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Full header value: `"<scheme> <token>"`.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("{} {}", self.scheme, self.token)
    }
}

// Manual Debug impl to prevent leaking tokens in logs.
impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeader")
            .field("scheme", &self.scheme)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Settings for the rate-limited HTTP client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpSettings {
    base_url: Option<Url>,
    auth: Option<AuthHeader>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
}

impl HttpSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL relative targets are joined onto.
    ///
    /// A trailing `/` is added when missing so `https://host/v1` + `users`
    /// resolves to `https://host/v1/users` rather than replacing `v1`.
    pub fn with_base_url(mut self, base: &str) -> Result<Self, SettingsError> {
        let mut url = parse_http_url(base)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = Some(url);
        Ok(self)
    }

    #[must_use]
    pub fn with_auth(mut self, auth: AuthHeader) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Result<Self, SettingsError> {
        let user_agent = user_agent.into();
        if user_agent.chars().any(char::is_control) {
            return Err(SettingsError::InvalidHeaderValue("User-Agent"));
        }
        self.user_agent = Some(user_agent);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, SettingsError> {
        if timeout.is_zero() {
            return Err(SettingsError::ZeroTimeout);
        }
        self.timeout = Some(timeout);
        Ok(self)
    }

    #[must_use]
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> Option<&AuthHeader> {
        self.auth.as_ref()
    }

    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Resolve a request target to a full URL.
    ///
    /// Absolute `http(s)` targets are used as-is. Anything else is joined onto
    /// the base URL with its leading `/` stripped, so it always stays under the
    /// base path, even when its first segment contains a colon.
    pub fn resolve(&self, target: &str) -> Result<Url, SettingsError> {
        let target = target.trim();
        if let Ok(url) = Url::parse(target) {
            if matches!(url.scheme(), "http" | "https") {
                return Ok(url);
            }
            // `users:search` and `host:8080/x` parse with a bogus scheme; only
            // `scheme://` forms are taken as URLs when a base is configured.
            if target.contains("://") || self.base_url.is_none() {
                return Err(SettingsError::UnsupportedScheme(url.scheme().to_string()));
            }
        }

        let Some(base) = &self.base_url else {
            return Err(SettingsError::RelativeWithoutBase(target.to_string()));
        };
        // `./` keeps a colon in the first segment from reading as a scheme.
        let relative = format!("./{}", target.trim_start_matches('/'));
        base.join(&relative).map_err(|e| SettingsError::InvalidUrl {
            input: target.to_string(),
            reason: e.to_string(),
        })
    }
}

fn parse_http_url(input: &str) -> Result<Url, SettingsError> {
    let url = Url::parse(input.trim()).map_err(|e| SettingsError::InvalidUrl {
        input: input.to_string(),
        reason: e.to_string(),
    })?;
    check_scheme(&url)?;
    Ok(url)
}

fn check_scheme(url: &Url) -> Result<(), SettingsError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(SettingsError::UnsupportedScheme(other.to_string())),
    }
}
