//! HTTP client whose requests are paced through a [`DelayedExecutor`].
//!
//! Every request, from connect through reading the full body, runs as one
//! operation on the executor. Requests therefore leave in submission order and
//! never closer together than the configured delay, no matter how many tasks
//! share the client.
//!
//! ```text
//! submit(method, target) -> resolve URL -> DelayedExecutor -> send -> Reply | ClientError
//! ```
//!
//! Targets are joined onto [`HttpSettings::base_url`] when relative; without a
//! base they must be absolute `http(s)` URLs. Non-success statuses become
//! [`ClientError::Status`] with the (capped) response body attached.

mod body;
mod error;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use pacer_executor::{DelayedExecutor, TaskHandle};
use pacer_types::{ExecutorSettings, HttpSettings, SettingsError, TaskSeq};

pub use error::ClientError;
pub use reqwest::Method;

const CONNECT_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 16;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;
const MAX_REDIRECTS: usize = 5;

/// A successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub url: Url,
    pub status: StatusCode,
    pub body: String,
}

/// Rate-limited HTTP client. Clones share the connection pool and the queue.
#[derive(Clone)]
pub struct RateLimitedClient {
    http: reqwest::Client,
    settings: Arc<HttpSettings>,
    executor: DelayedExecutor<Reply, ClientError>,
}

impl RateLimitedClient {
    /// Build a client with its own executor.
    pub fn new(executor: ExecutorSettings, settings: HttpSettings) -> Result<Self, ClientError> {
        Self::with_executor(DelayedExecutor::new(executor), settings)
    }

    /// Build a client on an existing executor, e.g. one shared with another client.
    pub fn with_executor(
        executor: DelayedExecutor<Reply, ClientError>,
        settings: HttpSettings,
    ) -> Result<Self, ClientError> {
        let http = build_http(&settings)?;
        Ok(Self {
            http,
            settings: Arc::new(settings),
            executor,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    #[must_use]
    pub fn executor(&self) -> &DelayedExecutor<Reply, ClientError> {
        &self.executor
    }

    /// Queue a request and return immediately.
    ///
    /// Target resolution and submission failures are reported here; everything
    /// after that arrives through the returned [`PendingReply`].
    pub fn submit(
        &self,
        method: Method,
        target: &str,
        body: Option<serde_json::Value>,
    ) -> Result<PendingReply, ClientError> {
        let url = self.settings.resolve(target)?;
        let http = self.http.clone();
        let log_url = url.clone();
        let log_method = method.clone();

        let handle = self
            .executor
            .submit(move || perform(http, method, url, body))?;

        tracing::debug!(
            seq = %handle.seq(),
            method = %log_method,
            url = %log_url,
            "Request queued"
        );
        Ok(PendingReply { handle })
    }

    /// Send a request and wait for the full [`Reply`].
    pub async fn send(
        &self,
        method: Method,
        target: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Reply, ClientError> {
        self.submit(method, target, body)?.await
    }

    /// Send a request and return the response body text.
    pub async fn request(
        &self,
        method: Method,
        target: &str,
        body: Option<serde_json::Value>,
    ) -> Result<String, ClientError> {
        Ok(self.send(method, target, body).await?.body)
    }

    /// Send a request and decode the response body as JSON.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        target: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ClientError> {
        let body = self.request(method, target, body).await?;
        decode(body)
    }

    pub async fn get(&self, target: &str) -> Result<String, ClientError> {
        self.request(Method::GET, target, None).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        target: &str,
        body: &B,
    ) -> Result<String, ClientError> {
        let body = serde_json::to_value(body).map_err(ClientError::Encode)?;
        self.request(Method::POST, target, Some(body)).await
    }
}

impl fmt::Debug for RateLimitedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitedClient")
            .field("settings", &self.settings)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

/// The eventual [`Reply`] for one queued request.
#[must_use = "a queued request's outcome is only observable by awaiting it"]
#[derive(Debug)]
pub struct PendingReply {
    handle: TaskHandle<Reply, ClientError>,
}

impl PendingReply {
    #[must_use]
    pub fn seq(&self) -> TaskSeq {
        self.handle.seq()
    }
}

impl Future for PendingReply {
    type Output = Result<Reply, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle)
            .poll(cx)
            .map(|outcome| outcome.map_err(ClientError::from))
    }
}

fn build_http(settings: &HttpSettings) -> Result<reqwest::Client, ClientError> {
    let mut default_headers = HeaderMap::new();
    if let Some(auth) = settings.auth() {
        let mut value = HeaderValue::from_str(&auth.header_value())
            .map_err(|_| SettingsError::InvalidHeaderValue("Authorization"))?;
        value.set_sensitive(true);
        default_headers.insert(AUTHORIZATION, value);
    }

    let mut builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers);

    if let Some(user_agent) = settings.user_agent() {
        builder = builder.user_agent(user_agent);
    }
    if let Some(timeout) = settings.timeout() {
        builder = builder.timeout(timeout);
    }

    builder.build().map_err(ClientError::Build)
}

/// One request, start to finish. Runs inside the executor.
async fn perform(
    http: reqwest::Client,
    method: Method,
    url: Url,
    body: Option<serde_json::Value>,
) -> Result<Reply, ClientError> {
    let started = Instant::now();
    let mut request = http.request(method.clone(), url.clone());
    if let Some(body) = &body {
        request = request.json(body);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(source) => {
            tracing::warn!(method = %method, url = %url, error = %source, "Request failed");
            return Err(ClientError::Transport { url, source });
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = body::read_capped(response).await;
        tracing::warn!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request returned error status"
        );
        return Err(ClientError::Status { url, status, body });
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(source) => return Err(ClientError::Transport { url, source }),
    };

    tracing::debug!(
        method = %method,
        url = %url,
        status = status.as_u16(),
        bytes = body.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );
    Ok(Reply { url, status, body })
}

fn decode<T: DeserializeOwned>(body: String) -> Result<T, ClientError> {
    serde_json::from_str(&body).map_err(|source| ClientError::Decode {
        type_name: std::any::type_name::<T>(),
        body,
        source,
    })
}
