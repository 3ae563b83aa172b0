use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use pacer_executor::{SchedulingFault, SubmitError, TaskError};
use pacer_types::SettingsError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {body}")]
    Status {
        url: Url,
        status: StatusCode,
        body: String,
    },
    #[error("failed to decode response as {type_name}: {source}")]
    Decode {
        type_name: &'static str,
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("request panicked: {0}")]
    Panicked(String),
    #[error("request was not sent: {0}")]
    Rejected(#[source] SubmitError),
    #[error("request dispatcher stopped: {0}")]
    Faulted(#[source] SchedulingFault),
    #[error("request abandoned before completing")]
    Abandoned,
}

impl ClientError {
    /// HTTP status, when the server answered with a non-success one.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TaskError<ClientError>> for ClientError {
    fn from(err: TaskError<ClientError>) -> Self {
        match err {
            TaskError::Operation(err) => err,
            TaskError::Panicked(message) => Self::Panicked(message),
            TaskError::Faulted(fault) => Self::Faulted(fault),
            TaskError::Abandoned => Self::Abandoned,
            TaskError::Rejected(err) => Self::Rejected(err),
        }
    }
}

impl From<SubmitError> for ClientError {
    fn from(err: SubmitError) -> Self {
        Self::Rejected(err)
    }
}
