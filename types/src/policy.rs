use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the inter-dispatch delay is measured from.
///
/// ```toml
/// [executor]
/// policy = "finish_to_start"
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayPolicy {
    /// The next item may start `delay` after the previous one *started*.
    ///
    /// Bounds the rate of initiations regardless of how long each one runs.
    #[default]
    StartToStart,
    /// The next item may start `delay` after the previous one *finished*.
    ///
    /// Bounds the idle gap for resources that reject back-to-back calls.
    FinishToStart,
}

impl DelayPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartToStart => "start_to_start",
            Self::FinishToStart => "finish_to_start",
        }
    }

    /// Whether the gate is re-armed before the operation runs.
    #[must_use]
    pub const fn arms_before_run(self) -> bool {
        matches!(self, Self::StartToStart)
    }
}

impl fmt::Display for DelayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown delay policy '{0}' (expected 'start_to_start' or 'finish_to_start')")]
pub struct UnknownPolicyError(pub String);

impl FromStr for DelayPolicy {
    type Err = UnknownPolicyError;

    /// Accepts the snake_case names plus the hyphenated and short forms
    /// people tend to type on a command line.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "start_to_start" | "start" | "s2s" => Ok(Self::StartToStart),
            "finish_to_start" | "finish" | "f2s" => Ok(Self::FinishToStart),
            _ => Err(UnknownPolicyError(s.to_string())),
        }
    }
}
