//! Error types for fetching, command execution and configuration

use std::time::Duration;

use thiserror::Error;

/// Errors produced while obtaining the latest value of a metric
///
/// All of these are local to a single check cycle: the action logs them and
/// retries on its next scheduled tick.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be completed (DNS, connect, timeout, body read)
    #[error("graphite request failed: {0}")]
    Network(String),

    /// Graphite answered, but not with 200 OK
    #[error("graphite did not return 200 OK (got {got})")]
    Status { got: u16 },

    /// The raw body did not end in a parseable number
    #[error("could not parse last value {last:?}: {reason}")]
    Parse { last: String, reason: String },
}

impl FetchError {
    /// Short machine-friendly name of the failure, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Status { .. } => "status",
            FetchError::Parse { .. } => "parse",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Errors produced while running a triggered command
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The process could not be started
    #[error("failed to start command: {0}")]
    Spawn(String),

    /// The process outran its time budget and was killed, along with its
    /// process group. Carries whatever output was read before the kill.
    #[error("command timed out after {}ms", .after.as_millis())]
    Timeout {
        after: Duration,
        stdout: String,
        stderr: String,
    },

    /// The process exited unsuccessfully (-1 when killed by a signal)
    #[error("command exited with code {code}")]
    NonZero { code: i32, stderr: String },

    /// Waiting on the child failed
    #[error("failed to wait for command: {0}")]
    Wait(#[from] std::io::Error),
}

impl ExecutionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionError::Spawn(_) => "spawn",
            ExecutionError::Timeout { .. } => "timeout",
            ExecutionError::NonZero { .. } => "nonzero",
            ExecutionError::Wait(_) => "wait",
        }
    }
}

/// A configuration file that parsed but cannot be run
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("GraphiteBase must not be empty")]
    MissingGraphiteBase,

    #[error("no actions configured")]
    NoActions,

    #[error("action `{action}`: {reason}")]
    InvalidAction { action: String, reason: String },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}
