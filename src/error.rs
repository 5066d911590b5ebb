//! Error types for the OSMC goal service

use std::time::Duration;
use thiserror::Error;

/// Reasons a goal is rejected or ends without converging
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError {
    #[error("a goal is already active")]
    Busy,

    #[error("no usable pose estimate (age: {age:?})")]
    StalePose { age: Option<Duration> },

    #[error("goal was cancelled")]
    Cancelled,

    #[error("goal server is not active")]
    Inactive,

    #[error("invalid goal: {0}")]
    InvalidGoal(String),
}

/// Delivery failure on an outbound sink
///
/// Sinks are fire-and-forget; these are logged and never fail a goal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("sink receiver has been dropped")]
    Closed,

    #[error("sink queue is full")]
    Full,
}

/// Parameter loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read parameter file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse parameters: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid parameter {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
