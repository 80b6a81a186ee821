//! Error types for backend access and collection.

use thiserror::Error;

/// Failure talking to the backend
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    #[error("invalid MongoDB options: {0}")]
    InvalidOptions(String),

    #[error("cannot connect to MongoDB: {0}")]
    Connect(String),

    #[error("command {command} failed: {message}")]
    Command {
        command: String,
        code: Option<i32>,
        message: String,
    },

    /// The scrape deadline passed during the named step
    #[error("{0} did not finish before the scrape deadline")]
    Timeout(&'static str),
}

impl ConnectionError {
    /// Build a command failure
    pub fn command(command: impl Into<String>, code: Option<i32>, message: impl Into<String>) -> Self {
        ConnectionError::Command {
            command: command.into(),
            code,
            message: message.into(),
        }
    }

    /// Server error code, if the server returned one
    pub fn code(&self) -> Option<i32> {
        match self {
            ConnectionError::Command { code, .. } => *code,
            _ => None,
        }
    }
}

/// Failure inside one collector
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("unexpected {command} reply: {reason}")]
    UnexpectedReply {
        command: &'static str,
        reason: String,
    },

    #[error("invalid namespace '{0}': expected db.collection")]
    InvalidNamespace(String),

    #[error("failed to build metric: {0}")]
    Metric(#[from] prometheus::Error),

    #[error("collector '{0}' is already registered")]
    AlreadyRegistered(&'static str),

    #[error("collection did not finish before the scrape deadline")]
    DeadlineExceeded,
}

impl CollectorError {
    pub(crate) fn unexpected(command: &'static str, reason: impl Into<String>) -> Self {
        CollectorError::UnexpectedReply {
            command,
            reason: reason.into(),
        }
    }
}
