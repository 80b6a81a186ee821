//! Logging configuration types.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while configuring the subscriber
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Unknown log format: {0}. Expected one of: pretty, compact, json")]
    UnknownFormat(String),

    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Failed to install global subscriber: {0}")]
    AlreadyInitialized(String),
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human oriented output
    Pretty,

    /// One event per line
    #[default]
    Compact,

    /// Newline-delimited JSON for log shippers
    Json,
}

impl LogFormat {
    /// Name accepted by [`FromStr`]
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(LogError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where log lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOutput {
    /// Standard error
    #[default]
    Stderr,

    /// Standard output
    Stdout,
}

/// Subscriber settings
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format
    pub format: LogFormat,

    /// Filter directive such as `info` or `mongodb_exporter=debug`.
    /// `None` defers to `RUST_LOG`.
    pub level: Option<String>,

    /// ANSI colors (ignored for JSON)
    pub use_color: bool,

    /// Prefix lines with a timestamp
    pub use_timestamps: bool,

    /// Include the emitting thread id
    pub include_thread_ids: bool,

    /// Include the event target (module path)
    pub include_targets: bool,

    /// Destination stream
    pub output: LogOutput,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::default(),
            level: None,
            use_color: true,
            use_timestamps: true,
            include_thread_ids: false,
            include_targets: true,
            output: LogOutput::Stderr,
        }
    }
}

impl LogConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the filter directive
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Enable or disable colors
    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    /// Enable or disable timestamps
    pub fn with_timestamps(mut self, use_timestamps: bool) -> Self {
        self.use_timestamps = use_timestamps;
        self
    }

    /// Enable or disable thread ids
    pub fn with_thread_ids(mut self, include_thread_ids: bool) -> Self {
        self.include_thread_ids = include_thread_ids;
        self
    }

    /// Enable or disable targets
    pub fn with_targets(mut self, include_targets: bool) -> Self {
        self.include_targets = include_targets;
        self
    }

    /// Set the destination stream
    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Filter directive in effect: explicit level, then `RUST_LOG`, then `info`
    pub fn effective_level(&self) -> String {
        self.level
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_string())
    }
}
