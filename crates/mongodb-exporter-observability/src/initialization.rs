// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Global subscriber installation.

use crate::config::{LogConfig, LogError, LogFormat, LogOutput};
use std::io;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Install a subscriber with the given format and filter.
///
/// `level` of `None` defers to `RUST_LOG`, then `info`.
pub fn init_tracing(format: LogFormat, level: Option<&str>) -> Result<(), LogError> {
    let mut config = LogConfig::new().with_format(format);
    if let Some(level) = level {
        config = config.with_level(level);
    }
    init_tracing_with_config(config)
}

/// Install a subscriber from a full [`LogConfig`].
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing_with_config(config: LogConfig) -> Result<(), LogError> {
    let env_filter = build_env_filter(&config)?;
    let registry = Registry::default().with(env_filter);
    let writer = get_writer(&config.output);

    let result = match config.format {
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids)
                .with_ansi(config.use_color)
                .pretty();
            if config.use_timestamps {
                registry.with(layer).try_init()
            } else {
                registry.with(layer.without_time()).try_init()
            }
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids)
                .with_ansi(config.use_color)
                .compact();
            if config.use_timestamps {
                registry.with(layer).try_init()
            } else {
                registry.with(layer.without_time()).try_init()
            }
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .with_writer(writer)
                .json()
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids);
            if config.use_timestamps {
                registry.with(layer).try_init()
            } else {
                registry.with(layer.without_time()).try_init()
            }
        }
    };

    result.map_err(|e| LogError::AlreadyInitialized(e.to_string()))
}

fn get_writer(output: &LogOutput) -> fn() -> Box<dyn io::Write + Send> {
    match output {
        LogOutput::Stderr => || Box::new(io::stderr()),
        LogOutput::Stdout => || Box::new(io::stdout()),
    }
}

fn build_env_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    let filter = config.effective_level();

    EnvFilter::try_new(&filter).map_err(|e| LogError::InvalidFilter {
        filter: filter.clone(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Installing the global subscriber is a one-shot per process, so only
    // filter construction is exercised here.

    #[test]
    fn test_module_directives_parse() {
        let config = LogConfig::new().with_level("mongodb_exporter=debug,mongodb=warn");
        assert!(build_env_filter(&config).is_ok());
    }

    #[test]
    fn test_garbage_filter_is_rejected() {
        let config = LogConfig::new().with_level("mongodb_exporter=notalevel");
        assert!(matches!(
            build_env_filter(&config),
            Err(LogError::InvalidFilter { .. })
        ));
    }
}
