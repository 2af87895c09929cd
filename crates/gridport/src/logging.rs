/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Tracing subscriber setup for hosts that do not install their own.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Build the filter: `RUST_LOG` wins, otherwise the configured level.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install a global fmt subscriber writing to stderr.
///
/// Returns `false` when a global subscriber was already installed, in which
/// case the existing one is left alone.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(config.with_target),
        )
        .with(build_filter(config))
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Logging initialized at level {}", config.level);
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_configured_level_applies_without_rust_log() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "debug".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(build_filter(&config).to_string(), "debug");
    }

    #[test]
    #[serial]
    fn test_rust_log_overrides_configured_level() {
        std::env::set_var("RUST_LOG", "gridport=trace");
        let filter = build_filter(&LoggingConfig::default());
        std::env::remove_var("RUST_LOG");
        assert_eq!(filter.to_string(), "gridport=trace");
    }
}
