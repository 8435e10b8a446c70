// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! Session-level configuration.

/// Logging configuration for a builder session. Kept separate from the
/// process-wide `env_logger` initialisation (see `qnet_ir_cli`) so library
/// consumers embedding a session inside a larger application can choose their
/// own logging setup without this crate fighting over the global logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: log::LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: log::LevelFilter::Info,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn new(level: log::LevelFilter) -> Self {
        Self { level }
    }
}
