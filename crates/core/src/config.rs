// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration
//!
//! Loaded from the `config.toml` in the state directory. Every field has a
//! default, so a missing file or a partial table is fine.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub retry: RetryConfig,
    pub durability: DurabilityConfig,
}

impl EngineConfig {
    /// Parse a TOML document, filling in defaults for anything absent
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.min_delay > self.retry.max_delay {
            return Err(ConfigError::Invalid(format!(
                "retry.min_delay ({:?}) exceeds retry.max_delay ({:?})",
                self.retry.min_delay, self.retry.max_delay
            )));
        }
        if self.retry.attempt_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "retry.attempt_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Retry policy for message sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: usize,
    #[serde(with = "humantime_serde")]
    pub min_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Bound on a single attempt
    #[serde(with = "humantime_serde")]
    pub attempt_timeout: Duration,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            attempt_timeout: Duration::from_secs(60),
            jitter: true,
        }
    }
}

/// Retry policy for durable appends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DurabilityConfig {
    pub append_retries: usize,
    #[serde(with = "humantime_serde")]
    pub append_backoff: Duration,
}

impl Default for DurabilityConfig {
    fn default() -> Self {
        Self {
            append_retries: 3,
            append_backoff: Duration::from_millis(50),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
