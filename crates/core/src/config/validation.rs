//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `generation` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - `dynamic_host_marker` or `user_agent` is empty
    /// - a manifest entry is blank
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "generation".into(), reason: "must not be empty".into() });
        }

        self.origin_url()?;

        if self.dynamic_host_marker.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "dynamic_host_marker".into(),
                reason: "must not be empty".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if let Some(pos) = self.precache_manifest.iter().position(|u| u.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "precache_manifest".into(),
                reason: format!("entry {pos} is empty"),
            });
        }

        let unique: HashSet<&str> = self.precache_manifest.iter().map(|u| u.trim()).collect();
        if unique.len() != self.precache_manifest.len() {
            tracing::warn!(
                entries = self.precache_manifest.len(),
                unique = unique.len(),
                "precache_manifest contains duplicate entries; the last fetch wins"
            );
        }

        Ok(())
    }
}
