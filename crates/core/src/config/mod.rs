//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SKYCACHE_*)
//! 2. TOML config file (if SKYCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded value is immutable: it is read once at startup and handed to
//! each component at construction.

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::version::{BUILD_GENERATION, Generation, VersionRegistry};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SKYCACHE_*)
/// 2. TOML config file (if SKYCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via SKYCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Current cache generation identifier.
    ///
    /// Defaults to the value baked in at build time (SKYCACHE_GENERATION).
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Prefix for the live store name (`<prefix>-<generation>`).
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: Option<String>,

    /// Origin of the hosted application; relative URLs resolve against it
    /// and only responses from it count as same-origin.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Assets fetched and stored at install time, in order.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// Substring identifying requests to the weather data API.
    #[serde(default = "default_dynamic_host_marker")]
    pub dynamic_host_marker: String,

    /// URL schemes that are never intercepted.
    #[serde(default = "default_ignored_schemes")]
    pub ignored_schemes: Vec<String>,

    /// Human-readable prefix of the offline placeholder message.
    #[serde(default = "default_offline_notice")]
    pub offline_notice: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SKYCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./skycache.sqlite")
}

fn default_generation() -> String {
    BUILD_GENERATION.into()
}

fn default_cache_prefix() -> Option<String> {
    Some("yt-weather".into())
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_precache_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/manifest.json",
        "/style.css",
        "/app.js",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/css/all.min.css",
        "https://fonts.googleapis.com/css2?family=Poppins:wght@300;400;500;600;700&family=Noto+Sans+SC:wght@300;400;500;700&display=swap",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_dynamic_host_marker() -> String {
    "api.caiyunapp.com".into()
}

fn default_ignored_schemes() -> Vec<String> {
    vec!["chrome-extension".into(), "moz-extension".into(), "safari-web-extension".into()]
}

fn default_offline_notice() -> String {
    "You are currently offline. Last updated".into()
}

fn default_user_agent() -> String {
    "skycache/0.1".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            generation: default_generation(),
            cache_prefix: default_cache_prefix(),
            origin: default_origin(),
            precache_manifest: default_precache_manifest(),
            dynamic_host_marker: default_dynamic_host_marker(),
            ignored_schemes: default_ignored_schemes(),
            offline_notice: default_offline_notice(),
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SKYCACHE_`
    /// 2. TOML file from `SKYCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SKYCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SKYCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(figment)
    }

    /// Extract and validate a configuration from an already layered figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The version registry for the configured generation.
    pub fn registry(&self) -> VersionRegistry {
        VersionRegistry::new(Generation::new(self.generation.trim()), self.cache_prefix.as_deref())
    }

    /// The application origin as a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.origin.trim())
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: format!("unsupported scheme: {scheme}"),
            }),
        }
    }
}
