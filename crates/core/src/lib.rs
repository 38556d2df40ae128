//! Core types and shared functionality for skycache.
//!
//! This crate provides:
//! - Versioned response store with SQLite backend
//! - Request and response value types
//! - Version registry (current cache generation)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod version;

pub use cache::{CacheDb, Store};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Request, Response, ResponseType};
pub use version::{Generation, VersionRegistry};
