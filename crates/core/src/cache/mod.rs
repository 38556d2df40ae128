//! SQLite-backed versioned response store.
//!
//! This module provides a persistent set of named stores, one per cache
//! generation, using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Request keys derived from method and canonical URL (SHA-256)
//! - Overwrite-only writes (last write wins)
//! - All-or-nothing batch writes for precaching
//! - Whole-store deletion for garbage collection
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::Store;
