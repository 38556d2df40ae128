//! Client code for skycache.
//!
//! This crate provides the network side of the caching agent: URL
//! resolution against the application origin and the fetch pipeline used
//! by the strategies and the precache loader.

pub mod fetch;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher, UrlError, canonicalize, classify, resolve};
