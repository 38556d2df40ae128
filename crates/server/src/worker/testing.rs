//! Test doubles shared by the worker tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use skycache_client::{Fetcher, classify};
use skycache_core::{AppConfig, Error, Request, Response};
use url::Url;

pub const ORIGIN: &str = "https://weather.test";

/// Scripted network: known URLs answer with their route, unknown URLs 404,
/// and everything fails while offline.
pub struct MockFetcher {
    origin: Url,
    routes: Mutex<HashMap<String, Response>>,
    failing: Mutex<Vec<String>>,
    online: AtomicBool,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Url::parse(ORIGIN).unwrap(),
            routes: Mutex::new(HashMap::new()),
            failing: Mutex::new(Vec::new()),
            online: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        })
    }

    /// Answer `url` (absolute or origin-relative) with `status` and `body`.
    pub fn route(&self, url: &str, status: u16, body: &str) {
        let url = self.origin.join(url).unwrap();
        let response = Response::new(status, body.to_string())
            .with_header("Content-Type", "text/plain")
            .with_type(classify(&self.origin, &url))
            .with_url(url.clone());
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    /// Make fetches of `url` fail at the transport level.
    pub fn fail(&self, url: &str) {
        let url = self.origin.join(url).unwrap();
        self.failing.lock().unwrap().push(url.to_string());
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let url = request.url().to_string();
        if !self.online.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&url) {
            return Err(Error::Network(format!("{url}: connection refused")));
        }

        let routed = self.routes.lock().unwrap().get(&url).cloned();
        Ok(routed.unwrap_or_else(|| {
            Response::new(404, "not found")
                .with_type(classify(&self.origin, request.url()))
                .with_url(request.url().clone())
        }))
    }
}

/// Configuration pointing at the mock origin with an unprefixed store name.
pub fn test_config(generation: &str, manifest: &[&str]) -> AppConfig {
    AppConfig {
        generation: generation.to_string(),
        cache_prefix: None,
        origin: ORIGIN.to_string(),
        precache_manifest: manifest.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

pub fn get(url: &str) -> Request {
    Request::get(Url::parse(ORIGIN).unwrap().join(url).unwrap())
}
