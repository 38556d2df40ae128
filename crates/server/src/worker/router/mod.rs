//! Request router and strategy selection.
//!
//! Every intercepted request is either passed through untouched or answered
//! by one of two strategies:
//!
//! - network-first for the weather data API (freshness matters)
//! - cache-first for everything else (content is fixed per generation)

mod offline;
mod strategies;

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use skycache_client::Fetcher;
use skycache_core::{AppConfig, Error, Request, Response, Store};
use tokio_util::task::TaskTracker;

/// An intercepted request awaiting an optional response.
///
/// If nobody calls [`FetchEvent::respond_with`] the host performs the
/// request itself, as if it had never been intercepted.
pub struct FetchEvent {
    request: Request,
    response: Option<BoxFuture<'static, Result<Response, Error>>>,
}

impl FetchEvent {
    pub fn new(request: Request) -> Self {
        Self { request, response: None }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Take over the response. May be called at most once.
    pub fn respond_with<F>(&mut self, response: F) -> Result<(), Error>
    where
        F: Future<Output = Result<Response, Error>> + Send + 'static,
    {
        if self.response.is_some() {
            return Err(Error::InvalidState(format!("{} already has a response", self.request)));
        }
        self.response = Some(Box::pin(response));
        Ok(())
    }

    /// Whether the router took over this request.
    pub fn is_handled(&self) -> bool {
        self.response.is_some()
    }

    /// Drive the registered response, if any.
    pub async fn into_response(self) -> Option<Result<Response, Error>> {
        match self.response {
            Some(response) => Some(response.await),
            None => None,
        }
    }
}

/// Which strategy a request gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted.
    PassThrough,
    /// Weather data: network, then cache, then offline placeholder.
    NetworkFirst,
    /// Static assets: cache, then network with selective fill.
    CacheFirst,
}

/// Classification rules, fixed at construction.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    pub dynamic_host_marker: String,
    pub ignored_schemes: Vec<String>,
    pub offline_notice: String,
}

impl RoutePolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            dynamic_host_marker: config.dynamic_host_marker.clone(),
            ignored_schemes: config.ignored_schemes.iter().map(|s| s.to_ascii_lowercase()).collect(),
            offline_notice: config.offline_notice.clone(),
        }
    }

    pub fn route(&self, request: &Request) -> Route {
        if !request.is_get() || self.ignored_schemes.iter().any(|s| s == request.url().scheme()) {
            Route::PassThrough
        } else if request.url().as_str().contains(&self.dynamic_host_marker) {
            Route::NetworkFirst
        } else {
            Route::CacheFirst
        }
    }
}

/// Dispatches intercepted requests to a strategy against the live store.
#[derive(Clone)]
pub struct Router {
    store: Store,
    fetcher: Arc<dyn Fetcher>,
    policy: Arc<RoutePolicy>,
    writes: TaskTracker,
}

impl Router {
    pub fn new(store: Store, fetcher: Arc<dyn Fetcher>, policy: RoutePolicy) -> Self {
        Self { store, fetcher, policy: Arc::new(policy), writes: TaskTracker::new() }
    }

    /// Classify the request and, unless it passes through, attach the strategy's response.
    pub fn handle(&self, event: &mut FetchEvent) -> Result<(), Error> {
        let route = self.policy.route(event.request());
        let request = event.request().clone();

        match route {
            Route::PassThrough => Ok(()),
            Route::NetworkFirst => {
                let router = self.clone();
                event.respond_with(async move { Ok(router.network_first(&request).await) })
            }
            Route::CacheFirst => {
                let router = self.clone();
                event.respond_with(async move { router.cache_first(&request).await })
            }
        }
    }

    /// Persist a copy of `response` without holding up the caller.
    ///
    /// A failed write is logged and dropped; the next successful fetch of the
    /// same request overwrites the entry anyway.
    fn store_in_background(&self, request: &Request, response: &Response) {
        let store = self.store.clone();
        let request = request.clone();
        let response = response.clone();

        self.writes.spawn(async move {
            match store.put(&request, &response).await {
                Ok(()) => tracing::debug!(store = store.name(), "cached {}", request),
                Err(e) => tracing::warn!(store = store.name(), url = %request.url(), error = %e, "cache write failed"),
            }
        });
    }

    /// Wait for every background cache write started so far.
    pub async fn flush(&self) {
        self.writes.close();
        self.writes.wait().await;
        self.writes.reopen();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::{MockFetcher, get, test_config};
    use skycache_core::CacheDb;
    use url::Url;

    fn policy() -> RoutePolicy {
        RoutePolicy::from_config(&test_config("v1", &[]))
    }

    #[test]
    fn test_route_static() {
        assert_eq!(policy().route(&get("/style.css")), Route::CacheFirst);
        assert_eq!(policy().route(&get("https://cdnjs.cloudflare.com/all.min.css")), Route::CacheFirst);
    }

    #[test]
    fn test_route_dynamic() {
        let request = get("https://api.caiyunapp.com/v2.6/token/116.3,39.9/weather");
        assert_eq!(policy().route(&request), Route::NetworkFirst);
    }

    #[test]
    fn test_route_non_get_passes_through() {
        let post = Request::new("POST", Url::parse("https://api.caiyunapp.com/v2.6/x").unwrap());
        assert_eq!(policy().route(&post), Route::PassThrough);
    }

    #[test]
    fn test_route_extension_scheme_passes_through() {
        let ext = Request::get(Url::parse("chrome-extension://abcdef/content.js").unwrap());
        assert_eq!(policy().route(&ext), Route::PassThrough);
    }

    #[test]
    fn test_respond_with_twice_fails() {
        let mut event = FetchEvent::new(get("/a.css"));
        event.respond_with(async { Ok(Response::new(200, "a")) }).unwrap();
        let second = event.respond_with(async { Ok(Response::new(200, "b")) });
        assert!(matches!(second, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_unhandled_event_has_no_response() {
        let event = FetchEvent::new(get("/a.css"));
        assert!(!event.is_handled());
        assert!(event.into_response().await.is_none());
    }

    #[tokio::test]
    async fn test_pass_through_never_responds_or_fetches() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = MockFetcher::new();
        let router = Router::new(db.store("v1"), fetcher.clone(), policy());

        for request in [
            Request::new("POST", Url::parse("https://weather.test/a.css").unwrap()),
            Request::new("DELETE", Url::parse("https://api.caiyunapp.com/v2").unwrap()),
            Request::get(Url::parse("chrome-extension://abcdef/popup.html").unwrap()),
        ] {
            let mut event = FetchEvent::new(request);
            router.handle(&mut event).unwrap();
            assert!(!event.is_handled());
        }

        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_flush_waits_for_background_writes() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = MockFetcher::new();
        let router = Router::new(db.store("v1"), fetcher, policy());

        let request = get("/a.css");
        router.store_in_background(&request, &Response::new(200, "a"));
        router.flush().await;

        assert!(db.store("v1").match_request(&request).await.unwrap().is_some());

        // the tracker accepts new work after a flush
        router.store_in_background(&get("/b.css"), &Response::new(200, "b"));
        router.flush().await;
        assert_eq!(db.store("v1").len().await.unwrap(), 2);
    }
}
