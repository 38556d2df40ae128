//! HTTP fetch pipeline.
//!
//! The strategies only see the [`Fetcher`] trait; [`HttpFetcher`] is the
//! reqwest-backed implementation used by the binary.
//!
//! ### Errors
//! - Transport failures (DNS, refused, reset) become `NETWORK_ERROR`
//! - Any received response is returned as-is, whatever its status
//!
//! ### Response type
//! - Same origin as the application: `basic`
//! - Anything else: `cors`
//!
//! No request timeout is applied.

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Instant;

pub use self::url::{UrlError, canonicalize, resolve};

use skycache_core::{Error, Request, Response, ResponseType};

/// Source of network responses.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request.
    ///
    /// Returns `Err` only when no response was received at all.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "skycache/0.1")
    pub user_agent: String,

    /// Application origin used to classify responses.
    pub origin: ::url::Url,
}

impl FetchConfig {
    pub fn new(origin: ::url::Url) -> Self {
        Self { user_agent: "skycache/0.1".to_string(), origin }
    }
}

/// Classify a response by comparing its final URL with the application origin.
pub fn classify(origin: &::url::Url, final_url: &::url::Url) -> ResponseType {
    if origin.origin() == final_url.origin() { ResponseType::Basic } else { ResponseType::Cors }
}

/// reqwest-backed fetcher.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method(), e)))?;

        let response = self
            .http
            .request(method, request.url().clone())
            .send()
            .await
            .map_err(|e| Error::Network(format!("{}: {}", request.url(), e)))?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        tracing::debug!(
            "fetched {} -> {} ({}) in {}ms ({} bytes)",
            request,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
            response_type: classify(&self.config.origin, &final_url),
            url: Some(final_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> ::url::Url {
        ::url::Url::parse("https://weather.test").unwrap()
    }

    #[test]
    fn test_fetch_config_new() {
        let config = FetchConfig::new(origin());
        assert_eq!(config.user_agent, "skycache/0.1");
        assert_eq!(config.origin.as_str(), "https://weather.test/");
    }

    #[test]
    fn test_classify_same_origin() {
        let url = ::url::Url::parse("https://weather.test/style.css").unwrap();
        assert_eq!(classify(&origin(), &url), ResponseType::Basic);
    }

    #[test]
    fn test_classify_cross_origin() {
        let cdn = ::url::Url::parse("https://cdnjs.cloudflare.com/a.css").unwrap();
        assert_eq!(classify(&origin(), &cdn), ResponseType::Cors);

        let other_port = ::url::Url::parse("https://weather.test:8443/a.css").unwrap();
        assert_eq!(classify(&origin(), &other_port), ResponseType::Cors);

        let other_scheme = ::url::Url::parse("http://weather.test/a.css").unwrap();
        assert_eq!(classify(&origin(), &other_scheme), ResponseType::Cors);
    }

    #[tokio::test]
    async fn test_http_fetcher_new() {
        let fetcher = HttpFetcher::new(FetchConfig::new(origin()));
        assert!(fetcher.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let fetcher = HttpFetcher::new(FetchConfig::new(origin())).unwrap();
        let request = Request::get(::url::Url::parse("http://127.0.0.1:9/unreachable").unwrap());

        let result = fetcher.fetch(&request).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
