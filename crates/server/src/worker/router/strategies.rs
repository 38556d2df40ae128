//! The two caching strategies.

use skycache_core::{Error, Request, Response, ResponseType};

use super::Router;
use super::offline::offline_response;

impl Router {
    /// Network first, then the live store, then the offline placeholder.
    ///
    /// Never fails: a transport error is recovered locally. A response with
    /// an error status still counts as a network success.
    pub(crate) async fn network_first(&self, request: &Request) -> Response {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_in_background(request, &response);
                response
            }
            Err(e) => {
                tracing::debug!(error = %e, "network failed for {}, trying cache", request);
                match self.lookup(request).await {
                    Some(cached) => cached,
                    None => {
                        tracing::info!(url = %request.url(), "serving offline placeholder");
                        offline_response(&self.policy.offline_notice)
                    }
                }
            }
        }
    }

    /// Live store first; on a miss fetch, caching only same-origin 200 responses.
    ///
    /// A transport error on a miss is returned to the caller unchanged.
    pub(crate) async fn cache_first(&self, request: &Request) -> Result<Response, Error> {
        if let Some(cached) = self.lookup(request).await {
            tracing::debug!("cache hit for {}", request);
            return Ok(cached);
        }

        tracing::debug!("cache miss for {}", request);
        let response = self.fetcher.fetch(request).await?;

        if response.status == 200 && response.response_type == ResponseType::Basic {
            self.store_in_background(request, &response);
        } else {
            tracing::debug!(
                status = response.status,
                response_type = response.response_type.as_str(),
                "not caching {}",
                request
            );
        }

        Ok(response)
    }

    /// Store lookup where a read failure counts as a miss.
    async fn lookup(&self, request: &Request) -> Option<Response> {
        match self.store.match_request(request).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(store = self.store.name(), url = %request.url(), error = %e, "cache lookup failed");
                None
            }
        }
    }
}
