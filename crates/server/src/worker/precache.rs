//! Precache loader: seeds the live store at install time.

use std::sync::Arc;

use futures::future::join_all;
use skycache_client::Fetcher;
use skycache_core::{CacheDb, Error, Request, Response, VersionRegistry};
use url::Url;

/// Fetches the manifest and writes it into the live store as one unit.
#[derive(Clone)]
pub struct PrecacheLoader {
    db: CacheDb,
    registry: VersionRegistry,
    manifest: Arc<[Url]>,
    fetcher: Arc<dyn Fetcher>,
}

impl PrecacheLoader {
    pub fn new(db: CacheDb, registry: VersionRegistry, manifest: Vec<Url>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { db, registry, manifest: manifest.into(), fetcher }
    }

    /// Fetch every manifest URL and store them all, or nothing.
    ///
    /// All fetches run to completion before anything is written; the first
    /// failure in manifest order is reported. A non-2xx status is a failure.
    /// Returns the number of entries written.
    pub async fn precache(&self) -> Result<usize, Error> {
        let store = self.db.open_store(self.registry.store_name()).await?;

        let fetches = self.manifest.iter().map(|url| self.fetch_entry(url.clone()));
        let pairs = join_all(fetches).await.into_iter().collect::<Result<Vec<_>, _>>()?;

        let written = store.put_all(pairs).await?;
        tracing::info!(store = store.name(), entries = written, "precached manifest");

        Ok(written)
    }

    async fn fetch_entry(&self, url: Url) -> Result<(Request, Response), Error> {
        let request = Request::get(url);
        let response = self
            .fetcher
            .fetch(&request)
            .await
            .map_err(|e| Error::PrecacheFailed { url: request.url().to_string(), reason: e.to_string() })?;

        if !response.is_ok() {
            return Err(Error::PrecacheFailed {
                url: request.url().to_string(),
                reason: format!("status {}", response.status),
            });
        }

        Ok((request, response))
    }
}
