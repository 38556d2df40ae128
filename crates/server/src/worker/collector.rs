//! Cache garbage collector: drops every store but the live one.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use skycache_core::{CacheDb, Error, VersionRegistry};

/// The set of stores owned by this origin.
#[async_trait]
pub trait StoreCatalog: Send + Sync {
    async fn store_names(&self) -> Result<Vec<String>, Error>;

    /// Returns false if the store did not exist.
    async fn delete_store(&self, name: &str) -> Result<bool, Error>;
}

#[async_trait]
impl StoreCatalog for CacheDb {
    async fn store_names(&self) -> Result<Vec<String>, Error> {
        CacheDb::store_names(self).await
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        CacheDb::delete_store(self, name).await
    }
}

/// Outcome of one collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub deleted: Vec<String>,
    /// Stores left behind; the next activation tries again.
    pub failed: Vec<String>,
}

#[derive(Clone)]
pub struct CacheCollector {
    catalog: Arc<dyn StoreCatalog>,
    registry: VersionRegistry,
}

impl CacheCollector {
    pub fn new(catalog: Arc<dyn StoreCatalog>, registry: VersionRegistry) -> Self {
        Self { catalog, registry }
    }

    /// Delete every store whose name is not the live store's.
    ///
    /// Deletions run concurrently and independently: a failure is logged and
    /// recorded without affecting the others. Only the initial enumeration
    /// can fail the pass.
    pub async fn collect(&self) -> Result<CollectionReport, Error> {
        let stale: Vec<String> = self
            .catalog
            .store_names()
            .await?
            .into_iter()
            .filter(|name| !self.registry.is_current(name))
            .collect();

        let deletions = stale.iter().map(|name| async move { (name, self.catalog.delete_store(name).await) });

        let mut report = CollectionReport::default();
        for (name, result) in join_all(deletions).await {
            match result {
                Ok(_) => {
                    tracing::info!(store = %name, "deleted stale cache");
                    report.deleted.push(name.clone());
                }
                Err(e) => {
                    tracing::warn!(store = %name, error = %e, "failed to delete stale cache");
                    report.failed.push(name.clone());
                }
            }
        }

        Ok(report)
    }
}
