//! The caching worker.
//!
//! Ties the version registry, precache loader, garbage collector and router
//! together behind the install / activate / fetch / message lifecycle.

pub mod collector;
pub mod lifecycle;
pub mod precache;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use skycache_client::{Fetcher, canonicalize};
use skycache_core::{AppConfig, CacheDb, Error, VersionRegistry};
use tokio::sync::{Mutex, oneshot};

pub use collector::{CacheCollector, CollectionReport};
pub use lifecycle::{ControlMessage, ExtendableEvent, WorkerState};
pub use precache::PrecacheLoader;
pub use router::{FetchEvent, RoutePolicy, Router};

#[derive(Debug)]
struct Lifecycle {
    state: WorkerState,
    skip_waiting: bool,
    controls_clients: bool,
}

/// One worker generation.
pub struct ServiceWorker {
    registry: VersionRegistry,
    loader: PrecacheLoader,
    collector: CacheCollector,
    router: Router,
    lifecycle: Mutex<Lifecycle>,
}

impl ServiceWorker {
    /// Build the worker from configuration.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_URL` if the origin or a manifest entry cannot be resolved.
    pub fn new(config: &AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let manifest = config
            .precache_manifest
            .iter()
            .map(|entry| canonicalize(entry, &origin).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        let registry = config.registry();
        let loader = PrecacheLoader::new(db.clone(), registry.clone(), manifest, fetcher.clone());
        let collector = CacheCollector::new(Arc::new(db.clone()), registry.clone());
        let router = Router::new(db.store(registry.store_name()), fetcher, RoutePolicy::from_config(config));

        Ok(Self {
            registry,
            loader,
            collector,
            router,
            lifecycle: Mutex::new(Lifecycle {
                state: WorkerState::Parsed,
                skip_waiting: false,
                controls_clients: false,
            }),
        })
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    pub async fn state(&self) -> WorkerState {
        self.lifecycle.lock().await.state
    }

    /// Whether this worker controls every open client, not only new ones.
    pub async fn controls_clients(&self) -> bool {
        self.lifecycle.lock().await.controls_clients
    }

    /// Installed, and asked to skip the waiting phase.
    pub async fn should_activate(&self) -> bool {
        let lifecycle = self.lifecycle.lock().await;
        lifecycle.state == WorkerState::Installed && lifecycle.skip_waiting
    }

    /// Ask to activate as soon as installed, without waiting for clients to close.
    pub async fn skip_waiting(&self) {
        self.lifecycle.lock().await.skip_waiting = true;
    }

    async fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), Error> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != from {
            return Err(Error::InvalidState(format!("cannot move to {:?} from {:?}", to, lifecycle.state)));
        }
        lifecycle.state = to;
        Ok(())
    }

    /// Install: precache the manifest into the live store.
    ///
    /// On failure nothing is committed and the worker returns to `Parsed`,
    /// so a later install can retry.
    pub async fn install(&self) -> Result<(), Error> {
        self.transition(WorkerState::Parsed, WorkerState::Installing).await?;
        tracing::info!(generation = %self.registry.generation(), "installing");

        let mut event = ExtendableEvent::new("install");
        let loader = self.loader.clone();
        event.wait_until(async move {
            loader.precache().await?;
            Ok(())
        });

        match event.settled().await {
            Ok(()) => {
                self.transition(WorkerState::Installing, WorkerState::Installed).await?;
                self.skip_waiting().await;
                tracing::info!(store = self.registry.store_name(), "installed; skipping waiting phase");
                Ok(())
            }
            Err(e) => {
                self.transition(WorkerState::Installing, WorkerState::Parsed).await?;
                tracing::warn!(error = %e, "install failed");
                Err(e)
            }
        }
    }

    /// Activate: delete superseded stores, then claim every client.
    ///
    /// Collection is best-effort; activation completes even if it fails.
    pub async fn activate(&self) -> Result<CollectionReport, Error> {
        self.transition(WorkerState::Installed, WorkerState::Activating).await?;
        tracing::info!(generation = %self.registry.generation(), "activating");

        let (tx, rx) = oneshot::channel();
        let mut event = ExtendableEvent::new("activate");
        let collector = self.collector.clone();
        event.wait_until(async move {
            let report = collector.collect().await?;
            let _ = tx.send(report);
            Ok(())
        });

        if let Err(e) = event.settled().await {
            tracing::warn!(error = %e, "cache collection failed; stale stores kept until next activation");
        }
        let report = rx.await.unwrap_or_default();

        {
            let mut lifecycle = self.lifecycle.lock().await;
            lifecycle.state = WorkerState::Activated;
            lifecycle.controls_clients = true;
        }
        tracing::info!(deleted = report.deleted.len(), failed = report.failed.len(), "activated; claimed clients");

        Ok(report)
    }

    /// Offer an intercepted request to the router.
    ///
    /// Until activation the event is left untouched.
    pub async fn handle_fetch(&self, event: &mut FetchEvent) -> Result<(), Error> {
        if self.state().await != WorkerState::Activated {
            tracing::debug!("not active; ignoring {}", event.request());
            return Ok(());
        }
        self.router.handle(event)?;
        if !event.is_handled() {
            tracing::debug!("passing through {}", event.request());
        }
        Ok(())
    }

    /// Handle a message posted by a client. Returns whether it was recognized.
    pub async fn handle_message(&self, data: &serde_json::Value) -> bool {
        match ControlMessage::parse(data) {
            Some(ControlMessage::SkipWaiting) => {
                tracing::info!("skip waiting requested by client");
                self.skip_waiting().await;
                true
            }
            None => {
                tracing::debug!(message = %data, "ignoring unrecognized message");
                false
            }
        }
    }

    /// Wait for background cache writes to finish.
    pub async fn idle(&self) {
        self.router.flush().await;
    }
}
