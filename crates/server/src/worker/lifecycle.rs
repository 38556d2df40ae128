//! Lifecycle primitives: worker states, extendable events, control messages.

use std::future::Future;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use skycache_core::Error;
use tokio::task::JoinHandle;

/// Where the worker is in its install/activate lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Not installed yet, or the last install failed.
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    /// Active: intercepts requests.
    Activated,
}

/// A lifecycle event whose completion waits on registered work.
///
/// Each piece of work is spawned immediately; [`ExtendableEvent::settled`]
/// resolves only once every registered handle has finished.
pub struct ExtendableEvent {
    kind: &'static str,
    pending: Vec<JoinHandle<Result<(), Error>>>,
}

impl ExtendableEvent {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, pending: Vec::new() }
    }

    /// Extend the event until `work` completes.
    pub fn wait_until<F>(&mut self, work: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.pending.push(tokio::spawn(work));
    }

    /// Number of registered pieces of work.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Wait for all registered work; returns the first failure, in registration order.
    pub async fn settled(self) -> Result<(), Error> {
        let kind = self.kind;
        tracing::debug!(event = kind, pending = self.pending(), "waiting for extendable work");
        let mut first_error = None;

        for result in join_all(self.pending).await {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => Err(Error::TaskFailed(format!("{kind}: {e}"))),
            };
            if let Err(e) = outcome {
                tracing::debug!(event = kind, error = %e, "extendable work failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Messages the hosting page can post to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Leave the waiting phase and activate now.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
}

impl ControlMessage {
    /// Recognize a message payload; anything else yields `None`.
    pub fn parse(data: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(data.clone()).ok()
    }
}
