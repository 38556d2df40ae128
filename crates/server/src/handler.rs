//! Line-delimited JSON host.
//!
//! Each input line is one lifecycle event addressed to the worker; each event
//! gets exactly one reply line. Logs never go to stdout.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use skycache_client::resolve;
use skycache_core::{Error, Request, Response};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use url::Url;

use crate::error::HostError;
use crate::worker::{FetchEvent, ServiceWorker, WorkerState};

/// An event delivered by the embedding application.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Install,
    Activate,
    Fetch {
        url: String,
        #[serde(default = "default_method")]
        method: String,
    },
    Message {
        #[serde(default)]
        data: Value,
    },
}

fn default_method() -> String {
    "GET".to_string()
}

/// How [`ReplyResponse::body`] is carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyEncoding {
    Utf8,
    Base64,
}

/// Response as seen by the host.
///
/// Bodies that are valid UTF-8 travel as text; anything else is base64 so the
/// bytes arrive unchanged.
#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub status: u16,
    pub status_text: String,
    pub response_type: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub body_encoding: BodyEncoding,
}

impl From<&Response> for ReplyResponse {
    fn from(response: &Response) -> Self {
        let (body, body_encoding) = match std::str::from_utf8(&response.body) {
            Ok(text) => (text.to_string(), BodyEncoding::Utf8),
            Err(_) => (STANDARD.encode(&response.body), BodyEncoding::Base64),
        };

        Self {
            status: response.status,
            status_text: response.status_text.clone(),
            response_type: response.response_type.as_str(),
            headers: response.headers.clone(),
            body,
            body_encoding,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostReply {
    Install {
        ok: bool,
        state: WorkerState,
        activated: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Activate {
        ok: bool,
        state: WorkerState,
        controls_clients: bool,
        deleted: Vec<String>,
        failed: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Fetch {
        handled: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<ReplyResponse>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Message {
        recognized: bool,
        state: WorkerState,
        activated: bool,
    },
    Error {
        error: String,
    },
}

/// Drives one worker from a stream of events.
pub struct Host {
    worker: ServiceWorker,
    origin: Url,
}

impl Host {
    pub fn new(worker: ServiceWorker, origin: Url) -> Self {
        Self { worker, origin }
    }

    /// Parse and dispatch one input line. Never fails; problems become an error reply.
    pub async fn dispatch_line(&self, line: &str) -> HostReply {
        match serde_json::from_str::<HostEvent>(line).map_err(HostError::from) {
            Ok(event) => self.dispatch(event).await,
            Err(e) => {
                tracing::warn!(error = %e, "rejected malformed event");
                HostReply::Error { error: e.to_string() }
            }
        }
    }

    pub async fn dispatch(&self, event: HostEvent) -> HostReply {
        match event {
            HostEvent::Install => {
                let result = self.worker.install().await;
                let activated = result.is_ok() && self.activate_if_ready().await;
                HostReply::Install {
                    ok: result.is_ok(),
                    state: self.worker.state().await,
                    activated,
                    error: result.err().map(|e| e.to_string()),
                }
            }
            HostEvent::Activate => match self.worker.activate().await {
                Ok(report) => HostReply::Activate {
                    ok: true,
                    state: self.worker.state().await,
                    controls_clients: self.worker.controls_clients().await,
                    deleted: report.deleted,
                    failed: report.failed,
                    error: None,
                },
                Err(e) => HostReply::Activate {
                    ok: false,
                    state: self.worker.state().await,
                    controls_clients: self.worker.controls_clients().await,
                    deleted: Vec::new(),
                    failed: Vec::new(),
                    error: Some(e.to_string()),
                },
            },
            HostEvent::Fetch { url, method } => self.fetch(&url, &method).await,
            HostEvent::Message { data } => {
                let recognized = self.worker.handle_message(&data).await;
                let activated = recognized && self.activate_if_ready().await;
                HostReply::Message { recognized, state: self.worker.state().await, activated }
            }
        }
    }

    /// Offer the request to the worker.
    ///
    /// `handled` is true only when a strategy took the request; a URL that cannot
    /// be resolved never reaches the router and gets an error reply instead.
    async fn fetch(&self, url: &str, method: &str) -> HostReply {
        let request = match resolve(url, &self.origin) {
            Ok(resolved) => Request::new(method, resolved),
            Err(e) => {
                let error = HostError::from(Error::InvalidUrl(format!("{url:?}: {e}")));
                tracing::warn!(error = %error, "rejected fetch event");
                return HostReply::Error { error: error.to_string() };
            }
        };

        let mut event = FetchEvent::new(request);
        if let Err(e) = self.worker.handle_fetch(&mut event).await {
            return HostReply::Error { error: e.to_string() };
        }

        match event.into_response().await {
            Some(Ok(response)) => {
                HostReply::Fetch { handled: true, response: Some(ReplyResponse::from(&response)), error: None }
            }
            Some(Err(e)) => HostReply::Fetch { handled: true, response: None, error: Some(e.to_string()) },
            None => HostReply::Fetch { handled: false, response: None, error: None },
        }
    }

    /// Activate a waiting worker that asked to skip waiting. Returns whether it activated.
    async fn activate_if_ready(&self) -> bool {
        if !self.worker.should_activate().await {
            return false;
        }
        match self.worker.activate().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "automatic activation failed");
                false
            }
        }
    }

    /// Serve events until `input` is exhausted, then wait for pending cache writes.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<(), HostError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let reply = self.dispatch_line(&line).await;
            let mut encoded = serde_json::to_vec(&reply)?;
            encoded.push(b'\n');
            output.write_all(&encoded).await?;
            output.flush().await?;
        }

        tracing::debug!("input closed; waiting for cache writes");
        self.worker.idle().await;
        Ok(())
    }
}
