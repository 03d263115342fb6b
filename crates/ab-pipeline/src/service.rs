//! External generation service client.
//!
//! The service is black-boxed behind [`GenerationService`] so the
//! orchestrator can be tested against a scripted double. The HTTP
//! implementation is request/poll-style: create a request, then poll at a
//! fixed interval until it reaches a terminal status, bounded by a
//! stage-specific timeout.

use crate::error::{PipelineError, Result};
use crate::shapes::HighLevelShape;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

pub const VALIDATE_TIMEOUT: Duration = Duration::from_secs(30);
pub const GENERATE_TIMEOUT: Duration = Duration::from_secs(60);
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

// ─── Cancellation ───────────────────────────────────────────────────────

/// Cancel side of a pipeline abort pair. One handle per pipeline run.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Observer side, threaded through every external call and pacing sleep.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when the handle fires. If the handle is dropped without
    /// cancelling, this pends forever (the run simply completes).
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Sleep that aborts early with [`PipelineError::Cancelled`] when the
/// token fires. Used for retry backoff and pacing delays so a cancelled
/// pipeline never sits out a multi-second wait.
pub async fn cancellable_sleep(duration: Duration, cancel: &CancelToken) -> Result<()> {
    if duration.is_zero() {
        return if cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        };
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        _ = sleep(duration) => Ok(()),
    }
}

// ─── Service contract ───────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationVerdict {
    pub accepted: bool,
    #[serde(default)]
    pub raw_text: String,
}

/// The three request shapes the pipeline issues. `structure` and `detail`
/// return free-form text expected to contain a JSON payload; extraction
/// and validation happen in the orchestrator.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn validate(&self, prompt: &str, cancel: &CancelToken) -> Result<ValidationVerdict>;

    async fn structure(&self, prompt: &str, cancel: &CancelToken) -> Result<String>;

    async fn detail(
        &self,
        shape: &HighLevelShape,
        prompt: &str,
        cancel: &CancelToken,
    ) -> Result<String>;
}

// ─── HTTP implementation ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    status: String,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct HttpGenerationService {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpGenerationService {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create-then-poll round trip. The cancel token is raced against
    /// every await so an abort stops network activity immediately.
    async fn request(
        &self,
        kind: &str,
        payload: serde_json::Value,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<String> {
        let create = self
            .client
            .post(format!("{}/requests", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({ "kind": kind, "payload": payload }));
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            res = create.send() => res.map_err(|e| PipelineError::Service(e.to_string()))?,
        };
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Service(format!("{status}: {body}")));
        }
        let created: CreateResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Parse(e.to_string()))?;

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            cancellable_sleep(POLL_INTERVAL, cancel).await?;
            if tokio::time::Instant::now() >= deadline {
                return Err(PipelineError::Timeout(timeout));
            }
            let poll = self
                .client
                .get(format!("{}/requests/{}", self.base_url, created.id))
                .bearer_auth(&self.api_key)
                .send();
            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                res = poll => res.map_err(|e| PipelineError::Service(e.to_string()))?,
            };
            let polled: PollResponse = response
                .json()
                .await
                .map_err(|e| PipelineError::Parse(e.to_string()))?;
            match polled.status.as_str() {
                "complete" => {
                    return polled
                        .output
                        .ok_or_else(|| PipelineError::Parse("complete with no output".into()));
                }
                "failed" => {
                    return Err(PipelineError::Service(
                        polled.error.unwrap_or_else(|| "request failed".into()),
                    ));
                }
                _ => {}
            }
        }
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    async fn validate(&self, prompt: &str, cancel: &CancelToken) -> Result<ValidationVerdict> {
        let text = self
            .request("validate", json!({ "prompt": prompt }), VALIDATE_TIMEOUT, cancel)
            .await?;
        let json_text = crate::shapes::extract_json_object(&text)
            .ok_or_else(|| PipelineError::Parse(format!("no verdict object in: {text}")))?;
        serde_json::from_str(json_text).map_err(|e| PipelineError::Parse(e.to_string()))
    }

    async fn structure(&self, prompt: &str, cancel: &CancelToken) -> Result<String> {
        self.request("structure", json!({ "prompt": prompt }), GENERATE_TIMEOUT, cancel)
            .await
    }

    async fn detail(
        &self,
        shape: &HighLevelShape,
        prompt: &str,
        cancel: &CancelToken,
    ) -> Result<String> {
        let payload = json!({ "prompt": prompt, "shape": shape });
        self.request("detail", payload, GENERATE_TIMEOUT, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_reports_cancellation() {
        let (handle, token) = cancel_pair();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
        token.cancelled().await;
    }

    #[tokio::test]
    async fn backoff_sleep_aborts_on_cancel() {
        let (handle, token) = cancel_pair();
        let sleeper = tokio::spawn(async move {
            cancellable_sleep(Duration::from_secs(60), &token).await
        });
        handle.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), sleeper)
            .await
            .expect("sleep did not abort")
            .expect("task panicked");
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }
}
