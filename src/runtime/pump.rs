//! Sequential queue drain against the trail server.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    config::ClientConfig,
    persist::{PersistError, PersistResult, QueueError, RecordQueue},
    trail::Trail,
    types::SeqKey,
};

use super::events::UploadEvent;

/// Server acknowledgment body: `{"uuid": ..}` for v2, `{"id": ..}` for v1.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct UploadAck {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server answered {0}")]
    Status(u16),
    #[error("server rejected the record ({0})")]
    Rejected(u16),
}

impl UploadError {
    /// Rejections (4xx) will fail the same way again and are never retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

#[derive(Debug, Error)]
pub enum PumpError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("trail encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Delivers one serialized trail to the server.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn upload(&self, payload: &str) -> Result<UploadAck, UploadError>;
}

/// POSTs to `{server}/trail/{user}/{secret}`.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, UploadError> {
        let mut endpoint = reqwest::Url::parse(&config.server_url)
            .map_err(|e| UploadError::Transport(format!("bad server url: {e}")))?;
        endpoint
            .path_segments_mut()
            .map_err(|_| UploadError::Transport("server url cannot be a base".to_string()))?
            .pop_if_empty()
            .push("trail")
            .push(&config.user)
            .push(&config.secret);

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn upload(&self, payload: &str) -> Result<UploadAck, UploadError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            let body = resp
                .bytes()
                .await
                .map_err(|e| UploadError::Transport(e.to_string()))?;
            Ok(serde_json::from_slice(&body).unwrap_or_default())
        } else if status.is_client_error() {
            Err(UploadError::Rejected(status.as_u16()))
        } else {
            Err(UploadError::Status(status.as_u16()))
        }
    }
}

/// How often a retryable upload failure is attempted again before the drain stops.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per record, including the first. `1` disables retries.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Stop on the first failure.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }

    pub fn exponential(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            ..Self::none()
        }
    }

    /// Delay after the `attempt`-th failure (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exp);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Result of one [`UploadPump::drain`] call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DrainReport {
    pub uploaded: u64,
    pub remaining: u64,
    /// Set when the drain stopped early.
    pub failure: Option<UploadError>,
}

/// Owns the durable queue and pushes its records to the server in order.
pub struct UploadPump {
    queue: Box<dyn RecordQueue>,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    events_tx: broadcast::Sender<UploadEvent>,
}

impl UploadPump {
    pub fn new(
        queue: Box<dyn RecordQueue>,
        transport: Arc<dyn Transport>,
        retry: RetryPolicy,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            queue,
            transport,
            retry,
            events_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.events_tx.subscribe()
    }

    pub(crate) fn events(&self) -> broadcast::Sender<UploadEvent> {
        self.events_tx.clone()
    }

    pub fn enqueue(&mut self, payload: &str) -> PersistResult<SeqKey> {
        let key = self.queue.append(payload)?;
        let pending = self.queue.count()?;
        let _ = self.events_tx.send(UploadEvent::Enqueued { key, pending });
        Ok(key)
    }

    pub fn enqueue_trail(&mut self, trail: &Trail) -> Result<SeqKey, PumpError> {
        let payload = trail.to_json()?;
        Ok(self.enqueue(&payload)?)
    }

    pub fn pending(&self) -> PersistResult<u64> {
        self.queue.count()
    }

    /// Drops the head record without uploading it.
    pub fn discard_head(&mut self) -> Result<Option<SeqKey>, PumpError> {
        match self.queue.remove_first() {
            Ok(key) => {
                info!(key, "discarded head record");
                let _ = self.events_tx.send(UploadEvent::Discarded { key });
                Ok(Some(key))
            }
            Err(QueueError::Empty) => Ok(None),
            Err(QueueError::Persist(err)) => Err(err.into()),
        }
    }

    /// Uploads queued records oldest first until the queue is empty or one fails.
    ///
    /// A record is removed only after the server acknowledged it. On failure the
    /// record stays at the head, one `UploadFailed` event is sent and the drain
    /// returns; nothing retriggers it automatically.
    pub async fn drain(&mut self) -> Result<DrainReport, PumpError> {
        let mut report = DrainReport::default();
        loop {
            let record = match self.queue.peek_first() {
                Ok(record) => record,
                Err(QueueError::Empty) => break,
                Err(QueueError::Persist(err)) => return Err(err.into()),
            };

            match upload_with_retry(self.transport.as_ref(), &self.retry, &record.payload).await {
                Ok(ack) => {
                    match self.queue.remove_first() {
                        Ok(_) | Err(QueueError::Empty) => {}
                        Err(QueueError::Persist(err)) => return Err(err.into()),
                    }
                    report.uploaded += 1;
                    let remaining = self.queue.count()?;
                    debug!(key = record.key, remaining, "uploaded record");
                    let _ = self.events_tx.send(UploadEvent::Uploaded {
                        key: record.key,
                        ack,
                        remaining,
                    });
                }
                Err(error) => {
                    warn!(key = record.key, %error, "upload failed; stopping drain");
                    let _ = self.events_tx.send(UploadEvent::UploadFailed {
                        key: record.key,
                        error: error.clone(),
                    });
                    report.failure = Some(error);
                    report.remaining = self.queue.count()?;
                    return Ok(report);
                }
            }
        }

        report.remaining = self.queue.count()?;
        info!(uploaded = report.uploaded, "upload queue drained");
        let _ = self.events_tx.send(UploadEvent::Drained {
            remaining: report.remaining,
        });
        Ok(report)
    }
}

async fn upload_with_retry(
    transport: &dyn Transport,
    retry: &RetryPolicy,
    payload: &str,
) -> Result<UploadAck, UploadError> {
    let attempts = retry.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match transport.upload(payload).await {
            Ok(ack) => return Ok(ack),
            Err(err) if err.is_retryable() && attempt < attempts => {
                let delay = retry.backoff(attempt);
                warn!(attempt, ?delay, error = %err, "upload attempt failed; backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
