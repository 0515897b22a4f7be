//! Reconnecting consumer of a room's event stream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::decoder::SseDecoder;
use super::ClientError;
use crate::events::ChatEvent;

pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Why [`EventStreamClient::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    ConsumerGone,
}

/// Connects to `/sse/{room}?token=` and forwards decoded events. Any
/// connect failure, non-2xx status or end of stream is followed by a fixed
/// delay and a new attempt, indefinitely.
#[derive(Debug, Clone)]
pub struct EventStreamClient {
    http: reqwest::Client,
    base_url: String,
    room_id: String,
    token: String,
    retry_delay: Duration,
}

impl EventStreamClient {
    pub fn new(base_url: impl Into<String>, room_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            room_id: room_id.into(),
            token: token.into(),
            retry_delay: RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn url(&self) -> String {
        format!("{}/sse/{}", self.base_url.trim_end_matches('/'), self.room_id)
    }

    /// Run on a background task. Events arrive on `events`.
    pub fn spawn(self, events: mpsc::Sender<ChatEvent>) -> StreamHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let task = tokio::spawn(async move {
            let reason = self.run(events, shutdown_rx, counter).await;
            debug!(?reason, "event stream client stopped");
        });
        StreamHandle { shutdown: shutdown_tx, attempts, task }
    }

    /// Loop until shutdown is signalled (or its sender dropped) or the
    /// receiving side of `events` is closed.
    pub async fn run(
        self,
        events: mpsc::Sender<ChatEvent>,
        mut shutdown: watch::Receiver<bool>,
        attempts: Arc<AtomicUsize>,
    ) -> StopReason {
        loop {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            let outcome = tokio::select! {
                _ = shutdown.changed() => return StopReason::Shutdown,
                outcome = self.connect_once(&events) => outcome,
            };
            match outcome {
                Ok(()) => info!(attempt, room_id = %self.room_id, "event stream ended"),
                Err(ClientError::ConsumerGone) => return StopReason::ConsumerGone,
                Err(e) => warn!(attempt, room_id = %self.room_id, "event stream failed: {e}"),
            }
            if events.is_closed() {
                return StopReason::ConsumerGone;
            }
            tokio::select! {
                _ = shutdown.changed() => return StopReason::Shutdown,
                _ = tokio::time::sleep(self.retry_delay) => {}
            }
        }
    }

    async fn connect_once(&self, events: &mpsc::Sender<ChatEvent>) -> Result<(), ClientError> {
        let resp = self
            .http
            .get(self.url())
            .query(&[("token", self.token.as_str())])
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status { status: status.as_u16(), message });
        }

        let mut body = resp.bytes_stream();
        let mut decoder = SseDecoder::new();
        while let Some(chunk) = body.next().await {
            for frame in decoder.push(&chunk?) {
                match serde_json::from_str::<ChatEvent>(&frame.data) {
                    Ok(event) => events.send(event).await.map_err(|_| ClientError::ConsumerGone)?,
                    Err(e) => debug!("skipping undecodable frame: {e}"),
                }
            }
        }
        Ok(())
    }
}

/// Controls a spawned [`EventStreamClient`].
pub struct StreamHandle {
    shutdown: watch::Sender<bool>,
    attempts: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Connection attempts made so far, including the first.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
