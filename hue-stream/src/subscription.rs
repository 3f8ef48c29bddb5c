//! Reconnecting event-stream subscription
//!
//! A background task owns the connection. It decodes SSE frames, runs them
//! through the normalizer, debounces bursts into batches and forwards them
//! over a bounded channel. The task never touches application state; it
//! only produces [`StreamEvent`]s.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use hue_api::HueBridge;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::StreamConfig;
use crate::error::{StreamError, StreamResult};
use crate::event::{ResourceUpdate, StreamEvent};
use crate::normalizer::normalize_payload;
use crate::sse::SseDecoder;

/// Raw body chunks of one open connection
pub type ByteStream = BoxStream<'static, StreamResult<Bytes>>;

/// Something that can open an SSE connection
///
/// Implemented for the real bridge by [`BridgeEventSource`]; tests supply
/// scripted sources.
#[async_trait]
pub trait EventSource: Send + Sync + 'static {
    async fn connect(&self) -> StreamResult<ByteStream>;
}

/// `GET /eventstream/clip/v2` on a physical bridge
#[derive(Debug, Clone)]
pub struct BridgeEventSource {
    bridge: HueBridge,
}

impl BridgeEventSource {
    pub fn new(bridge: HueBridge) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl EventSource for BridgeEventSource {
    async fn connect(&self) -> StreamResult<ByteStream> {
        let response = self.bridge.event_stream_request()?.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Rejected {
                status: status.as_u16(),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(StreamError::from))
            .boxed())
    }
}

/// Handle to the background stream task
///
/// Events are read from the receiver returned by [`EventSubscription::new`].
/// The receiver outlives restarts: `stop()` followed by `start()` keeps
/// feeding the same channel.
pub struct EventSubscription<S: EventSource> {
    source: Arc<S>,
    config: StreamConfig,
    events: mpsc::Sender<StreamEvent>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    task_handle: Option<JoinHandle<()>>,
}

impl<S: EventSource> EventSubscription<S> {
    pub fn new(source: S, config: StreamConfig) -> StreamResult<(Self, mpsc::Receiver<StreamEvent>)> {
        config.validate()?;
        let (events, receiver) = mpsc::channel(config.channel_capacity);
        Ok((
            Self {
                source: Arc::new(source),
                config,
                events,
                shutdown_tx: None,
                task_handle: None,
            },
            receiver,
        ))
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Spawn the connection task; a no-op while it is already running
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let worker = StreamWorker {
            source: Arc::clone(&self.source),
            config: self.config.clone(),
            events: self.events.clone(),
        };

        self.task_handle = Some(tokio::spawn(worker.run(shutdown_rx)));
        self.shutdown_tx = Some(shutdown_tx);
        tracing::info!("event subscription started");
    }

    /// Signal the task and wait for it to exit
    ///
    /// Interrupts an in-flight read or a reconnect backoff.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.task_handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("event stream task ended abnormally: {}", e);
            }
        }
        tracing::info!("event subscription stopped");
    }
}

impl<S: EventSource> Drop for EventSubscription<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

/// Why a connection session ended
#[derive(Debug)]
enum SessionEnd {
    Lost(String),
    ConsumerGone,
}

struct StreamWorker<S: EventSource> {
    source: Arc<S>,
    config: StreamConfig,
    events: mpsc::Sender<StreamEvent>,
}

impl<S: EventSource> StreamWorker<S> {
    async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        loop {
            let end = tokio::select! {
                _ = shutdown_rx.recv() => break,
                end = self.session() => end,
            };

            let reason = match end {
                SessionEnd::ConsumerGone => {
                    tracing::debug!("event consumer dropped, stopping stream task");
                    break;
                }
                SessionEnd::Lost(reason) => reason,
            };

            tracing::warn!(
                "event stream lost: {}, reconnecting in {:?}",
                reason,
                self.config.reconnect_backoff
            );

            tokio::select! {
                _ = shutdown_rx.recv() => break,
                sent = self.events.send(StreamEvent::Disconnected(reason)) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }

            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = tokio::time::sleep(self.config.reconnect_backoff) => {}
            }
        }
    }

    /// One connection, from connect to loss
    async fn session(&self) -> SessionEnd {
        let mut stream = match self.source.connect().await {
            Ok(stream) => stream,
            Err(e) => return SessionEnd::Lost(e.to_string()),
        };

        tracing::info!("event stream connected");
        if self.events.send(StreamEvent::Connected).await.is_err() {
            return SessionEnd::ConsumerGone;
        }

        let mut decoder = SseDecoder::new(self.config.max_event_bytes);
        let mut pending: Vec<ResourceUpdate> = Vec::new();
        let flush_timer = tokio::time::sleep(Duration::from_secs(3600));
        tokio::pin!(flush_timer);
        let mut armed = false;
        // When the oldest update in `pending` must go out at the latest
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        let before = pending.len();
                        for frame in decoder.push(&bytes) {
                            match frame {
                                Ok(payload) => pending.extend(normalize_payload(&payload)),
                                Err(e) => tracing::warn!("dropping event: {}", e),
                            }
                        }
                        if pending.len() == before {
                            continue;
                        }

                        if self.config.batch_window.is_zero() {
                            if !self.flush(&mut pending).await {
                                return SessionEnd::ConsumerGone;
                            }
                        } else {
                            // Debounce, but never past the first update's deadline
                            let now = Instant::now();
                            let flush_by = *deadline.get_or_insert(now + self.config.max_batch_delay);
                            flush_timer.as_mut().reset((now + self.config.batch_window).min(flush_by));
                            armed = true;
                        }
                    }
                    Some(Err(e)) => {
                        if !self.flush(&mut pending).await {
                            return SessionEnd::ConsumerGone;
                        }
                        return SessionEnd::Lost(e.to_string());
                    }
                    None => {
                        if !self.flush(&mut pending).await {
                            return SessionEnd::ConsumerGone;
                        }
                        return SessionEnd::Lost(StreamError::Ended.to_string());
                    }
                },
                _ = &mut flush_timer, if armed => {
                    armed = false;
                    deadline = None;
                    if !self.flush(&mut pending).await {
                        return SessionEnd::ConsumerGone;
                    }
                }
            }
        }
    }

    /// Send the pending batch; false once the consumer is gone
    async fn flush(&self, pending: &mut Vec<ResourceUpdate>) -> bool {
        if pending.is_empty() {
            return true;
        }
        let batch = std::mem::take(pending);
        tracing::debug!("delivering batch of {} updates", batch.len());
        self.events.send(StreamEvent::Batch(batch)).await.is_ok()
    }
}
