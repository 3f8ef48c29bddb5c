//! Scripted event source for subscription tests.
//!
//! Each `connect()` pops the next script entry. Once the script runs out,
//! connections succeed but never produce data, which keeps the task parked
//! in a read.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use hue_stream::{ByteStream, EventSource, StreamError, StreamResult};

#[derive(Debug, Clone)]
pub enum Connection {
    /// `connect()` fails with this message
    Refuse(&'static str),
    /// Chunks delivered `delay` apart; the stream then stays open
    Open { chunks: Vec<Bytes>, delay: Duration },
    /// Chunks delivered back to back; the bridge then closes the stream
    Closed(Vec<Bytes>),
}

#[derive(Clone, Default)]
pub struct MockSource {
    script: Arc<Mutex<VecDeque<Connection>>>,
    connects: Arc<AtomicU32>,
}

impl MockSource {
    pub fn new(script: Vec<Connection>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            connects: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for MockSource {
    async fn connect(&self) -> StreamResult<ByteStream> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();

        match next {
            Some(Connection::Refuse(msg)) => Err(StreamError::Connection(msg.to_string())),
            Some(Connection::Open { chunks, delay }) => Ok(stream::iter(chunks)
                .then(move |chunk| async move {
                    tokio::time::sleep(delay).await;
                    Ok::<Bytes, StreamError>(chunk)
                })
                .chain(stream::pending())
                .boxed()),
            Some(Connection::Closed(chunks)) => {
                Ok(stream::iter(chunks.into_iter().map(Ok::<Bytes, StreamError>)).boxed())
            }
            None => Ok(stream::pending().boxed()),
        }
    }
}

/// An SSE frame carrying one light update
pub fn light_frame(light_id: &str, brightness: f64) -> Bytes {
    let payload = format!(
        r#"[{{"creationtime":"2024-01-01T00:00:00Z","id":"evt","type":"update","data":[{{"id":"{}","type":"light","dimming":{{"brightness":{}}}}}]}}]"#,
        light_id, brightness
    );
    Bytes::from(format!("id: 1:0\ndata: {}\n\n", payload))
}
