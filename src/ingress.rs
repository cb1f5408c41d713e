//! Ingress — C3.
//!
//! Presents a lazy, unbounded sequence of decoded messages to the driver.
//! The production transport is a ZMQ `PULL` socket (see
//! `original_source/zmq_receiver.py`); since there is no maintained async ZMQ
//! binding, the blocking `recv()` runs on a dedicated OS thread via
//! `tokio::task::spawn_blocking`, forwarding decoded frames to the driver
//! over a bounded `tokio::sync::mpsc` channel. That channel recv is the
//! driver's only ingress-side suspension point.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::EngineError;

/// A single decoded trade message. Unknown JSON fields are ignored by
/// `serde`'s default behavior; missing required fields fail deserialization
/// and surface as `IngressEvent::Decode`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    pub exchange: String,
    pub symbol: String,
    pub price: f64,
    pub timestamp: i64,
}

/// One item delivered to the driver: either a successfully decoded message
/// or a decode failure to be logged and skipped.
#[derive(Debug)]
pub enum IngressEvent {
    Message(RawMessage),
    Decode(EngineError),
}

#[derive(Debug, Clone)]
pub struct IngressStats {
    pub messages_received: u64,
    pub endpoint: String,
}

/// The ingress port the driver depends on. Implemented concretely by
/// [`ZmqIngress`]; tests substitute a fake that pushes canned events.
#[async_trait]
pub trait Ingress: Send {
    async fn connect(&mut self) -> Result<(), EngineError>;

    /// Run the receive loop, forwarding every event to `tx`, until `close()`
    /// is called or the transport suffers a fatal error.
    async fn run(&mut self, tx: mpsc::Sender<IngressEvent>) -> Result<(), EngineError>;

    fn stats(&self) -> IngressStats;

    fn close(&mut self);
}

/// ZMQ `PULL`-socket ingress.
pub struct ZmqIngress {
    endpoint: String,
    context: zmq::Context,
    socket: Option<zmq::Socket>,
    messages_received: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
}

impl ZmqIngress {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            context: zmq::Context::new(),
            socket: None,
            messages_received: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    fn decode(bytes: &[u8]) -> Result<RawMessage, EngineError> {
        serde_json::from_slice(bytes).map_err(|e| EngineError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Ingress for ZmqIngress {
    async fn connect(&mut self) -> Result<(), EngineError> {
        let socket = self
            .context
            .socket(zmq::PULL)
            .map_err(|e| EngineError::TransportFatal(e.to_string()))?;
        socket
            .connect(&self.endpoint)
            .map_err(|e| EngineError::TransportFatal(e.to_string()))?;
        // Short poll timeout keeps the blocking recv loop cooperatively
        // cancellable without a native async-cancel primitive in zmq.
        socket
            .set_rcvtimeo(ZMQ_POLL_TIMEOUT.as_millis() as i32)
            .map_err(|e| EngineError::TransportFatal(e.to_string()))?;

        info!(endpoint = %self.endpoint, "[ZMQ] Connected");
        self.socket = Some(socket);
        Ok(())
    }

    async fn run(&mut self, tx: mpsc::Sender<IngressEvent>) -> Result<(), EngineError> {
        let socket = self
            .socket
            .take()
            .ok_or_else(|| EngineError::TransportFatal("ingress not connected".to_string()))?;

        let running = self.running.clone();
        let messages_received = self.messages_received.clone();

        let socket = tokio::task::spawn_blocking(move || {
            debug!("[ZMQ] Starting receive loop");
            while running.load(Ordering::Relaxed) {
                match socket.recv_bytes(0) {
                    Ok(bytes) => {
                        messages_received.fetch_add(1, Ordering::Relaxed);
                        let event = match ZmqIngress::decode(&bytes) {
                            Ok(msg) => IngressEvent::Message(msg),
                            Err(e) => IngressEvent::Decode(e),
                        };
                        if tx.blocking_send(event).is_err() {
                            break; // driver gone
                        }
                    }
                    Err(zmq::Error::EAGAIN) => continue, // poll timeout, check `running`
                    Err(e) => {
                        error!("[ZMQ] Receive error: {e}");
                        continue;
                    }
                }
            }
            debug!("[ZMQ] Receive loop exited");
            socket
        })
        .await
        .map_err(|e| EngineError::TransportFatal(e.to_string()))?;

        self.socket = Some(socket);
        Ok(())
    }

    fn stats(&self) -> IngressStats {
        IngressStats {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            endpoint: self.endpoint.clone(),
        }
    }

    fn close(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(socket) = self.socket.take() {
            drop(socket);
        }
        warn!("[ZMQ] Ingress closed");
    }
}

/// Poll timeout on the blocking `recv`, bounding how long `close()` takes
/// to stop the receive loop.
const ZMQ_POLL_TIMEOUT: Duration = Duration::from_millis(100);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_missing_required_fields() {
        let err = ZmqIngress::decode(br#"{"exchange":"A","symbol":"X"}"#).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let msg = ZmqIngress::decode(
            br#"{"exchange":"A","symbol":"X","price":100.0,"timestamp":1000,"extra":"ignored"}"#,
        )
        .unwrap();
        assert_eq!(msg.exchange, "A");
        assert_eq!(msg.symbol, "X");
        assert_eq!(msg.price, 100.0);
        assert_eq!(msg.timestamp, 1000);
    }

    #[test]
    fn decode_rejects_malformed_json() {
        assert!(ZmqIngress::decode(b"not json").is_err());
    }
}
