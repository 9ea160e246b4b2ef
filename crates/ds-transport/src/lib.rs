//! Open/close/send/receive bytes over a WebSocket, surfacing
//! open/error/close/message events.
//!
//! This crate is deliberately codec-agnostic — it moves raw text frames,
//! not decoded [`ds_protocol::Message`] values. The Connection Core sits
//! between this adapter and `ds-protocol`'s codec: bytes flow through the
//! Socket Adapter, the Message Codec, then the Connection Core.
//!
//! A fresh [`SocketHandle`] is acquired for every reconnect attempt; it
//! is never reused across session segments, and never retains queued
//! frames once dropped, the same way an uplink session elsewhere in this
//! workspace is reconstructed wholesale on reconnect rather than resumed.

use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;

/// A pluggable "dial this URL" strategy, so the Connection Core can be
/// driven by a real WebSocket in production or an in-memory pair in
/// tests without knowing which.
pub type SocketOpener =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = SocketHandle> + Send>> + Send + Sync>;

/// A [`SocketOpener`] backed by [`open_websocket`], for production use.
pub fn websocket_opener() -> SocketOpener {
    Arc::new(|url| Box::pin(async move { open_websocket(&url).await }))
}

/// Events surfaced by a [`SocketHandle`] as the underlying connection
/// progresses through its lifecycle.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    Open,
    Frame(String),
    Error(String),
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid url '{0}': {1}")]
    InvalidUrl(String, String),
    #[error("connect failed: {0}")]
    Connect(String),
}

/// A single open/close/send/receive socket session.
///
/// Construct with [`open_websocket`] for production use, or the
/// in-memory adapter in `ds-test-support` for tests. Dropping the handle
/// aborts the background I/O task and any frames still queued for send
/// are discarded — callers that need delivery guarantees across
/// reconnects handle that at a higher layer (the Connection Core's send
/// queue), not here.
pub struct SocketHandle {
    outbound: mpsc::UnboundedSender<Outbound>,
    events: mpsc::UnboundedReceiver<SocketEvent>,
    io_task: tokio::task::JoinHandle<()>,
}

pub enum Outbound {
    Frame(String),
    Close,
}

impl SocketHandle {
    /// Enqueue a raw frame for send. Non-blocking: it is handed to the
    /// background I/O task's outbound queue and returns immediately.
    pub fn send_frame(&self, frame: String) {
        let _ = self.outbound.send(Outbound::Frame(frame));
    }

    /// Initiate a graceful close. The adapter will surface
    /// [`SocketEvent::Closed`] once the underlying socket actually closes.
    pub fn close(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }

    /// Await the next lifecycle event. Returns `None` once the event
    /// channel is drained and the background task has exited.
    pub async fn next_event(&mut self) -> Option<SocketEvent> {
        self.events.recv().await
    }
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        self.io_task.abort();
    }
}

/// Open a WebSocket connection to `url`.
///
/// Returns immediately with a handle whose event stream will yield
/// [`SocketEvent::Open`] on success, or [`SocketEvent::Error`] followed
/// by [`SocketEvent::Closed`] on failure — the caller never needs to
/// distinguish "failed to connect" from "connected then dropped" beyond
/// that ordering.
pub async fn open_websocket(url: &str) -> SocketHandle {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();
    let (events_tx, events_rx) = mpsc::unbounded_channel::<SocketEvent>();

    let url = url.to_owned();
    let io_task = tokio::spawn(async move {
        let stream = match tokio_tungstenite::connect_async(&url).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                let _ = events_tx.send(SocketEvent::Error(e.to_string()));
                let _ = events_tx.send(SocketEvent::Closed);
                return;
            }
        };
        let _ = events_tx.send(SocketEvent::Open);

        let (mut write, mut read) = stream.split();
        loop {
            tokio::select! {
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(text))) => {
                            if events_tx.send(SocketEvent::Frame(text.to_string())).is_err() {
                                break;
                            }
                        }
                        Some(Ok(WsMessage::Ping(data))) => {
                            let _ = write.send(WsMessage::Pong(data)).await;
                        }
                        Some(Ok(WsMessage::Close(_))) | None => {
                            break;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            let _ = events_tx.send(SocketEvent::Error(e.to_string()));
                            break;
                        }
                    }
                }
                outgoing = outbound_rx.recv() => {
                    match outgoing {
                        Some(Outbound::Frame(frame)) => {
                            if write.send(WsMessage::text(frame)).await.is_err() {
                                break;
                            }
                        }
                        Some(Outbound::Close) | None => {
                            let _ = write.send(WsMessage::Close(None)).await;
                            break;
                        }
                    }
                }
            }
        }
        let _ = events_tx.send(SocketEvent::Closed);
    });

    SocketHandle {
        outbound: outbound_tx,
        events: events_rx,
        io_task,
    }
}

/// Test/in-process seam: build a [`SocketHandle`] whose wire is a pair of
/// in-memory channels rather than a real socket, used by
/// `ds-test-support`'s mock server.
pub fn from_channels(
    outbound: mpsc::UnboundedSender<Outbound>,
    events: mpsc::UnboundedReceiver<SocketEvent>,
    io_task: tokio::task::JoinHandle<()>,
) -> SocketHandle {
    SocketHandle {
        outbound,
        events,
        io_task,
    }
}

// `Outbound` needs to be constructible from outside this crate so
// `ds-test-support` can drive an in-memory `SocketHandle`.
impl Outbound {
    pub fn frame(text: impl Into<String>) -> Self {
        Outbound::Frame(text.into())
    }

    pub fn close() -> Self {
        Outbound::Close
    }
}
