//! In-process mock transport for exercising the Connection Core without a
//! real socket — the in-memory analogue of `MockWsServer`/`MockWsClient`
//! from the race-timing suite this workspace grew out of, adapted to
//! [`ds_transport::SocketHandle`]'s channel-pair seam instead of a real
//! `TcpListener`. [`MockNetwork`] scripts the sequence of opens a
//! multi-segment session (redirect, reconnect) makes over its lifetime.

use ds_protocol::{Message, codec};
use ds_transport::{Outbound, SocketEvent, SocketHandle, SocketOpener};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};

/// The "server side" of an in-process [`SocketHandle`] pair.
///
/// Scripted behavior lives in the test: call [`MockServer::send`] to push
/// a frame toward the client, and [`MockServer::recv`]/[`MockServer::recv_message`]
/// to observe what the client sent.
pub struct MockServer {
    to_client: mpsc::UnboundedSender<SocketEvent>,
    from_client: mpsc::UnboundedReceiver<Outbound>,
}

impl MockServer {
    /// Build a connected pair: a [`SocketHandle`] as the Connection Core
    /// would use it, and a [`MockServer`] the test drives directly.
    pub fn pair() -> (SocketHandle, MockServer) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Outbound>();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<SocketEvent>();
        let io_task = tokio::spawn(std::future::pending::<()>());
        let handle = ds_transport::from_channels(outbound_tx, events_rx, io_task);
        let server = MockServer {
            to_client: events_tx,
            from_client: outbound_rx,
        };
        (handle, server)
    }

    /// Build a pair and immediately surface [`SocketEvent::Open`], the
    /// way a real connection would right after a successful handshake.
    pub async fn pair_opened() -> (SocketHandle, MockServer) {
        let (mut handle, server) = MockServer::pair();
        server.open();
        let event = handle.next_event().await;
        assert!(matches!(event, Some(SocketEvent::Open)));
        (handle, server)
    }

    pub fn open(&self) {
        let _ = self.to_client.send(SocketEvent::Open);
    }

    pub fn send_raw(&self, frame: impl Into<String>) {
        let _ = self.to_client.send(SocketEvent::Frame(frame.into()));
    }

    pub fn send(&self, message: &Message) {
        self.send_raw(codec::encode(message));
    }

    pub fn error(&self, reason: impl Into<String>) {
        let _ = self.to_client.send(SocketEvent::Error(reason.into()));
    }

    pub fn close(&self) {
        let _ = self.to_client.send(SocketEvent::Closed);
    }

    /// Receive the next raw frame the client sent, or `None` if the
    /// client closed its outbound side.
    pub async fn recv_raw(&mut self) -> Option<String> {
        loop {
            match self.from_client.recv().await? {
                Outbound::Frame(frame) => return Some(frame),
                Outbound::Close => return None,
            }
        }
    }

    pub async fn recv_message(&mut self) -> Option<Message> {
        self.recv_raw().await.map(|frame| codec::decode(&frame))
    }
}

/// A scripted sequence of socket opens, for Connection Core tests that
/// need more than one session segment: redirects, reconnects, or
/// fallback to the original URL all open a fresh socket.
///
/// Each call the client makes through the [`SocketOpener`] returned by
/// [`MockNetwork::opener`] blocks until the test calls
/// [`MockNetwork::queue_server`], then receives that server's paired
/// handle. `opened_urls()` records every URL the client asked for, in
/// order, so redirect/fallback tests can assert on the sequence.
#[derive(Clone, Default)]
pub struct MockNetwork {
    inner: Arc<NetworkInner>,
}

#[derive(Default)]
struct NetworkInner {
    pending: Mutex<VecDeque<SocketHandle>>,
    opened_urls: Mutex<Vec<String>>,
    notify: Notify,
}

impl MockNetwork {
    pub fn new() -> Self {
        MockNetwork::default()
    }

    /// Prepare the next socket handed out by the opener, returning the
    /// [`MockServer`] the test drives on the other end.
    pub fn queue_server(&self) -> MockServer {
        let (handle, server) = MockServer::pair();
        self.inner.pending.lock().unwrap().push_back(handle);
        self.inner.notify.notify_waiters();
        server
    }

    /// Every URL the client has asked to open, in request order.
    pub fn opened_urls(&self) -> Vec<String> {
        self.inner.opened_urls.lock().unwrap().clone()
    }

    /// A [`SocketOpener`] that hands out queued handles in FIFO order,
    /// waiting for [`MockNetwork::queue_server`] if none are ready yet.
    pub fn opener(&self) -> SocketOpener {
        let inner = self.inner.clone();
        Arc::new(move |url: String| {
            let inner = inner.clone();
            Box::pin(async move {
                inner.opened_urls.lock().unwrap().push(url);
                loop {
                    if let Some(handle) = inner.pending.lock().unwrap().pop_front() {
                        return handle;
                    }
                    inner.notify.notified().await;
                }
            })
        })
    }
}
