//! The public facade, wiring the Connection Core actor, the Record
//! Engine, and the event bus behind a small set of methods. Shaped after
//! a public handle sitting in front of a long-lived actor task, the way
//! `Uplink` fronts its forwarder task.

use crate::connection::{AuthCallback, Command, Connection};
use crate::error::ClientError;
use crate::events::ClientEvent;
use crate::options::ClientOptions;
use crate::sender::CommandSender;
use crate::state::ConnectionState;
use ds_event_bus::{EventBus, SubscriptionId};
use ds_records::{Record, RecordEngine, RecordSender};
use ds_timer::{TimerService, TokioTimerService};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A handle to one live record, returned by [`Client::record`].
pub type RecordHandle = Arc<Mutex<Record>>;

/// One client session against a single server endpoint.
///
/// Constructing a [`Client`] spawns the Connection Core actor and begins
/// the handshake immediately; there is no separate `connect()` step —
/// `AWAITING_CONNECTION` is entered as soon as the socket is requested.
#[derive(Clone)]
pub struct Client {
    events: Arc<EventBus<ClientEvent>>,
    records: Arc<RecordEngine>,
    command_tx: mpsc::UnboundedSender<Command>,
    state: Arc<Mutex<ConnectionState>>,
}

impl Client {
    /// Connect to a real WebSocket server at `url`.
    pub fn new(url: impl Into<String>, options: ClientOptions) -> Self {
        Client::with_opener(url, options, ds_transport::websocket_opener())
    }

    /// Connect using a caller-supplied [`ds_transport::SocketOpener`]
    /// instead of a real WebSocket — the seam integration tests use to
    /// drive the Connection Core over an in-memory transport.
    pub fn with_opener(
        url: impl Into<String>,
        options: ClientOptions,
        opener: ds_transport::SocketOpener,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let events = Arc::new(EventBus::new());
        let timers: Arc<dyn TimerService> = Arc::new(TokioTimerService::new());
        let sender: Arc<dyn RecordSender> = Arc::new(CommandSender {
            tx: command_tx.clone(),
        });
        let records = Arc::new(RecordEngine::with_timeouts(
            sender,
            timers.clone(),
            options.record_timeouts(),
        ));
        let state = Arc::new(Mutex::new(ConnectionState::Closed));

        let connection = Connection::new(
            url.into(),
            options,
            opener,
            events.clone(),
            records.clone(),
            timers,
            command_rx,
            command_tx.clone(),
            state.clone(),
        );
        tokio::spawn(connection.run());

        Client {
            events,
            records,
            command_tx,
            state,
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    /// Authenticate the session. `callback` is invoked exactly once, with
    /// `(true, clientData)` on success or `(false, reason)` on failure.
    ///
    /// Fails synchronously rather than queuing, when `authParams` isn't a
    /// JSON object or the connection isn't currently
    /// `AWAITING_AUTHENTICATION`.
    pub fn login(
        &self,
        auth_params: Value,
        callback: impl FnOnce(bool, Option<Value>) + Send + 'static,
    ) -> Result<(), ClientError> {
        if !auth_params.is_object() {
            return Err(ClientError::InvalidAuthParams);
        }
        if self.state() != ConnectionState::AwaitingAuthentication {
            return Err(ClientError::NotAwaitingAuthentication);
        }
        let boxed: AuthCallback = Box::new(callback);
        let _ = self.command_tx.send(Command::Authenticate(auth_params, boxed));
        Ok(())
    }

    /// Begin a graceful close. Sends `CONNECTION.CLOSING` while `OPEN`
    /// and waits for the server's acknowledging close; from any other
    /// state it tears down locally.
    pub fn close(&self) -> Result<(), ClientError> {
        if self.state() == ConnectionState::Closed {
            return Err(ClientError::IsClosed);
        }
        let _ = self.command_tx.send(Command::Close);
        Ok(())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state()
    }

    /// Subscribe to a named lifecycle event — either
    /// [`crate::events::event_name::STATE_CHANGED`]/`"error"`, or any
    /// [`ConnectionState::as_str`] value.
    pub fn on(
        &self,
        name: impl Into<String>,
        handler: impl Fn(&ClientEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.events.on(name, handler)
    }

    pub fn off(&self, id: SubscriptionId) {
        self.events.off(id);
    }

    /// Get-or-create the named record, issuing `RECORD.CREATEORREAD` on
    /// first access.
    pub fn record(&self, name: &str) -> RecordHandle {
        self.records.get_record(name)
    }

    pub fn has_record(&self, name: &str) -> bool {
        self.records.has_record(name)
    }

    /// Unsubscribe locally and notify the server; the record is torn down
    /// once the server acknowledges.
    pub fn discard_record(&self, name: &str) {
        self.records.discard(name);
    }

    /// Request server-side deletion; local teardown and `onDeleted`
    /// notification happen once the server acknowledges.
    pub fn delete_record(&self, name: &str) {
        self.records.delete(name);
    }
}
