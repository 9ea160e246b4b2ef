//! The session state machine, the largest single piece of the core. One
//! [`Connection`] drives one logical session: it owns the socket for the
//! current session segment, demultiplexes incoming messages by topic,
//! and runs the handshake/auth/heartbeat/reconnect state machine as a
//! single cooperative task, shaped after the `tokio::select!`-over-channels
//! actor loop a session-driving task runs elsewhere in this workspace.

use crate::context::ConnectionContext;
use crate::events::{ClientEvent, event_name};
use crate::options::ClientOptions;
use crate::state::ConnectionState;
use ds_event_bus::EventBus;
use ds_protocol::{Action, Message, Topic, codec};
use ds_records::RecordEngine;
use ds_timer::{TimerHandle, TimerService};
use ds_transport::{SocketEvent, SocketHandle, SocketOpener};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub type AuthCallback = Box<dyn FnOnce(bool, Option<Value>) + Send>;

/// Commands accepted by the [`Connection`] actor — the single point
/// through which all state mutation happens, whether it originates from
/// user code, a [`ds_records::Record`]'s outbound send, a timer
/// callback, or the socket's own event stream.
pub(crate) enum Command {
    Authenticate(Value, AuthCallback),
    Close,
    SendMessage(Message),
    HeartbeatTick,
    ReconnectTimerFired,
}

pub(crate) struct Connection {
    options: ClientOptions,
    context: ConnectionContext,
    opener: SocketOpener,
    socket: Option<SocketHandle>,
    events: Arc<EventBus<ClientEvent>>,
    records: Arc<RecordEngine>,
    timers: Arc<dyn TimerService>,
    send_queue: VecDeque<Message>,
    heartbeat_timer: Option<TimerHandle>,
    reconnect_timer: Option<TimerHandle>,
    last_activity: tokio::time::Instant,
    auth_callback: Option<AuthCallback>,
    pending_auth_params: Option<Value>,
    cached_auth_params: Option<Value>,
    is_reauthenticating: bool,
    commands: mpsc::UnboundedReceiver<Command>,
    command_tx: mpsc::UnboundedSender<Command>,
    /// Mirror of `context.state`, readable from [`crate::Client`] without
    /// a round-trip through the command channel, so calls like `login()`
    /// can reject synchronously when not `AWAITING_AUTHENTICATION`.
    shared_state: Arc<Mutex<ConnectionState>>,
}

impl Connection {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        url: String,
        options: ClientOptions,
        opener: SocketOpener,
        events: Arc<EventBus<ClientEvent>>,
        records: Arc<RecordEngine>,
        timers: Arc<dyn TimerService>,
        commands: mpsc::UnboundedReceiver<Command>,
        command_tx: mpsc::UnboundedSender<Command>,
        shared_state: Arc<Mutex<ConnectionState>>,
    ) -> Self {
        Connection {
            options,
            context: ConnectionContext::new(url),
            opener,
            socket: None,
            events,
            records,
            timers,
            send_queue: VecDeque::new(),
            heartbeat_timer: None,
            reconnect_timer: None,
            last_activity: tokio::time::Instant::now(),
            auth_callback: None,
            pending_auth_params: None,
            cached_auth_params: None,
            is_reauthenticating: false,
            commands,
            command_tx,
            shared_state,
        }
    }

    /// Drive the session until every [`crate::Client`]/record handle is
    /// dropped and the command channel closes.
    pub(crate) async fn run(mut self) {
        let original = self.context.original_url.clone();
        self.spawn_open(original).await;
        self.set_state(ConnectionState::AwaitingConnection);
        loop {
            tokio::select! {
                event = next_socket_event(&mut self.socket) => {
                    self.handle_socket_event(event).await;
                }
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => break,
                    }
                }
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Authenticate(params, callback) => self.handle_authenticate(params, callback),
            Command::Close => self.handle_close(),
            Command::SendMessage(message) => self.enqueue_or_send(message),
            Command::HeartbeatTick => self.on_heartbeat_tick(),
            Command::ReconnectTimerFired => self.on_reconnect_timer_fired().await,
        }
    }

    // -----------------------------------------------------------------
    // Socket lifecycle
    // -----------------------------------------------------------------

    async fn spawn_open(&mut self, url: String) {
        let handle = (self.opener)(url).await;
        self.socket = Some(handle);
    }

    async fn handle_socket_event(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Open => self.on_socket_open(),
            SocketEvent::Frame(frame) => self.on_frame(frame).await,
            SocketEvent::Error(reason) => self.on_socket_trouble(Some(reason)),
            SocketEvent::Closed => self.on_socket_trouble(None),
        }
    }

    fn on_socket_open(&mut self) {
        if self.context.state == ConnectionState::Redirecting {
            self.set_state(ConnectionState::AwaitingConnection);
        }
    }

    fn on_socket_trouble(&mut self, reason: Option<String>) {
        if let Some(reason) = reason {
            self.emit(event_name::ERROR, ClientEvent::ConnectionError(reason));
        }
        match self.context.state {
            ConnectionState::Closing => self.finalize_close(),
            state if state.is_open_ish() => self.enter_reconnecting(),
            _ => {}
        }
    }

    async fn on_frame(&mut self, frame: String) {
        let message = codec::decode(&frame);
        self.last_activity = tokio::time::Instant::now();
        match message.topic {
            Topic::Connection => self.handle_connection_message(message).await,
            Topic::Auth => self.handle_auth_message(message),
            Topic::Record => self.records.handle_message(&message),
            _ => tracing::debug!(topic = ?message.topic, "no handler registered for topic"),
        }
    }

    // -----------------------------------------------------------------
    // CONNECTION-topic messages
    // -----------------------------------------------------------------

    async fn handle_connection_message(&mut self, message: Message) {
        match message.action {
            Action::Challenge => {
                if self.context.state == ConnectionState::AwaitingConnection {
                    self.set_state(ConnectionState::Challenging);
                    let url = self.context.current_url.clone();
                    self.send_now(Message::connection(Action::ChallengeResponse).with_parsed_data(Value::String(url)));
                }
            }
            Action::Reject => {
                if self.context.state == ConnectionState::Challenging {
                    self.cancel_all_timers();
                    self.socket = None;
                    self.set_state(ConnectionState::ChallengeDenied);
                }
            }
            Action::Redirect => {
                if self.context.state == ConnectionState::Challenging {
                    let url = message.data.first().cloned().unwrap_or_default();
                    self.context.current_url = url.clone();
                    self.socket = None;
                    self.set_state(ConnectionState::Redirecting);
                    self.spawn_open(url).await;
                }
            }
            Action::Accept => {
                if self.context.state == ConnectionState::Challenging {
                    self.on_accept();
                }
            }
            Action::Ping => {
                self.send_now(Message::connection(Action::Pong));
            }
            Action::Closing => {
                if self.context.state == ConnectionState::Closing {
                    self.begin_socket_close();
                }
            }
            Action::Error => {
                let reason = message.data.first().cloned().unwrap_or_default();
                self.emit(event_name::ERROR, ClientEvent::ConnectionError(reason));
            }
            Action::ParseError => {
                tracing::warn!(reason = ?message.data.first(), "dropped malformed frame");
            }
            _ => {}
        }
    }

    fn on_accept(&mut self) {
        self.set_state(ConnectionState::AwaitingAuthentication);
        if let Some(params) = self.cached_auth_params.clone() {
            self.is_reauthenticating = true;
            self.send_auth_request(params);
        }
    }

    // -----------------------------------------------------------------
    // AUTH-topic messages
    // -----------------------------------------------------------------

    fn handle_auth_message(&mut self, message: Message) {
        match message.action {
            Action::AuthSuccessful => self.on_auth_successful(message.parsed_data),
            Action::AuthUnsuccessful => self.on_auth_unsuccessful(message.parsed_data),
            Action::TooManyAuthAttempts => {
                self.cancel_all_timers();
                self.socket = None;
                self.set_state(ConnectionState::TooManyAuthAttempts);
                self.emit(event_name::ERROR, ClientEvent::TooManyAuthAttempts);
            }
            _ => {}
        }
    }

    fn handle_authenticate(&mut self, params: Value, callback: AuthCallback) {
        if self.context.state != ConnectionState::AwaitingAuthentication {
            tracing::warn!(
                state = self.context.state.as_str(),
                "authenticate() called outside AWAITING_AUTHENTICATION"
            );
            return;
        }
        self.is_reauthenticating = false;
        self.auth_callback = Some(callback);
        self.send_auth_request(params);
    }

    fn send_auth_request(&mut self, params: Value) {
        self.pending_auth_params = Some(params.clone());
        self.set_state(ConnectionState::Authenticating);
        self.send_now(Message::auth(Action::Request).with_parsed_data(params));
    }

    fn on_auth_successful(&mut self, client_data: Option<Value>) {
        self.cached_auth_params = self.pending_auth_params.take();
        self.is_reauthenticating = false;
        self.set_state(ConnectionState::Open);
        self.context.reconnect_attempts = 0;
        self.start_heartbeat();
        self.flush_send_queue();
        if let Some(callback) = self.auth_callback.take() {
            invoke_auth_callback(callback, true, client_data);
        }
    }

    fn on_auth_unsuccessful(&mut self, reason: Option<Value>) {
        self.set_state(ConnectionState::AwaitingAuthentication);
        if self.is_reauthenticating {
            self.is_reauthenticating = false;
            self.emit(event_name::ERROR, ClientEvent::ReauthenticationFailure);
        } else if let Some(callback) = self.auth_callback.take() {
            invoke_auth_callback(callback, false, reason);
        }
    }

    // -----------------------------------------------------------------
    // Reconnection
    // -----------------------------------------------------------------

    fn enter_reconnecting(&mut self) {
        self.cancel_all_timers();
        self.socket = None;
        if self.context.reconnect_attempts >= self.options.max_reconnect_attempts {
            self.emit(
                event_name::ERROR,
                ClientEvent::MaxReconnectionAttemptsReached(self.context.reconnect_attempts),
            );
            self.set_state(ConnectionState::Closed);
            return;
        }
        self.context.reconnect_attempts += 1;
        let delay = std::cmp::min(
            self.options.max_reconnect_interval,
            self.options.reconnect_interval_increment * self.context.reconnect_attempts,
        );
        let tx = self.command_tx.clone();
        let handle = self.timers.schedule(
            "reconnect",
            delay,
            Box::new(move || {
                let _ = tx.send(Command::ReconnectTimerFired);
            }),
        );
        self.reconnect_timer = Some(handle);
        self.set_state(ConnectionState::Reconnecting);
    }

    async fn on_reconnect_timer_fired(&mut self) {
        self.context.current_url = self.context.original_url.clone();
        let url = self.context.current_url.clone();
        self.spawn_open(url).await;
        self.set_state(ConnectionState::AwaitingConnection);
    }

    // -----------------------------------------------------------------
    // Close
    // -----------------------------------------------------------------

    fn handle_close(&mut self) {
        match self.context.state {
            ConnectionState::Closed | ConnectionState::Closing => {}
            ConnectionState::Open => {
                self.set_state(ConnectionState::Closing);
                self.send_now(Message::connection(Action::Closing));
            }
            _ => {
                self.cancel_all_timers();
                self.set_state(ConnectionState::Closing);
                self.begin_socket_close();
            }
        }
    }

    /// Ask the transport to close gracefully; `finalize_close` runs once
    /// the resulting `SocketEvent::Closed` arrives. Finalizes immediately
    /// if there's no socket to close (e.g. `close()` before any
    /// connection attempt completed).
    fn begin_socket_close(&mut self) {
        match &self.socket {
            Some(socket) => socket.close(),
            None => self.finalize_close(),
        }
    }

    fn finalize_close(&mut self) {
        self.cancel_all_timers();
        self.socket = None;
        self.set_state(ConnectionState::Closed);
    }

    // -----------------------------------------------------------------
    // Heartbeat
    // -----------------------------------------------------------------

    fn start_heartbeat(&mut self) {
        self.cancel_heartbeat();
        let tx = self.command_tx.clone();
        let handle = self.timers.set_interval(
            "heartbeat",
            self.options.heartbeat_interval,
            Box::new(move || {
                let _ = tx.send(Command::HeartbeatTick);
            }),
        );
        self.heartbeat_timer = Some(handle);
    }

    fn cancel_heartbeat(&mut self) {
        if let Some(handle) = self.heartbeat_timer.take() {
            self.timers.cancel(handle);
        }
    }

    fn cancel_all_timers(&mut self) {
        self.cancel_heartbeat();
        if let Some(handle) = self.reconnect_timer.take() {
            self.timers.cancel(handle);
        }
    }

    fn on_heartbeat_tick(&mut self) {
        if self.context.state != ConnectionState::Open {
            return;
        }
        let elapsed = tokio::time::Instant::now().saturating_duration_since(self.last_activity);
        if elapsed > self.options.heartbeat_interval * 2 {
            self.emit(event_name::ERROR, ClientEvent::HeartbeatTimeout);
            self.enter_reconnecting();
        }
    }

    // -----------------------------------------------------------------
    // Send queue
    // -----------------------------------------------------------------

    fn enqueue_or_send(&mut self, message: Message) {
        if self.context.state == ConnectionState::Open {
            self.send_now(message);
            return;
        }
        if self.send_queue.len() >= self.options.send_queue_capacity {
            if let Some(dropped) = self.send_queue.pop_front() {
                self.emit(event_name::ERROR, ClientEvent::QueueOverflow { dropped });
            }
        }
        self.send_queue.push_back(message);
    }

    fn flush_send_queue(&mut self) {
        while let Some(message) = self.send_queue.pop_front() {
            self.send_now(message);
        }
    }

    fn send_now(&mut self, message: Message) {
        if let Some(socket) = &self.socket {
            socket.send_frame(codec::encode(&message));
        }
    }

    // -----------------------------------------------------------------
    // Event bus
    // -----------------------------------------------------------------

    fn emit(&self, name: &str, payload: ClientEvent) {
        self.events.emit(name, &payload);
    }

    fn set_state(&mut self, new: ConnectionState) {
        if self.context.state == new {
            return;
        }
        self.context.state = new;
        *self.shared_state.lock().unwrap() = new;
        self.emit(event_name::STATE_CHANGED, ClientEvent::StateChanged(new));
        self.emit(new.as_str(), ClientEvent::StateChanged(new));
    }
}

async fn next_socket_event(socket: &mut Option<SocketHandle>) -> SocketEvent {
    match socket {
        Some(handle) => handle.next_event().await.unwrap_or(SocketEvent::Closed),
        None => std::future::pending().await,
    }
}

fn invoke_auth_callback(callback: AuthCallback, success: bool, payload: Option<Value>) {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        callback(success, payload);
    }));
    if result.is_err() {
        tracing::error!("auth callback panicked; swallowing to keep the session loop alive");
    }
}
