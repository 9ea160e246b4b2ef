//! Lifecycle events delivered on the [`ds_event_bus::EventBus`] the
//! Connection Core publishes to: the user-visible error kinds, plus
//! `CONNECTION_STATE_CHANGED`.

use crate::state::ConnectionState;
use ds_protocol::Message;

/// Names every `client.on(name, ...)` subscriber can be registered under,
/// beyond the `ConnectionState::as_str()` values.
pub mod event_name {
    pub const STATE_CHANGED: &str = "connectionStateChanged";
    pub const ERROR: &str = "error";
}

/// Payload delivered alongside an event-bus notification.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    StateChanged(ConnectionState),
    ConnectionError(String),
    HeartbeatTimeout,
    MaxReconnectionAttemptsReached(u32),
    ReauthenticationFailure,
    TooManyAuthAttempts,
    AuthenticationTimeout,
    QueueOverflow { dropped: Message },
}
