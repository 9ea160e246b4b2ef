/// The Connection Core's session state.
///
/// Exactly one instance exists per [`crate::Connection`]; it is mutated
/// only by the Connection Core's own `run` loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Closed,
    AwaitingConnection,
    Challenging,
    ChallengeDenied,
    AwaitingAuthentication,
    Authenticating,
    Open,
    Redirecting,
    Reconnecting,
    Closing,
    Error,
    TooManyAuthAttempts,
    AuthenticationTimeout,
}

impl ConnectionState {
    /// The wire/event-bus name for this state, as used by
    /// `CONNECTION_STATE_CHANGED` and as an `on(name, ...)` event key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Closed => "CLOSED",
            ConnectionState::AwaitingConnection => "AWAITING_CONNECTION",
            ConnectionState::Challenging => "CHALLENGING",
            ConnectionState::ChallengeDenied => "CHALLENGE_DENIED",
            ConnectionState::AwaitingAuthentication => "AWAITING_AUTHENTICATION",
            ConnectionState::Authenticating => "AUTHENTICATING",
            ConnectionState::Open => "OPEN",
            ConnectionState::Redirecting => "REDIRECTING",
            ConnectionState::Reconnecting => "RECONNECTING",
            ConnectionState::Closing => "CLOSING",
            ConnectionState::Error => "ERROR",
            ConnectionState::TooManyAuthAttempts => "TOO_MANY_AUTH_ATTEMPTS",
            ConnectionState::AuthenticationTimeout => "AUTHENTICATION_TIMEOUT",
        }
    }

    /// Whether this state still represents a connection that might
    /// eventually reach `OPEN` again without the user calling `open()`
    /// explicitly — used to decide whether an unsolicited socket close
    /// should drive the reconnect path.
    pub fn is_open_ish(&self) -> bool {
        !matches!(
            self,
            ConnectionState::Closed
                | ConnectionState::ChallengeDenied
                | ConnectionState::Closing
                | ConnectionState::TooManyAuthAttempts
        )
    }
}
