use crate::state::ConnectionState;

/// Session-segment bookkeeping owned by [`crate::Connection`]. The open
/// socket itself lives as `Connection::socket` rather than here, since it
/// is swapped out on every reconnect and that mutation is easiest kept
/// local to the actor's own field.
pub(crate) struct ConnectionContext {
    pub original_url: String,
    pub current_url: String,
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
}

impl ConnectionContext {
    pub fn new(url: String) -> Self {
        ConnectionContext {
            current_url: url.clone(),
            original_url: url,
            state: ConnectionState::Closed,
            reconnect_attempts: 0,
        }
    }
}
