use serde::{Deserialize, Serialize};

/// The set of message topics exchanged on the wire.
///
/// Every [`crate::Message`] carries exactly one topic; the topic selects
/// which [`Action`] variants are valid and which subsystem a message is
/// routed to once decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Topic {
    Connection,
    Auth,
    Event,
    Record,
    Rpc,
    Presence,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Connection => "CONNECTION",
            Topic::Auth => "AUTH",
            Topic::Event => "EVENT",
            Topic::Record => "RECORD",
            Topic::Rpc => "RPC",
            Topic::Presence => "PRESENCE",
        }
    }
}
