use crate::topic::Topic;
use serde::{Deserialize, Serialize};

/// The full action set across all topics.
///
/// Not every action is valid for every topic — see [`Action::valid_for`].
/// Keeping one flat enum (rather than a per-topic enum) matches the wire
/// shape: a message is `{topic, action, ...}` and the pair is validated
/// together, not nested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    // CONNECTION
    Challenge,
    ChallengeResponse,
    Accept,
    Reject,
    Redirect,
    Ping,
    Pong,
    Closing,
    Error,
    /// Not a wire action — synthesized locally by the codec when a frame
    /// fails to parse. Always carried on `Topic::Connection`.
    ParseError,

    // AUTH
    Request,
    AuthSuccessful,
    AuthUnsuccessful,
    TooManyAuthAttempts,
    InvalidMessageData,

    // RECORD
    CreateOrRead,
    Read,
    Update,
    Patch,
    Ack,
    Delete,
    Unsubscribe,
}

impl Action {
    /// Whether `self` is a legal action for `topic`. Used to enforce the
    /// invariant that every message carries a valid `(topic, action)` pair.
    pub fn valid_for(&self, topic: Topic) -> bool {
        use Action::*;
        matches!(
            (topic, self),
            (
                Topic::Connection,
                Challenge
                    | ChallengeResponse
                    | Accept
                    | Reject
                    | Redirect
                    | Ping
                    | Pong
                    | Closing
                    | Error
                    | ParseError
            ) | (
                Topic::Auth,
                Request | AuthSuccessful | AuthUnsuccessful | TooManyAuthAttempts
                    | InvalidMessageData
            ) | (
                Topic::Record,
                CreateOrRead | Read | Update | Patch | Ack | Delete | Unsubscribe
            )
        )
    }
}
