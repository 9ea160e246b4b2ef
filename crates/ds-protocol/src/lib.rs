//! Wire message types and codec for the realtime sync protocol.
//!
//! This crate owns the decoded message shape (`{topic, action, name?,
//! data?, parsedData?}`) and the typed-scalar encoding used inside
//! `RECORD.PATCH` payloads. It has no socket, timer, or reconnect logic —
//! those live in `ds-transport` and `ds-client`.

mod action;
pub mod codec;
mod message;
pub mod typed;

pub use action::Action;
pub use codec::{decode, encode, encode_all};
pub use message::Message;
pub use topic::Topic;

mod topic;
