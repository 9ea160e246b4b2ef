//! Encodes outgoing [`Message`] values and decodes incoming frames.
//!
//! The wire framing itself (how frames are delimited, binary vs. textual)
//! is a transport concern; this codec works over `&str` frames, one frame
//! per message, encoded as JSON. A malformed frame never surfaces as a
//! `Result::Err` — it decodes to a [`Message::parse_error`] so the
//! Connection Core can log it and drop it without special-casing decode
//! failures in the message-dispatch loop.

use crate::message::Message;

/// Encode a single outgoing message into its wire frame.
pub fn encode(message: &Message) -> String {
    serde_json::to_string(message).unwrap_or_else(|e| {
        serde_json::to_string(&Message::parse_error(format!("encode failure: {e}")))
            .expect("parse_error message always serializes")
    })
}

/// Encode a batch of outgoing messages, one frame each, in order.
pub fn encode_all(messages: &[Message]) -> Vec<String> {
    messages.iter().map(encode).collect()
}

/// Decode a single incoming frame.
///
/// Always returns a `Message`: a frame that fails to parse, or whose
/// `(topic, action)` pair is invalid, decodes to [`Message::parse_error`].
pub fn decode(frame: &str) -> Message {
    match serde_json::from_str::<Message>(frame) {
        Ok(msg) if msg.is_valid() => msg,
        Ok(msg) => Message::parse_error(format!(
            "invalid (topic, action) pair: {:?}/{:?}",
            msg.topic, msg.action
        )),
        Err(e) => Message::parse_error(format!("malformed frame: {e}")),
    }
}
