use crate::action::Action;
use crate::topic::Topic;
use serde::{Deserialize, Serialize};

/// A decoded protocol message.
///
/// This is the unit the Connection Core and Record Engine operate on —
/// the wire encoding (binary vs. textual) is entirely the concern of
/// [`crate::codec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub topic: Topic,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_data: Option<serde_json::Value>,
}

impl Message {
    pub fn new(topic: Topic, action: Action) -> Self {
        Message {
            topic,
            action,
            name: None,
            data: Vec::new(),
            parsed_data: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_data(mut self, data: Vec<String>) -> Self {
        self.data = data;
        self
    }

    pub fn with_parsed_data(mut self, value: serde_json::Value) -> Self {
        self.parsed_data = Some(value);
        self
    }

    /// `true` iff `(topic, action)` is a legal pair per [`Action::valid_for`].
    pub fn is_valid(&self) -> bool {
        self.action.valid_for(self.topic)
    }

    pub fn connection(action: Action) -> Self {
        Message::new(Topic::Connection, action)
    }

    pub fn auth(action: Action) -> Self {
        Message::new(Topic::Auth, action)
    }

    pub fn record(action: Action, name: impl Into<String>) -> Self {
        Message::new(Topic::Record, action).with_name(name)
    }

    /// The synthetic message the codec yields when a frame fails to parse.
    pub fn parse_error(reason: impl Into<String>) -> Self {
        Message::connection(Action::ParseError).with_data(vec![reason.into()])
    }
}
