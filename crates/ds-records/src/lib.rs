//! Per-record subscribe/version/patch/path-observation engine.
//!
//! A [`Record`] tracks one named piece of server-owned JSON state: its
//! current version, its data, and the set of path-scoped listeners
//! watching it. A [`RecordEngine`] owns the set of live records for a
//! connection and routes inbound protocol messages to them.

mod engine;
mod error;
mod record;
mod sender;

pub use engine::{RecordEngine, RecordTimeouts};
pub use error::RecordError;
pub use record::{ALL_EVENT, ErrorCallback, PathCallback, Record, SubscriptionId, VoidCallback};
pub use sender::RecordSender;
