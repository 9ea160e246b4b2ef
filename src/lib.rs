//! Client half of a realtime record-sync protocol.
//!
//! The two in-scope subsystems are the Connection Core (handshake, auth,
//! heartbeats, reconnection — see [`Client`]) and the Record Engine
//! (`ds_records::RecordEngine`, reached through [`Client::record`]).
//! Everything built on top of a record (lists, presence, RPC, pub/sub)
//! is out of scope for this crate.

mod client;
mod connection;
mod context;
mod error;
mod events;
mod options;
mod sender;
mod state;

pub use client::{Client, RecordHandle};
pub use error::ClientError;
pub use events::{ClientEvent, event_name};
pub use options::{ClientOptions, OptionsError};
pub use state::ConnectionState;

pub use ds_event_bus::SubscriptionId as EventSubscriptionId;
pub use ds_records::{Record, RecordError, SubscriptionId as RecordSubscriptionId};
