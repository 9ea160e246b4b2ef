//! Client configuration: the connection/record tunables plus TOML
//! loading in the raw-then-defaulted pattern used for service config
//! elsewhere in this workspace.

use ds_records::RecordTimeouts;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Tunables for the Connection Core and Record Engine, plus
/// `send_queue_capacity` governing the bounded-queue-overflow policy.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub heartbeat_interval: Duration,
    pub reconnect_interval_increment: Duration,
    pub max_reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
    pub record_read_ack_timeout: Duration,
    pub record_read_timeout: Duration,
    pub record_delete_timeout: Duration,
    pub send_queue_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            heartbeat_interval: Duration::from_millis(30_000),
            reconnect_interval_increment: Duration::from_millis(4_000),
            max_reconnect_interval: Duration::from_millis(30_000),
            max_reconnect_attempts: 5,
            record_read_ack_timeout: Duration::from_millis(1_000),
            record_read_timeout: Duration::from_millis(15_000),
            record_delete_timeout: Duration::from_millis(15_000),
            send_queue_capacity: 1_000,
        }
    }
}

impl ClientOptions {
    pub fn record_timeouts(&self) -> RecordTimeouts {
        RecordTimeouts {
            read_ack: self.record_read_ack_timeout,
            read_response: self.record_read_timeout,
            delete_ack: self.record_delete_timeout,
        }
    }

    /// Load options from a TOML file, applying [`ClientOptions::default`]
    /// for any field the file omits.
    pub fn from_toml_file(path: &str) -> Result<Self, OptionsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| OptionsError::Io {
            path: path.to_owned(),
            source,
        })?;
        let raw: RawClientOptions =
            toml::from_str(&contents).map_err(|source| OptionsError::Parse {
                path: path.to_owned(),
                source,
            })?;
        Ok(raw.into_options())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClientOptions {
    heartbeat_interval_ms: Option<u64>,
    reconnect_interval_increment_ms: Option<u64>,
    max_reconnect_interval_ms: Option<u64>,
    max_reconnect_attempts: Option<u32>,
    record_read_ack_timeout_ms: Option<u64>,
    record_read_timeout_ms: Option<u64>,
    record_delete_timeout_ms: Option<u64>,
    send_queue_capacity: Option<usize>,
}

impl RawClientOptions {
    fn into_options(self) -> ClientOptions {
        let defaults = ClientOptions::default();
        ClientOptions {
            heartbeat_interval: self
                .heartbeat_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.heartbeat_interval),
            reconnect_interval_increment: self
                .reconnect_interval_increment_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_interval_increment),
            max_reconnect_interval: self
                .max_reconnect_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_reconnect_interval),
            max_reconnect_attempts: self
                .max_reconnect_attempts
                .unwrap_or(defaults.max_reconnect_attempts),
            record_read_ack_timeout: self
                .record_read_ack_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.record_read_ack_timeout),
            record_read_timeout: self
                .record_read_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.record_read_timeout),
            record_delete_timeout: self
                .record_delete_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.record_delete_timeout),
            send_queue_capacity: self
                .send_queue_capacity
                .unwrap_or(defaults.send_queue_capacity),
        }
    }
}
