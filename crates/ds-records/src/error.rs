use serde_json::Value;

/// Error kinds surfaced on a specific [`crate::Record`]'s `on("error", ...)`
/// channel — never as a `Result` failure, since they represent protocol
/// conditions arriving asynchronously rather than a call that failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecordError {
    #[error("ack for {name} timed out waiting for a response")]
    AckTimeout { name: String },
    #[error("{name} timed out waiting for a READ response")]
    ResponseTimeout { name: String },
    /// Optimistic-concurrency conflict: an incoming UPDATE/PATCH carried a
    /// version other than `local + 1`. The record still advances to the
    /// server's version/data — the server is the source of truth — but
    /// this is raised so callers can notice the divergence.
    #[error("{name} received version {received} but expected {expected}; applied anyway")]
    VersionExists {
        name: String,
        expected: u64,
        received: u64,
        applied_data: Value,
    },
    #[error("{name} was already destroyed")]
    AlreadyDestroyed { name: String },
    #[error("delete of {name} timed out waiting for an ack")]
    DeleteTimeout { name: String },
    /// Calling `set` before the record is ready emits this and no-ops.
    #[error("{name} is not ready yet")]
    NotReady { name: String },
}
