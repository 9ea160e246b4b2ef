use crate::error::RecordError;
use crate::sender::RecordSender;
use ds_protocol::{Action, Message, typed};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Reserved key under which root/wildcard subscribers are stored in the
/// path-subscriber map.
pub const ALL_EVENT: &str = "__ALL_EVENT__";

pub type PathCallback = Box<dyn Fn(&Value) + Send + Sync>;
pub type VoidCallback = Box<dyn Fn() + Send + Sync>;
pub type ErrorCallback = Box<dyn Fn(&RecordError) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct PathSubscriber {
    id: SubscriptionId,
    callback: PathCallback,
}

/// Per-record state machine: subscribes to server-side state, applies
/// versioned updates/patches, exposes path-scoped observation, and
/// resolves optimistic concurrency.
pub struct Record {
    name: String,
    version: u64,
    data: Value,
    is_ready: bool,
    destroyed: bool,
    paths: HashMap<String, Vec<PathSubscriber>>,
    ready_subscribers: Vec<(SubscriptionId, VoidCallback)>,
    error_subscribers: Vec<(SubscriptionId, ErrorCallback)>,
    deleted_subscribers: Vec<(SubscriptionId, VoidCallback)>,
    next_sub_id: AtomicU64,
    sender: Arc<dyn RecordSender>,
}

impl Record {
    pub(crate) fn new(name: impl Into<String>, sender: Arc<dyn RecordSender>) -> Self {
        Record {
            name: name.into(),
            version: 0,
            data: Value::Null,
            is_ready: false,
            destroyed: false,
            paths: HashMap::new(),
            ready_subscribers: Vec::new(),
            error_subscribers: Vec::new(),
            deleted_subscribers: Vec::new(),
            next_sub_id: AtomicU64::new(1),
            sender,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_sub_id.fetch_add(1, Ordering::Relaxed))
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// Deep copy of the value at `path` (or the whole record when `path`
    /// is `None`). `serde_json::Value` clones are structural deep
    /// copies, so external mutation of the returned value can never
    /// corrupt internal record state.
    pub fn get(&self, path: Option<&str>) -> Option<Value> {
        match path {
            None => Some(self.data.clone()),
            Some(p) => ds_json_path::get_value(&self.data, p).cloned(),
        }
    }

    // -----------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------

    /// Set the value at `path` (or the whole record when `path` is
    /// `None`). A no-op (no network traffic, no subscriber notification)
    /// when the new value deep-equals the current one.
    pub fn set(&mut self, path: Option<&str>, value: Value) -> Result<(), RecordError> {
        if self.destroyed {
            return Err(RecordError::AlreadyDestroyed {
                name: self.name.clone(),
            });
        }
        if !self.is_ready {
            return Err(RecordError::NotReady {
                name: self.name.clone(),
            });
        }

        let current = self.get(path);
        if current.as_ref() == Some(&value) {
            return Ok(());
        }

        let snapshot = self.begin_change();
        self.version += 1;
        match path {
            None => {
                self.data = value.clone();
                self.sender.send(
                    Message::record(Action::Update, self.name.clone())
                        .with_data(vec![self.version.to_string()])
                        .with_parsed_data(value),
                );
            }
            Some(p) => {
                ds_json_path::set_value(&mut self.data, p, value.clone());
                self.sender.send(
                    Message::record(Action::Patch, self.name.clone()).with_data(vec![
                        self.version.to_string(),
                        p.to_owned(),
                        typed::encode(&value),
                    ]),
                );
            }
        }
        self.complete_change(snapshot);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Remote update application
    // -----------------------------------------------------------------

    /// Apply a `RECORD.READ` response: sets version/data, marks ready,
    /// emits `ready`.
    pub fn apply_read(&mut self, version: u64, data: Value) {
        let snapshot = self.begin_change();
        self.version = version;
        self.data = data;
        self.is_ready = true;
        self.complete_change(snapshot);
        for (_, cb) in &self.ready_subscribers {
            cb();
        }
    }

    /// Apply a `RECORD.UPDATE`. On a version mismatch the record still
    /// advances to the server's version/data but surfaces
    /// [`RecordError::VersionExists`] on the error channel.
    pub fn apply_update(&mut self, version: u64, data: Value) {
        let mismatch = version != self.version + 1;
        let snapshot = self.begin_change();
        let expected = self.version + 1;
        self.version = version;
        self.data = data.clone();
        self.complete_change(snapshot);
        if mismatch {
            self.emit_error(RecordError::VersionExists {
                name: self.name.clone(),
                expected,
                received: version,
                applied_data: data,
            });
        }
    }

    /// Apply a `RECORD.PATCH`. Same versioning rule as `apply_update`.
    pub fn apply_patch(&mut self, version: u64, path: &str, typed_value: &str) {
        let mismatch = version != self.version + 1;
        let snapshot = self.begin_change();
        let expected = self.version + 1;
        self.version = version;
        let value = typed::decode(typed_value);
        ds_json_path::set_value(&mut self.data, path, value);
        self.complete_change(snapshot);
        if mismatch {
            self.emit_error(RecordError::VersionExists {
                name: self.name.clone(),
                expected,
                received: version,
                applied_data: self.data.clone(),
            });
        }
    }

    // -----------------------------------------------------------------
    // Path-change notification algorithm
    // -----------------------------------------------------------------

    /// Snapshot the current value at every subscribed path (and the root,
    /// if a wildcard subscriber exists) before a mutation is applied.
    fn begin_change(&self) -> HashMap<String, Option<Value>> {
        self.paths
            .keys()
            .map(|path| (path.clone(), self.snapshot_for(path)))
            .collect()
    }

    fn snapshot_for(&self, path: &str) -> Option<Value> {
        if path == ALL_EVENT {
            Some(self.data.clone())
        } else {
            ds_json_path::get_value(&self.data, path).cloned()
        }
    }

    /// Compare each snapshotted path against its post-mutation value and
    /// emit a notification only where it actually changed — guaranteeing
    /// subscribers see only actual changes, at most once per mutation.
    fn complete_change(&self, before: HashMap<String, Option<Value>>) {
        for (path, prior) in before {
            let after = self.snapshot_for(&path);
            if prior != after {
                if let Some(subscribers) = self.paths.get(&path) {
                    let value = after.unwrap_or(Value::Null);
                    for sub in subscribers {
                        (sub.callback)(&value);
                    }
                }
            }
        }
    }

    fn emit_error(&self, error: RecordError) {
        tracing::warn!(record = %self.name, %error, "record error");
        for (_, cb) in &self.error_subscribers {
            cb(&error);
        }
    }

    /// Raise an error on this record's error channel from outside
    /// (e.g. a timer-deadline callback owned by [`crate::RecordEngine`]).
    pub fn raise(&self, error: RecordError) {
        self.emit_error(error);
    }

    // -----------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------

    /// Subscribe to changes at `path` (or the whole record when `path`
    /// is `None`, stored under the reserved [`ALL_EVENT`] key). If
    /// `trigger_now` and the record is ready, the callback fires
    /// immediately with the current value.
    pub fn subscribe(
        &mut self,
        path: Option<&str>,
        callback: PathCallback,
        trigger_now: bool,
    ) -> SubscriptionId {
        let id = self.next_id();
        let key = path.unwrap_or(ALL_EVENT).to_owned();
        if trigger_now && self.is_ready {
            let value = self.snapshot_for(&key).unwrap_or(Value::Null);
            callback(&value);
        }
        self.paths
            .entry(key)
            .or_default()
            .push(PathSubscriber { id, callback });
        id
    }

    /// Remove a subscription previously returned by [`Record::subscribe`].
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        for subscribers in self.paths.values_mut() {
            subscribers.retain(|s| s.id != id);
        }
    }

    pub fn on_ready(&mut self, cb: VoidCallback) -> SubscriptionId {
        let id = self.next_id();
        self.ready_subscribers.push((id, cb));
        id
    }

    pub fn on_error(&mut self, cb: ErrorCallback) -> SubscriptionId {
        let id = self.next_id();
        self.error_subscribers.push((id, cb));
        id
    }

    pub fn on_deleted(&mut self, cb: VoidCallback) -> SubscriptionId {
        let id = self.next_id();
        self.deleted_subscribers.push((id, cb));
        id
    }

    // -----------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------

    /// Remove every local listener; called as part of discard/delete
    /// teardown. Purely local — no network traffic.
    pub fn clear_listeners(&mut self) {
        self.paths.clear();
        self.ready_subscribers.clear();
        self.error_subscribers.clear();
        self.deleted_subscribers.clear();
    }

    pub fn mark_destroyed(&mut self) {
        self.destroyed = true;
    }

    pub(crate) fn notify_deleted(&self) {
        for (_, cb) in &self.deleted_subscribers {
            cb();
        }
    }

    pub fn sender(&self) -> &Arc<dyn RecordSender> {
        &self.sender
    }
}
