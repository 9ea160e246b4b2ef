use crate::error::RecordError;
use crate::record::Record;
use crate::sender::RecordSender;
use ds_protocol::{Action, Message, Topic};
use ds_timer::{TimerHandle, TimerService};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Per-record deadlines armed by [`RecordEngine`]: read-ack,
/// read-response, and delete-ack.
#[derive(Debug, Clone, Copy)]
pub struct RecordTimeouts {
    pub read_ack: Duration,
    pub read_response: Duration,
    pub delete_ack: Duration,
}

impl Default for RecordTimeouts {
    fn default() -> Self {
        RecordTimeouts {
            read_ack: Duration::from_millis(1000),
            read_response: Duration::from_millis(15000),
            delete_ack: Duration::from_millis(15000),
        }
    }
}

/// Registry of live [`Record`] instances, keyed by name.
///
/// Owns no transport of its own: outbound traffic goes through whatever
/// [`RecordSender`] it was constructed with (the Connection Core, in
/// production), and inbound `RECORD.*` messages are routed in here by
/// the caller via [`RecordEngine::handle_message`].
pub struct RecordEngine {
    sender: Arc<dyn RecordSender>,
    timers: Arc<dyn TimerService>,
    timeouts: RecordTimeouts,
    records: Mutex<HashMap<String, Arc<Mutex<Record>>>>,
    pending_timers: Mutex<HashMap<String, Vec<TimerHandle>>>,
    pending_ack_timers: Mutex<HashMap<String, TimerHandle>>,
}

impl RecordEngine {
    pub fn new(sender: Arc<dyn RecordSender>, timers: Arc<dyn TimerService>) -> Self {
        RecordEngine::with_timeouts(sender, timers, RecordTimeouts::default())
    }

    pub fn with_timeouts(
        sender: Arc<dyn RecordSender>,
        timers: Arc<dyn TimerService>,
        timeouts: RecordTimeouts,
    ) -> Self {
        RecordEngine {
            sender,
            timers,
            timeouts,
            records: Mutex::new(HashMap::new()),
            pending_timers: Mutex::new(HashMap::new()),
            pending_ack_timers: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create the record named `name`. The first call for a given
    /// name sends `RECORD.CREATEORREAD` and arms the read-ack and
    /// read-response deadlines.
    pub fn get_record(&self, name: &str) -> Arc<Mutex<Record>> {
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.get(name) {
            return existing.clone();
        }
        let record = Arc::new(Mutex::new(Record::new(name, self.sender.clone())));
        records.insert(name.to_owned(), record.clone());
        self.sender
            .send(Message::record(Action::CreateOrRead, name));
        self.arm_read_timeouts(name, record.clone());
        record
    }

    fn arm_read_timeouts(&self, name: &str, record: Arc<Mutex<Record>>) {
        let ack_name = name.to_owned();
        let ack_record = record.clone();
        let ack_handle = self.timers.schedule(
            &format!("record-ack:{name}"),
            self.timeouts.read_ack,
            Box::new(move || {
                ack_record.lock().unwrap().raise(RecordError::AckTimeout {
                    name: ack_name.clone(),
                });
            }),
        );
        let response_name = name.to_owned();
        let response_record = record;
        let response_handle = self.timers.schedule(
            &format!("record-response:{name}"),
            self.timeouts.read_response,
            Box::new(move || {
                response_record
                    .lock()
                    .unwrap()
                    .raise(RecordError::ResponseTimeout {
                        name: response_name.clone(),
                    });
            }),
        );
        self.pending_ack_timers
            .lock()
            .unwrap()
            .insert(name.to_owned(), ack_handle);
        self.pending_timers
            .lock()
            .unwrap()
            .entry(name.to_owned())
            .or_default()
            .push(response_handle);
    }

    /// Clear `read_ack` only, leaving `read_response` (and any unrelated
    /// pending timer, e.g. a delete-ack) armed.
    fn clear_ack_timer(&self, name: &str) {
        if let Some(handle) = self.pending_ack_timers.lock().unwrap().remove(name) {
            self.timers.cancel(handle);
        }
    }

    fn clear_pending_timers(&self, name: &str) {
        self.clear_ack_timer(name);
        if let Some(handles) = self.pending_timers.lock().unwrap().remove(name) {
            for handle in handles {
                self.timers.cancel(handle);
            }
        }
    }

    pub fn has_record(&self, name: &str) -> bool {
        self.records.lock().unwrap().contains_key(name)
    }

    /// Route an inbound `RECORD.*` message to the record it names.
    /// Messages for unknown record names are dropped — the server never
    /// sends updates for a record this client hasn't asked about.
    pub fn handle_message(&self, message: &Message) {
        if message.topic != Topic::Record {
            return;
        }
        let Some(name) = message.name.as_deref() else {
            return;
        };
        let record = {
            let records = self.records.lock().unwrap();
            records.get(name).cloned()
        };
        let Some(record) = record else {
            return;
        };

        match message.action {
            Action::Read => {
                self.clear_pending_timers(name);
                let version = message
                    .data
                    .first()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(0);
                let data = message.parsed_data.clone().unwrap_or(serde_json::Value::Null);
                record.lock().unwrap().apply_read(version, data);
            }
            Action::Update => {
                let version = message
                    .data
                    .first()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(0);
                let data = message.parsed_data.clone().unwrap_or(serde_json::Value::Null);
                record.lock().unwrap().apply_update(version, data);
            }
            Action::Patch => {
                let version = message
                    .data
                    .first()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(0);
                let path = message.data.get(1).map(String::as_str).unwrap_or("");
                let typed_value = message.data.get(2).map(String::as_str).unwrap_or("");
                record.lock().unwrap().apply_patch(version, path, typed_value);
            }
            Action::Ack if message.data.first().map(String::as_str) == Some("CREATEORREAD") => {
                self.clear_ack_timer(name);
            }
            Action::Ack if message.data.first().map(String::as_str) == Some("DELETE") => {
                self.finish_delete(name, &record);
            }
            Action::Ack if message.data.first().map(String::as_str) == Some("UNSUBSCRIBE") => {
                self.finish_discard(name, &record);
            }
            _ => {}
        }
    }

    /// Unsubscribe locally and from the server, tearing the record down
    /// once the server acknowledges with a real `RECORD.ACK[UNSUBSCRIBE]`
    /// rather than the moment the request is sent.
    pub fn discard(&self, name: &str) {
        let record = {
            let records = self.records.lock().unwrap();
            records.get(name).cloned()
        };
        if let Some(record) = record {
            record.lock().unwrap().clear_listeners();
            self.sender
                .send(Message::record(Action::Unsubscribe, name));
        }
    }

    fn finish_discard(&self, name: &str, record: &Arc<Mutex<Record>>) {
        self.clear_pending_timers(name);
        record.lock().unwrap().mark_destroyed();
        self.records.lock().unwrap().remove(name);
    }

    /// Request server-side deletion. Local teardown happens only once the
    /// server acknowledges with `RECORD.ACK[DELETE]`, bounded by
    /// `recordDeleteTimeout`.
    pub fn delete(&self, name: &str) {
        let record = {
            let records = self.records.lock().unwrap();
            records.get(name).cloned()
        };
        let Some(record) = record else {
            return;
        };
        self.sender.send(Message::record(Action::Delete, name));
        let timeout_name = name.to_owned();
        let timeout_record = record;
        let handle = self.timers.schedule(
            &format!("record-delete:{name}"),
            self.timeouts.delete_ack,
            Box::new(move || {
                timeout_record
                    .lock()
                    .unwrap()
                    .raise(RecordError::DeleteTimeout {
                        name: timeout_name.clone(),
                    });
            }),
        );
        self.pending_timers
            .lock()
            .unwrap()
            .entry(name.to_owned())
            .or_default()
            .push(handle);
    }

    fn finish_delete(&self, name: &str, record: &Arc<Mutex<Record>>) {
        self.clear_pending_timers(name);
        {
            let record = record.lock().unwrap();
            record.notify_deleted();
        }
        record.lock().unwrap().mark_destroyed();
        self.records.lock().unwrap().remove(name);
    }
}
