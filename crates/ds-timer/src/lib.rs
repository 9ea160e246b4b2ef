//! Named, cancelable deadlines and periodic ticks.
//!
//! The Connection Core and Record Engine never touch `tokio::time`
//! directly — every pending deadline (read ack, read response, delete
//! ack, heartbeat) goes through a [`TimerService`] handle so it can be
//! canceled by name and swapped for a deterministic test double.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Opaque handle returned by [`TimerService::schedule`]/`set_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// A timer callback. Invoked on whatever task drives the timer; callbacks
/// must not block.
pub type TimerCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// Schedule/cancel named, one-shot or periodic callbacks.
///
/// At-most-one firing per single-shot handle; `cancel` is idempotent —
/// canceling an already-fired or already-canceled handle is a no-op.
pub trait TimerService: Send + Sync {
    fn schedule(&self, name: &str, delay: Duration, cb: TimerCallback) -> TimerHandle;
    fn set_interval(&self, name: &str, period: Duration, cb: TimerCallback) -> TimerHandle;
    fn cancel(&self, handle: TimerHandle);
}

/// Production [`TimerService`] backed by `tokio::time`.
///
/// Respects a paused/virtual tokio clock (`tokio::time::pause`), which is
/// how tests get deterministic heartbeat-timeout and reconnect-backoff
/// behavior without a second timer implementation.
#[derive(Clone)]
pub struct TokioTimerService {
    inner: Arc<Inner>,
}

struct Inner {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<TimerHandle, tokio::task::JoinHandle<()>>>,
}

impl Default for TokioTimerService {
    fn default() -> Self {
        Self::new()
    }
}

impl TokioTimerService {
    pub fn new() -> Self {
        TokioTimerService {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                tasks: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn next_handle(&self) -> TimerHandle {
        TimerHandle(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl TimerService for TokioTimerService {
    fn schedule(&self, name: &str, delay: Duration, cb: TimerCallback) -> TimerHandle {
        let handle = self.next_handle();
        let name = name.to_owned();
        let join = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::trace!(timer = %name, "one-shot timer fired");
            cb();
        });
        self.inner.tasks.lock().unwrap().insert(handle, join);
        handle
    }

    fn set_interval(&self, name: &str, period: Duration, cb: TimerCallback) -> TimerHandle {
        let handle = self.next_handle();
        let name = name.to_owned();
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; skip it so the first real
            // callback happens after one full period.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                tracing::trace!(timer = %name, "interval tick");
                cb();
            }
        });
        self.inner.tasks.lock().unwrap().insert(handle, join);
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(join) = self.inner.tasks.lock().unwrap().remove(&handle) {
            join.abort();
        }
    }
}

/// A [`TokioTimerService`] intended for use under a paused tokio test
/// clock (`#[tokio::test(start_paused = true)]` plus `tokio::time::advance`).
/// Identical behavior, distinct name for call-site clarity in tests.
pub type VirtualTimerService = TokioTimerService;
