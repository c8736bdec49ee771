// ABOUTME: Timer-driven refresh of workflow views from the backend
// ABOUTME: Shared snapshot state, stale-response rejection, and the scoped interval timer

pub(crate) mod detail;
mod list;

pub use detail::{DetailPollPolicy, DetailPoller};
pub use list::ListPoller;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::Result;

pub const DETAIL_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const LIST_POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    /// The backend answered, but had nothing for this id.
    NotFound,
    /// Last fetch failed; `data` still holds the previous good value.
    Failed(String),
}

/// What a view renders: the latest applied fetch outcome.
#[derive(Debug, Clone)]
pub struct ViewState<T> {
    pub phase: Phase,
    pub data: Option<T>,
    /// Sequence number of the request that produced this state.
    pub seq: u64,
}

impl<T> ViewState<T> {
    fn loading() -> Self {
        Self {
            phase: Phase::Loading,
            data: None,
            seq: 0,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Owns the published view state and hands out request sequence numbers.
pub(crate) struct SnapshotCell<T> {
    tx: watch::Sender<ViewState<T>>,
    next_seq: AtomicU64,
}

impl<T: Clone + Send + Sync> SnapshotCell<T> {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(ViewState::loading());
        Self {
            tx,
            next_seq: AtomicU64::new(0),
        }
    }

    /// Tag a new request; later tags always win over earlier ones.
    pub(crate) fn begin(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply a fetch outcome unless a newer request already landed.
    /// Returns whether the state changed.
    pub(crate) fn apply(&self, seq: u64, outcome: Result<Option<T>>) -> bool {
        self.tx.send_if_modified(|state| {
            if seq <= state.seq {
                debug!(seq, current = state.seq, "discarding superseded response");
                return false;
            }
            state.seq = seq;
            match outcome {
                Ok(Some(data)) => {
                    state.phase = Phase::Ready;
                    state.data = Some(data);
                }
                Ok(None) => {
                    state.phase = Phase::NotFound;
                    state.data = None;
                }
                Err(err) => {
                    warn!(seq, error = %err, "poll fetch failed");
                    state.phase = Phase::Failed(err.to_string());
                }
            }
            true
        })
    }

    pub(crate) fn current(&self) -> ViewState<T> {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ViewState<T>> {
        self.tx.subscribe()
    }
}

/// Interval timer bound to a view's lifetime: stopped on drop.
pub(crate) struct PollTimer {
    handle: Option<JoinHandle<()>>,
}

impl PollTimer {
    /// Call `on_tick` every `period`, first one `period` from now.
    pub(crate) fn every<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let start = Instant::now() + period;
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                on_tick();
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    pub(crate) fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
