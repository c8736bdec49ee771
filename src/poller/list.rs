// ABOUTME: Workflow collection poller driving the list view
// ABOUTME: Re-fetches on a long fixed interval; a filter change restarts the timer

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

use super::{PollTimer, SnapshotCell, ViewState, LIST_POLL_INTERVAL};
use crate::remote::models::{ExecutionStatus, WorkflowDetail, WorkflowQuery};
use crate::remote::WorkflowApi;

struct ListShared<A> {
    api: Arc<A>,
    query: Mutex<WorkflowQuery>,
    cell: SnapshotCell<Vec<WorkflowDetail>>,
}

impl<A: WorkflowApi + 'static> ListShared<A> {
    fn query(&self) -> WorkflowQuery {
        self.query.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn spawn_fetch(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        let seq = shared.cell.begin();
        tokio::spawn(async move {
            let query = shared.query();
            debug!(seq, ?query, "polling workflow list");
            let outcome = shared.api.fetch_workflows(&query).await.map(Some);
            shared.cell.apply(seq, outcome);
        });
    }
}

pub struct ListPoller<A> {
    shared: Arc<ListShared<A>>,
    interval: Duration,
    timer: PollTimer,
}

impl<A: WorkflowApi + 'static> ListPoller<A> {
    pub fn start(api: Arc<A>, query: WorkflowQuery) -> Self {
        Self::start_with(api, query, LIST_POLL_INTERVAL)
    }

    pub fn start_with(api: Arc<A>, query: WorkflowQuery, interval: Duration) -> Self {
        let shared = Arc::new(ListShared {
            api,
            query: Mutex::new(query),
            cell: SnapshotCell::new(),
        });
        let timer = Self::arm(&shared, interval);
        Self {
            shared,
            interval,
            timer,
        }
    }

    /// Fetch now, then on every tick regardless of workflow states.
    fn arm(shared: &Arc<ListShared<A>>, interval: Duration) -> PollTimer {
        shared.spawn_fetch();
        let ticking = Arc::clone(shared);
        PollTimer::every(interval, move || ticking.spawn_fetch())
    }

    /// Changing the filter clears the old timer and starts a fresh one.
    pub fn set_status_filter(&mut self, status_filter: Option<ExecutionStatus>) {
        {
            let mut query = self.shared.query.lock().unwrap_or_else(|e| e.into_inner());
            if query.status_filter == status_filter {
                return;
            }
            query.status_filter = status_filter;
        }
        self.timer.stop();
        self.timer = Self::arm(&self.shared, self.interval);
    }

    pub fn query(&self) -> WorkflowQuery {
        self.shared.query()
    }

    pub fn current(&self) -> ViewState<Vec<WorkflowDetail>> {
        self.shared.cell.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<Vec<WorkflowDetail>>> {
        self.shared.cell.subscribe()
    }

    pub async fn refresh(&self) -> ViewState<Vec<WorkflowDetail>> {
        let seq = self.shared.cell.begin();
        let query = self.shared.query();
        let outcome = self.shared.api.fetch_workflows(&query).await.map(Some);
        self.shared.cell.apply(seq, outcome);
        self.shared.cell.current()
    }

    pub fn stop(&mut self) {
        self.timer.stop();
    }
}
