// ABOUTME: Single-workflow poller driving the detail view
// ABOUTME: Fetches on start, then re-fetches on a short interval while the workflow is running

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

use super::{PollTimer, SnapshotCell, ViewState, DETAIL_POLL_INTERVAL};
use crate::actions::{ActionFlags, WorkflowActions};
use crate::remote::models::{ExecutionStatus, WorkflowDetail};
use crate::remote::WorkflowApi;

/// Which last-known statuses keep the detail view ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailPollPolicy {
    /// Re-fetch only while the workflow is `in_progress`.
    #[default]
    InProgressOnly,
    /// Re-fetch until a terminal status is observed.
    UntilTerminal,
}

impl DetailPollPolicy {
    fn should_poll(self, status: Option<ExecutionStatus>) -> bool {
        match (self, status) {
            (DetailPollPolicy::InProgressOnly, None) => false,
            // Nothing observed yet (first fetch failed): keep trying.
            (DetailPollPolicy::UntilTerminal, None) => true,
            (DetailPollPolicy::InProgressOnly, Some(s)) => s == ExecutionStatus::InProgress,
            (DetailPollPolicy::UntilTerminal, Some(s)) => !s.is_terminal(),
        }
    }
}

pub(crate) struct DetailShared<A> {
    pub(crate) api: Arc<A>,
    pub(crate) workflow_id: String,
    pub(crate) cell: SnapshotCell<WorkflowDetail>,
    pub(crate) flags: ActionFlags,
}

impl<A: WorkflowApi + 'static> DetailShared<A> {
    pub(crate) fn last_status(&self) -> Option<ExecutionStatus> {
        self.cell
            .current()
            .data
            .map(|detail| detail.execution_status)
    }

    /// Fire a fetch without waiting for it; overlapping fetches are allowed.
    fn spawn_fetch(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        let seq = shared.cell.begin();
        tokio::spawn(async move {
            debug!(workflow_id = %shared.workflow_id, seq, "polling workflow detail");
            let outcome = shared.api.fetch_workflow_detail(&shared.workflow_id).await;
            shared.cell.apply(seq, outcome);
        });
    }

    pub(crate) async fn refresh(&self) -> ViewState<WorkflowDetail> {
        let seq = self.cell.begin();
        let outcome = self.api.fetch_workflow_detail(&self.workflow_id).await;
        self.cell.apply(seq, outcome);
        self.cell.current()
    }
}

pub struct DetailPoller<A> {
    shared: Arc<DetailShared<A>>,
    timer: PollTimer,
}

impl<A: WorkflowApi + 'static> DetailPoller<A> {
    pub fn start(api: Arc<A>, workflow_id: impl Into<String>) -> Self {
        Self::start_with(
            api,
            workflow_id,
            DETAIL_POLL_INTERVAL,
            DetailPollPolicy::default(),
        )
    }

    pub fn start_with(
        api: Arc<A>,
        workflow_id: impl Into<String>,
        interval: Duration,
        policy: DetailPollPolicy,
    ) -> Self {
        let shared = Arc::new(DetailShared {
            api,
            workflow_id: workflow_id.into(),
            cell: SnapshotCell::new(),
            flags: ActionFlags::default(),
        });

        shared.spawn_fetch();

        let ticking = Arc::clone(&shared);
        let timer = PollTimer::every(interval, move || {
            // Gate on the status seen before this tick, not on in-flight requests.
            if policy.should_poll(ticking.last_status()) {
                ticking.spawn_fetch();
            }
        });

        Self { shared, timer }
    }

    pub fn workflow_id(&self) -> &str {
        &self.shared.workflow_id
    }

    pub fn current(&self) -> ViewState<WorkflowDetail> {
        self.shared.cell.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<WorkflowDetail>> {
        self.shared.cell.subscribe()
    }

    /// Manual "try again": fetch now and wait for the result.
    pub async fn refresh(&self) -> ViewState<WorkflowDetail> {
        self.shared.refresh().await
    }

    pub fn actions(&self) -> WorkflowActions<A> {
        WorkflowActions::new(Arc::clone(&self.shared))
    }

    /// Stop scheduling ticks. Fetches already issued still land.
    pub fn stop(&mut self) {
        self.timer.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.timer.is_running()
    }
}
