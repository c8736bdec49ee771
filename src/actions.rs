// ABOUTME: User-triggered workflow actions: retry, manual process, auto progress
// ABOUTME: Each action holds an in-flight flag for its duration and re-fetches the detail view

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ConsoleError, Result};
use crate::poller::detail::DetailShared;
use crate::remote::models::{ExecutionStatus, WorkflowDetail};
use crate::remote::WorkflowApi;
use crate::steps::{COLLECT_RESPONSES, INITIAL_STEP};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowAction {
    Retry,
    ManualProcess,
    AutoProgress,
}

impl WorkflowAction {
    pub const ALL: [WorkflowAction; 3] = [
        WorkflowAction::Retry,
        WorkflowAction::ManualProcess,
        WorkflowAction::AutoProgress,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WorkflowAction::Retry => "retry",
            WorkflowAction::ManualProcess => "manual process",
            WorkflowAction::AutoProgress => "auto progress",
        }
    }

    /// Whether the action's control is offered for this workflow state.
    pub fn is_available(self, detail: &WorkflowDetail) -> bool {
        match self {
            WorkflowAction::Retry => detail.execution_status == ExecutionStatus::Failed,
            WorkflowAction::ManualProcess => {
                detail.execution_status == ExecutionStatus::AwaitingCompletion
                    && detail.current_step == COLLECT_RESPONSES
            }
            WorkflowAction::AutoProgress => {
                detail.execution_status == ExecutionStatus::Pending
                    && detail.current_step == INITIAL_STEP
            }
        }
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn available_actions(detail: &WorkflowDetail) -> Vec<WorkflowAction> {
    WorkflowAction::ALL
        .into_iter()
        .filter(|a| a.is_available(detail))
        .collect()
}

/// One "in flight" flag per action, shared by every handle onto a view.
#[derive(Debug, Default)]
pub(crate) struct ActionFlags {
    retry: AtomicBool,
    manual_process: AtomicBool,
    auto_progress: AtomicBool,
}

impl ActionFlags {
    fn flag(&self, action: WorkflowAction) -> &AtomicBool {
        match action {
            WorkflowAction::Retry => &self.retry,
            WorkflowAction::ManualProcess => &self.manual_process,
            WorkflowAction::AutoProgress => &self.auto_progress,
        }
    }

    fn acquire(&self, action: WorkflowAction) -> Result<InFlight<'_>> {
        let flag = self.flag(action);
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ConsoleError::ActionInFlight(action.name()))?;
        Ok(InFlight { flag })
    }
}

/// Clears its flag on drop, whether the action succeeded, failed, or was cancelled.
struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

pub struct WorkflowActions<A> {
    shared: Arc<DetailShared<A>>,
}

impl<A> Clone for WorkflowActions<A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A: WorkflowApi + 'static> WorkflowActions<A> {
    pub(crate) fn new(shared: Arc<DetailShared<A>>) -> Self {
        Self { shared }
    }

    pub fn is_in_flight(&self, action: WorkflowAction) -> bool {
        self.shared.flags.flag(action).load(Ordering::SeqCst)
    }

    /// Actions the current snapshot allows and that are not already running.
    pub fn enabled(&self) -> Vec<WorkflowAction> {
        match self.shared.cell.current().data {
            Some(detail) => available_actions(&detail)
                .into_iter()
                .filter(|a| !self.is_in_flight(*a))
                .collect(),
            None => Vec::new(),
        }
    }

    pub async fn retry(&self) -> Result<()> {
        self.run(WorkflowAction::Retry).await
    }

    pub async fn manual_process(&self) -> Result<()> {
        self.run(WorkflowAction::ManualProcess).await
    }

    pub async fn auto_progress(&self) -> Result<()> {
        self.run(WorkflowAction::AutoProgress).await
    }

    async fn run(&self, action: WorkflowAction) -> Result<()> {
        let shared = &self.shared;
        let detail = shared.cell.current().data.ok_or_else(|| {
            ConsoleError::Validation(format!(
                "Workflow {} is not loaded yet",
                shared.workflow_id
            ))
        })?;
        if !action.is_available(&detail) {
            return Err(ConsoleError::Validation(format!(
                "Cannot {} workflow {} while it is {} at step {}",
                action, shared.workflow_id, detail.execution_status, detail.current_step
            )));
        }

        let _in_flight = shared.flags.acquire(action)?;
        info!(workflow_id = %shared.workflow_id, %action, "running workflow action");

        let id = shared.workflow_id.as_str();
        let outcome = match action {
            WorkflowAction::Retry => shared.api.retry_workflow(id).await.map(|_| ()),
            WorkflowAction::ManualProcess => shared.api.manual_process_workflow(id).await,
            WorkflowAction::AutoProgress => shared.api.auto_progress_workflow(id).await,
        };
        if let Err(err) = outcome {
            warn!(workflow_id = %id, %action, error = %err, "workflow action failed");
            return Err(err);
        }

        shared.refresh().await;
        Ok(())
    }
}
