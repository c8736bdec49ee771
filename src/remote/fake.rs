// ABOUTME: Scripted in-memory WorkflowApi for tests
// ABOUTME: Records call counts and replays queued responses without any network

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use super::models::{
    AssessmentRequest, CertificationProfile, ExecutionStatus, ExportResult, WorkflowDetail,
    WorkflowQuery,
};
use super::WorkflowApi;
use crate::error::{ConsoleError, Result};

pub fn workflow(id: &str, status: ExecutionStatus, step: &str) -> WorkflowDetail {
    WorkflowDetail {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        certification_profile_id: "cp-1".to_string(),
        execution_status: status,
        current_step: step.to_string(),
        progress: 0,
        step_execution_log: Vec::new(),
        error_message: None,
    }
}

/// Pops queued responses; the last one is repeated forever.
fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[derive(Default)]
pub struct FakeApi {
    details: Mutex<VecDeque<Result<Option<WorkflowDetail>>>>,
    detail_delays: Mutex<VecDeque<Duration>>,
    workflows: Mutex<VecDeque<Result<Vec<WorkflowDetail>>>>,
    profiles: Mutex<Vec<CertificationProfile>>,
    action_error: Mutex<Option<ConsoleError>>,
    action_gate: Mutex<Option<Arc<Notify>>>,
    last_query: Mutex<Option<WorkflowQuery>>,
    last_request: Mutex<Option<AssessmentRequest>>,
    export: Mutex<Option<ExportResult>>,
    pub request_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub retry_calls: AtomicUsize,
    pub manual_calls: AtomicUsize,
    pub auto_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_details(self, responses: Vec<Result<Option<WorkflowDetail>>>) -> Self {
        *self.details.lock().unwrap() = responses.into();
        self
    }

    /// Per-call latency for detail fetches, consumed in order.
    pub fn with_detail_delays(self, delays: Vec<Duration>) -> Self {
        *self.detail_delays.lock().unwrap() = delays.into();
        self
    }

    pub fn with_workflows(self, responses: Vec<Result<Vec<WorkflowDetail>>>) -> Self {
        *self.workflows.lock().unwrap() = responses.into();
        self
    }

    pub fn with_profiles(self, profiles: Vec<CertificationProfile>) -> Self {
        *self.profiles.lock().unwrap() = profiles;
        self
    }

    pub fn with_export(self, result: ExportResult) -> Self {
        *self.export.lock().unwrap() = Some(result);
        self
    }

    pub fn with_action_error(self, error: ConsoleError) -> Self {
        *self.action_error.lock().unwrap() = Some(error);
        self
    }

    /// Actions block until the returned handle is notified.
    pub fn gate_actions(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.action_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn last_query(&self) -> Option<WorkflowQuery> {
        self.last_query.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<AssessmentRequest> {
        self.last_request.lock().unwrap().clone()
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    async fn run_action(&self, counter: &AtomicUsize) -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        let gate = self.action_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.action_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WorkflowApi for FakeApi {
    async fn fetch_certification_profiles(&self) -> Result<Vec<CertificationProfile>> {
        Ok(self.profiles.lock().unwrap().clone())
    }

    async fn fetch_certification_profile(&self, id: &str) -> Result<CertificationProfile> {
        self.profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ConsoleError::NotFound(format!("certification profile {}", id)))
    }

    async fn fetch_workflows(&self, query: &WorkflowQuery) -> Result<Vec<WorkflowDetail>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        next(&self.workflows).unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_workflow_detail(&self, _id: &str) -> Result<Option<WorkflowDetail>> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let response = next(&self.details).unwrap_or(Ok(None));
        let delay = self.detail_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        response
    }

    async fn retry_workflow(&self, id: &str) -> Result<WorkflowDetail> {
        self.run_action(&self.retry_calls).await?;
        Ok(workflow(id, ExecutionStatus::InProgress, "generate_questions"))
    }

    async fn manual_process_workflow(&self, _id: &str) -> Result<()> {
        self.run_action(&self.manual_calls).await
    }

    async fn auto_progress_workflow(&self, _id: &str) -> Result<()> {
        self.run_action(&self.auto_calls).await
    }

    async fn request_assessment_workflow(
        &self,
        request: &AssessmentRequest,
    ) -> Result<WorkflowDetail> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        Ok(workflow(
            "wf-new",
            ExecutionStatus::Pending,
            "select_certification",
        ))
    }

    async fn export_gap_analysis_to_sheets(&self, _workflow_id: &str) -> Result<ExportResult> {
        if let Some(result) = self.export.lock().unwrap().clone() {
            return Ok(result);
        }
        Ok(ExportResult {
            success: true,
            spreadsheet_url: None,
            mock_response: Some(true),
            message: Some("Google Sheets integration is not configured".to_string()),
            instructions: Some(vec!["Set GOOGLE_SHEETS_CREDENTIALS".to_string()]),
        })
    }
}
