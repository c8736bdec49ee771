// ABOUTME: Backend collaborator for the console
// ABOUTME: WorkflowApi is the seam every poller and action talks through

pub mod client;
#[cfg(test)]
pub mod fake;
pub mod models;

use async_trait::async_trait;

use crate::error::{ConsoleError, Result};
pub use client::RemoteClient;
pub use models::{
    AssessmentRequest, CertificationProfile, DomainDistributionEntry, ExamDomain,
    ExecutionStatus, ExportResult, StepLogEntry, WorkflowDetail, WorkflowQuery,
};

/// Operations the assessment backend exposes over HTTP.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    async fn fetch_certification_profiles(&self) -> Result<Vec<CertificationProfile>>;

    async fn fetch_certification_profile(&self, id: &str) -> Result<CertificationProfile>;

    async fn fetch_workflows(&self, query: &WorkflowQuery) -> Result<Vec<WorkflowDetail>>;

    /// `Ok(None)` when the backend has no such workflow.
    async fn fetch_workflow_detail(&self, id: &str) -> Result<Option<WorkflowDetail>>;

    async fn retry_workflow(&self, id: &str) -> Result<WorkflowDetail>;

    async fn manual_process_workflow(&self, id: &str) -> Result<()>;

    async fn auto_progress_workflow(&self, id: &str) -> Result<()>;

    async fn request_assessment_workflow(
        &self,
        request: &AssessmentRequest,
    ) -> Result<WorkflowDetail>;

    async fn export_gap_analysis_to_sheets(&self, workflow_id: &str) -> Result<ExportResult>;
}

/// Export the gap analysis, turning `success: false` into an error that carries
/// the backend's message. Mock responses still count as success.
pub async fn export_gap_analysis<A: WorkflowApi + ?Sized>(
    api: &A,
    workflow_id: &str,
) -> Result<ExportResult> {
    let result = api.export_gap_analysis_to_sheets(workflow_id).await?;
    if !result.success {
        return Err(ConsoleError::Export(
            result
                .message
                .unwrap_or_else(|| "no reason given".to_string()),
        ));
    }
    Ok(result)
}
