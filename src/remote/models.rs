// ABOUTME: Data structures exchanged with the assessment backend API
// ABOUTME: Certification profiles, workflow details, step logs, and export results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::form::Topics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamDomain {
    pub name: String,
    pub weight_percentage: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificationProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub exam_domains: Vec<ExamDomain>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    AwaitingCompletion,
}

impl ExecutionStatus {
    /// No automatic polling is scheduled once one of these is observed.
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::InProgress => "in_progress",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::AwaitingCompletion => "awaiting_completion",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExecutionStatus::Pending),
            "in_progress" => Ok(ExecutionStatus::InProgress),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            "awaiting_completion" => Ok(ExecutionStatus::AwaitingCompletion),
            other => Err(format!("unknown execution status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLogEntry {
    pub step: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDetail {
    pub id: String,
    pub user_id: String,
    pub certification_profile_id: String,
    pub execution_status: ExecutionStatus,
    pub current_step: String,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub step_execution_log: Vec<StepLogEntry>,
    pub error_message: Option<String>,
}

impl WorkflowDetail {
    pub fn progress_percent(&self) -> u8 {
        self.progress.clamp(0, 100) as u8
    }

    /// Most recent log entry that carries an error message.
    pub fn last_step_error(&self) -> Option<&StepLogEntry> {
        self.step_execution_log
            .iter()
            .rev()
            .find(|entry| entry.error_message.is_some())
    }
}

/// Query parameters for the workflow list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowQuery {
    pub status_filter: Option<ExecutionStatus>,
    pub limit: u32,
}

impl Default for WorkflowQuery {
    fn default() -> Self {
        Self {
            status_filter: None,
            limit: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainDistributionEntry {
    pub domain: String,
    #[serde(rename = "questionCount")]
    pub question_count: u32,
}

/// Wire body for a new assessment workflow.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentRequest {
    pub certification_profile_id: String,
    pub target_audience: String,
    pub topics: Topics,
    pub question_count: u32,
    pub domain_distribution: Vec<DomainDistributionEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slide_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportResult {
    pub success: bool,
    pub spreadsheet_url: Option<String>,
    pub mock_response: Option<bool>,
    pub message: Option<String>,
    pub instructions: Option<Vec<String>>,
}
