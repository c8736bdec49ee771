// ABOUTME: Assessment request form values and their pre-submission validation
// ABOUTME: Topics are normalised here to one canonical list of strings

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::info;

use crate::distribution::{allocate, validate_distribution, validate_weights};
use crate::error::{ConsoleError, Result};
use crate::remote::models::{
    AssessmentRequest, CertificationProfile, DomainDistributionEntry, WorkflowDetail,
};
use crate::remote::WorkflowApi;

/// Ordered topic list. Accepts a comma-separated string or an array on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Topics(Vec<String>);

impl Topics {
    pub fn parse(raw: &str) -> Self {
        Self::from_items(raw.split(','))
    }

    fn from_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Topics(
            items
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Topics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

impl<'de> Deserialize<'de> for Topics {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            List(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Topics::parse(&text),
            Raw::List(items) => Topics::from_items(items),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssessmentForm {
    pub certification_profile_id: String,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub topics: Topics,
    #[serde(alias = "questionCount")]
    pub question_count: u32,
    #[serde(default, alias = "domainDistribution")]
    pub domain_distribution: Vec<DomainDistributionEntry>,
    pub slide_count: Option<u32>,
    pub notes: Option<String>,
}

impl AssessmentForm {
    /// Replace the distribution with a fresh allocation from the profile's weights.
    pub fn apply_profile(&mut self, profile: &CertificationProfile) {
        self.certification_profile_id = profile.id.clone();
        self.domain_distribution = allocate(&profile.exam_domains, self.question_count);
    }

    /// Changing the target recomputes the whole distribution.
    pub fn set_question_count(&mut self, count: u32, profile: &CertificationProfile) {
        self.question_count = count;
        self.domain_distribution = allocate(&profile.exam_domains, count);
    }

    /// Live hint shown while the user hand-edits the distribution.
    pub fn distribution_warning(&self) -> Option<String> {
        match validate_distribution(&self.domain_distribution, self.question_count) {
            Err(ConsoleError::Validation(msg)) => Some(msg),
            _ => None,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.certification_profile_id.trim().is_empty() {
            errors.push(FieldError {
                field: "certification_profile_id",
                message: "Select a certification profile".to_string(),
            });
        }
        if self.question_count == 0 {
            errors.push(FieldError {
                field: "question_count",
                message: "Question count must be at least 1".to_string(),
            });
        }
        if self.slide_count == Some(0) {
            errors.push(FieldError {
                field: "slide_count",
                message: "Slide count must be at least 1 when given".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for entry in &self.domain_distribution {
            let name = entry.domain.trim();
            if name.is_empty() {
                errors.push(FieldError {
                    field: "domain_distribution",
                    message: "Every domain needs a name".to_string(),
                });
            } else if !seen.insert(name.to_string()) {
                errors.push(FieldError {
                    field: "domain_distribution",
                    message: format!("Domain '{}' appears more than once", name),
                });
            }
        }

        if let Some(warning) = self.distribution_warning() {
            errors.push(FieldError {
                field: "domain_distribution",
                message: warning,
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and build the wire body; nothing invalid reaches the backend.
    pub fn into_request(self) -> Result<AssessmentRequest> {
        if let Err(errors) = self.validate() {
            let joined = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ConsoleError::Validation(joined));
        }

        Ok(AssessmentRequest {
            certification_profile_id: self.certification_profile_id,
            target_audience: self.target_audience,
            topics: self.topics,
            question_count: self.question_count,
            domain_distribution: self.domain_distribution,
            slide_count: self.slide_count,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
        })
    }
}

/// Resolve the chosen profile, reject it unless its weights sum to 100, fill an
/// empty distribution from it, then send the request. The backend is only
/// called with a form that passed validation.
pub async fn submit<A: WorkflowApi + ?Sized>(
    api: &A,
    mut form: AssessmentForm,
) -> Result<WorkflowDetail> {
    let profile_id = form.certification_profile_id.trim().to_string();
    if !profile_id.is_empty() {
        let profile = api.fetch_certification_profile(&profile_id).await?;
        validate_weights(&profile.exam_domains).map_err(|e| match e {
            ConsoleError::Validation(msg) => ConsoleError::Validation(format!(
                "Certification profile {} cannot be used: {}",
                profile.id, msg
            )),
            other => other,
        })?;
        if form.domain_distribution.is_empty() {
            form.apply_profile(&profile);
        }
    }

    let request = form.into_request()?;
    info!(
        profile = %request.certification_profile_id,
        questions = request.question_count,
        "submitting assessment request"
    );
    api.request_assessment_workflow(&request).await
}
