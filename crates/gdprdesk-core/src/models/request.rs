use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{NewDataSubject, ResourceId, WorkflowType};

/// GDPR right a data subject request invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Access,
    Rectification,
    Erasure,
    Restriction,
    Portability,
    Objection,
    NotAutomated,
}

impl RequestType {
    /// Workflow that handles this kind of request. Rights without a dedicated
    /// workflow go through the subject access workflow.
    pub fn workflow_type(&self) -> WorkflowType {
        match self {
            RequestType::Erasure => WorkflowType::Erasure,
            RequestType::Rectification => WorkflowType::Rectification,
            _ => WorkflowType::SubjectAccess,
        }
    }
}

impl std::str::FromStr for RequestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("Unknown request type: {}", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectRequest {
    pub id: ResourceId,
    pub request_type: RequestType,
    pub data_subject_name: String,
    pub data_subject_email: String,
    #[serde(default)]
    pub request_details: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date_received: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigned_to: Option<ResourceId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSubjectRequest {
    pub data_subject_name: String,
    pub data_subject_email: String,
    pub request_type: RequestType,
    pub request_details: String,
}

/// What a data subject fills in to exercise a right.
///
/// Submitting it registers the subject if the email is unknown, files the
/// request and starts the matching workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRequestForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub request_type: RequestType,
    pub request_details: String,
}

impl SubjectRequestForm {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Subject to register when none exists for the email yet
    pub fn new_subject(&self) -> NewDataSubject {
        NewDataSubject {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: None,
            data_processing_consent: true,
        }
    }

    pub fn new_request(&self) -> NewSubjectRequest {
        NewSubjectRequest {
            data_subject_name: self.full_name(),
            data_subject_email: self.email.clone(),
            request_type: self.request_type,
            request_details: self.request_details.clone(),
        }
    }
}

/// Result of submitting a `SubjectRequestForm`.
#[derive(Debug, Clone)]
pub struct SubmittedRequest {
    pub data_subject_id: ResourceId,
    /// True when the subject was registered by this submission
    pub created_subject: bool,
    pub request: SubjectRequest,
    /// Server response for the started workflow; None when no template
    /// exists for the request's workflow type
    pub workflow: Option<serde_json::Value>,
}
