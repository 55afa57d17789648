use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ResourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    SubjectAccess,
    Erasure,
    Rectification,
    #[serde(other)]
    Other,
}

impl WorkflowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::SubjectAccess => "subject_access",
            WorkflowType::Erasure => "erasure",
            WorkflowType::Rectification => "rectification",
            WorkflowType::Other => "other",
        }
    }
}

/// Status filter for workflow listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    InProgress,
    Completed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WorkflowStatus::Pending),
            "in_progress" | "in-progress" => Ok(WorkflowStatus::InProgress),
            "completed" => Ok(WorkflowStatus::Completed),
            other => Err(format!("Unknown workflow status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub workflow_type: WorkflowType,
    #[serde(default)]
    pub estimated_completion_days: Option<u32>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub step_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_automated: bool,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data_subject: Option<ResourceId>,
    #[serde(default)]
    pub related_request: Option<ResourceId>,
    #[serde(default)]
    pub current_step: Option<ResourceId>,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub progress_percentage: Option<f64>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl WorkflowInstance {
    pub fn current_step(&self) -> Option<&WorkflowStep> {
        let current = self.current_step.as_ref()?;
        self.steps.iter().find(|s| &s.id == current)
    }
}

/// Result of `POST workflow-instances/{id}/advance/`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    Advanced { current_step: WorkflowStep },
    Completed {
        #[serde(default)]
        message: Option<String>,
    },
}
