//! Typed wrappers over the request pipeline, one per server endpoint.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::models::{
    AdvanceOutcome, ConsentActivity, ConsentRecord, DataSubject, DataSubjectQuery, Document,
    DocumentDraft, GenerateDocumentRequest, NewDataSubject, NewSubjectRequest, Page, ResourceId,
    SubjectRequest, SubjectRequestForm, SubmittedRequest, UserSummary, WorkflowInstance,
    WorkflowStatus, WorkflowTemplate, WorkflowType,
};

use super::{ApiClient, ApiError};

impl ApiClient {
    // ===== Identity =====

    /// The user the stored token belongs to
    pub async fn current_user(&self) -> Result<UserSummary, ApiError> {
        self.get("users/me/").await
    }

    /// Dashboard counters; the shape is owned by the server
    pub async fn dashboard_summary(&self) -> Result<Value, ApiError> {
        self.get("dashboard/summary/").await
    }

    // ===== Data Subjects =====

    pub async fn list_data_subjects(
        &self,
        query: &DataSubjectQuery,
    ) -> Result<Page<DataSubject>, ApiError> {
        self.get_with_query("data-subjects/", query).await
    }

    /// First data subject registered under `email`, if any
    pub async fn find_data_subject_by_email(
        &self,
        email: &str,
    ) -> Result<Option<DataSubject>, ApiError> {
        let query = DataSubjectQuery {
            email: Some(email.to_string()),
            ..Default::default()
        };
        Ok(self.list_data_subjects(&query).await?.results.into_iter().next())
    }

    pub async fn get_data_subject(&self, id: &ResourceId) -> Result<DataSubject, ApiError> {
        self.get(&format!("data-subjects/{}/", id)).await
    }

    pub async fn create_data_subject(
        &self,
        subject: &NewDataSubject,
    ) -> Result<DataSubject, ApiError> {
        self.post("data-subjects/", subject).await
    }

    pub async fn update_data_subject(
        &self,
        subject: &DataSubject,
    ) -> Result<DataSubject, ApiError> {
        self.put(&format!("data-subjects/{}/", subject.id), subject).await
    }

    pub async fn delete_data_subject(&self, id: &ResourceId) -> Result<(), ApiError> {
        self.delete(&format!("data-subjects/{}/", id)).await
    }

    // ===== Consent =====

    pub async fn consent_activities(
        &self,
        subject_id: &ResourceId,
    ) -> Result<Vec<ConsentActivity>, ApiError> {
        let activities: Option<Vec<ConsentActivity>> = self
            .get(&format!("data-subjects/{}/consent_activities/", subject_id))
            .await?;
        Ok(activities.unwrap_or_default())
    }

    pub async fn record_consent(
        &self,
        subject_id: &ResourceId,
        record: &ConsentRecord,
    ) -> Result<ConsentActivity, ApiError> {
        self.post(&format!("data-subjects/{}/record_consent/", subject_id), record)
            .await
    }

    // ===== Subject Requests =====

    pub async fn list_subject_requests(
        &self,
        page: Option<u32>,
    ) -> Result<Page<SubjectRequest>, ApiError> {
        match page {
            Some(page) => {
                self.get_with_query("data-subject-requests/", &json!({ "page": page }))
                    .await
            }
            None => self.get("data-subject-requests/").await,
        }
    }

    pub async fn create_subject_request(
        &self,
        request: &NewSubjectRequest,
    ) -> Result<SubjectRequest, ApiError> {
        self.post("data-subject-requests/", request).await
    }

    /// File a data subject request and start its workflow.
    ///
    /// Looks the subject up by email and registers it if missing, files the
    /// request, then starts a workflow from the first template matching the
    /// request's workflow type. A failed lookup counts as "not found".
    pub async fn submit_subject_request(
        &self,
        form: &SubjectRequestForm,
    ) -> Result<SubmittedRequest, ApiError> {
        let existing = match self.find_data_subject_by_email(&form.email).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Data subject lookup failed, registering a new one");
                None
            }
        };
        let (data_subject_id, created_subject) = match existing {
            Some(subject) => (subject.id, false),
            None => (self.create_data_subject(&form.new_subject()).await?.id, true),
        };

        let request = self.create_subject_request(&form.new_request()).await?;

        let workflow_type = form.request_type.workflow_type();
        let templates = self.list_workflow_templates(Some(workflow_type)).await?;
        let workflow = match templates.results.first() {
            Some(template) => Some(
                self.create_workflow(&template.id, &data_subject_id, &request.id)
                    .await?,
            ),
            None => {
                debug!(workflow_type = workflow_type.as_str(), "No workflow template, skipping");
                None
            }
        };

        info!(
            request = %request.id,
            subject = %data_subject_id,
            created_subject,
            "Subject request submitted"
        );
        Ok(SubmittedRequest {
            data_subject_id,
            created_subject,
            request,
            workflow,
        })
    }

    // ===== Workflows =====

    pub async fn list_workflow_templates(
        &self,
        workflow_type: Option<WorkflowType>,
    ) -> Result<Page<WorkflowTemplate>, ApiError> {
        match workflow_type {
            Some(t) => {
                self.get_with_query("workflow-templates/", &json!({ "workflow_type": t.as_str() }))
                    .await
            }
            None => self.get("workflow-templates/").await,
        }
    }

    /// Start a workflow from a template for a subject and its request
    pub async fn create_workflow(
        &self,
        template_id: &ResourceId,
        subject_id: &ResourceId,
        request_id: &ResourceId,
    ) -> Result<Value, ApiError> {
        let body = json!({
            "data_subject_id": subject_id,
            "request_id": request_id,
        });
        self.post(&format!("workflow-templates/{}/create_workflow/", template_id), &body)
            .await
    }

    pub async fn list_workflows(
        &self,
        status: Option<WorkflowStatus>,
    ) -> Result<Page<WorkflowInstance>, ApiError> {
        match status {
            Some(s) => {
                self.get_with_query("workflow-instances/", &json!({ "status": s.as_str() }))
                    .await
            }
            None => self.get("workflow-instances/").await,
        }
    }

    pub async fn get_workflow(&self, id: &ResourceId) -> Result<WorkflowInstance, ApiError> {
        self.get(&format!("workflow-instances/{}/", id)).await
    }

    pub async fn advance_workflow(&self, id: &ResourceId) -> Result<AdvanceOutcome, ApiError> {
        self.post_empty(&format!("workflow-instances/{}/advance/", id))
            .await
    }

    pub async fn complete_workflow_step(&self, step_id: &ResourceId) -> Result<Value, ApiError> {
        self.post_empty(&format!("workflow-steps/{}/complete/", step_id))
            .await
    }

    // ===== Documents =====

    pub async fn generate_document(
        &self,
        template_id: &ResourceId,
        request: &GenerateDocumentRequest,
    ) -> Result<Document, ApiError> {
        self.post(&format!("generate-document/{}/", template_id), request)
            .await
    }

    pub async fn get_document(&self, id: &ResourceId) -> Result<Document, ApiError> {
        self.get(&format!("documents/{}/", id)).await
    }

    pub async fn create_document(&self, draft: &DocumentDraft) -> Result<Document, ApiError> {
        self.post("documents/", draft).await
    }

    pub async fn update_document(
        &self,
        id: &ResourceId,
        draft: &DocumentDraft,
    ) -> Result<Document, ApiError> {
        self.put(&format!("documents/{}/", id), draft).await
    }

    /// Active documents flagged as templates
    pub async fn list_document_templates(&self) -> Result<Vec<Document>, ApiError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Listing {
            Paged(Page<Document>),
            Plain(Vec<Document>),
        }

        let listing: Listing = self
            .get_with_query("documents/", &json!({ "is_template": true, "status": "active" }))
            .await?;
        Ok(match listing {
            Listing::Paged(page) => page.results,
            Listing::Plain(docs) => docs,
        })
    }
}
