use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ResourceId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: ResourceId,
    pub title: String,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data_subject: Option<ResourceId>,
    #[serde(default)]
    pub template_variables: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Editable fields, for saving changes back with `update_document`
    pub fn to_draft(&self) -> DocumentDraft {
        DocumentDraft {
            title: self.title.clone(),
            document_type: self.document_type.clone().unwrap_or_default(),
            content: self.content.clone(),
            is_template: self.is_template,
            template_variables: self
                .template_variables
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
            status: self.status.clone().unwrap_or_else(|| DRAFT_STATUS.to_string()),
            version: self.version.clone().unwrap_or_else(|| INITIAL_VERSION.to_string()),
        }
    }
}

const DRAFT_STATUS: &str = "draft";
const INITIAL_VERSION: &str = "1.0";

/// Body of `POST documents/` and `PUT documents/{id}/`.
///
/// Template content uses `{{placeholder}}` markers such as
/// `{{subject_full_name}}` that the server fills in on generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentDraft {
    pub title: String,
    pub document_type: String,
    pub content: String,
    pub is_template: bool,
    pub template_variables: serde_json::Value,
    pub status: String,
    pub version: String,
}

impl DocumentDraft {
    /// A new template in draft status at version 1.0
    pub fn template(title: &str, document_type: &str, content: &str) -> Self {
        Self {
            title: title.to_string(),
            document_type: document_type.to_string(),
            content: content.to_string(),
            is_template: true,
            template_variables: serde_json::json!({}),
            status: DRAFT_STATUS.to_string(),
            version: INITIAL_VERSION.to_string(),
        }
    }
}

/// Body of `POST generate-document/{template_id}/`.
///
/// Placeholder substitution happens on the server; `fields` maps placeholder
/// names to values.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateDocumentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_subject_id: Option<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl GenerateDocumentRequest {
    pub fn for_subject(subject_id: ResourceId) -> Self {
        Self {
            data_subject_id: Some(subject_id),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_draft_defaults() {
        let draft = DocumentDraft::template("Privacy policy", "privacy_policy", "Hi {{subject_full_name}}");
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            serde_json::json!({
                "title": "Privacy policy",
                "document_type": "privacy_policy",
                "content": "Hi {{subject_full_name}}",
                "is_template": true,
                "template_variables": {},
                "status": "draft",
                "version": "1.0"
            })
        );
    }

    #[test]
    fn test_to_draft_keeps_server_values() {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "id": "d1",
            "title": "DSAR response",
            "document_type": "dsar_response",
            "is_template": true,
            "content": "Dear {{subject_first_name}}",
            "status": "active",
            "version": "2.1"
        }))
        .unwrap();

        let draft = doc.to_draft();
        assert_eq!(draft.status, "active");
        assert_eq!(draft.version, "2.1");
        assert_eq!(draft.template_variables, serde_json::json!({}));
    }
}
