use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ResourceId;

/// An individual whose personal data the organization processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSubject {
    pub id: ResourceId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub marketing_consent: bool,
    #[serde(default, skip_serializing)]
    pub marketing_consent_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data_processing_consent: bool,
    #[serde(default, skip_serializing)]
    pub data_processing_consent_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cookie_consent: bool,
    #[serde(default, skip_serializing)]
    pub cookie_consent_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub privacy_notice_version: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DataSubject {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn consent(&self, consent_type: ConsentType) -> bool {
        match consent_type {
            ConsentType::Marketing => self.marketing_consent,
            ConsentType::DataProcessing => self.data_processing_consent,
            ConsentType::Cookies => self.cookie_consent,
        }
    }
}

/// Body for creating a data subject.
#[derive(Debug, Clone, Serialize)]
pub struct NewDataSubject {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub data_processing_consent: bool,
}

/// Filters for `GET data-subjects/`. Unset fields are not sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataSubjectQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketing_consent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_processing_consent: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    Marketing,
    DataProcessing,
    Cookies,
}

impl ConsentType {
    pub const ALL: [ConsentType; 3] = [
        ConsentType::Marketing,
        ConsentType::DataProcessing,
        ConsentType::Cookies,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentActivityType {
    ConsentGiven,
    ConsentWithdrawn,
    #[serde(other)]
    Other,
}

/// One entry of a subject's consent history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentActivity {
    pub id: ResourceId,
    #[serde(default)]
    pub data_subject: Option<ResourceId>,
    pub activity_type: ConsentActivityType,
    #[serde(default)]
    pub consent_type: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of `POST data-subjects/{id}/record_consent/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsentRecord {
    pub activity_type: ConsentActivityType,
    pub consent_type: ConsentType,
    pub notes: String,
}

/// A consent flag that flipped between two versions of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsentChange {
    pub consent_type: ConsentType,
    pub granted: bool,
}

impl ConsentChange {
    /// Consent flags that differ between `before` and `after`, in a stable order.
    pub fn between(before: &DataSubject, after: &DataSubject) -> Vec<ConsentChange> {
        ConsentType::ALL
            .into_iter()
            .filter(|t| before.consent(*t) != after.consent(*t))
            .map(|t| ConsentChange {
                consent_type: t,
                granted: after.consent(t),
            })
            .collect()
    }

    pub fn to_record(self, notes: &str) -> ConsentRecord {
        ConsentRecord {
            activity_type: if self.granted {
                ConsentActivityType::ConsentGiven
            } else {
                ConsentActivityType::ConsentWithdrawn
            },
            consent_type: self.consent_type,
            notes: notes.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> DataSubject {
        serde_json::from_value(serde_json::json!({
            "id": "5b1c",
            "first_name": "Jane",
            "last_name": "Doe",
            "email": "jane@example.com",
            "marketing_consent": true,
            "marketing_consent_date": "2024-03-01T10:00:00Z",
            "data_processing_consent": true,
            "cookie_consent": false
        }))
        .unwrap()
    }

    #[test]
    fn test_consent_changes() {
        let before = subject();
        let mut after = before.clone();
        after.marketing_consent = false;
        after.cookie_consent = true;

        let changes = ConsentChange::between(&before, &after);
        assert_eq!(
            changes,
            vec![
                ConsentChange { consent_type: ConsentType::Marketing, granted: false },
                ConsentChange { consent_type: ConsentType::Cookies, granted: true },
            ]
        );

        let record = changes[0].to_record("Updated via console");
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({
                "activity_type": "consent_withdrawn",
                "consent_type": "marketing",
                "notes": "Updated via console"
            })
        );
    }

    #[test]
    fn test_no_changes() {
        let s = subject();
        assert!(ConsentChange::between(&s, &s).is_empty());
    }

    #[test]
    fn test_update_body_omits_read_only_fields() {
        let body = serde_json::to_value(subject()).unwrap();
        assert!(body.get("marketing_consent_date").is_none());
        assert!(body.get("created_at").is_none());
        assert_eq!(body["data_processing_consent"], true);
    }

    #[test]
    fn test_query_skips_unset_filters() {
        let query = DataSubjectQuery {
            data_processing_consent: Some(false),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            serde_json::json!({"data_processing_consent": false})
        );
    }

    #[test]
    fn test_unknown_activity_type() {
        let activity: ConsentActivity = serde_json::from_str(
            r#"{"id": 3, "activity_type": "privacy_notice_accepted", "consent_type": null}"#,
        )
        .unwrap();
        assert_eq!(activity.activity_type, ConsentActivityType::Other);
    }
}
