//! Data models for the compliance back-office API.
//!
//! This module contains the structures exchanged with the server:
//!
//! - `UserSummary`: the signed-in user, from `users/me/` and login
//! - `LoginRequest`, `LoginResponse`: the `auth/login/` wire contract
//! - `DataSubject`, `ConsentActivity`, `ConsentChange`: subjects and consent history
//! - `SubjectRequest`, `RequestType`, `SubjectRequestForm`: data subject requests
//! - `WorkflowInstance`, `WorkflowTemplate`, `WorkflowStep`: compliance workflows
//! - `Document`, `DocumentDraft`, `GenerateDocumentRequest`: templates and generated documents
//! - `Page`, `ResourceId`: pagination envelope and identifiers

pub mod common;
pub mod document;
pub mod request;
pub mod subject;
pub mod user;
pub mod workflow;

pub use common::{Page, ResourceId};
pub use document::{Document, DocumentDraft, GenerateDocumentRequest};
pub use request::{
    NewSubjectRequest, RequestType, SubjectRequest, SubjectRequestForm, SubmittedRequest,
};
pub use subject::{
    ConsentActivity, ConsentActivityType, ConsentChange, ConsentRecord, ConsentType, DataSubject,
    DataSubjectQuery, NewDataSubject,
};
pub use user::{LoginRequest, LoginResponse, UserSummary};
pub use workflow::{
    AdvanceOutcome, WorkflowInstance, WorkflowStatus, WorkflowStep, WorkflowTemplate,
    WorkflowType,
};
