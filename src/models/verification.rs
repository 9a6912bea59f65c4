//! Identity document verification, reviewed manually by admins.

use std::path::{Component, Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    NationalId,
    Passport,
    KebeleId,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::NationalId => "national_id",
            DocumentType::Passport => "passport",
            DocumentType::KebeleId => "kebele_id",
        }
    }
}

/// Review decision. `pending` is only ever set at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approved => "approved",
            ReviewDecision::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct IdVerification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_type: String,
    pub document_key: String,
    pub status: String,
    pub reviewer_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// `document_key` is the key returned by `POST /api/uploads`.
#[derive(Debug, Deserialize)]
pub struct SubmitVerificationRequest {
    pub document_type: DocumentType,
    pub document_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewVerificationRequest {
    pub status: ReviewDecision,
    pub note: Option<String>,
}

/// Uploaded keys are namespaced by owner: `<user_id>/<name>.<ext>`.
///
/// The file part must be one plain path component with a non-empty extension,
/// so `.`, `..` and nested paths never name an upload.
pub fn key_belongs_to(key: &str, user_id: Uuid) -> bool {
    key.strip_prefix(&user_id.to_string())
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(is_upload_file_name)
}

fn is_upload_file_name(file: &str) -> bool {
    let path = Path::new(file);
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == file
    ) && path
        .extension()
        .is_some_and(|ext| !ext.is_empty())
}
