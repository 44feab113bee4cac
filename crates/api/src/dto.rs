//! Wire types (camelCase JSON).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use portal_auth::{AccessToken, Role};
use portal_core::error::{require, require_email};
use portal_core::{ClassroomId, GradeId, ResourceId, SubjectId, UserId, ValidationResult};

/// Category assumed for resources uploaded without one.
pub const DEFAULT_CATEGORY: &str = "Past Papers";

// -------------------------
// Auth
// -------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl RegisterRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        require_email(&self.email)?;
        require("password", &self.password)?;
        require("full name", &self.full_name)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        require_email(&self.email)?;
        require("password", &self.password)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: AccessToken,
}

// -------------------------
// Classrooms
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomDto {
    pub id: ClassroomId,
    pub name: String,
    pub grade_id: GradeId,
    pub subject_id: SubjectId,
    pub teacher_user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassroomRequest {
    pub name: String,
    pub grade_id: GradeId,
    pub subject_id: SubjectId,
    pub teacher_user_id: UserId,
}

impl CreateClassroomRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        require("classroom name", &self.name)?;
        Ok(())
    }
}

// -------------------------
// Resources
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDto {
    pub id: ResourceId,
    pub classroom_id: ClassroomId,
    pub file_name: String,
    /// As sent by the API; see [`ResourceDto::uploaded_at_utc`].
    pub uploaded_at: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl ResourceDto {
    /// Category, defaulting to [`DEFAULT_CATEGORY`] when missing or blank.
    pub fn category_or_default(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
    }

    /// Upload time. Accepts RFC 3339 and offset-less timestamps (read as UTC).
    pub fn uploaded_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.uploaded_at.trim();
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(at.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResourceResponse {
    pub resource_id: ResourceId,
    pub file_name: String,
}
