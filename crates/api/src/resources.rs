//! `/api/v1/resources` endpoints.

use std::path::Path;

use reqwest::Method;
use reqwest::multipart::{Form, Part};

use portal_auth::SessionSnapshot;
use portal_core::error::require;
use portal_core::{ClassroomId, ResourceId, UserId, ValidationResult};

use crate::{ApiClient, ApiError, ResourceDto, UploadResourceResponse};

/// A file to upload into a classroom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResource {
    pub file_name: String,
    pub content: Vec<u8>,
    pub teacher_id: UserId,
    pub category: Option<String>,
}

impl UploadResource {
    /// Read a file from disk; the upload keeps its file name.
    pub async fn from_path(
        path: impl AsRef<Path>,
        teacher_id: UserId,
        category: Option<String>,
    ) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await.map_err(|source| ApiError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());

        Ok(Self {
            file_name,
            content,
            teacher_id,
            category,
        })
    }

    pub fn validate(&self) -> ValidationResult<()> {
        require("file name", &self.file_name)?;
        Ok(())
    }

    fn mime_type(&self) -> &'static str {
        let is_pdf = Path::new(&self.file_name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            "application/pdf"
        } else {
            "application/octet-stream"
        }
    }

    fn into_form(self) -> Result<Form, ApiError> {
        let mime = self.mime_type();
        let part = Part::bytes(self.content)
            .file_name(self.file_name.clone())
            .mime_str(mime)?;

        let mut form = Form::new()
            .part("file", part)
            .text("TeacherUserId", self.teacher_id.to_string())
            .text("title", self.file_name);
        if let Some(category) = self.category {
            form = form.text("category", category);
        }
        Ok(form)
    }
}

impl ApiClient {
    pub async fn list_resources(
        &self,
        session: &SessionSnapshot,
        classroom_id: ClassroomId,
    ) -> Result<Vec<ResourceDto>, ApiError> {
        let classroom = classroom_id.to_string();
        let builder = self.request(session, Method::GET, &["api", "v1", "resources", classroom.as_str()]);
        self.send_json(builder).await
    }

    pub async fn upload_resource(
        &self,
        session: &SessionSnapshot,
        classroom_id: ClassroomId,
        upload: UploadResource,
    ) -> Result<UploadResourceResponse, ApiError> {
        upload.validate()?;
        tracing::info!(
            classroom_id = %classroom_id,
            file_name = %upload.file_name,
            bytes = upload.content.len(),
            "uploading resource"
        );

        let classroom = classroom_id.to_string();
        let form = upload.into_form()?;
        let builder = self
            .request(
                session,
                Method::POST,
                &["api", "v1", "resources", classroom.as_str(), "upload"],
            )
            .multipart(form);
        self.send_json(builder).await
    }

    /// Fetch the raw bytes of a resource.
    pub async fn download_resource(
        &self,
        session: &SessionSnapshot,
        resource_id: ResourceId,
    ) -> Result<Vec<u8>, ApiError> {
        let resource = resource_id.to_string();
        let builder = self.request(
            session,
            Method::GET,
            &["api", "v1", "resources", resource.as_str(), "download"],
        );
        let resp = self.send(builder).await?;
        Ok(resp.bytes().await?.to_vec())
    }
}
