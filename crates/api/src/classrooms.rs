//! `/api/v1/classrooms` endpoints.

use reqwest::Method;

use portal_auth::SessionSnapshot;
use portal_core::{ClassroomId, UserId};

use crate::{ApiClient, ApiError, ClassroomDto, CreateClassroomRequest};

impl ApiClient {
    pub async fn list_classrooms(
        &self,
        session: &SessionSnapshot,
    ) -> Result<Vec<ClassroomDto>, ApiError> {
        let builder = self.request(session, Method::GET, &["api", "v1", "classrooms"]);
        self.send_json(builder).await
    }

    pub async fn create_classroom(
        &self,
        session: &SessionSnapshot,
        req: &CreateClassroomRequest,
    ) -> Result<ClassroomDto, ApiError> {
        req.validate()?;
        let builder = self
            .request(session, Method::POST, &["api", "v1", "classrooms"])
            .json(req);
        self.send_json(builder).await
    }

    /// Enroll a learner. The response body, if any, is ignored.
    pub async fn enroll(
        &self,
        session: &SessionSnapshot,
        classroom_id: ClassroomId,
        learner: &UserId,
    ) -> Result<(), ApiError> {
        let classroom = classroom_id.to_string();
        let builder = self.request(
            session,
            Method::POST,
            &["api", "v1", "classrooms", classroom.as_str(), "enroll", learner.as_str()],
        );
        self.send(builder).await?;
        Ok(())
    }
}
