//! `/api/v1/auth` endpoints.

use reqwest::Method;

use portal_auth::SessionSnapshot;

use crate::{ApiClient, ApiError, AuthResponse, LoginRequest, RegisterRequest};

impl ApiClient {
    /// Create an account. The returned token is not stored; hand it to
    /// `Session::set_token`.
    pub async fn register(
        &self,
        session: &SessionSnapshot,
        req: &RegisterRequest,
    ) -> Result<AuthResponse, ApiError> {
        req.validate()?;
        let builder = self
            .request(session, Method::POST, &["api", "v1", "auth", "register"])
            .json(req);
        self.send_json(builder).await
    }

    pub async fn login(
        &self,
        session: &SessionSnapshot,
        req: &LoginRequest,
    ) -> Result<AuthResponse, ApiError> {
        req.validate()?;
        let builder = self
            .request(session, Method::POST, &["api", "v1", "auth", "login"])
            .json(req);
        self.send_json(builder).await
    }
}
