//! Command execution against the session and the portal API.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, bail};
use thiserror::Error;

use portal_api::{
    ApiClient, ApiError, CreateClassroomRequest, LoginRequest, RegisterRequest, UploadResource,
};
use portal_auth::{
    AccessToken, GateDecision, Role, Session, SessionError, SessionProvider,
    SessionSnapshot, TokenStore,
};
use portal_core::{ClassroomId, GradeId, ResourceId, SubjectId, UserId};

use crate::cli::{ClassroomsCommand, Command, ResourcesCommand};
use crate::routes::{self, DEFAULT_ROUTE, Resolution, Route};
use crate::views;

/// A command was refused by a view gate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("{0} requires you to be logged in; run `portal login` first")]
    LoginRequired(Route),

    #[error("your role cannot open {route}; continue at {fallback}")]
    Forbidden { route: Route, fallback: Route },

    #[error("your token has no subject claim; log in again as a teacher")]
    MissingSubject,
}

/// The portal client: session owner plus API client.
pub struct App<S> {
    sessions: SessionProvider<S>,
    api: ApiClient,
}

impl<S: TokenStore> App<S> {
    /// Create an app whose session is not yet restored; see [`App::bootstrap`].
    pub fn new(api: ApiClient) -> Self {
        Self {
            sessions: SessionProvider::new(),
            api,
        }
    }

    /// Restore the session from `store` and start logging its changes.
    pub fn bootstrap(&mut self, store: S) -> Result<(), SessionError> {
        let session = self.sessions.init(store)?;
        session.subscribe(|snapshot| {
            tracing::info!(
                authenticated = snapshot.authenticated,
                roles = ?snapshot.roles,
                "session changed"
            );
        });
        Ok(())
    }

    pub fn session(&self) -> Result<&Session<S>, SessionError> {
        self.sessions.session()
    }

    fn snapshot(&self) -> anyhow::Result<SessionSnapshot> {
        Ok(self
            .sessions
            .session()
            .context("session provider is not wired up")?
            .snapshot()
            .clone())
    }

    fn set_token(&mut self, token: Option<AccessToken>) -> anyhow::Result<()> {
        self.sessions
            .session_mut()
            .context("session provider is not wired up")?
            .set_token(token)
            .context("failed to persist the session token")
    }

    /// Refuse unless the session may open `route`.
    fn require(&self, route: Route) -> anyhow::Result<SessionSnapshot> {
        let snapshot = self.snapshot()?;
        match route.check(&snapshot) {
            GateDecision::Allow => Ok(snapshot),
            GateDecision::Unauthenticated => Err(AccessDenied::LoginRequired(route).into()),
            GateDecision::Forbidden => Err(AccessDenied::Forbidden {
                route,
                fallback: DEFAULT_ROUTE,
            }
            .into()),
        }
    }

    pub async fn run(&mut self, command: Command, out: &mut impl Write) -> anyhow::Result<()> {
        match command {
            Command::Login { email, password } => self.login(email, password, out).await,
            Command::Register {
                email,
                password,
                full_name,
                role,
            } => self.register(email, password, full_name, role, out).await,
            Command::Logout => self.logout(out),
            Command::Whoami => self.whoami(out),
            Command::Classrooms(cmd) => self.classrooms(cmd, out).await,
            Command::Resources(cmd) => self.resources(cmd, out).await,
            Command::Admin => self.admin(out),
            Command::Route { path } => self.route(&path, out),
        }
    }

    async fn login(&mut self, email: String, password: String, out: &mut impl Write) -> anyhow::Result<()> {
        let snapshot = self.snapshot()?;
        let resp = self
            .api
            .login(&snapshot, &LoginRequest { email, password })
            .await
            .map_err(|e| api_failure(e, "Login failed"))?;

        self.set_token(Some(resp.access_token))?;
        writeln!(out, "Logged in. Continue at {}.", DEFAULT_ROUTE.path())?;
        self.whoami(out)
    }

    async fn register(
        &mut self,
        email: String,
        password: String,
        full_name: String,
        role: String,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        let snapshot = self.snapshot()?;
        let req = RegisterRequest {
            email,
            password,
            full_name,
            role: Some(Role::from(role.trim())),
        };
        let resp = self
            .api
            .register(&snapshot, &req)
            .await
            .map_err(|e| api_failure(e, "Registration failed"))?;

        self.set_token(Some(resp.access_token))?;
        writeln!(out, "Account created. Continue at {}.", DEFAULT_ROUTE.path())?;
        self.whoami(out)
    }

    fn logout(&mut self, out: &mut impl Write) -> anyhow::Result<()> {
        let session = self
            .sessions
            .session_mut()
            .context("session provider is not wired up")?;
        session
            .clear_session()
            .context("failed to remove the stored session token")?;
        writeln!(out, "Logged out.")?;
        Ok(())
    }

    fn whoami(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let snapshot = self.snapshot()?;
        let Some(badge) = views::role_badge(&snapshot) else {
            writeln!(out, "Not logged in.")?;
            return Ok(());
        };

        writeln!(out, "Logged in as {badge}")?;
        match &snapshot.claims {
            None => writeln!(out, "  token claims could not be decoded")?,
            Some(claims) => {
                if let Some(sub) = &claims.sub {
                    writeln!(out, "  subject: {sub}")?;
                }
                if let Some(email) = &claims.email {
                    writeln!(out, "  email:   {email}")?;
                }
                if let Some(exp) = claims.expires_at() {
                    writeln!(out, "  expires: {}", exp.to_rfc3339())?;
                }
            }
        }
        let roles: Vec<&str> = snapshot.roles.iter().map(|r| r.as_str()).collect();
        writeln!(
            out,
            "  roles:   {}",
            if roles.is_empty() { "(none)".to_string() } else { roles.join(", ") }
        )?;
        Ok(())
    }

    async fn classrooms(&mut self, cmd: ClassroomsCommand, out: &mut impl Write) -> anyhow::Result<()> {
        let snapshot = self.require(Route::Classrooms)?;
        match cmd {
            ClassroomsCommand::List { grade } => self.list_classrooms(&snapshot, grade, out).await,
            ClassroomsCommand::Create {
                name,
                grade,
                subject,
            } => self.create_classroom(&snapshot, name, grade, subject, out).await,
            ClassroomsCommand::Enroll { classroom, learner } => {
                self.api
                    .enroll(&snapshot, classroom, &learner)
                    .await
                    .map_err(|e| api_failure(e, "Enrollment failed"))?;
                writeln!(out, "Enrolled {learner} in classroom #{classroom}.")?;
                Ok(())
            }
        }
    }

    async fn list_classrooms(
        &self,
        snapshot: &SessionSnapshot,
        grade: Option<GradeId>,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        let items = self.api.list_classrooms(snapshot).await.map_err(|e| {
            api_failure(e, "Failed to load classrooms. Make sure you are logged in.")
        })?;

        let mut groups = views::group_by_grade(&items);
        if let Some(grade) = grade {
            groups.retain(|g| g.grade == grade);
        }
        write!(out, "{}", views::render_classrooms(&groups))?;
        Ok(())
    }

    async fn create_classroom(
        &self,
        snapshot: &SessionSnapshot,
        name: String,
        grade: GradeId,
        subject: SubjectId,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        let teacher = teacher_id(snapshot)?;
        let req = CreateClassroomRequest {
            name,
            grade_id: grade,
            subject_id: subject,
            teacher_user_id: teacher,
        };
        let created = self
            .api
            .create_classroom(snapshot, &req)
            .await
            .map_err(|e| api_failure(e, "Failed to create classroom"))?;

        writeln!(
            out,
            "Created classroom #{} \"{}\" (grade {}).",
            created.id, created.name, created.grade_id
        )?;
        Ok(())
    }

    async fn resources(&mut self, cmd: ResourcesCommand, out: &mut impl Write) -> anyhow::Result<()> {
        let snapshot = self.require(Route::Resources)?;
        match cmd {
            ResourcesCommand::List {
                classroom,
                category,
            } => self.list_resources(&snapshot, classroom, category, out).await,
            ResourcesCommand::Upload {
                classroom,
                file,
                category,
            } => self.upload(&snapshot, classroom, file, category, out).await,
            ResourcesCommand::Download { resource, output } => {
                self.download(&snapshot, resource, output, out).await
            }
        }
    }

    async fn list_resources(
        &self,
        snapshot: &SessionSnapshot,
        requested: Option<ClassroomId>,
        category: Option<String>,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        let classrooms = self
            .api
            .list_classrooms(snapshot)
            .await
            .map_err(|e| api_failure(e, "Failed to load classrooms"))?;
        let Some(classroom) = views::select_classroom(&classrooms, requested) else {
            writeln!(out, "No classrooms available.")?;
            return Ok(());
        };

        let items = self
            .api
            .list_resources(snapshot, classroom)
            .await
            .map_err(|e| api_failure(e, "Failed to load resources"))?;

        let shown: Vec<_> = match category.as_deref() {
            Some(c) => {
                let category = views::normalize_category(c)
                    .with_context(|| format!("unknown category {c:?}; expected one of {:?}", views::CATEGORIES))?;
                views::resources_in_category(&items, category)
            }
            None => items.iter().collect(),
        };

        writeln!(out, "Classroom #{classroom}")?;
        write!(out, "{}", views::render_resources(&shown))?;
        Ok(())
    }

    async fn upload(
        &self,
        snapshot: &SessionSnapshot,
        classroom: ClassroomId,
        file: PathBuf,
        category: String,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        let teacher = teacher_id(snapshot)?;
        let category = views::normalize_category(&category).with_context(|| {
            format!("unknown category {category:?}; expected one of {:?}", views::CATEGORIES)
        })?;

        let upload = UploadResource::from_path(&file, teacher, Some(category.to_string()))
            .await
            .map_err(|e| api_failure(e, "Upload failed"))?;
        let resp = self
            .api
            .upload_resource(snapshot, classroom, upload)
            .await
            .map_err(|e| api_failure(e, "Upload failed"))?;

        writeln!(
            out,
            "Uploaded {} as resource #{} ({category}).",
            resp.file_name, resp.resource_id
        )?;
        Ok(())
    }

    async fn download(
        &self,
        snapshot: &SessionSnapshot,
        resource: ResourceId,
        output: Option<PathBuf>,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        let bytes = self
            .api
            .download_resource(snapshot, resource)
            .await
            .map_err(|e| api_failure(e, "Download failed"))?;

        let path = output.unwrap_or_else(|| PathBuf::from(format!("resource-{resource}.pdf")));
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        writeln!(out, "Saved {} bytes to {}.", bytes.len(), path.display())?;
        Ok(())
    }

    fn admin(&self, out: &mut impl Write) -> anyhow::Result<()> {
        self.require(Route::Admin)?;
        writeln!(out, "Admin: manage grades, subjects, and users.")?;
        writeln!(out, "  GET/POST /api/v1/admin/grades")?;
        writeln!(out, "  POST     /api/v1/admin/subjects")?;
        Ok(())
    }

    fn route(&self, path: &str, out: &mut impl Write) -> anyhow::Result<()> {
        let snapshot = self.snapshot()?;
        match routes::navigate(path, &snapshot) {
            Resolution::Render(route) => writeln!(out, "{} -> {}", path, route.title())?,
            Resolution::Redirect(route) => {
                writeln!(out, "{} -> redirect {} ({})", path, route.path(), route.title())?
            }
        }
        Ok(())
    }
}

/// Teacher id for authoring commands: the token's subject. Which roles may
/// author is left to the API.
fn teacher_id(snapshot: &SessionSnapshot) -> anyhow::Result<UserId> {
    match snapshot.claims.as_ref().and_then(|c| c.subject_id()) {
        Some(id) => Ok(id),
        None => bail!(AccessDenied::MissingSubject),
    }
}

fn api_failure(err: ApiError, fallback: &str) -> anyhow::Error {
    let message = err.user_message(fallback);
    anyhow::Error::new(err).context(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_api::ApiConfig;
    use portal_auth::MemoryTokenStore;

    // {"sub":"t-42","role":"Teacher","exp":9999999999}
    const TEACHER_TOKEN: &str =
        "h.eyJzdWIiOiJ0LTQyIiwicm9sZSI6IlRlYWNoZXIiLCJleHAiOjk5OTk5OTk5OTl9.s";

    // Port 9 (discard) on localhost: any request that slips through fails fast.
    fn app_with(store: MemoryTokenStore) -> App<MemoryTokenStore> {
        let api = ApiClient::new(&ApiConfig::new("http://127.0.0.1:9")).unwrap();
        let mut app = App::new(api);
        app.bootstrap(store).unwrap();
        app
    }

    async fn run(app: &mut App<MemoryTokenStore>, command: Command) -> (anyhow::Result<()>, String) {
        let mut out = Vec::new();
        let result = app.run(command, &mut out).await;
        (result, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn commands_before_bootstrap_are_configuration_errors() {
        let api = ApiClient::new(&ApiConfig::new("http://127.0.0.1:9")).unwrap();
        let mut app: App<MemoryTokenStore> = App::new(api);
        let mut out = Vec::new();

        let err = app.run(Command::Whoami, &mut out).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SessionError>(),
            Some(SessionError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn whoami_reports_anonymous_and_teacher() {
        let mut anon = app_with(MemoryTokenStore::new());
        let (result, text) = run(&mut anon, Command::Whoami).await;
        result.unwrap();
        assert_eq!(text, "Not logged in.\n");

        let mut teacher = app_with(MemoryTokenStore::with_token(TEACHER_TOKEN));
        let (result, text) = run(&mut teacher, Command::Whoami).await;
        result.unwrap();
        assert!(text.starts_with("Logged in as Teacher\n"));
        assert!(text.contains("subject: t-42"));
        assert!(text.contains("roles:   Teacher"));
    }

    #[tokio::test]
    async fn malformed_token_looks_logged_in_without_claims() {
        let mut app = app_with(MemoryTokenStore::with_token("abc.def"));
        let (result, text) = run(&mut app, Command::Whoami).await;
        result.unwrap();
        assert!(text.starts_with("Logged in as User\n"));
        assert!(text.contains("token claims could not be decoded"));
        assert!(text.contains("roles:   (none)"));
    }

    #[tokio::test]
    async fn logout_clears_store() {
        let mut app = app_with(MemoryTokenStore::with_token(TEACHER_TOKEN));
        let (result, text) = run(&mut app, Command::Logout).await;
        result.unwrap();
        assert_eq!(text, "Logged out.\n");

        let session = app.session().unwrap();
        assert!(!session.snapshot().authenticated);
        assert_eq!(session.store().get(), None);
    }

    #[tokio::test]
    async fn gated_commands_require_login() {
        let mut app = app_with(MemoryTokenStore::new());
        let (result, _) = run(
            &mut app,
            Command::Classrooms(ClassroomsCommand::List { grade: None }),
        )
        .await;
        let err = result.unwrap_err();
        assert_eq!(
            err.downcast_ref::<AccessDenied>(),
            Some(&AccessDenied::LoginRequired(Route::Classrooms))
        );
    }

    #[tokio::test]
    async fn admin_is_forbidden_for_teachers() {
        let mut app = app_with(MemoryTokenStore::with_token(TEACHER_TOKEN));
        let (result, text) = run(&mut app, Command::Admin).await;
        let err = result.unwrap_err();
        assert_eq!(
            err.downcast_ref::<AccessDenied>(),
            Some(&AccessDenied::Forbidden {
                route: Route::Admin,
                fallback: Route::Classrooms
            })
        );
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn creating_without_subject_is_refused_before_any_request() {
        // {"role":"Teacher"}
        let mut app = app_with(MemoryTokenStore::with_token("h.eyJyb2xlIjoiVGVhY2hlciJ9.s"));
        let (result, _) = run(
            &mut app,
            Command::Classrooms(ClassroomsCommand::Create {
                name: "8A".to_string(),
                grade: GradeId::new(8),
                subject: SubjectId::new(1),
            }),
        )
        .await;
        assert_eq!(
            result.unwrap_err().downcast_ref::<AccessDenied>(),
            Some(&AccessDenied::MissingSubject)
        );
    }

    #[tokio::test]
    async fn authoring_is_not_gated_on_role() {
        // {"sub":"l-1","role":"Learner"}
        let mut app = app_with(MemoryTokenStore::with_token(
            "h.eyJzdWIiOiJsLTEiLCJyb2xlIjoiTGVhcm5lciJ9.s",
        ));
        let missing = std::env::temp_dir().join("portal-no-such-upload.pdf");
        let (result, _) = run(
            &mut app,
            Command::Resources(ResourcesCommand::Upload {
                classroom: ClassroomId::new(1),
                file: missing,
                category: "Revision".to_string(),
            }),
        )
        .await;

        // gets as far as reading the file
        let err = result.unwrap_err();
        assert_eq!(err.downcast_ref::<AccessDenied>(), None);
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::File { .. })));
    }

    #[tokio::test]
    async fn route_command_follows_gates() {
        let mut app = app_with(MemoryTokenStore::new());
        let (_, text) = run(&mut app, Command::Route { path: "/admin".to_string() }).await;
        assert_eq!(text, "/admin -> redirect /login (Login)\n");

        let (_, text) = run(&mut app, Command::Route { path: "/".to_string() }).await;
        assert_eq!(text, "/ -> redirect /dashboard (Dashboard)\n");

        let (_, text) = run(&mut app, Command::Route { path: "/register".to_string() }).await;
        assert_eq!(text, "/register -> Register\n");
    }
}
