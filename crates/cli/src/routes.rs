//! Route table and navigation gating.

use portal_auth::{GateDecision, RoleGate, SessionSnapshot};

/// Views of the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Dashboard,
    Login,
    Register,
    Classrooms,
    Resources,
    Admin,
}

/// Where users land after login and when a role gate turns them away.
pub const DEFAULT_ROUTE: Route = Route::Classrooms;

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Dashboard,
        Route::Login,
        Route::Register,
        Route::Classrooms,
        Route::Resources,
        Route::Admin,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Dashboard => "/dashboard",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Classrooms => "/classrooms",
            Route::Resources => "/resources",
            Route::Admin => "/admin",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Dashboard => "Dashboard",
            Route::Login => "Login",
            Route::Register => "Register",
            Route::Classrooms => "Classrooms",
            Route::Resources => "Resources",
            Route::Admin => "Admin",
        }
    }

    /// Gate guarding this view, if any.
    pub fn gate(&self) -> Option<RoleGate> {
        match self {
            Route::Classrooms | Route::Resources => Some(RoleGate::authenticated()),
            Route::Admin => Some(RoleGate::admin()),
            Route::Dashboard | Route::Login | Route::Register => None,
        }
    }

    /// Check the session against this view's gate.
    pub fn check(&self, session: &SessionSnapshot) -> GateDecision {
        self.gate()
            .map(|gate| gate.check(session))
            .unwrap_or(GateDecision::Allow)
    }
}

impl core::fmt::Display for Route {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.title())
    }
}

/// Result of navigating to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Render(Route),
    Redirect(Route),
}

impl Resolution {
    /// The route that ends up on screen.
    pub fn route(&self) -> Route {
        match self {
            Resolution::Render(route) | Resolution::Redirect(route) => *route,
        }
    }
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// Match a path against the route table, ignoring session state.
///
/// `/` and unknown paths redirect to the dashboard.
pub fn resolve(path: &str) -> Resolution {
    let path = normalize(path);
    Route::ALL
        .into_iter()
        .find(|route| route.path() == path)
        .map(Resolution::Render)
        .unwrap_or(Resolution::Redirect(Route::Dashboard))
}

/// Resolve a path and apply the target view's gate.
pub fn navigate(path: &str, session: &SessionSnapshot) -> Resolution {
    match resolve(path) {
        Resolution::Render(route) => match route.check(session) {
            GateDecision::Allow => Resolution::Render(route),
            GateDecision::Unauthenticated => Resolution::Redirect(Route::Login),
            GateDecision::Forbidden => Resolution::Redirect(DEFAULT_ROUTE),
        },
        redirect => redirect,
    }
}

/// Heading for a path, matched by prefix.
pub fn page_title(path: &str) -> &'static str {
    const BY_PREFIX: [Route; 6] = [
        Route::Admin,
        Route::Classrooms,
        Route::Resources,
        Route::Dashboard,
        Route::Login,
        Route::Register,
    ];
    BY_PREFIX
        .into_iter()
        .find(|route| path.starts_with(route.path()))
        .map(|route| route.title())
        .unwrap_or("Classroom")
}
