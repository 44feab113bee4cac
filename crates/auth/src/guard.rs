//! Role gate for views and commands.

use crate::{Role, SessionSnapshot};

/// Outcome of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// No token: send the user to the login view.
    Unauthenticated,
    /// Token present but no allowed role: send the user to the default view.
    Forbidden,
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

/// Allow-list of roles guarding a view.
///
/// A gate built with [`RoleGate::authenticated`] only requires a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGate {
    allow: Option<Vec<Role>>,
}

impl RoleGate {
    pub fn authenticated() -> Self {
        Self { allow: None }
    }

    pub fn any_of(allow: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allow: Some(allow.into_iter().collect()),
        }
    }

    /// Administrative views.
    pub fn admin() -> Self {
        Self::any_of([Role::SUPER_ADMIN, Role::SUPER_ADMIN_SPACED, Role::ADMIN])
    }

    pub fn allowed_roles(&self) -> Option<&[Role]> {
        self.allow.as_deref()
    }

    pub fn check(&self, session: &SessionSnapshot) -> GateDecision {
        if !session.authenticated {
            return GateDecision::Unauthenticated;
        }
        match &self.allow {
            None => GateDecision::Allow,
            Some(allow) if session.has_any_role(allow) => GateDecision::Allow,
            Some(_) => GateDecision::Forbidden,
        }
    }
}
