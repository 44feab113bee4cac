use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ClaimSet;

/// Role identifier used for UI gating.
///
/// Roles are opaque strings compared exactly (case-sensitive); the portal API
/// decides what they mean.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const TEACHER: Role = Role::from_static("Teacher");
    pub const LEARNER: Role = Role::from_static("Learner");
    pub const SUPER_ADMIN: Role = Role::from_static("SuperAdmin");
    /// Spelling some accounts were provisioned with.
    pub const SUPER_ADMIN_SPACED: Role = Role::from_static("Super Admin");
    pub const ADMIN: Role = Role::from_static("Admin");

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self(Cow::Owned(value.to_string()))
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// Derive the role list from a (possibly absent) claim set.
///
/// The conventional `role` claim wins over the namespaced one; a claim that is
/// present but empty (`""`, `false`, `0`, `[]`) falls through to the next.
/// Arrays are flattened one level, preserving order; scalars become a single
/// role.
pub fn extract_roles(claims: Option<&ClaimSet>) -> Vec<Role> {
    let Some(claims) = claims else {
        return Vec::new();
    };

    let found = [claims.role.as_ref(), claims.namespaced_role.as_ref()]
        .into_iter()
        .flatten()
        .find(|value| !is_blank(value));

    match found {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(|v| Role::from(claim_string(v))).collect(),
        Some(value) => vec![Role::from(claim_string(value))],
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(_) => false,
    }
}

/// String form of a claim value.
fn claim_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(claim_string).collect::<Vec<_>>().join(","),
        Value::Number(n) => number_string(n),
        other => other.to_string(),
    }
}

/// Integral values print without a fractional part (`1.0` reads as `1`).
fn number_string(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() => f.to_string(),
        _ => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NAMESPACED_ROLE_CLAIM;
    use crate::claims::decode;
    use crate::claims::tests::token_with_payload;
    use serde_json::json;

    fn roles_of(payload: Value) -> Vec<String> {
        let claims = decode(&token_with_payload(&payload));
        extract_roles(claims.as_ref())
            .into_iter()
            .map(|r| r.to_string())
            .collect()
    }

    #[test]
    fn absent_claims_have_no_roles() {
        assert!(extract_roles(None).is_empty());
        assert!(extract_roles(decode("abc.def").as_ref()).is_empty());
    }

    #[test]
    fn scalar_role_becomes_single_element() {
        assert_eq!(
            roles_of(json!({"sub":"42","role":"Teacher","exp":9999999999i64})),
            vec!["Teacher"]
        );
        assert_eq!(roles_of(json!({"role": 3})), vec!["3"]);
        assert_eq!(roles_of(json!({"role": true})), vec!["true"]);
    }

    #[test]
    fn numeric_roles_print_like_integers_when_integral() {
        assert_eq!(roles_of(json!({"role": 1.0})), vec!["1"]);
        assert_eq!(roles_of(json!({"role": [2.5, -3.0, 4]})), vec!["2.5", "-3", "4"]);
    }

    #[test]
    fn array_role_preserves_order() {
        assert_eq!(
            roles_of(json!({"role":["Teacher","SuperAdmin"]})),
            vec!["Teacher", "SuperAdmin"]
        );
    }

    #[test]
    fn array_elements_are_stringified_one_level() {
        assert_eq!(
            roles_of(json!({"role":["Teacher", 7, null, ["a", "b"], {"k": 1}]})),
            vec!["Teacher", "7", "null", "a,b", r#"{"k":1}"#]
        );
    }

    #[test]
    fn namespaced_claim_is_the_fallback() {
        assert_eq!(
            roles_of(json!({ NAMESPACED_ROLE_CLAIM: "Learner" })),
            vec!["Learner"]
        );
        assert_eq!(
            roles_of(json!({ "role": "Teacher", NAMESPACED_ROLE_CLAIM: "Learner" })),
            vec!["Teacher"]
        );
    }

    #[test]
    fn empty_role_falls_through() {
        assert_eq!(
            roles_of(json!({ "role": "", NAMESPACED_ROLE_CLAIM: ["Admin"] })),
            vec!["Admin"]
        );
        assert_eq!(
            roles_of(json!({ "role": [], NAMESPACED_ROLE_CLAIM: "Admin" })),
            vec!["Admin"]
        );
        assert!(roles_of(json!({ "role": null })).is_empty());
        assert!(roles_of(json!({ "role": 0 })).is_empty());
        assert!(roles_of(json!({ "sub": "1" })).is_empty());
    }

    #[test]
    fn well_known_roles_compare_with_decoded_ones() {
        let claims = decode(&token_with_payload(&json!({"role": "SuperAdmin"})));
        assert_eq!(extract_roles(claims.as_ref()), vec![Role::SUPER_ADMIN]);
    }
}
