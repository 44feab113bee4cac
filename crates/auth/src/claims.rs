use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use portal_core::UserId;

use crate::token;

/// Role claim key used by ASP.NET Core Identity (`ClaimTypes.Role`).
pub const NAMESPACED_ROLE_CLAIM: &str =
    "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";

/// Claims carried in a token payload.
///
/// Known claims are lifted into typed fields; everything else stays in
/// `extra`. A known claim with an unexpected JSON type (say `"exp": "soon"`)
/// is not an error: it is left in `extra` untouched, so [`ClaimSet::to_value`]
/// always reproduces the payload object exactly.
///
/// Role claims stay as raw JSON because identity providers disagree on their
/// shape (string, number, or array); see [`crate::extract_roles`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClaimSet {
    /// Subject (`sub`).
    pub sub: Option<String>,

    pub email: Option<String>,

    /// Conventional `role` claim.
    pub role: Option<Value>,

    /// Namespaced role claim ([`NAMESPACED_ROLE_CLAIM`]).
    pub namespaced_role: Option<Value>,

    /// Expiry, unix seconds. Informational only.
    pub exp: Option<i64>,

    pub iss: Option<String>,

    pub aud: Option<String>,

    /// Unrecognized (or unexpectedly typed) claims.
    pub extra: Map<String, Value>,
}

impl ClaimSet {
    /// Lift known claims out of a parsed payload object.
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        Self {
            sub: take_string(&mut map, "sub"),
            email: take_string(&mut map, "email"),
            role: take_non_null(&mut map, "role"),
            namespaced_role: take_non_null(&mut map, NAMESPACED_ROLE_CLAIM),
            exp: take_i64(&mut map, "exp"),
            iss: take_string(&mut map, "iss"),
            aud: take_string(&mut map, "aud"),
            extra: map,
        }
    }

    /// Rebuild the payload object this claim set was decoded from.
    pub fn to_value(&self) -> Value {
        let mut map = self.extra.clone();
        put(&mut map, "sub", self.sub.clone().map(Value::String));
        put(&mut map, "email", self.email.clone().map(Value::String));
        put(&mut map, "role", self.role.clone());
        put(&mut map, NAMESPACED_ROLE_CLAIM, self.namespaced_role.clone());
        put(&mut map, "exp", self.exp.map(Value::from));
        put(&mut map, "iss", self.iss.clone().map(Value::String));
        put(&mut map, "aud", self.aud.clone().map(Value::String));
        Value::Object(map)
    }

    /// Look up any claim by name, known or not.
    pub fn claim(&self, name: &str) -> Option<Value> {
        match self.to_value() {
            Value::Object(mut map) => map.remove(name),
            _ => None,
        }
    }

    /// The subject as a portal user id, when present and non-blank.
    pub fn subject_id(&self) -> Option<UserId> {
        self.sub.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Whether `exp` lies at or before `now`. Tokens without `exp` never expire.
    ///
    /// Nothing in this crate enforces expiry; the API rejects stale tokens.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }
}

impl Serialize for ClaimSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ClaimSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_map(map))
    }
}

/// Decode the claims of a token without verifying it.
///
/// Returns `None` when the token does not have exactly three segments, the
/// payload is not base64url, not UTF-8, or not a JSON object. Malformed tokens
/// are an expected state (stale or logged-out sessions), so there is no error
/// type here.
pub fn decode(token: &str) -> Option<ClaimSet> {
    let (_, payload, _) = token::split_segments(token)?;
    let bytes = token::decode_segment(payload)?;

    match serde_json::from_slice::<ClaimSet>(&bytes) {
        Ok(claims) => Some(claims),
        Err(err) => {
            tracing::debug!(error = %err, "token payload is not a JSON claim object");
            None
        }
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    if !matches!(map.get(key), Some(Value::String(_))) {
        return None;
    }
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn take_i64(map: &mut Map<String, Value>, key: &str) -> Option<i64> {
    let value = map.get(key)?.as_i64()?;
    map.remove(key);
    Some(value)
}

// `null` is treated as "claim not set" and stays in `extra`.
fn take_non_null(map: &mut Map<String, Value>, key: &str) -> Option<Value> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(_) => map.remove(key),
    }
}

fn put(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use proptest::prelude::*;
    use serde_json::json;

    /// Build an unsigned token around a JSON payload.
    pub(crate) fn token_with_payload(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.signature")
    }

    #[test]
    fn decodes_teacher_token() {
        let token = token_with_payload(&json!({"sub":"42","role":"Teacher","exp":9999999999i64}));
        let claims = decode(&token).expect("claims");

        assert_eq!(claims.sub.as_deref(), Some("42"));
        assert_eq!(claims.role, Some(json!("Teacher")));
        assert_eq!(claims.exp, Some(9_999_999_999));
        assert!(claims.extra.is_empty());
        assert_eq!(
            claims.to_value(),
            json!({"sub":"42","role":"Teacher","exp":9999999999i64})
        );
    }

    #[test]
    fn two_segments_is_absent() {
        assert!(decode("abc.def").is_none());
        assert!(decode("").is_none());
        assert!(decode("a.b.c.d").is_none());
    }

    #[test]
    fn undecodable_payload_is_absent() {
        assert!(decode("h.!!!.s").is_none());
        // valid base64 of "not json"
        assert!(decode("h.bm90IGpzb24.s").is_none());
        // empty payload segment
        assert!(decode("h..s").is_none());
    }

    #[test]
    fn non_object_json_is_absent() {
        assert!(decode(&token_with_payload(&json!(5))).is_none());
        assert!(decode(&token_with_payload(&json!(["Teacher"]))).is_none());
        assert!(decode(&token_with_payload(&json!("Teacher"))).is_none());
    }

    #[test]
    fn invalid_utf8_is_absent() {
        let payload = URL_SAFE_NO_PAD.encode([0x7b_u8, 0xff, 0xfe, 0x7d]);
        assert!(decode(&format!("h.{payload}.s")).is_none());
    }

    #[test]
    fn multibyte_utf8_survives() {
        let token = token_with_payload(&json!({"email":"zoë@skool.test","name":"Thandiwe Ñ"}));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.email.as_deref(), Some("zoë@skool.test"));
        assert_eq!(claims.extra["name"], json!("Thandiwe Ñ"));
    }

    #[test]
    fn mistyped_known_claims_stay_in_extra() {
        let payload = json!({"sub": 42, "exp": "soon", "aud": ["a", "b"], "role": null});
        let claims = decode(&token_with_payload(&payload)).unwrap();

        assert_eq!(claims.sub, None);
        assert_eq!(claims.exp, None);
        assert_eq!(claims.aud, None);
        assert_eq!(claims.role, None);
        assert_eq!(claims.extra.len(), 4);
        assert_eq!(claims.to_value(), payload);
    }

    #[test]
    fn namespaced_role_is_lifted() {
        let payload = json!({ NAMESPACED_ROLE_CLAIM: ["Learner"] });
        let claims = decode(&token_with_payload(&payload)).unwrap();
        assert_eq!(claims.namespaced_role, Some(json!(["Learner"])));
        assert_eq!(claims.claim(NAMESPACED_ROLE_CLAIM), Some(json!(["Learner"])));
    }

    #[test]
    fn header_and_signature_are_ignored() {
        let body = URL_SAFE_NO_PAD.encode(r#"{"sub":"7"}"#);
        let claims = decode(&format!("not-a-header.{body}.")).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("7"));
    }

    #[test]
    fn expiry_is_informational() {
        let claims = ClaimSet {
            exp: Some(1_700_000_000),
            ..Default::default()
        };
        let at = claims.expires_at().unwrap();
        assert_eq!(at.timestamp(), 1_700_000_000);
        assert!(claims.is_expired_at(at));
        assert!(!claims.is_expired_at(at - chrono::Duration::seconds(1)));
        assert!(!ClaimSet::default().is_expired_at(Utc::now()));
    }

    #[test]
    fn subject_id_skips_blank_subjects() {
        let claims = ClaimSet {
            sub: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(claims.subject_id(), None);
    }

    fn arb_claim_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 _.@-]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(2, 16, 4, |inner| {
            prop::collection::vec(inner, 0..4).prop_map(Value::Array)
        })
    }

    proptest! {
        #[test]
        fn wrong_segment_count_is_absent(parts in prop::collection::vec("[A-Za-z0-9_-]{0,8}", 0..6)) {
            prop_assume!(parts.len() != 3);
            let token = parts.join(".");
            prop_assert!(decode(&token).is_none());
        }

        #[test]
        fn payload_object_round_trips(
            claims in prop::collection::btree_map(
                prop_oneof![
                    Just("sub".to_string()),
                    Just("email".to_string()),
                    Just("role".to_string()),
                    Just("exp".to_string()),
                    Just(NAMESPACED_ROLE_CLAIM.to_string()),
                    "[a-z]{1,6}",
                ],
                arb_claim_value(),
                0..6,
            ),
            header in "[A-Za-z0-9_-]{0,10}",
            signature in "[A-Za-z0-9_-]{0,10}",
        ) {
            let payload = Value::Object(claims.into_iter().collect());
            let body = URL_SAFE_NO_PAD.encode(payload.to_string());
            let decoded = decode(&format!("{header}.{body}.{signature}"));
            prop_assert_eq!(decoded.map(|c| c.to_value()), Some(payload));
        }
    }
}
