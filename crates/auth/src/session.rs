//! Session state: token, derived claims and roles, change notification.

use crate::{AccessToken, ClaimSet, Role, StoreError, TokenStore, decode, extract_roles};

/// Coarse session state as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token held.
    Anonymous,
    /// A token is held. Its claims may or may not be decodable.
    Authenticated,
}

/// Read-only view of the session.
///
/// `authenticated` only says a token is present. A malformed token still
/// counts as authenticated while yielding no claims and no roles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub token: Option<AccessToken>,
    pub claims: Option<ClaimSet>,
    pub roles: Vec<Role>,
    pub authenticated: bool,
}

impl SessionSnapshot {
    /// Derive claims and roles from a token.
    pub fn derive(token: Option<AccessToken>) -> Self {
        let claims = token.as_ref().and_then(|t| decode(t.as_str()));
        let roles = extract_roles(claims.as_ref());
        Self {
            authenticated: token.is_some(),
            token,
            claims,
            roles,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.authenticated {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        self.roles.iter().any(|r| allowed.contains(r))
    }

    /// Subject claim, when the token decodes and carries one.
    pub fn subject(&self) -> Option<&str> {
        self.claims.as_ref().and_then(|c| c.sub.as_deref())
    }

    pub fn bearer(&self) -> Option<&str> {
        self.token.as_ref().map(AccessToken::as_str)
    }
}

/// Handle returned by [`Session::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&SessionSnapshot)>;

/// The client session.
///
/// Created once at start-up from a [`TokenStore`] and handed by reference to
/// whatever needs it. The only mutators are [`Session::set_token`] and
/// [`Session::clear_session`]; both persist through the store and notify
/// listeners synchronously before returning.
pub struct Session<S> {
    store: S,
    snapshot: SessionSnapshot,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl<S: TokenStore> Session<S> {
    /// Start a session from whatever token the store holds.
    pub fn restore(store: S) -> Result<Self, StoreError> {
        let token = store.load()?;
        let snapshot = SessionSnapshot::derive(token);

        tracing::debug!(
            authenticated = snapshot.authenticated,
            roles = ?snapshot.roles,
            "session restored"
        );

        Ok(Self {
            store,
            snapshot,
            listeners: Vec::new(),
            next_listener: 0,
        })
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> SessionState {
        self.snapshot.state()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replace the held token (or drop it with `None`).
    ///
    /// The in-memory state always reflects `token` afterwards. If the store
    /// fails, listeners have still been notified and the store error is
    /// returned.
    pub fn set_token(&mut self, token: Option<AccessToken>) -> Result<(), StoreError> {
        let persisted = match &token {
            Some(t) => self.store.save(t),
            None => self.store.remove(),
        };

        self.snapshot = SessionSnapshot::derive(token);

        tracing::debug!(
            authenticated = self.snapshot.authenticated,
            claims = self.snapshot.claims.is_some(),
            roles = ?self.snapshot.roles,
            "session token replaced"
        );
        if let Err(err) = &persisted {
            tracing::warn!(error = %err, "session token not persisted");
        }

        self.notify();
        persisted
    }

    /// End the session. Same as `set_token(None)`.
    pub fn clear_session(&mut self) -> Result<(), StoreError> {
        self.set_token(None)
    }

    /// Register a callback run after every mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&SessionSnapshot) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        let snapshot = &self.snapshot;
        for (_, listener) in self.listeners.iter_mut() {
            listener(snapshot);
        }
    }
}

impl<S: core::fmt::Debug> core::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("snapshot", &self.snapshot)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::MemoryTokenStore;
    use crate::claims::tests::token_with_payload;
    use serde_json::json;

    fn teacher_token() -> AccessToken {
        AccessToken::new(token_with_payload(
            &json!({"sub":"42","role":"Teacher","exp":9999999999i64}),
        ))
    }

    fn fresh() -> Session<MemoryTokenStore> {
        Session::restore(MemoryTokenStore::new()).unwrap()
    }

    #[test]
    fn starts_anonymous_with_empty_store() {
        let session = fresh();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(session.snapshot(), &SessionSnapshot::default());
    }

    #[test]
    fn restores_persisted_token() {
        let session = Session::restore(MemoryTokenStore::with_token(teacher_token())).unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.snapshot().roles, vec![Role::TEACHER]);
        assert_eq!(session.snapshot().subject(), Some("42"));
    }

    #[test]
    fn set_token_derives_and_persists() {
        let mut session = fresh();
        session.set_token(Some(teacher_token())).unwrap();

        let snap = session.snapshot();
        assert!(snap.authenticated);
        assert_eq!(snap.token, Some(teacher_token()));
        assert_eq!(snap.roles, vec![Role::TEACHER]);
        assert_eq!(session.store().get(), Some(&teacher_token()));
    }

    #[test]
    fn set_token_is_idempotent() {
        let mut once = fresh();
        once.set_token(Some(teacher_token())).unwrap();

        let mut twice = fresh();
        twice.set_token(Some(teacher_token())).unwrap();
        twice.set_token(Some(teacher_token())).unwrap();

        assert_eq!(once.snapshot(), twice.snapshot());
        assert_eq!(once.store().get(), twice.store().get());
    }

    #[test]
    fn malformed_token_is_authenticated_without_claims() {
        let mut session = fresh();
        session.set_token(Some(AccessToken::new("abc.def"))).unwrap();

        let snap = session.snapshot();
        assert!(snap.authenticated);
        assert_eq!(snap.claims, None);
        assert!(snap.roles.is_empty());
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[test]
    fn clear_session_matches_set_token_none() {
        let mut cleared = Session::restore(MemoryTokenStore::with_token(teacher_token())).unwrap();
        cleared.clear_session().unwrap();

        let mut nulled = Session::restore(MemoryTokenStore::with_token(teacher_token())).unwrap();
        nulled.set_token(None).unwrap();

        assert_eq!(cleared.snapshot(), nulled.snapshot());
        assert_eq!(cleared.store().get(), None);
        assert_eq!(nulled.store().get(), None);
        assert_eq!(cleared.state(), SessionState::Anonymous);
    }

    #[test]
    fn clearing_an_empty_session_is_a_no_op() {
        let mut session = fresh();
        session.set_token(None).unwrap();
        assert_eq!(session.snapshot(), &SessionSnapshot::default());
    }

    #[test]
    fn token_replacement_stays_authenticated() {
        let mut session = fresh();
        session.set_token(Some(teacher_token())).unwrap();

        let refreshed = AccessToken::new(token_with_payload(&json!({"sub":"42","role":["Teacher","SuperAdmin"]})));
        session.set_token(Some(refreshed.clone())).unwrap();

        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.snapshot().token, Some(refreshed));
        assert_eq!(session.snapshot().roles, vec![Role::TEACHER, Role::SUPER_ADMIN]);
    }

    #[test]
    fn listeners_see_every_mutation() {
        let seen: Rc<RefCell<Vec<bool>>> = Rc::default();
        let mut session = fresh();

        let sink = seen.clone();
        let id = session.subscribe(move |snap| sink.borrow_mut().push(snap.authenticated));

        session.set_token(Some(teacher_token())).unwrap();
        session.clear_session().unwrap();
        assert_eq!(*seen.borrow(), vec![true, false]);

        assert!(session.unsubscribe(id));
        assert!(!session.unsubscribe(id));
        session.set_token(Some(teacher_token())).unwrap();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn snapshot_role_queries() {
        let snap = SessionSnapshot::derive(Some(teacher_token()));
        assert!(snap.has_role(&Role::TEACHER));
        assert!(snap.has_any_role(&[Role::ADMIN, Role::TEACHER]));
        assert!(!snap.has_any_role(&[Role::ADMIN]));
        assert_eq!(snap.bearer(), Some(teacher_token().as_str()));
    }

    struct BrokenStore;

    impl TokenStore for BrokenStore {
        fn load(&self) -> Result<Option<AccessToken>, StoreError> {
            Ok(None)
        }

        fn save(&mut self, _token: &AccessToken) -> Result<(), StoreError> {
            Err(StoreError::Io {
                path: "/dev/full".into(),
                source: std::io::Error::other("disk full"),
            })
        }

        fn remove(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn store_failure_still_updates_memory() {
        let mut session = Session::restore(BrokenStore).unwrap();
        let err = session.set_token(Some(teacher_token())).unwrap_err();

        assert!(matches!(err, StoreError::Io { .. }));
        assert!(session.snapshot().authenticated);
    }
}
