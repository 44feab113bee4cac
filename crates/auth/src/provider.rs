//! Single owner of the session.

use thiserror::Error;

use crate::{Session, StoreError, TokenStore};

#[derive(Debug, Error)]
pub enum SessionError {
    /// The session was requested before [`SessionProvider::init`] ran.
    /// This is a wiring bug, not a user-facing condition.
    #[error("session accessed before the session provider was initialized")]
    NotInitialized,

    #[error("session provider initialized twice")]
    AlreadyInitialized,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owns the application's [`Session`] and is the only way to reach it.
#[derive(Debug)]
pub struct SessionProvider<S> {
    session: Option<Session<S>>,
}

impl<S> Default for SessionProvider<S> {
    fn default() -> Self {
        Self { session: None }
    }
}

impl<S: TokenStore> SessionProvider<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the session from `store`. May only run once.
    pub fn init(&mut self, store: S) -> Result<&mut Session<S>, SessionError> {
        if self.session.is_some() {
            return Err(SessionError::AlreadyInitialized);
        }
        let session = Session::restore(store)?;
        Ok(self.session.insert(session))
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Result<&Session<S>, SessionError> {
        self.session.as_ref().ok_or(SessionError::NotInitialized)
    }

    pub fn session_mut(&mut self) -> Result<&mut Session<S>, SessionError> {
        self.session.as_mut().ok_or(SessionError::NotInitialized)
    }
}
