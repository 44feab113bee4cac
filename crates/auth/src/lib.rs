//! `portal-auth` — client-side session and authorization derivation.
//!
//! Decodes bearer tokens into claims and roles **without verifying them**.
//! Everything here drives UI gating only; the remote API is the security
//! boundary.

pub mod claims;
pub mod guard;
pub mod provider;
pub mod roles;
pub mod session;
pub mod store;
pub mod token;

pub use claims::{ClaimSet, NAMESPACED_ROLE_CLAIM, decode};
pub use guard::{GateDecision, RoleGate};
pub use provider::{SessionError, SessionProvider};
pub use roles::{Role, extract_roles};
pub use session::{ListenerId, Session, SessionSnapshot, SessionState};
pub use store::{FileTokenStore, MemoryTokenStore, StoreError, TokenStore};
pub use token::AccessToken;
