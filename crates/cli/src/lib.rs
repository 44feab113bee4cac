//! `portal-cli`
//!
//! Command-line front-end for the classroom portal. It owns the session
//! (restored from the token file at start-up), gates commands the way the
//! web views are gated, and talks to the portal API.

pub mod app;
pub mod cli;
pub mod routes;
pub mod views;

pub use app::{AccessDenied, App};
pub use cli::{Cli, Command};
pub use routes::{Resolution, Route};
