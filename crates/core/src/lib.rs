//! `portal-core` — shared building blocks for the classroom portal client.
//!
//! Identifiers and the validation error model. No IO lives here.

pub mod error;
pub mod id;

pub use error::{ValidationError, ValidationResult};
pub use id::{ClassroomId, GradeId, ResourceId, SubjectId, UserId};
