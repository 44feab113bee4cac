//! REST bindings for the classroom portal API.
//!
//! Every request reads the caller's [`portal_auth::SessionSnapshot`] and
//! attaches its token as a bearer credential when one is present.

pub mod auth;
pub mod classrooms;
pub mod client;
pub mod config;
pub mod dto;
pub mod resources;

pub use client::{ApiClient, ApiError};
pub use config::ApiConfig;
pub use dto::{
    AuthResponse, ClassroomDto, CreateClassroomRequest, LoginRequest, RegisterRequest,
    ResourceDto, UploadResourceResponse,
};
pub use resources::UploadResource;
