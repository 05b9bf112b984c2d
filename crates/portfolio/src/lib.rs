//! Portfolio data behind the keyboard: project records filed under tech
//! stacks, a storage contract with local implementations, and admin
//! sign-in.
//!
//! # Invariants
//! - Stored projects always pass draft validation; rows that do not are
//!   dropped when a store is opened.
//! - Listings are newest first.
//! - Every write to a [`LocalProjectStore`] reaches disk before returning,
//!   and a write that fails leaves the store unchanged.

mod auth;
mod project;
mod store;

pub use auth::{AdminAuth, AdminUser, LocalAuth, password_digest};
pub use project::{Project, ProjectDraft};
pub use store::{LocalProjectStore, MemoryProjectStore, ProjectStore, projects_for_key};

use uuid::Uuid;

/// Errors from portfolio operations.
#[derive(Debug, thiserror::Error)]
pub enum PortfolioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("unknown tech stack: {0:?}")]
    UnknownTechStack(String),
    #[error("project not found: {0}")]
    NotFound(Uuid),
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("invalid email or password")]
    InvalidCredentials,
}
