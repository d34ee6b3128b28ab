//! Collaborators injected into the gate, and their configuration.

mod auth;
mod config;

pub use crate::service::auth::{
    AdminGrants, AuthError, AuthOutcome, AuthService, MemoryAuthService, MilestoneId,
    ProjectGrants, ProjectId,
};
pub use crate::service::config::GateConfig;
// Re-export error types from crate root for convenience
pub use crate::{Error, Result};
