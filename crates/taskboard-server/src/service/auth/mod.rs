//! Authorization service interface.
//!
//! The gate does not decide rights on its own. It asks an [`AuthService`]
//! one of two questions and maps the answer:
//!
//! - [`AuthService::has_milestone_admin`] for milestone-scoped requests
//! - [`AuthService::has_project_admin`] for project-scoped requests

mod error;
mod memory;

use async_trait::async_trait;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

pub use self::error::{AuthError, AuthOutcome};
pub use self::memory::{AdminGrants, MemoryAuthService, ProjectGrants};
use crate::extract::ActingUser;

/// Identifier of a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MilestoneId(pub i64);

/// Identifier of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub i64);

/// Answers administrative-rights questions for the gate.
///
/// `Ok(true)` grants, `Ok(false)` denies and `Err` reports that the question
/// could not be answered. An [`AuthError`] may carry the HTTP status the
/// rejection should use.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Whether `user` may administer the milestone.
    async fn has_milestone_admin(
        &self,
        user: &ActingUser,
        milestone_id: MilestoneId,
    ) -> Result<bool, AuthError>;

    /// Whether `user` may administer the project.
    async fn has_project_admin(
        &self,
        user: &ActingUser,
        project_id: ProjectId,
    ) -> Result<bool, AuthError>;
}
