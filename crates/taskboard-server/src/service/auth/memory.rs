//! In-process [`AuthService`] backed by a static grant table.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthError, AuthService, MilestoneId, ProjectId};
use crate::extract::ActingUser;
use crate::{Error, Result, TRACING_TARGET_SERVICE};

/// Grant table for [`MemoryAuthService`].
///
/// ```json
/// {
///   "administrators": ["67e55044-10b1-426f-9247-bb680e5fe0c8"],
///   "projects": [
///     { "id": 3, "admins": ["..."], "milestones": [7, 42] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminGrants {
    /// Accounts with global administrator rights.
    #[serde(default)]
    pub administrators: HashSet<Uuid>,
    /// Per-project admins and milestones.
    #[serde(default)]
    pub projects: Vec<ProjectGrants>,
}

/// Admins and milestones of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGrants {
    /// Project identifier.
    pub id: ProjectId,
    /// Accounts administering the project and all of its milestones.
    #[serde(default)]
    pub admins: HashSet<Uuid>,
    /// Milestones owned by the project.
    #[serde(default)]
    pub milestones: Vec<MilestoneId>,
}

impl ProjectGrants {
    /// Creates an empty grant entry for `id`.
    pub fn new(id: ProjectId) -> Self {
        Self {
            id,
            admins: HashSet::new(),
            milestones: Vec::new(),
        }
    }

    /// Adds an admin account.
    pub fn with_admin(mut self, account_id: Uuid) -> Self {
        self.admins.insert(account_id);
        self
    }

    /// Adds an owned milestone.
    pub fn with_milestone(mut self, milestone_id: MilestoneId) -> Self {
        self.milestones.push(milestone_id);
        self
    }
}

#[derive(Debug, Default)]
struct GrantIndex {
    administrators: HashSet<Uuid>,
    project_admins: HashMap<ProjectId, HashSet<Uuid>>,
    milestone_projects: HashMap<MilestoneId, ProjectId>,
}

/// [`AuthService`] answering from an immutable, in-memory grant table.
///
/// Project admins administer every milestone of their project. Global
/// administrators, either flagged on the [`ActingUser`] or listed in
/// [`AdminGrants::administrators`], administer everything. Unknown projects
/// and milestones fail with `404`.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuthService {
    index: Arc<GrantIndex>,
}

impl MemoryAuthService {
    /// Builds the service from a grant table.
    ///
    /// # Errors
    ///
    /// Returns a [`Config`] error if a project is listed twice or a milestone
    /// is claimed by more than one project.
    ///
    /// [`Config`]: crate::ErrorKind::Config
    pub fn new(grants: AdminGrants) -> Result<Self> {
        let mut index = GrantIndex {
            administrators: grants.administrators,
            ..GrantIndex::default()
        };

        for project in grants.projects {
            if index.project_admins.contains_key(&project.id) {
                return Err(Error::config(format!(
                    "project {} is listed more than once",
                    project.id
                )));
            }

            for milestone_id in project.milestones {
                match index.milestone_projects.insert(milestone_id, project.id) {
                    Some(owner) if owner != project.id => {
                        return Err(Error::config(format!(
                            "milestone {milestone_id} belongs to both project {owner} and project {}",
                            project.id
                        )));
                    }
                    _ => {}
                }
            }

            index.project_admins.insert(project.id, project.admins);
        }

        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            administrators = index.administrators.len(),
            projects = index.project_admins.len(),
            milestones = index.milestone_projects.len(),
            "grant table loaded"
        );

        Ok(Self {
            index: Arc::new(index),
        })
    }

    /// Loads a JSON grant table from `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`FileSystem`] error if the file cannot be read and a
    /// [`Config`] error if it is not a valid grant table.
    ///
    /// [`FileSystem`]: crate::ErrorKind::FileSystem
    /// [`Config`]: crate::ErrorKind::Config
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            Error::file_system(format!("cannot read grants file {}", path.display()))
                .with_source(e)
        })?;

        let grants: AdminGrants = serde_json::from_slice(&bytes).map_err(|e| {
            Error::config(format!("invalid grants file {}", path.display())).with_source(e)
        })?;

        Self::new(grants)
    }

    fn is_global_admin(&self, user: &ActingUser) -> bool {
        user.is_administrator || self.index.administrators.contains(&user.account_id)
    }

    fn check_project(&self, user: &ActingUser, project_id: ProjectId) -> Result<bool, AuthError> {
        let Some(admins) = self.index.project_admins.get(&project_id) else {
            tracing::warn!(
                target: TRACING_TARGET_SERVICE,
                account_id = %user.account_id,
                project_id = %project_id,
                "project not found"
            );
            return Err(AuthError::not_found("Project"));
        };

        let granted = admins.contains(&user.account_id);
        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            account_id = %user.account_id,
            project_id = %project_id,
            granted,
            "project admin lookup"
        );

        Ok(granted)
    }
}

#[async_trait]
impl AuthService for MemoryAuthService {
    async fn has_milestone_admin(
        &self,
        user: &ActingUser,
        milestone_id: MilestoneId,
    ) -> Result<bool, AuthError> {
        if self.is_global_admin(user) {
            tracing::debug!(
                target: TRACING_TARGET_SERVICE,
                account_id = %user.account_id,
                milestone_id = %milestone_id,
                "milestone admin granted: global administrator"
            );
            return Ok(true);
        }

        let Some(&project_id) = self.index.milestone_projects.get(&milestone_id) else {
            tracing::warn!(
                target: TRACING_TARGET_SERVICE,
                account_id = %user.account_id,
                milestone_id = %milestone_id,
                "milestone not found"
            );
            return Err(AuthError::not_found("Milestone"));
        };

        self.check_project(user, project_id)
    }

    async fn has_project_admin(
        &self,
        user: &ActingUser,
        project_id: ProjectId,
    ) -> Result<bool, AuthError> {
        if self.is_global_admin(user) {
            tracing::debug!(
                target: TRACING_TARGET_SERVICE,
                account_id = %user.account_id,
                project_id = %project_id,
                "project admin granted: global administrator"
            );
            return Ok(true);
        }

        self.check_project(user, project_id)
    }
}
