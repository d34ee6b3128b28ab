//! Test doubles for the authorization service.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::extract::ActingUser;
use crate::service::{AuthError, AuthService, MilestoneId, ProjectId};

/// How the fake answers a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Grant,
    Deny,
    Fail(Option<StatusCode>),
    Hang,
}

/// A check the fake received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Milestone(MilestoneId),
    Project(ProjectId),
}

/// [`AuthService`] replying from a script and recording every call.
#[derive(Debug)]
pub struct RecordingAuthService {
    milestone_reply: Reply,
    project_reply: Reply,
    calls: Mutex<Vec<Call>>,
}

impl RecordingAuthService {
    pub fn new(milestone_reply: Reply, project_reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            milestone_reply,
            project_reply,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(reply: Reply) -> Arc<Self> {
        Self::new(reply, reply)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer(&self, call: Call, reply: Reply) -> Result<bool, AuthError> {
        self.calls.lock().unwrap().push(call);

        match reply {
            Reply::Grant => Ok(true),
            Reply::Deny => Ok(false),
            Reply::Fail(status) => {
                let error = AuthError::new("policy lookup failed");
                Err(match status {
                    Some(status) => error.with_status(status),
                    None => error,
                })
            }
            Reply::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl AuthService for RecordingAuthService {
    async fn has_milestone_admin(
        &self,
        _user: &ActingUser,
        milestone_id: MilestoneId,
    ) -> Result<bool, AuthError> {
        self.answer(Call::Milestone(milestone_id), self.milestone_reply)
            .await
    }

    async fn has_project_admin(
        &self,
        _user: &ActingUser,
        project_id: ProjectId,
    ) -> Result<bool, AuthError> {
        self.answer(Call::Project(project_id), self.project_reply)
            .await
    }
}
