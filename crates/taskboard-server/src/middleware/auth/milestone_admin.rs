//! Milestone admin access gate.
//!
//! Decides whether a request may administer a milestone, falling back to the
//! parent project when only a project id is known. The decision is made once
//! per request and is either [`GateDecision::Proceed`] or a single
//! [`Rejection`]; a denial or failure on one branch never retries the other.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use super::AdminTarget;
use super::target::{ID_PARAM, MILESTONE_ID_PARAM, PROJECT_ID_PARAM};
use crate::extract::{ActingUser, DEFAULT_BODY_LIMIT, RequestParams};
use crate::handler::{ErrorDetail, ErrorFormatter, JsonErrorFormatter};
use crate::service::{AuthError, AuthOutcome, AuthService, GateConfig};
use crate::{Result, TRACING_TARGET_AUTHORIZATION};

const CANNOT_IDENTIFY_MILESTONE: &str = "Cannot identify milestone.";
// Shared by the milestone and project branches.
const INSUFFICIENT_RIGHTS: &str = "Insufficient rights to admin milestone.";
const AUTHENTICATION_REQUIRED: &str = "Authentication required.";

/// A terminal rejection: the status and what to tell the formatter.
#[derive(Debug)]
pub struct Rejection {
    pub status: StatusCode,
    pub detail: ErrorDetail,
}

impl Rejection {
    fn new(status: StatusCode, detail: impl Into<ErrorDetail>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

/// Outcome of one gate evaluation.
#[derive(Debug)]
#[must_use = "a gate decision must either proceed or reject"]
pub enum GateDecision {
    /// Authorized; continue down the chain.
    Proceed,
    /// Stop here with a response.
    Reject(Rejection),
}

impl GateDecision {
    /// Returns `true` for [`GateDecision::Proceed`].
    #[inline]
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed)
    }
}

/// Admin access gate for milestone routes.
///
/// Cheap to clone; collaborators are shared behind [`Arc`]s. Use it through
/// [`require_milestone_admin`] or [`RouterExt::with_milestone_admin`].
///
/// [`RouterExt::with_milestone_admin`]: crate::middleware::RouterExt::with_milestone_admin
#[derive(Clone)]
pub struct MilestoneAdminGate {
    auth_service: Arc<dyn AuthService>,
    error_formatter: Arc<dyn ErrorFormatter>,
    check_timeout: Option<Duration>,
    body_limit: usize,
}

impl MilestoneAdminGate {
    /// Creates a gate with the default formatter and timeout.
    pub fn new(auth_service: impl AuthService + 'static) -> Self {
        Self::from_shared(Arc::new(auth_service))
    }

    /// Creates a gate around an already shared authorization service.
    pub fn from_shared(auth_service: Arc<dyn AuthService>) -> Self {
        Self {
            auth_service,
            error_formatter: Arc::new(JsonErrorFormatter::default()),
            check_timeout: GateConfig::default().check_timeout(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Creates a gate using the limits from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`Config`] error if `config` does not validate.
    ///
    /// [`Config`]: crate::ErrorKind::Config
    pub fn from_config(
        config: &GateConfig,
        auth_service: Arc<dyn AuthService>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self::from_shared(auth_service)
            .with_check_timeout(config.check_timeout())
            .with_body_limit(config.body_limit_bytes))
    }

    /// Replaces the error formatter.
    pub fn with_error_formatter(mut self, error_formatter: impl ErrorFormatter + 'static) -> Self {
        self.error_formatter = Arc::new(error_formatter);
        self
    }

    /// Sets or disables the bound on a single authorization check.
    pub fn with_check_timeout(mut self, check_timeout: Option<Duration>) -> Self {
        self.check_timeout = check_timeout;
        self
    }

    /// Sets the largest JSON or urlencoded body read for parameters.
    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    /// Returns the bound on a single authorization check.
    #[inline]
    pub fn check_timeout(&self) -> Option<Duration> {
        self.check_timeout
    }

    /// Returns the largest body read for parameters.
    #[inline]
    pub fn body_limit(&self) -> usize {
        self.body_limit
    }

    /// Decides whether `user` may administer the target named by `params`.
    ///
    /// Makes at most one call to the authorization service, and none when
    /// the target cannot be resolved or no user is present.
    pub async fn evaluate(&self, user: Option<&ActingUser>, params: &RequestParams) -> GateDecision {
        tracing::debug!(
            target: TRACING_TARGET_AUTHORIZATION,
            id = params.param(ID_PARAM),
            milestone_id = params.param(MILESTONE_ID_PARAM),
            project_id = params.param(PROJECT_ID_PARAM),
            "checking milestone admin rights"
        );

        let target = AdminTarget::resolve(params);
        let check = match (target, user) {
            (AdminTarget::Unresolved, _) => {
                tracing::warn!(
                    target: TRACING_TARGET_AUTHORIZATION,
                    "access denied: cannot identify milestone"
                );
                return GateDecision::Reject(Rejection::new(
                    StatusCode::FORBIDDEN,
                    CANNOT_IDENTIFY_MILESTONE,
                ));
            }
            (_, None) => {
                tracing::warn!(
                    target: TRACING_TARGET_AUTHORIZATION,
                    admin_target = %target,
                    "access denied: no acting user"
                );
                return GateDecision::Reject(Rejection::new(
                    StatusCode::UNAUTHORIZED,
                    AUTHENTICATION_REQUIRED,
                ));
            }
            (AdminTarget::OutOfRange { .. }, Some(_)) => {
                tracing::warn!(
                    target: TRACING_TARGET_AUTHORIZATION,
                    admin_target = %target,
                    "access denied: identifier out of range"
                );
                return GateDecision::Reject(Rejection::new(
                    StatusCode::FORBIDDEN,
                    INSUFFICIENT_RIGHTS,
                ));
            }
            (AdminTarget::Milestone(milestone_id), Some(user)) => {
                self.auth_service.has_milestone_admin(user, milestone_id)
            }
            (AdminTarget::Project(project_id), Some(user)) => {
                self.auth_service.has_project_admin(user, project_id)
            }
        };

        match self.bounded(check).await {
            AuthOutcome::Granted => {
                tracing::debug!(
                    target: TRACING_TARGET_AUTHORIZATION,
                    admin_target = %target,
                    "access granted"
                );
                GateDecision::Proceed
            }
            AuthOutcome::Denied => {
                tracing::warn!(
                    target: TRACING_TARGET_AUTHORIZATION,
                    admin_target = %target,
                    "access denied: insufficient rights"
                );
                GateDecision::Reject(Rejection::new(StatusCode::FORBIDDEN, INSUFFICIENT_RIGHTS))
            }
            AuthOutcome::Failed(error) => {
                let status = error.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                tracing::warn!(
                    target: TRACING_TARGET_AUTHORIZATION,
                    admin_target = %target,
                    status = %status,
                    error = %error,
                    "authorization check failed"
                );
                GateDecision::Reject(Rejection::new(status, error))
            }
        }
    }

    /// Turns a rejection into the terminal response.
    pub fn reject(&self, rejection: Rejection, parts: &Parts) -> Response {
        self.error_formatter
            .make_error_response(rejection.status, rejection.detail, parts)
    }

    async fn bounded<F>(&self, check: F) -> AuthOutcome
    where
        F: Future<Output = Result<bool, AuthError>>,
    {
        let Some(limit) = self.check_timeout else {
            return check.await.into();
        };

        match tokio::time::timeout(limit, check).await {
            Ok(result) => result.into(),
            Err(_) => {
                tracing::error!(
                    target: TRACING_TARGET_AUTHORIZATION,
                    timeout_ms = limit.as_millis() as u64,
                    "authorization check timed out"
                );
                AuthOutcome::Failed(AuthError::timed_out(limit))
            }
        }
    }
}

impl fmt::Debug for MilestoneAdminGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MilestoneAdminGate")
            .field("check_timeout", &self.check_timeout)
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

/// Requires the acting user to administer the requested milestone or project.
///
/// The gate reads `milestoneId`, `id` and `projectId` from the matched route,
/// a JSON or urlencoded body and the query string, so layer it with
/// `route_layer` (see [`RouterExt::with_milestone_admin`]). A body it reads is
/// buffered and passed on unchanged. [`ActingUser`] must already be in the
/// request extensions.
///
/// [`RouterExt::with_milestone_admin`]: crate::middleware::RouterExt::with_milestone_admin
pub async fn require_milestone_admin(
    State(gate): State<MilestoneAdminGate>,
    user: Option<ActingUser>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let read = RequestParams::with_body(&mut parts, body, gate.body_limit()).await;
    let (params, body) = match read {
        Ok(read) => read,
        Err(error) => {
            tracing::warn!(
                target: TRACING_TARGET_AUTHORIZATION,
                error = %error,
                "access denied: request body rejected"
            );
            let rejection = Rejection::new(error.status(), error.to_string());
            return gate.reject(rejection, &parts);
        }
    };

    match gate.evaluate(user.as_ref(), &params).await {
        GateDecision::Proceed => next.run(Request::from_parts(parts, body)).await,
        GateDecision::Reject(rejection) => gate.reject(rejection, &parts),
    }
}
