//! Extension traits for `axum::Router` to apply the gate.

use axum::Router;
use axum::middleware::from_fn_with_state;

use crate::middleware::{MilestoneAdminGate, require_milestone_admin};

/// Extension trait for `axum::`[`Router`] for layering the admin gate.
pub trait RouterExt<S> {
    /// Guards every route added so far with [`require_milestone_admin`].
    ///
    /// Applied as a `route_layer`, so it only runs for matched routes and sees
    /// their path parameters. Routes added afterwards are not guarded, and
    /// unmatched paths still fall through to `404`.
    fn with_milestone_admin(self, gate: MilestoneAdminGate) -> Self;
}

impl<S> RouterExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_milestone_admin(self, gate: MilestoneAdminGate) -> Self {
        self.route_layer(from_fn_with_state(gate, require_milestone_admin))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Extension;
    use axum::http::StatusCode;
    use axum::routing::{get, post, put};
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use uuid::Uuid;

    use super::*;
    use crate::extract::ActingUser;
    use crate::middleware::auth::testing::{Call, RecordingAuthService, Reply};
    use crate::service::{
        AdminGrants, MemoryAuthService, MilestoneId, ProjectGrants, ProjectId,
    };

    struct Harness {
        server: TestServer,
        hits: Arc<AtomicUsize>,
    }

    impl Harness {
        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    fn harness(gate: MilestoneAdminGate, user: Option<ActingUser>) -> anyhow::Result<Harness> {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler = {
            let hits = hits.clone();
            move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    "updated"
                }
            }
        };

        let router = Router::new()
            .route("/milestones", put(handler.clone()).post(handler.clone()))
            .route("/milestones/{milestoneId}", put(handler.clone()))
            .route("/projects/{projectId}/milestones", post(handler))
            .with_milestone_admin(gate)
            .route("/health", get(|| async { "ok" }));

        let router = match user {
            Some(user) => router.layer(Extension(user)),
            None => router,
        };

        Ok(Harness {
            server: TestServer::new(router)?,
            hits,
        })
    }

    fn acting_user() -> Option<ActingUser> {
        Some(ActingUser::new(Uuid::new_v4()))
    }

    #[tokio::test]
    async fn granted_request_reaches_handler() -> anyhow::Result<()> {
        let service = RecordingAuthService::replying(Reply::Grant);
        let harness = harness(MilestoneAdminGate::from_shared(service.clone()), acting_user())?;

        let response = harness.server.put("/milestones/42").await;

        response.assert_status_ok();
        assert_eq!(response.text(), "updated");
        assert_eq!(harness.hits(), 1);
        assert_eq!(service.calls(), vec![Call::Milestone(MilestoneId(42))]);
        Ok(())
    }

    #[tokio::test]
    async fn denied_request_never_reaches_handler() -> anyhow::Result<()> {
        let service = RecordingAuthService::replying(Reply::Deny);
        let harness = harness(MilestoneAdminGate::from_shared(service.clone()), acting_user())?;

        let response = harness
            .server
            .put("/milestones")
            .add_query_param("id", "7")
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        let body = response.json::<Value>();
        assert_eq!(body["name"], "forbidden");
        assert_eq!(body["message"], "Insufficient rights to admin milestone.");
        assert_eq!(body["resource"], "milestone");
        assert_eq!(harness.hits(), 0);
        assert_eq!(service.calls(), vec![Call::Milestone(MilestoneId(7))]);
        Ok(())
    }

    #[tokio::test]
    async fn project_route_uses_project_check() -> anyhow::Result<()> {
        let service = RecordingAuthService::replying(Reply::Grant);
        let harness = harness(MilestoneAdminGate::from_shared(service.clone()), acting_user())?;

        let response = harness.server.post("/projects/3/milestones").await;

        response.assert_status_ok();
        assert_eq!(harness.hits(), 1);
        assert_eq!(service.calls(), vec![Call::Project(ProjectId(3))]);
        Ok(())
    }

    #[tokio::test]
    async fn no_identifier_is_forbidden() -> anyhow::Result<()> {
        let service = RecordingAuthService::replying(Reply::Grant);
        let harness = harness(MilestoneAdminGate::from_shared(service.clone()), acting_user())?;

        let response = harness.server.put("/milestones").await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.json::<Value>()["message"], "Cannot identify milestone.");
        assert_eq!(harness.hits(), 0);
        assert!(service.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn service_failures_keep_their_status() -> anyhow::Result<()> {
        let service = RecordingAuthService::replying(Reply::Fail(Some(
            StatusCode::SERVICE_UNAVAILABLE,
        )));
        let harness = harness(MilestoneAdminGate::from_shared(service), acting_user())?;

        let response = harness.server.put("/milestones/9").await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body = response.json::<Value>();
        assert_eq!(body["name"], "service_unavailable");
        assert_eq!(body["message"], "policy lookup failed");
        assert_eq!(harness.hits(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn service_failures_default_to_500() -> anyhow::Result<()> {
        let service = RecordingAuthService::replying(Reply::Fail(None));
        let harness = harness(MilestoneAdminGate::from_shared(service), acting_user())?;

        let response = harness.server.put("/milestones/9").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.json::<Value>()["name"], "internal_server_error");
        Ok(())
    }

    #[tokio::test]
    async fn anonymous_request_is_unauthorized() -> anyhow::Result<()> {
        let service = RecordingAuthService::replying(Reply::Grant);
        let harness = harness(MilestoneAdminGate::from_shared(service.clone()), None)?;

        let response = harness.server.put("/milestones/9").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(harness.hits(), 0);
        assert!(service.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn routes_added_later_are_not_guarded() -> anyhow::Result<()> {
        let service = RecordingAuthService::replying(Reply::Deny);
        let harness = harness(MilestoneAdminGate::from_shared(service.clone()), None)?;

        harness.server.get("/health").await.assert_status_ok();
        harness
            .server
            .get("/unknown")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        assert!(service.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn overflowing_path_id_is_not_retried_as_project() -> anyhow::Result<()> {
        let service = RecordingAuthService::new(Reply::Deny, Reply::Grant);
        let harness = harness(MilestoneAdminGate::from_shared(service.clone()), acting_user())?;

        let response = harness
            .server
            .put("/milestones/9223372036854775808")
            .add_query_param("projectId", "3")
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(
            response.json::<Value>()["message"],
            "Insufficient rights to admin milestone."
        );
        assert_eq!(harness.hits(), 0);
        assert!(service.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn project_id_from_json_body() -> anyhow::Result<()> {
        let service = RecordingAuthService::replying(Reply::Grant);
        let harness = harness(MilestoneAdminGate::from_shared(service.clone()), acting_user())?;

        let response = harness
            .server
            .post("/milestones")
            .json(&json!({ "projectId": 3, "title": "M1" }))
            .await;

        response.assert_status_ok();
        assert_eq!(harness.hits(), 1);
        assert_eq!(service.calls(), vec![Call::Project(ProjectId(3))]);
        Ok(())
    }

    #[tokio::test]
    async fn project_id_from_form_body() -> anyhow::Result<()> {
        let service = RecordingAuthService::replying(Reply::Deny);
        let harness = harness(MilestoneAdminGate::from_shared(service.clone()), acting_user())?;

        let response = harness
            .server
            .post("/milestones")
            .form(&[("projectId", "4"), ("title", "M2")])
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(harness.hits(), 0);
        assert_eq!(service.calls(), vec![Call::Project(ProjectId(4))]);
        Ok(())
    }

    #[tokio::test]
    async fn handler_still_receives_the_body() -> anyhow::Result<()> {
        let service = RecordingAuthService::replying(Reply::Grant);
        let router = Router::new()
            .route(
                "/milestones",
                post(|body: axum::Json<Value>| async move { body.0["title"].to_string() }),
            )
            .with_milestone_admin(MilestoneAdminGate::from_shared(service.clone()))
            .layer(Extension(ActingUser::new(Uuid::new_v4())));
        let server = TestServer::new(router)?;

        let response = server
            .post("/milestones")
            .json(&json!({ "projectId": 3, "title": "M1" }))
            .await;

        response.assert_status_ok();
        assert_eq!(response.text(), r#""M1""#);
        assert_eq!(service.calls(), vec![Call::Project(ProjectId(3))]);
        Ok(())
    }

    #[tokio::test]
    async fn oversized_body_is_refused() -> anyhow::Result<()> {
        let service = RecordingAuthService::replying(Reply::Grant);
        let gate = MilestoneAdminGate::from_shared(service.clone()).with_body_limit(16);
        let harness = harness(gate, acting_user())?;

        let response = harness
            .server
            .post("/milestones")
            .json(&json!({ "projectId": 3, "title": "a rather long milestone title" }))
            .await;

        assert!(response.status_code().is_client_error());
        assert_eq!(harness.hits(), 0);
        assert!(service.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn memory_service_end_to_end() -> anyhow::Result<()> {
        let owner = ActingUser::new(Uuid::new_v4());
        let grants = AdminGrants {
            projects: vec![
                ProjectGrants::new(ProjectId(3))
                    .with_admin(owner.account_id)
                    .with_milestone(MilestoneId(42)),
            ],
            ..AdminGrants::default()
        };
        let gate = MilestoneAdminGate::new(MemoryAuthService::new(grants)?);

        let owner_view = harness(gate.clone(), Some(owner))?;
        owner_view.server.put("/milestones/42").await.assert_status_ok();
        owner_view
            .server
            .put("/milestones/43")
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let stranger_view = harness(gate, acting_user())?;
        stranger_view
            .server
            .post("/projects/3/milestones")
            .await
            .assert_status(StatusCode::FORBIDDEN);
        Ok(())
    }
}
