//! Middleware for `axum::Router`.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use axum::Router;
//! use taskboard_server::middleware::{MilestoneAdminGate, RouterExt};
//! use taskboard_server::service::MemoryAuthService;
//!
//! let gate = MilestoneAdminGate::new(MemoryAuthService::default());
//! let app = Router::new()
//!     .route("/milestones/{milestoneId}", put(update_milestone))
//!     .with_milestone_admin(gate);
//! ```

mod auth;
mod extensions;

pub use auth::{
    AdminTarget, GateDecision, MilestoneAdminGate, Rejection, require_milestone_admin,
};
pub use extensions::RouterExt;
