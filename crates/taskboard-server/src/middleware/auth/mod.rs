//! Authorization middleware.

mod milestone_admin;
mod target;
#[cfg(test)]
pub(crate) mod testing;

pub use milestone_admin::{GateDecision, MilestoneAdminGate, Rejection, require_milestone_admin};
pub use target::AdminTarget;
