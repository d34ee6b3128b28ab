//! Resolution of the resource a request wants to administer.

use derive_more::Display;

use crate::extract::{ParsedInt, RequestParams};
use crate::service::{MilestoneId, ProjectId};

/// Generic identifier parameter, read as a milestone id.
pub const ID_PARAM: &str = "id";
/// Explicit milestone identifier parameter.
pub const MILESTONE_ID_PARAM: &str = "milestoneId";
/// Parent project identifier parameter.
pub const PROJECT_ID_PARAM: &str = "projectId";

/// The single resource whose admin rights a request needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum AdminTarget {
    /// Milestone-level check.
    #[display("milestone {_0}")]
    Milestone(MilestoneId),
    /// Project-level check.
    #[display("project {_0}")]
    Project(ProjectId),
    /// An identifier was supplied but does not fit any known id.
    ///
    /// It still pins its branch: a `milestoneId` out of range never falls
    /// back to `id` or `projectId`.
    #[display("{param} out of range")]
    OutOfRange {
        /// Name of the parameter that was out of range.
        param: &'static str,
    },
    /// No usable identifier was supplied.
    #[display("unresolved")]
    Unresolved,
}

impl AdminTarget {
    /// Picks the target from request parameters.
    ///
    /// `milestoneId` wins over `id`, and either wins over `projectId`.
    /// Parameters without any digits count as absent, so a garbage
    /// `milestoneId` falls back to `id` rather than failing. Digits that
    /// overflow resolve to [`AdminTarget::OutOfRange`].
    pub fn resolve(params: &RequestParams) -> Self {
        let milestone = params
            .int_param(MILESTONE_ID_PARAM)
            .map(|parsed| (MILESTONE_ID_PARAM, parsed))
            .or_else(|| params.int_param(ID_PARAM).map(|parsed| (ID_PARAM, parsed)));

        match milestone {
            Some((_, ParsedInt::Value(id))) => Self::Milestone(MilestoneId(id)),
            Some((param, ParsedInt::OutOfRange)) => Self::OutOfRange { param },
            None => match params.int_param(PROJECT_ID_PARAM) {
                Some(ParsedInt::Value(id)) => Self::Project(ProjectId(id)),
                Some(ParsedInt::OutOfRange) => Self::OutOfRange {
                    param: PROJECT_ID_PARAM,
                },
                None => Self::Unresolved,
            },
        }
    }
}
