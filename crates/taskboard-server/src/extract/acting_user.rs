//! Identity of the user a request acts on behalf of.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handler::ErrorResponse;

/// The authenticated user a request acts for.
///
/// Authentication middleware earlier in the chain inserts this value into the
/// request extensions. The admin access gate treats it as opaque and only
/// forwards it to the [`AuthService`].
///
/// [`AuthService`]: crate::service::AuthService
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActingUser {
    /// Account identifier of the user.
    pub account_id: Uuid,
    /// Whether the account holds global administrator privileges.
    #[serde(default)]
    pub is_administrator: bool,
}

impl ActingUser {
    /// Creates a regular (non-administrator) user.
    #[inline]
    pub const fn new(account_id: Uuid) -> Self {
        Self {
            account_id,
            is_administrator: false,
        }
    }

    /// Creates a global administrator.
    #[inline]
    pub const fn administrator(account_id: Uuid) -> Self {
        Self {
            account_id,
            is_administrator: true,
        }
    }
}

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ErrorResponse<'static>;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ActingUser>()
            .cloned()
            .ok_or(ErrorResponse::UNAUTHORIZED)
    }
}

impl<S> OptionalFromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<ActingUser>().cloned())
    }
}
