//! Error response formatting.

use std::borrow::Cow;
use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use super::ErrorResponse;
use crate::TRACING_TARGET_RESPONSE;
use crate::service::AuthError;

/// What a rejection carries besides its status.
#[derive(Debug)]
pub enum ErrorDetail {
    /// Fixed, client-facing message.
    Message(Cow<'static, str>),
    /// Failure reported by the authorization service, passed through as-is.
    Failure(AuthError),
}

impl ErrorDetail {
    /// Returns the client-facing message.
    pub fn message(&self) -> &str {
        match self {
            Self::Message(message) => message.as_ref(),
            Self::Failure(error) => error.message(),
        }
    }

    /// Returns the chain of underlying causes, outermost first.
    ///
    /// Always `None` for [`ErrorDetail::Message`].
    pub fn causes(&self) -> Option<String> {
        let Self::Failure(error) = self else {
            return None;
        };

        let mut causes = Vec::new();
        let mut source = StdError::source(error);
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        (!causes.is_empty()).then(|| causes.join(": "))
    }
}

impl From<&'static str> for ErrorDetail {
    #[inline]
    fn from(message: &'static str) -> Self {
        Self::Message(Cow::Borrowed(message))
    }
}

impl From<String> for ErrorDetail {
    #[inline]
    fn from(message: String) -> Self {
        Self::Message(Cow::Owned(message))
    }
}

impl From<AuthError> for ErrorDetail {
    #[inline]
    fn from(error: AuthError) -> Self {
        Self::Failure(error)
    }
}

/// Writes the terminal response for a rejected request.
///
/// Implementations receive the request head so they can log or shape the
/// response per route; the body has already been dropped.
pub trait ErrorFormatter: Send + Sync {
    /// Builds the rejection response for `status` and `detail`.
    fn make_error_response(&self, status: StatusCode, detail: ErrorDetail, parts: &Parts)
    -> Response;
}

/// Default [`ErrorFormatter`] rendering an [`ErrorResponse`] JSON body.
#[derive(Debug, Clone)]
pub struct JsonErrorFormatter {
    resource: Cow<'static, str>,
}

impl JsonErrorFormatter {
    /// Creates a formatter that tags every response with `resource`.
    pub fn new(resource: impl Into<Cow<'static, str>>) -> Self {
        Self {
            resource: resource.into(),
        }
    }

    /// Returns the resource name attached to responses.
    #[inline]
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl Default for JsonErrorFormatter {
    fn default() -> Self {
        Self::new("milestone")
    }
}

impl ErrorFormatter for JsonErrorFormatter {
    fn make_error_response(
        &self,
        status: StatusCode,
        detail: ErrorDetail,
        parts: &Parts,
    ) -> Response {
        tracing::debug!(
            target: TRACING_TARGET_RESPONSE,
            method = %parts.method,
            uri = %parts.uri,
            status = %status,
            "formatting rejection"
        );

        let mut response = ErrorResponse::from_status(status)
            .with_message(detail.message().to_owned())
            .with_resource(self.resource.clone());

        if let Some(causes) = detail.causes() {
            response = response.with_context(causes);
        }

        response.into_response()
    }
}
