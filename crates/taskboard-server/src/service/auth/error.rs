use std::borrow::Cow;
use std::error::Error as StdError;
use std::time::Duration;

use axum::http::StatusCode;

use crate::BoxedError;

/// Failure of an authorization check.
///
/// Unlike a denial, this means the service could not answer. The optional
/// status overrides the `500` the gate otherwise responds with.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AuthError {
    message: Cow<'static, str>,
    status: Option<StatusCode>,
    #[source]
    source: Option<BoxedError>,
}

impl AuthError {
    /// Creates a new error without a status.
    #[inline]
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Creates an error for a resource the service does not know.
    pub fn not_found(resource: &str) -> Self {
        Self::new(format!("{resource} not found")).with_status(StatusCode::NOT_FOUND)
    }

    /// Creates an error for a backing service that cannot be reached.
    pub fn unavailable(service: &str) -> Self {
        Self::new(format!("{service} is unavailable")).with_status(StatusCode::SERVICE_UNAVAILABLE)
    }

    /// Creates an error for a check that did not complete in time.
    pub fn timed_out(timeout: Duration) -> Self {
        Self::new(format!(
            "Authorization check timed out after {} ms",
            timeout.as_millis()
        ))
        .with_status(StatusCode::GATEWAY_TIMEOUT)
    }

    /// Sets the HTTP status the rejection should use.
    #[inline]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches the underlying cause.
    #[inline]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the carried status, if any.
    #[inline]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

/// Result of a single authorization check.
#[derive(Debug)]
pub enum AuthOutcome {
    /// The right is held.
    Granted,
    /// The service answered and the right is not held.
    Denied,
    /// The service could not answer.
    Failed(AuthError),
}

impl AuthOutcome {
    /// Returns `true` for [`AuthOutcome::Granted`].
    #[inline]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

impl From<Result<bool, AuthError>> for AuthOutcome {
    fn from(result: Result<bool, AuthError>) -> Self {
        match result {
            Ok(true) => Self::Granted,
            Ok(false) => Self::Denied,
            Err(error) => Self::Failed(error),
        }
    }
}
