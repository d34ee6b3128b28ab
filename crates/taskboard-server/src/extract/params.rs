//! Loosely-typed request parameters.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::body::{Body, to_bytes};
use axum::extract::{FromRequestParts, Query, RawPathParams};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::TRACING_TARGET_EXTRACT;

/// Default upper bound on a buffered request body.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Request parameters gathered from the matched route, the request body and
/// the query string.
///
/// Lookup precedence is route, then body, then query, so
/// `/milestones/{id}?id=9` resolves `id` from the path.
///
/// Extraction never fails on content: a malformed query string or body, or a
/// request without a matched route, simply contributes no entries.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams(HashMap<String, String>);

/// A parameter that carried a base-10 integer prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParsedInt {
    /// The prefix fits in an `i64`.
    Value(i64),
    /// Digits were present but do not fit in an `i64`.
    OutOfRange,
}

impl ParsedInt {
    /// Returns the value, if it fits.
    #[inline]
    pub fn value(self) -> Option<i64> {
        match self {
            Self::Value(value) => Some(value),
            Self::OutOfRange => None,
        }
    }
}

/// Failure to buffer a request body for parameter lookup.
#[derive(Debug, thiserror::Error)]
pub enum BodyRejection {
    /// The declared length exceeds the limit.
    #[error("Request body is too large.")]
    TooLarge {
        /// Limit that was exceeded, in bytes.
        limit: usize,
    },
    /// The body stream failed or exceeded the limit while reading.
    #[error("Request body could not be read.")]
    Unreadable(#[source] axum::Error),
}

impl BodyRejection {
    /// Returns the HTTP status for the rejection.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unreadable(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl RequestParams {
    /// Creates an empty parameter set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a parameter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Returns the raw value of the named parameter.
    #[inline]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns the named parameter read as a base-10 integer.
    ///
    /// See [`parse_int`] for the accepted forms.
    #[inline]
    pub fn int_param(&self, name: &str) -> Option<ParsedInt> {
        self.param(name).and_then(parse_int)
    }

    /// Collects parameters from the request head and a JSON or urlencoded body.
    ///
    /// Bodies of other content types are returned untouched and never read.
    /// A parseable body is buffered up to `body_limit` bytes and handed back
    /// as a fresh [`Body`] so the next handler still sees it.
    ///
    /// # Errors
    ///
    /// Returns [`BodyRejection`] if the body is larger than `body_limit` or
    /// cannot be read.
    pub async fn with_body(
        parts: &mut Parts,
        body: Body,
        body_limit: usize,
    ) -> Result<(Self, Body), BodyRejection> {
        let Some(format) = BodyFormat::of(&parts.headers) else {
            let params = Self::collect(parts, &(), HashMap::new()).await;
            return Ok((params, body));
        };

        if declared_length(&parts.headers).is_some_and(|length| length > body_limit) {
            return Err(BodyRejection::TooLarge { limit: body_limit });
        }

        let bytes = to_bytes(body, body_limit)
            .await
            .map_err(BodyRejection::Unreadable)?;

        let fields = format.parse(&bytes);
        let params = Self::collect(parts, &(), fields).await;
        Ok((params, Body::from(bytes)))
    }

    async fn collect<S>(parts: &mut Parts, state: &S, body: HashMap<String, String>) -> Self
    where
        S: Send + Sync,
    {
        let mut params = HashMap::new();

        if let Ok(Query(query)) =
            Query::<HashMap<String, String>>::from_request_parts(parts, state).await
        {
            params.extend(query);
        }

        params.extend(body);

        if let Ok(path) = RawPathParams::from_request_parts(parts, state).await {
            params.extend(
                path.iter()
                    .map(|(name, value)| (name.to_owned(), value.to_owned())),
            );
        }

        Self(params)
    }
}

impl<K, V> FromIterator<(K, V)> for RequestParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// Route and query parameters only; the body is left alone.
impl<S> FromRequestParts<S> for RequestParams
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::collect(parts, state, HashMap::new()).await)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFormat {
    Json,
    Form,
}

impl BodyFormat {
    fn of(headers: &HeaderMap) -> Option<Self> {
        let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/x-www-form-urlencoded" {
            Some(Self::Form)
        } else if essence == "application/json" || essence.ends_with("+json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    fn parse(self, bytes: &[u8]) -> HashMap<String, String> {
        if bytes.is_empty() {
            return HashMap::new();
        }

        match self {
            Self::Json => match serde_json::from_slice::<serde_json::Map<String, Value>>(bytes) {
                Ok(object) => object
                    .into_iter()
                    .filter_map(|(name, value)| scalar(value).map(|value| (name, value)))
                    .collect(),
                Err(error) => {
                    tracing::debug!(
                        target: TRACING_TARGET_EXTRACT,
                        error = %error,
                        "ignoring body that is not a JSON object"
                    );
                    HashMap::new()
                }
            },
            Self::Form => match serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes) {
                Ok(pairs) => pairs.into_iter().collect(),
                Err(error) => {
                    tracing::debug!(
                        target: TRACING_TARGET_EXTRACT,
                        error = %error,
                        "ignoring malformed form body"
                    );
                    HashMap::new()
                }
            },
        }
    }
}

fn scalar(value: Value) -> Option<String> {
    match value {
        Value::String(value) => Some(value),
        Value::Number(value) => Some(value.to_string()),
        Value::Bool(value) => Some(value.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.parse().ok()
}

/// Reads a base-10 integer prefix, the way `parseInt(value, 10)` does.
///
/// Leading whitespace (including U+FEFF) and a single sign are accepted, and
/// anything after the first non-digit is ignored. Returns `None` only when no
/// digit is found; callers treat that as "not provided". A digit run that
/// does not fit in an `i64` is still a provided value and comes back as
/// [`ParsedInt::OutOfRange`].
pub fn parse_int(value: &str) -> Option<ParsedInt> {
    let trimmed = value.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    let magnitude = &rest[..digits];
    let parsed = if negative {
        format!("-{magnitude}").parse::<i64>()
    } else {
        magnitude.parse::<i64>()
    };

    Some(parsed.map_or(ParsedInt::OutOfRange, ParsedInt::Value))
}
