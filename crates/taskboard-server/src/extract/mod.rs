//! Request extractors used by the admin access gate.
//!
//! # Key Types
//!
//! - [`RequestParams`] - Route, body and query parameters merged into one lookup
//! - [`ActingUser`] - Identity placed into request extensions by authentication

mod acting_user;
mod params;

pub use self::acting_user::ActingUser;
pub use self::params::{BodyRejection, DEFAULT_BODY_LIMIT, ParsedInt, RequestParams, parse_int};
