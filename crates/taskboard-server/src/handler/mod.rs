//! Response-side collaborators of the gate.
//!
//! The gate never builds HTTP bodies itself. It hands a status and an
//! [`ErrorDetail`] to an [`ErrorFormatter`], which by default renders an
//! [`ErrorResponse`] as JSON.

mod formatter;
mod response;

pub use self::formatter::{ErrorDetail, ErrorFormatter, JsonErrorFormatter};
pub use self::response::ErrorResponse;
