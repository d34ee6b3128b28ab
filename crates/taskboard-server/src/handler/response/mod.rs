//! Response types.

mod errors;

pub use errors::ErrorResponse;
