#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;

pub mod extract;
pub mod handler;
pub mod middleware;
pub mod service;

pub use crate::error::{BoxedError, Error, ErrorKind, Result};

// Tracing target constants for consistent logging.
pub const TRACING_TARGET_AUTHORIZATION: &str = "taskboard_server::authorization";
pub const TRACING_TARGET_EXTRACT: &str = "taskboard_server::extract";
pub const TRACING_TARGET_SERVICE: &str = "taskboard_server::service";
pub const TRACING_TARGET_RESPONSE: &str = "taskboard_server::response";
