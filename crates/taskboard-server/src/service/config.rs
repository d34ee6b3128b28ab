//! Gate configuration.

use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::extract::DEFAULT_BODY_LIMIT;
use crate::service::MemoryAuthService;
use crate::{Error, Result};

/// Default upper bound on a single authorization check.
pub const DEFAULT_CHECK_TIMEOUT_MS: u64 = 5_000;

/// Largest accepted check timeout.
pub const MAX_CHECK_TIMEOUT_MS: u64 = 60_000;

/// Configuration of the admin access gate.
///
/// # Environment Variables
///
/// With the `config` feature enabled:
/// - `GATE_CHECK_TIMEOUT_MS` - Check timeout in milliseconds, `0` disables (default: 5000)
/// - `GATE_BODY_LIMIT_BYTES` - Largest JSON or form body read for parameters (default: 2 MiB)
/// - `GATE_GRANTS_FILE` - JSON grant table for the in-memory authorization service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct GateConfig {
    /// Maximum time in milliseconds an authorization check may take.
    ///
    /// A check that does not finish in time is answered with `504`.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "gate-check-timeout-ms",
            env = "GATE_CHECK_TIMEOUT_MS",
            default_value_t = DEFAULT_CHECK_TIMEOUT_MS
        )
    )]
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,

    /// Largest JSON or urlencoded request body the gate buffers.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "gate-body-limit-bytes",
            env = "GATE_BODY_LIMIT_BYTES",
            default_value_t = DEFAULT_BODY_LIMIT
        )
    )]
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,

    /// Path to a JSON grant table for [`MemoryAuthService`].
    #[cfg_attr(feature = "config", arg(long = "gate-grants-file", env = "GATE_GRANTS_FILE"))]
    #[serde(default)]
    pub grants_file: Option<PathBuf>,
}

fn default_check_timeout_ms() -> u64 {
    DEFAULT_CHECK_TIMEOUT_MS
}

fn default_body_limit_bytes() -> usize {
    DEFAULT_BODY_LIMIT
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            check_timeout_ms: DEFAULT_CHECK_TIMEOUT_MS,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
            grants_file: None,
        }
    }
}

impl GateConfig {
    /// Sets the check timeout in milliseconds.
    pub fn with_check_timeout_ms(mut self, check_timeout_ms: u64) -> Self {
        self.check_timeout_ms = check_timeout_ms;
        self
    }

    /// Sets the body limit in bytes.
    pub fn with_body_limit_bytes(mut self, body_limit_bytes: usize) -> Self {
        self.body_limit_bytes = body_limit_bytes;
        self
    }

    /// Sets the grant table path.
    pub fn with_grants_file(mut self, grants_file: impl Into<PathBuf>) -> Self {
        self.grants_file = Some(grants_file.into());
        self
    }

    /// Returns the check timeout, or `None` when disabled.
    pub fn check_timeout(&self) -> Option<Duration> {
        (self.check_timeout_ms > 0).then(|| Duration::from_millis(self.check_timeout_ms))
    }

    /// Validates configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.check_timeout_ms > MAX_CHECK_TIMEOUT_MS {
            return Err(Error::config(format!(
                "gate check timeout cannot exceed {MAX_CHECK_TIMEOUT_MS} ms"
            )));
        }

        if self.body_limit_bytes == 0 {
            return Err(Error::config("gate body limit must be greater than zero"));
        }

        Ok(())
    }

    /// Builds the in-memory authorization service.
    ///
    /// Without a grants file the service knows no projects, so only global
    /// administrators are granted.
    ///
    /// # Errors
    ///
    /// Fails if the configuration does not validate or the grants file
    /// cannot be loaded.
    pub async fn load_auth_service(&self) -> Result<MemoryAuthService> {
        self.validate()?;

        match &self.grants_file {
            Some(path) => MemoryAuthService::from_file(path).await,
            None => Ok(MemoryAuthService::default()),
        }
    }
}
