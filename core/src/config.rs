//! Client configuration.
//!
//! Defaults follow the service's published client behaviour: error-mode off,
//! last-info retention on, the public endpoint.

use std::env;
use std::fmt;

use crate::error::{ApiError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.vesselfinder.com";

pub const ENV_USERKEY: &str = "VESSELFINDER_USERKEY";
pub const ENV_ERRORMODE: &str = "VESSELFINDER_ERRORMODE";
pub const ENV_SAVE_LAST_INFO: &str = "VESSELFINDER_SAVE_LAST_INFO";
pub const ENV_ENDPOINT: &str = "VESSELFINDER_ENDPOINT";

/// The API key sent as `userkey`. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(String);

impl Credentials {
    pub fn new(userkey: impl Into<String>) -> Self {
        Self(userkey.into())
    }

    pub fn userkey(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub credentials: Credentials,
    /// Ask the service to report business errors as HTTP 409.
    pub error_mode: bool,
    /// Keep the last response's `X-API-*` headers for [`last_info`].
    ///
    /// [`last_info`]: crate::ApiClient::last_info
    pub save_last_info: bool,
    pub endpoint: String,
}

impl ClientConfig {
    pub fn new(userkey: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(userkey),
            error_mode: false,
            save_last_info: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_error_mode(mut self, enabled: bool) -> Self {
        self.error_mode = enabled;
        self
    }

    pub fn with_save_last_info(mut self, enabled: bool) -> Self {
        self.save_last_info = enabled;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Read the configuration from `VESSELFINDER_*` environment variables.
    /// Only the userkey is required.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let userkey = lookup(ENV_USERKEY)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ApiError::configuration(format!("{ENV_USERKEY} is not set")))?;

        let mut config = Self::new(userkey);
        if let Some(raw) = lookup(ENV_ERRORMODE) {
            config.error_mode = parse_flag(ENV_ERRORMODE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SAVE_LAST_INFO) {
            config.save_last_info = parse_flag(ENV_SAVE_LAST_INFO, &raw)?;
        }
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            config.endpoint = endpoint;
        }
        Ok(config)
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ApiError::configuration(format!(
            "{name} must be a boolean flag, got {other:?}"
        ))),
    }
}
