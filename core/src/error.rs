//! Error types for the VesselFinder API client.
//!
//! # Design
//! A single sum type stands in for a failure hierarchy. `Transport` is the
//! general kind; `Argument` and `Request` are the two specific kinds callers
//! usually want to tell apart. Match one variant to handle it narrowly, or
//! treat any `ApiError` (or use [`ApiError::is_api_failure`]) to catch all
//! three at once. `Configuration` sits outside that family: it reports misuse
//! of the client itself, not a failed API call.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by the client, its builders and its transports.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Caller input failed a field or cross-field rule. Raised before any I/O.
    #[error("{0}")]
    Argument(String),

    /// The service reported a business failure (status 409 or an
    /// `X-API-Error` header). Carries the server's message verbatim.
    #[error("{0}")]
    Request(String),

    /// Network failure, or a response body that could not be decoded.
    #[error("{0}")]
    Transport(String),

    /// The client was used in a way its configuration does not allow.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::Request(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// True for the general failure kind and both of its specializations.
    pub fn is_api_failure(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }

    /// The bare message, without the kind prefix `Display` may add.
    pub fn message(&self) -> &str {
        match self {
            Self::Argument(msg)
            | Self::Request(msg)
            | Self::Transport(msg)
            | Self::Configuration(msg) => msg,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Transport(format!("malformed response body: {err}"))
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        Self::Configuration(format!("invalid endpoint URL: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_server_message_for_request_errors() {
        let err = ApiError::request("limit exceeded");
        assert_eq!(err.to_string(), "limit exceeded");
    }

    #[test]
    fn configuration_is_outside_the_failure_family() {
        assert!(ApiError::argument("x").is_api_failure());
        assert!(ApiError::request("x").is_api_failure());
        assert!(ApiError::transport("x").is_api_failure());
        assert!(!ApiError::configuration("x").is_api_failure());
    }

    #[test]
    fn json_errors_become_transport_errors() {
        let err: ApiError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(err.message().starts_with("malformed response body"));
    }

    #[test]
    fn message_strips_kind_prefix() {
        let err = ApiError::configuration("retention disabled");
        assert_eq!(err.message(), "retention disabled");
        assert_eq!(err.to_string(), "configuration error: retention disabled");
    }
}
