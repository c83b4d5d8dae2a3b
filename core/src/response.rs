//! Response classification and decoding.
//!
//! # Design
//! Every transport result is reduced to a [`ResponseEnvelope`] first: status,
//! the service's proprietary `X-API-*` headers under normalized names, and
//! the raw body. Classification then runs in a fixed order (409 status,
//! `error` header, empty body, format-specific decode) so one response always
//! maps to exactly one outcome.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::http::HttpResponse;
use crate::types::Format;

/// Prefix of the service's proprietary response headers, matched
/// case-insensitively.
pub const HEADER_PREFIX: &str = "x-api-";

/// Status the service uses for business errors in error-mode.
pub const CONFLICT_STATUS: u16 = 409;

/// Proprietary headers with the prefix stripped, lower-cased, `-` → `_`.
pub type ApiHeaders = BTreeMap<String, String>;

/// Decoded outcome of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Parsed JSON body.
    Json(Value),
    /// Raw XML text, returned unparsed when `format=xml` was requested.
    Xml(String),
    /// The service answered with an empty body. `message` is the operation's
    /// placeholder, or empty when it declares none.
    Success { message: String },
}

impl ApiResponse {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiResponse::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_xml(&self) -> Option<&str> {
        match self {
            ApiResponse::Xml(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_success_marker(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }

    /// Collapse into one JSON value. Success markers become
    /// `{"success": "<message>"}`; XML becomes a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            ApiResponse::Json(value) => value,
            ApiResponse::Xml(text) => Value::String(text),
            ApiResponse::Success { message } => serde_json::json!({ "success": message }),
        }
    }
}

/// One response, reduced to what classification needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: ApiHeaders,
    pub body: String,
    pub format: Format,
}

impl ResponseEnvelope {
    pub fn from_http(response: HttpResponse, format: Format) -> Self {
        Self {
            status: response.status,
            headers: extract_api_headers(&response.headers),
            body: response.body,
            format,
        }
    }

    /// Classify the response. `placeholder` is the message reported for an
    /// empty body.
    pub fn into_result(self, placeholder: Option<&str>) -> Result<ApiResponse> {
        if self.status == CONFLICT_STATUS {
            return Err(ApiError::Request(self.body));
        }
        if let Some(message) = self.headers.get("error") {
            return Err(ApiError::Request(message.clone()));
        }
        if self.body.is_empty() {
            return Ok(ApiResponse::Success {
                message: placeholder.unwrap_or_default().to_string(),
            });
        }
        match self.format {
            Format::Xml => Ok(ApiResponse::Xml(self.body)),
            Format::Json => Ok(ApiResponse::Json(serde_json::from_str(&self.body)?)),
        }
    }
}

/// Keep only `X-API-*` headers, keyed by their normalized suffix. A header
/// repeated under different casings keeps the last value.
pub fn extract_api_headers(headers: &[(String, String)]) -> ApiHeaders {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let prefix = name.get(..HEADER_PREFIX.len())?;
            if !prefix.eq_ignore_ascii_case(HEADER_PREFIX) {
                return None;
            }
            let key = name[HEADER_PREFIX.len()..].to_lowercase().replace('-', "_");
            Some((key, value.clone()))
        })
        .collect()
}

/// Classify `response` in one step, returning the extracted headers alongside
/// the outcome so callers can retain them even when the call failed.
pub fn normalize(
    response: HttpResponse,
    format: Format,
    placeholder: Option<&str>,
) -> (ApiHeaders, Result<ApiResponse>) {
    let envelope = ResponseEnvelope::from_http(response, format);
    let headers = envelope.headers.clone();
    (headers, envelope.into_result(placeholder))
}
