//! Blocking [`Transport`] backed by `ureq`.
//!
//! HTTP status codes are returned as data, never as errors, so 409 and the
//! like reach the response normalizer. Only failures where no response
//! exists (DNS, connect, timeout, unreadable body) become
//! `ApiError::Transport`.
//!
//! ureq decodes gzip bodies itself; `deflate` is decoded here with `flate2`.
//! Header values are kept even when they are not visible ASCII.

use std::fmt;
use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};

use tracing::trace;
use ureq::Agent;

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a caller-configured agent. It must not treat HTTP status codes as
    /// errors.
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

/// Copy headers and the per-request deadline onto a ureq builder.
fn configure<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.config().timeout_global(request.timeout).build()
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        trace!(method = %request.method, "sending request");
        let body = request.body.as_deref().unwrap_or_default();

        let result = match request.method {
            HttpMethod::Get => configure(self.agent.get(&request.url), request).call(),
            HttpMethod::Delete => configure(self.agent.delete(&request.url), request).call(),
            HttpMethod::Post => configure(self.agent.post(&request.url), request).send(body.as_bytes()),
            HttpMethod::Put => configure(self.agent.put(&request.url), request).send(body.as_bytes()),
        };
        let mut response = result.map_err(|e| ApiError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let raw = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| ApiError::transport(format!("failed to read response body: {e}")))?;
        let encoding = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-encoding"))
            .map(|(_, value)| value.as_str());
        let body = decode_body(encoding, raw)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Undo a `deflate` content encoding and require UTF-8 text.
///
/// `deflate` is meant to be zlib-wrapped, but some servers send a bare
/// deflate stream, so both are accepted.
fn decode_body(encoding: Option<&str>, raw: Vec<u8>) -> Result<String> {
    let bytes = match encoding.map(str::trim) {
        Some(encoding) if encoding.eq_ignore_ascii_case("deflate") => {
            let mut out = Vec::new();
            if ZlibDecoder::new(raw.as_slice()).read_to_end(&mut out).is_err() {
                out.clear();
                DeflateDecoder::new(raw.as_slice())
                    .read_to_end(&mut out)
                    .map_err(|e| ApiError::transport(format!("failed to inflate response body: {e}")))?;
            }
            out
        }
        _ => raw,
    };
    String::from_utf8(bytes)
        .map_err(|e| ApiError::transport(format!("response body is not UTF-8: {e}")))
}
