//! Synchronous client core for the VesselFinder vessel-tracking API.
//!
//! # Overview
//! Validates caller arguments against the API's documented constraints,
//! serializes requests, and maps every HTTP outcome (success, business error,
//! transport failure, empty body) to one deterministic result.
//!
//! ```rust,no_run
//! use vesselfinder_core::{ApiClient, ApiError, ClientConfig, Params};
//!
//! fn main() -> Result<(), ApiError> {
//!     let mut api = ApiClient::new(ClientConfig::new("-- your userkey --"))?;
//!
//!     let vessels = api.vessels([9228801_i64, 9441271], 227441980, &Params::new())?;
//!     println!("{}", vessels.into_value());
//!
//!     let calls = api.port_calls(720, &Params::new().with("locode", "BGVAR"))?;
//!     println!("{}", calls.into_value());
//!     println!("{:?}", api.last_info()?);
//!     Ok(())
//! }
//! ```
//!
//! # Design
//! - Host-does-IO at the bottom: [`VesselFinderClient`] builds
//!   [`HttpRequest`] values and parses [`HttpResponse`] values without
//!   touching the network.
//! - [`ApiClient`] is the façade: it pairs the builder with a [`Transport`]
//!   and keeps the last response's `X-API-*` headers.
//! - Each operation declares an explicit parameter schema
//!   ([`RequestBuilder`]); field rules live in [`validate`] and are checked
//!   before any I/O.
//! - Errors are a single enum, [`ApiError`]; see its docs for how the kinds
//!   relate.
//! - The `ureq` feature (on by default) provides [`UreqTransport`].

pub mod api;
pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod response;
#[cfg(feature = "ureq")]
pub mod transport;
pub mod types;
pub mod validate;

pub use api::ApiClient;
pub use builder::{CrossFieldRule, RequestBuilder, RequestSpec};
pub use client::{PreparedRequest, VesselFinderClient};
pub use config::{ClientConfig, Credentials};
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use response::{ApiHeaders, ApiResponse, ResponseEnvelope};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{Format, ParamValue, Params};
