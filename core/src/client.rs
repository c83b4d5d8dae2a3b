//! Stateless request builder and response parser for the VesselFinder API.
//!
//! # Design
//! `VesselFinderClient` holds only configuration and carries no mutable state
//! between calls. Each operation has a `build_*` method that validates the
//! caller's arguments and produces a [`PreparedRequest`]; [`parse`] turns the
//! matching `HttpResponse` into an outcome. The caller (or
//! [`ApiClient`](crate::ApiClient)) executes the HTTP round-trip in between.
//!
//! [`parse`]: VesselFinderClient::parse

use std::time::Duration;

use url::Url;

use crate::builder::{CrossFieldRule, RequestBuilder, RequestSpec};
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::response::{ApiResponse, ResponseEnvelope};
use crate::types::{Format, ParamValue, Params};

/// Deadline applied to GET requests.
pub const GET_TIMEOUT: Duration = Duration::from_secs(5);

pub const ACCEPT_ENCODING: &str = "gzip, deflate";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub const LIST_ADDED: &str = "Successfully added to your ListManager.";
pub const LIST_REPLACED: &str = "Successfully replaced your ListManager.";
pub const LIST_DELETED: &str = "Successfully deleted from your ListManager.";

/// A serialized request plus what the parser needs to interpret its response.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub resource: &'static str,
    pub request: HttpRequest,
    pub format: Format,
    pub placeholder: Option<&'static str>,
}

/// Synchronous, stateless client for the VesselFinder API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct VesselFinderClient {
    config: ClientConfig,
    endpoint: Url,
}

impl VesselFinderClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)?;
        if endpoint.cannot_be_a_base() {
            return Err(ApiError::configuration(format!(
                "endpoint {} cannot carry resource paths",
                config.endpoint
            )));
        }
        Ok(Self { config, endpoint })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn build_status(&self, params: &Params) -> Result<PreparedRequest> {
        self.prepare(&status_schema(), params)
    }

    pub fn build_vessels(
        &self,
        imo: impl Into<ParamValue>,
        mmsi: impl Into<ParamValue>,
        params: &Params,
    ) -> Result<PreparedRequest> {
        self.prepare(&vessels_schema(imo.into(), mmsi.into()), params)
    }

    pub fn build_vessels_list(&self, params: &Params) -> Result<PreparedRequest> {
        self.prepare(&snapshot_schema("vesselslist"), params)
    }

    pub fn build_live_data(&self, params: &Params) -> Result<PreparedRequest> {
        self.prepare(&snapshot_schema("livedata"), params)
    }

    pub fn build_port_calls(
        &self,
        interval: impl Into<ParamValue>,
        params: &Params,
    ) -> Result<PreparedRequest> {
        let interval = required("interval", interval.into())?;
        self.prepare(&port_calls_schema(interval), params)
    }

    pub fn build_expected_arrivals(
        &self,
        locode: impl Into<ParamValue>,
        params: &Params,
    ) -> Result<PreparedRequest> {
        let locode = required("locode", locode.into())?;
        self.prepare(&expected_arrivals_schema(locode), params)
    }

    pub fn build_master_data(
        &self,
        imo: impl Into<ParamValue>,
        params: &Params,
    ) -> Result<PreparedRequest> {
        let imo = required("imo", imo.into())?;
        self.prepare(&master_data_schema(imo), params)
    }

    /// `from` and `to` are `"lon,lat"` pairs.
    pub fn build_distance(
        &self,
        from: impl Into<ParamValue>,
        to: impl Into<ParamValue>,
        params: &Params,
    ) -> Result<PreparedRequest> {
        let from = required("from", from.into())?;
        let to = required("to", to.into())?;
        self.prepare(&distance_schema(from, to), params)
    }

    pub fn build_list_manager(&self) -> Result<PreparedRequest> {
        self.prepare(&RequestBuilder::new("listmanager", HttpMethod::Get), &Params::new())
    }

    pub fn build_list_manager_add_vessels(&self, params: &Params) -> Result<PreparedRequest> {
        self.prepare(&list_mutation_schema(HttpMethod::Post, LIST_ADDED), params)
    }

    pub fn build_list_manager_replace_all_vessels(
        &self,
        params: &Params,
    ) -> Result<PreparedRequest> {
        self.prepare(&list_mutation_schema(HttpMethod::Put, LIST_REPLACED), params)
    }

    pub fn build_list_manager_delete_vessels(&self, params: &Params) -> Result<PreparedRequest> {
        self.prepare(&list_mutation_schema(HttpMethod::Delete, LIST_DELETED), params)
    }

    /// Classify the response to `prepared`.
    pub fn parse(&self, prepared: &PreparedRequest, response: HttpResponse) -> Result<ApiResponse> {
        ResponseEnvelope::from_http(response, prepared.format).into_result(prepared.placeholder)
    }

    fn prepare(&self, builder: &RequestBuilder, params: &Params) -> Result<PreparedRequest> {
        let spec = builder.build(
            params,
            self.config.credentials.userkey(),
            self.config.error_mode,
        )?;
        self.serialize(spec)
    }

    /// Place parameters in the query string (GET, DELETE) or a form body
    /// (POST, PUT).
    fn serialize(&self, spec: RequestSpec) -> Result<PreparedRequest> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::configuration("endpoint cannot carry resource paths"))?
            .pop_if_empty()
            .push(spec.resource);

        let mut headers = vec![("accept-encoding".to_string(), ACCEPT_ENCODING.to_string())];
        let body = if spec.method.uses_query_string() {
            url.query_pairs_mut().extend_pairs(spec.wire_pairs());
            None
        } else {
            headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
            Some(
                url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(spec.wire_pairs())
                    .finish(),
            )
        };

        let timeout = (spec.method == HttpMethod::Get).then_some(GET_TIMEOUT);

        Ok(PreparedRequest {
            resource: spec.resource,
            format: spec.format(),
            placeholder: spec.placeholder,
            request: HttpRequest {
                method: spec.method,
                url: url.into(),
                headers,
                body,
                timeout,
            },
        })
    }
}

fn required(name: &str, value: ParamValue) -> Result<ParamValue> {
    if value.is_null() {
        Err(ApiError::argument(format!("Missing required parameter \"{name}\"")))
    } else {
        Ok(value)
    }
}

fn status_schema() -> RequestBuilder {
    RequestBuilder::new("status", HttpMethod::Get).field("format")
}

fn vessels_schema(imo: ParamValue, mmsi: ParamValue) -> RequestBuilder {
    RequestBuilder::new("vessels", HttpMethod::Get)
        .field_with_default("imo", imo)
        .field_with_default("mmsi", mmsi)
        .fields(&["format", "extradata", "sat", "interval"])
        .rule(CrossFieldRule::VesselTarget)
}

fn snapshot_schema(resource: &'static str) -> RequestBuilder {
    RequestBuilder::new(resource, HttpMethod::Get).fields(&["format", "interval"])
}

fn port_calls_schema(interval: ParamValue) -> RequestBuilder {
    RequestBuilder::new("portcalls", HttpMethod::Get)
        .field_with_default("interval", interval)
        .fields(&["format", "imo", "mmsi", "locode", "extradata", "limit", "event"])
        .fields(&["fromdate", "todate"])
        .rule(CrossFieldRule::PortCallTarget)
}

fn expected_arrivals_schema(locode: ParamValue) -> RequestBuilder {
    RequestBuilder::new("expectedarrivals", HttpMethod::Get)
        .field_with_default("locode", locode)
        .fields(&["format", "interval", "fromdate", "todate", "extradata", "limit"])
        .rule(CrossFieldRule::ArrivalTimespan)
}

fn master_data_schema(imo: ParamValue) -> RequestBuilder {
    RequestBuilder::new("masterdata", HttpMethod::Get)
        .field_with_default("imo", imo)
        .field("format")
}

fn distance_schema(from: ParamValue, to: ParamValue) -> RequestBuilder {
    RequestBuilder::new("distance", HttpMethod::Get)
        .field_with_default("from", from)
        .field_with_default("to", to)
        .fields(&["gateways", "eca", "epsg3857"])
}

fn list_mutation_schema(method: HttpMethod, placeholder: &'static str) -> RequestBuilder {
    RequestBuilder::new("listmanager", method)
        .fields(&["imo", "mmsi"])
        .rule(CrossFieldRule::ListVessels)
        .placeholder(placeholder)
}
