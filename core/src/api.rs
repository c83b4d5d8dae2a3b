//! The `ApiClient` façade: one method per API resource.
//!
//! # Design
//! `ApiClient` wraps the stateless [`VesselFinderClient`] with a
//! [`Transport`] and the one piece of mutable state the API defines: the
//! `X-API-*` headers of the most recent response ("last info").
//!
//! Every dispatched request clears and then overwrites that state, whether
//! the call succeeds or fails. Requests rejected locally with
//! `ApiError::Argument` never reach the transport and leave it untouched.
//! Operations take `&mut self`, so there is exactly one writer per call. To
//! share a client between threads, put it behind a lock
//! (`Arc<Mutex<ApiClient<_>>>`); each call then replaces the map while the
//! lock is held.

use tracing::{debug, instrument, warn};

use crate::client::{PreparedRequest, VesselFinderClient};
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::Transport;
use crate::response::{normalize, ApiHeaders, ApiResponse};
use crate::types::{ParamValue, Params};

#[derive(Debug)]
pub struct ApiClient<T> {
    client: VesselFinderClient,
    transport: T,
    last_info: ApiHeaders,
}

#[cfg(feature = "ureq")]
impl ApiClient<crate::transport::UreqTransport> {
    /// Client over the bundled blocking `ureq` transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_transport(config, crate::transport::UreqTransport::new())
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        Ok(Self {
            client: VesselFinderClient::new(config)?,
            transport,
            last_info: ApiHeaders::new(),
        })
    }

    /// The stateless builder/parser this client delegates to.
    pub fn requests(&self) -> &VesselFinderClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `X-API-*` headers of the most recent dispatched request.
    ///
    /// Fails with `ApiError::Configuration` when the client was configured
    /// with `save_last_info = false`.
    pub fn last_info(&self) -> Result<&ApiHeaders> {
        if !self.client.config().save_last_info {
            return Err(ApiError::configuration(
                "last info is not retained; set `save_last_info` to true in ClientConfig to use it",
            ));
        }
        Ok(&self.last_info)
    }

    /// Send a prepared request and classify its response.
    pub fn execute(&mut self, prepared: &PreparedRequest) -> Result<ApiResponse> {
        let retain = self.client.config().save_last_info;
        if retain {
            self.last_info.clear();
        }

        debug!(
            method = %prepared.request.method,
            resource = prepared.resource,
            "dispatching request"
        );
        let response = self.transport.send(&prepared.request)?;
        debug!(status = response.status, resource = prepared.resource, "response received");

        let (headers, result) = normalize(response, prepared.format, prepared.placeholder);
        if retain {
            self.last_info = headers;
        }

        if let Err(ApiError::Request(message)) = &result {
            warn!(resource = prepared.resource, %message, "service reported an error");
        }
        result
    }

    #[instrument(skip_all)]
    pub fn status(&mut self, params: &Params) -> Result<ApiResponse> {
        let prepared = self.client.build_status(params)?;
        self.execute(&prepared)
    }

    /// Look up vessels by IMO and/or MMSI; either may be a list.
    #[instrument(skip_all)]
    pub fn vessels(
        &mut self,
        imo: impl Into<ParamValue>,
        mmsi: impl Into<ParamValue>,
        params: &Params,
    ) -> Result<ApiResponse> {
        let prepared = self.client.build_vessels(imo, mmsi, params)?;
        self.execute(&prepared)
    }

    #[instrument(skip_all)]
    pub fn vessels_list(&mut self, params: &Params) -> Result<ApiResponse> {
        let prepared = self.client.build_vessels_list(params)?;
        self.execute(&prepared)
    }

    #[instrument(skip_all)]
    pub fn live_data(&mut self, params: &Params) -> Result<ApiResponse> {
        let prepared = self.client.build_live_data(params)?;
        self.execute(&prepared)
    }

    /// Port calls for vessels (`imo`/`mmsi` in `params`) or a port
    /// (`locode`) over the last `interval` minutes.
    #[instrument(skip_all)]
    pub fn port_calls(
        &mut self,
        interval: impl Into<ParamValue>,
        params: &Params,
    ) -> Result<ApiResponse> {
        let prepared = self.client.build_port_calls(interval, params)?;
        self.execute(&prepared)
    }

    #[instrument(skip_all)]
    pub fn expected_arrivals(
        &mut self,
        locode: impl Into<ParamValue>,
        params: &Params,
    ) -> Result<ApiResponse> {
        let prepared = self.client.build_expected_arrivals(locode, params)?;
        self.execute(&prepared)
    }

    #[instrument(skip_all)]
    pub fn master_data(&mut self, imo: impl Into<ParamValue>, params: &Params) -> Result<ApiResponse> {
        let prepared = self.client.build_master_data(imo, params)?;
        self.execute(&prepared)
    }

    #[instrument(skip_all)]
    pub fn distance(
        &mut self,
        from: impl Into<ParamValue>,
        to: impl Into<ParamValue>,
        params: &Params,
    ) -> Result<ApiResponse> {
        let prepared = self.client.build_distance(from, to, params)?;
        self.execute(&prepared)
    }

    #[instrument(skip_all)]
    pub fn list_manager(&mut self) -> Result<ApiResponse> {
        let prepared = self.client.build_list_manager()?;
        self.execute(&prepared)
    }

    #[instrument(skip_all)]
    pub fn list_manager_add_vessels(&mut self, params: &Params) -> Result<ApiResponse> {
        let prepared = self.client.build_list_manager_add_vessels(params)?;
        self.execute(&prepared)
    }

    #[instrument(skip_all)]
    pub fn list_manager_replace_all_vessels(&mut self, params: &Params) -> Result<ApiResponse> {
        let prepared = self.client.build_list_manager_replace_all_vessels(params)?;
        self.execute(&prepared)
    }

    #[instrument(skip_all)]
    pub fn list_manager_delete_vessels(&mut self, params: &Params) -> Result<ApiResponse> {
        let prepared = self.client.build_list_manager_delete_vessels(params)?;
        self.execute(&prepared)
    }
}
