//! Top-level request routing.
//!
//! [`Gateway::handle`] negotiates compliance, runs filters, applies CORS and
//! routes each request to the version string, the well-known resources, a
//! device's data, operations, streams, schema or UI sources, or the fallback
//! handler.

mod hooks;

use std::sync::Arc;

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{Method, StatusCode};
use restconf_config::{DEFAULT_NOTIFY_FAULT_CAPACITY, DEFAULT_NOTIFY_QUEUE_CAPACITY};
use restconf_tree::{Device, DeviceMap, RequestScope, SourceOpener};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::address::{self, Address, EndpointCategory, Route};
use crate::compliance::{ComplianceNegotiator, media};
use crate::dispatch::Dispatcher;
use crate::errors::GatewayError;
use crate::exchange::{Reply, RequestContext, RestRequest};
use crate::notify::{NotificationStreamer, SubscriptionCounter};

pub use hooks::{FallbackHandler, HeaderAttributeFilter, RequestFilter};

const GATEWAY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::gateway");

const NO_MODULE: &str = "no module found in path";
const HOST_META: &str =
    r#"{ "xrd" : { "link" : { "@rel" : "restconf", "@href" : "/restconf" } } }"#;
const CORS_ALLOW_HEADERS: &str = "origin, content-type, accept";
const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, OPTIONS, DELETE, PATCH";

/// RESTCONF front end for one main device and optional addressable devices.
pub struct Gateway {
    version: String,
    negotiator: ComplianceNegotiator,
    main: Arc<dyn Device>,
    devices: Option<Arc<dyn DeviceMap>>,
    filters: Vec<Arc<dyn RequestFilter>>,
    web_uis: Vec<String>,
    fallback: Option<Arc<dyn FallbackHandler>>,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
}

impl Gateway {
    /// Starts building a gateway around `main`.
    pub fn builder(main: Arc<dyn Device>) -> GatewayBuilder {
        GatewayBuilder::new(main)
    }

    /// Token whose cancellation ends every open request, streams included.
    #[must_use]
    pub const fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Live event-stream subscriptions.
    #[must_use]
    pub fn live_subscriptions(&self) -> usize {
        self.dispatcher.streamer().counter().live()
    }

    /// Serves one request. Failures are rendered, never returned.
    pub async fn handle(&self, request: RestRequest) -> Reply {
        let compliance = self
            .negotiator
            .negotiate(request.query.as_deref(), &request.headers);
        let mut scope = RequestScope::new(self.shutdown.child_token());
        if let Some(addr) = request.remote_addr {
            scope = scope.with_remote_host(addr.ip().to_string());
        }
        debug!(
            target: GATEWAY_TARGET,
            method = %request.method,
            path = %request.path,
            query = request.query.as_deref().unwrap_or_default(),
            strict = compliance.is_strict(),
            "request received"
        );
        if !request.body.is_empty() {
            debug!(
                target: GATEWAY_TARGET,
                body = %String::from_utf8_lossy(&request.body),
                "request body"
            );
        }

        let outcome = match self.run_filters(&mut scope, &request) {
            Ok(()) => {
                let context = RequestContext::new(scope, compliance);
                self.route(&request, &context).await
            }
            Err(error) => Err(error),
        };
        let mut reply = outcome.unwrap_or_else(|error| {
            warn!(
                target: GATEWAY_TARGET,
                method = %request.method,
                path = %request.path,
                status = error.status().as_u16(),
                %error,
                "request failed"
            );
            error.into_reply(compliance)
        });

        reply.set_header(ACCESS_CONTROL_ALLOW_HEADERS, CORS_ALLOW_HEADERS);
        reply.set_header(ACCESS_CONTROL_ALLOW_METHODS, CORS_ALLOW_METHODS);
        reply.set_header(ACCESS_CONTROL_ALLOW_ORIGIN, "*");
        reply
    }

    fn run_filters(
        &self,
        scope: &mut RequestScope,
        request: &RestRequest,
    ) -> Result<(), GatewayError> {
        self.filters
            .iter()
            .try_for_each(|filter| filter.apply(scope, request))
    }

    async fn route(
        &self,
        request: &RestRequest,
        context: &RequestContext,
    ) -> Result<Reply, GatewayError> {
        match address::resolve(&request.path)? {
            Route::Root => self.serve_root(request),
            Route::Version => Ok(Reply::bytes(
                StatusCode::OK,
                media::TEXT_PLAIN,
                self.version.clone(),
            )),
            Route::WellKnown { resource } => serve_well_known(&resource),
            Route::Restconf(address) => self.serve_restconf(&address, request, context).await,
            Route::Unhandled { .. } => self.serve_fallback(request),
        }
    }

    fn serve_root(&self, request: &RestRequest) -> Result<Reply, GatewayError> {
        if request.method == Method::OPTIONS {
            return Ok(Reply::empty(StatusCode::OK));
        }
        if request.method == Method::GET
            && let Some(endpoint) = self.web_uis.first()
        {
            return Ok(Reply::redirect(endpoint));
        }
        self.serve_fallback(request)
    }

    fn serve_fallback(&self, request: &RestRequest) -> Result<Reply, GatewayError> {
        self.fallback
            .as_ref()
            .map(|fallback| fallback.handle(request))
            .ok_or_else(|| GatewayError::not_found(format!("no handler for '{}'", request.path)))
    }

    fn find_device(&self, id: Option<&str>) -> Result<Arc<dyn Device>, GatewayError> {
        let Some(id) = id else {
            return Ok(Arc::clone(&self.main));
        };
        let device = match &self.devices {
            Some(devices) => devices.device(id)?,
            None => None,
        };
        device.ok_or_else(|| GatewayError::not_found(format!("device {id}")))
    }

    async fn serve_restconf(
        &self,
        address: &Address,
        request: &RestRequest,
        context: &RequestContext,
    ) -> Result<Reply, GatewayError> {
        let device = self.find_device(address.device())?;
        match address.category() {
            EndpointCategory::Data | EndpointCategory::Operations | EndpointCategory::Streams => {
                let module = address
                    .module()
                    .ok_or_else(|| GatewayError::not_found(NO_MODULE))?;
                let browser = device
                    .browser(module)?
                    .ok_or_else(|| GatewayError::not_found(NO_MODULE))?;
                self.dispatcher
                    .serve(browser.as_ref(), address, request, context)
                    .await
            }
            EndpointCategory::Schema => {
                if request.accept().is_some_and(|accept| accept.contains("/json")) {
                    let browser = address
                        .module()
                        .map(|module| device.schema_browser(module))
                        .transpose()?
                        .flatten()
                        .ok_or_else(|| GatewayError::not_found(NO_MODULE))?;
                    self.dispatcher
                        .serve(browser.as_ref(), address, request, context)
                        .await
                } else {
                    let path = address.decoded_path();
                    let resource = match address.module() {
                        Some(module) if path.is_empty() => module.to_owned(),
                        Some(module) => format!("{module}/{path}"),
                        None => path,
                    };
                    serve_source(device.schema_source(), &resource)
                }
            }
            EndpointCategory::Ui => serve_source(device.ui_source(), &address.decoded_path()),
        }
    }
}

fn serve_well_known(resource: &str) -> Result<Reply, GatewayError> {
    match resource {
        "host-meta" => Ok(Reply::bytes(StatusCode::OK, media::JSON, HOST_META)),
        other => Err(GatewayError::not_found(format!(
            "well-known resource '{other}'"
        ))),
    }
}

fn serve_source(source: Option<Arc<dyn SourceOpener>>, path: &str) -> Result<Reply, GatewayError> {
    let not_found = || GatewayError::not_found(format!("resource '{path}'"));
    let bytes = source
        .ok_or_else(not_found)?
        .open(path)?
        .ok_or_else(not_found)?;
    Ok(Reply::bytes(StatusCode::OK, source_content_type(path), bytes))
}

fn source_content_type(path: &str) -> &'static str {
    if path.ends_with(".yang") {
        return "application/yang";
    }
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
}

/// Assembles a [`Gateway`].
pub struct GatewayBuilder {
    version: String,
    strict: bool,
    main: Arc<dyn Device>,
    devices: Option<Arc<dyn DeviceMap>>,
    filters: Vec<Arc<dyn RequestFilter>>,
    web_uis: Vec<String>,
    fallback: Option<Arc<dyn FallbackHandler>>,
    queue_capacity: usize,
    fault_capacity: usize,
    counter: Option<Arc<SubscriptionCounter>>,
    shutdown: CancellationToken,
}

impl GatewayBuilder {
    fn new(main: Arc<dyn Device>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_owned(),
            strict: false,
            main,
            devices: None,
            filters: Vec::new(),
            web_uis: Vec::new(),
            fallback: None,
            queue_capacity: DEFAULT_NOTIFY_QUEUE_CAPACITY,
            fault_capacity: DEFAULT_NOTIFY_FAULT_CAPACITY,
            counter: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Text served at `/.ver`.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Forces strict compliance regardless of request hints.
    #[must_use]
    pub const fn strict_compliance(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Serves additional devices under `/restconf=<id>`.
    #[must_use]
    pub fn device_map(mut self, devices: Arc<dyn DeviceMap>) -> Self {
        self.devices = Some(devices);
        self
    }

    /// Appends a request filter.
    #[must_use]
    pub fn filter(mut self, filter: Arc<dyn RequestFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Registers a web UI endpoint; the first one is the target of `GET /`.
    #[must_use]
    pub fn web_ui(mut self, endpoint: impl Into<String>) -> Self {
        self.web_uis.push(endpoint.into());
        self
    }

    /// Handler for requests nothing else serves.
    #[must_use]
    pub fn fallback(mut self, fallback: Arc<dyn FallbackHandler>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Per-subscription delivery queue and fault channel sizes.
    #[must_use]
    pub const fn notify_capacity(mut self, queue: usize, faults: usize) -> Self {
        self.queue_capacity = queue;
        self.fault_capacity = faults;
        self
    }

    /// Counts subscriptions on `counter` instead of the process-wide gauge.
    #[must_use]
    pub fn subscription_counter(mut self, counter: Arc<SubscriptionCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    /// Parent token for every request scope.
    #[must_use]
    pub fn shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Finishes the gateway.
    #[must_use]
    pub fn build(self) -> Gateway {
        let mut streamer = NotificationStreamer::new(self.queue_capacity, self.fault_capacity);
        if let Some(counter) = self.counter {
            streamer = streamer.with_counter(counter);
        }
        Gateway {
            version: self.version,
            negotiator: ComplianceNegotiator::new(self.strict),
            main: self.main,
            devices: self.devices,
            filters: self.filters,
            web_uis: self.web_uis,
            fallback: self.fallback,
            dispatcher: Dispatcher::new(streamer),
            shutdown: self.shutdown,
        }
    }
}
