//! RESTCONF (RFC 8040) gateway.
//!
//! The gateway turns HTTP requests into operations on a device's data trees.
//! Configuration comes from [`restconf_config`]; devices, browsers and the
//! in-memory reference device come from [`restconf_tree`].
//!
//! A request flows through four stages:
//!
//! 1. [`compliance`] decides whether the request speaks strict RFC 8040 or
//!    the simplified dialect, from the `simplified` query parameter and the
//!    media types on the request.
//! 2. [`address`] splits the path into device, endpoint, module and data
//!    path.
//! 3. [`gateway`] applies filters and CORS, serves the version and
//!    well-known resources, and picks the device browser.
//! 4. [`dispatch`] maps the method and the resolved node to a read, write,
//!    rpc or subscription; [`codec`] handles bodies and [`notify`] streams
//!    events as Server-Sent Events.
//!
//! Failures become [`GatewayError`] values and are rendered as
//! `ietf-restconf:errors` documents or plain text depending on the dialect.

pub mod address;
mod bootstrap;
pub mod codec;
pub mod compliance;
pub mod dispatch;
mod errors;
pub mod exchange;
pub mod gateway;
mod health;
pub mod notify;
mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Restconfd, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use errors::GatewayError;
pub use exchange::{Reply, ReplyBody, RequestContext, RestRequest};
pub use gateway::{FallbackHandler, Gateway, GatewayBuilder, HeaderAttributeFilter, RequestFilter};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
