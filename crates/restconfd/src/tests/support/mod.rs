//! Shared fixtures for the gateway suites.

mod bootstrap_world;
mod config_loader;
mod device;
mod reporter;
mod world;

pub use bootstrap_world::{BootstrapWorld, bootstrap_world, listener_address};
pub use device::{GatewayOptions, acme_device, acme_gateway, acme_module};
pub use reporter::HealthEvent;
pub use world::{GatewayWorld, gateway_world, scalar_text};
