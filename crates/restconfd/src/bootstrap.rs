//! Gateway bootstrap orchestration.

use std::fs;
use std::io;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use restconf_config::Config;
use restconf_tree::Device;
use restconf_tree::memory::{DeviceManifest, ManifestError, MemoryDevice};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::gateway::Gateway;
use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{HttpListener, ListenerError};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns the layered loader's failure.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The device manifest could not be read.
    #[error("failed to read device manifest {path}: {source}")]
    ManifestRead {
        /// Manifest location.
        path: String,
        /// Filesystem error.
        #[source]
        source: io::Error,
    },
    /// The device manifest does not describe a valid device.
    #[error("invalid device manifest {path}: {source}")]
    Manifest {
        /// Manifest location.
        path: String,
        /// Parse or schema failure.
        #[source]
        source: ManifestError,
    },
}

/// Result of a successful bootstrap: a configured gateway ready to listen.
pub struct Restconfd {
    config: Config,
    gateway: Arc<Gateway>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Restconfd {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Gateway serving requests.
    #[must_use]
    pub const fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Token that stops the listener and every open request.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.gateway.shutdown_token().clone()
    }

    /// Binds the configured endpoint and serves until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when binding or serving fails.
    pub async fn run(self) -> Result<(), ListenerError> {
        let listener = HttpListener::bind(self.config.listen()).await?;
        self.reporter.listener_ready(listener.local_addr()?);
        let shutdown = self.shutdown_token();
        let reporter = Arc::clone(&self.reporter);
        let watch = shutdown.clone();
        tokio::spawn(async move {
            watch.cancelled().await;
            reporter.shutdown_requested();
        });
        listener.serve(self.gateway, shutdown).await
    }
}

/// Bootstraps the gateway using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration, telemetry or the device
/// manifest cannot be loaded; the reporter sees the same error.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Restconfd, BootstrapError> {
    reporter.bootstrap_starting();
    match assemble(loader) {
        Ok((config, gateway, telemetry)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Restconfd {
                config,
                gateway: Arc::new(gateway),
                telemetry,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn assemble(loader: &dyn ConfigLoader) -> Result<(Config, Gateway, TelemetryHandle), BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let device = load_device(&config)?;

    let mut builder = Gateway::builder(device)
        .version(config.server_version())
        .strict_compliance(config.strict_compliance())
        .notify_capacity(config.notify_queue_capacity(), config.notify_fault_capacity());
    if let Some(endpoint) = config.web_ui() {
        builder = builder.web_ui(endpoint);
    }
    Ok((config, builder.build(), telemetry))
}

fn load_device(config: &Config) -> Result<Arc<dyn Device>, BootstrapError> {
    let Some(path) = config.device_manifest() else {
        return Ok(Arc::new(MemoryDevice::new()));
    };
    let text = fs::read_to_string(path).map_err(|source| BootstrapError::ManifestRead {
        path: path.to_string(),
        source,
    })?;
    let device = DeviceManifest::from_json(&text)
        .and_then(DeviceManifest::into_device)
        .map_err(|source| BootstrapError::Manifest {
            path: path.to_string(),
            source,
        })?;
    Ok(Arc::new(device))
}
