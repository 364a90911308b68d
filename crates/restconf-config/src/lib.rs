//! Shared configuration for the RESTCONF gateway.
//!
//! Configuration is layered with `ortho_config`: built-in defaults, then an
//! optional TOML file (`--config-path` or `RESTCONF_CONFIG_PATH`), then
//! `RESTCONF_*` environment variables, then command-line flags. Later layers
//! win.

mod defaults;
mod listen;
mod logging;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_NOTIFY_FAULT_CAPACITY, DEFAULT_NOTIFY_QUEUE_CAPACITY,
    DEFAULT_TCP_PORT, default_listen_endpoint, default_log_filter, default_log_filter_string,
    default_log_format, default_notify_fault_capacity, default_notify_queue_capacity,
    default_server_version,
};
pub use listen::{ListenEndpoint, ListenParseError};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "RESTCONF")]
pub struct Config {
    /// Endpoint the HTTP listener binds to.
    #[ortho_config(default = default_listen_endpoint())]
    #[serde(default = "default_listen_endpoint")]
    pub listen: ListenEndpoint,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Output format for structured logs.
    #[ortho_config(default = default_log_format())]
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Forces strict RFC 8040 behaviour for every request.
    #[ortho_config(default = false)]
    #[serde(default)]
    pub strict_compliance: bool,
    /// Version string served at `/.ver`.
    #[ortho_config(default = default_server_version())]
    #[serde(default = "default_server_version")]
    pub server_version: String,
    /// Capacity of each subscription's delivery queue.
    #[ortho_config(default = default_notify_queue_capacity())]
    #[serde(default = "default_notify_queue_capacity")]
    pub notify_queue_capacity: usize,
    /// Capacity of each subscription's fault channel.
    #[ortho_config(default = default_notify_fault_capacity())]
    #[serde(default = "default_notify_fault_capacity")]
    pub notify_fault_capacity: usize,
    /// Web UI endpoint that `GET /` redirects to.
    #[serde(default)]
    pub web_ui: Option<String>,
    /// JSON manifest describing the device served by the binary.
    #[serde(default)]
    pub device_manifest: Option<Utf8PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            strict_compliance: false,
            server_version: default_server_version(),
            notify_queue_capacity: default_notify_queue_capacity(),
            notify_fault_capacity: default_notify_fault_capacity(),
            web_ui: None,
            device_manifest: None,
        }
    }
}

impl Config {
    /// Endpoint the HTTP listener binds to.
    #[must_use]
    pub const fn listen(&self) -> &ListenEndpoint {
        &self.listen
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for structured logs.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Whether every request is forced into strict compliance.
    #[must_use]
    pub const fn strict_compliance(&self) -> bool {
        self.strict_compliance
    }

    /// Version string served at `/.ver`.
    #[must_use]
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Delivery queue capacity, never below one.
    #[must_use]
    pub fn notify_queue_capacity(&self) -> usize {
        self.notify_queue_capacity.max(1)
    }

    /// Fault channel capacity, never below one.
    #[must_use]
    pub fn notify_fault_capacity(&self) -> usize {
        self.notify_fault_capacity.max(1)
    }

    /// Web UI endpoint that `GET /` redirects to.
    #[must_use]
    pub fn web_ui(&self) -> Option<&str> {
        self.web_ui.as_deref()
    }

    /// Device manifest served by the binary, if any.
    #[must_use]
    pub fn device_manifest(&self) -> Option<&camino::Utf8Path> {
        self.device_manifest.as_deref()
    }
}
