use crate::listen::ListenEndpoint;
use crate::logging::LogFormat;

/// Default TCP port the gateway listens on.
pub const DEFAULT_TCP_PORT: u16 = 8080;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default capacity of each subscription's delivery queue.
pub const DEFAULT_NOTIFY_QUEUE_CAPACITY: usize = 64;

/// Default capacity of each subscription's fault channel.
pub const DEFAULT_NOTIFY_FAULT_CAPACITY: usize = 20;

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Loopback endpoint used when nothing else is configured.
#[must_use]
pub fn default_listen_endpoint() -> ListenEndpoint {
    ListenEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}

/// Version string served at `/.ver`.
#[must_use]
pub fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_owned()
}

/// Delivery queue capacity for notification subscriptions.
#[must_use]
pub const fn default_notify_queue_capacity() -> usize {
    DEFAULT_NOTIFY_QUEUE_CAPACITY
}

/// Fault channel capacity for notification subscriptions.
#[must_use]
pub const fn default_notify_fault_capacity() -> usize {
    DEFAULT_NOTIFY_FAULT_CAPACITY
}
