use std::collections::BTreeMap;

use tokio_util::sync::CancellationToken;

/// Request-scoped values a browser may consult while resolving a path.
///
/// Filters in the gateway record values here (for example a caller identity
/// taken from a header) so node implementations can see them.
#[derive(Debug, Clone, Default)]
pub struct RequestScope {
    remote_host: Option<String>,
    cancellation: CancellationToken,
    attributes: BTreeMap<String, String>,
}

impl RequestScope {
    /// Creates a scope bound to the given cancellation token.
    #[must_use]
    pub fn new(cancellation: CancellationToken) -> Self {
        Self {
            remote_host: None,
            cancellation,
            attributes: BTreeMap::new(),
        }
    }

    /// Records the caller's host (port already stripped).
    #[must_use]
    pub fn with_remote_host(mut self, host: impl Into<String>) -> Self {
        self.remote_host = Some(host.into());
        self
    }

    /// Caller's host, when known.
    #[must_use]
    pub fn remote_host(&self) -> Option<&str> {
        self.remote_host.as_deref()
    }

    /// Token cancelled when the request ends or the server shuts down.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Stores a named value.
    pub fn insert_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Reads a named value.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
