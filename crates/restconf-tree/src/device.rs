use std::sync::Arc;

use crate::errors::TreeError;
use crate::selection::Browser;

/// Opens named files such as YANG sources or web UI assets.
pub trait SourceOpener: Send + Sync {
    /// Returns the file's bytes, or `None` when no such file exists.
    fn open(&self, path: &str) -> Result<Option<Vec<u8>>, TreeError>;
}

/// A managed device: one browser per module plus optional file sources.
pub trait Device: Send + Sync {
    /// Data browser for `module`.
    fn browser(&self, module: &str) -> Result<Option<Arc<dyn Browser>>, TreeError>;

    /// Browser over the description of `module`'s schema.
    fn schema_browser(&self, module: &str) -> Result<Option<Arc<dyn Browser>>, TreeError>;

    /// Raw schema files.
    fn schema_source(&self) -> Option<Arc<dyn SourceOpener>>;

    /// Static web UI files.
    fn ui_source(&self) -> Option<Arc<dyn SourceOpener>>;
}

/// Lookup of devices served under `/restconf=<id>`.
pub trait DeviceMap: Send + Sync {
    /// Device registered under `id`.
    fn device(&self, id: &str) -> Result<Option<Arc<dyn Device>>, TreeError>;
}
