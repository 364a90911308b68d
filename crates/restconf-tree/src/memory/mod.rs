//! In-process device implementation.
//!
//! Data lives in a JSON document per module, guarded by a lock and checked
//! against a small schema model. Suitable for demos, tests and devices whose
//! state fits in memory.

mod device;
mod events;
mod manifest;
mod module;
mod path;
mod schema;
mod static_browser;

pub use device::{
    MemoryDevice, MemoryDeviceMap, MemorySources, SCHEMA_DESCRIPTION_MODULE,
    SCHEMA_DESCRIPTION_NAMESPACE,
};
pub use manifest::{DeviceManifest, ManifestError, ManifestModule};
pub use module::{ActionHandler, ActionRequest, MemoryModule};
pub use schema::{ModuleSchema, SchemaNode};
pub use static_browser::StaticBrowser;
