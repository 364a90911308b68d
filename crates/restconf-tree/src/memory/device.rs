use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use super::module::MemoryModule;
use super::static_browser::StaticBrowser;
use crate::device::{Device, DeviceMap, SourceOpener};
use crate::errors::TreeError;
use crate::selection::Browser;

/// Module name under which schema descriptions are served.
pub const SCHEMA_DESCRIPTION_MODULE: &str = "yang";

/// Namespace of the schema-description module.
pub const SCHEMA_DESCRIPTION_NAMESPACE: &str = "urn:ietf:params:xml:ns:yang:1";

/// Named files held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySources {
    files: BTreeMap<String, Arc<[u8]>>,
}

impl MemorySources {
    /// Adds or replaces a file. Leading slashes are ignored.
    pub fn insert(&mut self, path: impl AsRef<str>, bytes: impl Into<Vec<u8>>) {
        let key = path.as_ref().trim_start_matches('/').to_owned();
        self.files.insert(key, Arc::from(bytes.into()));
    }

    /// True when no files are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl SourceOpener for MemorySources {
    fn open(&self, path: &str) -> Result<Option<Vec<u8>>, TreeError> {
        Ok(self
            .files
            .get(path.trim_start_matches('/'))
            .map(|bytes| bytes.to_vec()))
    }
}

/// Device made of [`MemoryModule`]s and in-memory file sources.
#[derive(Debug, Clone, Default)]
pub struct MemoryDevice {
    modules: BTreeMap<String, Arc<MemoryModule>>,
    schema_files: MemorySources,
    ui_files: MemorySources,
}

impl MemoryDevice {
    /// Empty device.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module under its schema name.
    #[must_use]
    pub fn with_module(mut self, module: Arc<MemoryModule>) -> Self {
        self.modules.insert(module.name().to_owned(), module);
        self
    }

    /// Adds a raw schema file.
    #[must_use]
    pub fn with_schema_file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.schema_files.insert(path, bytes);
        self
    }

    /// Adds a web UI asset.
    #[must_use]
    pub fn with_ui_file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.ui_files.insert(path, bytes);
        self
    }

    /// Registered module by name.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<Arc<MemoryModule>> {
        self.modules.get(name).cloned()
    }
}

impl Device for MemoryDevice {
    fn browser(&self, module: &str) -> Result<Option<Arc<dyn Browser>>, TreeError> {
        Ok(self.modules.get(module).map(MemoryModule::browser))
    }

    fn schema_browser(&self, module: &str) -> Result<Option<Arc<dyn Browser>>, TreeError> {
        let Some(module) = self.modules.get(module) else {
            return Ok(None);
        };
        let description = serde_json::to_value(module.schema())
            .map_err(|error| TreeError::internal(error.to_string()))?;
        let browser = StaticBrowser::new(
            SCHEMA_DESCRIPTION_MODULE,
            SCHEMA_DESCRIPTION_NAMESPACE,
            json!({ "module": description }),
        );
        Ok(Some(Arc::new(browser)))
    }

    fn schema_source(&self) -> Option<Arc<dyn SourceOpener>> {
        Some(Arc::new(self.schema_files.clone()))
    }

    fn ui_source(&self) -> Option<Arc<dyn SourceOpener>> {
        if self.ui_files.is_empty() {
            None
        } else {
            Some(Arc::new(self.ui_files.clone()))
        }
    }
}

/// Devices addressed by id.
#[derive(Clone, Default)]
pub struct MemoryDeviceMap {
    devices: BTreeMap<String, Arc<dyn Device>>,
}

impl MemoryDeviceMap {
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `device` under `id`.
    #[must_use]
    pub fn with_device(mut self, id: impl Into<String>, device: Arc<dyn Device>) -> Self {
        self.devices.insert(id.into(), device);
        self
    }
}

impl DeviceMap for MemoryDeviceMap {
    fn device(&self, id: &str) -> Result<Option<Arc<dyn Device>>, TreeError> {
        Ok(self.devices.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ModuleSchema, SchemaNode};
    use crate::scope::RequestScope;
    use crate::selection::TreeData;

    fn device() -> MemoryDevice {
        let schema = ModuleSchema::new("acme", "urn:acme").with_node(SchemaNode::leaf("motd"));
        MemoryDevice::new()
            .with_module(Arc::new(MemoryModule::new(schema)))
            .with_schema_file("acme.yang", "module acme {}")
    }

    #[test]
    fn schema_browser_describes_module() {
        let browser = device()
            .schema_browser("acme")
            .expect("lookup")
            .expect("module registered");
        let node = browser
            .select("module/name", &RequestScope::default())
            .expect("select")
            .expect("name present");
        assert_eq!(node.content(), Ok(json!("acme")));
        assert_eq!(node.meta().module(), SCHEMA_DESCRIPTION_MODULE);
    }

    #[test]
    fn sources_open_by_relative_path() {
        let device = device();
        let schema = device.schema_source().expect("schema source");
        assert_eq!(
            schema.open("/acme.yang").expect("open"),
            Some(b"module acme {}".to_vec())
        );
        assert_eq!(schema.open("other.yang").expect("open"), None);
        assert!(device.ui_source().is_none());
    }

    #[test]
    fn unknown_module_has_no_browser() {
        assert!(device().browser("other").expect("lookup").is_none());
    }
}
