//! JSON description of an in-memory device, loaded by the daemon at start.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::device::MemoryDevice;
use super::module::MemoryModule;
use super::schema::ModuleSchema;
use crate::errors::TreeError;

/// Errors raised while turning a manifest into a device.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest is not valid JSON or has the wrong shape.
    #[error("failed to parse device manifest: {0}")]
    Parse(#[from] serde_json::Error),
    /// Seed data or an action path does not match its module schema.
    #[error("invalid module '{module}': {source}")]
    Module {
        /// Module being loaded.
        module: String,
        /// Underlying failure.
        #[source]
        source: TreeError,
    },
}

/// One module entry of a [`DeviceManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestModule {
    /// Module schema.
    pub schema: ModuleSchema,
    /// Initial data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Canned output per action path; an action listed here returns the
    /// value (or nothing for `null`) on every invocation.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub responses: BTreeMap<String, Value>,
}

/// Serializable description of a [`MemoryDevice`].
///
/// ```json
/// {
///   "modules": [{
///     "schema": {"name": "acme", "namespace": "urn:acme", "nodes": [
///       {"kind": "leaf", "ident": "motd"}
///     ]},
///     "data": {"motd": "hello"}
///   }],
///   "schema_files": {"acme.yang": "module acme { ... }"}
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceManifest {
    /// Modules served by the device.
    #[serde(default)]
    pub modules: Vec<ManifestModule>,
    /// Raw schema files by relative path.
    #[serde(default)]
    pub schema_files: BTreeMap<String, String>,
    /// Web UI files by relative path.
    #[serde(default)]
    pub ui_files: BTreeMap<String, String>,
}

impl DeviceManifest {
    /// Parses a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] for malformed JSON.
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the described device.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Module`] when seed data or a response path
    /// does not fit its schema.
    pub fn into_device(self) -> Result<MemoryDevice, ManifestError> {
        let mut device = MemoryDevice::new();
        for entry in self.modules {
            let name = entry.schema.name.clone();
            let module = build_module(entry).map_err(|source| ManifestError::Module {
                module: name,
                source,
            })?;
            device = device.with_module(Arc::new(module));
        }
        for (path, text) in self.schema_files {
            device = device.with_schema_file(&path, text);
        }
        for (path, text) in self.ui_files {
            device = device.with_ui_file(&path, text);
        }
        Ok(device)
    }
}

fn build_module(entry: ManifestModule) -> Result<MemoryModule, TreeError> {
    let mut module = MemoryModule::new(entry.schema);
    if let Some(data) = entry.data {
        module = module.with_data(data)?;
    }
    for (path, response) in entry.responses {
        module.on_action(&path, move |_| {
            Ok(Some(response.clone()).filter(|value| !value.is_null()))
        })?;
    }
    Ok(module)
}
