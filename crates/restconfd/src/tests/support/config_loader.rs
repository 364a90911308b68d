//! Configuration loaders for bootstrap scenarios.

use std::ffi::OsString;
use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use restconf_config::{Config, ListenEndpoint};
use serde_json::json;
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Loader whose configuration points at a manifest in a temporary directory.
pub struct ManifestConfigLoader {
    _dir: TempDir,
    manifest: Utf8PathBuf,
}

impl ManifestConfigLoader {
    /// Writes a small valid manifest serving `acme:motd`.
    pub fn valid() -> Self {
        let loader = Self::empty();
        let manifest = json!({
            "modules": [{
                "schema": {"name": "acme", "namespace": "urn:acme", "nodes": [
                    {"kind": "leaf", "ident": "motd"}
                ]},
                "data": {"motd": "hello"}
            }]
        });
        fs::write(&loader.manifest, manifest.to_string()).expect("write manifest");
        loader
    }

    /// Writes a manifest whose seed data does not fit its schema.
    pub fn invalid() -> Self {
        let loader = Self::empty();
        let manifest = json!({
            "modules": [{
                "schema": {"name": "acme", "namespace": "urn:acme", "nodes": []},
                "data": {"unknown": 1}
            }]
        });
        fs::write(&loader.manifest, manifest.to_string()).expect("write manifest");
        loader
    }

    /// Points at a manifest that does not exist.
    pub fn missing() -> Self {
        Self::empty()
    }

    fn empty() -> Self {
        let dir = TempDir::new().expect("temporary directory");
        let manifest = Utf8PathBuf::from_path_buf(dir.path().join("device.json"))
            .expect("temporary path is UTF-8");
        Self {
            _dir: dir,
            manifest,
        }
    }
}

impl ConfigLoader for ManifestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            listen: ListenEndpoint::tcp("127.0.0.1", 0),
            log_filter: "warn".to_owned(),
            device_manifest: Some(self.manifest.clone()),
            web_ui: Some("/ui/index.html".to_owned()),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an invalid listen endpoint on the command
/// line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("restconfd"),
            OsString::from("--listen"),
            OsString::from("gopher://nowhere"),
        ];
        Config::load_from_iter(args)
    }
}
