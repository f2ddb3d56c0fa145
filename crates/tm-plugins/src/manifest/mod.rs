//! Plugin manifests describing installed plugins.
//!
//! Each installed plugin owns a directory `<user_dir>/plugins/<name>/`
//! holding a `manifest.json` and the plugin's executables. Binary paths in
//! the manifest are relative to that directory.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::PluginError;

/// File name of a plugin manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Name of the folder holding installed plugins inside the user directory.
pub const PLUGINS_DIR: &str = "plugins";

/// Directory of the plugin `name` inside `user_dir`.
#[must_use]
pub fn plugin_dir(user_dir: &Path, name: &str) -> PathBuf {
    user_dir.join(PLUGINS_DIR).join(name)
}

/// Role of an executable shipped with a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryKind {
    /// Command-line executable launched as the RPC plugin.
    Cli,
    /// Language-server executable.
    Ls,
}

/// An executable listed in a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binary {
    /// Path relative to the plugin directory.
    pub path: String,
    /// Checksum recorded at install time.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
    /// Detached signature recorded at install time.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,
    /// Key the signature was made with.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub public_key: String,
}

/// Protocol a plugin speaks.
///
/// `grpc` and its legacy spelling `rpc` both select the RPC plugin
/// protocol.
///
/// # Example
///
/// ```
/// use tm_plugins::Protocol;
///
/// let protocol: Protocol = serde_json::from_str("\"rpc\"").expect("decode");
/// assert_eq!(protocol, Protocol::Grpc);
/// assert_eq!(serde_json::to_string(&protocol).expect("encode"), "\"grpc\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
    /// The RPC plugin protocol.
    Grpc,
    /// Any other protocol; such plugins are not launched by this host.
    Other(String),
}

impl Protocol {
    /// Parses a protocol name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if is_rpc_name(name) {
            Self::Grpc
        } else {
            Self::Other(name.to_owned())
        }
    }

    /// Canonical name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Grpc => "grpc",
            Self::Other(name) => name,
        }
    }
}

fn is_rpc_name(name: &str) -> bool {
    matches!(name, "grpc" | "rpc")
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Protocol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Protocol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// Declarative description of an installed plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Plugin name; also the name of its directory.
    pub name: String,
    /// Installed version.
    pub version: String,
    /// Plugin type recorded by the installer.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub plugin_type: String,
    /// Protocol the plugin speaks, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    /// Version constraint on the host.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub compatible_with: String,
    /// Executables by role.
    #[serde(default)]
    pub binaries: BTreeMap<BinaryKind, Binary>,
    /// Registry the plugin was installed from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub registry: String,
    /// Free-form installer metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Manifest {
    /// Creates a manifest for an RPC plugin with a CLI binary.
    #[must_use]
    pub fn rpc(name: impl Into<String>, version: impl Into<String>, cli_path: &str) -> Self {
        let mut binaries = BTreeMap::new();
        binaries.insert(
            BinaryKind::Cli,
            Binary {
                path: cli_path.to_owned(),
                ..Binary::default()
            },
        );
        Self {
            name: name.into(),
            version: version.into(),
            plugin_type: String::new(),
            protocol: Some(Protocol::Grpc),
            compatible_with: String::new(),
            binaries,
            registry: String::new(),
            metadata: Map::new(),
        }
    }

    /// Reads and validates `manifest.json` in `plugin_dir`.
    pub fn load(plugin_dir: &Path) -> Result<Self, PluginError> {
        let path = plugin_dir.join(MANIFEST_FILE);
        let invalid = |message: String| PluginError::Manifest {
            path: path.clone(),
            message,
        };
        let text = fs::read_to_string(&path).map_err(|err| invalid(err.to_string()))?;
        let manifest: Self = serde_json::from_str(&text).map_err(|err| invalid(err.to_string()))?;
        manifest.validate().map_err(invalid)?;
        Ok(manifest)
    }

    /// Writes the manifest as pretty JSON into `plugin_dir`.
    pub fn save(&self, plugin_dir: &Path) -> Result<(), PluginError> {
        let path = plugin_dir.join(MANIFEST_FILE);
        let text = serde_json::to_string_pretty(self).map_err(|err| PluginError::Manifest {
            path: path.clone(),
            message: err.to_string(),
        })?;
        fs::create_dir_all(plugin_dir)
            .and_then(|()| fs::write(&path, text))
            .map_err(|err| PluginError::Io {
                path,
                source: err.into(),
            })
    }

    /// Checks the fields every manifest must carry.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("plugin name must not be empty".to_owned());
        }
        if self.version.trim().is_empty() {
            return Err(format!("plugin '{}' has no version", self.name));
        }
        Ok(())
    }

    /// True when the plugin speaks the RPC protocol, declared either
    /// directly or through the legacy `protocol` metadata key.
    #[must_use]
    pub fn speaks_rpc(&self) -> bool {
        let declared = self.protocol == Some(Protocol::Grpc);
        let legacy = self
            .metadata
            .get("protocol")
            .and_then(Value::as_str)
            .is_some_and(is_rpc_name);
        declared || legacy
    }

    /// Relative path of the CLI binary, when it is usable.
    ///
    /// The path must be non-empty and relative to the plugin directory.
    #[must_use]
    pub fn cli_binary(&self) -> Option<&str> {
        let path = self.binaries.get(&BinaryKind::Cli)?.path.trim();
        if path.is_empty() || Path::new(path).is_absolute() {
            return None;
        }
        Some(path)
    }
}

/// A discovered plugin ready to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPlugin {
    /// The plugin's manifest.
    pub manifest: Manifest,
    /// Directory holding the manifest.
    pub plugin_dir: PathBuf,
    /// Absolute path of the CLI binary.
    pub binary_path: PathBuf,
}

impl InstalledPlugin {
    /// Plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.manifest.name
    }
}

#[cfg(test)]
mod tests;
