//! Discovery of installed RPC plugins.

use std::fs;
use std::io;
use std::path::Path;

use tm_config::Config;
use tracing::debug;

use crate::error::PluginError;
use crate::manifest::{InstalledPlugin, Manifest, PLUGINS_DIR};

const DISCOVERY_TARGET: &str = "tm_plugins::discovery";

/// Lists the RPC plugins installed under `user_dir`.
///
/// Every directory in `<user_dir>/plugins` must hold a valid manifest; a
/// manifest that cannot be read aborts discovery. Plugins that do not
/// speak the RPC protocol, or that lack a usable CLI binary, are skipped.
/// The result is sorted by plugin name and is empty when the plugins
/// directory does not exist.
pub fn discover_installed(user_dir: &Path) -> Result<Vec<InstalledPlugin>, PluginError> {
    let plugins_dir = user_dir.join(PLUGINS_DIR);
    let entries = match fs::read_dir(&plugins_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(
                target: DISCOVERY_TARGET,
                path = %plugins_dir.display(),
                "no plugins directory"
            );
            return Ok(Vec::new());
        }
        Err(err) => {
            return Err(PluginError::Io {
                path: plugins_dir,
                source: err.into(),
            });
        }
    };

    let mut plugins = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| PluginError::Io {
            path: plugins_dir.clone(),
            source: err.into(),
        })?;
        let plugin_dir = entry.path();
        if !plugin_dir.is_dir() {
            continue;
        }
        let manifest = Manifest::load(&plugin_dir)?;
        if let Some(plugin) = accept(manifest, &plugin_dir) {
            plugins.push(plugin);
        }
    }
    plugins.sort_by(|left, right| left.manifest.name.cmp(&right.manifest.name));
    Ok(plugins)
}

/// Like [`discover_installed`] for the configured user directory, but
/// returns nothing when plugins are disabled.
pub fn discover_enabled(config: &Config) -> Result<Vec<InstalledPlugin>, PluginError> {
    if config.plugins_disabled() {
        debug!(target: DISCOVERY_TARGET, "plugin discovery disabled");
        return Ok(Vec::new());
    }
    discover_installed(&config.user_dir())
}

fn accept(manifest: Manifest, plugin_dir: &Path) -> Option<InstalledPlugin> {
    if !manifest.speaks_rpc() {
        debug!(
            target: DISCOVERY_TARGET,
            plugin = manifest.name.as_str(),
            "skipping plugin without the RPC protocol"
        );
        return None;
    }
    let Some(binary) = manifest.cli_binary() else {
        debug!(
            target: DISCOVERY_TARGET,
            plugin = manifest.name.as_str(),
            "skipping plugin without a relative CLI binary"
        );
        return None;
    };
    let binary_path = plugin_dir.join(binary);
    debug!(
        target: DISCOVERY_TARGET,
        plugin = manifest.name.as_str(),
        binary = %binary_path.display(),
        "discovered plugin"
    );
    Some(InstalledPlugin {
        manifest,
        plugin_dir: plugin_dir.to_path_buf(),
        binary_path,
    })
}

#[cfg(test)]
mod tests;
