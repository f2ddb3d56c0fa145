//! Launching plugin processes and talking to them.
//!
//! [`HostClient::start`] spawns the plugin binary with the handshake cookie
//! in its environment, waits for the handshake line on stdout, connects to
//! the advertised socket, and asks for the service bundle. No partially
//! started client is ever returned: every failure kills and reaps the
//! child first. A started client owns its process until [`HostClient::kill`]
//! or drop.

mod process;
mod typed;

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Child;

use tm_config::Deadlines;
use tm_plugin_proto::handshake::PLUGIN_BUNDLE;
use tm_plugin_proto::messages::Dispense;
use tm_plugin_proto::{RpcConnection, methods};
use tracing::{debug, info};

use crate::error::PluginError;
use crate::manifest::InstalledPlugin;

pub use self::typed::{
    CommandClient, GenerateClient, HclSchemaClient, LifecycleClient, PluginClient,
    PluginInfoClient,
};

const CLIENT_TARGET: &str = "tm_plugins::client";

/// A running plugin process and the connection to it.
#[derive(Debug)]
pub struct HostClient {
    name: String,
    child: Option<Child>,
    client: PluginClient,
}

impl HostClient {
    /// Starts the plugin at `binary_path`.
    ///
    /// The child inherits the host environment plus `extra_env` and the
    /// handshake cookie. Stdin is closed; stdout carries the handshake and
    /// stderr is forwarded to the host log.
    ///
    /// # Errors
    ///
    /// Fails when the binary cannot be spawned, exits or times out before
    /// the handshake, sends a malformed or incompatible handshake, refuses
    /// the connection, or dispenses a different bundle.
    pub fn start(
        binary_path: &Path,
        extra_env: &BTreeMap<String, String>,
        deadlines: Deadlines,
    ) -> Result<Self, PluginError> {
        let name = binary_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("plugin")
            .to_owned();
        Self::start_named(&name, binary_path, extra_env, deadlines)
    }

    /// Starts a discovered plugin under its manifest name.
    pub fn start_plugin(
        plugin: &InstalledPlugin,
        extra_env: &BTreeMap<String, String>,
        deadlines: Deadlines,
    ) -> Result<Self, PluginError> {
        Self::start_named(plugin.name(), &plugin.binary_path, extra_env, deadlines)
    }

    /// Starts the plugin with no extra environment and default deadlines.
    pub fn start_default(binary_path: &Path) -> Result<Self, PluginError> {
        Self::start(binary_path, &BTreeMap::new(), Deadlines::default())
    }

    fn start_named(
        name: &str,
        binary_path: &Path,
        extra_env: &BTreeMap<String, String>,
        deadlines: Deadlines,
    ) -> Result<Self, PluginError> {
        let mut child = process::spawn(name, binary_path, extra_env)?;
        match connect(name, &mut child, deadlines) {
            Ok(client) => {
                info!(
                    target: CLIENT_TARGET,
                    plugin = name,
                    pid = child.id(),
                    "plugin started"
                );
                Ok(Self {
                    name: name.to_owned(),
                    child: Some(child),
                    client,
                })
            }
            Err(error) => {
                process::terminate(name, &mut child);
                Err(error)
            }
        }
    }

    /// Plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Typed access to the plugin's services.
    #[must_use]
    pub const fn client(&self) -> &PluginClient {
        &self.client
    }

    /// Process id, while the process is owned.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Stops the plugin. Safe to call repeatedly.
    ///
    /// Sends a best-effort `Plugin/Shutdown`, closes the connection, waits
    /// briefly for the process to exit, and kills it otherwise. Failures are
    /// logged, never returned.
    pub fn kill(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(error) = self.client.plugin().shutdown() {
            debug!(
                target: CLIENT_TARGET,
                plugin = self.name.as_str(),
                %error,
                "shutdown request failed"
            );
        }
        self.client.close();
        process::stop(&self.name, &mut child);
    }
}

impl Drop for HostClient {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Kills `client` when there is one.
pub fn kill_client(client: Option<&mut HostClient>) {
    if let Some(client) = client {
        client.kill();
    }
}

fn connect(
    name: &str,
    child: &mut Child,
    deadlines: Deadlines,
) -> Result<PluginClient, PluginError> {
    let line = process::read_handshake(name, child, deadlines.start)?;
    debug!(
        target: CLIENT_TARGET,
        plugin = name,
        endpoint = %line.endpoint(),
        "handshake received"
    );
    let rpc_error = |source| PluginError::from_rpc(name, source, deadlines.call.as_secs());
    let mut connection = RpcConnection::connect(line.endpoint()).map_err(rpc_error)?;
    connection
        .set_read_timeout(Some(deadlines.call))
        .map_err(rpc_error)?;
    let dispensed: Dispense = connection
        .call(
            methods::DISPENSE,
            &Dispense {
                name: PLUGIN_BUNDLE.to_owned(),
                services: Vec::new(),
            },
        )
        .map_err(rpc_error)?;
    if dispensed.name != PLUGIN_BUNDLE {
        return Err(PluginError::BundleMismatch {
            name: name.to_owned(),
            expected: PLUGIN_BUNDLE.to_owned(),
            actual: dispensed.name,
        });
    }
    debug!(
        target: CLIENT_TARGET,
        plugin = name,
        services = ?dispensed.services,
        "bundle dispensed"
    );
    Ok(PluginClient::new(name, connection, deadlines))
}
