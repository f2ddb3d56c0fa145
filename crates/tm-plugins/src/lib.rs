//! Host-side plugin machinery for terramate.
//!
//! Plugins are separate executables that the host discovers through
//! manifests in the user directory, launches on demand, and talks to over a
//! local socket using the contract in [`tm_plugin_proto`]. A plugin backs
//! any subset of five services (Plugin, Command, HCLSchema, Lifecycle,
//! Generate) and may call back into the host through the [`host`] service,
//! which confines all filesystem access to the project root.
//!
//! # Architecture
//!
//! * [`manifest`] and [`discovery`] find installed plugins.
//! * [`client`] launches a plugin, completes the handshake, and owns the
//!   process until it is killed.
//! * [`server`] is the plugin-side adapter: plugin binaries register their
//!   service implementations and call [`server::PluginServer::serve`].
//! * [`schema`] turns a plugin's declared block schemas into parser
//!   handlers that forward parsed blocks to the plugin.
//! * [`host`] implements the callback service and its socket server.
//! * [`flows`] drives post-init hooks, generate overrides, and commands.
//!
//! # Example
//!
//! ```rust,no_run
//! use tm_config::Config;
//! use tm_plugins::discovery::discover_enabled;
//!
//! # fn main() -> Result<(), tm_plugins::PluginError> {
//! for plugin in discover_enabled(&Config::default())? {
//!     println!("{} {}", plugin.manifest.name, plugin.binary_path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod discovery;
pub mod error;
pub mod flows;
pub mod host;
pub mod manifest;
pub mod schema;
pub mod server;

#[cfg(test)]
mod tests;

pub use self::client::{HostClient, PluginClient, kill_client};
pub use self::discovery::{discover_enabled, discover_installed};
pub use self::error::PluginError;
pub use self::host::{HostServer, HostService, HostServiceClient};
pub use self::manifest::{Binary, BinaryKind, InstalledPlugin, Manifest, Protocol};
pub use self::server::{PluginServer, ServeError};
