//! Post-init hooks.

use serde::Deserialize;
use tm_config::Deadlines;
use tm_plugin_proto::messages::{ConfigPatch, PostInitRequest, SetStackRequest};
use tm_plugin_proto::service::HostApi;
use tm_plugin_proto::{RpcStatus, methods};
use tracing::{info, warn};

use super::{FLOWS_TARGET, HostContext};
use crate::client::HostClient;
use crate::error::PluginError;
use crate::host::HostService;
use crate::manifest::InstalledPlugin;
use crate::schema::diagnostics_error;

const DEFAULT_PATCH_BLOCK_TYPE: &str = "post_init";

/// Outcome of [`run_post_init`].
#[derive(Debug, Default)]
pub struct PostInitReport {
    /// Plugins whose hook ran.
    pub ran: Vec<String>,
    /// Plugins that could not start or have no hook.
    pub skipped: Vec<String>,
    /// Failures, in plugin order.
    pub errors: Vec<PluginError>,
}

impl PostInitReport {
    /// True when every hook that ran succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the post-init hook of every plugin that has one.
///
/// A failing plugin never stops the others: start failures skip the
/// plugin, and call failures, error diagnostics, and rejected updates are
/// collected in the report.
pub fn run_post_init(
    plugins: &[InstalledPlugin],
    host: &HostContext<'_>,
    deadlines: Deadlines,
) -> PostInitReport {
    let mut report = PostInitReport::default();
    let env = host.plugin_env();
    let root_dir = host
        .service()
        .root_dir()
        .map(|dir| dir.display().to_string())
        .unwrap_or_default();
    for plugin in plugins {
        let name = plugin.name();
        let mut client = match HostClient::start_plugin(plugin, &env, deadlines) {
            Ok(client) => client,
            Err(error) => {
                warn!(target: FLOWS_TARGET, plugin = name, %error, "failed to start plugin");
                report.skipped.push(name.to_owned());
                continue;
            }
        };
        let capabilities = match client.client().plugin().get_capabilities() {
            Ok(capabilities) => capabilities,
            Err(error) => {
                warn!(target: FLOWS_TARGET, plugin = name, %error, "failed to fetch capabilities");
                report.skipped.push(name.to_owned());
                continue;
            }
        };
        if !capabilities.has_post_init_hooks {
            report.skipped.push(name.to_owned());
            continue;
        }
        let outcome = client.client().lifecycle().post_init(&PostInitRequest {
            root_dir: root_dir.clone(),
        });
        client.kill();
        report.ran.push(name.to_owned());
        let response = match outcome {
            Ok(response) => response,
            Err(error) => {
                report.errors.push(error);
                continue;
            }
        };
        if let Some(message) = diagnostics_error(&response.diagnostics) {
            report.errors.push(PluginError::Diagnostics {
                name: name.to_owned(),
                message,
            });
            continue;
        }
        for update in response.stack_updates {
            let request = SetStackRequest {
                path: update.path,
                metadata: update.metadata,
                merge: update.merge,
            };
            if let Err(source) = host.service().set_stack_metadata(request) {
                report.errors.push(PluginError::HostRejected {
                    method: methods::SET_STACK_METADATA.to_owned(),
                    source,
                });
            }
        }
        for patch in response.config_patches {
            if let Err(source) = apply_config_patch(host.service(), name, patch) {
                report.errors.push(PluginError::HostRejected {
                    method: "ConfigPatch".to_owned(),
                    source,
                });
            }
        }
        info!(target: FLOWS_TARGET, plugin = name, "post-init hook applied");
    }
    report
}

#[derive(Deserialize)]
struct PatchTarget {
    #[serde(default)]
    block_type: String,
}

/// Block type a config patch is filed under.
pub(super) fn patch_block_type(data: &[u8]) -> String {
    serde_json::from_slice::<PatchTarget>(data)
        .ok()
        .map(|target| target.block_type)
        .filter(|block_type| !block_type.is_empty())
        .unwrap_or_else(|| DEFAULT_PATCH_BLOCK_TYPE.to_owned())
}

fn apply_config_patch(
    host: &HostService,
    plugin: &str,
    patch: ConfigPatch,
) -> Result<(), RpcStatus> {
    if patch.plugin_data.is_empty() {
        return Ok(());
    }
    if patch.path.is_empty() {
        return Err(RpcStatus::invalid_argument("config patch path is required"));
    }
    let root = host
        .root()
        .ok_or_else(|| RpcStatus::unavailable("configuration is not loaded"))?;
    let project_path = host.to_project_path(&patch.path)?;
    let mut project = root
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let node = project
        .lookup_mut(&project_path)
        .ok_or_else(|| RpcStatus::not_found(format!("config path not found: {}", patch.path)))?;
    let block_type = patch_block_type(&patch.plugin_data);
    node.external.append(plugin, &block_type, patch.plugin_data);
    Ok(())
}
