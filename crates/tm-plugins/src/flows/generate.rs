//! Generate override.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tm_config::Deadlines;
use tm_plugin_proto::messages::{FileWrite, GenerateOutput, GenerateRequest};
use tracing::{info, warn};

use super::sink::GenerateSink;
use super::{FLOWS_TARGET, HostContext};
use crate::client::HostClient;
use crate::error::PluginError;
use crate::host::write_confined;
use crate::manifest::InstalledPlugin;

/// Lets the first plugin that overrides generation do it.
///
/// Returns `Ok(None)` when no plugin offers an override, otherwise the
/// exit code the plugin reported. Plugins that fail to start, to report
/// capabilities, or to finish their stream are logged and the next one is
/// tried. A plugin's refused file write counts as a stream failure.
///
/// # Errors
///
/// Fails when `sink` cannot take the output, or when a plugin finishes its
/// stream without an exit code.
pub fn run_generate_override(
    plugins: &[InstalledPlugin],
    host: &HostContext<'_>,
    request: &GenerateRequest,
    deadlines: Deadlines,
    sink: &mut dyn GenerateSink,
) -> Result<Option<i32>, PluginError> {
    let env = host.plugin_env();
    for plugin in plugins {
        let name = plugin.name();
        let mut client = match HostClient::start_plugin(plugin, &env, deadlines) {
            Ok(client) => client,
            Err(error) => {
                warn!(target: FLOWS_TARGET, plugin = name, %error, "failed to start plugin");
                continue;
            }
        };
        match client.client().plugin().get_capabilities() {
            Ok(capabilities) if capabilities.has_generate_override => {}
            Ok(_) => continue,
            Err(error) => {
                warn!(target: FLOWS_TARGET, plugin = name, %error, "failed to fetch capabilities");
                continue;
            }
        }
        info!(target: FLOWS_TARGET, plugin = name, "running generate override");
        let root_dir = root_of(&request.root_dir);
        let mut exit_code = None;
        let outcome = client.client().generate().generate(request, &mut |output| {
            match output {
                GenerateOutput::Stdout(chunk) => {
                    sink.stdout(&chunk).map_err(|err| io_error("<stdout>", err))?;
                }
                GenerateOutput::Stderr(chunk) => {
                    sink.stderr(&chunk).map_err(|err| io_error("<stderr>", err))?;
                }
                GenerateOutput::FileWrite(file) => {
                    if let Some(path) = write_generated(root_dir, file)? {
                        sink.file_written(&path);
                    }
                }
                GenerateOutput::ExitCode(code) => exit_code = Some(code),
            }
            Ok(())
        });
        client.kill();
        match outcome {
            Ok(()) => {}
            Err(error @ PluginError::Io { .. }) => return Err(error),
            Err(error) => {
                warn!(target: FLOWS_TARGET, plugin = name, %error, "generate override failed");
                continue;
            }
        }
        return exit_code.map(Some).ok_or_else(|| PluginError::MissingExitCode {
            name: name.to_owned(),
            method: tm_plugin_proto::methods::GENERATE,
        });
    }
    Ok(None)
}

/// Root directory named in a request; empty means none.
pub(super) fn root_of(root_dir: &str) -> Option<&Path> {
    (!root_dir.is_empty()).then(|| Path::new(root_dir))
}

pub(super) fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> PluginError {
    PluginError::Io {
        path: path.into(),
        source: Arc::new(source),
    }
}

/// Writes a plugin-supplied file confined to `root_dir`.
///
/// Relative paths land under the root; absolute paths must already lie
/// under it. With no root only absolute paths could apply, and those are
/// refused too.
pub(super) fn write_generated(
    root_dir: Option<&Path>,
    file: FileWrite,
) -> Result<Option<PathBuf>, PluginError> {
    if file.path.is_empty() {
        return Ok(None);
    }
    write_confined(root_dir, &file.path, &file.content, file.mode)
        .map(Some)
        .map_err(|source| PluginError::FileRejected {
            path: file.path,
            source,
        })
}
