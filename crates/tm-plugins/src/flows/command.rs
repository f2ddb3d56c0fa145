//! Plugin commands.

use tm_plugin_proto::messages::{CommandOutput, CommandRequest};
use tm_plugin_proto::methods;
use tracing::debug;

use super::FLOWS_TARGET;
use super::generate::{io_error, root_of, write_generated};
use super::sink::GenerateSink;
use crate::client::HostClient;
use crate::error::PluginError;

/// Runs `request.command` on a started plugin and returns its exit code.
///
/// Output chunks go to `sink`; file writes are confined to
/// `request.root_dir` and refused when it is empty.
///
/// # Errors
///
/// [`PluginError::UnknownCommand`] when the plugin does not list the
/// command, [`PluginError::MissingExitCode`] when the stream ends without
/// one, and call failures otherwise.
pub fn execute_command(
    client: &HostClient,
    request: &CommandRequest,
    sink: &mut dyn GenerateSink,
) -> Result<i32, PluginError> {
    let plugin = client.client();
    let commands = plugin.command().get_commands()?;
    if !commands
        .commands
        .iter()
        .any(|command| command.name == request.command)
    {
        return Err(PluginError::UnknownCommand {
            name: client.name().to_owned(),
            command: request.command.clone(),
        });
    }
    debug!(
        target: FLOWS_TARGET,
        plugin = client.name(),
        command = request.command.as_str(),
        "executing plugin command"
    );
    let root_dir = root_of(&request.root_dir);
    let mut exit_code = None;
    plugin.command().execute_command(request, &mut |output| {
        match output {
            CommandOutput::Stdout(chunk) => {
                sink.stdout(&chunk).map_err(|err| io_error("<stdout>", err))?;
            }
            CommandOutput::Stderr(chunk) => {
                sink.stderr(&chunk).map_err(|err| io_error("<stderr>", err))?;
            }
            CommandOutput::FileWrite(file) => {
                if let Some(path) = write_generated(root_dir, file)? {
                    sink.file_written(&path);
                }
            }
            CommandOutput::ExitCode(code) => exit_code = Some(code),
        }
        Ok(())
    })?;
    exit_code.ok_or_else(|| PluginError::MissingExitCode {
        name: client.name().to_owned(),
        method: methods::EXECUTE_COMMAND,
    })
}
