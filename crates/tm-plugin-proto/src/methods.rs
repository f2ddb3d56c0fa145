//! Fully qualified method names, `Service/Method`.

/// Service answering identity, capability, and shutdown calls.
pub const PLUGIN_SERVICE: &str = "Plugin";
/// Connection-level bundle negotiation.
pub const DISPENSE: &str = "Plugin/Dispense";
/// Returns [`crate::messages::PluginInfo`].
pub const GET_PLUGIN_INFO: &str = "Plugin/GetPluginInfo";
/// Returns [`crate::messages::Capabilities`].
pub const GET_CAPABILITIES: &str = "Plugin/GetCapabilities";
/// Asks the plugin to stop serving.
pub const SHUTDOWN: &str = "Plugin/Shutdown";

/// Service contributing CLI verbs.
pub const COMMAND_SERVICE: &str = "Command";
/// Lists contributed verbs.
pub const GET_COMMANDS: &str = "Command/GetCommands";
/// Runs a verb; server-streaming.
pub const EXECUTE_COMMAND: &str = "Command/ExecuteCommand";

/// Service declaring and processing custom blocks.
pub const HCL_SCHEMA_SERVICE: &str = "HCLSchema";
/// Lists custom block shapes.
pub const GET_HCL_SCHEMA: &str = "HCLSchema/GetHCLSchema";
/// Processes parsed occurrences of a custom block.
pub const PROCESS_PARSED_BLOCKS: &str = "HCLSchema/ProcessParsedBlocks";

/// Service receiving lifecycle hooks.
pub const LIFECYCLE_SERVICE: &str = "Lifecycle";
/// Fired once after initialisation.
pub const POST_INIT: &str = "Lifecycle/PostInit";

/// Service overriding code generation.
pub const GENERATE_SERVICE: &str = "Generate";
/// Runs generation; server-streaming.
pub const GENERATE: &str = "Generate/Generate";

/// Reverse service offered by the host.
pub const HOST_SERVICE: &str = "Host";
/// Returns the project root directory.
pub const GET_ROOT_DIR: &str = "Host/GetRootDir";
/// Returns the user terramate directory.
pub const GET_USER_DIR: &str = "Host/GetUserTerramateDir";
/// Reads a file under the project root.
pub const READ_FILE: &str = "Host/ReadFile";
/// Writes a file under the project root.
pub const WRITE_FILE: &str = "Host/WriteFile";
/// Walks a directory under the project root; server-streaming.
pub const WALK_DIR: &str = "Host/WalkDir";
/// Describes a configuration tree node.
pub const GET_CONFIG_TREE: &str = "Host/GetConfigTree";
/// Reads stack metadata.
pub const GET_STACK_METADATA: &str = "Host/GetStackMetadata";
/// Updates stack metadata.
pub const SET_STACK_METADATA: &str = "Host/SetStackMetadata";

/// Splits `Service/Method` into its service name.
#[must_use]
pub fn service_of(method: &str) -> Option<&str> {
    method.split_once('/').map(|(service, _)| service)
}
