//! Service contracts implemented by plugins and by the host.
//!
//! Every method returns [`RpcStatus`] on failure so implementations choose
//! the code the caller sees. Streaming methods push elements through an
//! [`OutputSink`] and return once the stream is complete.

use crate::messages::{
    CommandList, CommandOutput, CommandRequest, ConfigTreeNode, DirEntry, GenerateOutput,
    GenerateRequest, HclSchemaList, ParsedBlocksRequest, ParsedBlocksResponse, PluginInfo,
    PostInitRequest, PostInitResponse, ReadFileRequest, ReadFileResponse, SetStackRequest,
    StackMetadata, WalkDirRequest, WriteFileRequest,
};
use crate::status::RpcStatus;

/// Receives the elements of a server stream in order.
pub trait OutputSink<T> {
    /// Sends one element. An error means the peer is gone and the producer
    /// should stop.
    fn send(&mut self, item: T) -> Result<(), RpcStatus>;
}

impl<T> OutputSink<T> for Vec<T> {
    fn send(&mut self, item: T) -> Result<(), RpcStatus> {
        self.push(item);
        Ok(())
    }
}

/// Identity and shutdown handling of a plugin.
pub trait PluginService: Send + Sync {
    /// Static identity; must not block.
    fn get_plugin_info(&self) -> Result<PluginInfo, RpcStatus>;

    /// Called before the host disconnects.
    fn shutdown(&self) -> Result<(), RpcStatus> {
        Ok(())
    }
}

/// Custom CLI verbs.
pub trait CommandService: Send + Sync {
    /// Lists the verbs the plugin contributes.
    fn get_commands(&self) -> Result<CommandList, RpcStatus>;

    /// Runs a verb. The stream must end with exactly one
    /// [`CommandOutput::ExitCode`]; an unknown verb is an error.
    fn execute_command(
        &self,
        request: CommandRequest,
        output: &mut dyn OutputSink<CommandOutput>,
    ) -> Result<(), RpcStatus>;
}

/// Custom configuration blocks.
pub trait HclSchemaService: Send + Sync {
    /// Declares the block shapes the plugin handles.
    fn get_hcl_schema(&self) -> Result<HclSchemaList, RpcStatus>;

    /// Processes parsed occurrences of one block type.
    fn process_parsed_blocks(
        &self,
        request: ParsedBlocksRequest,
    ) -> Result<ParsedBlocksResponse, RpcStatus>;
}

/// Lifecycle hooks.
pub trait LifecycleService: Send + Sync {
    /// Fired once after the project is initialised.
    fn post_init(&self, request: PostInitRequest) -> Result<PostInitResponse, RpcStatus>;
}

/// Code generation override.
pub trait GenerateService: Send + Sync {
    /// Runs generation. The stream must end with
    /// [`GenerateOutput::ExitCode`].
    fn generate(
        &self,
        request: GenerateRequest,
        output: &mut dyn OutputSink<GenerateOutput>,
    ) -> Result<(), RpcStatus>;
}

/// Filesystem and configuration access the host grants to plugins.
pub trait HostApi: Send + Sync {
    /// Project root directory, empty when unknown.
    fn get_root_dir(&self) -> Result<String, RpcStatus>;

    /// User terramate directory, empty when unknown.
    fn get_user_dir(&self) -> Result<String, RpcStatus>;

    /// Reads a file under the project root.
    fn read_file(&self, request: ReadFileRequest) -> Result<ReadFileResponse, RpcStatus>;

    /// Writes a file under the project root.
    fn write_file(&self, request: WriteFileRequest) -> Result<(), RpcStatus>;

    /// Streams the entries below a directory under the project root.
    fn walk_dir(
        &self,
        request: WalkDirRequest,
        output: &mut dyn OutputSink<DirEntry>,
    ) -> Result<(), RpcStatus>;

    /// Describes the configuration node at `path`.
    fn get_config_tree(&self, path: &str) -> Result<ConfigTreeNode, RpcStatus>;

    /// Reads the stack metadata at `path`.
    fn get_stack_metadata(&self, path: &str) -> Result<StackMetadata, RpcStatus>;

    /// Updates the stack metadata at `request.path`.
    fn set_stack_metadata(&self, request: SetStackRequest) -> Result<(), RpcStatus>;
}
