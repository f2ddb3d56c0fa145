//! Messages exchanged by the plugin services and the host service.
//!
//! Opaque byte payloads (`plugin_data`, file contents, output chunks) are
//! base64 encoded on the wire. Optional fields default when absent so older
//! plugins that omit them still decode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

mod bytes;
mod host;

pub use self::host::{
    ConfigTreeNode, DirEntry, PathRequest, ReadFileRequest, ReadFileResponse, RootDirResponse,
    SetStackRequest, StackMetadata, WalkDirRequest, WriteFileRequest,
};

/// Request body for calls that take no arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Static identity of a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin name.
    pub name: String,
    /// Plugin version.
    pub version: String,
    /// Product the plugin extends.
    #[serde(default)]
    pub product_name: String,
    /// One-line description.
    #[serde(default)]
    pub description: String,
    /// Host version constraint the plugin was built for.
    #[serde(default)]
    pub compatible_with: String,
}

/// Which optional services a plugin backs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "one flag per optional service mirrors the wire contract"
)]
pub struct Capabilities {
    /// `Command` service is registered.
    #[serde(default)]
    pub has_commands: bool,
    /// `HCLSchema` service is registered.
    #[serde(default)]
    pub has_hcl_schema: bool,
    /// `Lifecycle` service is registered.
    #[serde(default)]
    pub has_post_init_hooks: bool,
    /// `Generate` service is registered.
    #[serde(default)]
    pub has_generate_override: bool,
}

/// Request and reply of the connection-level dispense call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispense {
    /// Bundle name.
    pub name: String,
    /// Services served under the bundle.
    #[serde(default)]
    pub services: Vec<String>,
}

/// A custom CLI verb contributed by a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Verb name.
    pub name: String,
    /// Help text.
    #[serde(default)]
    pub help: String,
}

/// Reply to `Command/GetCommands`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandList {
    /// Contributed verbs.
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

/// Invocation of a plugin command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Verb to run.
    pub command: String,
    /// Positional arguments keyed by name.
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    /// Flags keyed by name.
    #[serde(default)]
    pub flags: BTreeMap<String, String>,
    /// Directory the user invoked the command from.
    #[serde(default)]
    pub working_dir: String,
    /// Project root directory.
    #[serde(default)]
    pub root_dir: String,
}

/// A file the plugin asks the host to write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWrite {
    /// Destination path, absolute or relative to the project root.
    pub path: String,
    /// File content.
    #[serde(with = "bytes", default)]
    pub content: Vec<u8>,
    /// Unix permission bits; zero means `0o644`.
    #[serde(default)]
    pub mode: u32,
}

/// One element of the `Command/ExecuteCommand` stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CommandOutput {
    /// Chunk for the user's stdout.
    Stdout(#[serde(with = "bytes")] Vec<u8>),
    /// Chunk for the user's stderr.
    Stderr(#[serde(with = "bytes")] Vec<u8>),
    /// File to write on the plugin's behalf.
    FileWrite(FileWrite),
    /// Terminal event carrying the command's exit code.
    ExitCode(i32),
}

/// One element of the `Generate/Generate` stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GenerateOutput {
    /// Chunk for the user's stdout.
    Stdout(#[serde(with = "bytes")] Vec<u8>),
    /// Chunk for the user's stderr.
    Stderr(#[serde(with = "bytes")] Vec<u8>),
    /// Generated file.
    FileWrite(FileWrite),
    /// Terminal event carrying the generator's exit code.
    ExitCode(i32),
}

/// Request for `Generate/Generate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Project root directory.
    pub root_dir: String,
    /// Directory generation was requested from.
    #[serde(default)]
    pub working_dir: String,
}

/// How the parser presents occurrences of a custom block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Each occurrence is dispatched separately.
    #[default]
    Unmerged,
    /// All occurrences are merged into one logical block.
    Merged,
    /// Merged per distinct label list.
    MergedLabels,
    /// At most one occurrence exists.
    Unique,
}

impl BlockKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unmerged => "unmerged",
            Self::Merged => "merged",
            Self::MergedLabels => "merged_labels",
            Self::Unique => "unique",
        }
    }
}

/// An attribute a custom block accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HclAttributeSchema {
    /// Attribute name.
    pub name: String,
    /// Free-form type name (`string`, `number`, `list(string)`, ...).
    #[serde(rename = "type", default)]
    pub type_name: String,
    /// Whether the attribute must be present.
    #[serde(default)]
    pub required: bool,
}

/// Shape of a custom block type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HclBlockSchema {
    /// Block type name as written in configuration.
    pub name: String,
    /// Merge behaviour.
    #[serde(default)]
    pub kind: BlockKind,
    /// Number of labels the block takes.
    #[serde(default)]
    pub label_count: u32,
    /// Accepted attributes.
    #[serde(default)]
    pub attributes: Vec<HclAttributeSchema>,
}

/// Reply to `HCLSchema/GetHCLSchema`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HclSchemaList {
    /// Declared block types.
    #[serde(default)]
    pub schemas: Vec<HclBlockSchema>,
}

/// Value of one attribute of a parsed block.
///
/// Literal scalars keep their type; anything else travels as the
/// expression's source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    /// String literal.
    String(String),
    /// Boolean literal.
    Bool(bool),
    /// Number literal with an exact integer value.
    Int(i64),
    /// Any other number literal.
    Float(f64),
    /// Source text of a non-literal expression.
    ExpressionText(String),
}

/// A configuration block as sent to a plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedBlock {
    /// File the block was read from.
    #[serde(default)]
    pub file_path: String,
    /// Block type.
    pub block_type: String,
    /// Label values in source order.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Attribute values by name.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Nested blocks in source order.
    #[serde(default)]
    pub nested_blocks: Vec<Self>,
}

/// Request for `HCLSchema/ProcessParsedBlocks`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedBlocksRequest {
    /// Block type the blocks belong to.
    pub block_type: String,
    /// Blocks to process.
    #[serde(default)]
    pub blocks: Vec<ParsedBlock>,
}

/// Reply to `HCLSchema/ProcessParsedBlocks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedBlocksResponse {
    /// Findings about the blocks.
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    /// Opaque data the host stores on the parse result.
    #[serde(with = "bytes", default)]
    pub plugin_data: Vec<u8>,
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational note.
    #[default]
    Info,
    /// Suspicious but accepted input.
    Warning,
    /// Input that must fail the parse.
    Error,
}

/// A finding reported by a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity.
    #[serde(default)]
    pub severity: Severity,
    /// Short summary.
    pub summary: String,
    /// Optional detail.
    #[serde(default)]
    pub detail: String,
    /// File the finding refers to.
    #[serde(default)]
    pub file: String,
    /// One-based line number.
    #[serde(default)]
    pub line: u32,
    /// One-based column number.
    #[serde(default)]
    pub column: u32,
}

impl Diagnostic {
    /// Creates an error-severity diagnostic.
    #[must_use]
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            ..Self::default()
        }
    }

    /// Creates a warning-severity diagnostic.
    #[must_use]
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            ..Self::default()
        }
    }

    /// Attaches a detail message.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Attaches a source location.
    #[must_use]
    pub fn with_location(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self.column = column;
        self
    }

    /// Returns true for error-severity diagnostics.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

/// Request for `Lifecycle/PostInit`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostInitRequest {
    /// Project root directory.
    pub root_dir: String,
}

/// Stack metadata change requested by a post-init hook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackUpdate {
    /// Project or host path of the stack.
    pub path: String,
    /// New metadata.
    #[serde(default)]
    pub metadata: Option<StackMetadata>,
    /// Append to existing values instead of replacing them.
    #[serde(default)]
    pub merge: bool,
}

/// Plugin data attached to a configuration node by a post-init hook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPatch {
    /// Project or host path of the node.
    pub path: String,
    /// Opaque data; a JSON object may name its `block_type`.
    #[serde(with = "bytes", default)]
    pub plugin_data: Vec<u8>,
}

/// Reply to `Lifecycle/PostInit`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostInitResponse {
    /// Findings from the hook.
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    /// Stack metadata changes to apply.
    #[serde(default)]
    pub stack_updates: Vec<StackUpdate>,
    /// Plugin data to attach to configuration nodes.
    #[serde(default)]
    pub config_patches: Vec<ConfigPatch>,
}

#[cfg(test)]
mod tests;
