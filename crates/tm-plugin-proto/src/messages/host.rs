//! Messages of the reverse host service.

use serde::{Deserialize, Serialize};

use super::bytes;

/// Request naming a single path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRequest {
    /// Host path, absolute or relative to the project root.
    #[serde(default)]
    pub path: String,
}

/// Reply to `Host/GetRootDir` and `Host/GetUserTerramateDir`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootDirResponse {
    /// Directory, empty when unknown.
    #[serde(default)]
    pub root_dir: String,
}

/// Request for `Host/ReadFile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFileRequest {
    /// File to read.
    pub path: String,
}

/// Reply to `Host/ReadFile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFileResponse {
    /// File content.
    #[serde(with = "bytes", default)]
    pub content: Vec<u8>,
}

/// Request for `Host/WriteFile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteFileRequest {
    /// File to write.
    pub path: String,
    /// New content.
    #[serde(with = "bytes", default)]
    pub content: Vec<u8>,
    /// Unix permission bits for a new file; zero means `0o644`.
    #[serde(default)]
    pub mode: u32,
}

/// Request for `Host/WalkDir`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkDirRequest {
    /// Directory to walk.
    pub root: String,
    /// Optional glob matched against each entry's base name.
    #[serde(default)]
    pub pattern: String,
}

/// One element of the `Host/WalkDir` stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Slash-separated path relative to the walk root.
    pub path: String,
    /// Whether the entry is a directory.
    #[serde(default)]
    pub is_dir: bool,
}

/// Stack metadata as exchanged with plugins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackMetadata {
    /// Stack name.
    #[serde(default)]
    pub name: String,
    /// Stack description.
    #[serde(default)]
    pub description: String,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Stacks this one runs after.
    #[serde(default)]
    pub after: Vec<String>,
    /// Stacks this one runs before.
    #[serde(default)]
    pub before: Vec<String>,
    /// Stacks pulled in with this one.
    #[serde(default)]
    pub wants: Vec<String>,
    /// Stacks that pull this one in.
    #[serde(default)]
    pub wanted_by: Vec<String>,
    /// Files whose changes mark the stack as changed.
    #[serde(default)]
    pub watch: Vec<String>,
}

/// Reply to `Host/GetConfigTree`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigTreeNode {
    /// Project path of the node.
    pub dir: String,
    /// Whether the node declares a stack.
    #[serde(default)]
    pub is_stack: bool,
    /// Stack metadata; empty for plain directories.
    #[serde(default)]
    pub stack: StackMetadata,
}

/// Request for `Host/SetStackMetadata`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStackRequest {
    /// Stack path.
    pub path: String,
    /// New metadata; absent leaves the stack untouched.
    #[serde(default)]
    pub metadata: Option<StackMetadata>,
    /// Append to existing values instead of replacing them.
    #[serde(default)]
    pub merge: bool,
}
