//! The host service: filesystem and configuration access for plugins.
//!
//! Plugins reach the host through the endpoint in
//! [`HOST_ADDR_ENV`](tm_plugin_proto::handshake::HOST_ADDR_ENV). Every file
//! operation is confined to the project root: paths are normalised and
//! checked lexically, then opened through a `cap_std` directory handle so
//! symlinks cannot lead outside either. Configuration calls read and update
//! the shared [`ProjectRoot`](tm_project::ProjectRoot).

mod client;
mod metadata;
mod paths;
mod server;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use cap_std::ambient_authority;
use cap_std::fs::{Dir, OpenOptions};
use glob::Pattern;
use tm_plugin_proto::RpcStatus;
use tm_plugin_proto::messages::{
    ConfigTreeNode, DirEntry, ReadFileRequest, ReadFileResponse, SetStackRequest, StackMetadata,
    WalkDirRequest, WriteFileRequest,
};
use tm_plugin_proto::service::{HostApi, OutputSink};
use tm_project::{ProjectNode, ProjectPath, ProjectRoot, SharedRoot};
use tracing::debug;
use walkdir::WalkDir;

pub use self::client::HostServiceClient;
pub use self::metadata::{apply_stack_metadata, stack_metadata};
pub use self::paths::ResolvedPath;
pub use self::server::HostServer;

const HOST_TARGET: &str = "tm_plugins::host";
const DEFAULT_FILE_MODE: u32 = 0o644;

#[derive(Debug, Default)]
struct HostState {
    root: Option<SharedRoot>,
    root_dir: Option<PathBuf>,
    user_dir: Option<PathBuf>,
}

/// Serves `Host/*` calls against a project.
///
/// The project may be attached after the server starts; until then file
/// calls with relative paths and every configuration call fail.
#[derive(Debug, Default)]
pub struct HostService {
    state: RwLock<HostState>,
}

impl HostService {
    /// Service for `root`, which may still be unknown.
    #[must_use]
    pub fn new(root: Option<SharedRoot>, user_dir: Option<PathBuf>) -> Self {
        let root_dir = root.as_ref().map(|shared| {
            shared
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .host_dir()
                .to_path_buf()
        });
        Self {
            state: RwLock::new(HostState {
                root,
                root_dir,
                user_dir,
            }),
        }
    }

    /// Service for a project already loaded from `root_dir`.
    #[must_use]
    pub fn for_project(project: ProjectRoot, user_dir: Option<PathBuf>) -> Self {
        Self::new(Some(project.shared()), user_dir)
    }

    /// Replaces the project.
    pub fn set_root(&self, root: Option<SharedRoot>, root_dir: Option<PathBuf>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.root = root;
        state.root_dir = root_dir;
    }

    /// Project root on the host.
    #[must_use]
    pub fn root_dir(&self) -> Option<PathBuf> {
        self.read_state().root_dir.clone()
    }

    /// User terramate directory.
    #[must_use]
    pub fn user_dir(&self) -> Option<PathBuf> {
        self.read_state().user_dir.clone()
    }

    /// Loaded project, if any.
    #[must_use]
    pub fn root(&self) -> Option<SharedRoot> {
        self.read_state().root.clone()
    }

    /// Confines a request path to the project root.
    ///
    /// # Errors
    ///
    /// `invalid_argument` for an empty path or a relative path with no
    /// root; `permission_denied` for anything outside the root.
    pub fn resolve_path(&self, path: &str) -> Result<ResolvedPath, RpcStatus> {
        paths::resolve(self.read_state().root_dir.as_deref(), path)
    }

    /// Project path named by a request path.
    pub fn to_project_path(&self, path: &str) -> Result<ProjectPath, RpcStatus> {
        paths::project_path(self.read_state().root_dir.as_deref(), path)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, HostState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Project and project path for a configuration call.
    fn locate(&self, path: &str) -> Result<(SharedRoot, ProjectPath), RpcStatus> {
        let state = self.read_state();
        let root = state
            .root
            .clone()
            .ok_or_else(|| RpcStatus::unavailable("configuration is not loaded"))?;
        let project_path = paths::project_path(state.root_dir.as_deref(), path)?;
        Ok((root, project_path))
    }

    fn with_node<T>(
        &self,
        path: &str,
        missing: &str,
        read: impl FnOnce(&ProjectNode) -> T,
    ) -> Result<T, RpcStatus> {
        let (root, project_path) = self.locate(path)?;
        let project = root.read().unwrap_or_else(PoisonError::into_inner);
        project
            .lookup(&project_path)
            .map(read)
            .ok_or_else(|| RpcStatus::not_found(missing))
    }
}

fn open_root(resolved: &ResolvedPath) -> Result<Dir, RpcStatus> {
    Dir::open_ambient_dir(&resolved.root, ambient_authority())
        .map_err(|err| io_status(&resolved.root, &err))
}

/// Writes `content` at `path`, confined to `root_dir` like a host-service
/// write, and returns the host path written.
///
/// # Errors
///
/// The same statuses as [`HostApi::write_file`]: `invalid_argument` for an
/// empty path, the root itself, or a relative path with no root, and
/// `permission_denied` for anything outside the root.
pub(crate) fn write_confined(
    root_dir: Option<&Path>,
    path: &str,
    content: &[u8],
    mode: u32,
) -> Result<PathBuf, RpcStatus> {
    let resolved = paths::resolve(root_dir, path)?;
    write_resolved(&resolved, content, mode)?;
    Ok(resolved.host_path())
}

fn write_resolved(resolved: &ResolvedPath, content: &[u8], mode: u32) -> Result<(), RpcStatus> {
    if resolved.relative.as_os_str().is_empty() {
        return Err(RpcStatus::invalid_argument("cannot write the root directory"));
    }
    let dir = open_root(resolved)?;
    if let Some(parent) = resolved.relative.parent()
        && !parent.as_os_str().is_empty()
    {
        dir.create_dir_all(parent)
            .map_err(|err| io_status(parent, &err))?;
    }
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use cap_std::fs::OpenOptionsExt;
        options.mode(if mode == 0 { DEFAULT_FILE_MODE } else { mode });
    }
    #[cfg(not(unix))]
    let _mode = mode;
    let mut file = dir
        .open_with(&resolved.relative, &options)
        .map_err(|err| io_status(&resolved.relative, &err))?;
    io::Write::write_all(&mut file, content).map_err(|err| io_status(&resolved.relative, &err))
}

fn io_status(path: &Path, error: &io::Error) -> RpcStatus {
    match error.kind() {
        io::ErrorKind::NotFound => {
            RpcStatus::not_found(format!("{}: no such file or directory", path.display()))
        }
        io::ErrorKind::PermissionDenied => RpcStatus::permission_denied(format!(
            "{}: {error}",
            path.display()
        )),
        _ => RpcStatus::internal(format!("{}: {error}", path.display())),
    }
}

impl HostApi for HostService {
    fn get_root_dir(&self) -> Result<String, RpcStatus> {
        Ok(self
            .root_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default())
    }

    fn get_user_dir(&self) -> Result<String, RpcStatus> {
        Ok(self
            .user_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default())
    }

    fn read_file(&self, request: ReadFileRequest) -> Result<ReadFileResponse, RpcStatus> {
        let resolved = self.resolve_path(&request.path)?;
        let dir = open_root(&resolved)?;
        let content = dir
            .read(resolved.dir_relative())
            .map_err(|err| io_status(&resolved.relative, &err))?;
        debug!(
            target: HOST_TARGET,
            path = %resolved.relative.display(),
            bytes = content.len(),
            "plugin read file"
        );
        Ok(ReadFileResponse { content })
    }

    fn write_file(&self, request: WriteFileRequest) -> Result<(), RpcStatus> {
        let resolved = self.resolve_path(&request.path)?;
        write_resolved(&resolved, &request.content, request.mode)?;
        debug!(
            target: HOST_TARGET,
            path = %resolved.relative.display(),
            bytes = request.content.len(),
            "plugin wrote file"
        );
        Ok(())
    }

    fn walk_dir(
        &self,
        request: WalkDirRequest,
        output: &mut dyn OutputSink<DirEntry>,
    ) -> Result<(), RpcStatus> {
        let resolved = self.resolve_path(&request.root)?;
        let pattern = match request.pattern.trim() {
            "" => None,
            text => Some(Pattern::new(text).map_err(|err| {
                RpcStatus::invalid_argument(format!("invalid pattern '{text}': {err}"))
            })?),
        };
        // The walk itself runs on host paths; check the start through the
        // capability handle first so a symlinked root cannot escape.
        let dir = open_root(&resolved)?;
        let start = dir
            .metadata(resolved.dir_relative())
            .map_err(|err| io_status(&resolved.relative, &err))?;
        if !start.is_dir() {
            return Err(RpcStatus::invalid_argument(format!(
                "{} is not a directory",
                resolved.relative.display()
            )));
        }
        let walk_root = resolved.host_path();
        let walker = WalkDir::new(&walk_root)
            .follow_links(false)
            .follow_root_links(false)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|err| {
                RpcStatus::internal(format!("walking {}: {err}", resolved.relative.display()))
            })?;
            if let Some(pattern) = &pattern
                && !pattern.matches(&entry.file_name().to_string_lossy())
            {
                continue;
            }
            output.send(DirEntry {
                path: slash_relative(&walk_root, entry.path()),
                is_dir: entry.file_type().is_dir(),
            })?;
        }
        Ok(())
    }

    fn get_config_tree(&self, path: &str) -> Result<ConfigTreeNode, RpcStatus> {
        self.with_node(path, "configuration path not found", |node| ConfigTreeNode {
            dir: node.dir.to_string(),
            is_stack: node.is_stack(),
            stack: stack_metadata(node.stack.as_ref()),
        })
    }

    fn get_stack_metadata(&self, path: &str) -> Result<StackMetadata, RpcStatus> {
        self.with_node(path, "stack path not found", |node| {
            stack_metadata(node.stack.as_ref())
        })
    }

    fn set_stack_metadata(&self, request: SetStackRequest) -> Result<(), RpcStatus> {
        let (root, project_path) = self.locate(&request.path)?;
        let mut project = root.write().unwrap_or_else(PoisonError::into_inner);
        let node = project
            .lookup_mut(&project_path)
            .ok_or_else(|| RpcStatus::not_found("stack path not found"))?;
        let stack = node.stack.get_or_insert_with(Default::default);
        if let Some(metadata) = &request.metadata {
            apply_stack_metadata(stack, metadata, request.merge);
            debug!(
                target: HOST_TARGET,
                stack = %project_path,
                merge = request.merge,
                "plugin updated stack metadata"
            );
        }
        Ok(())
    }
}

fn slash_relative(root: &Path, path: &Path) -> String {
    let Ok(relative) = path.strip_prefix(root) else {
        return path.display().to_string();
    };
    let segments: Vec<_> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect();
    if segments.is_empty() {
        ".".to_owned()
    } else {
        segments.join("/")
    }
}

#[cfg(test)]
mod tests;
