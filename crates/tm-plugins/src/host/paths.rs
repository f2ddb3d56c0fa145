//! Lexical path confinement for host-service requests.

use std::path::{Component, Path, PathBuf};

use tm_plugin_proto::RpcStatus;
use tm_project::ProjectPath;

const OUTSIDE_ROOT: &str = "path outside root directory";

/// A request path split into the project root and a root-relative rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Project root on the host.
    pub root: PathBuf,
    /// Normalised path below `root`; empty for the root itself.
    pub relative: PathBuf,
}

impl ResolvedPath {
    /// Full host path.
    #[must_use]
    pub fn host_path(&self) -> PathBuf {
        self.root.join(&self.relative)
    }

    /// Path to hand to a directory handle opened at the root.
    #[must_use]
    pub fn dir_relative(&self) -> &Path {
        if self.relative.as_os_str().is_empty() {
            Path::new(".")
        } else {
            &self.relative
        }
    }
}

/// Confines `path` to `root_dir`.
///
/// Relative paths are taken from the root; absolute paths must lie under
/// it. Both are normalised lexically before the check, so `..` cannot
/// climb out.
pub(super) fn resolve(root_dir: Option<&Path>, path: &str) -> Result<ResolvedPath, RpcStatus> {
    if path.is_empty() {
        return Err(RpcStatus::invalid_argument("path is required"));
    }
    let requested = Path::new(path);
    if requested.is_absolute() {
        let root = root_dir.ok_or_else(|| RpcStatus::permission_denied(OUTSIDE_ROOT))?;
        let relative = clean_absolute(requested)
            .strip_prefix(clean_absolute(root))
            .map(Path::to_path_buf)
            .map_err(|_| RpcStatus::permission_denied(OUTSIDE_ROOT))?;
        return Ok(ResolvedPath {
            root: root.to_path_buf(),
            relative,
        });
    }
    let root = root_dir.ok_or_else(|| RpcStatus::invalid_argument("root directory is unknown"))?;
    let relative =
        clean_relative(requested).ok_or_else(|| RpcStatus::permission_denied(OUTSIDE_ROOT))?;
    Ok(ResolvedPath {
        root: root.to_path_buf(),
        relative,
    })
}

/// Project path named by `path`, which may be a host path under the root,
/// an absolute project path, or a root-relative path.
pub(super) fn project_path(root_dir: Option<&Path>, path: &str) -> Result<ProjectPath, RpcStatus> {
    if path.is_empty() || path == "/" {
        return Ok(ProjectPath::root());
    }
    let requested = Path::new(path);
    if requested.is_absolute() {
        if let Some(root) = root_dir {
            let cleaned = clean_absolute(requested);
            if cleaned.starts_with(clean_absolute(root)) {
                return ProjectPath::from_host_path(&clean_absolute(root), &cleaned)
                    .ok_or_else(|| RpcStatus::invalid_argument("invalid path"));
            }
        }
        if !path.starts_with('/') {
            return Err(RpcStatus::invalid_argument("invalid absolute path"));
        }
    }
    Ok(ProjectPath::new(path))
}

/// Normalises an absolute path; `..` at the top stays at the top.
fn clean_absolute(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                cleaned.push(component);
            }
            Component::ParentDir => {
                if cleaned.parent().is_some() {
                    cleaned.pop();
                }
            }
            Component::CurDir => {}
        }
    }
    cleaned
}

/// Normalises a relative path; `None` when `..` climbs above its start.
fn clean_relative(path: &Path) -> Option<PathBuf> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::Prefix(_) | Component::RootDir => return None,
        }
    }
    Some(parts.into_iter().collect())
}
