//! Configuration tree loaded from a project directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tm_hcl::{ExternalData, syntax};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::ProjectError;
use crate::path::ProjectPath;
use crate::stack::StackDecl;

const ROOT_TARGET: &str = "tm_project::root";
const CONFIG_SUFFIX: &str = ".tm.hcl";

/// A loaded project shared between the host and its services.
pub type SharedRoot = Arc<RwLock<ProjectRoot>>;

/// One directory of the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectNode {
    /// Project path of the directory.
    pub dir: ProjectPath,
    /// Directory on the host filesystem.
    pub host_dir: PathBuf,
    /// Stack declared in the directory, if any.
    pub stack: Option<StackDecl>,
    /// Plugin data attached to the directory.
    pub external: ExternalData,
}

impl ProjectNode {
    fn new(dir: ProjectPath, host_dir: PathBuf) -> Self {
        Self {
            dir,
            host_dir,
            stack: None,
            external: ExternalData::new(),
        }
    }

    /// True when the directory declares a stack.
    #[must_use]
    pub const fn is_stack(&self) -> bool {
        self.stack.is_some()
    }
}

/// The configuration tree: every directory under the root, keyed by
/// project path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot {
    host_dir: PathBuf,
    nodes: BTreeMap<ProjectPath, ProjectNode>,
}

impl ProjectRoot {
    /// Loads the tree below `host_root`.
    ///
    /// Hidden directories (leading `.`) are skipped. A directory becomes a
    /// stack when one of its `*.tm.hcl` files declares a top-level `stack`
    /// block.
    pub fn load(host_root: &Path) -> Result<Self, ProjectError> {
        if !host_root.is_dir() {
            return Err(ProjectError::NotADirectory {
                path: host_root.to_path_buf(),
            });
        }
        let mut root = Self::empty(host_root);
        let walker = WalkDir::new(host_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));
        for entry in walker {
            let entry = entry.map_err(|err| ProjectError::Walk {
                path: err.path().unwrap_or(host_root).to_path_buf(),
                source: Arc::new(err),
            })?;
            if entry.file_type().is_dir() {
                root.insert_dir(entry.path());
            } else if is_config_file(&entry) {
                root.read_config(entry.path())?;
            }
        }
        debug!(
            target: ROOT_TARGET,
            root = %host_root.display(),
            nodes = root.nodes.len(),
            stacks = root.stacks().count(),
            "project loaded"
        );
        Ok(root)
    }

    /// A tree holding only the root node.
    #[must_use]
    pub fn empty(host_root: &Path) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            ProjectPath::root(),
            ProjectNode::new(ProjectPath::root(), host_root.to_path_buf()),
        );
        Self {
            host_dir: host_root.to_path_buf(),
            nodes,
        }
    }

    /// Wraps the tree for sharing.
    #[must_use]
    pub fn shared(self) -> SharedRoot {
        Arc::new(RwLock::new(self))
    }

    /// Root directory on the host filesystem.
    #[must_use]
    pub fn host_dir(&self) -> &Path {
        &self.host_dir
    }

    /// Node at `path`.
    #[must_use]
    pub fn lookup(&self, path: &ProjectPath) -> Option<&ProjectNode> {
        self.nodes.get(path)
    }

    /// Mutable node at `path`.
    pub fn lookup_mut(&mut self, path: &ProjectPath) -> Option<&mut ProjectNode> {
        self.nodes.get_mut(path)
    }

    /// Every node, parents before children.
    pub fn nodes(&self) -> impl Iterator<Item = &ProjectNode> {
        self.nodes.values()
    }

    /// Nodes that declare a stack.
    pub fn stacks(&self) -> impl Iterator<Item = &ProjectNode> {
        self.nodes.values().filter(|node| node.is_stack())
    }

    fn insert_dir(&mut self, host_dir: &Path) {
        let Some(dir) = ProjectPath::from_host_path(&self.host_dir, host_dir) else {
            debug!(
                target: ROOT_TARGET,
                path = %host_dir.display(),
                "skipping directory with a non UTF-8 name"
            );
            return;
        };
        self.nodes
            .entry(dir.clone())
            .or_insert_with(|| ProjectNode::new(dir, host_dir.to_path_buf()));
    }

    fn read_config(&mut self, file: &Path) -> Result<(), ProjectError> {
        let Some(host_dir) = file.parent() else {
            return Ok(());
        };
        let Some(dir) = ProjectPath::from_host_path(&self.host_dir, host_dir) else {
            return Ok(());
        };
        let blocks = syntax::read_file(file)?;
        for block in blocks.iter().filter(|block| block.block_type == "stack") {
            let stack = StackDecl::from_block(host_dir, block)?;
            let Some(node) = self.nodes.get_mut(&dir) else {
                continue;
            };
            if node.stack.is_some() {
                return Err(ProjectError::DuplicateStack {
                    dir: host_dir.to_path_buf(),
                });
            }
            debug!(
                target: ROOT_TARGET,
                stack = %dir,
                file = %file.display(),
                "stack declared"
            );
            node.stack = Some(stack);
        }
        Ok(())
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn is_config_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(CONFIG_SUFFIX))
}
