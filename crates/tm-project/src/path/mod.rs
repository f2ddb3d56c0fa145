//! Absolute, slash-separated project paths.

use std::fmt;
use std::path::{Component, Path};

/// A normalised path inside the project, always starting with `/`.
///
/// `.` segments are dropped and `..` segments pop, clamping at the
/// project root.
///
/// # Example
///
/// ```
/// use tm_project::ProjectPath;
///
/// let path = ProjectPath::new("stacks/./a/../b/");
/// assert_eq!(path.as_str(), "/stacks/b");
/// assert_eq!(path.join("c").as_str(), "/stacks/b/c");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectPath(String);

impl ProjectPath {
    /// The project root, `/`.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_owned())
    }

    /// Normalises `path`; relative paths are taken from the root.
    #[must_use]
    pub fn new(path: &str) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }
        Self(format!("/{}", segments.join("/")))
    }

    /// Project path of `abs` inside the host directory `root_dir`.
    ///
    /// Returns `None` when `abs` is not `root_dir` or below it, or when a
    /// component is not valid UTF-8.
    #[must_use]
    pub fn from_host_path(root_dir: &Path, abs: &Path) -> Option<Self> {
        let relative = abs.strip_prefix(root_dir).ok()?;
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(Self::new(&segments.join("/")))
    }

    /// Appends a relative path.
    #[must_use]
    pub fn join(&self, relative: &str) -> Self {
        Self::new(&format!("{}/{relative}", self.0))
    }

    /// Parent path; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(self.join(".."))
    }

    /// True for `/`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Path text.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Segments after the leading `/`.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }
}

impl Default for ProjectPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for ProjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
