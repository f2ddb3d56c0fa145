//! Errors raised while loading a project.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tm_hcl::HclError;

/// Errors arising from [`crate::ProjectRoot::load`].
#[derive(Debug, Clone, Error)]
pub enum ProjectError {
    /// The project root is not a directory.
    #[error("project root '{}' is not a directory", .path.display())]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },

    /// Walking the tree failed.
    #[error("failed to walk '{}': {source}", .path.display())]
    Walk {
        /// Path being visited.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Arc<walkdir::Error>,
    },

    /// A configuration file is malformed.
    #[error(transparent)]
    Hcl(#[from] HclError),

    /// A directory declares more than one stack.
    #[error("directory '{}' declares more than one stack", .dir.display())]
    DuplicateStack {
        /// Directory holding the declarations.
        dir: PathBuf,
    },

    /// A stack attribute has a value the model cannot hold.
    #[error("stack attribute '{name}' in '{}': {message}", .dir.display())]
    StackAttribute {
        /// Directory of the stack.
        dir: PathBuf,
        /// Attribute name.
        name: String,
        /// What was expected.
        message: String,
    },
}
