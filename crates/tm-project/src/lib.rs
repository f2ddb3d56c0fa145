//! Project model: the configuration tree of a terramate project.
//!
//! A project is a directory tree. Every directory is a node addressed by a
//! [`ProjectPath`]; a node is a stack when one of its `*.tm.hcl` files
//! declares a top-level `stack` block. The host service reads and mutates
//! this tree on behalf of plugins, so it is shared as a [`SharedRoot`].

mod error;
mod path;
mod root;
mod stack;

pub use self::error::ProjectError;
pub use self::path::ProjectPath;
pub use self::root::{ProjectNode, ProjectRoot, SharedRoot};
pub use self::stack::StackDecl;
