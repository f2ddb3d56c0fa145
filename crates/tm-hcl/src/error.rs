//! Errors raised while reading configuration or running block handlers.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising from configuration parsing and block dispatch.
#[derive(Debug, Clone, Error)]
pub enum HclError {
    /// The source text is not valid for the supported subset.
    #[error("{file}:{line}:{column}: {message}")]
    Syntax {
        /// File being read.
        file: String,
        /// One-based line.
        line: u32,
        /// One-based column.
        column: u32,
        /// What was expected.
        message: String,
    },

    /// An attribute appears twice in blocks that are merged together.
    #[error("attribute '{name}' redefined in block '{block_type}' ({file}:{line})")]
    Redefined {
        /// Merged block type.
        block_type: String,
        /// Attribute name.
        name: String,
        /// File of the second definition.
        file: String,
        /// Line of the second definition.
        line: u32,
    },

    /// A unique block type appears more than once.
    #[error("block '{block_type}' must be declared at most once ({file}:{line})")]
    Duplicate {
        /// Block type.
        block_type: String,
        /// File of the second occurrence.
        file: String,
        /// Line of the second occurrence.
        line: u32,
    },

    /// A registered handler rejected a block.
    #[error("block '{block_type}': {message}")]
    Handler {
        /// Block type.
        block_type: String,
        /// Handler-supplied reason.
        message: String,
    },

    /// A configuration file could not be read.
    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}
