//! Block handler registration.
//!
//! A custom block type is registered with exactly one handler whose trait
//! matches how the parser presents its occurrences.

use std::fmt;

use crate::ast::{Block, MergedBlock};
use crate::error::HclError;
use crate::external::ExternalData;

/// Result of parsing a configuration with custom handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedConfig {
    /// Plugin data gathered by handlers; `None` until a handler stores some.
    pub external: Option<ExternalData>,
    /// Top-level blocks no handler was registered for.
    pub unhandled: Vec<Block>,
}

/// Handler invoked once per syntactic occurrence.
pub trait UnmergedBlockHandler: Send + Sync {
    /// Processes one occurrence.
    fn parse(&self, config: &mut ParsedConfig, block: &Block) -> Result<(), HclError>;
}

/// Handler invoked once with every occurrence merged.
pub trait MergedBlockHandler: Send + Sync {
    /// Processes the merged block.
    fn parse(&self, config: &mut ParsedConfig, block: &MergedBlock) -> Result<(), HclError>;
}

/// Handler invoked once per distinct label list, with those occurrences
/// merged.
pub trait MergedLabelsBlockHandler: Send + Sync {
    /// Processes one merged label group.
    fn parse(&self, config: &mut ParsedConfig, block: &MergedBlock) -> Result<(), HclError>;
}

/// Handler for a block type that may occur at most once.
pub trait UniqueBlockHandler: Send + Sync {
    /// Processes the single occurrence.
    fn parse(&self, config: &mut ParsedConfig, block: &Block) -> Result<(), HclError>;
}

/// A handler registered for one block type.
pub enum ParserOption {
    /// See [`UnmergedBlockHandler`].
    Unmerged {
        /// Block type.
        name: String,
        /// Handler.
        handler: Box<dyn UnmergedBlockHandler>,
    },
    /// See [`MergedBlockHandler`].
    Merged {
        /// Block type.
        name: String,
        /// Handler.
        handler: Box<dyn MergedBlockHandler>,
    },
    /// See [`MergedLabelsBlockHandler`].
    MergedLabels {
        /// Block type.
        name: String,
        /// Handler.
        handler: Box<dyn MergedLabelsBlockHandler>,
    },
    /// See [`UniqueBlockHandler`].
    Unique {
        /// Block type.
        name: String,
        /// Handler.
        handler: Box<dyn UniqueBlockHandler>,
    },
}

impl ParserOption {
    /// Block type the handler is registered for.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Unmerged { name, .. }
            | Self::Merged { name, .. }
            | Self::MergedLabels { name, .. }
            | Self::Unique { name, .. } => name,
        }
    }

    /// Short name of the handler kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unmerged { .. } => "unmerged",
            Self::Merged { .. } => "merged",
            Self::MergedLabels { .. } => "merged_labels",
            Self::Unique { .. } => "unique",
        }
    }
}

impl fmt::Debug for ParserOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserOption")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Handlers to install into a parser.
#[derive(Debug, Default)]
pub struct ParserOptions {
    options: Vec<ParserOption>,
}

impl ParserOptions {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler.
    pub fn push(&mut self, option: ParserOption) {
        self.options.push(option);
    }

    /// Adds every handler from `other`.
    pub fn extend(&mut self, other: Self) {
        self.options.extend(other.options);
    }

    /// Block types with a registered handler, in registration order.
    #[must_use]
    pub fn handler_names(&self) -> Vec<&str> {
        self.options.iter().map(ParserOption::name).collect()
    }

    /// Number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// True when no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Handler for a block type.
    #[must_use]
    pub fn find(&self, block_type: &str) -> Option<&ParserOption> {
        self.options.iter().find(|option| option.name() == block_type)
    }

    /// Iterates the handlers.
    pub fn iter(&self) -> impl Iterator<Item = &ParserOption> {
        self.options.iter()
    }
}

impl FromIterator<ParserOption> for ParserOptions {
    fn from_iter<I: IntoIterator<Item = ParserOption>>(iter: I) -> Self {
        Self {
            options: iter.into_iter().collect(),
        }
    }
}
