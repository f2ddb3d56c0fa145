//! Configuration-language boundary consumed by the plugin machinery.
//!
//! The orchestrator's real parser owns evaluation; this crate models only
//! what plugin dispatch needs from it: typed AST nodes ([`Block`],
//! [`MergedBlock`], [`Expression`]), the per-kind block handler traits that
//! custom block types are registered through, and the [`ParsedConfig`]
//! result that collects plugin-supplied [`ExternalData`].
//!
//! [`syntax`] reads the structural subset of `*.tm.hcl` files (blocks,
//! labels, attributes, nested blocks) so the CLI and the project loader can
//! feed real files through the same handlers.

pub mod ast;
pub mod error;
pub mod external;
pub mod handler;
pub mod merge;
pub mod parser;
pub mod syntax;

pub use self::ast::{
    Attribute, Block, Expression, LabelBlockType, LiteralValue, MergedBlock, Number, NumberText,
    SourceRange,
};
pub use self::error::HclError;
pub use self::external::ExternalData;
pub use self::handler::{
    MergedBlockHandler, MergedLabelsBlockHandler, ParsedConfig, ParserOption, ParserOptions,
    UniqueBlockHandler, UnmergedBlockHandler,
};
pub use self::parser::Parser;
