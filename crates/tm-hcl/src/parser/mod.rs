//! Dispatch of parsed blocks to registered handlers.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::ast::{Block, LabelBlockType};
use crate::error::HclError;
use crate::handler::{
    MergedBlockHandler, MergedLabelsBlockHandler, ParsedConfig, ParserOption, ParserOptions,
    UniqueBlockHandler, UnmergedBlockHandler,
};
use crate::merge::merge_blocks;
use crate::syntax;

const PARSER_TARGET: &str = "tm_hcl::parser";

/// Suffix of configuration files read by [`Parser::parse_dir`].
pub const CONFIG_SUFFIX: &str = ".tm.hcl";

/// Feeds top-level blocks to the handler registered for their type.
///
/// # Example
///
/// ```
/// use tm_hcl::{Parser, ParserOptions};
///
/// let parser = Parser::new(ParserOptions::new());
/// let parsed = parser
///     .parse_str("stack.tm.hcl", "stack {\n  name = \"a\"\n}\n")
///     .expect("parse");
/// assert_eq!(parsed.unhandled.len(), 1);
/// assert!(parsed.external.is_none());
/// ```
#[derive(Debug, Default)]
pub struct Parser {
    options: ParserOptions,
}

impl Parser {
    /// Creates a parser with the given handlers.
    #[must_use]
    pub const fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Registered handlers.
    #[must_use]
    pub const fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parses one source text and dispatches its blocks.
    pub fn parse_str(&self, file: &str, source: &str) -> Result<ParsedConfig, HclError> {
        self.dispatch(syntax::parse_blocks(file, source)?)
    }

    /// Parses files in order and dispatches their blocks together, so
    /// merged block types span files.
    pub fn parse_files(&self, paths: &[PathBuf]) -> Result<ParsedConfig, HclError> {
        let mut blocks = Vec::new();
        for path in paths {
            blocks.extend(syntax::read_file(path)?);
        }
        self.dispatch(blocks)
    }

    /// Parses every `*.tm.hcl` file directly inside `dir`, in name order.
    pub fn parse_dir(&self, dir: &Path) -> Result<ParsedConfig, HclError> {
        self.parse_files(&config_files(dir)?)
    }

    /// Dispatches blocks, grouped by type in order of first appearance.
    ///
    /// Blocks with no registered handler are returned in
    /// [`ParsedConfig::unhandled`].
    pub fn dispatch(&self, blocks: Vec<Block>) -> Result<ParsedConfig, HclError> {
        let mut config = ParsedConfig::default();
        let mut order: Vec<String> = Vec::new();
        let mut by_type: BTreeMap<String, Vec<Block>> = BTreeMap::new();
        for block in blocks {
            if !by_type.contains_key(&block.block_type) {
                order.push(block.block_type.clone());
            }
            by_type.entry(block.block_type.clone()).or_default().push(block);
        }

        for block_type in order {
            let occurrences = by_type.remove(&block_type).unwrap_or_default();
            let Some(option) = self.options.find(&block_type) else {
                config.unhandled.extend(occurrences);
                continue;
            };
            debug!(
                target: PARSER_TARGET,
                block_type = block_type.as_str(),
                kind = option.kind(),
                occurrences = occurrences.len(),
                "dispatching blocks"
            );
            match option {
                ParserOption::Unmerged { handler, .. } => {
                    dispatch_unmerged(handler.as_ref(), &mut config, &occurrences)?;
                }
                ParserOption::Merged { name, handler } => {
                    dispatch_merged(name, handler.as_ref(), &mut config, &occurrences)?;
                }
                ParserOption::MergedLabels { name, handler } => {
                    dispatch_merged_labels(name, handler.as_ref(), &mut config, &occurrences)?;
                }
                ParserOption::Unique { name, handler } => {
                    dispatch_unique(name, handler.as_ref(), &mut config, &occurrences)?;
                }
            }
        }
        Ok(config)
    }
}

/// Calls the handler once per occurrence, in source order.
pub fn dispatch_unmerged(
    handler: &dyn UnmergedBlockHandler,
    config: &mut ParsedConfig,
    blocks: &[Block],
) -> Result<(), HclError> {
    blocks
        .iter()
        .try_for_each(|block| handler.parse(config, block))
}

/// Merges every occurrence and calls the handler once.
pub fn dispatch_merged(
    block_type: &str,
    handler: &dyn MergedBlockHandler,
    config: &mut ParsedConfig,
    blocks: &[Block],
) -> Result<(), HclError> {
    if blocks.is_empty() {
        return Ok(());
    }
    let merged = merge_blocks(LabelBlockType::new(block_type, Vec::new()), blocks)?;
    handler.parse(config, &merged)
}

/// Merges occurrences per distinct label list and calls the handler once
/// per group, in order of first appearance.
pub fn dispatch_merged_labels(
    block_type: &str,
    handler: &dyn MergedLabelsBlockHandler,
    config: &mut ParsedConfig,
    blocks: &[Block],
) -> Result<(), HclError> {
    let mut groups: Vec<(&[String], Vec<&Block>)> = Vec::new();
    for block in blocks {
        match groups
            .iter_mut()
            .find(|(labels, _)| *labels == block.labels.as_slice())
        {
            Some((_, members)) => members.push(block),
            None => groups.push((block.labels.as_slice(), vec![block])),
        }
    }
    for (labels, members) in groups {
        let label_type = LabelBlockType::new(block_type, labels.to_vec());
        let merged = merge_blocks(label_type, members)?;
        handler.parse(config, &merged)?;
    }
    Ok(())
}

/// Calls the handler for the single occurrence.
///
/// # Errors
///
/// Returns [`HclError::Duplicate`] when the type occurs more than once.
pub fn dispatch_unique(
    block_type: &str,
    handler: &dyn UniqueBlockHandler,
    config: &mut ParsedConfig,
    blocks: &[Block],
) -> Result<(), HclError> {
    match blocks {
        [] => Ok(()),
        [block] => handler.parse(config, block),
        [_, second, ..] => Err(HclError::Duplicate {
            block_type: block_type.to_owned(),
            file: second.range.file.clone(),
            line: second.range.line,
        }),
    }
}

fn config_files(dir: &Path) -> Result<Vec<PathBuf>, HclError> {
    let io_error = |err| HclError::Io {
        path: dir.to_path_buf(),
        source: Arc::new(err),
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let path = entry.path();
        let is_config = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(CONFIG_SUFFIX));
        if is_config && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
