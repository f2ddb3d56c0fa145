//! Structural reader for the `*.tm.hcl` subset.
//!
//! Recognises blocks with identifier or quoted labels, `name = expr`
//! attributes, nested blocks, and `#`, `//`, `/* */` comments. Expressions
//! are captured as source text and classified by [`expr`]; nothing is
//! evaluated beyond literals and interpolation-free templates.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::ast::{Attribute, Block, SourceRange};
use crate::error::HclError;

mod cursor;
pub mod expr;
#[cfg(test)]
mod tests;

use self::cursor::Cursor;

/// Reads the top-level blocks of a file.
pub fn read_file(path: &Path) -> Result<Vec<Block>, HclError> {
    let source = fs::read_to_string(path).map_err(|err| HclError::Io {
        path: path.to_path_buf(),
        source: Arc::new(err),
    })?;
    parse_blocks(&path.display().to_string(), &source)
}

/// Parses the top-level blocks of `source`.
///
/// Top-level attributes are rejected: configuration files only declare
/// blocks at their root.
pub fn parse_blocks(file: &str, source: &str) -> Result<Vec<Block>, HclError> {
    let mut cursor = Cursor::new(file, source);
    let (attributes, blocks) = parse_body(&mut cursor, false)?;
    if let Some(attribute) = attributes.values().next() {
        return Err(HclError::Syntax {
            file: file.to_owned(),
            line: attribute.range.line,
            column: attribute.range.column,
            message: format!("unexpected top-level attribute '{}'", attribute.name),
        });
    }
    Ok(blocks)
}

type Body = (BTreeMap<String, Attribute>, Vec<Block>);

fn parse_body(cursor: &mut Cursor<'_>, nested: bool) -> Result<Body, HclError> {
    let mut attributes = BTreeMap::new();
    let mut blocks = Vec::new();
    loop {
        cursor.skip_trivia();
        match cursor.peek() {
            None if nested => return Err(cursor.error("unterminated block, expected '}'")),
            None => return Ok((attributes, blocks)),
            Some('}') if nested => {
                cursor.bump();
                return Ok((attributes, blocks));
            }
            Some(c) if is_ident_start(c) => {
                let range = cursor.range();
                let name = cursor.identifier();
                cursor.skip_inline_space();
                if cursor.peek() == Some('=') {
                    cursor.bump();
                    let expr = expr::scan(cursor, nested)?;
                    if attributes.contains_key(&name) {
                        return Err(HclError::Syntax {
                            file: range.file,
                            line: range.line,
                            column: range.column,
                            message: format!("attribute '{name}' redefined"),
                        });
                    }
                    attributes.insert(
                        name.clone(),
                        Attribute {
                            name,
                            expr: Some(expr),
                            range,
                        },
                    );
                } else {
                    blocks.push(parse_block(cursor, name, range)?);
                }
            }
            Some(other) => {
                return Err(cursor.error(&format!("unexpected character '{other}'")));
            }
        }
    }
}

fn parse_block(
    cursor: &mut Cursor<'_>,
    block_type: String,
    range: SourceRange,
) -> Result<Block, HclError> {
    let mut labels = Vec::new();
    loop {
        cursor.skip_inline_space();
        match cursor.peek() {
            Some('"') => labels.push(expr::quoted_literal(cursor)?),
            Some(c) if is_ident_start(c) => labels.push(cursor.identifier()),
            Some('{') => {
                cursor.bump();
                let (attributes, blocks) = parse_body(cursor, true)?;
                return Ok(Block {
                    block_type,
                    labels,
                    attributes,
                    blocks,
                    range,
                });
            }
            _ => return Err(cursor.error(&format!("expected '{{' to open block '{block_type}'"))),
        }
    }
}

pub(crate) const fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(crate) const fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}
