//! Stack declarations read from `stack` blocks.

use std::path::Path;

use tm_hcl::syntax::expr::classify;
use tm_hcl::{Attribute, Block, LiteralValue};

use crate::error::ProjectError;

/// Metadata declared by a `stack` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackDecl {
    /// Stack name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags used for filtering.
    pub tags: Vec<String>,
    /// Stacks this one runs after.
    pub after: Vec<String>,
    /// Stacks this one runs before.
    pub before: Vec<String>,
    /// Stacks pulled in when this one is selected.
    pub wants: Vec<String>,
    /// Stacks that pull this one in.
    pub wanted_by: Vec<String>,
    /// Files whose changes mark the stack as changed.
    pub watch: Vec<String>,
}

impl StackDecl {
    /// Reads a `stack` block found in `dir`.
    ///
    /// Attributes outside the metadata set (such as `id`) are ignored.
    /// Metadata attributes must be plain strings or lists of plain strings.
    pub fn from_block(dir: &Path, block: &Block) -> Result<Self, ProjectError> {
        let mut stack = Self::default();
        for (name, attribute) in &block.attributes {
            let invalid = |message: &str| ProjectError::StackAttribute {
                dir: dir.to_path_buf(),
                name: name.clone(),
                message: message.to_owned(),
            };
            match name.as_str() {
                "name" => {
                    stack.name =
                        string_value(attribute).ok_or_else(|| invalid("expected a string"))?;
                }
                "description" => {
                    stack.description =
                        string_value(attribute).ok_or_else(|| invalid("expected a string"))?;
                }
                list => {
                    let Some(slot) = stack.list_mut(list) else {
                        continue;
                    };
                    *slot = string_list(attribute)
                        .ok_or_else(|| invalid("expected a list of strings"))?;
                }
            }
        }
        Ok(stack)
    }

    /// List field by its configuration name.
    pub fn list_mut(&mut self, name: &str) -> Option<&mut Vec<String>> {
        match name {
            "tags" => Some(&mut self.tags),
            "after" => Some(&mut self.after),
            "before" => Some(&mut self.before),
            "wants" => Some(&mut self.wants),
            "wanted_by" => Some(&mut self.wanted_by),
            "watch" => Some(&mut self.watch),
            _ => None,
        }
    }
}

fn string_value(attribute: &Attribute) -> Option<String> {
    let expr = attribute.expr.as_ref()?;
    match expr.literal_value().or_else(|| expr.constant_value())? {
        LiteralValue::String(value) => Some(value.clone()),
        _ => None,
    }
}

fn string_list(attribute: &Attribute) -> Option<Vec<String>> {
    let source = attribute.expr.as_ref()?.source().trim();
    let inner = source.strip_prefix('[')?.strip_suffix(']')?;
    split_items(inner)
        .into_iter()
        .map(|item| match classify(item).constant_value() {
            Some(LiteralValue::String(value)) => Some(value.clone()),
            _ => None,
        })
        .collect()
}

/// Splits list items on commas outside quoted strings, dropping empty
/// items left by trailing commas and line breaks.
fn split_items(inner: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;
    for (index, c) in inner.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            ',' if !in_string => {
                items.push(inner.get(start..index).unwrap_or_default());
                start = index + 1;
            }
            _ => {}
        }
    }
    items.push(inner.get(start..).unwrap_or_default());
    items
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tm_hcl::syntax::parse_blocks;

    use super::*;

    fn stack_block(body: &str) -> Block {
        let source = format!("stack {{\n{body}\n}}\n");
        parse_blocks("stack.tm.hcl", &source)
            .expect("valid source")
            .into_iter()
            .next()
            .expect("stack block")
    }

    #[test]
    fn reads_scalar_and_list_metadata() {
        let block = stack_block(
            "  id = \"ignored\"\n  name = \"app\"\n  description = \"the app\"\n  tags = [\"a\", \"b,c\"]\n  after = [\n    \"/db\",\n  ]\n",
        );
        let stack = StackDecl::from_block(Path::new("/p/app"), &block).expect("valid stack");

        assert_eq!(stack.name, "app");
        assert_eq!(stack.description, "the app");
        assert_eq!(stack.tags, ["a", "b,c"]);
        assert_eq!(stack.after, ["/db"]);
        assert!(stack.watch.is_empty());
    }

    #[test]
    fn empty_list_clears_field() {
        let block = stack_block("  tags = []");
        let stack = StackDecl::from_block(Path::new("/p"), &block).expect("valid stack");
        assert!(stack.tags.is_empty());
    }

    #[rstest]
    #[case::dynamic_name("  name = var.name")]
    #[case::number_name("  name = 3")]
    #[case::dynamic_tag("  tags = [var.tag]")]
    #[case::not_a_list("  tags = \"a\"")]
    fn rejects_non_string_metadata(#[case] body: &str) {
        let block = stack_block(body);
        let error = StackDecl::from_block(Path::new("/p"), &block).expect_err("invalid");
        assert!(matches!(error, ProjectError::StackAttribute { .. }));
    }
}
