//! Merging of repeated block occurrences.

use std::collections::btree_map::Entry;

use crate::ast::{Block, LabelBlockType, MergedBlock};
use crate::error::HclError;

/// Merges occurrences that share `label_type` into one logical block.
///
/// Attributes are unioned and may be defined only once across all
/// occurrences. Nested blocks are merged recursively, keyed by their type
/// and exact labels.
///
/// # Errors
///
/// Returns [`HclError::Redefined`] when two occurrences define the same
/// attribute at the same nesting level.
pub fn merge_blocks<'a, I>(label_type: LabelBlockType, blocks: I) -> Result<MergedBlock, HclError>
where
    I: IntoIterator<Item = &'a Block>,
{
    let mut merged = MergedBlock {
        label_type,
        ..MergedBlock::default()
    };
    for block in blocks {
        merge_into(&mut merged, block)?;
    }
    Ok(merged)
}

fn merge_into(target: &mut MergedBlock, block: &Block) -> Result<(), HclError> {
    target.raw_origins.push(block.range.clone());
    for (name, attribute) in &block.attributes {
        match target.attributes.entry(name.clone()) {
            Entry::Occupied(_) => {
                return Err(HclError::Redefined {
                    block_type: target.label_type.block_type.clone(),
                    name: name.clone(),
                    file: attribute.range.file.clone(),
                    line: attribute.range.line,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(attribute.clone());
            }
        }
    }
    for child in &block.blocks {
        let key = LabelBlockType::new(child.block_type.clone(), child.labels.clone());
        let nested = target
            .blocks
            .entry(key.clone())
            .or_insert_with(|| MergedBlock {
                label_type: key,
                ..MergedBlock::default()
            });
        merge_into(nested, child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::syntax::parse_blocks;

    fn blocks(source: &str) -> Vec<Block> {
        parse_blocks("stack.tm.hcl", source).expect("valid source")
    }

    #[test]
    fn unions_attributes_and_records_origins() {
        let parsed = blocks("config {\n  a = 1\n}\nconfig {\n  b = 2\n}\n");
        let merged = merge_blocks(LabelBlockType::new("config", Vec::new()), &parsed)
            .expect("disjoint attributes merge");

        assert_eq!(merged.attributes.keys().collect::<Vec<_>>(), ["a", "b"]);
        let lines: Vec<u32> = merged.raw_origins.iter().map(|origin| origin.line).collect();
        assert_eq!(lines, [1, 4]);
    }

    #[test]
    fn nested_blocks_merge_by_type_and_labels() {
        let parsed = blocks(
            "config {\n  item \"x\" {\n    a = 1\n  }\n}\nconfig {\n  item \"x\" {\n    b = 2\n  }\n  item \"y\" {\n    c = 3\n  }\n}\n",
        );
        let merged = merge_blocks(LabelBlockType::new("config", Vec::new()), &parsed)
            .expect("nested merge");

        let keys: Vec<_> = merged.blocks.keys().map(|key| key.labels.clone()).collect();
        assert_eq!(keys, [vec!["x".to_owned()], vec!["y".to_owned()]]);
        let x = merged
            .blocks
            .get(&LabelBlockType::new("item", vec!["x".to_owned()]))
            .expect("item x");
        assert_eq!(x.attributes.len(), 2);
        assert_eq!(x.raw_origins.len(), 2);
    }

    #[rstest]
    #[case::top_level("config {\n  a = 1\n}\nconfig {\n  a = 2\n}\n", 5)]
    #[case::nested("config {\n  n {\n    a = 1\n  }\n}\nconfig {\n  n {\n    a = 2\n  }\n}\n", 8)]
    fn redefinition_is_rejected(#[case] source: &str, #[case] line: u32) {
        let parsed = blocks(source);
        let error = merge_blocks(LabelBlockType::new("config", Vec::new()), &parsed)
            .expect_err("attribute defined twice");
        match error {
            HclError::Redefined { name, line: at, .. } => {
                assert_eq!(name, "a");
                assert_eq!(at, line);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
