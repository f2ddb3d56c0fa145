//! Plugin-supplied data attached to a parse result.

use std::collections::BTreeMap;

/// Opaque blobs keyed by plugin name, then block type.
///
/// Blobs for one `(plugin, block type)` pair are only ever appended, so
/// their order follows the order the blocks were dispatched in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalData {
    plugins: BTreeMap<String, BTreeMap<String, Vec<Vec<u8>>>>,
}

impl ExternalData {
    /// Creates empty external data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a blob, creating the nested maps on first use.
    pub fn append(&mut self, plugin: &str, block_type: &str, data: Vec<u8>) {
        self.plugins
            .entry(plugin.to_owned())
            .or_default()
            .entry(block_type.to_owned())
            .or_default()
            .push(data);
    }

    /// Blobs stored for a plugin and block type.
    #[must_use]
    pub fn get(&self, plugin: &str, block_type: &str) -> Option<&[Vec<u8>]> {
        self.plugins
            .get(plugin)?
            .get(block_type)
            .map(Vec::as_slice)
    }

    /// Block types with stored blobs for a plugin.
    #[must_use]
    pub fn block_types(&self, plugin: &str) -> Vec<&str> {
        self.plugins
            .get(plugin)
            .map(|types| types.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Plugin names with stored blobs.
    pub fn plugins(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    /// Total number of blobs stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// True when nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
