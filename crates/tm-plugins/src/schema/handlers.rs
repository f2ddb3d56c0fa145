//! Parser handlers forwarding blocks to a plugin.

use std::path::PathBuf;
use std::sync::Arc;

use tm_hcl::{
    Block, HclError, MergedBlock, MergedBlockHandler, MergedLabelsBlockHandler, ParsedConfig,
    UniqueBlockHandler, UnmergedBlockHandler,
};
use tm_plugin_proto::messages::{HclBlockSchema, ParsedBlock, ParsedBlocksRequest};
use tracing::debug;

use super::SCHEMA_TARGET;
use super::convert::{
    diagnostics_error, labels_from_label_type, parsed_block_from_block, parsed_block_from_merged,
    store_plugin_data,
};
use super::dispatch::SchemaDispatcher;

/// State shared by every handler kind.
pub(super) struct Forwarder {
    plugin_name: String,
    binary_path: PathBuf,
    schema: HclBlockSchema,
    dispatcher: Arc<dyn SchemaDispatcher>,
}

impl Forwarder {
    pub(super) fn new(
        plugin_name: &str,
        binary_path: PathBuf,
        schema: HclBlockSchema,
        dispatcher: Arc<dyn SchemaDispatcher>,
    ) -> Self {
        Self {
            plugin_name: plugin_name.to_owned(),
            binary_path,
            schema,
            dispatcher,
        }
    }

    fn forward(&self, config: &mut ParsedConfig, block: ParsedBlock) -> Result<(), HclError> {
        let request = ParsedBlocksRequest {
            block_type: self.schema.name.clone(),
            blocks: vec![block],
        };
        debug!(
            target: SCHEMA_TARGET,
            plugin = self.plugin_name.as_str(),
            block_type = self.schema.name.as_str(),
            kind = self.schema.kind.as_str(),
            "forwarding block to plugin"
        );
        let response = self
            .dispatcher
            .process(&self.binary_path, &request)
            .map_err(|error| self.rejected(error.to_string()))?;
        if let Some(message) = diagnostics_error(&response.diagnostics) {
            return Err(self.rejected(message));
        }
        store_plugin_data(
            config,
            &self.plugin_name,
            &self.schema.name,
            response.plugin_data,
        );
        Ok(())
    }

    fn rejected(&self, message: String) -> HclError {
        HclError::Handler {
            block_type: self.schema.name.clone(),
            message,
        }
    }
}

/// One plugin call per block occurrence.
pub struct UnmergedHandler(pub(super) Forwarder);

impl UnmergedBlockHandler for UnmergedHandler {
    fn parse(&self, config: &mut ParsedConfig, block: &Block) -> Result<(), HclError> {
        self.0.forward(config, parsed_block_from_block(block))
    }
}

/// One plugin call with every occurrence merged.
pub struct MergedHandler(pub(super) Forwarder);

impl MergedBlockHandler for MergedHandler {
    fn parse(&self, config: &mut ParsedConfig, block: &MergedBlock) -> Result<(), HclError> {
        self.0.forward(config, parsed_block_from_merged(block))
    }
}

/// One plugin call per distinct label list.
pub struct MergedLabelsHandler(pub(super) Forwarder);

impl MergedLabelsBlockHandler for MergedLabelsHandler {
    fn parse(&self, config: &mut ParsedConfig, block: &MergedBlock) -> Result<(), HclError> {
        let mut parsed = parsed_block_from_merged(block);
        parsed.labels = labels_from_label_type(&block.label_type).unwrap_or_default();
        self.0.forward(config, parsed)
    }
}

/// One plugin call for the single occurrence.
pub struct UniqueHandler(pub(super) Forwarder);

impl UniqueBlockHandler for UniqueHandler {
    fn parse(&self, config: &mut ParsedConfig, block: &Block) -> Result<(), HclError> {
        self.0.forward(config, parsed_block_from_block(block))
    }
}
