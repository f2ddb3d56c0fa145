//! How parsed blocks reach the plugin process.

use std::collections::BTreeMap;
use std::path::Path;

use tm_config::Deadlines;
use tm_plugin_proto::messages::{ParsedBlocksRequest, ParsedBlocksResponse};

use crate::client::HostClient;
use crate::error::PluginError;

/// Sends a batch of parsed blocks to a plugin binary.
#[cfg_attr(any(test, feature = "test-support"), mockall::automock)]
pub trait SchemaDispatcher: Send + Sync {
    /// Runs `HCLSchema/ProcessParsedBlocks` against `binary_path`.
    fn process(
        &self,
        binary_path: &Path,
        request: &ParsedBlocksRequest,
    ) -> Result<ParsedBlocksResponse, PluginError>;
}

/// Starts a fresh plugin process for every batch.
#[derive(Debug, Clone, Default)]
pub struct ProcessDispatcher {
    env: BTreeMap<String, String>,
    deadlines: Deadlines,
}

impl ProcessDispatcher {
    /// Dispatcher passing `env` to each plugin process.
    #[must_use]
    pub const fn new(env: BTreeMap<String, String>, deadlines: Deadlines) -> Self {
        Self { env, deadlines }
    }
}

impl SchemaDispatcher for ProcessDispatcher {
    fn process(
        &self,
        binary_path: &Path,
        request: &ParsedBlocksRequest,
    ) -> Result<ParsedBlocksResponse, PluginError> {
        let mut client = HostClient::start(binary_path, &self.env, self.deadlines)?;
        let response = client.client().hcl_schema().process_parsed_blocks(request);
        client.kill();
        response
    }
}
