//! Custom configuration blocks backed by plugins.
//!
//! A plugin declares block shapes through `HCLSchema/GetHCLSchema`;
//! [`hcl_options_from_schema`] turns each shape into a parser handler of
//! the matching kind. When the parser meets such a block the handler
//! converts it to a [`ParsedBlock`](tm_plugin_proto::messages::ParsedBlock),
//! sends it to the plugin, fails the parse on error diagnostics, and stores
//! any returned plugin data on the parse result.

mod convert;
mod dispatch;
mod handlers;

use std::path::Path;
use std::sync::Arc;

use tm_hcl::{ParserOption, ParserOptions};
use tm_plugin_proto::messages::{BlockKind, HclBlockSchema};

pub use self::convert::{
    attribute_value, diagnostics_error, labels_from_label_type, parsed_block_from_block,
    parsed_block_from_merged, store_plugin_data,
};
#[cfg(any(test, feature = "test-support"))]
pub use self::dispatch::MockSchemaDispatcher;
pub use self::dispatch::{ProcessDispatcher, SchemaDispatcher};
pub use self::handlers::{MergedHandler, MergedLabelsHandler, UniqueHandler, UnmergedHandler};

use self::handlers::Forwarder;

const SCHEMA_TARGET: &str = "tm_plugins::schema";

/// Builds one parser handler per declared block shape.
///
/// Nothing is registered when the plugin declares no shapes or has no
/// binary to run.
#[must_use]
pub fn hcl_options_from_schema(
    plugin_name: &str,
    binary_path: &Path,
    schemas: &[HclBlockSchema],
    dispatcher: &Arc<dyn SchemaDispatcher>,
) -> ParserOptions {
    if schemas.is_empty() || binary_path.as_os_str().is_empty() {
        return ParserOptions::new();
    }
    schemas
        .iter()
        .map(|schema| {
            let name = schema.name.clone();
            let forwarder = Forwarder::new(
                plugin_name,
                binary_path.to_path_buf(),
                schema.clone(),
                Arc::clone(dispatcher),
            );
            match schema.kind {
                BlockKind::Unmerged => ParserOption::Unmerged {
                    name,
                    handler: Box::new(UnmergedHandler(forwarder)),
                },
                BlockKind::Merged => ParserOption::Merged {
                    name,
                    handler: Box::new(MergedHandler(forwarder)),
                },
                BlockKind::MergedLabels => ParserOption::MergedLabels {
                    name,
                    handler: Box::new(MergedLabelsHandler(forwarder)),
                },
                BlockKind::Unique => ParserOption::Unique {
                    name,
                    handler: Box::new(UniqueHandler(forwarder)),
                },
            }
        })
        .collect()
}
