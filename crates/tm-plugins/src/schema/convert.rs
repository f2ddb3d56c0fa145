//! Conversions from parser nodes to wire blocks.

use tm_hcl::{
    Block, ExternalData, Expression, LabelBlockType, LiteralValue, MergedBlock, Number,
    ParsedConfig,
};
use tm_plugin_proto::messages::{AttributeValue, Diagnostic, ParsedBlock};

/// Converts one syntactic block occurrence.
#[must_use]
pub fn parsed_block_from_block(block: &Block) -> ParsedBlock {
    ParsedBlock {
        file_path: block.range.file.clone(),
        block_type: block.block_type.clone(),
        labels: block.labels.clone(),
        attributes: block
            .attributes
            .iter()
            .map(|(name, attribute)| (name.clone(), attribute_value(attribute.expr.as_ref())))
            .collect(),
        nested_blocks: block.blocks.iter().map(parsed_block_from_block).collect(),
    }
}

/// Converts a merged block and its merged children.
///
/// The file path is that of the first merged occurrence. Children take
/// their type from their key, and their labels from it when they carry
/// none of their own.
#[must_use]
pub fn parsed_block_from_merged(block: &MergedBlock) -> ParsedBlock {
    ParsedBlock {
        file_path: block
            .raw_origins
            .first()
            .map(|origin| origin.file.clone())
            .unwrap_or_default(),
        block_type: block.label_type.block_type.clone(),
        labels: block.label_type.labels.clone(),
        attributes: block
            .attributes
            .iter()
            .map(|(name, attribute)| (name.clone(), attribute_value(attribute.expr.as_ref())))
            .collect(),
        nested_blocks: block
            .blocks
            .iter()
            .map(|(label_type, child)| {
                let mut parsed = parsed_block_from_merged(child);
                parsed.block_type.clone_from(&label_type.block_type);
                if parsed.labels.is_empty() {
                    parsed.labels = labels_from_label_type(label_type).unwrap_or_default();
                }
                parsed
            })
            .collect(),
    }
}

/// Wire value of an attribute's expression.
///
/// Literal tokens win, then context-free constants; anything else is sent
/// as source text with leading blanks removed. Trailing newlines survive
/// so heredocs stay parseable on the plugin side.
///
/// # Example
///
/// ```
/// use tm_hcl::syntax::expr::classify;
/// use tm_plugin_proto::messages::AttributeValue;
/// use tm_plugins::schema::attribute_value;
///
/// assert_eq!(attribute_value(Some(&classify(" 42"))), AttributeValue::Int(42));
/// assert_eq!(
///     attribute_value(Some(&classify(" var.name"))),
///     AttributeValue::ExpressionText("var.name".to_owned())
/// );
/// ```
#[must_use]
pub fn attribute_value(expr: Option<&Expression>) -> AttributeValue {
    let Some(expr) = expr else {
        return AttributeValue::ExpressionText(String::new());
    };
    expr.literal_value()
        .and_then(scalar)
        .or_else(|| expr.constant_value().and_then(scalar))
        .unwrap_or_else(|| {
            AttributeValue::ExpressionText(expr.source().trim_start_matches([' ', '\t']).to_owned())
        })
}

fn scalar(value: &LiteralValue) -> Option<AttributeValue> {
    match value {
        LiteralValue::String(text) => Some(AttributeValue::String(text.clone())),
        LiteralValue::Bool(flag) => Some(AttributeValue::Bool(*flag)),
        LiteralValue::Number(text) => match text.classify()? {
            Number::Int(int) => Some(AttributeValue::Int(int)),
            Number::Float(float) => Some(AttributeValue::Float(float)),
        },
        LiteralValue::Null | LiteralValue::Other => None,
    }
}

/// Label values carried by a merged block key.
///
/// Open-ended keys stop at the first empty label; fixed keys take the first
/// `num_labels` entries. `None` when that leaves nothing.
#[must_use]
pub fn labels_from_label_type(label_type: &LabelBlockType) -> Option<Vec<String>> {
    let labels: Vec<String> = if label_type.num_labels == 0 {
        label_type
            .labels
            .iter()
            .take_while(|label| !label.is_empty())
            .cloned()
            .collect()
    } else {
        label_type
            .labels
            .iter()
            .take(label_type.num_labels)
            .cloned()
            .collect()
    };
    (!labels.is_empty()).then_some(labels)
}

/// Renders the error-severity diagnostics, or `None` when there are none.
///
/// Each renders as `summary[: detail][ (file:line:col)]`, joined by `"; "`.
#[must_use]
pub fn diagnostics_error(diagnostics: &[Diagnostic]) -> Option<String> {
    let messages: Vec<String> = diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.is_error())
        .map(|diagnostic| {
            let mut message = diagnostic.summary.clone();
            if !diagnostic.detail.is_empty() {
                message.push_str(": ");
                message.push_str(&diagnostic.detail);
            }
            if !diagnostic.file.is_empty() {
                message.push_str(&format!(
                    " ({}:{}:{})",
                    diagnostic.file, diagnostic.line, diagnostic.column
                ));
            }
            message
        })
        .collect();
    (!messages.is_empty()).then(|| messages.join("; "))
}

/// Appends `data` to the parse result under `plugin` and `block_type`.
///
/// Empty data is dropped; nothing already stored is ever replaced.
pub fn store_plugin_data(config: &mut ParsedConfig, plugin: &str, block_type: &str, data: Vec<u8>) {
    if data.is_empty() {
        return;
    }
    config
        .external
        .get_or_insert_with(ExternalData::new)
        .append(plugin, block_type, data);
}
