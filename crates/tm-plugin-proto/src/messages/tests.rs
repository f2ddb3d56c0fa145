//! Tests for wire message encoding.

use rstest::rstest;
use serde_json::json;

use super::*;

#[rstest]
#[case::string(AttributeValue::String("hello".into()), json!({"string": "hello"}))]
#[case::bool(AttributeValue::Bool(true), json!({"bool": true}))]
#[case::int(AttributeValue::Int(42), json!({"int": 42}))]
#[case::float(AttributeValue::Float(1.5), json!({"float": 1.5}))]
#[case::expression(
    AttributeValue::ExpressionText("upper(var.x)".into()),
    json!({"expression_text": "upper(var.x)"})
)]
fn attribute_value_encodes_exactly_one_variant(
    #[case] value: AttributeValue,
    #[case] expected: serde_json::Value,
) {
    let encoded = serde_json::to_value(&value).expect("encode value");
    assert_eq!(encoded, expected);
}

#[test]
fn attribute_value_rejects_two_variants() {
    let result = serde_json::from_value::<AttributeValue>(json!({"string": "a", "bool": true}));
    assert!(result.is_err(), "a value must carry one variant only");
}

#[test]
fn plugin_data_travels_as_base64() {
    let response = ParsedBlocksResponse {
        diagnostics: Vec::new(),
        plugin_data: b"{\"ok\":true}".to_vec(),
    };
    let encoded = serde_json::to_value(&response).expect("encode response");
    assert_eq!(encoded["plugin_data"], json!("eyJvayI6dHJ1ZX0="));

    let decoded: ParsedBlocksResponse = serde_json::from_value(encoded).expect("decode response");
    assert_eq!(decoded, response);
}

#[test]
fn command_output_is_adjacently_tagged() {
    let encoded = serde_json::to_value(CommandOutput::Stdout(b"hi".to_vec())).expect("encode");
    assert_eq!(encoded, json!({"kind": "stdout", "value": "aGk="}));

    let exit: CommandOutput =
        serde_json::from_value(json!({"kind": "exit_code", "value": 2})).expect("decode exit");
    assert_eq!(exit, CommandOutput::ExitCode(2));
}

#[test]
fn missing_optional_fields_take_defaults() {
    let schema: HclBlockSchema =
        serde_json::from_value(json!({"name": "pluginblock"})).expect("decode schema");
    assert_eq!(schema.kind, BlockKind::Unmerged);
    assert_eq!(schema.label_count, 0);
    assert!(schema.attributes.is_empty());

    let caps: Capabilities = serde_json::from_value(json!({"has_hcl_schema": true}))
        .expect("decode capabilities");
    assert!(caps.has_hcl_schema);
    assert!(!caps.has_commands);
}

#[test]
fn attribute_schema_uses_type_key() {
    let schema = HclAttributeSchema {
        name: "value".into(),
        type_name: "string".into(),
        required: true,
    };
    let encoded = serde_json::to_value(&schema).expect("encode attribute schema");
    assert_eq!(encoded, json!({"name": "value", "type": "string", "required": true}));
}

#[test]
fn diagnostic_builders_set_fields() {
    let diagnostic = Diagnostic::error("bad value")
        .with_detail("expected string")
        .with_location("main.tm.hcl", 3, 7);
    assert!(diagnostic.is_error());
    assert_eq!(diagnostic.file, "main.tm.hcl");
    assert_eq!((diagnostic.line, diagnostic.column), (3, 7));
    assert!(!Diagnostic::warning("meh").is_error());
}
