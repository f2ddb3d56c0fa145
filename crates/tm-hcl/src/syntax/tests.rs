//! Tests for the structural reader.

use rstest::rstest;

use super::expr::classify;
use super::parse_blocks;
use crate::ast::{LiteralValue, NumberText};
use crate::error::HclError;

fn only_attribute(source: &str, name: &str) -> crate::ast::Expression {
    let blocks = parse_blocks("test.tm.hcl", source).expect("valid source");
    let block = blocks.first().expect("one block");
    block
        .attributes
        .get(name)
        .and_then(|attribute| attribute.expr.clone())
        .expect("attribute present")
}

#[test]
fn reads_labels_attributes_and_nested_blocks() {
    let source = r#"
# leading comment
pluginblock "first" other {
  value = "hello" // trailing
  count = 3

  nested {
    flag = true
  }
}
"#;
    let blocks = parse_blocks("stack.tm.hcl", source).expect("valid source");
    let block = blocks.first().expect("one block");

    assert_eq!(block.block_type, "pluginblock");
    assert_eq!(block.labels, ["first", "other"]);
    assert_eq!(block.range.line, 3);
    assert_eq!(block.attributes.len(), 2);
    let nested = block.blocks.first().expect("nested block");
    assert_eq!(nested.block_type, "nested");
    assert!(nested.attributes.contains_key("flag"));
}

#[test]
fn one_line_blocks_end_at_closing_brace() {
    let expr = only_attribute("stack { name = \"a\" }\n", "name");
    assert_eq!(
        expr.constant_value(),
        Some(&LiteralValue::String("a".to_owned()))
    );
    assert_eq!(expr.source(), " \"a\"");
}

#[rstest]
#[case::bool(" true", LiteralValue::Bool(true))]
#[case::null(" null", LiteralValue::Null)]
#[case::int(" 42", LiteralValue::Number(NumberText::new("42")))]
#[case::float(" 2.5", LiteralValue::Number(NumberText::new("2.5")))]
fn literal_tokens_are_literals(#[case] source: &str, #[case] expected: LiteralValue) {
    let expr = classify(source);
    assert_eq!(expr.literal_value(), Some(&expected));
    assert_eq!(expr.constant_value(), None);
}

#[rstest]
#[case::negative(" -3", LiteralValue::Number(NumberText::new("-3")))]
#[case::template(" \"a\\tb\"", LiteralValue::String("a\tb".to_owned()))]
#[case::escaped_interpolation(" \"$${x}\"", LiteralValue::String("${x}".to_owned()))]
#[case::unicode(" \"\\u00e9\"", LiteralValue::String("\u{e9}".to_owned()))]
fn context_free_expressions_are_constants(
    #[case] source: &str,
    #[case] expected: LiteralValue,
) {
    let expr = classify(source);
    assert_eq!(expr.literal_value(), None);
    assert_eq!(expr.constant_value(), Some(&expected));
}

#[rstest]
#[case::reference(" var.name")]
#[case::interpolation(" \"a-${var.b}\"")]
#[case::directive(" \"%{if true}x%{endif}\"")]
#[case::list(" [1, 2]")]
#[case::call(" upper(\"x\")")]
#[case::concatenated(" \"a\" == \"b\"")]
fn dynamic_expressions_have_no_value(#[case] source: &str) {
    let expr = classify(source);
    assert_eq!(expr.literal_value(), None);
    assert_eq!(expr.constant_value(), None);
    assert_eq!(expr.source(), source);
}

#[test]
fn multi_line_collections_are_captured_whole() {
    let expr = only_attribute("stack {\n  tags = [\n    \"a\",\n    \"b\",\n  ]\n  x = 1\n}\n", "tags");
    assert_eq!(expr.source(), " [\n    \"a\",\n    \"b\",\n  ]");
}

#[test]
fn heredoc_keeps_content_and_trailing_newline() {
    let expr = only_attribute("stack {\n  doc = <<EOT\nline one\nline two\nEOT\n}\n", "doc");
    assert_eq!(
        expr.constant_value(),
        Some(&LiteralValue::String("line one\nline two\n".to_owned()))
    );
    assert_eq!(expr.source(), " <<EOT\nline one\nline two\nEOT\n");
}

#[test]
fn indented_heredoc_strips_common_indent() {
    let expr = only_attribute("stack {\n  doc = <<-EOT\n    a\n      b\n    EOT\n}\n", "doc");
    assert_eq!(
        expr.constant_value(),
        Some(&LiteralValue::String("a\n  b\n".to_owned()))
    );
}

#[test]
fn heredoc_with_interpolation_is_dynamic() {
    let expr = only_attribute("stack {\n  doc = <<EOT\n${var.x}\nEOT\n}\n", "doc");
    assert_eq!(expr.constant_value(), None);
}

#[rstest]
#[case::top_level_attribute("name = 1\n")]
#[case::unterminated_block("stack {\n  a = 1\n")]
#[case::unterminated_string("stack {\n  a = \"x\n}\n")]
#[case::missing_value("stack {\n  a =\n}\n")]
#[case::duplicate_attribute("stack {\n  a = 1\n  a = 2\n}\n")]
#[case::interpolated_label("stack \"${x}\" {\n}\n")]
#[case::stray_character("stack {\n  = 1\n}\n")]
fn malformed_sources_are_rejected(#[case] source: &str) {
    let error = parse_blocks("bad.tm.hcl", source).expect_err("malformed source");
    assert!(matches!(error, HclError::Syntax { .. }), "{error}");
}

#[test]
fn syntax_errors_carry_position() {
    let error = parse_blocks("bad.tm.hcl", "stack {\n  a = \"x\n}\n").expect_err("unterminated");
    let HclError::Syntax { file, line, .. } = error else {
        panic!("expected a syntax error");
    };
    assert_eq!(file, "bad.tm.hcl");
    assert_eq!(line, 2);
}
