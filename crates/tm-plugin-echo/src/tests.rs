use rstest::rstest;
use tm_plugin_proto::Code;
use tm_plugin_proto::messages::{
    AttributeValue, BlockKind, CommandOutput, CommandRequest, GenerateOutput, GenerateRequest,
    ParsedBlock, ParsedBlocksRequest, PostInitRequest, Severity,
};
use tm_plugin_proto::service::{
    CommandService, GenerateService, HclSchemaService, LifecycleService, PluginService,
};

use super::*;

#[rstest]
#[case::unset(None, 4)]
#[case::blank(Some("  "), 4)]
#[case::single(Some("hclschema"), 1)]
#[case::mixed_case(Some("Command, HCL_SCHEMA ,generate,"), 3)]
fn selection_parses_service_lists(#[case] value: Option<&str>, #[case] count: usize) {
    let selection = Selection::parse(value).expect("valid selection");
    assert_eq!(selection.0.len(), count);
}

#[test]
fn selection_rejects_unknown_services() {
    assert!(Selection::parse(Some("command,telepathy")).is_err());
}

#[test]
fn server_capabilities_follow_the_selection() {
    let all = server(&Selection::default()).capabilities();
    assert!(all.has_commands && all.has_hcl_schema && all.has_post_init_hooks);
    assert!(all.has_generate_override);

    let only = server(&Selection::parse(Some("hcl_schema")).expect("selection")).capabilities();
    assert!(only.has_hcl_schema);
    assert!(!only.has_commands && !only.has_post_init_hooks && !only.has_generate_override);
}

#[test]
fn info_names_the_plugin() {
    let info = Echo.get_plugin_info().expect("info");
    assert_eq!(info.name, "echo");
    assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(info.product_name, "terramate");
}

fn run(command: &str) -> Result<Vec<CommandOutput>, RpcStatus> {
    let mut output = Vec::new();
    Echo.execute_command(
        CommandRequest {
            command: command.to_owned(),
            ..CommandRequest::default()
        },
        &mut output,
    )
    .map(|()| output)
}

#[test]
fn hello_greets_and_succeeds() {
    assert_eq!(
        run("hello").expect("hello"),
        vec![
            CommandOutput::Stdout(b"hello\n".to_vec()),
            CommandOutput::ExitCode(0)
        ]
    );
}

#[test]
fn fail_writes_to_stderr_and_exits_two() {
    let output = run("fail").expect("fail runs");
    assert!(matches!(output.first(), Some(CommandOutput::Stderr(_))));
    assert_eq!(output.last(), Some(&CommandOutput::ExitCode(2)));
}

#[test]
fn unknown_commands_are_invalid() {
    let status = run("dance").expect_err("unknown");
    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(Echo.get_commands().expect("commands").commands.len(), 2);
}

#[test]
fn schema_declares_one_labelled_block() {
    let schemas = Echo.get_hcl_schema().expect("schema").schemas;
    let [schema] = schemas.as_slice() else {
        panic!("expected one schema, got {schemas:?}");
    };
    assert_eq!(schema.name, BLOCK_TYPE);
    assert_eq!(schema.kind, BlockKind::MergedLabels);
    assert_eq!(schema.label_count, 1);
    assert!(schema.attributes.iter().any(|attr| attr.name == "value" && attr.required));
}

fn block(attributes: &[(&str, AttributeValue)]) -> ParsedBlock {
    ParsedBlock {
        file_path: "/main.tm.hcl".to_owned(),
        block_type: BLOCK_TYPE.to_owned(),
        labels: vec!["one".to_owned()],
        attributes: attributes
            .iter()
            .map(|(name, value)| ((*name).to_owned(), value.clone()))
            .collect(),
        nested_blocks: Vec::new(),
    }
}

#[test]
fn processing_echoes_the_request() {
    let request = ParsedBlocksRequest {
        block_type: BLOCK_TYPE.to_owned(),
        blocks: vec![block(&[("value", AttributeValue::String("x".to_owned()))])],
    };
    let response = Echo.process_parsed_blocks(request.clone()).expect("process");
    let echoed: ParsedBlocksRequest =
        serde_json::from_slice(&response.plugin_data).expect("echoed json");
    assert_eq!(echoed, request);
    assert_eq!(response.diagnostics.len(), 1);
    assert!(response
        .diagnostics
        .iter()
        .all(|diagnostic| diagnostic.severity == Severity::Warning));
}

#[test]
fn a_fail_attribute_yields_an_error_diagnostic() {
    let request = ParsedBlocksRequest {
        block_type: BLOCK_TYPE.to_owned(),
        blocks: vec![block(&[("fail", AttributeValue::Bool(true))])],
    };
    let response = Echo.process_parsed_blocks(request).expect("process");
    assert!(response.diagnostics.iter().any(|diagnostic| diagnostic.is_error()));
}

#[test]
fn generate_writes_one_file_and_exits_cleanly() {
    let mut output = Vec::new();
    Echo.generate(GenerateRequest::default(), &mut output)
        .expect("generate");
    assert!(matches!(
        output.first(),
        Some(GenerateOutput::FileWrite(file)) if file.path == GENERATED_FILE
    ));
    assert!(output.contains(&GenerateOutput::Stdout(b"generated\n".to_vec())));
    assert_eq!(output.last(), Some(&GenerateOutput::ExitCode(0)));
}

#[test]
fn post_init_without_a_host_still_reports_updates() {
    let response = Echo
        .post_init(PostInitRequest {
            root_dir: "/project".to_owned(),
        })
        .expect("post init");
    assert_eq!(response.stack_updates.len(), 1);
    let [patch] = response.config_patches.as_slice() else {
        panic!("expected one patch");
    };
    let data: serde_json::Value = serde_json::from_slice(&patch.plugin_data).expect("json");
    assert_eq!(data["block_type"], "echo");
    assert_eq!(data["root_dir"], "/project");
}
