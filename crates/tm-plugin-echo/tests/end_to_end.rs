//! Drives the real echo binary through the host machinery.
#![cfg(unix)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use rstest::{fixture, rstest};
use tempfile::TempDir;
use tm_config::Deadlines;
use tm_hcl::Parser;
use tm_plugin_proto::handshake::HANDSHAKE;
use tm_plugin_proto::messages::{CommandRequest, GenerateRequest, ParsedBlocksRequest};
use tm_plugin_proto::service::HostApi;
use tm_plugin_echo::{BLOCK_TYPE, GENERATED_FILE, POST_INIT_MARKER, SERVICES_ENV};
use tm_plugins::flows::{
    GenerateSink, HostContext, execute_command, run_generate_override, run_post_init,
};
use tm_plugins::schema::{ProcessDispatcher, SchemaDispatcher, hcl_options_from_schema};
use tm_plugins::{HostClient, HostServer, HostService, InstalledPlugin, Manifest, PluginError};
use tm_project::{ProjectPath, ProjectRoot};

const ECHO_BIN: &str = env!("CARGO_BIN_EXE_tm-plugin-echo");

fn deadlines() -> Deadlines {
    Deadlines::uniform(Duration::from_secs(10))
}

fn only(services: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(SERVICES_ENV.to_owned(), services.to_owned())])
}

fn echo_plugin() -> InstalledPlugin {
    let binary = Path::new(ECHO_BIN);
    InstalledPlugin {
        manifest: Manifest::rpc("echo", env!("CARGO_PKG_VERSION"), "tm-plugin-echo"),
        plugin_dir: binary.parent().unwrap_or(binary).to_path_buf(),
        binary_path: binary.to_path_buf(),
    }
}

#[derive(Default)]
struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl GenerateSink for Captured {
    fn stdout(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.stdout.extend_from_slice(chunk);
        Ok(())
    }

    fn stderr(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.stderr.extend_from_slice(chunk);
        Ok(())
    }
}

struct Project {
    dir: TempDir,
    service: Arc<HostService>,
}

#[fixture]
fn project() -> Project {
    let dir = TempDir::new().expect("project dir");
    fs::write(
        dir.path().join("root.tm.hcl"),
        "stack {\n  name = \"root\"\n  tags = [\"base\"]\n}\n",
    )
    .expect("write root stack");
    let loaded = ProjectRoot::load(dir.path()).expect("load project");
    let service = Arc::new(HostService::for_project(loaded, None));
    Project { dir, service }
}

#[test]
fn refuses_to_run_without_the_cookie() {
    let output = Command::new(ECHO_BIN)
        .env_remove(HANDSHAKE.magic_cookie_key)
        .stdin(Stdio::null())
        .output()
        .expect("run echo");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty(), "stdout must stay clean");
}

#[test]
fn full_plugin_reports_info_and_capabilities() {
    let mut client = HostClient::start(Path::new(ECHO_BIN), &BTreeMap::new(), deadlines())
        .expect("start echo");
    let info = client.client().plugin().get_plugin_info().expect("info");
    assert_eq!(info.name, "echo");
    let capabilities = client.client().plugin().get_capabilities().expect("capabilities");
    assert!(capabilities.has_commands);
    assert!(capabilities.has_hcl_schema);
    assert!(capabilities.has_post_init_hooks);
    assert!(capabilities.has_generate_override);
    client.kill();
    assert!(client.pid().is_none());
}

#[rstest]
#[case::hello("hello", 0, "hello\n", "")]
#[case::fail("fail", 2, "", "echo: failing on request\n")]
fn commands_stream_their_output(
    #[case] command: &str,
    #[case] exit_code: i32,
    #[case] stdout: &str,
    #[case] stderr: &str,
) {
    let mut client = HostClient::start(Path::new(ECHO_BIN), &BTreeMap::new(), deadlines())
        .expect("start echo");
    let mut captured = Captured::default();
    let request = CommandRequest {
        command: command.to_owned(),
        ..CommandRequest::default()
    };
    let code = execute_command(&client, &request, &mut captured).expect("command");
    assert_eq!(code, exit_code);
    assert_eq!(String::from_utf8_lossy(&captured.stdout), stdout);
    assert_eq!(String::from_utf8_lossy(&captured.stderr), stderr);
    client.kill();
}

#[test]
fn unknown_commands_fail_before_running() {
    let mut client = HostClient::start(Path::new(ECHO_BIN), &BTreeMap::new(), deadlines())
        .expect("start echo");
    let request = CommandRequest {
        command: "dance".to_owned(),
        ..CommandRequest::default()
    };
    let error = execute_command(&client, &request, &mut Captured::default())
        .expect_err("unknown command");
    assert!(matches!(error, PluginError::UnknownCommand { .. }));
    client.kill();
}

#[test]
fn schema_only_plugin_reports_missing_services_as_unimplemented() {
    let mut client = HostClient::start(Path::new(ECHO_BIN), &only("hcl_schema"), deadlines())
        .expect("start echo");
    let capabilities = client.client().plugin().get_capabilities().expect("capabilities");
    assert!(capabilities.has_hcl_schema);
    assert!(!capabilities.has_commands);
    assert!(!capabilities.has_post_init_hooks);
    assert!(!capabilities.has_generate_override);

    let error = client
        .client()
        .command()
        .get_commands()
        .expect_err("no command service");
    assert!(error.is_unimplemented(), "unexpected error: {error}");

    let schemas = client.client().hcl_schema().get_hcl_schema().expect("schema");
    assert_eq!(schemas.schemas.len(), 1);
    client.kill();
}

#[test]
fn parser_forwards_plugin_blocks_to_the_plugin() {
    let mut client = HostClient::start(Path::new(ECHO_BIN), &only("hcl_schema"), deadlines())
        .expect("start echo");
    let schemas = client
        .client()
        .hcl_schema()
        .get_hcl_schema()
        .expect("schema")
        .schemas;
    client.kill();

    let dispatcher: Arc<dyn SchemaDispatcher> =
        Arc::new(ProcessDispatcher::new(only("hcl_schema"), deadlines()));
    let options = hcl_options_from_schema("echo", Path::new(ECHO_BIN), &schemas, &dispatcher);
    let parsed = Parser::new(options)
        .parse_str(
            "main.tm.hcl",
            "pluginblock \"one\" {\n  value = \"first\"\n}\npluginblock \"two\" {\n  value = \"second\"\n}\n",
        )
        .expect("parse");

    let external = parsed.external.expect("plugin data stored");
    let stored = external.get("echo", BLOCK_TYPE).expect("echo data");
    assert_eq!(stored.len(), 2, "one call per label group");
    let labels: Vec<Vec<String>> = stored
        .iter()
        .map(|data| {
            let echoed: ParsedBlocksRequest =
                serde_json::from_slice(data).expect("echoed request");
            assert_eq!(echoed.block_type, BLOCK_TYPE);
            echoed
                .blocks
                .iter()
                .flat_map(|block| block.labels.clone())
                .collect()
        })
        .collect();
    assert_eq!(labels, vec![vec!["one".to_owned()], vec!["two".to_owned()]]);
}

#[test]
fn error_diagnostics_fail_the_parse() {
    let schemas = HostClient::start(Path::new(ECHO_BIN), &only("hcl_schema"), deadlines())
        .and_then(|client| client.client().hcl_schema().get_hcl_schema())
        .expect("schema")
        .schemas;
    let dispatcher: Arc<dyn SchemaDispatcher> =
        Arc::new(ProcessDispatcher::new(only("hcl_schema"), deadlines()));
    let options = hcl_options_from_schema("echo", Path::new(ECHO_BIN), &schemas, &dispatcher);
    let error = Parser::new(options)
        .parse_str(
            "main.tm.hcl",
            "pluginblock \"bad\" {\n  value = \"x\"\n  fail  = true\n}\n",
        )
        .expect_err("error diagnostic");
    assert!(error.to_string().contains("echo was asked to fail"), "{error}");
}

#[rstest]
fn post_init_updates_the_project_through_the_host_service(project: Project) {
    let server = HostServer::start(Arc::clone(&project.service) as Arc<dyn HostApi>)
        .expect("host server");
    let context = HostContext::new(&project.service, Some(&server));

    let report = run_post_init(&[echo_plugin()], &context, deadlines());

    assert!(report.is_success(), "errors: {:?}", report.errors);
    assert_eq!(report.ran, vec!["echo".to_owned()]);
    let marker = fs::read_to_string(project.dir.path().join(POST_INIT_MARKER)).expect("marker");
    assert_eq!(marker, "post-init\n");
    let metadata = project.service.get_stack_metadata("/").expect("root stack");
    assert_eq!(metadata.tags, vec!["base".to_owned(), "echo".to_owned()]);
    assert_eq!(metadata.description, "touched by echo");

    let root = project.service.root().expect("project");
    let tree = root.read().unwrap_or_else(PoisonError::into_inner);
    let node = tree.lookup(&ProjectPath::root()).expect("root node");
    assert_eq!(node.external.get("echo", "echo").map(<[Vec<u8>]>::len), Some(1));
}

#[rstest]
fn post_init_without_a_host_server_still_applies_updates(project: Project) {
    let context = HostContext::new(&project.service, None);

    let report = run_post_init(&[echo_plugin()], &context, deadlines());

    assert!(report.is_success(), "errors: {:?}", report.errors);
    assert!(!project.dir.path().join(POST_INIT_MARKER).exists());
    let metadata = project.service.get_stack_metadata("/").expect("root stack");
    assert_eq!(metadata.tags, vec!["base".to_owned()]);
}

#[rstest]
fn generate_override_writes_under_the_root(project: Project) {
    let context = HostContext::new(&project.service, None);
    let request = GenerateRequest {
        root_dir: project.dir.path().display().to_string(),
        working_dir: project.dir.path().display().to_string(),
    };
    let mut captured = Captured::default();

    let exit_code = run_generate_override(
        &[echo_plugin()],
        &context,
        &request,
        deadlines(),
        &mut captured,
    )
    .expect("generate");

    assert_eq!(exit_code, Some(0));
    assert_eq!(captured.stdout, b"generated\n");
    let generated = fs::read_to_string(project.dir.path().join(GENERATED_FILE)).expect("file");
    assert_eq!(generated, "generated by echo\n");
}
