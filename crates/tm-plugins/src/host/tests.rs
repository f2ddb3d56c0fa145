use std::fs;
use std::path::Path;
use std::sync::Arc;

use rstest::{fixture, rstest};
use tempfile::TempDir;
use tm_plugin_proto::Code;
use tm_plugin_proto::messages::{
    DirEntry, ReadFileRequest, SetStackRequest, StackMetadata, WalkDirRequest, WriteFileRequest,
};
use tm_plugin_proto::service::HostApi;
use tm_project::{ProjectPath, ProjectRoot, StackDecl};

use super::*;
use crate::error::PluginError;

struct Project {
    dir: TempDir,
    host: HostService,
}

#[fixture]
fn project() -> Project {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    fs::create_dir_all(root.join("stacks/app")).expect("mkdir");
    fs::write(
        root.join("stacks/app/stack.tm.hcl"),
        "stack {\n  name = \"app\"\n  tags = [\"a\", \"b\"]\n}\n",
    )
    .expect("write stack");
    fs::write(root.join("README.md"), "readme").expect("write readme");
    let loaded = ProjectRoot::load(root).expect("load project");
    let host = HostService::for_project(loaded, Some(root.join(".user")));
    Project { dir, host }
}

fn read(host: &HostService, path: &str) -> Result<Vec<u8>, RpcStatus> {
    host.read_file(ReadFileRequest {
        path: path.to_owned(),
    })
    .map(|reply| reply.content)
}

fn write(host: &HostService, path: &str, content: &str, mode: u32) -> Result<(), RpcStatus> {
    host.write_file(WriteFileRequest {
        path: path.to_owned(),
        content: content.as_bytes().to_vec(),
        mode,
    })
}

fn walk(host: &HostService, root: &str, pattern: &str) -> Result<Vec<DirEntry>, RpcStatus> {
    let mut entries = Vec::new();
    host.walk_dir(
        WalkDirRequest {
            root: root.to_owned(),
            pattern: pattern.to_owned(),
        },
        &mut entries,
    )?;
    Ok(entries)
}

#[rstest]
fn reports_root_and_user_dirs(project: Project) {
    assert_eq!(
        project.host.get_root_dir().expect("root dir"),
        project.dir.path().display().to_string()
    );
    assert!(project.host.get_user_dir().expect("user dir").ends_with(".user"));

    let detached = HostService::default();
    assert_eq!(detached.get_root_dir().expect("root dir"), "");
    assert_eq!(detached.get_user_dir().expect("user dir"), "");
}

#[rstest]
#[case::empty("", Code::InvalidArgument)]
#[case::parent("../outside", Code::PermissionDenied)]
#[case::nested_parent("stacks/../../outside", Code::PermissionDenied)]
#[case::foreign_absolute("/etc/passwd", Code::PermissionDenied)]
fn rejects_paths_outside_the_root(project: Project, #[case] path: &str, #[case] code: Code) {
    let status = read(&project.host, path).expect_err("path must be refused");
    assert_eq!(status.code(), code);
}

#[rstest]
fn relative_paths_need_a_root() {
    let host = HostService::default();
    let relative = read(&host, "a.txt").expect_err("no root");
    assert_eq!(relative.code(), Code::InvalidArgument);
    assert_eq!(relative.message(), "root directory is unknown");
    let absolute = read(&host, "/tmp/a.txt").expect_err("no root");
    assert_eq!(absolute.code(), Code::PermissionDenied);
}

#[rstest]
fn resolves_relative_and_absolute_paths(project: Project) {
    let root = project.dir.path();
    let relative = project.host.resolve_path("stacks/./app/../app").expect("relative");
    assert_eq!(relative.relative, Path::new("stacks/app"));
    let absolute = project
        .host
        .resolve_path(&root.join("stacks/app").display().to_string())
        .expect("absolute");
    assert_eq!(absolute.host_path(), root.join("stacks/app"));
    let itself = project
        .host
        .resolve_path(&root.display().to_string())
        .expect("root itself");
    assert_eq!(itself.dir_relative(), Path::new("."));
}

#[rstest]
fn reads_and_writes_inside_the_root(project: Project) {
    assert_eq!(read(&project.host, "README.md").expect("read"), b"readme");
    write(&project.host, "gen/deep/out.txt", "generated", 0).expect("write");
    assert_eq!(
        fs::read_to_string(project.dir.path().join("gen/deep/out.txt")).expect("read back"),
        "generated"
    );
    write(&project.host, "gen/deep/out.txt", "again", 0).expect("overwrite");
    assert_eq!(read(&project.host, "gen/deep/out.txt").expect("read"), b"again");

    let missing = read(&project.host, "nope.txt").expect_err("missing file");
    assert_eq!(missing.code(), Code::NotFound);
}

#[cfg(unix)]
#[rstest]
fn new_files_get_the_requested_mode(project: Project) {
    use std::os::unix::fs::PermissionsExt;

    write(&project.host, "default.txt", "x", 0).expect("write");
    write(&project.host, "script.sh", "x", 0o755).expect("write");
    let mode = |name: &str| {
        fs::metadata(project.dir.path().join(name))
            .expect("stat")
            .permissions()
            .mode()
            & 0o777
    };
    assert_eq!(mode("default.txt") & 0o644, 0o644);
    assert_eq!(mode("script.sh") & 0o700, 0o700);
}

#[cfg(unix)]
#[rstest]
fn symlinks_cannot_escape_the_root(project: Project) {
    let outside = TempDir::new().expect("outside dir");
    fs::write(outside.path().join("secret"), "secret").expect("write secret");
    std::os::unix::fs::symlink(outside.path(), project.dir.path().join("escape"))
        .expect("symlink");

    let status = read(&project.host, "escape/secret").expect_err("escape refused");
    assert_ne!(status.code(), Code::Unknown);
    assert!(write(&project.host, "escape/planted", "x", 0).is_err());
    assert!(!outside.path().join("planted").exists());
    assert!(walk(&project.host, "escape", "").is_err());
}

#[rstest]
fn walks_in_sorted_order(project: Project) {
    let entries = walk(&project.host, ".", "").expect("walk");
    let paths: Vec<_> = entries.iter().map(|entry| entry.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![".", "README.md", "stacks", "stacks/app", "stacks/app/stack.tm.hcl"]
    );
    assert!(entries.first().is_some_and(|entry| entry.is_dir));
}

#[rstest]
fn walk_filters_by_base_name(project: Project) {
    let entries = walk(&project.host, "stacks", " *.tm.hcl ").expect("walk");
    assert_eq!(
        entries,
        vec![DirEntry {
            path: "app/stack.tm.hcl".to_owned(),
            is_dir: false,
        }]
    );
    let status = walk(&project.host, "stacks", "[").expect_err("bad glob");
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[rstest]
#[case::empty("", "/")]
#[case::slash("/", "/")]
#[case::relative("stacks/app", "/stacks/app")]
#[case::project_absolute("/stacks/app/", "/stacks/app")]
fn maps_request_paths_to_project_paths(
    project: Project,
    #[case] path: &str,
    #[case] expected: &str,
) {
    let mapped = project.host.to_project_path(path).expect("project path");
    assert_eq!(mapped, ProjectPath::new(expected));
}

#[rstest]
fn host_paths_under_the_root_become_project_paths(project: Project) {
    let host_path = project.dir.path().join("stacks/app").display().to_string();
    assert_eq!(
        project.host.to_project_path(&host_path).expect("project path"),
        ProjectPath::new("/stacks/app")
    );
}

#[rstest]
fn describes_config_nodes(project: Project) {
    let node = project.host.get_config_tree("/stacks/app").expect("node");
    assert_eq!(node.dir, "/stacks/app");
    assert!(node.is_stack);
    assert_eq!(node.stack.name, "app");
    assert_eq!(node.stack.tags, vec!["a".to_owned(), "b".to_owned()]);

    let plain = project.host.get_config_tree("stacks").expect("plain dir");
    assert!(!plain.is_stack);
    assert_eq!(plain.stack, StackMetadata::default());

    let missing = project.host.get_config_tree("/nowhere").expect_err("missing");
    assert_eq!(missing.code(), Code::NotFound);
}

#[rstest]
fn config_calls_need_a_loaded_project() {
    let host = HostService::default();
    let status = host.get_stack_metadata("/").expect_err("no project");
    assert_eq!(status.code(), Code::Unavailable);
    assert_eq!(status.message(), "configuration is not loaded");
}

#[rstest]
#[case::merge(true, vec!["a", "b", "c"])]
#[case::replace(false, vec!["c"])]
fn stack_metadata_updates_follow_merge_flag(
    project: Project,
    #[case] merge: bool,
    #[case] tags: Vec<&str>,
) {
    project
        .host
        .set_stack_metadata(SetStackRequest {
            path: "/stacks/app".to_owned(),
            metadata: Some(StackMetadata {
                tags: vec!["c".to_owned()],
                ..StackMetadata::default()
            }),
            merge,
        })
        .expect("update");
    let metadata = project.host.get_stack_metadata("/stacks/app").expect("metadata");
    assert_eq!(metadata.tags, tags);
    assert_eq!(metadata.name, if merge { "app" } else { "" });
}

#[rstest]
fn setting_metadata_declares_a_stack(project: Project) {
    project
        .host
        .set_stack_metadata(SetStackRequest {
            path: "/stacks".to_owned(),
            metadata: None,
            merge: false,
        })
        .expect("update");
    assert!(project.host.get_config_tree("/stacks").expect("node").is_stack);
}

#[rstest]
fn merge_fills_only_empty_scalars() {
    let mut stack = StackDecl {
        name: "kept".to_owned(),
        ..StackDecl::default()
    };
    let update = StackMetadata {
        name: "ignored".to_owned(),
        description: "filled".to_owned(),
        watch: vec!["w".to_owned()],
        ..StackMetadata::default()
    };
    apply_stack_metadata(&mut stack, &update, true);
    assert_eq!(stack.name, "kept");
    assert_eq!(stack.description, "filled");
    assert_eq!(stack.watch, vec!["w".to_owned()]);
}

#[rstest]
fn set_root_swaps_the_project(project: Project) {
    project.host.set_root(None, None);
    assert_eq!(project.host.root_dir(), None);
    assert!(project.host.root().is_none());
    let status = read(&project.host, "README.md").expect_err("root detached");
    assert_eq!(status.code(), Code::InvalidArgument);

    let reloaded = ProjectRoot::load(project.dir.path()).expect("reload").shared();
    project
        .host
        .set_root(Some(reloaded), Some(project.dir.path().to_path_buf()));
    assert_eq!(read(&project.host, "README.md").expect("read"), b"readme");
}

#[rstest]
fn serves_plugins_over_a_socket(project: Project) {
    let Project { dir, host } = project;
    let mut server = HostServer::start(Arc::new(host)).expect("host server");
    let (key, value) = server.env_pair();
    assert_eq!(key, tm_plugin_proto::handshake::HOST_ADDR_ENV);
    assert!(value.starts_with("tcp://127.0.0.1:"), "{value}");

    let mut client = HostServiceClient::connect(server.endpoint()).expect("connect");
    assert_eq!(
        client.get_root_dir().expect("root"),
        dir.path().display().to_string()
    );
    client
        .write_file("from-plugin.txt", b"hello".to_vec(), 0)
        .expect("write");
    assert_eq!(client.read_file("from-plugin.txt").expect("read"), b"hello");
    let names: Vec<String> = client
        .walk_dir(".", "*.txt")
        .expect("walk opens")
        .map(|entry| entry.map(|found| found.path))
        .collect::<Result<_, PluginError>>()
        .expect("walk completes");
    assert_eq!(names, vec!["from-plugin.txt".to_owned()]);
    client
        .set_stack_metadata(
            "/stacks/app",
            StackMetadata {
                tags: vec!["echo".to_owned()],
                ..StackMetadata::default()
            },
            true,
        )
        .expect("set metadata");
    let metadata = client.get_stack_metadata("/stacks/app").expect("metadata");
    assert_eq!(metadata.tags, vec!["a", "b", "echo"]);

    match client.read_file("../escape") {
        Err(PluginError::HostRejected { method, source }) => {
            assert_eq!(method, "Host/ReadFile");
            assert_eq!(source.code(), Code::PermissionDenied);
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
    server.shutdown();
    server.shutdown();
}
