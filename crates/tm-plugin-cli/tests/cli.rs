//! Runs the `tm-plugin` binary against scratch user directories.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use rstest::{fixture, rstest};
use tempfile::TempDir;
use tm_plugins::Manifest;
use tm_plugins::manifest::plugin_dir;

struct Sandbox {
    user: TempDir,
    project: TempDir,
}

#[fixture]
fn sandbox() -> Sandbox {
    let project = TempDir::new().expect("project dir");
    fs::write(
        project.path().join("main.tm.hcl"),
        "stack {\n  name = \"main\"\n}\n",
    )
    .expect("write config");
    Sandbox {
        user: TempDir::new().expect("user dir"),
        project,
    }
}

fn install(user_dir: &Path, name: &str) {
    let dir = plugin_dir(user_dir, name);
    Manifest::rpc(name, "1.0.0", "bin/plugin")
        .save(&dir)
        .expect("save manifest");
    fs::create_dir_all(dir.join("bin")).expect("bin dir");
    let binary = dir.join("bin/plugin");
    fs::write(&binary, "#!/bin/sh\nexit 1\n").expect("write binary");
    fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).expect("chmod binary");
}

fn tm_plugin(sandbox: &Sandbox) -> Command {
    let mut command = cargo_bin_cmd!("tm-plugin");
    command
        .env("TM_USER_DIR", sandbox.user.path())
        .env_remove("TM_DISABLE_GRPC_PLUGINS")
        .env("TM_LOG_FILTER", "off");
    command
}

#[rstest]
fn list_prints_nothing_without_plugins(sandbox: Sandbox) {
    tm_plugin(&sandbox)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[rstest]
fn list_prints_installed_plugins(sandbox: Sandbox) {
    install(sandbox.user.path(), "beta");
    install(sandbox.user.path(), "alpha");
    tm_plugin(&sandbox)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("alpha\t1.0.0\t"))
        .stdout(predicate::str::contains("beta\t1.0.0\t"));
}

#[rstest]
fn disabled_plugins_are_not_listed(sandbox: Sandbox) {
    install(sandbox.user.path(), "alpha");
    tm_plugin(&sandbox)
        .env("TM_DISABLE_GRPC_PLUGINS", "1")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[rstest]
fn info_on_a_missing_plugin_fails(sandbox: Sandbox) {
    tm_plugin(&sandbox)
        .args(["info", "ghost"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("plugin 'ghost' is not installed"));
}

#[rstest]
fn exec_reports_a_plugin_that_dies_before_the_handshake(sandbox: Sandbox) {
    install(sandbox.user.path(), "alpha");
    tm_plugin(&sandbox)
        .args(["exec", "alpha", "hello", "--start-timeout", "5"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("alpha"));
}

#[rstest]
fn parse_without_plugins_leaves_blocks_unhandled(sandbox: Sandbox) {
    tm_plugin(&sandbox)
        .arg("parse")
        .arg(sandbox.project.path())
        .arg("main.tm.hcl")
        .assert()
        .success()
        .stdout(predicate::str::diff("unhandled\t1\n"));
}

#[rstest]
fn parse_skips_plugins_that_fail_to_start(sandbox: Sandbox) {
    install(sandbox.user.path(), "broken");
    tm_plugin(&sandbox)
        .env("TM_LOG_FILTER", "warn")
        .args(["parse", "--start-timeout", "5"])
        .arg(sandbox.project.path())
        .arg("main.tm.hcl")
        .assert()
        .success()
        .stdout(predicate::str::diff("unhandled\t1\n"))
        .stderr(predicate::str::contains("broken"));
}

#[rstest]
fn generate_without_overrides_succeeds_quietly(sandbox: Sandbox) {
    tm_plugin(&sandbox)
        .arg("generate")
        .arg(sandbox.project.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("no installed plugin overrides generate"));
}

#[rstest]
fn post_init_with_no_plugins_reports_nothing(sandbox: Sandbox) {
    tm_plugin(&sandbox)
        .arg("post-init")
        .arg(sandbox.project.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[rstest]
fn missing_project_root_is_an_error(sandbox: Sandbox) {
    tm_plugin(&sandbox)
        .args(["post-init", "/definitely/not/here"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("project root"));
}
