//! Tests for plugin discovery.

use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::manifest::{MANIFEST_FILE, plugin_dir};

#[fixture]
fn user_dir() -> TempDir {
    TempDir::new().expect("temp dir")
}

fn install(user_dir: &Path, name: &str, manifest: &serde_json::Value) {
    let dir = plugin_dir(user_dir, name);
    fs::create_dir_all(&dir).expect("plugin dir");
    fs::write(dir.join(MANIFEST_FILE), manifest.to_string()).expect("manifest");
}

#[rstest]
fn missing_plugins_directory_is_empty(user_dir: TempDir) {
    let plugins = discover_installed(user_dir.path()).expect("discover");
    assert!(plugins.is_empty());
}

#[rstest]
fn resolves_binary_under_plugin_directory(user_dir: TempDir) {
    install(
        user_dir.path(),
        "echo",
        &json!({"name": "echo", "version": "1.0.0", "protocol": "rpc", "binaries": {"cli": {"path": "tm-plugin-echo"}}}),
    );

    let plugins = discover_installed(user_dir.path()).expect("discover");
    assert_eq!(plugins.len(), 1);
    let plugin = plugins.first().expect("one plugin");
    assert_eq!(plugin.name(), "echo");
    assert_eq!(
        plugin.binary_path,
        plugin_dir(user_dir.path(), "echo").join("tm-plugin-echo")
    );
}

#[rstest]
fn filters_and_sorts_plugins(user_dir: TempDir) {
    let with_cli = |name: &str, extra: serde_json::Value| {
        let mut manifest = json!({"name": name, "version": "1", "binaries": {"cli": {"path": name}}});
        if let (Some(target), Some(fields)) = (manifest.as_object_mut(), extra.as_object()) {
            target.extend(fields.clone());
        }
        manifest
    };
    install(user_dir.path(), "zeta", &with_cli("zeta", json!({"protocol": "grpc"})));
    install(user_dir.path(), "alpha", &with_cli("alpha", json!({"metadata": {"protocol": "rpc"}})));
    install(user_dir.path(), "wasm", &with_cli("wasm", json!({"protocol": "wasm"})));
    install(
        user_dir.path(),
        "nobin",
        &json!({"name": "nobin", "version": "1", "protocol": "grpc"}),
    );
    install(
        user_dir.path(),
        "abs",
        &json!({"name": "abs", "version": "1", "protocol": "grpc", "binaries": {"cli": {"path": "/bin/true"}}}),
    );

    let names: Vec<String> = discover_installed(user_dir.path())
        .expect("discover")
        .into_iter()
        .map(|plugin| plugin.manifest.name)
        .collect();
    assert_eq!(names, ["alpha", "zeta"]);
}

#[rstest]
fn corrupt_manifest_aborts_discovery(user_dir: TempDir) {
    install(
        user_dir.path(),
        "good",
        &json!({"name": "good", "version": "1", "protocol": "grpc", "binaries": {"cli": {"path": "good"}}}),
    );
    let bad = plugin_dir(user_dir.path(), "bad");
    fs::create_dir_all(&bad).expect("bad dir");
    fs::write(bad.join(MANIFEST_FILE), "{").expect("bad manifest");

    let error = discover_installed(user_dir.path()).expect_err("corrupt manifest");
    assert!(matches!(error, PluginError::Manifest { .. }));
}

#[rstest]
fn disabled_switch_skips_discovery(user_dir: TempDir) {
    install(
        user_dir.path(),
        "echo",
        &json!({"name": "echo", "version": "1", "protocol": "grpc", "binaries": {"cli": {"path": "echo"}}}),
    );
    let enabled = Config::default().with_user_dir(user_dir.path());
    let disabled = enabled.clone().with_disable_plugins("1");

    assert_eq!(discover_enabled(&enabled).expect("enabled").len(), 1);
    assert!(discover_enabled(&disabled).expect("disabled").is_empty());
}
