//! Tests for manifest decoding and validation.

use rstest::rstest;
use serde_json::json;
use tempfile::TempDir;

use super::*;

fn decode(value: Value) -> Manifest {
    serde_json::from_value(value).expect("valid manifest")
}

#[rstest]
#[case::grpc(json!({"name": "a", "version": "1", "protocol": "grpc"}), true)]
#[case::rpc_alias(json!({"name": "a", "version": "1", "protocol": "rpc"}), true)]
#[case::legacy_metadata(json!({"name": "a", "version": "1", "metadata": {"protocol": "rpc"}}), true)]
#[case::legacy_grpc(json!({"name": "a", "version": "1", "metadata": {"protocol": "grpc"}}), true)]
#[case::both(json!({"name": "a", "version": "1", "protocol": "grpc", "metadata": {"protocol": "rpc"}}), true)]
#[case::other(json!({"name": "a", "version": "1", "protocol": "wasm"}), false)]
#[case::other_with_legacy(json!({"name": "a", "version": "1", "protocol": "wasm", "metadata": {"protocol": "rpc"}}), true)]
#[case::undeclared(json!({"name": "a", "version": "1"}), false)]
#[case::metadata_not_string(json!({"name": "a", "version": "1", "metadata": {"protocol": 1}}), false)]
fn rpc_protocol_is_either_signal(#[case] value: Value, #[case] expected: bool) {
    assert_eq!(decode(value).speaks_rpc(), expected);
}

#[rstest]
#[case::relative("bin/echo", Some("bin/echo"))]
#[case::empty("", None)]
#[case::blank("  ", None)]
#[case::absolute("/usr/bin/echo", None)]
fn cli_binary_must_be_relative(#[case] path: &str, #[case] expected: Option<&str>) {
    let manifest = Manifest::rpc("echo", "1.0.0", path);
    assert_eq!(manifest.cli_binary(), expected);
}

#[test]
fn ls_binary_alone_is_not_launchable() {
    let manifest = decode(json!({
        "name": "a",
        "version": "1",
        "protocol": "grpc",
        "binaries": {"ls": {"path": "a-ls"}}
    }));
    assert_eq!(manifest.cli_binary(), None);
}

#[test]
fn save_then_load_preserves_fields() {
    let dir = TempDir::new().expect("temp dir");
    let mut manifest = Manifest::rpc("echo", "0.3.0", "tm-plugin-echo");
    manifest
        .metadata
        .insert("source".to_owned(), json!("local"));
    manifest.save(dir.path()).expect("save");

    let loaded = Manifest::load(dir.path()).expect("load");
    assert_eq!(loaded, manifest);
}

#[rstest]
#[case::no_name(json!({"name": " ", "version": "1"}))]
#[case::no_version(json!({"name": "a", "version": ""}))]
fn validate_rejects_missing_identity(#[case] value: Value) {
    assert!(decode(value).validate().is_err());
}

#[test]
fn load_reports_malformed_json() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join(MANIFEST_FILE), "{not json").expect("write");

    let error = Manifest::load(dir.path()).expect_err("malformed");
    assert!(matches!(error, PluginError::Manifest { .. }));
}
