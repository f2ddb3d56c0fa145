//! Tests for plugin error formatting and classification.

use rstest::rstest;
use tm_plugin_proto::RpcStatus;

use super::*;

#[test]
fn deadline_expiry_becomes_timeout() {
    let error = PluginError::from_rpc(
        "echo",
        RpcError::DeadlineExceeded {
            method: "Lifecycle/PostInit".to_owned(),
        },
        60,
    );
    assert!(matches!(error, PluginError::Timeout { timeout_secs: 60, .. }));
    assert_eq!(error.to_string(), "plugin 'echo' timed out after 60s during call");
}

#[rstest]
#[case::unimplemented(RpcStatus::unimplemented("no Generate service"), true)]
#[case::internal(RpcStatus::internal("boom"), false)]
fn unimplemented_status_is_detected(#[case] status: RpcStatus, #[case] expected: bool) {
    let error = PluginError::from_rpc("echo", RpcError::Status(status), 60);
    assert_eq!(error.is_unimplemented(), expected);
}

#[test]
fn manifest_error_names_the_file() {
    let error = PluginError::Manifest {
        path: PathBuf::from("/u/plugins/echo/manifest.json"),
        message: "missing field `name`".to_owned(),
    };
    assert_eq!(
        error.to_string(),
        "invalid plugin manifest '/u/plugins/echo/manifest.json': missing field `name`"
    );
}
