//! Unit tests for the handshake contract.

use rstest::rstest;

use super::*;

#[rstest]
#[case::exact(Some("terramate"), true)]
#[case::missing(None, false)]
#[case::empty(Some(""), false)]
#[case::wrong_case(Some("Terramate"), false)]
fn cookie_requires_exact_value(#[case] value: Option<&str>, #[case] expected: bool) {
    assert_eq!(HANDSHAKE.cookie_matches(value), expected);
}

#[test]
fn handshake_constants_are_stable() {
    assert_eq!(HANDSHAKE.protocol_version, 1);
    assert_eq!(HANDSHAKE.magic_cookie_key, "TM_PLUGIN_MAGIC_COOKIE");
    assert_eq!(HANDSHAKE.magic_cookie_value, "terramate");
    assert_eq!(PLUGIN_BUNDLE, "terramate-grpc");
}

#[test]
fn line_renders_and_parses_back() {
    let endpoint = SocketEndpoint::tcp("127.0.0.1", 40123);
    let rendered = HandshakeLine::new(&HANDSHAKE, &endpoint).to_string();
    assert_eq!(rendered, "1|1|tcp|127.0.0.1:40123|jsonrpc");

    let parsed = HandshakeLine::parse(&HANDSHAKE, &format!("{rendered}\n")).expect("valid line");
    assert_eq!(parsed.endpoint(), &endpoint);
    assert_eq!(parsed.app_version(), 1);
}

#[rstest]
#[case::too_few_fields("1|1|tcp|127.0.0.1:1")]
#[case::not_a_number("x|1|tcp|127.0.0.1:1|jsonrpc")]
#[case::plugin_banner("Usage: plugin [OPTIONS]")]
fn parse_rejects_malformed_lines(#[case] line: &str) {
    let error = HandshakeLine::parse(&HANDSHAKE, line).expect_err("line should be rejected");
    assert!(matches!(error, HandshakeError::Malformed { .. }), "{error}");
}

#[test]
fn parse_rejects_core_version_mismatch() {
    let error = HandshakeLine::parse(&HANDSHAKE, "2|1|tcp|127.0.0.1:1|jsonrpc")
        .expect_err("core version 2 is unsupported");
    assert!(matches!(
        error,
        HandshakeError::CoreVersion {
            expected: 1,
            actual: 2
        }
    ));
}

#[test]
fn parse_rejects_app_version_mismatch() {
    let error = HandshakeLine::parse(&HANDSHAKE, "1|7|tcp|127.0.0.1:1|jsonrpc")
        .expect_err("app version 7 is unsupported");
    assert!(matches!(
        error,
        HandshakeError::ProtocolVersion {
            expected: 1,
            actual: 7
        }
    ));
}

#[test]
fn parse_rejects_other_wire_protocols() {
    let error = HandshakeLine::parse(&HANDSHAKE, "1|1|tcp|127.0.0.1:1|grpc")
        .expect_err("grpc framing is unsupported");
    assert!(matches!(error, HandshakeError::WireProtocol { .. }));
}

#[test]
fn parse_rejects_bad_address() {
    let error = HandshakeLine::parse(&HANDSHAKE, "1|1|udp|127.0.0.1:1|jsonrpc")
        .expect_err("udp is not a stream transport");
    assert!(matches!(error, HandshakeError::Address(_)));
}
