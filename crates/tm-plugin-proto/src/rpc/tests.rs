//! Round trips over a real loopback connection.

use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::endpoint::SocketEndpoint;
use crate::status::{Code, RpcStatus};
use crate::transport::{ListenerHandle, SocketListener};

struct MathService;

impl Service for MathService {
    fn name(&self) -> &'static str {
        "Math"
    }

    fn call(
        &self,
        method: &str,
        params: Value,
        items: &mut dyn ItemSink,
    ) -> Result<Value, RpcStatus> {
        match method {
            "Math/Double" => {
                let value: i64 = decode_params(params)?;
                encode_result(&(value * 2))
            }
            "Math/Count" => {
                let upto: u64 = decode_params(params)?;
                for n in 1..=upto {
                    items.send_item(json!(n))?;
                }
                Ok(Value::Null)
            }
            "Math/Fail" => Err(RpcStatus::not_found("nothing here")),
            "Math/Sleep" => {
                thread::sleep(Duration::from_millis(400));
                Ok(Value::Null)
            }
            other => Err(RpcStatus::unimplemented(other)),
        }
    }
}

struct Server {
    endpoint: SocketEndpoint,
    _handle: ListenerHandle,
}

#[fixture]
fn server() -> Server {
    let router = Router::new().with_service(Arc::new(MathService));
    let listener = SocketListener::bind(&SocketEndpoint::loopback()).expect("bind listener");
    let endpoint = listener.endpoint().clone();
    let handle = listener
        .start(Arc::new(RouterHandler::new(Arc::new(router))))
        .expect("start listener");
    Server {
        endpoint,
        _handle: handle,
    }
}

fn connect(server: &Server) -> RpcConnection {
    RpcConnection::connect(&server.endpoint).expect("connect")
}

#[rstest]
fn unary_call_returns_result(server: Server) {
    let mut connection = connect(&server);
    let doubled: i64 = connection.call("Math/Double", &21).expect("call succeeds");
    assert_eq!(doubled, 42);
    let again: i64 = connection.call("Math/Double", &5).expect("second call succeeds");
    assert_eq!(again, 10);
}

#[rstest]
fn stream_yields_items_in_order(server: Server) {
    let mut connection = connect(&server);
    let items: Vec<u64> = connection
        .call_stream("Math/Count", &3)
        .expect("open stream")
        .collect::<Result<_, _>>()
        .expect("stream succeeds");
    assert_eq!(items, vec![1, 2, 3]);
}

#[rstest]
fn abandoned_stream_keeps_connection_usable(server: Server) {
    let mut connection = connect(&server);
    {
        let mut stream = connection
            .call_stream::<_, u64>("Math/Count", &5)
            .expect("open stream");
        assert_eq!(stream.next().map(Result::ok), Some(Some(1)));
    }
    let doubled: i64 = connection.call("Math/Double", &4).expect("call after drop");
    assert_eq!(doubled, 8);
}

#[rstest]
fn error_status_is_propagated(server: Server) {
    let mut connection = connect(&server);
    let error = connection
        .call::<_, Value>("Math/Fail", &Value::Null)
        .expect_err("call fails");
    assert_eq!(error.code(), Code::NotFound);
    assert_eq!(error.status().map(RpcStatus::message), Some("nothing here"));
}

#[rstest]
#[case::unknown_service("Geometry/Area")]
#[case::no_separator("Double")]
#[case::unknown_method("Math/Triple")]
fn unknown_methods_are_unimplemented(server: Server, #[case] method: &str) {
    let mut connection = connect(&server);
    let error = connection
        .call::<_, Value>(method, &Value::Null)
        .expect_err("call fails");
    assert!(error.is_unimplemented(), "got {error}");
}

#[rstest]
fn invalid_params_are_invalid_argument(server: Server) {
    let mut connection = connect(&server);
    let error = connection
        .call::<_, i64>("Math/Double", "not a number")
        .expect_err("call fails");
    assert_eq!(error.code(), Code::InvalidArgument);
}

#[rstest]
fn read_timeout_surfaces_as_deadline(server: Server) {
    let mut connection = connect(&server);
    connection
        .set_read_timeout(Some(Duration::from_millis(50)))
        .expect("set timeout");
    let error = connection
        .call::<_, Value>("Math/Sleep", &Value::Null)
        .expect_err("call times out");
    assert!(
        matches!(error, RpcError::DeadlineExceeded { .. }),
        "got {error}"
    );
}

#[rstest]
fn malformed_frame_with_id_gets_error_reply(server: Server) {
    let mut stream = server.endpoint.connect().expect("connect raw");
    stream
        .write_all(b"{\"kind\":\"request\",\"id\":7}\n")
        .expect("write frame");
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).expect("read reply");
    let frame: Frame = serde_json::from_str(&line).expect("reply is a frame");
    match frame {
        Frame::Error { id, status } => {
            assert_eq!(id, 7);
            assert_eq!(status.code(), Code::InvalidArgument);
        }
        other => panic!("expected error frame, got {other:?}"),
    }
}

#[test]
fn closing_method_ends_connection() {
    let router = Arc::new(
        Router::new()
            .with_service(Arc::new(MathService))
            .close_after("Math/Double"),
    );
    let listener = SocketListener::bind(&SocketEndpoint::loopback()).expect("bind listener");
    let endpoint = listener.endpoint().clone();
    let serving = thread::spawn(move || {
        let stream = listener.accept().expect("accept");
        serve_connection(stream, &router)
    });

    let mut connection = RpcConnection::connect(&endpoint).expect("connect");
    let doubled: i64 = connection.call("Math/Double", &1).expect("call succeeds");
    assert_eq!(doubled, 2);
    serving
        .join()
        .expect("join server")
        .expect("server exits cleanly");

    let error = connection
        .call::<_, i64>("Math/Double", &1)
        .expect_err("connection is closed");
    assert_eq!(error.code(), Code::Unavailable);
}
