//! Calling side of a connection.

use std::io::BufReader;
use std::marker::PhantomData;
use std::ops::DerefMut;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use super::frame::{Frame, read_line, write_frame};
use super::{RPC_TARGET, RpcError};
use crate::endpoint::SocketEndpoint;
use crate::transport::ConnectionStream;

/// Client half of an RPC connection.
///
/// # Example
///
/// ```rust,no_run
/// use tm_plugin_proto::messages::{Capabilities, Empty};
/// use tm_plugin_proto::{RpcConnection, SocketEndpoint, methods};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let endpoint: SocketEndpoint = "tcp://127.0.0.1:5311".parse()?;
/// let mut connection = RpcConnection::connect(&endpoint)?;
/// let caps: Capabilities = connection.call(methods::GET_CAPABILITIES, &Empty {})?;
/// # let _ = caps;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RpcConnection {
    reader: BufReader<ConnectionStream>,
    next_id: u64,
}

impl RpcConnection {
    /// Wraps an established stream.
    #[must_use]
    pub fn new(stream: ConnectionStream) -> Self {
        Self {
            reader: BufReader::new(stream),
            next_id: 1,
        }
    }

    /// Dials `endpoint`.
    pub fn connect(endpoint: &SocketEndpoint) -> Result<Self, RpcError> {
        let method = format!("connect {endpoint}");
        let stream = endpoint
            .connect()
            .map_err(|err| RpcError::from_io(&method, err))?;
        Ok(Self::new(stream))
    }

    /// Bounds how long any single read waits for the peer.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), RpcError> {
        self.reader
            .get_ref()
            .set_read_timeout(timeout)
            .map_err(|err| RpcError::from_io("set_read_timeout", err))
    }

    /// Closes the connection; failures are ignored.
    pub fn close(&self) {
        drop(self.reader.get_ref().shutdown());
    }

    /// Performs a unary call.
    pub fn call<P, R>(&mut self, method: &str, params: &P) -> Result<R, RpcError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let id = self.send_request(method, params)?;
        match self.read_reply(id, method)? {
            Frame::Response { result, .. } => {
                serde_json::from_value(normalise_null(result))
                    .map_err(|err| RpcError::decode(method, &err))
            }
            Frame::Error { status, .. } => Err(RpcError::Status(status)),
            Frame::Item { .. } => Err(RpcError::protocol(
                method,
                "stream item received for a unary call",
            )),
            Frame::Request { .. } => Err(RpcError::protocol(method, "unexpected request frame")),
        }
    }

    /// Starts a server-streaming call on this connection.
    pub fn call_stream<P, T>(
        &mut self,
        method: &str,
        params: &P,
    ) -> Result<ServerStream<&mut Self, T>, RpcError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        ServerStream::open(self, method, params)
    }

    fn send_request<P>(&mut self, method: &str, params: &P) -> Result<u64, RpcError>
    where
        P: Serialize + ?Sized,
    {
        let params = serde_json::to_value(params).map_err(|err| RpcError::Encode {
            method: method.to_owned(),
            source: err.into(),
        })?;
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        let frame = Frame::Request {
            id,
            method: method.to_owned(),
            params,
        };
        trace!(target: RPC_TARGET, id, method, "sending request");
        write_frame(self.reader.get_mut(), &frame).map_err(|err| RpcError::from_io(method, err))?;
        Ok(id)
    }

    fn read_reply(&mut self, id: u64, method: &str) -> Result<Frame, RpcError> {
        let line = read_line(&mut self.reader)
            .map_err(|err| RpcError::from_io(method, err))?
            .ok_or_else(|| RpcError::Closed {
                method: method.to_owned(),
            })?;
        let frame: Frame =
            serde_json::from_str(&line).map_err(|err| RpcError::decode(method, &err))?;
        if frame.id() != id {
            return Err(RpcError::protocol(
                method,
                format!("reply for call {} while waiting for {id}", frame.id()),
            ));
        }
        Ok(frame)
    }
}

fn normalise_null(value: Value) -> Value {
    if value.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        value
    }
}

/// Elements of a server-streaming call, in order.
///
/// The iterator ends after the terminal frame. A failed call yields one
/// `Err` and then ends. Dropping the stream early reads and discards the
/// remaining frames so the connection can carry the next call.
pub struct ServerStream<C, T>
where
    C: DerefMut<Target = RpcConnection>,
{
    connection: C,
    id: u64,
    method: String,
    finished: bool,
    _item: PhantomData<fn() -> T>,
}

impl<C, T> ServerStream<C, T>
where
    C: DerefMut<Target = RpcConnection>,
    T: DeserializeOwned,
{
    /// Sends the request and returns the stream of replies.
    pub fn open<P>(mut connection: C, method: &str, params: &P) -> Result<Self, RpcError>
    where
        P: Serialize + ?Sized,
    {
        let id = connection.send_request(method, params)?;
        Ok(Self {
            connection,
            id,
            method: method.to_owned(),
            finished: false,
            _item: PhantomData,
        })
    }

    /// Connection carrying the stream.
    pub fn connection(&self) -> &RpcConnection {
        &self.connection
    }
}

impl<C, T> Iterator for ServerStream<C, T>
where
    C: DerefMut<Target = RpcConnection>,
    T: DeserializeOwned,
{
    type Item = Result<T, RpcError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let frame = match self.connection.read_reply(self.id, &self.method) {
            Ok(frame) => frame,
            Err(error) => {
                self.finished = true;
                return Some(Err(error));
            }
        };
        match frame {
            Frame::Item { item, .. } => Some(
                serde_json::from_value(item).map_err(|err| RpcError::decode(&self.method, &err)),
            ),
            Frame::Response { .. } => {
                self.finished = true;
                None
            }
            Frame::Error { status, .. } => {
                self.finished = true;
                Some(Err(RpcError::Status(status)))
            }
            Frame::Request { .. } => {
                self.finished = true;
                Some(Err(RpcError::protocol(&self.method, "unexpected request frame")))
            }
        }
    }
}

impl<C, T> Drop for ServerStream<C, T>
where
    C: DerefMut<Target = RpcConnection>,
{
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        debug!(
            target: RPC_TARGET,
            method = %self.method,
            "draining abandoned stream"
        );
        loop {
            match self.connection.read_reply(self.id, &self.method) {
                Ok(Frame::Item { .. }) => {}
                Ok(_) | Err(_) => break,
            }
        }
    }
}
