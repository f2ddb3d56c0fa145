//! Serving side of a connection.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufReader, Write};
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::frame::{Frame, read_line, write_frame};
use super::{RPC_TARGET, RpcError};
use crate::methods;
use crate::service::OutputSink;
use crate::status::RpcStatus;
use crate::transport::{ConnectionHandler, ConnectionStream};

/// Receives raw stream elements produced while serving a call.
pub trait ItemSink {
    /// Sends one element to the caller.
    fn send_item(&mut self, item: Value) -> Result<(), RpcStatus>;
}

/// A named group of methods reachable through a [`Router`].
pub trait Service: Send + Sync {
    /// Service name, the part of a method before `/`.
    fn name(&self) -> &'static str;

    /// Handles one call. Streaming methods push elements through `items`
    /// before returning.
    fn call(
        &self,
        method: &str,
        params: Value,
        items: &mut dyn ItemSink,
    ) -> Result<Value, RpcStatus>;
}

/// Dispatches calls to services by name.
#[derive(Default)]
pub struct Router {
    services: BTreeMap<&'static str, Arc<dyn Service>>,
    closing: Vec<&'static str>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .field("closing", &self.closing)
            .finish()
    }
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service, replacing any service with the same name.
    #[must_use]
    pub fn with_service(mut self, service: Arc<dyn Service>) -> Self {
        self.services.insert(service.name(), service);
        self
    }

    /// Ends the connection after answering `method`.
    #[must_use]
    pub fn close_after(mut self, method: &'static str) -> Self {
        self.closing.push(method);
        self
    }

    /// Names of the registered services.
    #[must_use]
    pub fn service_names(&self) -> Vec<String> {
        self.services.keys().map(|name| (*name).to_owned()).collect()
    }

    /// Routes one call.
    pub fn dispatch(
        &self,
        method: &str,
        params: Value,
        items: &mut dyn ItemSink,
    ) -> Result<Value, RpcStatus> {
        let service = methods::service_of(method)
            .and_then(|name| self.services.get(name))
            .ok_or_else(|| RpcStatus::unimplemented(format!("unknown method '{method}'")))?;
        service.call(method, params, items)
    }

    fn closes_after(&self, method: &str) -> bool {
        self.closing.contains(&method)
    }
}

/// Decodes request parameters, treating an absent body as `{}`.
pub fn decode_params<T: DeserializeOwned>(params: Value) -> Result<T, RpcStatus> {
    let body = if params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        params
    };
    serde_json::from_value(body)
        .map_err(|err| RpcStatus::invalid_argument(format!("invalid request: {err}")))
}

/// Encodes a reply body.
pub fn encode_result<T: Serialize>(value: &T) -> Result<Value, RpcStatus> {
    serde_json::to_value(value)
        .map_err(|err| RpcStatus::internal(format!("failed to encode reply: {err}")))
}

/// Typed view of an [`ItemSink`].
pub struct TypedSink<'a, T> {
    items: &'a mut dyn ItemSink,
    _item: PhantomData<fn(T)>,
}

impl<'a, T> TypedSink<'a, T> {
    /// Wraps a raw sink.
    pub fn new(items: &'a mut dyn ItemSink) -> Self {
        Self {
            items,
            _item: PhantomData,
        }
    }
}

impl<T: Serialize> OutputSink<T> for TypedSink<'_, T> {
    fn send(&mut self, item: T) -> Result<(), RpcStatus> {
        let value = encode_result(&item)?;
        self.items.send_item(value)
    }
}

struct FrameSink<'a, W: Write> {
    id: u64,
    writer: &'a mut W,
}

impl<W: Write> ItemSink for FrameSink<'_, W> {
    fn send_item(&mut self, item: Value) -> Result<(), RpcStatus> {
        let frame = Frame::Item { id: self.id, item };
        write_frame(&mut *self.writer, &frame)
            .map_err(|err| RpcStatus::unavailable(format!("caller disconnected: {err}")))
    }
}

/// Serves requests from one connection until the peer disconnects or a
/// closing method is answered.
pub fn serve_connection(stream: ConnectionStream, router: &Router) -> Result<(), RpcError> {
    let mut reader = BufReader::new(stream);
    loop {
        let Some(line) = read_line(&mut reader).map_err(|err| RpcError::from_io("serve", err))?
        else {
            debug!(target: RPC_TARGET, "peer closed connection");
            return Ok(());
        };
        let frame = match serde_json::from_str::<Frame>(&line) {
            Ok(frame) => frame,
            Err(err) => {
                let Some(id) = recover_id(&line) else {
                    return Err(RpcError::decode("serve", &err));
                };
                let reply = Frame::Error {
                    id,
                    status: RpcStatus::invalid_argument(format!("malformed frame: {err}")),
                };
                write_frame(reader.get_mut(), &reply)
                    .map_err(|io_err| RpcError::from_io("serve", io_err))?;
                continue;
            }
        };
        let (id, method, params) = match frame {
            Frame::Request { id, method, params } => (id, method, params),
            other => {
                warn!(target: RPC_TARGET, id = other.id(), "ignoring non-request frame");
                return Err(RpcError::protocol("serve", "expected a request frame"));
            }
        };

        let outcome = {
            let mut sink = FrameSink {
                id,
                writer: reader.get_mut(),
            };
            router.dispatch(&method, params, &mut sink)
        };
        let reply = match outcome {
            Ok(result) => Frame::Response { id, result },
            Err(status) => {
                debug!(target: RPC_TARGET, id, method = %method, %status, "call failed");
                Frame::Error { id, status }
            }
        };
        write_frame(reader.get_mut(), &reply).map_err(|err| RpcError::from_io(&method, err))?;
        if router.closes_after(&method) {
            debug!(target: RPC_TARGET, method = %method, "closing connection after call");
            return Ok(());
        }
    }
}

fn recover_id(line: &str) -> Option<u64> {
    serde_json::from_str::<Value>(line)
        .ok()?
        .get("id")?
        .as_u64()
}

/// Serves every accepted connection with a shared router.
#[derive(Debug, Clone)]
pub struct RouterHandler {
    router: Arc<Router>,
}

impl RouterHandler {
    /// Wraps a router for use with a socket listener.
    #[must_use]
    pub const fn new(router: Arc<Router>) -> Self {
        Self { router }
    }
}

impl ConnectionHandler for RouterHandler {
    fn handle(&self, stream: ConnectionStream) {
        if let Err(error) = serve_connection(stream, &self.router) {
            warn!(target: RPC_TARGET, %error, "connection ended with an error");
        }
    }
}
