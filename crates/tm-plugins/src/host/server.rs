//! Socket server exposing a [`HostApi`] to plugins.

use std::sync::Arc;

use serde_json::Value;
use tm_plugin_proto::handshake::HOST_ADDR_ENV;
use tm_plugin_proto::messages::{
    Empty, PathRequest, RootDirResponse, SetStackRequest, WalkDirRequest,
};
use tm_plugin_proto::rpc::{
    ItemSink, Router, RouterHandler, Service, TypedSink, decode_params, encode_result,
};
use tm_plugin_proto::service::HostApi;
use tm_plugin_proto::transport::{ListenerHandle, SocketListener};
use tm_plugin_proto::{RpcStatus, SocketEndpoint, methods};
use tracing::{debug, info, warn};

use super::HOST_TARGET;
use crate::error::PluginError;

struct HostAdapter(Arc<dyn HostApi>);

impl Service for HostAdapter {
    fn name(&self) -> &'static str {
        methods::HOST_SERVICE
    }

    fn call(
        &self,
        method: &str,
        params: Value,
        items: &mut dyn ItemSink,
    ) -> Result<Value, RpcStatus> {
        debug!(target: HOST_TARGET, method, "host call");
        let host = self.0.as_ref();
        match method {
            methods::GET_ROOT_DIR => encode_result(&RootDirResponse {
                root_dir: host.get_root_dir()?,
            }),
            methods::GET_USER_DIR => encode_result(&RootDirResponse {
                root_dir: host.get_user_dir()?,
            }),
            methods::READ_FILE => encode_result(&host.read_file(decode_params(params)?)?),
            methods::WRITE_FILE => {
                host.write_file(decode_params(params)?)?;
                encode_result(&Empty {})
            }
            methods::WALK_DIR => {
                let request: WalkDirRequest = decode_params(params)?;
                host.walk_dir(request, &mut TypedSink::new(items))?;
                encode_result(&Empty {})
            }
            methods::GET_CONFIG_TREE => {
                let request: PathRequest = decode_params(params)?;
                encode_result(&host.get_config_tree(&request.path)?)
            }
            methods::GET_STACK_METADATA => {
                let request: PathRequest = decode_params(params)?;
                encode_result(&host.get_stack_metadata(&request.path)?)
            }
            methods::SET_STACK_METADATA => {
                let request: SetStackRequest = decode_params(params)?;
                host.set_stack_metadata(request)?;
                encode_result(&Empty {})
            }
            other => Err(RpcStatus::unimplemented(format!("unknown method '{other}'"))),
        }
    }
}

/// A running host service listener.
///
/// Each plugin connection is served on its own thread. The listener stops
/// on [`HostServer::shutdown`] or drop.
#[derive(Debug)]
pub struct HostServer {
    endpoint: SocketEndpoint,
    handle: Option<ListenerHandle>,
}

impl HostServer {
    /// Serves `host` on a loopback TCP port chosen by the OS.
    pub fn start(host: Arc<dyn HostApi>) -> Result<Self, PluginError> {
        Self::start_on(host, &SocketEndpoint::loopback())
    }

    /// Serves `host` on `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::HostListener`] when the endpoint cannot be
    /// bound.
    pub fn start_on(
        host: Arc<dyn HostApi>,
        endpoint: &SocketEndpoint,
    ) -> Result<Self, PluginError> {
        let listener_error = |source| PluginError::HostListener {
            source: Arc::new(source),
        };
        let listener = SocketListener::bind(endpoint).map_err(listener_error)?;
        let router = Router::new().with_service(Arc::new(HostAdapter(host)));
        let handle = listener
            .start(Arc::new(RouterHandler::new(Arc::new(router))))
            .map_err(listener_error)?;
        let bound = handle.endpoint().clone();
        info!(target: HOST_TARGET, endpoint = %bound, "host service listening");
        Ok(Self {
            endpoint: bound,
            handle: Some(handle),
        })
    }

    /// Endpoint plugins should dial.
    #[must_use]
    pub const fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Environment entry that tells a plugin where the host service is.
    #[must_use]
    pub fn env_pair(&self) -> (String, String) {
        (HOST_ADDR_ENV.to_owned(), self.endpoint.to_string())
    }

    /// Stops accepting connections and waits for the accept loop.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        handle.shutdown();
        if let Err(error) = handle.join() {
            warn!(target: HOST_TARGET, %error, "host service listener failed");
        }
        debug!(target: HOST_TARGET, endpoint = %self.endpoint, "host service stopped");
    }
}

impl Drop for HostServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
