//! Plugin-side access to the host service.

use std::env;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tm_plugin_proto::handshake::HOST_ADDR_ENV;
use tm_plugin_proto::messages::{
    ConfigTreeNode, DirEntry, Empty, PathRequest, ReadFileRequest, ReadFileResponse,
    RootDirResponse, SetStackRequest, StackMetadata, WalkDirRequest, WriteFileRequest,
};
use tm_plugin_proto::{RpcConnection, RpcError, SocketEndpoint, methods};

use crate::error::PluginError;

const HOST_NAME: &str = "host";

/// Connection from a plugin back to its host.
///
/// # Example
///
/// ```rust,no_run
/// use tm_plugins::HostServiceClient;
///
/// # fn main() -> Result<(), tm_plugins::PluginError> {
/// if let Some(mut host) = HostServiceClient::from_env()? {
///     let _root = host.get_root_dir()?;
///     host.write_file(".marker", b"seen".to_vec(), 0)?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HostServiceClient {
    connection: RpcConnection,
}

impl HostServiceClient {
    /// Connects to the host named by the host-address variable.
    ///
    /// Returns `Ok(None)` when the variable is unset, which is the case
    /// when the host runs no host service for this call.
    pub fn from_env() -> Result<Option<Self>, PluginError> {
        let Ok(value) = env::var(HOST_ADDR_ENV) else {
            return Ok(None);
        };
        let endpoint: SocketEndpoint =
            value.parse().map_err(|err: tm_plugin_proto::SocketParseError| {
                PluginError::HostAddress {
                    value: value.clone(),
                    message: err.to_string(),
                }
            })?;
        Self::connect(&endpoint).map(Some)
    }

    /// Connects to `endpoint`.
    pub fn connect(endpoint: &SocketEndpoint) -> Result<Self, PluginError> {
        let connection = RpcConnection::connect(endpoint).map_err(host_error("connect"))?;
        Ok(Self { connection })
    }

    /// Project root directory, empty when unknown.
    pub fn get_root_dir(&mut self) -> Result<String, PluginError> {
        let reply: RootDirResponse = self.call(methods::GET_ROOT_DIR, &Empty {})?;
        Ok(reply.root_dir)
    }

    /// User terramate directory, empty when unknown.
    pub fn get_user_dir(&mut self) -> Result<String, PluginError> {
        let reply: RootDirResponse = self.call(methods::GET_USER_DIR, &Empty {})?;
        Ok(reply.root_dir)
    }

    /// Reads a file under the project root.
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>, PluginError> {
        let reply: ReadFileResponse = self.call(
            methods::READ_FILE,
            &ReadFileRequest {
                path: path.to_owned(),
            },
        )?;
        Ok(reply.content)
    }

    /// Writes a file under the project root; `mode` zero means `0o644`.
    pub fn write_file(
        &mut self,
        path: &str,
        content: Vec<u8>,
        mode: u32,
    ) -> Result<(), PluginError> {
        let _: Empty = self.call(
            methods::WRITE_FILE,
            &WriteFileRequest {
                path: path.to_owned(),
                content,
                mode,
            },
        )?;
        Ok(())
    }

    /// Streams the entries below `root` whose base name matches `pattern`.
    pub fn walk_dir(
        &mut self,
        root: &str,
        pattern: &str,
    ) -> Result<impl Iterator<Item = Result<DirEntry, PluginError>> + '_, PluginError> {
        let stream = self
            .connection
            .call_stream::<_, DirEntry>(
                methods::WALK_DIR,
                &WalkDirRequest {
                    root: root.to_owned(),
                    pattern: pattern.to_owned(),
                },
            )
            .map_err(host_error(methods::WALK_DIR))?;
        Ok(stream.map(|item| item.map_err(host_error(methods::WALK_DIR))))
    }

    /// Describes the configuration node at `path`.
    pub fn get_config_tree(&mut self, path: &str) -> Result<ConfigTreeNode, PluginError> {
        self.call(methods::GET_CONFIG_TREE, &path_request(path))
    }

    /// Reads stack metadata.
    pub fn get_stack_metadata(&mut self, path: &str) -> Result<StackMetadata, PluginError> {
        self.call(methods::GET_STACK_METADATA, &path_request(path))
    }

    /// Updates stack metadata.
    pub fn set_stack_metadata(
        &mut self,
        path: &str,
        metadata: StackMetadata,
        merge: bool,
    ) -> Result<(), PluginError> {
        let _: Empty = self.call(
            methods::SET_STACK_METADATA,
            &SetStackRequest {
                path: path.to_owned(),
                metadata: Some(metadata),
                merge,
            },
        )?;
        Ok(())
    }

    fn call<P: Serialize, R: DeserializeOwned>(
        &mut self,
        method: &str,
        params: &P,
    ) -> Result<R, PluginError> {
        self.connection
            .call(method, params)
            .map_err(host_error(method))
    }
}

fn path_request(path: &str) -> PathRequest {
    PathRequest {
        path: path.to_owned(),
    }
}

fn host_error(method: &str) -> impl Fn(RpcError) -> PluginError + '_ {
    move |error| match error {
        RpcError::Status(status) => PluginError::HostRejected {
            method: method.to_owned(),
            source: status,
        },
        other => PluginError::Rpc {
            name: HOST_NAME.to_owned(),
            source: other,
        },
    }
}
