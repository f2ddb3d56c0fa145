//! Typed clients for the plugin services.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tm_config::Deadlines;
use tm_plugin_proto::messages::{
    Capabilities, CommandList, CommandOutput, CommandRequest, Empty, GenerateOutput,
    GenerateRequest, HclSchemaList, ParsedBlocksRequest, ParsedBlocksResponse, PluginInfo,
    PostInitRequest, PostInitResponse,
};
use tm_plugin_proto::{RpcConnection, RpcError, methods};

use crate::error::PluginError;

/// Connection to one plugin with typed access to each service.
///
/// Calls are serialised: a second caller waits until the first call,
/// including any stream, has finished.
#[derive(Debug)]
pub struct PluginClient {
    name: String,
    connection: Mutex<RpcConnection>,
    deadlines: Deadlines,
}

impl PluginClient {
    pub(super) fn new(name: &str, connection: RpcConnection, deadlines: Deadlines) -> Self {
        Self {
            name: name.to_owned(),
            connection: Mutex::new(connection),
            deadlines,
        }
    }

    /// Plugin name used in errors.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Plugin` service.
    #[must_use]
    pub const fn plugin(&self) -> PluginInfoClient<'_> {
        PluginInfoClient { client: self }
    }

    /// `Command` service.
    #[must_use]
    pub const fn command(&self) -> CommandClient<'_> {
        CommandClient { client: self }
    }

    /// `HCLSchema` service.
    #[must_use]
    pub const fn hcl_schema(&self) -> HclSchemaClient<'_> {
        HclSchemaClient { client: self }
    }

    /// `Lifecycle` service.
    #[must_use]
    pub const fn lifecycle(&self) -> LifecycleClient<'_> {
        LifecycleClient { client: self }
    }

    /// `Generate` service.
    #[must_use]
    pub const fn generate(&self) -> GenerateClient<'_> {
        GenerateClient { client: self }
    }

    pub(super) fn close(&self) {
        self.lock().close();
    }

    fn lock(&self) -> MutexGuard<'_, RpcConnection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn error(&self, source: RpcError, timeout: Duration) -> PluginError {
        PluginError::from_rpc(&self.name, source, timeout.as_secs())
    }

    fn call<P, R>(&self, method: &str, params: &P) -> Result<R, PluginError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call_within(method, params, self.deadlines.call)
    }

    fn call_within<P, R>(
        &self,
        method: &str,
        params: &P,
        timeout: Duration,
    ) -> Result<R, PluginError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut connection = self.lock();
        let widened = timeout != self.deadlines.call;
        if widened {
            connection
                .set_read_timeout(Some(timeout))
                .map_err(|err| self.error(err, timeout))?;
        }
        let result = connection.call(method, params);
        if widened {
            connection
                .set_read_timeout(Some(self.deadlines.call))
                .map_err(|err| self.error(err, timeout))?;
        }
        result.map_err(|err| self.error(err, timeout))
    }

    fn stream<P, T>(
        &self,
        method: &str,
        params: &P,
        timeout: Duration,
        on_item: &mut dyn FnMut(T) -> Result<(), PluginError>,
    ) -> Result<(), PluginError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut connection = self.lock();
        connection
            .set_read_timeout(Some(timeout))
            .map_err(|err| self.error(err, timeout))?;
        let outcome = drain(
            connection.call_stream::<P, T>(method, params),
            on_item,
        )
        .map_err(|err| match err {
            Drained::Rpc(source) => self.error(source, timeout),
            Drained::Consumer(error) => error,
        });
        connection
            .set_read_timeout(Some(self.deadlines.call))
            .map_err(|err| self.error(err, timeout))?;
        outcome
    }
}

enum Drained {
    Rpc(RpcError),
    Consumer(PluginError),
}

fn drain<I, T>(
    stream: Result<I, RpcError>,
    on_item: &mut dyn FnMut(T) -> Result<(), PluginError>,
) -> Result<(), Drained>
where
    I: Iterator<Item = Result<T, RpcError>>,
{
    for item in stream.map_err(Drained::Rpc)? {
        on_item(item.map_err(Drained::Rpc)?).map_err(Drained::Consumer)?;
    }
    Ok(())
}

/// `Plugin` service client.
#[derive(Debug, Clone, Copy)]
pub struct PluginInfoClient<'a> {
    client: &'a PluginClient,
}

impl PluginInfoClient<'_> {
    /// Static identity of the plugin.
    pub fn get_plugin_info(&self) -> Result<PluginInfo, PluginError> {
        self.client.call(methods::GET_PLUGIN_INFO, &Empty {})
    }

    /// Services the plugin backs.
    pub fn get_capabilities(&self) -> Result<Capabilities, PluginError> {
        self.client.call(methods::GET_CAPABILITIES, &Empty {})
    }

    /// Asks the plugin to stop serving.
    pub fn shutdown(&self) -> Result<(), PluginError> {
        self.client
            .call::<_, Empty>(methods::SHUTDOWN, &Empty {})
            .map(|_| ())
    }
}

/// `Command` service client.
#[derive(Debug, Clone, Copy)]
pub struct CommandClient<'a> {
    client: &'a PluginClient,
}

impl CommandClient<'_> {
    /// Verbs the plugin contributes.
    pub fn get_commands(&self) -> Result<CommandList, PluginError> {
        self.client.call(methods::GET_COMMANDS, &Empty {})
    }

    /// Runs a verb, handing each output event to `on_item` in order.
    pub fn execute_command(
        &self,
        request: &CommandRequest,
        on_item: &mut dyn FnMut(CommandOutput) -> Result<(), PluginError>,
    ) -> Result<(), PluginError> {
        self.client.stream(
            methods::EXECUTE_COMMAND,
            request,
            self.client.deadlines.call,
            on_item,
        )
    }
}

/// `HCLSchema` service client.
#[derive(Debug, Clone, Copy)]
pub struct HclSchemaClient<'a> {
    client: &'a PluginClient,
}

impl HclSchemaClient<'_> {
    /// Block shapes the plugin handles.
    pub fn get_hcl_schema(&self) -> Result<HclSchemaList, PluginError> {
        self.client.call(methods::GET_HCL_SCHEMA, &Empty {})
    }

    /// Sends parsed blocks for processing.
    pub fn process_parsed_blocks(
        &self,
        request: &ParsedBlocksRequest,
    ) -> Result<ParsedBlocksResponse, PluginError> {
        self.client.call(methods::PROCESS_PARSED_BLOCKS, request)
    }
}

/// `Lifecycle` service client.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleClient<'a> {
    client: &'a PluginClient,
}

impl LifecycleClient<'_> {
    /// Runs the post-init hook within the post-init deadline.
    pub fn post_init(&self, request: &PostInitRequest) -> Result<PostInitResponse, PluginError> {
        self.client
            .call_within(methods::POST_INIT, request, self.client.deadlines.post_init)
    }
}

/// `Generate` service client.
#[derive(Debug, Clone, Copy)]
pub struct GenerateClient<'a> {
    client: &'a PluginClient,
}

impl GenerateClient<'_> {
    /// Runs generation within the generate deadline, handing each output
    /// event to `on_item` in order.
    pub fn generate(
        &self,
        request: &GenerateRequest,
        on_item: &mut dyn FnMut(GenerateOutput) -> Result<(), PluginError>,
    ) -> Result<(), PluginError> {
        self.client.stream(
            methods::GENERATE,
            request,
            self.client.deadlines.generate,
            on_item,
        )
    }
}
