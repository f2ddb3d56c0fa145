//! Router services wrapping plugin service implementations.

use std::sync::Arc;

use serde_json::Value;
use tm_plugin_proto::handshake::PLUGIN_BUNDLE;
use tm_plugin_proto::messages::{Capabilities, Dispense, Empty};
use tm_plugin_proto::rpc::{ItemSink, Service, TypedSink, decode_params, encode_result};
use tm_plugin_proto::service::{
    CommandService, GenerateService, HclSchemaService, LifecycleService, PluginService,
};
use tm_plugin_proto::{RpcStatus, methods};

fn unknown(method: &str) -> RpcStatus {
    RpcStatus::unimplemented(format!("unknown method '{method}'"))
}

pub(super) struct PluginAdapter {
    info: Option<Arc<dyn PluginService>>,
    capabilities: Capabilities,
    services: Vec<String>,
}

impl PluginAdapter {
    pub(super) fn new(
        info: Option<Arc<dyn PluginService>>,
        capabilities: Capabilities,
        services: Vec<String>,
    ) -> Self {
        Self {
            info,
            capabilities,
            services,
        }
    }
}

impl Service for PluginAdapter {
    fn name(&self) -> &'static str {
        methods::PLUGIN_SERVICE
    }

    fn call(
        &self,
        method: &str,
        params: Value,
        _items: &mut dyn ItemSink,
    ) -> Result<Value, RpcStatus> {
        match method {
            methods::DISPENSE => {
                let request: Dispense = decode_params(params)?;
                if request.name != PLUGIN_BUNDLE {
                    return Err(RpcStatus::not_found(format!(
                        "unknown plugin bundle '{}'",
                        request.name
                    )));
                }
                encode_result(&Dispense {
                    name: PLUGIN_BUNDLE.to_owned(),
                    services: self.services.clone(),
                })
            }
            methods::GET_PLUGIN_INFO => match &self.info {
                Some(info) => encode_result(&info.get_plugin_info()?),
                None => Err(RpcStatus::unimplemented("plugin info is not implemented")),
            },
            methods::GET_CAPABILITIES => encode_result(&self.capabilities),
            methods::SHUTDOWN => {
                if let Some(info) = &self.info {
                    info.shutdown()?;
                }
                encode_result(&Empty {})
            }
            other => Err(unknown(other)),
        }
    }
}

pub(super) struct CommandAdapter(Arc<dyn CommandService>);

impl CommandAdapter {
    pub(super) fn new(service: Arc<dyn CommandService>) -> Self {
        Self(service)
    }
}

impl Service for CommandAdapter {
    fn name(&self) -> &'static str {
        methods::COMMAND_SERVICE
    }

    fn call(
        &self,
        method: &str,
        params: Value,
        items: &mut dyn ItemSink,
    ) -> Result<Value, RpcStatus> {
        match method {
            methods::GET_COMMANDS => encode_result(&self.0.get_commands()?),
            methods::EXECUTE_COMMAND => {
                let request = decode_params(params)?;
                self.0.execute_command(request, &mut TypedSink::new(items))?;
                encode_result(&Empty {})
            }
            other => Err(unknown(other)),
        }
    }
}

pub(super) struct HclSchemaAdapter(Arc<dyn HclSchemaService>);

impl HclSchemaAdapter {
    pub(super) fn new(service: Arc<dyn HclSchemaService>) -> Self {
        Self(service)
    }
}

impl Service for HclSchemaAdapter {
    fn name(&self) -> &'static str {
        methods::HCL_SCHEMA_SERVICE
    }

    fn call(
        &self,
        method: &str,
        params: Value,
        _items: &mut dyn ItemSink,
    ) -> Result<Value, RpcStatus> {
        match method {
            methods::GET_HCL_SCHEMA => encode_result(&self.0.get_hcl_schema()?),
            methods::PROCESS_PARSED_BLOCKS => {
                let request = decode_params(params)?;
                encode_result(&self.0.process_parsed_blocks(request)?)
            }
            other => Err(unknown(other)),
        }
    }
}

pub(super) struct LifecycleAdapter(Arc<dyn LifecycleService>);

impl LifecycleAdapter {
    pub(super) fn new(service: Arc<dyn LifecycleService>) -> Self {
        Self(service)
    }
}

impl Service for LifecycleAdapter {
    fn name(&self) -> &'static str {
        methods::LIFECYCLE_SERVICE
    }

    fn call(
        &self,
        method: &str,
        params: Value,
        _items: &mut dyn ItemSink,
    ) -> Result<Value, RpcStatus> {
        match method {
            methods::POST_INIT => {
                let request = decode_params(params)?;
                encode_result(&self.0.post_init(request)?)
            }
            other => Err(unknown(other)),
        }
    }
}

pub(super) struct GenerateAdapter(Arc<dyn GenerateService>);

impl GenerateAdapter {
    pub(super) fn new(service: Arc<dyn GenerateService>) -> Self {
        Self(service)
    }
}

impl Service for GenerateAdapter {
    fn name(&self) -> &'static str {
        methods::GENERATE_SERVICE
    }

    fn call(
        &self,
        method: &str,
        params: Value,
        items: &mut dyn ItemSink,
    ) -> Result<Value, RpcStatus> {
        match method {
            methods::GENERATE => {
                let request = decode_params(params)?;
                self.0.generate(request, &mut TypedSink::new(items))?;
                encode_result(&Empty {})
            }
            other => Err(unknown(other)),
        }
    }
}
