//! Reference plugin that backs every plugin service.
//!
//! The echo plugin answers each call with something predictable so the host
//! side can be exercised end to end: its command writes a greeting, its
//! block processor returns the request it received, and its hooks touch the
//! project through the host service. [`server`] builds the plugin server
//! from a [`Selection`] so tests can launch a plugin that backs only some
//! services.

use std::sync::Arc;

use strum::EnumString;
use tm_plugin_proto::messages::{
    AttributeValue, BlockKind, CommandList, CommandOutput, CommandRequest, CommandSpec,
    ConfigPatch, Diagnostic, FileWrite, GenerateOutput, GenerateRequest, HclAttributeSchema,
    HclBlockSchema, HclSchemaList, ParsedBlocksRequest, ParsedBlocksResponse, PluginInfo,
    PostInitRequest, PostInitResponse, StackMetadata, StackUpdate,
};
use tm_plugin_proto::service::{
    CommandService, GenerateService, HclSchemaService, LifecycleService, OutputSink,
    PluginService,
};
use tm_plugin_proto::RpcStatus;
use tm_plugins::{HostServiceClient, PluginServer};
use tracing::{debug, info};

/// Environment variable selecting the services to register.
pub const SERVICES_ENV: &str = "TM_ECHO_SERVICES";

/// Block type the plugin declares.
pub const BLOCK_TYPE: &str = "pluginblock";

/// File the post-init hook writes under the project root.
pub const POST_INIT_MARKER: &str = ".echo-post-init";

/// File the generate override writes.
pub const GENERATED_FILE: &str = "generated.txt";

const ECHO_TARGET: &str = "tm_plugin_echo";

/// An optional service the echo plugin can register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EchoService {
    /// `Command`.
    Command,
    /// `HCLSchema`.
    #[strum(serialize = "hcl_schema", serialize = "hclschema")]
    HclSchema,
    /// `Lifecycle`.
    Lifecycle,
    /// `Generate`.
    Generate,
}

/// Services to register. `Plugin` is always served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection(Vec<EchoService>);

impl Default for Selection {
    fn default() -> Self {
        Self(vec![
            EchoService::Command,
            EchoService::HclSchema,
            EchoService::Lifecycle,
            EchoService::Generate,
        ])
    }
}

impl Selection {
    /// Parses a comma-separated list; `None` or a blank value selects all.
    ///
    /// # Errors
    ///
    /// Fails on an unknown service name.
    ///
    /// # Example
    ///
    /// ```
    /// use tm_plugin_echo::{EchoService, Selection};
    ///
    /// let only = Selection::parse(Some("HCLSchema")).expect("known service");
    /// assert!(only.contains(EchoService::HclSchema));
    /// assert!(!only.contains(EchoService::Command));
    /// ```
    pub fn parse(value: Option<&str>) -> Result<Self, strum::ParseError> {
        let Some(list) = value.map(str::trim).filter(|list| !list.is_empty()) else {
            return Ok(Self::default());
        };
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Whether `service` is selected.
    #[must_use]
    pub fn contains(&self, service: EchoService) -> bool {
        self.0.contains(&service)
    }
}

/// Builds the plugin server for `selection`.
#[must_use]
pub fn server(selection: &Selection) -> PluginServer {
    let echo = Arc::new(Echo);
    let mut builder = PluginServer::builder().plugin(Arc::clone(&echo) as Arc<dyn PluginService>);
    if selection.contains(EchoService::Command) {
        builder = builder.command(Arc::clone(&echo) as Arc<dyn CommandService>);
    }
    if selection.contains(EchoService::HclSchema) {
        builder = builder.hcl_schema(Arc::clone(&echo) as Arc<dyn HclSchemaService>);
    }
    if selection.contains(EchoService::Lifecycle) {
        builder = builder.lifecycle(Arc::clone(&echo) as Arc<dyn LifecycleService>);
    }
    if selection.contains(EchoService::Generate) {
        builder = builder.generate(echo as Arc<dyn GenerateService>);
    }
    builder.build()
}

/// The echo plugin's service implementations.
#[derive(Debug, Default, Clone, Copy)]
pub struct Echo;

impl PluginService for Echo {
    fn get_plugin_info(&self) -> Result<PluginInfo, RpcStatus> {
        Ok(PluginInfo {
            name: "echo".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            product_name: "terramate".to_owned(),
            description: "Echoes every plugin call back to the host".to_owned(),
            compatible_with: String::new(),
        })
    }

    fn shutdown(&self) -> Result<(), RpcStatus> {
        debug!(target: ECHO_TARGET, "shutdown requested");
        Ok(())
    }
}

impl CommandService for Echo {
    fn get_commands(&self) -> Result<CommandList, RpcStatus> {
        Ok(CommandList {
            commands: vec![
                CommandSpec {
                    name: "hello".to_owned(),
                    help: "Prints a greeting".to_owned(),
                },
                CommandSpec {
                    name: "fail".to_owned(),
                    help: "Exits with status 2".to_owned(),
                },
            ],
        })
    }

    fn execute_command(
        &self,
        request: CommandRequest,
        output: &mut dyn OutputSink<CommandOutput>,
    ) -> Result<(), RpcStatus> {
        match request.command.as_str() {
            "hello" => {
                output.send(CommandOutput::Stdout(b"hello\n".to_vec()))?;
                output.send(CommandOutput::ExitCode(0))
            }
            "fail" => {
                output.send(CommandOutput::Stderr(b"echo: failing on request\n".to_vec()))?;
                output.send(CommandOutput::ExitCode(2))
            }
            other => Err(RpcStatus::invalid_argument(format!(
                "unknown command '{other}'"
            ))),
        }
    }
}

impl HclSchemaService for Echo {
    fn get_hcl_schema(&self) -> Result<HclSchemaList, RpcStatus> {
        Ok(HclSchemaList {
            schemas: vec![HclBlockSchema {
                name: BLOCK_TYPE.to_owned(),
                kind: BlockKind::MergedLabels,
                label_count: 1,
                attributes: vec![HclAttributeSchema {
                    name: "value".to_owned(),
                    type_name: "string".to_owned(),
                    required: true,
                }],
            }],
        })
    }

    fn process_parsed_blocks(
        &self,
        request: ParsedBlocksRequest,
    ) -> Result<ParsedBlocksResponse, RpcStatus> {
        let plugin_data = serde_json::to_vec(&request)
            .map_err(|err| RpcStatus::internal(format!("encoding blocks: {err}")))?;
        let mut diagnostics = vec![Diagnostic::warning(format!(
            "echo received {} '{}' block(s)",
            request.blocks.len(),
            request.block_type
        ))];
        for block in &request.blocks {
            if block.attributes.contains_key("fail") {
                diagnostics.push(
                    Diagnostic::error("echo was asked to fail")
                        .with_detail(format!("{} {:?}", block.file_path, block.labels)),
                );
            }
            if let Some(AttributeValue::String(value)) = block.attributes.get("value") {
                debug!(target: ECHO_TARGET, value = value.as_str(), "received block value");
            }
        }
        Ok(ParsedBlocksResponse {
            diagnostics,
            plugin_data,
        })
    }
}

impl LifecycleService for Echo {
    fn post_init(&self, request: PostInitRequest) -> Result<PostInitResponse, RpcStatus> {
        let host = HostServiceClient::from_env()
            .map_err(|err| RpcStatus::unavailable(err.to_string()))?;
        if let Some(mut client) = host {
            client
                .write_file(POST_INIT_MARKER, b"post-init\n".to_vec(), 0)
                .map_err(|err| RpcStatus::internal(err.to_string()))?;
            client
                .set_stack_metadata(
                    "/",
                    StackMetadata {
                        tags: vec!["echo".to_owned()],
                        ..StackMetadata::default()
                    },
                    true,
                )
                .map_err(|err| RpcStatus::internal(err.to_string()))?;
            info!(target: ECHO_TARGET, "post-init marker written");
        }
        let plugin_data = serde_json::to_vec(&serde_json::json!({
            "block_type": "echo",
            "root_dir": request.root_dir,
        }))
        .map_err(|err| RpcStatus::internal(format!("encoding patch: {err}")))?;
        Ok(PostInitResponse {
            diagnostics: Vec::new(),
            stack_updates: vec![StackUpdate {
                path: "/".to_owned(),
                metadata: Some(StackMetadata {
                    description: "touched by echo".to_owned(),
                    ..StackMetadata::default()
                }),
                merge: true,
            }],
            config_patches: vec![ConfigPatch {
                path: "/".to_owned(),
                plugin_data,
            }],
        })
    }
}

impl GenerateService for Echo {
    fn generate(
        &self,
        request: GenerateRequest,
        output: &mut dyn OutputSink<GenerateOutput>,
    ) -> Result<(), RpcStatus> {
        debug!(target: ECHO_TARGET, root = request.root_dir.as_str(), "generating");
        output.send(GenerateOutput::FileWrite(FileWrite {
            path: GENERATED_FILE.to_owned(),
            content: b"generated by echo\n".to_vec(),
            mode: 0,
        }))?;
        output.send(GenerateOutput::Stdout(b"generated\n".to_vec()))?;
        output.send(GenerateOutput::ExitCode(0))
    }
}

#[cfg(test)]
mod tests;
