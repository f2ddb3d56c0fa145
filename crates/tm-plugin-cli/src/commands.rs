//! Plugin operations behind each subcommand.

use std::collections::BTreeMap;
use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use serde_json::json;
use tm_config::{Config, Deadlines};
use tm_hcl::{Parser, ParserOptions};
use tm_plugin_proto::messages::{CommandRequest, GenerateRequest, HclBlockSchema};
use tm_plugin_proto::service::HostApi;
use tm_plugins::flows::{
    GenerateSink, HostContext, execute_command, run_generate_override, run_post_init,
};
use tm_plugins::schema::{ProcessDispatcher, SchemaDispatcher, hcl_options_from_schema};
use tm_plugins::{HostClient, HostServer, HostService, InstalledPlugin, discover_enabled};
use tm_project::ProjectRoot;
use tracing::{debug, info, warn};

use crate::cli::{Cli, CliCommand, ExecArgs};
use crate::exit_code;

const COMMANDS_TARGET: &str = "tm_plugin_cli::commands";

pub(crate) fn execute<W: Write, E: Write>(
    cli: Cli,
    stdout: &mut W,
    stderr: &mut E,
) -> anyhow::Result<ExitCode> {
    let config = cli.config;
    match cli.command {
        CliCommand::List => list(&config, stdout),
        CliCommand::Info { plugin } => info(&config, &plugin, stdout),
        CliCommand::Exec(args) => exec(&config, args, stdout, stderr),
        CliCommand::Generate { root, working_dir } => {
            generate(&config, &root, working_dir.as_deref(), stdout, stderr)
        }
        CliCommand::PostInit { root } => post_init(&config, &root, stdout, stderr),
        CliCommand::Parse { root, file } => parse(&config, &root, &file, stdout),
    }
}

fn list<W: Write>(config: &Config, stdout: &mut W) -> anyhow::Result<ExitCode> {
    for plugin in discover_enabled(config)? {
        writeln!(
            stdout,
            "{}\t{}\t{}",
            plugin.manifest.name,
            plugin.manifest.version,
            plugin.binary_path.display()
        )?;
    }
    Ok(ExitCode::SUCCESS)
}

fn find_plugin(config: &Config, name: &str) -> anyhow::Result<InstalledPlugin> {
    discover_enabled(config)?
        .into_iter()
        .find(|plugin| plugin.name() == name)
        .ok_or_else(|| anyhow!("plugin '{name}' is not installed"))
}

fn info<W: Write>(config: &Config, name: &str, stdout: &mut W) -> anyhow::Result<ExitCode> {
    let plugin = find_plugin(config, name)?;
    let mut client = HostClient::start_plugin(&plugin, &BTreeMap::new(), config.deadlines())?;
    let services = client.client();
    let info = services.plugin().get_plugin_info()?;
    let capabilities = services.plugin().get_capabilities()?;
    let commands = if capabilities.has_commands {
        services.command().get_commands()?.commands
    } else {
        Vec::new()
    };
    let schemas = if capabilities.has_hcl_schema {
        services.hcl_schema().get_hcl_schema()?.schemas
    } else {
        Vec::new()
    };
    client.kill();

    let report = json!({
        "info": info,
        "capabilities": capabilities,
        "commands": commands,
        "schemas": schemas,
    });
    serde_json::to_writer_pretty(&mut *stdout, &report)?;
    writeln!(stdout)?;
    Ok(ExitCode::SUCCESS)
}

/// A loaded project served to plugins over the host service.
struct ProjectHost {
    root_dir: PathBuf,
    service: Arc<HostService>,
    server: HostServer,
}

impl ProjectHost {
    fn start(config: &Config, root: &Path) -> anyhow::Result<Self> {
        let root_dir = root
            .canonicalize()
            .with_context(|| format!("project root '{}'", root.display()))?;
        let project = ProjectRoot::load(&root_dir)
            .with_context(|| format!("loading project at '{}'", root_dir.display()))?;
        let service = Arc::new(HostService::for_project(project, Some(config.user_dir())));
        let server = HostServer::start(Arc::clone(&service) as Arc<dyn HostApi>)?;
        info!(
            target: COMMANDS_TARGET,
            root = %root_dir.display(),
            endpoint = %server.endpoint(),
            "host service listening"
        );
        Ok(Self {
            root_dir,
            service,
            server,
        })
    }

    fn context(&self) -> HostContext<'_> {
        HostContext::new(&self.service, Some(&self.server))
    }
}

/// Forwards plugin output to the CLI's own streams.
struct StreamSink<'a, W, E> {
    stdout: &'a mut W,
    stderr: &'a mut E,
}

impl<W: Write, E: Write> GenerateSink for StreamSink<'_, W, E> {
    fn stdout(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.stdout.write_all(chunk)?;
        self.stdout.flush()
    }

    fn stderr(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.stderr.write_all(chunk)
    }

    fn file_written(&mut self, path: &Path) {
        info!(target: COMMANDS_TARGET, path = %path.display(), "plugin wrote file");
    }
}

fn current_dir() -> anyhow::Result<String> {
    Ok(env::current_dir()
        .context("reading the working directory")?
        .display()
        .to_string())
}

fn exec<W: Write, E: Write>(
    config: &Config,
    args: ExecArgs,
    stdout: &mut W,
    stderr: &mut E,
) -> anyhow::Result<ExitCode> {
    let plugin = find_plugin(config, &args.plugin)?;
    let host = args
        .root
        .as_deref()
        .map(|root| ProjectHost::start(config, root))
        .transpose()?;
    let env = host
        .as_ref()
        .map(|host| host.context().plugin_env())
        .unwrap_or_default();
    let request = CommandRequest {
        command: args.command,
        args: args.args.into_iter().collect(),
        flags: args.flags.into_iter().collect(),
        working_dir: current_dir()?,
        root_dir: host
            .as_ref()
            .map(|host| host.root_dir.display().to_string())
            .unwrap_or_default(),
    };
    let mut client = HostClient::start_plugin(&plugin, &env, config.deadlines())?;
    let outcome = execute_command(&client, &request, &mut StreamSink { stdout, stderr });
    client.kill();
    Ok(exit_code(outcome?))
}

fn generate<W: Write, E: Write>(
    config: &Config,
    root: &Path,
    working_dir: Option<&Path>,
    stdout: &mut W,
    stderr: &mut E,
) -> anyhow::Result<ExitCode> {
    let plugins = discover_enabled(config)?;
    let host = ProjectHost::start(config, root)?;
    let request = GenerateRequest {
        root_dir: host.root_dir.display().to_string(),
        working_dir: working_dir
            .unwrap_or(&host.root_dir)
            .display()
            .to_string(),
    };
    let outcome = run_generate_override(
        &plugins,
        &host.context(),
        &request,
        config.deadlines(),
        &mut StreamSink {
            stdout: &mut *stdout,
            stderr: &mut *stderr,
        },
    )?;
    match outcome {
        Some(code) => Ok(exit_code(code)),
        None => {
            writeln!(stderr, "no installed plugin overrides generate")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn post_init<W: Write, E: Write>(
    config: &Config,
    root: &Path,
    stdout: &mut W,
    stderr: &mut E,
) -> anyhow::Result<ExitCode> {
    let plugins = discover_enabled(config)?;
    let host = ProjectHost::start(config, root)?;
    let report = run_post_init(&plugins, &host.context(), config.deadlines());
    for name in &report.ran {
        writeln!(stdout, "ran\t{name}")?;
    }
    for name in &report.skipped {
        writeln!(stdout, "skipped\t{name}")?;
    }
    for error in &report.errors {
        writeln!(stderr, "error: {error}")?;
    }
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Block shapes a plugin declares; empty when it has no schema service.
fn plugin_schemas(
    plugin: &InstalledPlugin,
    env: &BTreeMap<String, String>,
    deadlines: Deadlines,
) -> anyhow::Result<Vec<HclBlockSchema>> {
    let mut client = HostClient::start_plugin(plugin, env, deadlines)?;
    let capabilities = client.client().plugin().get_capabilities()?;
    let schemas = if capabilities.has_hcl_schema {
        client.client().hcl_schema().get_hcl_schema()?.schemas
    } else {
        Vec::new()
    };
    client.kill();
    Ok(schemas)
}

fn parse<W: Write>(
    config: &Config,
    root: &Path,
    file: &Path,
    stdout: &mut W,
) -> anyhow::Result<ExitCode> {
    let plugins = discover_enabled(config)?;
    let host = ProjectHost::start(config, root)?;
    let env = host.context().plugin_env();
    let dispatcher: Arc<dyn SchemaDispatcher> =
        Arc::new(ProcessDispatcher::new(env.clone(), config.deadlines()));

    let mut options = ParserOptions::new();
    for plugin in &plugins {
        let schemas = match plugin_schemas(plugin, &env, config.deadlines()) {
            Ok(schemas) => schemas,
            Err(error) => {
                warn!(
                    target: COMMANDS_TARGET,
                    plugin = plugin.name(),
                    error = %format!("{error:#}"),
                    "skipping plugin whose block schemas are unavailable"
                );
                continue;
            }
        };
        if schemas.is_empty() {
            debug!(target: COMMANDS_TARGET, plugin = plugin.name(), "plugin declares no blocks");
            continue;
        }
        options.extend(hcl_options_from_schema(
            plugin.name(),
            &plugin.binary_path,
            &schemas,
            &dispatcher,
        ));
    }

    let path = host.root_dir.join(file);
    let parsed = Parser::new(options)
        .parse_files(&[path.clone()])
        .with_context(|| format!("parsing '{}'", path.display()))?;
    if let Some(external) = &parsed.external {
        for plugin in external.plugins() {
            for block_type in external.block_types(plugin) {
                let count = external.get(plugin, block_type).map_or(0, <[Vec<u8>]>::len);
                writeln!(stdout, "{plugin}\t{block_type}\t{count}")?;
            }
        }
    }
    writeln!(stdout, "unhandled\t{}", parsed.unhandled.len())?;
    Ok(ExitCode::SUCCESS)
}
