//! Plugin-side adapter: serves registered services to the host.
//!
//! A plugin binary registers whichever of the five services it implements
//! and calls [`PluginServer::serve`]. Capabilities are derived from the
//! registrations, so a plugin cannot advertise a service it does not back.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tm_plugin_proto::messages::PluginInfo;
//! use tm_plugin_proto::service::PluginService;
//! use tm_plugin_proto::RpcStatus;
//! use tm_plugins::PluginServer;
//!
//! struct Info;
//!
//! impl PluginService for Info {
//!     fn get_plugin_info(&self) -> Result<PluginInfo, RpcStatus> {
//!         Ok(PluginInfo { name: "demo".to_owned(), ..PluginInfo::default() })
//!     }
//! }
//!
//! # fn main() -> Result<(), tm_plugins::ServeError> {
//! PluginServer::builder().plugin(Arc::new(Info)).build().serve()
//! # }
//! ```

mod adapters;

use std::io::{self, Write};
use std::sync::Arc;

use thiserror::Error;
use tm_plugin_proto::handshake::{HANDSHAKE, HandshakeLine, is_plugin_env};
use tm_plugin_proto::messages::Capabilities;
use tm_plugin_proto::rpc::{Router, serve_connection};
use tm_plugin_proto::service::{
    CommandService, GenerateService, HclSchemaService, LifecycleService, PluginService,
};
use tm_plugin_proto::transport::{ListenerError, SocketListener};
use tm_plugin_proto::{RpcError, SocketEndpoint, methods};
use tracing::info;

use self::adapters::{
    CommandAdapter, GenerateAdapter, HclSchemaAdapter, LifecycleAdapter, PluginAdapter,
};

const SERVER_TARGET: &str = "tm_plugins::server";

/// Errors raised while serving the host.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The process was not launched by a plugin host.
    #[error("this binary is a terramate plugin and must be launched by terramate")]
    NotPlugin,

    /// The plugin socket could not be bound.
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// The handshake could not be written or the host never connected.
    #[error("plugin I/O failed: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The host connection broke the protocol.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl From<io::Error> for ServeError {
    fn from(source: io::Error) -> Self {
        Self::Io {
            source: Arc::new(source),
        }
    }
}

/// Registrations collected before building a [`PluginServer`].
#[derive(Default, Clone)]
pub struct PluginServerBuilder {
    plugin: Option<Arc<dyn PluginService>>,
    command: Option<Arc<dyn CommandService>>,
    hcl_schema: Option<Arc<dyn HclSchemaService>>,
    lifecycle: Option<Arc<dyn LifecycleService>>,
    generate: Option<Arc<dyn GenerateService>>,
}

impl PluginServerBuilder {
    /// Registers the identity service.
    #[must_use]
    pub fn plugin(mut self, service: Arc<dyn PluginService>) -> Self {
        self.plugin = Some(service);
        self
    }

    /// Registers the command service.
    #[must_use]
    pub fn command(mut self, service: Arc<dyn CommandService>) -> Self {
        self.command = Some(service);
        self
    }

    /// Registers the schema service.
    #[must_use]
    pub fn hcl_schema(mut self, service: Arc<dyn HclSchemaService>) -> Self {
        self.hcl_schema = Some(service);
        self
    }

    /// Registers the lifecycle service.
    #[must_use]
    pub fn lifecycle(mut self, service: Arc<dyn LifecycleService>) -> Self {
        self.lifecycle = Some(service);
        self
    }

    /// Registers the generate service.
    #[must_use]
    pub fn generate(mut self, service: Arc<dyn GenerateService>) -> Self {
        self.generate = Some(service);
        self
    }

    /// Finishes registration.
    #[must_use]
    pub fn build(self) -> PluginServer {
        PluginServer { services: self }
    }
}

/// Serves the registered services on one host connection.
#[derive(Clone)]
pub struct PluginServer {
    services: PluginServerBuilder,
}

impl PluginServer {
    /// Starts registering services.
    #[must_use]
    pub fn builder() -> PluginServerBuilder {
        PluginServerBuilder::default()
    }

    /// Capabilities implied by the registrations.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_commands: self.services.command.is_some(),
            has_hcl_schema: self.services.hcl_schema.is_some(),
            has_post_init_hooks: self.services.lifecycle.is_some(),
            has_generate_override: self.services.generate.is_some(),
        }
    }

    /// Router dispatching to the registered services.
    ///
    /// `Plugin/*` is always routed; the other services only when
    /// registered, so calls to them answer `unimplemented`.
    #[must_use]
    pub fn router(&self) -> Router {
        let services = &self.services;
        let mut names = vec![methods::PLUGIN_SERVICE.to_owned()];
        let mut router = Router::new().close_after(methods::SHUTDOWN);
        if let Some(service) = &services.command {
            router = router.with_service(Arc::new(CommandAdapter::new(Arc::clone(service))));
            names.push(methods::COMMAND_SERVICE.to_owned());
        }
        if let Some(service) = &services.hcl_schema {
            router = router.with_service(Arc::new(HclSchemaAdapter::new(Arc::clone(service))));
            names.push(methods::HCL_SCHEMA_SERVICE.to_owned());
        }
        if let Some(service) = &services.lifecycle {
            router = router.with_service(Arc::new(LifecycleAdapter::new(Arc::clone(service))));
            names.push(methods::LIFECYCLE_SERVICE.to_owned());
        }
        if let Some(service) = &services.generate {
            router = router.with_service(Arc::new(GenerateAdapter::new(Arc::clone(service))));
            names.push(methods::GENERATE_SERVICE.to_owned());
        }
        router.with_service(Arc::new(PluginAdapter::new(
            services.plugin.clone(),
            self.capabilities(),
            names,
        )))
    }

    /// Runs as a plugin: binds a loopback socket, prints the handshake on
    /// stdout, and serves the host until it disconnects or asks to shut
    /// down.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::NotPlugin`] when the handshake cookie is
    /// missing from the environment.
    pub fn serve(self) -> Result<(), ServeError> {
        if !is_plugin_env() {
            return Err(ServeError::NotPlugin);
        }
        let listener = SocketListener::bind(&SocketEndpoint::loopback())?;
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.serve_on(&listener, &mut out)
    }

    /// Prints the handshake for `listener` to `out` and serves the first
    /// connection it accepts.
    pub fn serve_on(
        &self,
        listener: &SocketListener,
        out: &mut dyn Write,
    ) -> Result<(), ServeError> {
        let line = HandshakeLine::new(&HANDSHAKE, listener.endpoint());
        writeln!(out, "{line}")?;
        out.flush()?;
        info!(
            target: SERVER_TARGET,
            endpoint = %listener.endpoint(),
            "waiting for host connection"
        );
        let stream = listener.accept()?;
        serve_connection(stream, &self.router())?;
        info!(target: SERVER_TARGET, "host disconnected");
        Ok(())
    }
}
