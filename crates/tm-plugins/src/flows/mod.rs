//! Host-side flows that drive plugins through a whole operation.
//!
//! Each flow starts the plugins it needs, checks their capabilities, runs
//! one service, and kills the processes again. When a [`HostServer`] is
//! running its address is passed to every plugin started here.

mod command;
mod generate;
mod post_init;
mod sink;

use std::collections::BTreeMap;

use crate::host::{HostServer, HostService};

pub use self::command::execute_command;
pub use self::generate::run_generate_override;
pub use self::post_init::{PostInitReport, run_post_init};
pub use self::sink::{GenerateSink, StdStreams};

const FLOWS_TARGET: &str = "tm_plugins::flows";

/// The host side plugins may call back into.
#[derive(Debug, Clone, Copy)]
pub struct HostContext<'a> {
    service: &'a HostService,
    server: Option<&'a HostServer>,
}

impl<'a> HostContext<'a> {
    /// Context for `service`, reachable by plugins through `server`.
    #[must_use]
    pub const fn new(service: &'a HostService, server: Option<&'a HostServer>) -> Self {
        Self { service, server }
    }

    /// The host service state.
    #[must_use]
    pub const fn service(&self) -> &'a HostService {
        self.service
    }

    /// Environment for plugin processes.
    #[must_use]
    pub fn plugin_env(&self) -> BTreeMap<String, String> {
        self.server
            .map(|server| BTreeMap::from([server.env_pair()]))
            .unwrap_or_default()
    }
}
