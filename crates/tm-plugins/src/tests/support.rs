//! Shared fixtures: shell-script plugins backed by in-process servers.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use tm_plugin_proto::SocketEndpoint;
use tm_plugin_proto::handshake::{HANDSHAKE, HandshakeLine};
use tm_plugin_proto::transport::SocketListener;

use crate::server::PluginServer;

/// Writes an executable `/bin/sh` script.
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut permissions = fs::metadata(&path).expect("stat script").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("chmod script");
    path
}

/// A plugin binary whose services run inside the test process.
///
/// The script prints the handshake of a listener owned by the test and then
/// idles, so the host treats it as a live plugin process.
pub(crate) struct ScriptedPlugin {
    pub(crate) binary: PathBuf,
    pub(crate) server: JoinHandle<()>,
}

pub(crate) fn scripted_plugin(dir: &Path, name: &str, server: PluginServer) -> ScriptedPlugin {
    let listener = SocketListener::bind(&SocketEndpoint::loopback()).expect("bind listener");
    let line = HandshakeLine::new(&HANDSHAKE, listener.endpoint());
    let binary = write_script(dir, name, &format!("echo '{line}'\nexec sleep 30"));
    let handle = thread::spawn(move || {
        let mut discarded = Vec::new();
        // A killed host connection is a valid way for these servers to end.
        let _outcome = server.serve_on(&listener, &mut discarded);
    });
    ScriptedPlugin {
        binary,
        server: handle,
    }
}
