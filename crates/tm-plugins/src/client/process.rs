//! Child process handling for plugin clients.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tm_plugin_proto::handshake::{HANDSHAKE, HandshakeLine};
use tracing::{debug, warn};

use super::CLIENT_TARGET;
use crate::error::PluginError;

const EXIT_GRACE: Duration = Duration::from_millis(500);
const EXIT_POLL: Duration = Duration::from_millis(20);

/// Spawns the plugin and starts forwarding its stderr to the log.
pub(super) fn spawn(
    name: &str,
    binary_path: &Path,
    extra_env: &BTreeMap<String, String>,
) -> Result<Child, PluginError> {
    let mut command = Command::new(binary_path);
    command
        .envs(extra_env)
        .env(HANDSHAKE.magic_cookie_key, HANDSHAKE.magic_cookie_value)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(
        target: CLIENT_TARGET,
        plugin = name,
        executable = %binary_path.display(),
        "spawning plugin process"
    );
    let mut child = command.spawn().map_err(|err| PluginError::Spawn {
        name: name.to_owned(),
        source: err.into(),
    })?;
    if let Some(stderr) = child.stderr.take() {
        forward_stderr(name, stderr);
    }
    Ok(child)
}

fn forward_stderr(name: &str, stderr: impl Read + Send + 'static) {
    let plugin = name.to_owned();
    thread::spawn(move || {
        for line in BufReader::new(stderr).lines() {
            let Ok(line) = line else {
                break;
            };
            debug!(target: CLIENT_TARGET, plugin = plugin.as_str(), "{line}");
        }
    });
}

/// Waits up to `timeout` for the handshake line on the child's stdout.
pub(super) fn read_handshake(
    name: &str,
    child: &mut Child,
    timeout: Duration,
) -> Result<HandshakeLine, PluginError> {
    let stdout = child.stdout.take().ok_or_else(|| PluginError::Exited {
        name: name.to_owned(),
    })?;
    let receiver = watch_stdout(name, stdout);
    let line = match receiver.recv_timeout(timeout) {
        Ok(Some(line)) => line,
        Ok(None) | Err(RecvTimeoutError::Disconnected) => {
            return Err(PluginError::Exited {
                name: name.to_owned(),
            });
        }
        Err(RecvTimeoutError::Timeout) => {
            return Err(PluginError::Timeout {
                name: name.to_owned(),
                stage: "handshake",
                timeout_secs: timeout.as_secs(),
            });
        }
    };
    HandshakeLine::parse(&HANDSHAKE, line.trim_end()).map_err(|err| PluginError::Handshake {
        name: name.to_owned(),
        message: err.to_string(),
    })
}

/// Reads stdout on a helper thread: the first line goes to the returned
/// channel (`None` on EOF), anything after it is logged so the plugin
/// never blocks on a full pipe.
fn watch_stdout(name: &str, stdout: ChildStdout) -> mpsc::Receiver<Option<String>> {
    let (sender, receiver) = mpsc::channel();
    let plugin = name.to_owned();
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        let mut first = String::new();
        let handshake = match reader.read_line(&mut first) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(first),
        };
        let eof = handshake.is_none();
        if sender.send(handshake).is_err() || eof {
            return;
        }
        for line in reader.lines() {
            let Ok(line) = line else {
                break;
            };
            warn!(
                target: CLIENT_TARGET,
                plugin = plugin.as_str(),
                line = line.as_str(),
                "unexpected plugin stdout after handshake"
            );
        }
    });
    receiver
}

/// Waits briefly for a graceful exit, then kills.
pub(super) fn stop(name: &str, child: &mut Child) {
    let deadline = Instant::now() + EXIT_GRACE;
    while Instant::now() < deadline {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(target: CLIENT_TARGET, plugin = name, %status, "plugin exited");
                return;
            }
            Ok(None) => thread::sleep(EXIT_POLL),
            Err(error) => {
                warn!(target: CLIENT_TARGET, plugin = name, %error, "failed to poll plugin");
                break;
            }
        }
    }
    terminate(name, child);
}

/// Kills and reaps the child, logging failures.
pub(super) fn terminate(name: &str, child: &mut Child) {
    if let Err(error) = child.kill() {
        debug!(target: CLIENT_TARGET, plugin = name, %error, "kill failed");
    }
    match child.wait() {
        Ok(status) => debug!(target: CLIENT_TARGET, plugin = name, %status, "plugin reaped"),
        Err(error) => warn!(target: CLIENT_TARGET, plugin = name, %error, "failed to reap plugin"),
    }
}
