//! Destinations for streamed plugin output.

use std::io::{self, Write};
use std::path::Path;

/// Receives the output chunks of command and generate streams.
pub trait GenerateSink {
    /// A chunk for the user's stdout.
    fn stdout(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// A chunk for the user's stderr.
    fn stderr(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// Called after a file was written for the plugin.
    fn file_written(&mut self, _path: &Path) {}
}

/// Forwards chunks to the process's own stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdStreams;

impl GenerateSink for StdStreams {
    fn stdout(&mut self, chunk: &[u8]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(chunk)?;
        out.flush()
    }

    fn stderr(&mut self, chunk: &[u8]) -> io::Result<()> {
        io::stderr().lock().write_all(chunk)
    }
}
