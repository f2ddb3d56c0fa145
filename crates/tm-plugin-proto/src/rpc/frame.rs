//! Frame layout and line I/O.

use std::io::{self, BufRead, Read, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::status::RpcStatus;

/// Upper bound on a single frame, newline included.
const MAX_FRAME_BYTES: u64 = 64 * 1024 * 1024;

/// One line on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frame {
    /// Opens a call.
    Request {
        /// Call identifier chosen by the caller.
        id: u64,
        /// `Service/Method`.
        method: String,
        /// Request body.
        #[serde(default)]
        params: Value,
    },
    /// One element of a server stream.
    Item {
        /// Call identifier.
        id: u64,
        /// Element body.
        item: Value,
    },
    /// Completes a call successfully.
    Response {
        /// Call identifier.
        id: u64,
        /// Reply body; `null` at the end of a stream.
        #[serde(default)]
        result: Value,
    },
    /// Fails a call.
    Error {
        /// Call identifier.
        id: u64,
        /// Failure.
        status: RpcStatus,
    },
}

impl Frame {
    /// Call identifier of the frame.
    #[must_use]
    pub const fn id(&self) -> u64 {
        match self {
            Self::Request { id, .. }
            | Self::Item { id, .. }
            | Self::Response { id, .. }
            | Self::Error { id, .. } => *id,
        }
    }
}

/// Reads one line; `None` at a clean end of stream.
pub(crate) fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    let read = reader.by_ref().take(MAX_FRAME_BYTES).read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    let at_limit = u64::try_from(line.len()).map_or(true, |len| len >= MAX_FRAME_BYTES);
    if at_limit && !line.ends_with('\n') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "frame exceeds maximum size",
        ));
    }
    Ok(Some(line))
}

/// Writes one frame and flushes.
pub(crate) fn write_frame<W: Write>(writer: &mut W, frame: &Frame) -> io::Result<()> {
    let mut payload = serde_json::to_vec(frame).map_err(io::Error::other)?;
    payload.push(b'\n');
    writer.write_all(&payload)?;
    writer.flush()
}
