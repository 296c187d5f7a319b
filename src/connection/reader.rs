//! Response reader: consume bytes until a prompt marker.
//!
//! The peer never closes the connection between replies, so a reply is
//! delimited only by its trailing marker:
//!
//! ```text
//! <payload>(MHA:success)
//! <payload>(MHA:failure)
//! ```
//!
//! Bytes are scanned as they arrive and nothing past the marker is consumed,
//! which leaves the stream positioned at the start of the next reply.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Prompt printed by the peer after a successful command.
pub const SUCCESS_MARKER: &str = "(MHA:success)";

/// Prompt printed by the peer after a failed command.
pub const FAILURE_MARKER: &str = "(MHA:failure)";

/// Maximum reply size (100MB), marker included, to prevent OOM from a peer
/// that never prints a prompt.
pub const MAX_RESPONSE_SIZE: usize = 100 * 1024 * 1024;

/// The pair of prompts that terminate a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMarkers {
    pub success: String,
    pub failure: String,
}

impl Default for ResponseMarkers {
    fn default() -> Self {
        Self {
            success: SUCCESS_MARKER.to_string(),
            failure: FAILURE_MARKER.to_string(),
        }
    }
}

/// One complete reply, marker stripped and payload trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Success(Vec<u8>),
    Failure {
        /// Index of the matched failure marker (0 for the single failure prompt).
        code: usize,
        payload: Vec<u8>,
    },
}

/// Errors raised while waiting for a marker.
#[derive(Debug, Error)]
pub enum ReadError {
    /// EOF before any marker was seen.
    #[error("Connection closed by peer")]
    Closed,

    /// No marker within `limit` bytes. The rest of the reply is left unread.
    #[error("Response exceeds maximum {limit} bytes")]
    TooLarge { limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one reply of at most `max_size` bytes from `reader`.
///
/// Blocks (asynchronously) until either marker has been received; the caller
/// bounds the wait with a timeout.
///
/// # Errors
///
/// Returns [`ReadError::Closed`] if the stream ends before a marker and
/// [`ReadError::TooLarge`] once `max_size` bytes arrived without one.
pub async fn read_response<R>(
    reader: &mut R,
    markers: &ResponseMarkers,
    max_size: usize,
) -> Result<Response, ReadError>
where
    R: AsyncBufRead + Unpin,
{
    let success = markers.success.as_bytes();
    let failure = markers.failure.as_bytes();
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Err(ReadError::Closed);
        }

        let mut consumed = 0;
        let mut matched = None;
        let mut overflow = false;
        for &byte in available {
            if buffer.len() == max_size {
                overflow = true;
                break;
            }
            buffer.push(byte);
            consumed += 1;
            if buffer.ends_with(success) {
                matched = Some((true, success.len()));
                break;
            }
            if buffer.ends_with(failure) {
                matched = Some((false, failure.len()));
                break;
            }
        }
        reader.consume(consumed);

        if overflow {
            return Err(ReadError::TooLarge { limit: max_size });
        }
        if let Some((ok, marker_len)) = matched {
            buffer.truncate(buffer.len() - marker_len);
            let payload = buffer.trim_ascii().to_vec();
            return Ok(if ok {
                Response::Success(payload)
            } else {
                Response::Failure { code: 0, payload }
            });
        }
    }
}
