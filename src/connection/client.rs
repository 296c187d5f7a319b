//! Control connection to a running openMHA instance.
//!
//! This module provides `Connection`, an async client that owns one TCP
//! connection to the openMHA parser, sends one command at a time and decodes
//! the replies with the value codec.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use super::config::ConnectionConfig;
use super::framing::{parse_entries, parse_permission, Command, Query};
use super::identifiers::IdentifierListing;
use super::reader::{read_response, ReadError, ResponseMarkers, Response};
use crate::codec::{self, CodecError};
use crate::value::{Value, WireType};

/// Connection error types.
///
/// Transport and protocol failures are translated into these variants and
/// always surfaced to the caller; nothing is retried internally.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Failed to establish the TCP connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] std::io::Error),

    /// The configuration cannot be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No prompt arrived before the deadline. The connection is unusable
    /// until reopened.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The peer closed the stream, or the connection was closed locally.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The peer answered with the failure prompt.
    #[error("Command {command:?} rejected with error code {code}: {payload}")]
    RemoteRejected {
        /// The command line as sent, without newline
        command: String,
        /// Index of the matched failure marker
        code: usize,
        /// The peer's reply preceding the marker
        payload: String,
    },

    /// A reply that does not parse against its declared type.
    #[error("Malformed value: {0}")]
    MalformedValue(String),

    /// A ragged matrix was passed to a matrix node; nothing was sent.
    #[error("Shape mismatch: row {row} has {found} columns, expected {expected}")]
    ShapeMismatch {
        expected: usize,
        found: usize,
        row: usize,
    },

    /// No prompt within the configured response size. The connection is
    /// unusable until reopened.
    #[error("Response exceeds maximum {limit} bytes")]
    ResponseTooLarge { limit: usize },

    /// A request was issued while an earlier one never completed.
    #[error("Connection desynchronized by an unfinished request; reopen it")]
    Desynchronized,

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
                ConnectionError::ConnectionFailed(err)
            }
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted => ConnectionError::ConnectionClosed,
            _ => ConnectionError::Io(err),
        }
    }
}

impl From<ReadError> for ConnectionError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Closed => ConnectionError::ConnectionClosed,
            ReadError::TooLarge { limit } => ConnectionError::ResponseTooLarge { limit },
            ReadError::Io(e) => e.into(),
        }
    }
}

impl From<CodecError> for ConnectionError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Malformed(message) => ConnectionError::MalformedValue(message),
            CodecError::ShapeMismatch {
                expected,
                found,
                row,
            } => ConnectionError::ShapeMismatch {
                expected,
                found,
                row,
            },
        }
    }
}

/// Where a connection is in its request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    /// A command was written and its prompt has not been read yet.
    AwaitingResponse,
    Closed,
}

struct Transport {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// Control connection to an openMHA instance.
///
/// The protocol is half-duplex, so every operation takes `&mut self`; share a
/// connection between tasks only behind a `tokio::sync::Mutex`.
///
/// # Connection Lifecycle
///
/// - `connect()` - Establish the TCP connection
/// - `send_command()` and the typed operations - One request, one reply
/// - `reopen()` - Drop the current stream and connect again
/// - `close()` - Shut the stream down (idempotent; dropping also closes)
///
/// # Example
///
/// ```ignore
/// use mha_control::{Connection, ConnectionConfig, Value};
///
/// let mut mha = Connection::connect(&ConnectionConfig::default()).await?;
/// mha.set_value("srate", &Value::Real(44100.0)).await?;
/// let algos = mha.get_raw("mha.algos").await?;
/// mha.close().await;
/// ```
pub struct Connection {
    config: ConnectionConfig,
    transport: Option<Transport>,
    state: ConnectionState,
}

impl Connection {
    /// Connect to the peer described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::ConnectionFailed` if the peer cannot be
    /// reached, `ConnectionError::Timeout` if connecting exceeds the
    /// configured timeout.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, ConnectionError> {
        config
            .validate()
            .map_err(|e| ConnectionError::InvalidConfig(e.to_string()))?;
        let transport = open_transport(config).await?;
        Ok(Self {
            config: config.clone(),
            transport: Some(transport),
            state: ConnectionState::Idle,
        })
    }

    /// Connect to `host:port` with default settings.
    pub async fn open(host: &str, port: u16) -> Result<Self, ConnectionError> {
        Self::connect(&ConnectionConfig::new(host, port)).await
    }

    /// Close the stream and connect again with the same configuration.
    ///
    /// This is the only way out of `Timeout` and `Desynchronized`.
    pub async fn reopen(&mut self) -> Result<(), ConnectionError> {
        self.close().await;
        let transport = open_transport(&self.config).await?;
        self.transport = Some(transport);
        self.state = ConnectionState::Idle;
        Ok(())
    }

    /// Close the connection. Closing twice is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.writer.shutdown().await {
                debug!("Shutdown of {} failed: {}", self.config.address(), e);
            }
            info!("Closed connection to {}", self.config.address());
        }
        self.state = ConnectionState::Closed;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Set the request timeout (`None` waits indefinitely).
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.config.timeout = timeout;
    }

    /// Send one command and return the reply payload.
    ///
    /// This method:
    /// 1. Writes the command line
    /// 2. Waits for the success or failure prompt (with timeout)
    /// 3. Returns the trimmed payload or `RemoteRejected`
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The request times out (`ConnectionError::Timeout`)
    /// - The stream ends (`ConnectionError::ConnectionClosed`)
    /// - The peer answers with the failure prompt (`ConnectionError::RemoteRejected`)
    /// - A previous request never completed (`ConnectionError::Desynchronized`)
    /// - The reply is not valid UTF-8 (`ConnectionError::MalformedValue`)
    pub async fn send_command(&mut self, command: &Command) -> Result<String, ConnectionError> {
        let payload = self.send_command_bytes(command).await?;
        String::from_utf8(payload).map_err(|e| {
            ConnectionError::MalformedValue(format!(
                "Reply to {:?} is not valid UTF-8: {}",
                command.to_string(),
                e
            ))
        })
    }

    /// Like `send_command`, but returns the success payload undecoded.
    async fn send_command_bytes(&mut self, command: &Command) -> Result<Vec<u8>, ConnectionError> {
        let transport = match self.state {
            ConnectionState::Closed => return Err(ConnectionError::ConnectionClosed),
            ConnectionState::AwaitingResponse => return Err(ConnectionError::Desynchronized),
            ConnectionState::Idle => self
                .transport
                .as_mut()
                .ok_or(ConnectionError::ConnectionClosed)?,
        };

        let line = command.to_string();
        debug!("Sending {:?}", line);
        self.state = ConnectionState::AwaitingResponse;

        let exchange = exchange(
            transport,
            command.to_bytes(),
            &self.config.markers,
            self.config.max_response_size,
        );
        let result = match self.config.timeout {
            Some(limit) => match timeout(limit, exchange).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("No reply to {:?} within {:?}", line, limit);
                    return Err(ConnectionError::Timeout(limit));
                }
            },
            None => exchange.await,
        };

        let response = match result {
            Ok(response) => response,
            Err(ConnectionError::ConnectionClosed) => {
                warn!("Peer closed the connection while waiting for {:?}", line);
                self.transport = None;
                self.state = ConnectionState::Closed;
                return Err(ConnectionError::ConnectionClosed);
            }
            Err(e) => return Err(e),
        };
        self.state = ConnectionState::Idle;

        match response {
            Response::Success(payload) => {
                trace!("Reply to {:?}: {} bytes", line, payload.len());
                Ok(payload)
            }
            Response::Failure { code, payload } => {
                let payload = String::from_utf8_lossy(&payload).into_owned();
                warn!("Command {:?} rejected: {}", line, payload);
                Err(ConnectionError::RemoteRejected {
                    command: line,
                    code,
                    payload,
                })
            }
        }
    }

    /// Send a complete command line as-is.
    pub async fn send_raw(&mut self, line: &str) -> Result<String, ConnectionError> {
        self.send_command(&Command::raw(line)).await
    }

    async fn query(&mut self, path: &str, query: Query) -> Result<String, ConnectionError> {
        self.send_command(&Command::query(path, query)).await
    }

    /// The contents of the node at `path` (`?`).
    pub async fn get_contents(&mut self, path: &str) -> Result<String, ConnectionError> {
        self.query(path, Query::Contents).await
    }

    /// The documentation of the node at `path`.
    pub async fn get_help(&mut self, path: &str) -> Result<String, ConnectionError> {
        self.query(path, Query::Help).await
    }

    pub async fn get_type(&mut self, path: &str) -> Result<WireType, ConnectionError> {
        self.query(path, Query::Type).await.map(WireType::from)
    }

    /// The value at `path` exactly as the peer prints it.
    pub async fn get_raw(&mut self, path: &str) -> Result<String, ConnectionError> {
        self.query(path, Query::Value).await
    }

    /// The value at `path`, decoded according to its type.
    pub async fn get_value(&mut self, path: &str) -> Result<Value, ConnectionError> {
        let wire_type = self.get_type(path).await?;
        let payload = self.get_raw(path).await?;
        Ok(codec::decode(&payload, &wire_type)?)
    }

    /// Assign wire-format text to `path`.
    pub async fn set_raw(&mut self, path: &str, value: &str) -> Result<String, ConnectionError> {
        self.send_command(&Command::assign(path, value)).await
    }

    /// Encode `value` for the type of `path` and assign it.
    ///
    /// A ragged matrix fails with `ShapeMismatch` before the assignment is
    /// sent.
    pub async fn set_value(&mut self, path: &str, value: &Value) -> Result<String, ConnectionError> {
        let wire_type = self.get_type(path).await?;
        debug!("Encoding {} value for {} ({})", value.kind(), path.trim(), wire_type);
        let encoded = codec::encode(value, &wire_type)?;
        self.set_raw(path, &encoded).await
    }

    /// Whether the node at `path` accepts assignments. Any reply other than
    /// `writable`, including one that is not UTF-8, means no.
    pub async fn is_writable(&mut self, path: &str) -> Result<bool, ConnectionError> {
        self.send_command_bytes(&Command::query(path, Query::Permission))
            .await
            .map(|payload| parse_permission(&payload))
    }

    pub async fn get_range(&mut self, path: &str) -> Result<String, ConnectionError> {
        self.query(path, Query::Range).await
    }

    /// Names of the children of the node at `path`.
    pub async fn get_entries(&mut self, path: &str) -> Result<Vec<String>, ConnectionError> {
        self.query(path, Query::Entries)
            .await
            .map(|payload| parse_entries(&payload))
    }

    /// Variable substitutions applied to the node at `path`.
    pub async fn get_substitutions(&mut self, path: &str) -> Result<String, ConnectionError> {
        self.query(path, Query::Substitutions).await
    }

    /// Commands the node at `path` understands.
    pub async fn get_commands(&mut self, path: &str) -> Result<String, ConnectionError> {
        self.query(path, Query::Commands).await
    }

    /// The raw `?listid` listing, in peer order.
    pub async fn identifier_listing(&mut self) -> Result<IdentifierListing, ConnectionError> {
        let payload = self.send_command(&Command::ListIds).await?;
        Ok(IdentifierListing::parse(&payload)?)
    }

    /// Path → plug-in identifier for every plug-in with an id.
    pub async fn list_identifiers(&mut self) -> Result<BTreeMap<String, String>, ConnectionError> {
        self.identifier_listing().await.map(IdentifierListing::into_map)
    }

    /// All paths of plug-ins with identifier `id` (empty if none).
    pub async fn find_by_identifier(&mut self, id: &str) -> Result<Vec<String>, ConnectionError> {
        let listing = self.identifier_listing().await?;
        Ok(listing.paths_for(id))
    }

    /// Save the node at `path` into `file_name` on the peer's file system.
    pub async fn save_node(
        &mut self,
        path: &str,
        file_name: &str,
        with_comments: bool,
    ) -> Result<String, ConnectionError> {
        let query = if with_comments {
            Query::Save(file_name.to_string())
        } else {
            Query::SaveShort(file_name.to_string())
        };
        self.query(path, query).await
    }

    /// Save all monitor variables below `path` into `file_name`.
    pub async fn save_monitor_variables(
        &mut self,
        path: &str,
        file_name: &str,
    ) -> Result<String, ConnectionError> {
        self.query(path, Query::SaveMonitors(file_name.to_string()))
            .await
    }

    /// Read the configuration file `file_name` into the node at `path`.
    pub async fn read_config(&mut self, path: &str, file_name: &str) -> Result<String, ConnectionError> {
        self.query(path, Query::Read(file_name.to_string())).await
    }
}

async fn open_transport(config: &ConnectionConfig) -> Result<Transport, ConnectionError> {
    let address = config.address();
    let connecting = TcpStream::connect(address.as_str());
    let stream = match config.timeout {
        Some(limit) => timeout(limit, connecting)
            .await
            .map_err(|_| ConnectionError::Timeout(limit))?,
        None => connecting.await,
    }
    .map_err(ConnectionError::ConnectionFailed)?;
    stream.set_nodelay(true)?;

    info!("Connected to MHA at {}", address);
    let (read_half, write_half) = stream.into_split();
    Ok(Transport {
        reader: BufReader::new(read_half),
        writer: write_half,
    })
}

/// Write one command and read its reply (no timeout).
async fn exchange(
    transport: &mut Transport,
    bytes: Vec<u8>,
    markers: &ResponseMarkers,
    max_size: usize,
) -> Result<Response, ConnectionError> {
    transport.writer.write_all(&bytes).await?;
    transport.writer.flush().await?;
    Ok(read_response(&mut transport.reader, markers, max_size).await?)
}
