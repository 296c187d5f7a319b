//! TCP client for the openMHA control protocol.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐          TCP (33337)          ┌─────────────────────┐
//! │   Connection    │  ◄──────────────────────────► │   openMHA parser    │
//! │  (this crate)   │   one command line, one reply  │       (peer)        │
//! └─────────────────┘                               └─────────────────────┘
//! ```
//!
//! # Protocol
//!
//! Each request is a single newline-terminated line. The reply is arbitrary
//! text terminated by a prompt marker:
//!
//! ```text
//! > mha.gain.gains?val
//! < [-5 5]
//! < (MHA:success)
//! ```
//!
//! The protocol is strictly half-duplex: one request is answered before the
//! next one is sent.

mod client;
mod config;
mod framing;
mod identifiers;
mod reader;

pub use client::{Connection, ConnectionError, ConnectionState};
pub use config::{ConnectionConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use framing::{parse_entries, parse_permission, Command, Query};
pub use identifiers::IdentifierListing;
pub use reader::{read_response, ReadError, Response, ResponseMarkers, MAX_RESPONSE_SIZE};
