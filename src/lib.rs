//! openMHA control client library
//!
//! This library talks to a running openMHA instance over its line-based TCP
//! control protocol:
//!
//! - `connection` - TCP client, command framing and response reading
//! - `codec` - conversion between the peer's value grammar and [`Value`]
//! - `value` - the closed value model and wire type classification
//!
//! # Usage
//!
//! ```ignore
//! use mha_control::{Connection, ConnectionConfig, Value};
//!
//! let mut mha = Connection::connect(&ConnectionConfig::default()).await?;
//! mha.set_value("mha.gain.gains", &Value::Vector(vec![-5.0, 5.0])).await?;
//! let gains = mha.get_value("mha.gain.gains").await?;
//! mha.close().await;
//! ```

pub mod codec;
pub mod connection;
pub mod value;

pub use codec::CodecError;
pub use connection::{Connection, ConnectionConfig, ConnectionError, ConnectionState};
pub use value::{Complex, TypeFamily, Value, WireType};
