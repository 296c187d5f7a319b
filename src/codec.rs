//! Value grammar codec for the openMHA textual value format.
//!
//! The peer prints and parses values in its own grammar:
//!
//! ```text
//! string          gain
//! float           -3.5
//! vector<float>   [1 2 3]
//! matrix<float>   [[1 2];[3 4]]
//! complex         (1+2i)
//! vcomplex        [(1+2i) (3-4i)]
//! mcomplex        [[(1+2i) 3];[(0+1i) (2-2i)]]
//! ```
//!
//! Decoding rewrites this text into a bracketed literal (commas between
//! elements, `j` as the imaginary unit) and parses it with a restricted
//! literal grammar. Encoding renders a [`Value`] into that literal form and
//! rewrites it back into the wire grammar. Both directions are pure; the
//! [`WireType`] of the target node drives every decision.
//!
//! # Example
//!
//! ```
//! use mha_control::codec::{decode, encode};
//! use mha_control::{Value, WireType};
//!
//! let tag = WireType::from("matrix<float>");
//! let wire = encode(&Value::Matrix(vec![vec![1.0, 2.0], vec![3.0, 4.0]]), &tag).unwrap();
//! assert_eq!(wire, "[[1 2];[3 4]]");
//! assert_eq!(decode(&wire, &tag).unwrap().as_matrix().unwrap()[1], vec![3.0, 4.0]);
//! ```

mod decode;
mod encode;
mod literal;

use thiserror::Error;

pub use decode::decode;
pub use encode::{encode, render_literal};

/// Errors raised while converting between wire text and [`crate::Value`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// The payload does not parse against its declared type.
    #[error("Malformed value: {0}")]
    Malformed(String),

    /// A 2-D value whose rows differ in length.
    #[error("Shape mismatch: row {row} has {found} columns, expected {expected}")]
    ShapeMismatch {
        /// Columns in the first row
        expected: usize,
        /// Columns in the offending row
        found: usize,
        /// Index of the offending row
        row: usize,
    },
}
