//! Value model for the openMHA control protocol.
//!
//! The peer describes every variable with a type tag (`?type`), e.g.
//! `float`, `vector<float>`, `matrix<float>` or `mcomplex`. The tag embeds an
//! element type, so the coarse [`TypeFamily`] is found by substring match,
//! never by equality. Unknown tags fall back to [`TypeFamily::Scalar`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A complex scalar as the peer stores it (`(re+imi)` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

/// A decoded variable value.
///
/// Matrices are row-major. The encoder rejects ragged matrices; the decoder
/// reproduces whatever row lengths the peer sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Real(f64),
    Complex(Complex),
    Text(String),
    Vector(Vec<f64>),
    ComplexVector(Vec<Complex>),
    Matrix(Vec<Vec<f64>>),
    ComplexMatrix(Vec<Vec<Complex>>),
}

impl Value {
    /// Short name of the variant, as shown in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Real(_) => "real",
            Value::Complex(_) => "complex",
            Value::Text(_) => "text",
            Value::Vector(_) => "vector",
            Value::ComplexVector(_) => "complex vector",
            Value::Matrix(_) => "matrix",
            Value::ComplexMatrix(_) => "complex matrix",
        }
    }

    pub fn as_matrix(&self) -> Option<&[Vec<f64>]> {
        match self {
            Value::Matrix(m) => Some(m),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<Complex> for Value {
    fn from(v: Complex) -> Self {
        Value::Complex(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Vector(v)
    }
}

impl From<Vec<Vec<f64>>> for Value {
    fn from(v: Vec<Vec<f64>>) -> Self {
        Value::Matrix(v)
    }
}

impl From<Vec<Complex>> for Value {
    fn from(v: Vec<Complex>) -> Self {
        Value::ComplexVector(v)
    }
}

impl From<Vec<Vec<Complex>>> for Value {
    fn from(v: Vec<Vec<Complex>>) -> Self {
        Value::ComplexMatrix(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::codec::render_literal(self))
    }
}

/// Coarse category of a wire type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    /// Exactly `string`; decoded verbatim.
    Text,
    /// Numeric scalars, booleans and every tag we do not recognise.
    Scalar,
    Vector,
    Matrix,
    Complex,
    ComplexVector,
    ComplexMatrix,
}

impl TypeFamily {
    /// Classify a type tag as reported by `?type`.
    pub fn classify(tag: &str) -> Self {
        let tag = tag.trim();
        if tag == "string" {
            TypeFamily::Text
        } else if tag.contains("mcomplex") {
            TypeFamily::ComplexMatrix
        } else if tag.contains("vcomplex") {
            TypeFamily::ComplexVector
        } else if tag.contains("complex") {
            TypeFamily::Complex
        } else if tag.contains("matrix") {
            TypeFamily::Matrix
        } else if tag.contains("vector") {
            TypeFamily::Vector
        } else {
            TypeFamily::Scalar
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeFamily::Text => "string",
            TypeFamily::Scalar => "scalar",
            TypeFamily::Vector => "vector",
            TypeFamily::Matrix => "matrix",
            TypeFamily::Complex => "complex",
            TypeFamily::ComplexVector => "vcomplex",
            TypeFamily::ComplexMatrix => "mcomplex",
        }
    }

    /// Vectors and matrices, real or complex.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            TypeFamily::Vector
                | TypeFamily::Matrix
                | TypeFamily::ComplexVector
                | TypeFamily::ComplexMatrix
        )
    }

    pub fn is_complex(&self) -> bool {
        matches!(
            self,
            TypeFamily::Complex | TypeFamily::ComplexVector | TypeFamily::ComplexMatrix
        )
    }

    pub fn is_two_dimensional(&self) -> bool {
        matches!(self, TypeFamily::Matrix | TypeFamily::ComplexMatrix)
    }
}

/// A type tag exactly as the peer reported it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireType(String);

impl WireType {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn family(&self) -> TypeFamily {
        TypeFamily::classify(&self.0)
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WireType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for WireType {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}
