//! Value → wire text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::CodecError;
use crate::value::{Complex, TypeFamily, Value, WireType};

/// An imaginary literal and an optional closing parenthesis right after it.
/// A match that ends in `)` is the imaginary half of a full `(re+imj)`.
static IMAGINARY_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?[\d.]*\dj\)?").expect("imaginary regex is valid"));

/// Encode `value` for a node of type `wire_type`.
///
/// # Errors
///
/// Returns [`CodecError::ShapeMismatch`] for a ragged matrix sent to a
/// `matrix`/`mcomplex` node.
pub fn encode(value: &Value, wire_type: &WireType) -> Result<String, CodecError> {
    let family = wire_type.family();
    match value {
        Value::Text(text) => Ok(text.clone()),
        Value::Bool(_) | Value::Real(_) => Ok(render_literal(value)),
        Value::Complex(c) => {
            let literal = render_complex(c);
            if family.is_complex() {
                Ok(complex_to_wire(&literal))
            } else {
                Ok(literal)
            }
        }
        Value::Vector(_) | Value::ComplexVector(_) => Ok(sequence_to_wire(value, family)),
        Value::Matrix(rows) => {
            if family.is_two_dimensional() {
                ensure_rectangular(rows)?;
            }
            Ok(sequence_to_wire(value, family))
        }
        Value::ComplexMatrix(rows) => {
            if family.is_two_dimensional() {
                ensure_rectangular(rows)?;
            }
            Ok(sequence_to_wire(value, family))
        }
    }
}

/// Render a value in the bracketed literal form the decoder parses:
/// `[1,2]`, `[[1,2],[3,4]]`, `(1+2j)`, `2j`.
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        Value::Real(x) => x.to_string(),
        Value::Complex(c) => render_complex(c),
        Value::Text(text) => text.clone(),
        Value::Vector(v) => render_row(v, |x| x.to_string()),
        Value::ComplexVector(v) => render_row(v, render_complex),
        Value::Matrix(rows) => render_rows(rows, |row| render_row(row, |x| x.to_string())),
        Value::ComplexMatrix(rows) => render_rows(rows, |row| render_row(row, render_complex)),
    }
}

fn render_row<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    let parts: Vec<String> = items.iter().map(render).collect();
    format!("[{}]", parts.join(","))
}

fn render_rows<T>(rows: &[Vec<T>], render: impl Fn(&Vec<T>) -> String) -> String {
    let parts: Vec<String> = rows.iter().map(render).collect();
    format!("[{}]", parts.join(","))
}

/// A zero real part is omitted, leaving a bare `imj`.
fn render_complex(c: &Complex) -> String {
    if c.re == 0.0 && !c.re.is_sign_negative() {
        return format!("{}j", c.im);
    }
    let sign = if c.im.is_sign_negative() { "" } else { "+" };
    format!("({}{}{}j)", c.re, sign, c.im)
}

/// The peer needs an explicit real part: `2j` becomes `(0+2i)`.
fn complex_to_wire(literal: &str) -> String {
    let explicit = IMAGINARY_LITERAL.replace_all(literal, |caps: &Captures| {
        let found = &caps[0];
        if found.ends_with(')') {
            return found.to_string();
        }
        match found.strip_prefix('-') {
            Some(magnitude) => format!("(0-{})", magnitude),
            None => format!("(0+{})", found.trim_start_matches('+')),
        }
    });
    explicit.replace('j', "i")
}

/// Rows are `;`-separated and elements space-separated on the wire.
fn sequence_to_wire(value: &Value, family: TypeFamily) -> String {
    let literal = render_literal(value);
    let literal = if family.is_complex() {
        complex_to_wire(&literal)
    } else {
        literal
    };
    literal.replace("],", "];").replace(',', " ")
}

fn ensure_rectangular<T>(rows: &[Vec<T>]) -> Result<(), CodecError> {
    let expected = rows.first().map_or(0, Vec::len);
    match rows.iter().position(|row| row.len() != expected) {
        Some(row) => Err(CodecError::ShapeMismatch {
            expected,
            found: rows[row].len(),
            row,
        }),
        None => Ok(()),
    }
}
