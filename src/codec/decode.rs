//! Wire text → Value.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::literal::{parse_literal, Literal};
use super::CodecError;
use crate::value::{Complex, TypeFamily, Value, WireType};

/// A digit followed by a run of spaces (element separator in vectors and
/// matrices).
static DIGIT_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d) +").expect("digit-spaces regex is valid"));

/// Either a digit followed by whitespace (optionally preceded by `(`), or a
/// closing parenthesis. Matches that start with `(` are left alone so the
/// parts of `(re+imi)` stay together.
static COMPLEX_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(?\d\s|\)").expect("complex separator regex is valid"));

/// Decode `payload` as returned by `?val` for a node of type `wire_type`.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if the payload does not form a literal
/// of a shape that fits the type family.
pub fn decode(payload: &str, wire_type: &WireType) -> Result<Value, CodecError> {
    let family = wire_type.family();
    if family == TypeFamily::Text {
        return Ok(Value::Text(payload.to_string()));
    }
    let normalized = normalize(payload, family);
    let literal = parse_literal(&normalized)?;
    shape(literal, family)
}

/// Rewrite the wire grammar into the bracketed literal grammar.
pub(crate) fn normalize(payload: &str, family: TypeFamily) -> String {
    let mut text = match family {
        TypeFamily::Vector | TypeFamily::Matrix => {
            DIGIT_SPACES.replace_all(payload, "$1, ").into_owned()
        }
        TypeFamily::ComplexVector | TypeFamily::ComplexMatrix => COMPLEX_SEPARATOR
            .replace_all(payload, |caps: &Captures| {
                let found = &caps[0];
                if found.starts_with('(') {
                    found.to_string()
                } else {
                    format!("{},", found)
                }
            })
            .into_owned(),
        _ => payload.to_string(),
    };
    if family.is_complex() {
        text = text.replace('i', "j");
    }
    if family.is_two_dimensional() {
        text = text.replace(';', ",");
    }
    text
}

fn shape(literal: Literal, family: TypeFamily) -> Result<Value, CodecError> {
    match literal {
        Literal::Bool(b) => Ok(Value::Bool(b)),
        Literal::Str(s) => Ok(Value::Text(s)),
        Literal::Number(x) if family.is_complex() => Ok(Value::Complex(Complex::new(x, 0.0))),
        Literal::Number(x) => Ok(Value::Real(x)),
        Literal::Complex(re, im) => Ok(Value::Complex(Complex::new(re, im))),
        Literal::Seq(items) => shape_sequence(items, family),
    }
}

fn shape_sequence(items: Vec<Literal>, family: TypeFamily) -> Result<Value, CodecError> {
    if items.is_empty() {
        return Ok(match family {
            TypeFamily::Matrix => Value::Matrix(Vec::new()),
            TypeFamily::ComplexMatrix => Value::ComplexMatrix(Vec::new()),
            TypeFamily::ComplexVector | TypeFamily::Complex => Value::ComplexVector(Vec::new()),
            _ => Value::Vector(Vec::new()),
        });
    }

    if items.iter().all(|item| matches!(item, Literal::Seq(_))) {
        let rows = items
            .into_iter()
            .map(|item| match item {
                Literal::Seq(row) => Ok(row),
                _ => Err(CodecError::Malformed("mixed rows".to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let complex = family.is_complex() || rows.iter().flatten().any(is_complex_literal);
        return if complex {
            rows.into_iter()
                .map(|row| row.into_iter().map(complex_element).collect())
                .collect::<Result<Vec<_>, _>>()
                .map(Value::ComplexMatrix)
        } else {
            rows.into_iter()
                .map(|row| row.into_iter().map(real_element).collect())
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Matrix)
        };
    }

    if family.is_complex() || items.iter().any(is_complex_literal) {
        items
            .into_iter()
            .map(complex_element)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::ComplexVector)
    } else {
        items
            .into_iter()
            .map(real_element)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Vector)
    }
}

fn is_complex_literal(item: &Literal) -> bool {
    matches!(item, Literal::Complex(..))
}

fn real_element(item: Literal) -> Result<f64, CodecError> {
    match item {
        Literal::Number(x) => Ok(x),
        other => Err(CodecError::Malformed(format!(
            "expected a number, found {:?}",
            other
        ))),
    }
}

fn complex_element(item: Literal) -> Result<Complex, CodecError> {
    match item {
        Literal::Number(x) => Ok(Complex::new(x, 0.0)),
        Literal::Complex(re, im) => Ok(Complex::new(re, im)),
        other => Err(CodecError::Malformed(format!(
            "expected a complex number, found {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn c(re: f64, im: f64) -> Complex {
        Complex::new(re, im)
    }

    fn tag(s: &str) -> WireType {
        WireType::from(s)
    }

    #[test]
    fn test_string_is_verbatim() {
        // quotes would break the literal parser
        let value = decode("it's \"quoted\" [1 2]", &tag("string")).unwrap();
        assert_eq!(value, Value::Text("it's \"quoted\" [1 2]".to_string()));
    }

    #[test]
    fn test_scalars() {
        assert_eq!(decode("44100", &tag("int")).unwrap(), Value::Real(44100.0));
        assert_eq!(decode("-3.5", &tag("float")).unwrap(), Value::Real(-3.5));
        assert_eq!(decode("yes", &tag("bool")).unwrap(), Value::Bool(true));
        assert_eq!(decode("no", &tag("bool")).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_vector_and_matrix() {
        assert_eq!(
            decode("[-5 5]", &tag("vector<float>")).unwrap(),
            Value::Vector(vec![-5.0, 5.0])
        );
        assert_eq!(
            decode("[[1 2];[3 4]]", &tag("matrix<float>")).unwrap(),
            Value::Matrix(vec![vec![1.0, 2.0], vec![3.0, 4.0]])
        );
        assert_eq!(
            decode("[]", &tag("matrix<float>")).unwrap(),
            Value::Matrix(vec![])
        );
    }

    #[test]
    fn test_ragged_matrix_is_reproduced() {
        assert_eq!(
            decode("[[1 2];[3]]", &tag("matrix<float>")).unwrap(),
            Value::Matrix(vec![vec![1.0, 2.0], vec![3.0]])
        );
    }

    #[test]
    fn test_complex_scalar() {
        assert_eq!(decode("(1+2i)", &tag("complex")).unwrap(), Value::Complex(c(1.0, 2.0)));
        assert_eq!(decode("(1-2i)", &tag("complex")).unwrap(), Value::Complex(c(1.0, -2.0)));
        // the peer prints a bare real when the imaginary part is zero
        assert_eq!(decode("1.5", &tag("complex")).unwrap(), Value::Complex(c(1.5, 0.0)));
    }

    #[test]
    fn test_complex_vector_normalization() {
        assert_eq!(
            normalize("[(1+2i) 3 (4-5i)]", TypeFamily::ComplexVector),
            "[(1+2j), 3 ,(4-5j),]"
        );
        assert_eq!(
            decode("[(1+2i) 3 (4-5i)]", &tag("vcomplex")).unwrap(),
            Value::ComplexVector(vec![c(1.0, 2.0), c(3.0, 0.0), c(4.0, -5.0)])
        );
    }

    #[test]
    fn test_complex_matrix() {
        assert_eq!(
            decode("[[(1+2i) 3];[(0+1i) (2-2i)]]", &tag("mcomplex")).unwrap(),
            Value::ComplexMatrix(vec![
                vec![c(1.0, 2.0), c(3.0, 0.0)],
                vec![c(0.0, 1.0), c(2.0, -2.0)],
            ])
        );
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(
            decode("[gain identity]", &tag("vector<string>")),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            decode("[[1 2] 3]", &tag("matrix<float>")),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(decode("", &tag("float")), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_zero_real_part_round_trip() {
        let tag = tag("complex");
        for im in [2.5, -1.0, 0.0, 1e-7] {
            let value = Value::Complex(c(0.0, im));
            let wire = encode(&value, &tag).unwrap();
            assert_eq!(decode(&wire, &tag).unwrap(), value, "wire was {}", wire);
        }
    }

    fn finite() -> impl Strategy<Value = f64> + Clone {
        -1.0e6f64..1.0e6f64
    }

    fn complex() -> impl Strategy<Value = Complex> + Clone {
        (finite(), finite()).prop_map(|(re, im)| Complex::new(re, im))
    }

    fn rectangular<T: std::fmt::Debug + Clone>(
        element: impl Strategy<Value = T> + Clone,
    ) -> impl Strategy<Value = Vec<Vec<T>>> {
        (1usize..5, 0usize..5).prop_flat_map(move |(cols, rows)| {
            prop::collection::vec(prop::collection::vec(element.clone(), cols), rows)
        })
    }

    proptest! {
        #[test]
        fn prop_vector_round_trip(v in prop::collection::vec(finite(), 0..16)) {
            let tag = WireType::from("vector<float>");
            let value = Value::Vector(v);
            let wire = encode(&value, &tag).unwrap();
            prop_assert_eq!(decode(&wire, &tag).unwrap(), value);
        }

        #[test]
        fn prop_matrix_round_trip(m in rectangular(finite())) {
            let tag = WireType::from("matrix<float>");
            let value = Value::Matrix(m);
            let wire = encode(&value, &tag).unwrap();
            prop_assert_eq!(decode(&wire, &tag).unwrap(), value);
        }

        #[test]
        fn prop_complex_round_trip(z in complex(), im in finite()) {
            let tag = WireType::from("complex");
            for value in [Value::Complex(z), Value::Complex(Complex::new(0.0, im))] {
                let wire = encode(&value, &tag).unwrap();
                prop_assert_eq!(decode(&wire, &tag).unwrap(), value);
            }
        }

        #[test]
        fn prop_complex_vector_round_trip(v in prop::collection::vec(complex(), 0..8)) {
            let tag = WireType::from("vcomplex");
            let value = Value::ComplexVector(v);
            let wire = encode(&value, &tag).unwrap();
            prop_assert_eq!(decode(&wire, &tag).unwrap(), value);
        }

        #[test]
        fn prop_complex_matrix_round_trip(m in rectangular(complex())) {
            let tag = WireType::from("mcomplex");
            let value = Value::ComplexMatrix(m);
            let wire = encode(&value, &tag).unwrap();
            prop_assert_eq!(decode(&wire, &tag).unwrap(), value);
        }
    }
}
