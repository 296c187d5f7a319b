//! Restricted literal-structure parser.
//!
//! After the textual rewrite rules in [`super::decode`] a wire payload looks
//! like a nested literal (`[[1, 2],[3, 4]]`, `[(1+2j), (3-4j),]`). This parser
//! accepts exactly numbers, quoted strings, booleans, lists, tuples and
//! complex literals. It never evaluates anything.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

use super::CodecError;

#[derive(PestParser)]
#[grammar = "codec/literal.pest"]
struct LiteralParser;

/// A parsed literal, before it is shaped into a [`crate::Value`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal {
    Bool(bool),
    Number(f64),
    Complex(f64, f64),
    Str(String),
    /// Lists and tuples alike.
    Seq(Vec<Literal>),
}

/// Parse normalized payload text into a [`Literal`].
pub(crate) fn parse_literal(text: &str) -> Result<Literal, CodecError> {
    let mut pairs = LiteralParser::parse(Rule::literal, text)
        .map_err(|e| CodecError::Malformed(format!("not a literal: {}", e)))?;
    let literal = pairs
        .next()
        .ok_or_else(|| CodecError::Malformed("empty parse".to_string()))?;
    let item = literal
        .into_inner()
        .find(|p| p.as_rule() != Rule::EOI)
        .ok_or_else(|| CodecError::Malformed("empty literal".to_string()))?;
    build(item)
}

fn build(pair: Pair<Rule>) -> Result<Literal, CodecError> {
    match pair.as_rule() {
        Rule::real => parse_f64(pair.as_str()).map(Literal::Number),
        Rule::imaginary => {
            let text = pair.as_str();
            parse_f64(&text[..text.len() - 1]).map(|im| Literal::Complex(0.0, im))
        }
        Rule::complex => {
            let mut inner = pair.into_inner();
            let re = inner
                .next()
                .ok_or_else(|| CodecError::Malformed("complex: missing real part".to_string()))?;
            let im = inner.next().ok_or_else(|| {
                CodecError::Malformed("complex: missing imaginary part".to_string())
            })?;
            let re = parse_f64(re.as_str())?;
            Ok(Literal::Complex(re, parse_imag_part(im.as_str())?))
        }
        Rule::boolean => Ok(Literal::Bool(matches!(pair.as_str(), "True" | "yes"))),
        Rule::string => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| CodecError::Malformed("string: missing body".to_string()))?;
            Ok(Literal::Str(unescape(inner.as_str())))
        }
        Rule::list | Rule::tuple => pair
            .into_inner()
            .map(build)
            .collect::<Result<Vec<_>, _>>()
            .map(Literal::Seq),
        rule => Err(CodecError::Malformed(format!("unexpected token {:?}", rule))),
    }
}

fn parse_f64(text: &str) -> Result<f64, CodecError> {
    text.parse::<f64>()
        .map_err(|e| CodecError::Malformed(format!("invalid number '{}': {}", text, e)))
}

/// `+2j`, `-2j` and the doubled-sign forms `+-2j` / `-+2j`.
fn parse_imag_part(text: &str) -> Result<f64, CodecError> {
    let body = &text[..text.len() - 1];
    let (outer, rest) = body.split_at(1);
    let magnitude = parse_f64(rest)?;
    Ok(if outer == "-" { -magnitude } else { magnitude })
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(items: Vec<Literal>) -> Literal {
        Literal::Seq(items)
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_literal("128").unwrap(), Literal::Number(128.0));
        assert_eq!(parse_literal("-0.5").unwrap(), Literal::Number(-0.5));
        assert_eq!(parse_literal("1e-05").unwrap(), Literal::Number(1e-5));
        assert_eq!(parse_literal("  .25 ").unwrap(), Literal::Number(0.25));
    }

    #[test]
    fn test_parse_complex_forms() {
        assert_eq!(parse_literal("(1+2j)").unwrap(), Literal::Complex(1.0, 2.0));
        assert_eq!(parse_literal("(-1.5-2j)").unwrap(), Literal::Complex(-1.5, -2.0));
        assert_eq!(parse_literal("(0+-3j)").unwrap(), Literal::Complex(0.0, -3.0));
        assert_eq!(parse_literal("4j").unwrap(), Literal::Complex(0.0, 4.0));
        assert_eq!(parse_literal("(1e-05+2j)").unwrap(), Literal::Complex(1e-5, 2.0));
    }

    #[test]
    fn test_parse_nested_lists_with_trailing_commas() {
        let parsed = parse_literal("[[(1+2j), (3+4j),],[5, 6]]").unwrap();
        assert_eq!(
            parsed,
            seq(vec![
                seq(vec![Literal::Complex(1.0, 2.0), Literal::Complex(3.0, 4.0)]),
                seq(vec![Literal::Number(5.0), Literal::Number(6.0)]),
            ])
        );
        assert_eq!(parse_literal("[]").unwrap(), seq(vec![]));
    }

    #[test]
    fn test_parse_tuples_and_scalars() {
        assert_eq!(
            parse_literal("(1, 'a')").unwrap(),
            seq(vec![Literal::Number(1.0), Literal::Str("a".to_string())])
        );
        assert_eq!(parse_literal("True").unwrap(), Literal::Bool(true));
        assert_eq!(parse_literal("no").unwrap(), Literal::Bool(false));
        assert_eq!(
            parse_literal(r#""say \"hi\"""#).unwrap(),
            Literal::Str("say \"hi\"".to_string())
        );
    }

    #[test]
    fn test_rejects_expressions_and_names() {
        assert!(parse_literal("1 + 2").is_err());
        assert!(parse_literal("__import__('os')").is_err());
        assert!(parse_literal("[gain identity]").is_err());
        assert!(parse_literal("").is_err());
        assert!(parse_literal("[1, 2").is_err());
    }
}
