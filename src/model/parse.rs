//! N-Quads term parser, the inverse of a value's canonical form.

use chrono::{DateTime, Utc};

use crate::error::{Result, StoreError};
use crate::model::value::{Value, IRI_BOOL, IRI_FLOAT, IRI_INT, IRI_TIME};

/// Policy knobs for [`parse_with`].
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Convert typed strings carrying one of the four basic datatypes
    /// (integer, float, boolean, datetime) into their native variant.
    /// A malformed payload keeps the typed string unchanged.
    pub auto_convert_typed_string: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            auto_convert_typed_string: true,
        }
    }
}

/// Parses a single term with the default options.
pub fn parse(s: &str) -> Result<Value> {
    parse_with(s, ParseOptions::default())
}

/// Parses a single term in canonical syntax.
pub fn parse_with(s: &str, opts: ParseOptions) -> Result<Value> {
    let v = parse_term(s)?;
    if !opts.auto_convert_typed_string {
        return Ok(v);
    }
    match v {
        Value::TypedString { value, typ } => Ok(convert_typed(&value, &typ)
            .unwrap_or(Value::TypedString { value, typ })),
        other => Ok(other),
    }
}

fn parse_term(s: &str) -> Result<Value> {
    if let Some(rest) = s.strip_prefix('<') {
        let iri = rest
            .strip_suffix('>')
            .ok_or_else(|| StoreError::InvalidSyntax(s.to_owned()))?;
        return Ok(Value::Iri(iri.to_owned()));
    }
    if let Some(label) = s.strip_prefix("_:") {
        if label.is_empty() {
            return Err(StoreError::InvalidSyntax(s.to_owned()));
        }
        return Ok(Value::BNode(label.to_owned()));
    }
    if s.starts_with('"') {
        let (value, rest) = parse_quoted(s)?;
        if rest.is_empty() {
            return Ok(Value::String(value));
        }
        if let Some(lang) = rest.strip_prefix('@') {
            if lang.is_empty() {
                return Err(StoreError::InvalidSyntax(s.to_owned()));
            }
            return Ok(Value::LangString {
                value,
                lang: lang.to_owned(),
            });
        }
        if let Some(typ) = rest.strip_prefix("^^") {
            let typ = typ
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .ok_or_else(|| StoreError::InvalidSyntax(s.to_owned()))?;
            return Ok(Value::TypedString {
                value,
                typ: typ.to_owned(),
            });
        }
        return Err(StoreError::InvalidSyntax(s.to_owned()));
    }
    Err(StoreError::InvalidSyntax(s.to_owned()))
}

/// Converts a typed-string payload into its native variant. Errors on
/// an unrecognized datatype and on a recognized datatype with a
/// malformed payload; [`parse_with`] keeps the typed string unchanged
/// in either case.
pub fn convert_typed(value: &str, typ: &str) -> Result<Value> {
    match typ {
        IRI_INT => value
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| StoreError::BadTypedValue(value.to_owned())),
        IRI_FLOAT => value
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| StoreError::BadTypedValue(value.to_owned())),
        IRI_BOOL => match value {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            _ => Err(StoreError::BadTypedValue(value.to_owned())),
        },
        IRI_TIME => DateTime::parse_from_rfc3339(value)
            .map(|t| Value::Time(t.with_timezone(&Utc)))
            .map_err(|_| StoreError::BadTypedValue(value.to_owned())),
        _ => Err(StoreError::BadTypedValue(typ.to_owned())),
    }
}

// Reads a quoted literal from the head of `s`, returning the unescaped
// content and the remaining suffix (language tag or datatype, if any).
fn parse_quoted(s: &str) -> Result<(String, &str)> {
    let mut out = String::new();
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, '"')) => {}
        _ => return Err(StoreError::InvalidSyntax(s.to_owned())),
    }
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &s[i + 1..])),
            '\\' => {
                let (_, esc) = chars
                    .next()
                    .ok_or_else(|| StoreError::InvalidSyntax(s.to_owned()))?;
                match esc {
                    't' => out.push('\t'),
                    'b' => out.push('\u{8}'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    'f' => out.push('\u{c}'),
                    '"' => out.push('"'),
                    '\'' => out.push('\''),
                    '\\' => out.push('\\'),
                    'u' => out.push(read_codepoint(&mut chars, 4, s)?),
                    'U' => out.push(read_codepoint(&mut chars, 8, s)?),
                    _ => return Err(StoreError::InvalidSyntax(s.to_owned())),
                }
            }
            c => out.push(c),
        }
    }
    Err(StoreError::InvalidSyntax(s.to_owned()))
}

fn read_codepoint(
    chars: &mut std::str::CharIndices<'_>,
    len: usize,
    term: &str,
) -> Result<char> {
    let mut code: u32 = 0;
    for _ in 0..len {
        let (_, c) = chars
            .next()
            .ok_or_else(|| StoreError::InvalidSyntax(term.to_owned()))?;
        let digit = c
            .to_digit(16)
            .ok_or_else(|| StoreError::InvalidSyntax(term.to_owned()))?;
        code = code << 4 | digit;
    }
    char::from_u32(code).ok_or_else(|| StoreError::InvalidSyntax(term.to_owned()))
}
