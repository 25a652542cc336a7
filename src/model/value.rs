//! Typed term values and their content-hashed identity.
//!
//! Every value has a canonical textual form in N-Quads term syntax. The
//! canonical form is what `Display` renders, what the term parser
//! inverts, and what the 20-byte SHA-1 identity digests. Backends intern
//! values keyed on this form, so two values are the same entity exactly
//! when their canonical forms match.

use std::cmp::Ordering;
use std::fmt;
use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};

pub(crate) const NS_SCHEMA: &str = "http://schema.org/";
pub(crate) const IRI_INT: &str = "http://schema.org/Integer";
pub(crate) const IRI_FLOAT: &str = "http://schema.org/Float";
pub(crate) const IRI_BOOL: &str = "http://schema.org/Boolean";
pub(crate) const IRI_TIME: &str = "http://schema.org/DateTime";

/// Size of the value identity digest.
pub const HASH_SIZE: usize = 20;

/// Content hash of a value's canonical form.
pub type ValueHash = [u8; HASH_SIZE];

/// A term that can appear in a quad position.
#[derive(Debug, Clone)]
pub enum Value {
    /// An IRI reference (`<name>`).
    Iri(String),
    /// A blank node (`_:name`).
    BNode(String),
    /// A plain string literal (`"name"`).
    String(String),
    /// A language-tagged string (`"name"@en`).
    LangString { value: String, lang: String },
    /// A literal with an explicit datatype (`"name"^^<type>`).
    TypedString { value: String, typ: String },
    /// Native wrapper for 64-bit integers.
    Int(i64),
    /// Native wrapper for 64-bit floats.
    Float(f64),
    /// Native wrapper for booleans.
    Bool(bool),
    /// Native wrapper for instants. The canonical form truncates to
    /// second precision, and so does equality; backends are free to
    /// store finer precision but may not rely on it surviving a
    /// round trip.
    Time(DateTime<Utc>),
    /// An already-serialized term, kept verbatim. Escape hatch for
    /// legacy data whose terms never went through the parser.
    Raw(String),
}

impl Value {
    /// Computes the SHA-1 identity digest of the canonical form.
    pub fn hash(&self) -> ValueHash {
        let mut out = [0u8; HASH_SIZE];
        self.hash_to(&mut out);
        out
    }

    /// Computes the identity digest into a caller-provided buffer.
    pub fn hash_to(&self, out: &mut ValueHash) {
        let mut hasher = Sha1::new();
        hasher.update(self.to_string().as_bytes());
        out.copy_from_slice(&hasher.finalize());
    }

    /// Three-way comparison between values of compatible native kinds.
    ///
    /// Ints and floats compare after promotion; strings compare
    /// lexically; times compare as instants. Incompatible kinds return
    /// `None`.
    pub fn partial_cmp_value(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (Value::Time(a), Value::Time(b)) => a.timestamp().partial_cmp(&b.timestamp()),
            _ => None,
        }
    }

    /// Whether the value is a string-like literal whose text the regex
    /// filter inspects by default.
    pub(crate) fn literal_text(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::LangString { value, .. } => Some(value),
            Value::TypedString { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Iri(a), Value::Iri(b)) => a == b,
            (Value::BNode(a), Value::BNode(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (
                Value::LangString { value: av, lang: al },
                Value::LangString { value: bv, lang: bl },
            ) => av == bv && al == bl,
            (
                Value::TypedString { value: av, typ: at },
                Value::TypedString { value: bv, typ: bt },
            ) => av == bv && at == bt,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            // Instant equality at second precision: serialization loses
            // sub-second precision on some backends.
            (Value::Time(a), Value::Time(b)) => a.timestamp() == b.timestamp(),
            (Value::Raw(a), Value::Raw(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Iri(iri) => write!(f, "<{iri}>"),
            Value::BNode(label) => write!(f, "_:{label}"),
            Value::String(s) => write_quoted(f, s),
            Value::LangString { value, lang } => {
                write_quoted(f, value)?;
                write!(f, "@{lang}")
            }
            Value::TypedString { value, typ } => {
                write_quoted(f, value)?;
                write!(f, "^^<{typ}>")
            }
            Value::Int(n) => write!(f, "\"{n}\"^^<{IRI_INT}>"),
            Value::Float(x) => write!(f, "\"{x:E}\"^^<{IRI_FLOAT}>"),
            Value::Bool(true) => write!(f, "\"True\"^^<{IRI_BOOL}>"),
            Value::Bool(false) => write!(f, "\"False\"^^<{IRI_BOOL}>"),
            Value::Time(t) => write!(
                f,
                "\"{}\"^^<{IRI_TIME}>",
                t.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            Value::Raw(s) => f.write_str(s),
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04X}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_str("\"")
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Raw(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Raw(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Value {
        Value::Time(t)
    }
}

// On the wire a value is its canonical form. Terms that fail to parse
// on the way back in are preserved verbatim as Raw, so foreign data
// survives a round trip unmodified.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Value, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(super::parse::parse(&s).unwrap_or(Value::Raw(s)))
    }
}

impl Eq for Value {}

// Hash over the canonical form, consistent with PartialEq for every
// variant that is structurally compared; Time hashes its second-level
// timestamp to stay consistent with its tolerant equality.
impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Value::Time(t) => t.timestamp().hash(state),
            // Negative zero equals zero; keep the hashes equal too.
            Value::Float(x) => {
                let x = if *x == 0.0 { 0.0 } else { *x };
                x.to_bits().hash(state)
            }
            other => other.to_string().hash(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parse::parse;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn canonical_forms() {
        assert_eq!(Value::Iri("name".into()).to_string(), "<name>");
        assert_eq!(Value::BNode("b1".into()).to_string(), "_:b1");
        assert_eq!(Value::String("name".into()).to_string(), "\"name\"");
        assert_eq!(
            Value::LangString {
                value: "name".into(),
                lang: "en".into()
            }
            .to_string(),
            "\"name\"@en"
        );
        assert_eq!(
            Value::TypedString {
                value: "name".into(),
                typ: "t".into()
            }
            .to_string(),
            "\"name\"^^<t>"
        );
        assert_eq!(
            Value::Int(42).to_string(),
            "\"42\"^^<http://schema.org/Integer>"
        );
        assert_eq!(
            Value::Bool(true).to_string(),
            "\"True\"^^<http://schema.org/Boolean>"
        );
        assert_eq!(Value::Raw("A".into()).to_string(), "A");
    }

    #[test]
    fn quoting_escapes_specials() {
        let v = Value::String("a\"b\\c\nd\u{1}".into());
        assert_eq!(v.to_string(), "\"a\\\"b\\\\c\\nd\\u0001\"");
    }

    #[test]
    fn time_truncates_to_seconds() {
        let t = Utc.with_ymd_and_hms(2014, 7, 1, 12, 30, 45).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let v = Value::Time(t);
        assert_eq!(
            v.to_string(),
            "\"2014-07-01T12:30:45Z\"^^<http://schema.org/DateTime>"
        );
        let trimmed = Value::Time(Utc.with_ymd_and_hms(2014, 7, 1, 12, 30, 45).unwrap());
        assert_eq!(v, trimmed);
        assert_eq!(v.hash(), trimmed.hash());
    }

    #[test]
    fn hash_matches_canonical_equality() {
        let a = Value::String("cool".into());
        let b = parse("\"cool\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), Value::String("cooler".into()).hash());
    }

    #[test]
    fn mixed_numeric_comparison_promotes() {
        use std::cmp::Ordering;
        assert_eq!(
            Value::Int(2).partial_cmp_value(&Value::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::String("a".into()).partial_cmp_value(&Value::Int(1)),
            None
        );
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        // TypedStrings deliberately avoid the auto-converted datatypes;
        // those parse back as native values by design.
        prop_oneof![
            "[a-zA-Z0-9:/#._-]{1,40}".prop_map(Value::Iri),
            "[a-zA-Z0-9]{1,20}".prop_map(Value::BNode),
            any::<String>().prop_map(Value::String),
            (any::<String>(), "[a-z]{2,5}")
                .prop_map(|(value, lang)| Value::LangString { value, lang }),
            (any::<String>(), "[a-z]{3,12}")
                .prop_map(|(value, typ)| Value::TypedString { value, typ }),
            any::<i64>().prop_map(Value::Int),
            any::<bool>().prop_map(Value::Bool),
            (0i64..4_000_000_000).prop_map(|secs| {
                Value::Time(Utc.timestamp_opt(secs, 0).unwrap())
            }),
        ]
    }

    proptest! {
        #[test]
        fn round_trips_through_canonical_form(v in arb_value()) {
            let parsed = parse(&v.to_string()).unwrap();
            prop_assert_eq!(&parsed, &v);
            prop_assert_eq!(parsed.hash(), v.hash());
        }
    }
}
