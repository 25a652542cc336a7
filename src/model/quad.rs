//! Quads and the directional addressing of their components.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::value::Value;

/// Positional role of a value within a quad. Also names the four
/// posting indexes every backend maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Subject,
    Predicate,
    Object,
    Label,
}

impl Direction {
    /// All directions, in index order.
    pub const ALL: [Direction; 4] = [
        Direction::Subject,
        Direction::Predicate,
        Direction::Object,
        Direction::Label,
    ];

    /// Stable index used to address per-direction structures.
    pub fn index(self) -> usize {
        match self {
            Direction::Subject => 0,
            Direction::Predicate => 1,
            Direction::Object => 2,
            Direction::Label => 3,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Subject => "subject",
            Direction::Predicate => "predicate",
            Direction::Object => "object",
            Direction::Label => "label",
        })
    }
}

/// A four-part statement. Subject, predicate and object are always
/// present; the label is absent for the default graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad {
    #[serde(rename = "s")]
    pub subject: Value,
    #[serde(rename = "p")]
    pub predicate: Value,
    #[serde(rename = "o")]
    pub object: Value,
    #[serde(rename = "l", skip_serializing_if = "Option::is_none", default)]
    pub label: Option<Value>,
}

impl Quad {
    pub fn new(subject: Value, predicate: Value, object: Value, label: Option<Value>) -> Quad {
        Quad {
            subject,
            predicate,
            object,
            label,
        }
    }

    /// Convenience constructor from raw terms; an empty label means the
    /// default graph.
    pub fn make(
        subject: impl Into<Value>,
        predicate: impl Into<Value>,
        object: impl Into<Value>,
        label: &str,
    ) -> Quad {
        Quad {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            label: if label.is_empty() {
                None
            } else {
                Some(Value::from(label))
            },
        }
    }

    /// The value in the given direction; `None` only for an absent
    /// label.
    pub fn get(&self, d: Direction) -> Option<&Value> {
        match d {
            Direction::Subject => Some(&self.subject),
            Direction::Predicate => Some(&self.predicate),
            Direction::Object => Some(&self.object),
            Direction::Label => self.label.as_ref(),
        }
    }

}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(label) = &self.label {
            write!(f, " {label}")?;
        }
        f.write_str(" .")
    }
}

// Deterministic ordering over the canonical form, for stable test
// output and sorted fixtures.
impl PartialOrd for Quad {
    fn partial_cmp(&self, other: &Quad) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quad {
    fn cmp(&self, other: &Quad) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}
