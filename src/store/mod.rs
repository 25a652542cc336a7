//! The backend contract: opaque value handles, the `QuadStore` trait
//! every backend satisfies, and the pieces shared between backends.

pub mod delta;
pub mod options;
pub mod registry;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::iterator::Shape;
use crate::model::{Direction, Quad, Value};

pub use delta::{Delta, IgnoreOpts, Procedure, Transaction};
pub use options::Options;
pub use registry::{init, open, register, Registration};

/// Opaque handle to an interned value or a stored quad.
///
/// Handles are backend-chosen tokens: two handles compare equal exactly
/// when they denote the same value (or the same quad). The node bit
/// keeps the two id spaces apart for backends that share one allocator
/// between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ref {
    node: bool,
    key: i64,
}

impl Ref {
    /// Handle for an interned value.
    pub fn node(key: i64) -> Ref {
        Ref { node: true, key }
    }

    /// Handle for a stored quad.
    pub fn quad(key: i64) -> Ref {
        Ref { node: false, key }
    }

    /// Whether the handle denotes a value rather than a quad.
    pub fn is_node(&self) -> bool {
        self.node
    }

    /// The backend key. Only the owning backend may interpret it.
    pub fn key(&self) -> i64 {
        self.key
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.node {
            write!(f, "n{}", self.key)
        } else {
            write!(f, "q{}", self.key)
        }
    }
}

/// Primary key of the mutation log. The only kind in use is a
/// sequential counter; the enum keeps the wire shape open for backends
/// with other key schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrimaryKey {
    Sequential { value: u64 },
}

impl PrimaryKey {
    pub fn sequential(value: u64) -> PrimaryKey {
        PrimaryKey::Sequential { value }
    }

    pub fn value(&self) -> u64 {
        match self {
            PrimaryKey::Sequential { value } => *value,
        }
    }

    /// Advances the key and returns the newly claimed id.
    pub fn next(&mut self) -> u64 {
        match self {
            PrimaryKey::Sequential { value } => {
                *value += 1;
                *value
            }
        }
    }
}

/// The contract every storage backend implements.
///
/// Backends hand out [`Ref`] handles for interned values and stored
/// quads, serve per-direction posting iterators over them, and apply
/// delta batches transactionally. Read-side methods must be callable
/// from any number of threads; the writer discipline is one in-flight
/// [`apply_deltas`](QuadStore::apply_deltas) at a time.
pub trait QuadStore: Send + Sync {
    /// Applies a batch of deltas transactionally. Prechecks the whole
    /// batch against the duplicate/missing policies before mutating
    /// anything; a failed precheck leaves the store untouched.
    fn apply_deltas(&self, deltas: &[Delta], opts: IgnoreOpts) -> Result<()>;

    /// Materializes a quad previously surfaced by an iterator.
    fn quad(&self, r: &Ref) -> Option<Quad>;

    /// The handle for an interned value, or `None` if the value has
    /// never been mentioned.
    fn value_of(&self, v: &Value) -> Option<Ref>;

    /// Reverse lookup of [`value_of`](QuadStore::value_of).
    fn name_of(&self, r: &Ref) -> Option<Value>;

    /// Iterator over the posting `(d, r)`: every stored quad whose `d`
    /// component is the value `r`, in quad-id order.
    fn quad_iterator(&self, d: Direction, r: &Ref) -> Box<dyn Shape>;

    /// Iterator over every interned value.
    fn nodes_all_iterator(&self) -> Box<dyn Shape>;

    /// Iterator over every live quad.
    fn quads_all_iterator(&self) -> Box<dyn Shape>;

    /// Projects a quad handle through a direction without
    /// materializing the quad for the caller.
    fn quad_direction(&self, r: &Ref, d: Direction) -> Option<Ref>;

    /// Number of live quads.
    fn size(&self) -> i64;

    /// Largest mutation id ever applied.
    fn horizon(&self) -> PrimaryKey;

    /// The backend's chance to swap a generic iterator subtree for a
    /// native one. A returned iterator must yield the same multiset of
    /// results and the same membership function as the input.
    fn optimize_iterator(&self, it: &dyn Shape) -> Option<Box<dyn Shape>>;

    /// Releases backend resources. Iterators created earlier may fail
    /// afterwards but must not misbehave.
    fn close(&self) -> Result<()>;
}

/// Optional backend extension reporting how many live postings a value
/// participates in. Consumers treat the number as an optimizer hint.
pub trait ValueSizer {
    fn size_of(&self, r: &Ref) -> i64;
}

/// Shared handle to a backend.
pub type StoreHandle = Arc<dyn QuadStore>;
