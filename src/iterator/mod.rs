//! The iterator algebra: lazy cursors over value and quad handles.
//!
//! Every traversal lowers to a tree of these iterators. The protocol is
//! an explicit state machine: `next` advances the cursor and reports
//! whether a result is available, `contains` probes membership without
//! a scan, `next_path` enumerates alternative tag bindings for the same
//! top-level result, and `err` distinguishes exhaustion from failure
//! after either returns false.
//!
//! Composite iterators own their children; concurrency comes from
//! `clone_shape`, which produces an independent cursor over the same
//! backend.

mod all;
mod and;
mod comparison;
mod fixed;
mod hasa;
mod linksto;
mod not;
mod null;
mod or;
mod optional;
mod regex;
mod save;

pub use all::Int64;
pub use and::And;
pub use comparison::{Comparison, Operator};
pub use fixed::Fixed;
pub use hasa::HasA;
pub use linksto::LinksTo;
pub use not::Not;
pub use null::{ErrorShape, Null};
pub use optional::Optional;
pub use or::Or;
pub use self::regex::Regex;
pub use save::Save;

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::error::{Result, StoreError};
use crate::store::Ref;

/// Accumulated tag bindings for one result.
pub type TagMap = HashMap<String, Ref>;

/// Component statistics driving optimizer decisions. Costs are
/// unit-less relative weights, not wall-clock estimates.
#[derive(Debug, Clone, Copy, Default)]
pub struct IteratorStats {
    pub contains_cost: i64,
    pub next_cost: i64,
    pub size: i64,
    pub exact_size: bool,
}

/// Discriminates iterator variants for rewrites and explain output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    All,
    Null,
    Error,
    Fixed,
    And,
    Or,
    Not,
    HasA,
    LinksTo,
    Save,
    Optional,
    Comparison,
    Regex,
    /// A backend-native iterator substituted by `optimize_iterator`.
    Backend(&'static str),
}

impl ShapeType {
    pub fn name(self) -> &'static str {
        match self {
            ShapeType::All => "all",
            ShapeType::Null => "null",
            ShapeType::Error => "error",
            ShapeType::Fixed => "fixed",
            ShapeType::And => "and",
            ShapeType::Or => "or",
            ShapeType::Not => "not",
            ShapeType::HasA => "hasa",
            ShapeType::LinksTo => "linksto",
            ShapeType::Save => "save",
            ShapeType::Optional => "optional",
            ShapeType::Comparison => "comparison",
            ShapeType::Regex => "regex",
            ShapeType::Backend(name) => name,
        }
    }
}

/// Tree-shaped explain output.
#[derive(Debug, Clone, Default)]
pub struct Description {
    pub uid: u64,
    pub name: String,
    pub typ: String,
    pub tags: Vec<String>,
    pub size: i64,
    pub sub: Vec<Description>,
}

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Allocates a process-unique iterator identity.
pub fn next_uid() -> u64 {
    NEXT_UID.fetch_add(1, Ordering::Relaxed)
}

/// Tag bookkeeping attached to every iterator: plain tags bind to the
/// iterator's current result, fixed tags to a pinned handle.
#[derive(Debug, Clone, Default)]
pub struct Tagger {
    tags: SmallVec<[String; 2]>,
    fixed: SmallVec<[(String, Ref); 2]>,
}

impl Tagger {
    pub fn add(&mut self, tag: impl Into<String>) {
        self.tags.push(tag.into());
    }

    pub fn add_fixed(&mut self, tag: impl Into<String>, value: Ref) {
        self.fixed.push((tag.into(), value));
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn fixed(&self) -> &[(String, Ref)] {
        &self.fixed
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.fixed.is_empty()
    }

    /// Copies every tag of `other`, preserving its fixed bindings. Used
    /// when one iterator is substituted for another so bindings survive
    /// the swap.
    pub fn copy_from(&mut self, other: &Tagger) {
        self.tags.extend(other.tags.iter().cloned());
        self.fixed.extend(other.fixed.iter().cloned());
    }

    /// Writes this tagger's bindings for `result` into `dst`.
    pub fn write_to(&self, dst: &mut TagMap, result: Option<Ref>) {
        if let Some(r) = result {
            for tag in &self.tags {
                dst.insert(tag.clone(), r);
            }
        }
        for (tag, value) in &self.fixed {
            dst.insert(tag.clone(), *value);
        }
    }
}

/// The iterator protocol.
pub trait Shape: Any {
    /// Process-unique identity, for explain output and bookkeeping.
    fn uid(&self) -> u64;

    /// The variant, for rewrites and display.
    fn shape_type(&self) -> ShapeType;

    /// Advances the cursor. `true` means [`result`](Shape::result) now
    /// holds the next element; `false` means exhaustion or failure —
    /// check [`err`](Shape::err) to tell them apart.
    fn next(&mut self) -> bool;

    /// The current element, valid after `next` returned true.
    fn result(&self) -> Option<Ref>;

    /// Advances to the next alternative tag binding for the current
    /// result, without changing the result itself.
    fn next_path(&mut self) -> bool;

    /// Membership probe. Never advances the `next` cursor, but records
    /// the probed element as the current result on success.
    fn contains(&mut self, v: &Ref) -> bool;

    /// Rewinds to the initial state, keeping tags.
    fn reset(&mut self);

    /// The failure that made `next`/`contains` return false, if any.
    fn err(&self) -> Option<&StoreError>;

    /// Releases resources. Further calls may fail but must not panic.
    fn close(&mut self) -> Result<()>;

    /// This iterator's tag bookkeeping.
    fn tagger(&mut self) -> &mut Tagger;

    /// Read-only view of the tag bookkeeping.
    fn tagger_ref(&self) -> &Tagger;

    /// Writes the bindings of this iterator and its children for the
    /// current result into `dst`.
    fn tag_results(&self, dst: &mut TagMap);

    /// Child iterators, for tree inspection.
    fn sub_iterators(&self) -> Vec<&dyn Shape>;

    fn stats(&self) -> IteratorStats;

    /// Estimated result count and whether it is exact.
    fn size(&self) -> (i64, bool) {
        let stats = self.stats();
        (stats.size, stats.exact_size)
    }

    /// Rule-driven self-rewrite; children first, backend last. Returns
    /// the replacement and whether anything changed. The replacement
    /// yields the same multiset for `next` and the same membership for
    /// `contains`, with tags carried forward.
    fn optimize(self: Box<Self>) -> (Box<dyn Shape>, bool);

    /// Independent cursor over the same backend: fresh position, same
    /// tags and structure.
    fn clone_shape(&self) -> Box<dyn Shape>;

    fn describe(&self) -> Description;

    /// Whether results come out in ascending handle order. Intersections
    /// switch to a merge strategy when every child advertises this.
    fn sorted(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Optimizes every iterator in a list, reporting whether any changed.
pub(crate) fn optimize_all(its: Vec<Box<dyn Shape>>) -> (Vec<Box<dyn Shape>>, bool) {
    let mut changed = false;
    let out = its
        .into_iter()
        .map(|it| {
            let (it, c) = it.optimize();
            changed |= c;
            it
        })
        .collect();
    (out, changed)
}

/// Drains an iterator, collecting results. Test and debugging helper;
/// callers must check `err` afterwards for truncated streams.
pub fn iterate_all(it: &mut dyn Shape) -> Vec<Ref> {
    let mut out = Vec::new();
    while it.next() {
        if let Some(r) = it.result() {
            out.push(r);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uids_are_unique() {
        let a = next_uid();
        let b = next_uid();
        assert_ne!(a, b);
    }

    #[test]
    fn tagger_writes_bindings() {
        let mut tagger = Tagger::default();
        tagger.add("start");
        tagger.add_fixed("pinned", Ref::node(9));
        let mut dst = TagMap::new();
        tagger.write_to(&mut dst, Some(Ref::node(4)));
        assert_eq!(dst["start"], Ref::node(4));
        assert_eq!(dst["pinned"], Ref::node(9));
    }

    #[test]
    fn tagger_copy_preserves_fixed() {
        let mut src = Tagger::default();
        src.add("a");
        src.add_fixed("f", Ref::node(1));
        let mut dst = Tagger::default();
        dst.copy_from(&src);
        assert_eq!(dst.tags(), ["a".to_owned()]);
        assert_eq!(dst.fixed(), [("f".to_owned(), Ref::node(1))]);
    }
}
