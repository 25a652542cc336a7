//! The inverse of projection: for every value the child yields, emit
//! every quad whose given direction holds that value.
//!
//! Evaluated as a nested loop: one posting scan per child value,
//! chained in child order.

use std::any::Any;

use crate::error::{Result, StoreError};
use crate::iterator::{
    next_uid, Description, IteratorStats, Null, Shape, ShapeType, TagMap, Tagger,
};
use crate::model::Direction;
use crate::store::{QuadStore, Ref, StoreHandle};

// Rough posting-fanout guess used for costing when nothing better is
// known.
const FANOUT_FACTOR: i64 = 20;

pub struct LinksTo {
    uid: u64,
    tagger: Tagger,
    qs: StoreHandle,
    /// Iterator over value handles.
    primary: Box<dyn Shape>,
    dir: Direction,
    /// Posting scan for the child value currently being expanded.
    next_it: Option<Box<dyn Shape>>,
    result: Option<Ref>,
    err: Option<StoreError>,
}

impl LinksTo {
    pub fn new(qs: StoreHandle, primary: Box<dyn Shape>, dir: Direction) -> LinksTo {
        LinksTo {
            uid: next_uid(),
            tagger: Tagger::default(),
            qs,
            primary,
            dir,
            next_it: None,
            result: None,
            err: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.dir
    }

    /// The child iterator, for backend rewrites that pattern-match the
    /// subtree.
    pub fn sub(&self) -> &dyn Shape {
        self.primary.as_ref()
    }
}

impl Shape for LinksTo {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::LinksTo
    }

    fn next(&mut self) -> bool {
        loop {
            if let Some(it) = self.next_it.as_mut() {
                if it.next() {
                    self.result = it.result();
                    return true;
                }
                if let Some(e) = it.err() {
                    self.err = Some(e.clone());
                    self.result = None;
                    return false;
                }
            }
            if !self.primary.next() {
                self.err = self.primary.err().cloned();
                self.result = None;
                return false;
            }
            let value = match self.primary.result() {
                Some(v) => v,
                None => continue,
            };
            self.next_it = Some(self.qs.quad_iterator(self.dir, &value));
        }
    }

    fn result(&self) -> Option<Ref> {
        self.result
    }

    fn next_path(&mut self) -> bool {
        let ok = self.primary.next_path();
        if !ok {
            self.err = self.primary.err().cloned();
        }
        ok
    }

    fn contains(&mut self, v: &Ref) -> bool {
        let node = match self.qs.quad_direction(v, self.dir) {
            Some(node) => node,
            None => return false,
        };
        if self.primary.contains(&node) {
            self.result = Some(*v);
            return true;
        }
        self.err = self.primary.err().cloned();
        false
    }

    fn reset(&mut self) {
        self.primary.reset();
        self.next_it = None;
        self.result = None;
        self.err = None;
    }

    fn err(&self) -> Option<&StoreError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        self.next_it = None;
        self.primary.close()
    }

    fn tagger(&mut self) -> &mut Tagger {
        &mut self.tagger
    }

    fn tagger_ref(&self) -> &Tagger {
        &self.tagger
    }

    fn tag_results(&self, dst: &mut TagMap) {
        self.tagger.write_to(dst, self.result);
        self.primary.tag_results(dst);
    }

    fn sub_iterators(&self) -> Vec<&dyn Shape> {
        vec![self.primary.as_ref()]
    }

    fn stats(&self) -> IteratorStats {
        let primary = self.primary.stats();
        IteratorStats {
            contains_cost: primary.contains_cost + 1,
            next_cost: primary.next_cost + 1,
            size: primary.size.saturating_mul(FANOUT_FACTOR),
            exact_size: false,
        }
    }

    fn optimize(mut self: Box<Self>) -> (Box<dyn Shape>, bool) {
        let (primary, changed) =
            std::mem::replace(&mut self.primary, Null::boxed()).optimize();
        self.primary = primary;
        if self.primary.shape_type() == ShapeType::Null {
            let mut null = Null::new();
            null.tagger().copy_from(&self.tagger);
            return (Box::new(null), true);
        }
        // The backend gets the last word: a single-value child folds
        // into a native posting scan.
        let qs = self.qs.clone();
        if let Some(native) = qs.optimize_iterator(self.as_ref()) {
            return (native, true);
        }
        (self, changed)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = LinksTo::new(self.qs.clone(), self.primary.clone_shape(), self.dir);
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: self.dir.to_string(),
            typ: "linksto".into(),
            tags: self.tagger.tags().to_vec(),
            size: self.stats().size,
            sub: vec![self.primary.describe()],
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
