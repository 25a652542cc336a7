//! Whole-store enumerations over the dense key ranges, filtered down to
//! what is actually live.

use std::any::Any;

use crate::error::{Result, StoreError};
use crate::iterator::{
    next_uid, Description, Int64, IteratorStats, Shape, ShapeType, TagMap, Tagger,
};
use crate::memstore::MemStore;
use crate::store::{QuadStore, Ref};

/// Every interned value.
pub struct NodesAllIterator {
    uid: u64,
    tagger: Tagger,
    store: MemStore,
    base: Int64,
    err: Option<StoreError>,
}

impl NodesAllIterator {
    pub(crate) fn new(store: MemStore) -> NodesAllIterator {
        let base = Int64::new(1, store.node_horizon(), true);
        NodesAllIterator {
            uid: next_uid(),
            tagger: Tagger::default(),
            store,
            base,
            err: None,
        }
    }
}

impl Shape for NodesAllIterator {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::All
    }

    fn next(&mut self) -> bool {
        if self.store.cancelled() {
            self.err = Some(StoreError::Cancelled);
            return false;
        }
        while self.base.next() {
            let r = match self.base.result() {
                Some(r) => r,
                None => continue,
            };
            if self.store.is_interned(r.key()) {
                return true;
            }
        }
        false
    }

    fn result(&self) -> Option<Ref> {
        self.base.result()
    }

    fn next_path(&mut self) -> bool {
        false
    }

    fn contains(&mut self, v: &Ref) -> bool {
        v.is_node() && self.store.is_interned(v.key()) && self.base.contains(v)
    }

    fn reset(&mut self) {
        self.base.reset();
        self.err = None;
    }

    fn err(&self) -> Option<&StoreError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn tagger(&mut self) -> &mut Tagger {
        &mut self.tagger
    }

    fn tagger_ref(&self) -> &Tagger {
        &self.tagger
    }

    fn tag_results(&self, dst: &mut TagMap) {
        self.tagger.write_to(dst, self.result());
    }

    fn sub_iterators(&self) -> Vec<&dyn Shape> {
        Vec::new()
    }

    fn stats(&self) -> IteratorStats {
        IteratorStats {
            contains_cost: 1,
            next_cost: 1,
            size: self.store.node_horizon(),
            exact_size: true,
        }
    }

    fn optimize(self: Box<Self>) -> (Box<dyn Shape>, bool) {
        (self, false)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = NodesAllIterator::new(self.store.clone());
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: "nodes".into(),
            typ: "all".into(),
            tags: self.tagger.tags().to_vec(),
            size: self.stats().size,
            sub: Vec::new(),
        }
    }

    fn sorted(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Every live quad, in insertion order.
pub struct QuadsAllIterator {
    uid: u64,
    tagger: Tagger,
    store: MemStore,
    base: Int64,
    err: Option<StoreError>,
}

impl QuadsAllIterator {
    pub(crate) fn new(store: MemStore) -> QuadsAllIterator {
        let base = Int64::new(1, store.quad_horizon(), false);
        QuadsAllIterator {
            uid: next_uid(),
            tagger: Tagger::default(),
            store,
            base,
            err: None,
        }
    }
}

impl Shape for QuadsAllIterator {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::All
    }

    fn next(&mut self) -> bool {
        if self.store.cancelled() {
            self.err = Some(StoreError::Cancelled);
            return false;
        }
        while self.base.next() {
            let r = match self.base.result() {
                Some(r) => r,
                None => continue,
            };
            // Tombstones and the tombstoning deltas themselves stay
            // invisible.
            if self.store.check_valid(r.key()) {
                return true;
            }
        }
        false
    }

    fn result(&self) -> Option<Ref> {
        self.base.result()
    }

    fn next_path(&mut self) -> bool {
        false
    }

    fn contains(&mut self, v: &Ref) -> bool {
        !v.is_node() && self.store.check_valid(v.key()) && self.base.contains(v)
    }

    fn reset(&mut self) {
        self.base.reset();
        self.err = None;
    }

    fn err(&self) -> Option<&StoreError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn tagger(&mut self) -> &mut Tagger {
        &mut self.tagger
    }

    fn tagger_ref(&self) -> &Tagger {
        &self.tagger
    }

    fn tag_results(&self, dst: &mut TagMap) {
        self.tagger.write_to(dst, self.result());
    }

    fn sub_iterators(&self) -> Vec<&dyn Shape> {
        Vec::new()
    }

    fn stats(&self) -> IteratorStats {
        IteratorStats {
            contains_cost: 1,
            next_cost: 1,
            size: self.store.size(),
            exact_size: true,
        }
    }

    fn optimize(self: Box<Self>) -> (Box<dyn Shape>, bool) {
        (self, false)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = QuadsAllIterator::new(self.store.clone());
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: "quads".into(),
            typ: "all".into(),
            tags: self.tagger.tags().to_vec(),
            size: self.stats().size,
            sub: Vec::new(),
        }
    }

    fn sorted(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
