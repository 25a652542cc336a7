//! Projection of quads onto one direction: for every quad the child
//! yields, emit the value sitting in that direction.
//!
//! Duplicates are preserved; wrap in a unique union when set semantics
//! are wanted. The reverse probe keeps a posting cursor so `next_path`
//! can surface the other quads that project to the same value.

use std::any::Any;

use crate::error::{Result, StoreError};
use crate::iterator::{
    next_uid, Description, IteratorStats, Null, Shape, ShapeType, TagMap, Tagger,
};
use crate::model::Direction;
use crate::store::{QuadStore, Ref, StoreHandle};

pub struct HasA {
    uid: u64,
    tagger: Tagger,
    qs: StoreHandle,
    /// Iterator over quad handles.
    primary: Box<dyn Shape>,
    dir: Direction,
    /// Candidate quads for the value currently being probed.
    result_it: Option<Box<dyn Shape>>,
    result: Option<Ref>,
    err: Option<StoreError>,
}

impl HasA {
    pub fn new(qs: StoreHandle, primary: Box<dyn Shape>, dir: Direction) -> HasA {
        HasA {
            uid: next_uid(),
            tagger: Tagger::default(),
            qs,
            primary,
            dir,
            result_it: None,
            result: None,
            err: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.dir
    }

    // Deconstruction hook for rewrites that rebuild the projection.
    pub(crate) fn into_parts(self) -> (Box<dyn Shape>, Direction, Tagger) {
        (self.primary, self.dir, self.tagger)
    }

    // Walks the candidate quads of the probed value until one is
    // accepted by the child. Leaves the cursor parked there so the
    // search can resume for alternate bindings.
    fn next_contains(&mut self) -> bool {
        let it = match self.result_it.as_mut() {
            Some(it) => it,
            None => return false,
        };
        while it.next() {
            let link = match it.result() {
                Some(link) => link,
                None => continue,
            };
            if self.primary.contains(&link) {
                self.result = self.qs.quad_direction(&link, self.dir);
                return true;
            }
            if let Some(e) = self.primary.err() {
                self.err = Some(e.clone());
                return false;
            }
        }
        self.err = it.err().cloned();
        false
    }
}

impl Shape for HasA {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::HasA
    }

    fn next(&mut self) -> bool {
        self.result_it = None;
        if !self.primary.next() {
            self.err = self.primary.err().cloned();
            self.result = None;
            return false;
        }
        let quad = match self.primary.result() {
            Some(q) => q,
            None => {
                self.result = None;
                return false;
            }
        };
        self.result = self.qs.quad_direction(&quad, self.dir);
        true
    }

    fn result(&self) -> Option<Ref> {
        self.result
    }

    fn next_path(&mut self) -> bool {
        if self.primary.next_path() {
            return true;
        }
        let e = self.primary.err().cloned();
        if e.is_some() {
            self.err = e;
            return false;
        }
        self.next_contains()
    }

    fn contains(&mut self, v: &Ref) -> bool {
        self.result_it = Some(self.qs.quad_iterator(self.dir, v));
        if self.next_contains() {
            self.result = Some(*v);
            return true;
        }
        false
    }

    fn reset(&mut self) {
        self.primary.reset();
        self.result_it = None;
        self.result = None;
        self.err = None;
    }

    fn err(&self) -> Option<&StoreError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        self.result_it = None;
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
            contains_cost: primary.contains_cost * 2,
            next_cost: primary.next_cost + 1,
            size: primary.size,
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
        let qs = self.qs.clone();
        if let Some(native) = qs.optimize_iterator(self.as_ref()) {
            return (native, true);
        }
        (self, changed)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = HasA::new(self.qs.clone(), self.primary.clone_shape(), self.dir);
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: self.dir.to_string(),
            typ: "hasa".into(),
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
