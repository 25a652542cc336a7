//! A dense handle-range iterator. Backends whose allocators hand out
//! sequential keys use it as the base of their all-nodes and all-quads
//! enumerations.

use std::any::Any;

use crate::error::{Result, StoreError};
use crate::iterator::{
    next_uid, Description, IteratorStats, Shape, ShapeType, TagMap, Tagger,
};
use crate::store::Ref;

/// Enumerates every key in `[min, max]`, as node or quad handles.
#[derive(Debug)]
pub struct Int64 {
    uid: u64,
    tagger: Tagger,
    node: bool,
    min: i64,
    max: i64,
    at: i64,
    result: Option<Ref>,
}

impl Int64 {
    pub fn new(min: i64, max: i64, node: bool) -> Int64 {
        Int64 {
            uid: next_uid(),
            tagger: Tagger::default(),
            node,
            min,
            max,
            at: min,
            result: None,
        }
    }

    fn wrap(&self, key: i64) -> Ref {
        if self.node {
            Ref::node(key)
        } else {
            Ref::quad(key)
        }
    }
}

impl Shape for Int64 {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::All
    }

    fn next(&mut self) -> bool {
        if self.at > self.max {
            self.result = None;
            return false;
        }
        self.result = Some(self.wrap(self.at));
        self.at += 1;
        true
    }

    fn result(&self) -> Option<Ref> {
        self.result
    }

    fn next_path(&mut self) -> bool {
        false
    }

    fn contains(&mut self, v: &Ref) -> bool {
        if v.is_node() != self.node {
            return false;
        }
        if v.key() >= self.min && v.key() <= self.max {
            self.result = Some(*v);
            return true;
        }
        false
    }

    fn reset(&mut self) {
        self.at = self.min;
        self.result = None;
    }

    fn err(&self) -> Option<&StoreError> {
        None
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
        self.tagger.write_to(dst, self.result);
    }

    fn sub_iterators(&self) -> Vec<&dyn Shape> {
        Vec::new()
    }

    fn stats(&self) -> IteratorStats {
        IteratorStats {
            contains_cost: 1,
            next_cost: 1,
            size: (self.max - self.min + 1).max(0),
            exact_size: true,
        }
    }

    fn optimize(self: Box<Self>) -> (Box<dyn Shape>, bool) {
        (self, false)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = Int64::new(self.min, self.max, self.node);
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: format!("{}-{}", self.min, self.max),
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
