//! The empty iterator and the error leaf.

use std::any::Any;

use crate::error::{Result, StoreError};
use crate::iterator::{
    next_uid, Description, IteratorStats, Shape, ShapeType, TagMap, Tagger,
};
use crate::store::Ref;

/// Yields nothing and contains nothing. The terminal of every rewrite
/// that proves a subtree empty.
#[derive(Debug, Default)]
pub struct Null {
    uid: u64,
    tagger: Tagger,
}

impl Null {
    pub fn new() -> Null {
        Null {
            uid: next_uid(),
            tagger: Tagger::default(),
        }
    }

    pub fn boxed() -> Box<dyn Shape> {
        Box::new(Null::new())
    }
}

impl Shape for Null {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Null
    }

    fn next(&mut self) -> bool {
        false
    }

    fn result(&self) -> Option<Ref> {
        None
    }

    fn next_path(&mut self) -> bool {
        false
    }

    fn contains(&mut self, _v: &Ref) -> bool {
        false
    }

    fn reset(&mut self) {}

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

    fn tag_results(&self, _dst: &mut TagMap) {}

    fn sub_iterators(&self) -> Vec<&dyn Shape> {
        Vec::new()
    }

    fn stats(&self) -> IteratorStats {
        IteratorStats {
            exact_size: true,
            ..IteratorStats::default()
        }
    }

    fn optimize(self: Box<Self>) -> (Box<dyn Shape>, bool) {
        (self, false)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = Null::new();
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: String::new(),
            typ: "null".into(),
            tags: self.tagger.tags().to_vec(),
            size: 0,
            sub: Vec::new(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A leaf that reports a backend failure through the iterator protocol.
/// Built when constructing an iterator already failed; traversal code
/// then only has one error path to check.
#[derive(Debug)]
pub struct ErrorShape {
    uid: u64,
    tagger: Tagger,
    err: StoreError,
}

impl ErrorShape {
    pub fn new(err: StoreError) -> ErrorShape {
        ErrorShape {
            uid: next_uid(),
            tagger: Tagger::default(),
            err,
        }
    }
}

impl Shape for ErrorShape {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Error
    }

    fn next(&mut self) -> bool {
        false
    }

    fn result(&self) -> Option<Ref> {
        None
    }

    fn next_path(&mut self) -> bool {
        false
    }

    fn contains(&mut self, _v: &Ref) -> bool {
        false
    }

    fn reset(&mut self) {}

    fn err(&self) -> Option<&StoreError> {
        Some(&self.err)
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

    fn tag_results(&self, _dst: &mut TagMap) {}

    fn sub_iterators(&self) -> Vec<&dyn Shape> {
        Vec::new()
    }

    fn stats(&self) -> IteratorStats {
        IteratorStats {
            exact_size: true,
            ..IteratorStats::default()
        }
    }

    fn optimize(self: Box<Self>) -> (Box<dyn Shape>, bool) {
        (self, false)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        Box::new(ErrorShape {
            uid: next_uid(),
            tagger: self.tagger.clone(),
            err: self.err.clone(),
        })
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: format!("error: {}", self.err),
            typ: "error".into(),
            tags: Vec::new(),
            size: 0,
            sub: Vec::new(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
