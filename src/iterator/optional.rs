//! A child whose match is not required. Always answers yes to a probe,
//! remembering whether the child actually matched so tags only fire on
//! real matches. Contains-driven: it has no stream of its own.

use std::any::Any;

use crate::error::{Result, StoreError};
use crate::iterator::{
    next_uid, Description, IteratorStats, Shape, ShapeType, TagMap, Tagger,
};
use crate::store::Ref;

pub struct Optional {
    uid: u64,
    tagger: Tagger,
    child: Box<dyn Shape>,
    last_check: bool,
    result: Option<Ref>,
    err: Option<StoreError>,
}

impl Optional {
    pub fn new(child: Box<dyn Shape>) -> Optional {
        Optional {
            uid: next_uid(),
            tagger: Tagger::default(),
            child,
            last_check: false,
            result: None,
            err: None,
        }
    }
}

impl Shape for Optional {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Optional
    }

    fn next(&mut self) -> bool {
        self.err = Some(StoreError::Unsupported(
            "optional iterators only answer probes",
        ));
        false
    }

    fn result(&self) -> Option<Ref> {
        self.result
    }

    fn next_path(&mut self) -> bool {
        if self.last_check {
            return self.child.next_path();
        }
        false
    }

    fn contains(&mut self, v: &Ref) -> bool {
        let matched = self.child.contains(v);
        let e = self.child.err().cloned();
        if e.is_some() {
            self.err = e;
            return false;
        }
        self.last_check = matched;
        self.result = if matched { Some(*v) } else { None };
        true
    }

    fn reset(&mut self) {
        self.child.reset();
        self.last_check = false;
        self.result = None;
        self.err = None;
    }

    fn err(&self) -> Option<&StoreError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()
    }

    fn tagger(&mut self) -> &mut Tagger {
        &mut self.tagger
    }

    fn tagger_ref(&self) -> &Tagger {
        &self.tagger
    }

    fn tag_results(&self, dst: &mut TagMap) {
        if self.last_check {
            self.tagger.write_to(dst, self.result);
            self.child.tag_results(dst);
        }
    }

    fn sub_iterators(&self) -> Vec<&dyn Shape> {
        vec![self.child.as_ref()]
    }

    fn stats(&self) -> IteratorStats {
        let child = self.child.stats();
        IteratorStats {
            contains_cost: child.contains_cost,
            next_cost: child.next_cost,
            size: child.size,
            // Never exact: an optional match constrains nothing.
            exact_size: false,
        }
    }

    fn optimize(mut self: Box<Self>) -> (Box<dyn Shape>, bool) {
        let (child, changed) =
            std::mem::replace(&mut self.child, crate::iterator::Null::boxed()).optimize();
        self.child = child;
        (self, changed)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = Optional::new(self.child.clone_shape());
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: String::new(),
            typ: "optional".into(),
            tags: self.tagger.tags().to_vec(),
            size: self.stats().size,
            sub: vec![self.child.describe()],
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
