//! Tags every result of a child under caller-chosen names.

use std::any::Any;

use crate::error::{Result, StoreError};
use crate::iterator::{
    next_uid, Description, IteratorStats, Shape, ShapeType, TagMap, Tagger,
};
use crate::store::Ref;

pub struct Save {
    uid: u64,
    tagger: Tagger,
    child: Box<dyn Shape>,
}

impl Save {
    pub fn new(child: Box<dyn Shape>, tag: impl Into<String>) -> Save {
        let mut tagger = Tagger::default();
        tagger.add(tag);
        Save {
            uid: next_uid(),
            tagger,
            child,
        }
    }
}

impl Shape for Save {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Save
    }

    fn next(&mut self) -> bool {
        self.child.next()
    }

    fn result(&self) -> Option<Ref> {
        self.child.result()
    }

    fn next_path(&mut self) -> bool {
        self.child.next_path()
    }

    fn contains(&mut self, v: &Ref) -> bool {
        self.child.contains(v)
    }

    fn reset(&mut self) {
        self.child.reset();
    }

    fn err(&self) -> Option<&StoreError> {
        self.child.err()
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
        self.tagger.write_to(dst, self.child.result());
        self.child.tag_results(dst);
    }

    fn sub_iterators(&self) -> Vec<&dyn Shape> {
        vec![self.child.as_ref()]
    }

    fn stats(&self) -> IteratorStats {
        self.child.stats()
    }

    fn optimize(mut self: Box<Self>) -> (Box<dyn Shape>, bool) {
        let (mut child, _) =
            std::mem::replace(&mut self.child, crate::iterator::Null::boxed()).optimize();
        // The wrapper is sugar: fold the tags into the child and step
        // aside.
        child.tagger().copy_from(&self.tagger);
        (child, true)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = Save {
            uid: next_uid(),
            tagger: Tagger::default(),
            child: self.child.clone_shape(),
        };
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: String::new(),
            typ: "save".into(),
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
