//! Regular-expression filter over string values.
//!
//! By default only string literals are inspected; IRIs and blank nodes
//! opt in, since matching on references is usually a modeling mistake.

use std::any::Any;

use regex::Regex as Re;

use crate::error::{Result, StoreError};
use crate::iterator::{
    next_uid, Description, IteratorStats, Null, Shape, ShapeType, TagMap, Tagger,
};
use crate::model::Value;
use crate::store::{QuadStore, Ref, StoreHandle};

pub struct Regex {
    uid: u64,
    tagger: Tagger,
    qs: StoreHandle,
    child: Box<dyn Shape>,
    re: Re,
    refs: bool,
    result: Option<Ref>,
    err: Option<StoreError>,
}

impl Regex {
    pub fn new(qs: StoreHandle, child: Box<dyn Shape>, re: Re) -> Regex {
        Regex {
            uid: next_uid(),
            tagger: Tagger::default(),
            qs,
            child,
            re,
            refs: false,
            result: None,
            err: None,
        }
    }

    /// Also match IRI and blank-node names.
    pub fn with_refs(mut self) -> Regex {
        self.refs = true;
        self
    }

    fn accepts_ref(&self, r: &Ref) -> bool {
        let name = match self.qs.name_of(r) {
            Some(name) => name,
            None => return false,
        };
        if let Some(text) = name.literal_text() {
            return self.re.is_match(text);
        }
        if self.refs {
            if let Value::Iri(iri) = &name {
                return self.re.is_match(iri);
            }
            if let Value::BNode(label) = &name {
                return self.re.is_match(label);
            }
        }
        false
    }
}

impl Shape for Regex {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Regex
    }

    fn next(&mut self) -> bool {
        while self.child.next() {
            let r = match self.child.result() {
                Some(r) => r,
                None => continue,
            };
            if self.accepts_ref(&r) {
                self.result = Some(r);
                return true;
            }
        }
        self.err = self.child.err().cloned();
        self.result = None;
        false
    }

    fn result(&self) -> Option<Ref> {
        self.result
    }

    fn next_path(&mut self) -> bool {
        let ok = self.child.next_path();
        if !ok {
            self.err = self.child.err().cloned();
        }
        ok
    }

    fn contains(&mut self, v: &Ref) -> bool {
        if !self.accepts_ref(v) {
            return false;
        }
        if self.child.contains(v) {
            self.result = Some(*v);
            return true;
        }
        self.err = self.child.err().cloned();
        false
    }

    fn reset(&mut self) {
        self.child.reset();
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
        self.tagger.write_to(dst, self.result);
        self.child.tag_results(dst);
    }

    fn sub_iterators(&self) -> Vec<&dyn Shape> {
        vec![self.child.as_ref()]
    }

    fn stats(&self) -> IteratorStats {
        let child = self.child.stats();
        IteratorStats {
            contains_cost: child.contains_cost + 1,
            next_cost: child.next_cost + 1,
            size: child.size / 2,
            exact_size: false,
        }
    }

    fn optimize(mut self: Box<Self>) -> (Box<dyn Shape>, bool) {
        let (child, changed) =
            std::mem::replace(&mut self.child, Null::boxed()).optimize();
        self.child = child;
        if self.child.shape_type() == ShapeType::Null {
            let mut null = Null::new();
            null.tagger().copy_from(&self.tagger);
            return (Box::new(null), true);
        }
        (self, changed)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = Regex::new(self.qs.clone(), self.child.clone_shape(), self.re.clone());
        out.refs = self.refs;
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: self.re.as_str().to_owned(),
            typ: "regex".into(),
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
