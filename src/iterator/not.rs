//! Complement of a child iterator against an enumeration of the whole
//! space. Only meaningful inside an intersection: something must
//! propose candidates.

use std::any::Any;
use std::collections::HashSet;

use crate::error::{Result, StoreError};
use crate::iterator::{
    next_uid, Description, IteratorStats, Shape, ShapeType, TagMap, Tagger,
};
use crate::store::Ref;

pub struct Not {
    uid: u64,
    tagger: Tagger,
    /// The negated set.
    child: Box<dyn Shape>,
    /// Enumerates the space the complement is taken against.
    all: Box<dyn Shape>,
    /// Child results, materialized at the first `next`.
    exclude: Option<HashSet<Ref>>,
    result: Option<Ref>,
    err: Option<StoreError>,
}

impl Not {
    pub fn new(child: Box<dyn Shape>, all: Box<dyn Shape>) -> Not {
        Not {
            uid: next_uid(),
            tagger: Tagger::default(),
            child,
            all,
            exclude: None,
            result: None,
            err: None,
        }
    }

    fn materialize(&mut self) -> bool {
        if self.exclude.is_some() {
            return true;
        }
        let mut set = HashSet::new();
        let mut cursor = self.child.clone_shape();
        while cursor.next() {
            if let Some(r) = cursor.result() {
                set.insert(r);
            }
        }
        if let Some(e) = cursor.err() {
            self.err = Some(e.clone());
            return false;
        }
        self.exclude = Some(set);
        true
    }
}

impl Shape for Not {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Not
    }

    fn next(&mut self) -> bool {
        if !self.materialize() {
            self.result = None;
            return false;
        }
        let exclude = self.exclude.as_ref().expect("materialized");
        while self.all.next() {
            let r = match self.all.result() {
                Some(r) => r,
                None => continue,
            };
            if !exclude.contains(&r) {
                self.result = Some(r);
                return true;
            }
        }
        self.err = self.all.err().cloned();
        self.result = None;
        false
    }

    fn result(&self) -> Option<Ref> {
        self.result
    }

    fn next_path(&mut self) -> bool {
        false
    }

    fn contains(&mut self, v: &Ref) -> bool {
        let ok = self.child.contains(v);
        let e = self.child.err().cloned();
        if e.is_some() {
            self.err = e;
            return false;
        }
        if ok {
            return false;
        }
        self.result = Some(*v);
        true
    }

    fn reset(&mut self) {
        self.child.reset();
        self.all.reset();
        self.exclude = None;
        self.result = None;
        self.err = None;
    }

    fn err(&self) -> Option<&StoreError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        self.exclude = None;
        let child = self.child.close();
        let all = self.all.close();
        child.and(all)
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
        vec![self.child.as_ref(), self.all.as_ref()]
    }

    fn stats(&self) -> IteratorStats {
        let child = self.child.stats();
        let all = self.all.stats();
        IteratorStats {
            contains_cost: child.contains_cost,
            next_cost: all.next_cost + child.next_cost,
            size: (all.size - child.size).max(0),
            exact_size: false,
        }
    }

    fn optimize(mut self: Box<Self>) -> (Box<dyn Shape>, bool) {
        let (child, c1) = std::mem::replace(&mut self.child, crate::iterator::Null::boxed())
            .optimize();
        let (all, c2) = std::mem::replace(&mut self.all, crate::iterator::Null::boxed())
            .optimize();
        self.child = child;
        self.all = all;
        (self, c1 || c2)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = Not::new(self.child.clone_shape(), self.all.clone_shape());
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: String::new(),
            typ: "not".into(),
            tags: self.tagger.tags().to_vec(),
            size: self.stats().size,
            sub: vec![self.child.describe(), self.all.describe()],
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterator::{iterate_all, Fixed, Int64};

    #[test]
    fn filters_the_enumeration() {
        let child = Box::new(Fixed::with_values(vec![Ref::node(2), Ref::node(4)]));
        let all = Box::new(Int64::new(1, 5, true));
        let mut not = Not::new(child, all);
        assert_eq!(
            iterate_all(&mut not),
            vec![Ref::node(1), Ref::node(3), Ref::node(5)]
        );
    }

    #[test]
    fn contains_negates_the_child() {
        let child = Box::new(Fixed::with_values(vec![Ref::node(2)]));
        let all = Box::new(Int64::new(1, 5, true));
        let mut not = Not::new(child, all);
        assert!(!not.contains(&Ref::node(2)));
        assert!(not.contains(&Ref::node(3)));
        assert_eq!(not.result(), Some(Ref::node(3)));
    }

    #[test]
    fn reset_rebuilds_the_materialized_set() {
        let child = Box::new(Fixed::with_values(vec![Ref::node(1)]));
        let all = Box::new(Int64::new(1, 2, true));
        let mut not = Not::new(child, all);
        assert_eq!(iterate_all(&mut not), vec![Ref::node(2)]);
        not.reset();
        assert_eq!(iterate_all(&mut not), vec![Ref::node(2)]);
    }
}
