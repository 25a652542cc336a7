//! Value-predicate filter: keeps child results whose materialized value
//! compares against a reference value under an operator.

use std::any::Any;
use std::cmp::Ordering;

use crate::error::{Result, StoreError};
use crate::iterator::{
    next_uid, And, Description, HasA, IteratorStats, LinksTo, Null, Shape, ShapeType, TagMap,
    Tagger,
};
use crate::model::Value;
use crate::store::{QuadStore, Ref, StoreHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    LT,
    LTE,
    GT,
    GTE,
}

impl Operator {
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            Operator::LT => ord == Ordering::Less,
            Operator::LTE => ord != Ordering::Greater,
            Operator::GT => ord == Ordering::Greater,
            Operator::GTE => ord != Ordering::Less,
        }
    }
}

pub struct Comparison {
    uid: u64,
    tagger: Tagger,
    qs: StoreHandle,
    child: Box<dyn Shape>,
    op: Operator,
    value: Value,
    result: Option<Ref>,
    err: Option<StoreError>,
}

impl Comparison {
    pub fn new(qs: StoreHandle, child: Box<dyn Shape>, op: Operator, value: Value) -> Comparison {
        Comparison {
            uid: next_uid(),
            tagger: Tagger::default(),
            qs,
            child,
            op,
            value,
            result: None,
            err: None,
        }
    }

    // Values of incomparable kinds never pass the filter.
    fn accepts_ref(&self, r: &Ref) -> bool {
        let name = match self.qs.name_of(r) {
            Some(name) => name,
            None => return false,
        };
        match name.partial_cmp_value(&self.value) {
            Some(ord) => self.op.accepts(ord),
            None => false,
        }
    }
}

impl Shape for Comparison {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Comparison
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
            // Each step materializes a value for the predicate.
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
        // Filtering a projection is the same as constraining the
        // projected direction of the quads before projecting: the
        // filter sinks below the projection where the backend can index
        // it.
        if self.child.shape_type() == ShapeType::HasA {
            let hasa = std::mem::replace(&mut self.child, Null::boxed())
                .into_any()
                .downcast::<HasA>()
                .expect("hasa shape downcasts to HasA");
            let (hasa_sub, dir, hasa_tagger) = hasa.into_parts();
            let qs = self.qs.clone();
            let filter = Comparison::new(
                qs.clone(),
                qs.nodes_all_iterator(),
                self.op,
                self.value.clone(),
            );
            let links = LinksTo::new(qs.clone(), Box::new(filter), dir);
            let mut and = And::with_store(qs.clone());
            and.add_sub_iterator(hasa_sub);
            and.add_sub_iterator(Box::new(links));
            let mut out = HasA::new(qs, Box::new(and), dir);
            out.tagger().copy_from(&hasa_tagger);
            out.tagger().copy_from(&self.tagger);
            let (out, _) = (Box::new(out) as Box<dyn Shape>).optimize();
            return (out, true);
        }
        (self, changed)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = Comparison::new(
            self.qs.clone(),
            self.child.clone_shape(),
            self.op,
            self.value.clone(),
        );
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: format!("{:?} {}", self.op, self.value),
            typ: "comparison".into(),
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
