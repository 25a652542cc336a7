//! Union of child iterators, streamed in declared order.

use std::any::Any;
use std::collections::HashSet;

use crate::error::{Result, StoreError};
use crate::iterator::{
    next_uid, optimize_all, Description, IteratorStats, Null, Shape, ShapeType, TagMap, Tagger,
};
use crate::store::Ref;

#[derive(Default)]
pub struct Or {
    uid: u64,
    tagger: Tagger,
    sub: Vec<Box<dyn Shape>>,
    current: usize,
    /// Child that produced the current result, for tag and path
    /// delegation; `contains` hits move it without touching the
    /// streaming cursor.
    active: usize,
    unique: bool,
    seen: HashSet<Ref>,
    result: Option<Ref>,
    err: Option<StoreError>,
}

impl Or {
    pub fn new() -> Or {
        Or {
            uid: next_uid(),
            ..Or::default()
        }
    }

    /// A deduplicating union: results already yielded by an earlier
    /// child are suppressed, at the cost of a materialized seen-set.
    pub fn new_unique() -> Or {
        Or {
            uid: next_uid(),
            unique: true,
            ..Or::default()
        }
    }

    pub fn add_sub_iterator(&mut self, it: Box<dyn Shape>) {
        self.sub.push(it);
    }
}

impl Shape for Or {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Or
    }

    fn next(&mut self) -> bool {
        while self.current < self.sub.len() {
            let it = &mut self.sub[self.current];
            while it.next() {
                let r = match it.result() {
                    Some(r) => r,
                    None => continue,
                };
                if self.unique && !self.seen.insert(r) {
                    continue;
                }
                self.active = self.current;
                self.result = Some(r);
                return true;
            }
            if let Some(e) = it.err() {
                self.err = Some(e.clone());
                self.result = None;
                return false;
            }
            self.current += 1;
        }
        self.result = None;
        false
    }

    fn result(&self) -> Option<Ref> {
        self.result
    }

    fn next_path(&mut self) -> bool {
        match self.sub.get_mut(self.active) {
            Some(it) => {
                if it.next_path() {
                    return true;
                }
                self.err = it.err().cloned();
                false
            }
            None => false,
        }
    }

    fn contains(&mut self, v: &Ref) -> bool {
        for (i, it) in self.sub.iter_mut().enumerate() {
            if it.contains(v) {
                self.active = i;
                self.result = Some(*v);
                return true;
            }
            if let Some(e) = it.err() {
                self.err = Some(e.clone());
                return false;
            }
        }
        false
    }

    fn reset(&mut self) {
        for it in &mut self.sub {
            it.reset();
        }
        self.current = 0;
        self.active = 0;
        self.seen.clear();
        self.result = None;
        self.err = None;
    }

    fn err(&self) -> Option<&StoreError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        let mut out = Ok(());
        for it in &mut self.sub {
            if let Err(e) = it.close() {
                out = Err(e);
            }
        }
        self.seen.clear();
        out
    }

    fn tagger(&mut self) -> &mut Tagger {
        &mut self.tagger
    }

    fn tagger_ref(&self) -> &Tagger {
        &self.tagger
    }

    fn tag_results(&self, dst: &mut TagMap) {
        self.tagger.write_to(dst, self.result);
        if let Some(it) = self.sub.get(self.active) {
            it.tag_results(dst);
        }
    }

    fn sub_iterators(&self) -> Vec<&dyn Shape> {
        self.sub.iter().map(|it| it.as_ref()).collect()
    }

    fn stats(&self) -> IteratorStats {
        let mut contains_cost = 0;
        let mut next_cost = 0;
        let mut size = 0;
        let mut exact = true;
        for it in &self.sub {
            let stats = it.stats();
            contains_cost += stats.contains_cost;
            next_cost += stats.next_cost;
            size += stats.size;
            exact &= stats.exact_size;
        }
        // With dedup the sum is only an upper bound.
        IteratorStats {
            contains_cost,
            next_cost,
            size,
            exact_size: exact && !self.unique,
        }
    }

    fn optimize(mut self: Box<Self>) -> (Box<dyn Shape>, bool) {
        let children = std::mem::take(&mut self.sub);
        let (children, mut changed) = optimize_all(children);

        let mut flat: Vec<Box<dyn Shape>> = Vec::new();
        for child in children {
            if child.shape_type() == ShapeType::Null {
                changed = true;
                continue;
            }
            // Associativity, for unions with matching dedup policy.
            if child.shape_type() == ShapeType::Or && child.tagger_ref().is_empty() {
                let inner = child
                    .into_any()
                    .downcast::<Or>()
                    .expect("or shape downcasts to Or");
                if inner.unique == self.unique {
                    flat.extend(inner.sub);
                    changed = true;
                    continue;
                }
                flat.push(inner);
            } else {
                flat.push(child);
            }
        }

        if flat.is_empty() {
            let mut null = Null::new();
            null.tagger().copy_from(&self.tagger);
            return (Box::new(null), true);
        }
        if flat.len() == 1 && self.tagger.is_empty() && !self.unique {
            return (flat.pop().expect("one child"), true);
        }
        self.sub = flat;
        (self, changed)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = Or {
            uid: next_uid(),
            tagger: Tagger::default(),
            sub: self.sub.iter().map(|it| it.clone_shape()).collect(),
            current: 0,
            active: 0,
            unique: self.unique,
            seen: HashSet::new(),
            result: None,
            err: None,
        };
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: String::new(),
            typ: if self.unique { "or(unique)" } else { "or" }.into(),
            tags: self.tagger.tags().to_vec(),
            size: self.stats().size,
            sub: self.sub.iter().map(|it| it.describe()).collect(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
