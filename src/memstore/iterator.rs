//! Posting scan: quad ids for one `(direction, value)` pair, ascending,
//! tombstones skipped.

use std::any::Any;
use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::iterator::{
    next_uid, Description, IteratorStats, Shape, ShapeType, TagMap, Tagger,
};
use crate::memstore::{MemStore, Posting};
use crate::model::Direction;
use crate::store::Ref;

pub struct PostingIterator {
    uid: u64,
    tagger: Tagger,
    store: MemStore,
    posting: Arc<Posting>,
    d: Direction,
    value: Ref,
    last: Option<i64>,
    result: Option<Ref>,
    err: Option<StoreError>,
}

impl PostingIterator {
    pub(crate) fn new(
        store: MemStore,
        posting: Arc<Posting>,
        d: Direction,
        value: Ref,
    ) -> PostingIterator {
        PostingIterator {
            uid: next_uid(),
            tagger: Tagger::default(),
            store,
            posting,
            d,
            value,
            last: None,
            result: None,
            err: None,
        }
    }
}

impl Shape for PostingIterator {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Backend("btree")
    }

    fn next(&mut self) -> bool {
        if self.store.cancelled() {
            self.err = Some(StoreError::Cancelled);
            self.result = None;
            return false;
        }
        while let Some(qid) = self.posting.next_after(self.last) {
            self.last = Some(qid);
            if self.store.check_valid(qid) {
                self.result = Some(Ref::quad(qid));
                return true;
            }
        }
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
        if v.is_node() {
            return false;
        }
        if self.posting.contains(v.key()) && self.store.check_valid(v.key()) {
            self.result = Some(*v);
            return true;
        }
        false
    }

    fn reset(&mut self) {
        self.last = None;
        self.result = None;
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
        self.tagger.write_to(dst, self.result);
    }

    fn sub_iterators(&self) -> Vec<&dyn Shape> {
        Vec::new()
    }

    fn stats(&self) -> IteratorStats {
        let len = self.posting.len() as i64;
        IteratorStats {
            contains_cost: (len.max(1) as f64).ln() as i64 + 1,
            next_cost: 1,
            size: len,
            exact_size: true,
        }
    }

    fn optimize(self: Box<Self>) -> (Box<dyn Shape>, bool) {
        (self, false)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = PostingIterator::new(
            self.store.clone(),
            self.posting.clone(),
            self.d,
            self.value,
        );
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: format!("dir:{} val:{}", self.d, self.value),
            typ: "btree".into(),
            tags: self.tagger.tags().to_vec(),
            size: self.posting.len() as i64,
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
