//! A caller-supplied set of handles. The leaf of most queries.

use std::any::Any;

use crate::error::{Result, StoreError};
use crate::iterator::{
    next_uid, Description, IteratorStats, Null, Shape, ShapeType, TagMap, Tagger,
};
use crate::store::Ref;

#[derive(Debug, Default)]
pub struct Fixed {
    uid: u64,
    tagger: Tagger,
    values: Vec<Ref>,
    offset: usize,
    result: Option<Ref>,
}

impl Fixed {
    pub fn new() -> Fixed {
        Fixed {
            uid: next_uid(),
            ..Fixed::default()
        }
    }

    pub fn with_values(values: Vec<Ref>) -> Fixed {
        Fixed {
            uid: next_uid(),
            values,
            ..Fixed::default()
        }
    }

    pub fn add(&mut self, v: Ref) {
        self.values.push(v);
    }

    pub fn values(&self) -> &[Ref] {
        &self.values
    }
}

impl Shape for Fixed {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Fixed
    }

    fn next(&mut self) -> bool {
        if self.offset >= self.values.len() {
            self.result = None;
            return false;
        }
        self.result = Some(self.values[self.offset]);
        self.offset += 1;
        true
    }

    fn result(&self) -> Option<Ref> {
        self.result
    }

    fn next_path(&mut self) -> bool {
        false
    }

    fn contains(&mut self, v: &Ref) -> bool {
        if self.values.contains(v) {
            self.result = Some(*v);
            return true;
        }
        false
    }

    fn reset(&mut self) {
        self.offset = 0;
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
            size: self.values.len() as i64,
            exact_size: true,
        }
    }

    fn optimize(self: Box<Self>) -> (Box<dyn Shape>, bool) {
        if self.values.is_empty() {
            let mut null = Null::new();
            null.tagger().copy_from(&self.tagger);
            return (Box::new(null), true);
        }
        (self, false)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = Fixed::with_values(self.values.clone());
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: self
                .values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
            typ: "fixed".into(),
            tags: self.tagger.tags().to_vec(),
            size: self.values.len() as i64,
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
