//! Intersection of child iterators.
//!
//! The default strategy drives the primary child with `next` and probes
//! every other child with `contains`. When all children advertise
//! sorted output, `optimize` switches to a merge join that advances the
//! laggard child until the cursors align.

use std::any::Any;

use tracing::debug;

use crate::error::{Result, StoreError};
use crate::iterator::{
    next_uid, optimize_all, Description, IteratorStats, Null, Shape, ShapeType, TagMap, Tagger,
};
use crate::store::{QuadStore, Ref, StoreHandle};

#[derive(Default)]
pub struct And {
    uid: u64,
    tagger: Tagger,
    qs: Option<StoreHandle>,
    primary: Option<Box<dyn Shape>>,
    internal: Vec<Box<dyn Shape>>,
    result: Option<Ref>,
    err: Option<StoreError>,
    merge: bool,
    /// Stream positions for the merge join, primary first. Kept here
    /// because a `contains` probe may clobber a child's result slot
    /// without moving its cursor. Empty until the first `next`.
    merge_pos: Vec<Ref>,
}

impl And {
    pub fn new() -> And {
        And {
            uid: next_uid(),
            ..And::default()
        }
    }

    /// An intersection that offers itself to the backend for native
    /// substitution during `optimize`.
    pub fn with_store(qs: StoreHandle) -> And {
        And {
            uid: next_uid(),
            qs: Some(qs),
            ..And::default()
        }
    }

    /// Adds a child. The first child added drives iteration until
    /// `optimize` picks its own primary.
    pub fn add_sub_iterator(&mut self, it: Box<dyn Shape>) {
        if self.primary.is_none() {
            self.primary = Some(it);
        } else {
            self.internal.push(it);
        }
    }
}

// `next` strategies over split borrows, so the cursor fields and the
// error slot can move independently.

fn probe_next(
    primary: &mut Box<dyn Shape>,
    internal: &mut [Box<dyn Shape>],
    err: &mut Option<StoreError>,
) -> Option<Ref> {
    'candidates: loop {
        if !primary.next() {
            *err = primary.err().cloned();
            return None;
        }
        let candidate = match primary.result() {
            Some(r) => r,
            None => continue,
        };
        for it in internal.iter_mut() {
            if !it.contains(&candidate) {
                if let Some(e) = it.err() {
                    *err = Some(e.clone());
                    return None;
                }
                continue 'candidates;
            }
        }
        return Some(candidate);
    }
}

fn merge_next(
    primary: &mut Box<dyn Shape>,
    internal: &mut [Box<dyn Shape>],
    pos: &mut Vec<Ref>,
    err: &mut Option<StoreError>,
) -> Option<Ref> {
    if !primary.next() {
        *err = primary.err().cloned();
        return None;
    }
    let ppos = primary.result()?;
    if pos.is_empty() {
        pos.push(ppos);
        for it in internal.iter_mut() {
            if !it.next() {
                *err = it.err().cloned();
                return None;
            }
            let r = it.result()?;
            pos.push(r);
        }
    } else {
        pos[0] = ppos;
    }
    let mut target = *pos.iter().max()?;
    loop {
        let mut aligned = true;
        while pos[0] < target {
            if !primary.next() {
                *err = primary.err().cloned();
                return None;
            }
            pos[0] = primary.result()?;
        }
        if pos[0] > target {
            target = pos[0];
            aligned = false;
        }
        for (i, it) in internal.iter_mut().enumerate() {
            while pos[i + 1] < target {
                if !it.next() {
                    *err = it.err().cloned();
                    return None;
                }
                pos[i + 1] = it.result()?;
            }
            if pos[i + 1] > target {
                target = pos[i + 1];
                aligned = false;
            }
        }
        if aligned {
            return Some(target);
        }
    }
}

impl Shape for And {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::And
    }

    fn next(&mut self) -> bool {
        let primary = match self.primary.as_mut() {
            Some(p) => p,
            None => return false,
        };
        self.result = if self.merge {
            merge_next(primary, &mut self.internal, &mut self.merge_pos, &mut self.err)
        } else {
            probe_next(primary, &mut self.internal, &mut self.err)
        };
        self.result.is_some()
    }

    fn result(&self) -> Option<Ref> {
        self.result
    }

    fn next_path(&mut self) -> bool {
        if let Some(primary) = self.primary.as_mut() {
            if primary.next_path() {
                return true;
            }
            let e = primary.err().cloned();
            if e.is_some() {
                self.err = e;
                return false;
            }
        }
        for it in &mut self.internal {
            if it.next_path() {
                return true;
            }
            let e = it.err().cloned();
            if e.is_some() {
                self.err = e;
                return false;
            }
        }
        false
    }

    fn contains(&mut self, v: &Ref) -> bool {
        if let Some(primary) = self.primary.as_mut() {
            let ok = primary.contains(v);
            let e = primary.err().cloned();
            if !ok {
                self.err = e;
                return false;
            }
        } else {
            return false;
        }
        for it in &mut self.internal {
            if !it.contains(v) {
                self.err = it.err().cloned();
                return false;
            }
        }
        self.result = Some(*v);
        true
    }

    fn reset(&mut self) {
        if let Some(primary) = self.primary.as_mut() {
            primary.reset();
        }
        for it in &mut self.internal {
            it.reset();
        }
        self.merge_pos.clear();
        self.result = None;
        self.err = None;
    }

    fn err(&self) -> Option<&StoreError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        let mut out = Ok(());
        if let Some(primary) = self.primary.as_mut() {
            if let Err(e) = primary.close() {
                out = Err(e);
            }
        }
        for it in &mut self.internal {
            if let Err(e) = it.close() {
                out = Err(e);
            }
        }
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
        if let Some(primary) = self.primary.as_ref() {
            primary.tag_results(dst);
        }
        for it in &self.internal {
            it.tag_results(dst);
        }
    }

    fn sub_iterators(&self) -> Vec<&dyn Shape> {
        let mut out: Vec<&dyn Shape> = Vec::new();
        if let Some(primary) = self.primary.as_ref() {
            out.push(primary.as_ref());
        }
        for it in &self.internal {
            out.push(it.as_ref());
        }
        out
    }

    fn stats(&self) -> IteratorStats {
        let primary = match self.primary.as_ref() {
            Some(p) => p.stats(),
            None => return IteratorStats {
                exact_size: true,
                ..IteratorStats::default()
            },
        };
        let probe_cost: i64 = self.internal.iter().map(|it| it.stats().contains_cost).sum();
        let (size, exact) = self.size();
        IteratorStats {
            contains_cost: primary.contains_cost + probe_cost,
            next_cost: primary.next_cost + probe_cost,
            size,
            exact_size: exact,
        }
    }

    // The intersection is no larger than its smallest child.
    fn size(&self) -> (i64, bool) {
        let mut out: Option<(i64, bool)> = None;
        for it in self.sub_iterators() {
            let (size, exact) = it.size();
            if out.map_or(true, |(best, _)| size < best) {
                out = Some((size, exact));
            }
        }
        out.unwrap_or((0, true))
    }

    fn optimize(mut self: Box<Self>) -> (Box<dyn Shape>, bool) {
        let mut children: Vec<Box<dyn Shape>> = Vec::new();
        if let Some(primary) = self.primary.take() {
            children.push(primary);
        }
        children.append(&mut self.internal);
        if children.is_empty() {
            let mut null = Null::new();
            null.tagger().copy_from(&self.tagger);
            return (Box::new(null), true);
        }

        let (children, _) = optimize_all(children);

        // Associativity: splice tag-free nested intersections in place.
        let mut flat: Vec<Box<dyn Shape>> = Vec::new();
        for child in children {
            if child.shape_type() == ShapeType::And && child.tagger_ref().is_empty() {
                let mut inner = child
                    .into_any()
                    .downcast::<And>()
                    .expect("and shape downcasts to And");
                if let Some(primary) = inner.primary.take() {
                    flat.push(primary);
                }
                flat.append(&mut inner.internal);
            } else {
                flat.push(child);
            }
        }

        // A provably empty child empties the whole intersection.
        let provably_empty = |it: &Box<dyn Shape>| {
            if it.shape_type() == ShapeType::Null {
                return true;
            }
            let (size, exact) = it.size();
            exact && size == 0
        };
        if flat.iter().any(provably_empty) {
            let mut null = Null::new();
            null.tagger().copy_from(&self.tagger);
            debug!(uid = self.uid, "intersection proved empty");
            return (Box::new(null), true);
        }

        // An untagged enumerate-everything child only re-checks what the
        // others already guarantee.
        if flat.len() > 1 {
            let droppable = |it: &Box<dyn Shape>| {
                it.shape_type() == ShapeType::All && it.tagger_ref().is_empty()
            };
            let narrowing = flat.iter().filter(|it| !droppable(it)).count();
            if narrowing > 0 {
                flat.retain(|it| !droppable(it));
            }
        }

        // Cheapest child drives iteration: smallest first, contains
        // cost as the tie-break. Contains-only children stay internal.
        flat.sort_by(|a, b| {
            let (sa, sb) = (a.stats(), b.stats());
            (a.shape_type() == ShapeType::Optional, sa.size, sa.contains_cost).cmp(&(
                b.shape_type() == ShapeType::Optional,
                sb.size,
                sb.contains_cost,
            ))
        });

        if flat.len() == 1 && flat[0].shape_type() != ShapeType::Optional {
            let mut only = flat.pop().expect("one child");
            only.tagger().copy_from(&self.tagger);
            return (only, true);
        }

        let merge = flat.iter().all(|it| it.sorted());
        let mut out = And {
            uid: next_uid(),
            tagger: Tagger::default(),
            qs: self.qs.clone(),
            primary: None,
            internal: Vec::new(),
            result: None,
            err: None,
            merge,
            merge_pos: Vec::new(),
        };
        out.tagger.copy_from(&self.tagger);
        for child in flat {
            out.add_sub_iterator(child);
        }
        if let Some(qs) = &self.qs {
            if let Some(native) = qs.optimize_iterator(&out) {
                debug!(uid = out.uid, "backend substituted intersection");
                return (native, true);
            }
        }
        (Box::new(out), true)
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        let mut out = And {
            uid: next_uid(),
            tagger: Tagger::default(),
            qs: self.qs.clone(),
            primary: self.primary.as_ref().map(|p| p.clone_shape()),
            internal: self.internal.iter().map(|it| it.clone_shape()).collect(),
            result: None,
            err: None,
            merge: self.merge,
            merge_pos: Vec::new(),
        };
        out.tagger.copy_from(&self.tagger);
        Box::new(out)
    }

    fn describe(&self) -> Description {
        Description {
            uid: self.uid,
            name: String::new(),
            typ: if self.merge { "and(merge)" } else { "and" }.into(),
            tags: self.tagger.tags().to_vec(),
            size: self.size().0,
            sub: self.sub_iterators().iter().map(|it| it.describe()).collect(),
        }
    }

    fn sorted(&self) -> bool {
        self.merge
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

    fn fixed(keys: &[i64]) -> Box<dyn Shape> {
        Box::new(Fixed::with_values(keys.iter().map(|k| Ref::node(*k)).collect()))
    }

    #[test]
    fn probe_intersection() {
        let mut and = And::new();
        and.add_sub_iterator(fixed(&[1, 2, 3, 4]));
        and.add_sub_iterator(fixed(&[2, 4, 5]));
        assert_eq!(iterate_all(&mut and), vec![Ref::node(2), Ref::node(4)]);
        assert!(and.err().is_none());
    }

    #[test]
    fn contains_requires_every_child() {
        let mut and = And::new();
        and.add_sub_iterator(fixed(&[1, 2]));
        and.add_sub_iterator(fixed(&[2, 3]));
        assert!(and.contains(&Ref::node(2)));
        assert_eq!(and.result(), Some(Ref::node(2)));
        assert!(!and.contains(&Ref::node(1)));
        assert!(and.err().is_none());
    }

    #[test]
    fn merge_join_over_sorted_children() {
        let mut and = And::new();
        and.add_sub_iterator(Box::new(Int64::new(1, 10, true)));
        and.add_sub_iterator(Box::new(Int64::new(4, 20, true)));
        let (mut opt, _) = (Box::new(and) as Box<dyn Shape>).optimize();
        assert!(opt.sorted());
        let got = iterate_all(opt.as_mut());
        let expect: Vec<Ref> = (4..=10).map(Ref::node).collect();
        assert_eq!(got, expect);
    }

    #[test]
    fn empty_child_collapses_to_null() {
        let mut and = And::new();
        and.add_sub_iterator(fixed(&[1, 2]));
        and.add_sub_iterator(Null::boxed());
        let (opt, changed) = (Box::new(and) as Box<dyn Shape>).optimize();
        assert!(changed);
        assert_eq!(opt.shape_type(), ShapeType::Null);
    }

    #[test]
    fn nested_intersections_flatten_and_smallest_leads() {
        let mut inner = And::new();
        inner.add_sub_iterator(fixed(&[2, 3]));
        inner.add_sub_iterator(fixed(&[1, 2, 3]));
        let mut outer = And::new();
        outer.add_sub_iterator(fixed(&[1, 2, 3, 4]));
        outer.add_sub_iterator(Box::new(inner));
        let (opt, _) = (Box::new(outer) as Box<dyn Shape>).optimize();
        let desc = opt.describe();
        assert_eq!(desc.sub.len(), 3);
        assert_eq!(desc.sub[0].size, 2);
        let mut opt = opt;
        assert_eq!(iterate_all(opt.as_mut()), vec![Ref::node(2), Ref::node(3)]);
    }

    #[test]
    fn single_child_unwraps_with_tags() {
        let mut and = And::new();
        and.tagger().add("keep");
        and.add_sub_iterator(fixed(&[7]));
        let (opt, changed) = (Box::new(and) as Box<dyn Shape>).optimize();
        assert!(changed);
        assert_eq!(opt.shape_type(), ShapeType::Fixed);
        assert_eq!(opt.tagger_ref().tags(), ["keep".to_owned()]);
    }

    #[test]
    fn all_children_are_dropped_from_intersections() {
        let mut and = And::new();
        and.add_sub_iterator(Box::new(Int64::new(1, 100, true)));
        and.add_sub_iterator(fixed(&[5, 6]));
        let (opt, _) = (Box::new(and) as Box<dyn Shape>).optimize();
        // The range child is gone and the fixed child took over.
        assert_eq!(opt.shape_type(), ShapeType::Fixed);
    }
}
