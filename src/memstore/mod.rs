//! The reference in-memory backend.
//!
//! Layout mirrors the contract directly: an intern table (value to key
//! and back), an append-only log of applied deltas addressed by quad
//! id, and four per-direction posting maps whose ordered sets hold quad
//! ids. Removal never rewrites a posting; it stamps the live log entry
//! with the id of the delta that deleted it, and every scan skips
//! stamped entries.
//!
//! Two reader/writer locks guard the shared structures, one per
//! structure. The single-writer discipline comes from the writer layer;
//! the locks only make individual reads consistent.

mod all_iterator;
mod iterator;

pub use all_iterator::{NodesAllIterator, QuadsAllIterator};
pub use iterator::PostingIterator;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::iterator::{Fixed, LinksTo, Null, Shape, ShapeType};
use crate::model::{Direction, Quad, Value};
use crate::store::{
    Delta, IgnoreOpts, PrimaryKey, Procedure, QuadStore, Ref, Registration, StoreHandle,
    ValueSizer,
};

/// Name the backend registers under.
pub const STORE_TYPE: &str = "memstore";

/// Registry entry for this backend.
pub fn registration() -> Registration {
    Registration {
        new_fn: |_path, _opts| Ok(Arc::new(MemStore::new()) as StoreHandle),
        init_fn: None,
        is_persistent: false,
    }
}

struct InternTable {
    ids: HashMap<String, i64>,
    names: BTreeMap<i64, Value>,
    next_id: i64,
}

impl InternTable {
    fn new() -> InternTable {
        InternTable {
            ids: HashMap::new(),
            names: BTreeMap::new(),
            next_id: 1,
        }
    }
}

/// One applied delta. `deleted_by` is the id of the later delta that
/// removed this quad, or zero while it is live.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub id: u64,
    pub quad: Quad,
    pub action: Procedure,
    pub timestamp: DateTime<Utc>,
    pub deleted_by: i64,
}

struct QuadLog {
    // Quad id `q` lives at `entries[q - 1]`.
    entries: Vec<LogEntry>,
    size: i64,
}

impl QuadLog {
    fn new() -> QuadLog {
        QuadLog {
            entries: Vec::new(),
            size: 0,
        }
    }
}

/// An ordered set of quad ids for one `(direction, value)` pair.
pub(crate) struct Posting {
    tree: RwLock<BTreeSet<i64>>,
}

impl Posting {
    fn new() -> Arc<Posting> {
        Arc::new(Posting {
            tree: RwLock::new(BTreeSet::new()),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.tree.read().len()
    }

    fn insert(&self, id: i64) {
        self.tree.write().insert(id);
    }

    pub(crate) fn contains(&self, id: i64) -> bool {
        self.tree.read().contains(&id)
    }

    /// The smallest id strictly greater than `prev`, or the first id
    /// when `prev` is `None`. Seek-based so cursors stay valid across
    /// concurrent appends.
    pub(crate) fn next_after(&self, prev: Option<i64>) -> Option<i64> {
        let tree = self.tree.read();
        match prev {
            None => tree.iter().next().copied(),
            Some(p) => tree.range((Bound::Excluded(p), Bound::Unbounded)).next().copied(),
        }
    }
}

struct QuadDirectionIndex {
    index: [RwLock<HashMap<i64, Arc<Posting>>>; 4],
}

impl QuadDirectionIndex {
    fn new() -> QuadDirectionIndex {
        QuadDirectionIndex {
            index: [
                RwLock::new(HashMap::new()),
                RwLock::new(HashMap::new()),
                RwLock::new(HashMap::new()),
                RwLock::new(HashMap::new()),
            ],
        }
    }

    fn get(&self, d: Direction, id: i64) -> Option<Arc<Posting>> {
        self.index[d.index()].read().get(&id).cloned()
    }

    fn tree(&self, d: Direction, id: i64) -> Arc<Posting> {
        if let Some(posting) = self.get(d, id) {
            return posting;
        }
        self.index[d.index()]
            .write()
            .entry(id)
            .or_insert_with(Posting::new)
            .clone()
    }
}

/// In-memory quad store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MemStore {
    values: Arc<RwLock<InternTable>>,
    log: Arc<RwLock<QuadLog>>,
    index: Arc<QuadDirectionIndex>,
    cancel: Arc<AtomicBool>,
}

impl Default for MemStore {
    fn default() -> Self {
        MemStore::new()
    }
}

impl MemStore {
    pub fn new() -> MemStore {
        MemStore {
            values: Arc::new(RwLock::new(InternTable::new())),
            log: Arc::new(RwLock::new(QuadLog::new())),
            index: Arc::new(QuadDirectionIndex::new()),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cooperative cancellation flag. Setting it makes in-flight scans
    /// and batch applies stop with [`StoreError::Cancelled`].
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Materializes a past log entry by quad id.
    pub fn log_entry(&self, quad_id: i64) -> Option<LogEntry> {
        let log = self.log.read();
        if quad_id < 1 {
            return None;
        }
        log.entries.get((quad_id - 1) as usize).cloned()
    }

    pub(crate) fn check_valid(&self, quad_id: i64) -> bool {
        if quad_id < 1 {
            return false;
        }
        let log = self.log.read();
        match log.entries.get((quad_id - 1) as usize) {
            Some(entry) => entry.action == Procedure::Add && entry.deleted_by == 0,
            None => false,
        }
    }

    pub(crate) fn node_horizon(&self) -> i64 {
        self.values.read().next_id - 1
    }

    pub(crate) fn quad_horizon(&self) -> i64 {
        self.log.read().entries.len() as i64
    }

    pub(crate) fn is_interned(&self, key: i64) -> bool {
        self.values.read().names.contains_key(&key)
    }

    fn intern(&self, v: &Value) -> i64 {
        let canonical = v.to_string();
        if let Some(id) = self.values.read().ids.get(&canonical) {
            return *id;
        }
        let mut table = self.values.write();
        if let Some(id) = table.ids.get(&canonical) {
            return *id;
        }
        let id = table.next_id;
        table.ids.insert(canonical, id);
        table.names.insert(id, v.clone());
        table.next_id += 1;
        id
    }

    /// Finds the live quad id for an exact quad, scanning the smallest
    /// of its postings.
    fn index_of(&self, q: &Quad) -> Option<i64> {
        let mut best: Option<Arc<Posting>> = None;
        let mut min = usize::MAX;
        for d in Direction::ALL {
            let val = match q.get(d) {
                Some(val) => val,
                None => continue,
            };
            // A value the store has never seen means the quad cannot
            // exist; same for a value never indexed in this direction.
            let id = *self.values.read().ids.get(&val.to_string())?;
            let posting = self.index.get(d, id)?;
            if posting.len() < min {
                min = posting.len();
                best = Some(posting);
            }
        }
        let posting = best?;
        let mut prev = None;
        while let Some(qid) = posting.next_after(prev) {
            prev = Some(qid);
            if !self.check_valid(qid) {
                continue;
            }
            let log = self.log.read();
            if let Some(entry) = log.entries.get((qid - 1) as usize) {
                if entry.quad == *q {
                    return Some(qid);
                }
            }
        }
        None
    }

    fn add_delta(&self, d: &Delta) -> Result<()> {
        if self.index_of(&d.quad).is_some() {
            return Err(StoreError::QuadExists);
        }
        let qid = {
            let mut log = self.log.write();
            log.entries.push(LogEntry {
                id: d.id,
                quad: d.quad.clone(),
                action: Procedure::Add,
                timestamp: d.timestamp,
                deleted_by: 0,
            });
            log.size += 1;
            log.entries.len() as i64
        };
        for dir in Direction::ALL {
            let val = match d.quad.get(dir) {
                Some(val) => val,
                None => continue,
            };
            let id = self.intern(val);
            self.index.tree(dir, id).insert(qid);
        }
        Ok(())
    }

    fn remove_delta(&self, d: &Delta) -> Result<()> {
        let prev = self.index_of(&d.quad).ok_or(StoreError::QuadNotExist)?;
        let mut log = self.log.write();
        log.entries.push(LogEntry {
            id: d.id,
            quad: d.quad.clone(),
            action: Procedure::Delete,
            timestamp: d.timestamp,
            deleted_by: 0,
        });
        let tombstone = log.entries.len() as i64;
        log.entries[(prev - 1) as usize].deleted_by = tombstone;
        log.size -= 1;
        Ok(())
    }
}

impl QuadStore for MemStore {
    fn apply_deltas(&self, deltas: &[Delta], opts: IgnoreOpts) -> Result<()> {
        // Precheck the whole batch; nothing mutates until it passes.
        // `pending` tracks the liveness changes earlier batch entries
        // would make, so a conflict inside the batch fails it up front
        // instead of half-applied.
        let mut pending: HashMap<&Quad, bool> = HashMap::new();
        for d in deltas {
            if self.cancelled() {
                return Err(StoreError::Cancelled);
            }
            let live = pending
                .get(&d.quad)
                .copied()
                .unwrap_or_else(|| self.index_of(&d.quad).is_some());
            match d.op {
                Procedure::Add => {
                    if live {
                        if !opts.ignore_dup {
                            return Err(StoreError::QuadExists);
                        }
                    } else {
                        pending.insert(&d.quad, true);
                    }
                }
                Procedure::Delete => {
                    if !live {
                        if !opts.ignore_missing {
                            return Err(StoreError::QuadNotExist);
                        }
                    } else {
                        pending.insert(&d.quad, false);
                    }
                }
            }
        }
        for d in deltas {
            let outcome = match d.op {
                Procedure::Add => match self.add_delta(d) {
                    Err(StoreError::QuadExists) if opts.ignore_dup => Ok(()),
                    other => other,
                },
                Procedure::Delete => match self.remove_delta(d) {
                    Err(StoreError::QuadNotExist) if opts.ignore_missing => Ok(()),
                    other => other,
                },
            };
            outcome?;
        }
        debug!(
            applied = deltas.len(),
            size = self.size(),
            horizon = self.horizon().value(),
            "applied delta batch"
        );
        Ok(())
    }

    fn quad(&self, r: &Ref) -> Option<Quad> {
        if r.is_node() {
            return None;
        }
        self.log_entry(r.key()).map(|entry| entry.quad)
    }

    fn value_of(&self, v: &Value) -> Option<Ref> {
        self.values
            .read()
            .ids
            .get(&v.to_string())
            .map(|id| Ref::node(*id))
    }

    fn name_of(&self, r: &Ref) -> Option<Value> {
        if !r.is_node() {
            return None;
        }
        self.values.read().names.get(&r.key()).cloned()
    }

    fn quad_iterator(&self, d: Direction, r: &Ref) -> Box<dyn Shape> {
        if !r.is_node() {
            return Null::boxed();
        }
        match self.index.get(d, r.key()) {
            Some(posting) => Box::new(PostingIterator::new(self.clone(), posting, d, *r)),
            None => Null::boxed(),
        }
    }

    fn nodes_all_iterator(&self) -> Box<dyn Shape> {
        Box::new(NodesAllIterator::new(self.clone()))
    }

    fn quads_all_iterator(&self) -> Box<dyn Shape> {
        Box::new(QuadsAllIterator::new(self.clone()))
    }

    fn quad_direction(&self, r: &Ref, d: Direction) -> Option<Ref> {
        let quad = self.quad(r)?;
        let val = quad.get(d)?;
        self.value_of(val)
    }

    fn size(&self) -> i64 {
        self.log.read().size
    }

    fn horizon(&self) -> PrimaryKey {
        let log = self.log.read();
        PrimaryKey::sequential(log.entries.last().map(|entry| entry.id).unwrap_or(0))
    }

    fn optimize_iterator(&self, it: &dyn Shape) -> Option<Box<dyn Shape>> {
        if it.shape_type() != ShapeType::LinksTo {
            return None;
        }
        let links = it.as_any().downcast_ref::<LinksTo>()?;
        let fixed = links.sub().as_any().downcast_ref::<Fixed>()?;
        if fixed.values().len() != 1 {
            return None;
        }
        let value = fixed.values()[0];
        let mut native = self.quad_iterator(links.direction(), &value);
        // The substitute answers for the whole subtree, so both layers
        // of tags ride along; the folded child's tags pin to its single
        // value.
        native.tagger().copy_from(links.tagger_ref());
        for tag in fixed.tagger_ref().tags() {
            native.tagger().add_fixed(tag.clone(), value);
        }
        for (tag, v) in fixed.tagger_ref().fixed() {
            native.tagger().add_fixed(tag.clone(), *v);
        }
        debug!(dir = %links.direction(), value = %value, "folded posting scan");
        Some(native)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

impl ValueSizer for MemStore {
    /// Live postings the value participates in, summed across
    /// directions.
    fn size_of(&self, r: &Ref) -> i64 {
        if !r.is_node() {
            return 0;
        }
        let mut n = 0;
        for d in Direction::ALL {
            let posting = match self.index.get(d, r.key()) {
                Some(posting) => posting,
                None => continue,
            };
            let mut prev = None;
            while let Some(qid) = posting.next_after(prev) {
                prev = Some(qid);
                if self.check_valid(qid) {
                    n += 1;
                }
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{QuadWriter, SingleReplication};
    use crate::Options;

    fn seeded() -> (MemStore, StoreHandle) {
        let store = MemStore::new();
        let qs: StoreHandle = Arc::new(store.clone());
        let mut w = SingleReplication::new(qs.clone(), &Options::new()).unwrap();
        w.add_quad_set(vec![
            Quad::make("A", "follows", "B", ""),
            Quad::make("C", "follows", "B", ""),
            Quad::make("B", "status", "cool", "status_graph"),
        ])
        .unwrap();
        (store, qs)
    }

    #[test]
    fn values_intern_in_first_mention_order() {
        let (_, qs) = seeded();
        for (name, key) in [
            ("A", 1),
            ("follows", 2),
            ("B", 3),
            ("C", 4),
            ("status", 5),
            ("cool", 6),
            ("status_graph", 7),
        ] {
            assert_eq!(
                qs.value_of(&Value::from(name)),
                Some(Ref::node(key)),
                "unexpected key for {name:?}"
            );
        }
    }

    #[test]
    fn index_of_tracks_liveness() {
        let (store, qs) = seeded();
        let q = Quad::make("A", "follows", "B", "");
        assert_eq!(store.index_of(&q), Some(1));
        assert_eq!(store.index_of(&Quad::make("A", "follows", "C", "")), None);

        let mut w = SingleReplication::new(qs, &Options::new()).unwrap();
        w.remove_quad(q.clone()).unwrap();
        assert_eq!(store.index_of(&q), None);
    }

    #[test]
    fn in_batch_duplicates_fail_atomically() {
        let (store, _) = seeded();
        let q = Quad::make("X", "p", "Y", "");
        let mk = |op, id| Delta {
            op,
            quad: q.clone(),
            id,
            timestamp: Utc::now(),
        };
        let batch = [mk(Procedure::Add, 100), mk(Procedure::Add, 101)];
        let err = store
            .apply_deltas(&batch, IgnoreOpts::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::QuadExists));
        assert_eq!(store.size(), 3, "failed batch must not change the store");
        assert_eq!(store.horizon().value(), 3);

        // The same batch under the dup policy applies the first add.
        store
            .apply_deltas(
                &batch,
                IgnoreOpts {
                    ignore_dup: true,
                    ignore_missing: false,
                },
            )
            .unwrap();
        assert_eq!(store.size(), 4);
    }

    #[test]
    fn add_then_remove_in_one_batch_is_fine() {
        let (store, _) = seeded();
        let q = Quad::make("X", "p", "Y", "");
        let batch = [
            Delta {
                op: Procedure::Add,
                quad: q.clone(),
                id: 100,
                timestamp: Utc::now(),
            },
            Delta {
                op: Procedure::Delete,
                quad: q.clone(),
                id: 101,
                timestamp: Utc::now(),
            },
        ];
        store.apply_deltas(&batch, IgnoreOpts::default()).unwrap();
        assert_eq!(store.size(), 3);
        assert_eq!(store.index_of(&q), None);
        assert_eq!(store.horizon().value(), 101);
    }
}
