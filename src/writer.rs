//! Mutation writers: the single-writer pipeline that assigns delta ids
//! and drives `apply_deltas`.

use chrono::Utc;
use tracing::debug;

use crate::error::Result;
use crate::model::Quad;
use crate::store::{
    Delta, IgnoreOpts, Options, PrimaryKey, Procedure, QuadStore, StoreHandle, Transaction,
};

/// Write-side counterpart of the store contract. One writer is in
/// flight at a time; batches are atomic.
pub trait QuadWriter {
    fn add_quad(&mut self, q: Quad) -> Result<()>;

    /// Adds a set of quads as one atomic batch.
    fn add_quad_set(&mut self, quads: Vec<Quad>) -> Result<()>;

    fn remove_quad(&mut self, q: Quad) -> Result<()>;

    /// Applies a mixed batch of adds and removes atomically.
    fn apply_transaction(&mut self, tx: &Transaction) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// The default writer: a single appender that stamps each delta with
/// the next id past the store's horizon.
pub struct SingleReplication {
    qs: StoreHandle,
    current_id: PrimaryKey,
    ignore: IgnoreOpts,
}

impl SingleReplication {
    pub fn new(qs: StoreHandle, opts: &Options) -> Result<SingleReplication> {
        let ignore = IgnoreOpts {
            ignore_dup: opts.bool_key("ignore_duplicate")?.unwrap_or(false),
            ignore_missing: opts.bool_key("ignore_missing")?.unwrap_or(false),
        };
        let current_id = qs.horizon();
        debug!(
            horizon = current_id.value(),
            ignore_dup = ignore.ignore_dup,
            ignore_missing = ignore.ignore_missing,
            "writer attached"
        );
        Ok(SingleReplication {
            qs,
            current_id,
            ignore,
        })
    }

    fn build_delta(&mut self, op: Procedure, quad: Quad) -> Delta {
        Delta {
            op,
            quad,
            id: self.current_id.next(),
            timestamp: Utc::now(),
        }
    }
}

impl QuadWriter for SingleReplication {
    fn add_quad(&mut self, q: Quad) -> Result<()> {
        let delta = self.build_delta(Procedure::Add, q);
        self.qs.apply_deltas(&[delta], self.ignore)
    }

    fn add_quad_set(&mut self, quads: Vec<Quad>) -> Result<()> {
        let deltas: Vec<Delta> = quads
            .into_iter()
            .map(|q| self.build_delta(Procedure::Add, q))
            .collect();
        self.qs.apply_deltas(&deltas, self.ignore)
    }

    fn remove_quad(&mut self, q: Quad) -> Result<()> {
        let delta = self.build_delta(Procedure::Delete, q);
        self.qs.apply_deltas(&[delta], self.ignore)
    }

    fn apply_transaction(&mut self, tx: &Transaction) -> Result<()> {
        let deltas: Vec<Delta> = tx
            .ops()
            .iter()
            .map(|(op, quad)| self.build_delta(*op, quad.clone()))
            .collect();
        self.qs.apply_deltas(&deltas, self.ignore)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memstore::MemStore;
    use std::sync::Arc;

    fn writer_over_empty() -> (StoreHandle, SingleReplication) {
        let qs: StoreHandle = Arc::new(MemStore::new());
        let w = SingleReplication::new(qs.clone(), &Options::new()).unwrap();
        (qs, w)
    }

    #[test]
    fn ids_resume_past_the_horizon() {
        let (qs, mut w) = writer_over_empty();
        w.add_quad(Quad::make("A", "p", "B", "")).unwrap();
        assert_eq!(qs.horizon().value(), 1);
        // A new writer over the same store continues the sequence.
        let mut w2 = SingleReplication::new(qs.clone(), &Options::new()).unwrap();
        w2.add_quad(Quad::make("A", "p", "C", "")).unwrap();
        assert_eq!(qs.horizon().value(), 2);
    }

    #[test]
    fn failed_transaction_mutates_nothing() {
        let (qs, mut w) = writer_over_empty();
        w.add_quad(Quad::make("A", "p", "B", "")).unwrap();
        let mut tx = Transaction::new();
        tx.add_quad(Quad::make("C", "p", "D", ""));
        tx.remove_quad(Quad::make("no", "such", "quad", ""));
        let err = w.apply_transaction(&tx).unwrap_err();
        assert!(matches!(err, StoreError::QuadNotExist));
        assert_eq!(qs.size(), 1);
        assert_eq!(qs.horizon().value(), 1);
    }

    #[test]
    fn ignore_policies_come_from_options() {
        let (qs, _) = writer_over_empty();
        let opts = Options::new().with("ignore_duplicate", true);
        let mut w = SingleReplication::new(qs.clone(), &opts).unwrap();
        let q = Quad::make("A", "p", "B", "");
        w.add_quad(q.clone()).unwrap();
        w.add_quad(q).unwrap();
        assert_eq!(qs.size(), 1);
    }
}
