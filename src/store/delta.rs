//! Mutation records and the batch-building transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Quad;

/// What a delta does to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Procedure {
    Add,
    Delete,
}

/// A single mutation. The id is assigned by the writer, never by the
/// caller, and increases strictly across the store's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub op: Procedure,
    pub quad: Quad,
    pub id: u64,
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
}

/// Policies for [`apply_deltas`](crate::store::QuadStore::apply_deltas).
/// A delta that trips an enabled policy is skipped silently instead of
/// failing the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IgnoreOpts {
    /// Skip adds whose quad already exists live.
    pub ignore_dup: bool,
    /// Skip removes with no matching live quad.
    pub ignore_missing: bool,
}

/// An ordered batch of mutations applied atomically by a writer.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    ops: Vec<(Procedure, Quad)>,
}

impl Transaction {
    pub fn new() -> Transaction {
        Transaction::default()
    }

    pub fn add_quad(&mut self, q: Quad) {
        self.ops.push((Procedure::Add, q));
    }

    pub fn remove_quad(&mut self, q: Quad) {
        self.ops.push((Procedure::Delete, q));
    }

    /// The batched operations, in declared order.
    pub fn ops(&self) -> &[(Procedure, Quad)] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
