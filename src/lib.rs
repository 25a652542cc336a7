//! Quad-store core engine: a content-hashed RDF value model, a
//! pluggable storage contract with an in-memory reference backend, a
//! composable iterator algebra with rule-driven optimization, and a
//! transactional delta writer.

pub mod error;
pub mod iterator;
pub mod memstore;
pub mod model;
pub mod store;
pub mod stream;
pub mod writer;

pub use crate::error::{Result, StoreError};
pub use crate::model::{Direction, Quad, Value};
pub use crate::store::{
    Delta, IgnoreOpts, Options, PrimaryKey, Procedure, QuadStore, Ref, StoreHandle, Transaction,
    ValueSizer,
};
pub use crate::writer::{QuadWriter, SingleReplication};
