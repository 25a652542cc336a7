#![allow(dead_code)]

//! Shared fixture: the simple follows/status graph.
//!
//!    +---+                        +---+
//!    | A |-------               ->| F |<--
//!    +---+       \------>+---+-/  +---+   \--+---+
//!                 ------>|#B#|      |        | E |
//!    +---+-------/      >+---+      |        +---+
//!    | C |             /            v
//!    +---+           -/           +---+
//!      ----    +---+/             |#G#|
//!          \-->|#D#|------------->+---+
//!              +---+

use std::sync::Arc;

use tessera::iterator::Shape;
use tessera::memstore::MemStore;
use tessera::store::StoreHandle;
use tessera::{Options, Quad, QuadStore, QuadWriter, SingleReplication, Value};

pub fn quad_set() -> Vec<Quad> {
    vec![
        Quad::make("A", "follows", "B", ""),
        Quad::make("C", "follows", "B", ""),
        Quad::make("C", "follows", "D", ""),
        Quad::make("D", "follows", "B", ""),
        Quad::make("B", "follows", "F", ""),
        Quad::make("F", "follows", "G", ""),
        Quad::make("D", "follows", "G", ""),
        Quad::make("E", "follows", "F", ""),
        Quad::make("B", "status", "cool", "status_graph"),
        Quad::make("D", "status", "cool", "status_graph"),
        Quad::make("G", "status", "cool", "status_graph"),
    ]
}

pub fn raw(s: &str) -> Value {
    Value::from(s)
}

/// An empty store plus an attached writer.
pub fn empty_store() -> (MemStore, StoreHandle, SingleReplication) {
    let store = MemStore::new();
    let qs: StoreHandle = Arc::new(store.clone());
    let writer = SingleReplication::new(qs.clone(), &Options::new()).expect("attach writer");
    (store, qs, writer)
}

/// A store seeded with the fixture graph.
pub fn seeded_store() -> (MemStore, StoreHandle, SingleReplication) {
    let (store, qs, mut writer) = empty_store();
    writer.add_quad_set(quad_set()).expect("seed store");
    (store, qs, writer)
}

/// Drains an iterator and materializes its quads, sorted canonically.
pub fn iterated_quads(qs: &dyn QuadStore, it: &mut dyn Shape) -> Vec<Quad> {
    let mut out = Vec::new();
    while it.next() {
        let r = it.result().expect("result after next");
        out.push(qs.quad(&r).expect("materialize quad"));
    }
    assert!(it.err().is_none(), "iterator failed: {:?}", it.err());
    out.sort();
    out
}

/// Drains an iterator and resolves its values to canonical strings,
/// sorted.
pub fn iterated_names(qs: &dyn QuadStore, it: &mut dyn Shape) -> Vec<String> {
    let mut out = Vec::new();
    while it.next() {
        let r = it.result().expect("result after next");
        out.push(qs.name_of(&r).expect("resolve value").to_string());
    }
    assert!(it.err().is_none(), "iterator failed: {:?}", it.err());
    out.sort();
    out
}

pub fn expect_iterated_quads(qs: &dyn QuadStore, it: &mut dyn Shape, expect: Vec<Quad>) {
    let mut expect = expect;
    expect.sort();
    assert_eq!(iterated_quads(qs, it), expect);
}
