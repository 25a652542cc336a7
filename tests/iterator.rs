//! Traversal-tree behavior over the seeded store: intersections,
//! projections, tag paths, and optimizer equivalence.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{iterated_names, raw, seeded_store};
use tessera::iterator::{
    iterate_all, And, Comparison, Fixed, HasA, LinksTo, Not, Operator, Optional, Or, Regex,
    Shape, ShapeType, TagMap,
};
use tessera::memstore::MemStore;
use tessera::store::StoreHandle;
use tessera::{
    Direction, Options, Quad, QuadStore, QuadWriter, Ref, SingleReplication, Value,
};

fn fixed_for(qs: &dyn QuadStore, name: &str) -> Box<dyn Shape> {
    let mut fixed = Fixed::new();
    fixed.add(qs.value_of(&raw(name)).expect("interned value"));
    Box::new(fixed)
}

#[test]
fn intersection_of_postings() {
    let (_, qs, _) = seeded_store();
    let b = qs.value_of(&raw("B")).unwrap();
    let status = qs.value_of(&raw("status")).unwrap();

    let mut and = And::new();
    and.add_sub_iterator(qs.quad_iterator(Direction::Subject, &b));
    and.add_sub_iterator(qs.quad_iterator(Direction::Predicate, &status));

    assert!(and.next());
    let got = qs.quad(&and.result().unwrap()).unwrap();
    assert_eq!(got, Quad::make("B", "status", "cool", "status_graph"));
    assert!(!and.next());
    assert!(and.err().is_none());
}

#[test]
fn intersection_order_is_declared_order() {
    let (_, qs, _) = seeded_store();
    let b = qs.value_of(&raw("B")).unwrap();
    let graph = qs.value_of(&raw("status_graph")).unwrap();

    // Label posting first, subject posting second, then the reverse:
    // both intersect to the same quad.
    for flip in [false, true] {
        let mut and = And::new();
        let label_it = qs.quad_iterator(Direction::Label, &graph);
        let subject_it = qs.quad_iterator(Direction::Subject, &b);
        if flip {
            and.add_sub_iterator(subject_it);
            and.add_sub_iterator(label_it);
        } else {
            and.add_sub_iterator(label_it);
            and.add_sub_iterator(subject_it);
        }
        assert!(and.next(), "flip={flip}");
        let got = qs.quad(&and.result().unwrap()).unwrap();
        assert_eq!(got, Quad::make("B", "status", "cool", "status_graph"));
        assert!(!and.next());
    }
}

#[test]
fn intersection_with_quads_all() {
    let (_, qs, _) = seeded_store();
    let c = qs.value_of(&raw("C")).unwrap();

    let mut and = And::new();
    and.add_sub_iterator(qs.quads_all_iterator());
    and.add_sub_iterator(qs.quad_iterator(Direction::Subject, &c));

    let mut got: Vec<Quad> = Vec::new();
    while and.next() {
        got.push(qs.quad(&and.result().unwrap()).unwrap());
    }
    got.sort();
    assert_eq!(
        got,
        vec![
            Quad::make("C", "follows", "B", ""),
            Quad::make("C", "follows", "D", ""),
        ]
    );
}

// Projection chain: everything that follows something with status cool.
fn cool_followee_subjects(qs: &StoreHandle) -> Box<dyn Shape> {
    let links = LinksTo::new(
        qs.clone(),
        fixed_for(qs.as_ref(), "cool"),
        Direction::Object,
    );
    Box::new(HasA::new(qs.clone(), Box::new(links), Direction::Subject))
}

#[test]
fn linksto_then_hasa_projects_subjects() {
    let (_, qs, _) = seeded_store();
    let links = LinksTo::new(
        qs.clone(),
        fixed_for(qs.as_ref(), "cool"),
        Direction::Object,
    );
    let mut hasa = HasA::new(qs.clone(), Box::new(links), Direction::Subject);
    let got = iterated_names(qs.as_ref(), &mut hasa);
    assert_eq!(got, vec!["B".to_string(), "D".into(), "G".into()]);
}

#[test]
fn nested_and_with_next_path_enumerates_alternate_bindings() {
    let (_, qs, _) = seeded_store();

    let fixed_c = fixed_for(qs.as_ref(), "C");
    let fixed_follows = fixed_for(qs.as_ref(), "follows");

    let mut all = qs.nodes_all_iterator();
    all.tagger().add("followee");

    let mut inner = And::new();
    inner.add_sub_iterator(Box::new(LinksTo::new(
        qs.clone(),
        fixed_follows,
        Direction::Predicate,
    )));
    inner.add_sub_iterator(Box::new(LinksTo::new(qs.clone(), all, Direction::Object)));

    let hasa = HasA::new(qs.clone(), Box::new(inner), Direction::Subject);
    let mut outer = And::new();
    outer.add_sub_iterator(fixed_c);
    outer.add_sub_iterator(Box::new(hasa));

    assert!(outer.next(), "expected one matching subtree");
    assert_eq!(qs.name_of(&outer.result().unwrap()), Some(raw("C")));

    let mut followees = Vec::new();
    loop {
        let mut tags = TagMap::new();
        outer.tag_results(&mut tags);
        followees.push(qs.name_of(&tags["followee"]).unwrap().to_string());
        if !outer.next_path() {
            break;
        }
    }
    followees.sort();
    assert_eq!(followees, vec!["B".to_string(), "D".into()]);

    assert!(!outer.next(), "more than one top-level result");
}

#[test]
fn backend_folds_single_value_linksto() {
    let (_, qs, _) = seeded_store();
    let mut links = LinksTo::new(
        qs.clone(),
        fixed_for(qs.as_ref(), "cool"),
        Direction::Object,
    );
    links.tagger().add("foo");

    let (it, changed) = (Box::new(links) as Box<dyn Shape>).optimize();
    assert!(changed, "iterator did not change");
    assert_eq!(it.shape_type(), ShapeType::Backend("btree"));
    assert_eq!(it.tagger_ref().tags(), ["foo".to_owned()]);

    let clone = it.clone_shape();
    let mut orig_desc = it.describe();
    let mut clone_desc = clone.describe();
    orig_desc.uid = 0;
    clone_desc.uid = 0;
    assert_eq!(format!("{orig_desc:?}"), format!("{clone_desc:?}"));

    let mut it = it;
    let mut got: Vec<Quad> = Vec::new();
    while it.next() {
        got.push(qs.quad(&it.result().unwrap()).unwrap());
    }
    got.sort();
    assert_eq!(
        got,
        vec![
            Quad::make("B", "status", "cool", "status_graph"),
            Quad::make("D", "status", "cool", "status_graph"),
            Quad::make("G", "status", "cool", "status_graph"),
        ]
    );
}

#[test]
fn optimized_tree_sees_removals() {
    let (_, qs, mut w) = seeded_store();
    w.remove_quad(Quad::make("E", "follows", "F", "")).unwrap();

    let mut inner = And::with_store(qs.clone());
    inner.add_sub_iterator(Box::new(LinksTo::new(
        qs.clone(),
        fixed_for(qs.as_ref(), "E"),
        Direction::Subject,
    )));
    inner.add_sub_iterator(Box::new(LinksTo::new(
        qs.clone(),
        fixed_for(qs.as_ref(), "follows"),
        Direction::Predicate,
    )));
    let hasa = HasA::new(qs.clone(), Box::new(inner), Direction::Object);

    let (mut it, _) = (Box::new(hasa) as Box<dyn Shape>).optimize();
    assert!(!it.next(), "E should not have any followees left");
    assert!(it.err().is_none());
}

#[test]
fn optimize_preserves_results_and_membership() {
    let (_, qs, _) = seeded_store();

    let build = |qs: &StoreHandle| -> Box<dyn Shape> {
        let mut and = And::with_store(qs.clone());
        and.add_sub_iterator(cool_followee_subjects(qs));
        and.add_sub_iterator(qs.nodes_all_iterator());
        Box::new(and)
    };

    let mut plain = build(&qs);
    let mut plain_results = Vec::new();
    while plain.next() {
        plain_results.push(plain.result().unwrap());
    }

    let (mut opt, _) = build(&qs).optimize();
    let mut opt_results = Vec::new();
    while opt.next() {
        opt_results.push(opt.result().unwrap());
    }

    let plain_set: HashSet<Ref> = plain_results.iter().copied().collect();
    let opt_set: HashSet<Ref> = opt_results.iter().copied().collect();
    assert_eq!(plain_set, opt_set);
    assert_eq!(plain_results.len(), opt_results.len(), "multiset size must survive");

    // Membership agrees on hits and misses alike.
    let mut nodes = qs.nodes_all_iterator();
    while nodes.next() {
        let v = nodes.result().unwrap();
        let mut plain = build(&qs);
        let (mut opt, _) = build(&qs).optimize();
        assert_eq!(plain.contains(&v), opt.contains(&v), "membership diverged for {v}");
    }
}

#[test]
fn union_streams_and_deduplicates() {
    let (_, qs, _) = seeded_store();
    let c = qs.value_of(&raw("C")).unwrap();
    let d = qs.value_of(&raw("D")).unwrap();

    let mut or = Or::new();
    or.add_sub_iterator(qs.quad_iterator(Direction::Subject, &c));
    or.add_sub_iterator(qs.quad_iterator(Direction::Subject, &d));
    assert_eq!(iterate_all(&mut or).len(), 5);

    // (C,follows,D) appears as subject-C; (D,follows,*) as subject-D.
    // No overlap here, so unique mode only changes the bookkeeping.
    let mut or = Or::new_unique();
    or.add_sub_iterator(qs.quad_iterator(Direction::Subject, &c));
    or.add_sub_iterator(qs.quad_iterator(Direction::Subject, &c));
    assert_eq!(iterate_all(&mut or).len(), 2);
}

#[test]
fn negation_filters_the_candidate_space() {
    let (_, qs, _) = seeded_store();
    let b = qs.value_of(&raw("B")).unwrap();
    let mut not = Not::new(
        qs.quad_iterator(Direction::Subject, &b),
        qs.quads_all_iterator(),
    );
    let mut got: Vec<Quad> = Vec::new();
    while not.next() {
        got.push(qs.quad(&not.result().unwrap()).unwrap());
    }
    assert_eq!(got.len(), 9, "11 quads minus 2 with subject B");
    assert!(got.iter().all(|q| q.subject != raw("B")));

    // Probes are live, not materialized.
    let mut cursor = qs.quad_iterator(Direction::Subject, &b);
    assert!(cursor.next());
    let b_quad = cursor.result().unwrap();
    assert!(!not.contains(&b_quad));
}

#[test]
fn optional_matches_do_not_constrain() {
    let (_, qs, _) = seeded_store();
    let b = qs.value_of(&raw("B")).unwrap();
    let graph = qs.value_of(&raw("status_graph")).unwrap();

    let mut labelled = qs.quad_iterator(Direction::Label, &graph);
    labelled.tagger().add("labelled");
    let mut and = And::new();
    and.add_sub_iterator(qs.quad_iterator(Direction::Subject, &b));
    and.add_sub_iterator(Box::new(Optional::new(labelled)));

    let mut seen = Vec::new();
    while and.next() {
        let q = qs.quad(&and.result().unwrap()).unwrap();
        let mut tags = TagMap::new();
        and.tag_results(&mut tags);
        seen.push((q, tags.contains_key("labelled")));
    }
    seen.sort();
    assert_eq!(
        seen,
        vec![
            (Quad::make("B", "follows", "F", ""), false),
            (Quad::make("B", "status", "cool", "status_graph"), true),
        ]
    );
}

fn age_store() -> (MemStore, StoreHandle) {
    let store = MemStore::new();
    let qs: StoreHandle = Arc::new(store.clone());
    let mut w = SingleReplication::new(qs.clone(), &Options::new()).unwrap();
    let people = [("alice", 25i64), ("bob", 30), ("carol", 41)];
    for (name, age) in people {
        w.add_quad(Quad::new(
            raw(name),
            raw("age"),
            Value::Int(age),
            None,
        ))
        .unwrap();
    }
    (store, qs)
}

#[test]
fn comparison_filters_native_values() {
    let (_, qs) = age_store();
    let links = LinksTo::new(qs.clone(), fixed_for(qs.as_ref(), "age"), Direction::Predicate);
    let hasa = HasA::new(qs.clone(), Box::new(links), Direction::Object);
    let mut cmp = Comparison::new(qs.clone(), Box::new(hasa), Operator::GTE, Value::Int(30));

    let mut got = Vec::new();
    while cmp.next() {
        got.push(qs.name_of(&cmp.result().unwrap()).unwrap());
    }
    assert_eq!(got, vec![Value::Int(30), Value::Int(41)]);
}

#[test]
fn comparison_pushdown_is_equivalent() {
    let (_, qs) = age_store();

    let build = |qs: &StoreHandle| -> Box<dyn Shape> {
        let links =
            LinksTo::new(qs.clone(), fixed_for(qs.as_ref(), "age"), Direction::Predicate);
        let hasa = HasA::new(qs.clone(), Box::new(links), Direction::Object);
        Box::new(Comparison::new(
            qs.clone(),
            Box::new(hasa),
            Operator::LT,
            Value::Int(41),
        ))
    };

    let mut plain = build(&qs);
    let plain_got: HashSet<Ref> = iterate_all(plain.as_mut()).into_iter().collect();

    let (mut opt, changed) = build(&qs).optimize();
    assert!(changed);
    assert_eq!(opt.shape_type(), ShapeType::HasA, "filter should sink below the projection");
    let opt_got: HashSet<Ref> = iterate_all(opt.as_mut()).into_iter().collect();

    assert_eq!(plain_got, opt_got);
    assert_eq!(
        plain_got.len(),
        2,
        "alice and bob are under 41"
    );
}

#[test]
fn regex_matches_string_literals_only() {
    let store = MemStore::new();
    let qs: StoreHandle = Arc::new(store.clone());
    let mut w = SingleReplication::new(qs.clone(), &Options::new()).unwrap();
    w.add_quad(Quad::new(raw("a"), raw("name"), Value::String("Alice".into()), None))
        .unwrap();
    w.add_quad(Quad::new(raw("b"), raw("name"), Value::String("Bob".into()), None))
        .unwrap();
    w.add_quad(Quad::new(raw("c"), raw("name"), Value::Iri("Avery".into()), None))
        .unwrap();

    let build = |refs: bool| {
        let links =
            LinksTo::new(qs.clone(), fixed_for(qs.as_ref(), "name"), Direction::Predicate);
        let hasa = HasA::new(qs.clone(), Box::new(links), Direction::Object);
        let re = ::regex::Regex::new("^A").unwrap();
        let filter = Regex::new(qs.clone(), Box::new(hasa), re);
        if refs {
            filter.with_refs()
        } else {
            filter
        }
    };

    let mut plain = build(false);
    let mut got = Vec::new();
    while plain.next() {
        got.push(qs.name_of(&plain.result().unwrap()).unwrap());
    }
    assert_eq!(got, vec![Value::String("Alice".into())]);

    let mut with_refs = build(true);
    let mut got = Vec::new();
    while with_refs.next() {
        got.push(qs.name_of(&with_refs.result().unwrap()).unwrap());
    }
    assert_eq!(
        got,
        vec![Value::String("Alice".into()), Value::Iri("Avery".into())]
    );
}

#[test]
fn clones_have_independent_cursors() {
    let (_, qs, _) = seeded_store();
    let mut it = qs.quads_all_iterator();
    assert!(it.next());
    assert!(it.next());
    let first_two = it.result().unwrap();

    let mut clone = it.clone_shape();
    for _ in 0..5 {
        assert!(clone.next());
    }
    // The original cursor is unmoved by the clone's progress.
    assert_eq!(it.result().unwrap(), first_two);
    assert!(it.next());
    assert_ne!(it.result(), None);
}

#[test]
fn sorted_intersection_merges_postings() {
    let (_, qs, _) = seeded_store();
    let b = qs.value_of(&raw("B")).unwrap();
    let status = qs.value_of(&raw("status")).unwrap();

    let mut and = And::new();
    and.add_sub_iterator(qs.quad_iterator(Direction::Subject, &b));
    and.add_sub_iterator(qs.quad_iterator(Direction::Predicate, &status));
    let (mut opt, _) = (Box::new(and) as Box<dyn Shape>).optimize();
    assert!(opt.sorted(), "posting-only intersection should merge");

    let mut got = Vec::new();
    while opt.next() {
        got.push(qs.quad(&opt.result().unwrap()).unwrap());
    }
    assert_eq!(got, vec![Quad::make("B", "status", "cool", "status_graph")]);
}

#[test]
fn describe_renders_the_tree() {
    let (_, qs, _) = seeded_store();
    let links = LinksTo::new(
        qs.clone(),
        fixed_for(qs.as_ref(), "cool"),
        Direction::Object,
    );
    let hasa = HasA::new(qs.clone(), Box::new(links), Direction::Subject);
    let desc = hasa.describe();
    assert_eq!(desc.typ, "hasa");
    assert_eq!(desc.name, "subject");
    assert_eq!(desc.sub.len(), 1);
    assert_eq!(desc.sub[0].typ, "linksto");
    assert_eq!(desc.sub[0].sub[0].typ, "fixed");
}
