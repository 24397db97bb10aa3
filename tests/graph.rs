// tests/graph.rs

use std::collections::BTreeSet;

use manuallabour::dag::{Graph, GraphStep};
use manuallabour::errors::ManualError;
use manuallabour_test_utils::builders::graph;
use manuallabour_test_utils::fixtures::schedule_example;
use manuallabour_test_utils::init_tracing;

fn set(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn parents_and_children_are_tracked() {
    init_tracing();

    // a -> b -> c, a -> d
    let g = graph("g", &[("a", &[]), ("b", &["a"]), ("c", &["b"]), ("d", &["a"])]);

    assert_eq!(g.parents_of("b").unwrap(), ["a".to_string()]);
    assert!(g.parents_of("a").unwrap().is_empty());
    assert_eq!(g.children_of("a"), vec!["b", "d"]);
    assert!(g.children_of("c").is_empty());
    assert_eq!(g.roots(), vec!["a"]);
    assert_eq!(g.len(), 4);
}

#[test]
fn maps_do_not_depend_on_insertion_order() {
    let forward = graph("g", &[("a", &[]), ("b", &["a"]), ("c", &["a", "b"])]);
    let backward = graph("g", &[("c", &["a", "b"]), ("b", &["a"]), ("a", &[])]);

    assert_eq!(forward.parents(), backward.parents());
    assert_eq!(forward.children(), backward.children());
}

#[test]
fn duplicate_step_is_rejected_without_mutation() {
    let mut g = graph("g", &[("a", &[]), ("b", &["a"])]);
    let before = g.clone();

    let dup = GraphStep::new("b", ["c"]).unwrap();
    match g.add_step(dup) {
        Err(ManualError::DuplicateId { kind, container, id }) => {
            assert_eq!(kind, "step");
            assert_eq!(container, "graph");
            assert_eq!(id, "b");
        }
        other => panic!("expected DuplicateId, got {:?}", other),
    }

    assert_eq!(g, before);
    assert!(g.children_of("c").is_empty());
}

#[test]
fn graph_step_ids_are_validated() {
    assert!(matches!(
        GraphStep::new("a", ["1b"]),
        Err(ManualError::InvalidIdentifier { .. })
    ));
}

#[test]
fn all_ancestors_is_transitive() {
    let g = graph(
        "g",
        &[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["b"]),
            ("d", &["a"]),
            ("e", &["c", "d"]),
        ],
    );

    assert_eq!(g.all_ancestors("e").unwrap(), set(&["a", "b", "c", "d"]));
    assert_eq!(g.all_ancestors("c").unwrap(), set(&["a", "b"]));
    assert!(g.all_ancestors("a").unwrap().is_empty());
}

#[test]
fn all_ancestors_of_unknown_step_fails() {
    let g = graph("g", &[("a", &[])]);
    assert!(matches!(
        g.all_ancestors("zz"),
        Err(ManualError::NotFound { .. })
    ));

    // `b` requires a step that was never added.
    let g = graph("g", &[("b", &["ghost"])]);
    match g.all_ancestors("b") {
        Err(ManualError::NotFound { id, .. }) => assert_eq!(id, "ghost"),
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert!(matches!(
        g.check_requirements(),
        Err(ManualError::NotFound { .. })
    ));
}

#[test]
fn cycles_are_detected() {
    let g = graph("g", &[("a", &["c"]), ("b", &["a"]), ("c", &["b"]), ("d", &[])]);

    assert!(matches!(
        g.all_ancestors("b"),
        Err(ManualError::CyclicDependency(_))
    ));
    assert!(matches!(
        g.check_acyclic(),
        Err(ManualError::CyclicDependency(_))
    ));
    assert!(g.all_ancestors("d").unwrap().is_empty());

    let ok = graph("g", &[("a", &[]), ("b", &["a"])]);
    assert!(ok.check_acyclic().is_ok());
}

#[test]
fn collect_ids_includes_object_images_and_sourcefiles() {
    let store = schedule_example();
    let g = graph("g", &[("a", &[]), ("b", &["a"])]);

    let ids = g.collect_ids(&store).unwrap();
    assert_eq!(ids.graph_ids, set(&["g"]));
    assert!(ids.sched_ids.is_empty());
    assert_eq!(ids.step_ids, set(&["a", "b"]));
    assert_eq!(ids.obj_ids, set(&["pa", "ra", "ta"]));
    assert_eq!(ids.blob_ids, set(&["fb", "imb", "imb2", "rwth"]));
}

#[test]
fn timing_of_the_whole_graph() {
    let store = schedule_example();

    let timed = graph("g", &[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
    assert!(timed.is_timed(&store).unwrap());

    let untimed = graph("g", &[("a", &[]), ("d", &["a"])]);
    assert!(!untimed.is_timed(&store).unwrap());
}

#[test]
fn dereference_keeps_requires() {
    let store = schedule_example();
    let g = graph("g", &[("a", &[]), ("b", &["a"])]);

    let views = g.dereference(&store).unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[1].requires, vec!["a".to_string()]);
    assert_eq!(views[1].step.title, "Second");

    let json = serde_json::to_value(&views[1]).unwrap();
    assert_eq!(json["requires"][0], "a");
    assert_eq!(json["step_id"], "b");
}

#[test]
fn graph_serde_round_trip() {
    let g = graph("foobar", &[("a", &[]), ("b", &["a"])]);

    let json = serde_json::to_value(&g).unwrap();
    assert_eq!(json["graph_id"], "foobar");
    assert!(json["steps"][0].get("requires").is_none());

    let back: Graph = serde_json::from_value(json).unwrap();
    assert_eq!(back, g);
}

#[test]
fn graph_deserialization_rejects_duplicates() {
    let json = r#"{"graph_id":"g","steps":[{"step_id":"a"},{"step_id":"a"}]}"#;
    assert!(serde_json::from_str::<Graph>(json).is_err());
}
