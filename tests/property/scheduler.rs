// tests/property/scheduler.rs

use std::collections::{BTreeSet, HashMap};

use manuallabour::dag::{Graph, GraphStep, ScheduleStep, schedule_greedy, schedule_topological};
use manuallabour::store::LocalMemoryStore;
use manuallabour_test_utils::builders::StepBuilder;
use proptest::prelude::*;

#[derive(Debug)]
struct Case {
    store: LocalMemoryStore,
    graph: Graph,
}

// Acyclic by construction: step N may only require steps 0..N-1.
fn dag_strategy(max_steps: usize) -> impl Strategy<Value = Case> {
    (1..=max_steps).prop_flat_map(|num_steps| {
        let deps = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_steps),
            num_steps,
        );
        let durations = proptest::collection::vec((1..60u64, 0..30u64), num_steps);

        (deps, durations).prop_map(move |(raw_deps, durations)| {
            let mut store = LocalMemoryStore::new();
            let mut steps = Vec::with_capacity(num_steps);

            for (i, (potential, (minutes, waiting))) in
                raw_deps.into_iter().zip(durations).enumerate()
            {
                let id = format!("s{i}");
                // May name the same requirement more than once.
                let requires: Vec<String> = if i == 0 {
                    Vec::new()
                } else {
                    potential.into_iter().map(|d| format!("s{}", d % i)).collect()
                };
                let distinct: BTreeSet<&String> = requires.iter().collect();
                let expected_parents = distinct.len();

                store
                    .add_step(
                        StepBuilder::new(&id, "Step")
                            .minutes(minutes)
                            .waiting_minutes(waiting)
                            .build(),
                    )
                    .unwrap();
                let step = GraphStep::new(id, requires).unwrap();
                assert_eq!(step.requires().len(), expected_parents);
                steps.push(step);
            }

            // Insert in reverse so requirements are seen before their steps.
            steps.reverse();
            let graph = Graph::from_steps("prop", steps).unwrap();
            Case { store, graph }
        })
    })
}

fn check_order(graph: &Graph, steps: &[ScheduleStep]) -> Result<(), TestCaseError> {
    prop_assert_eq!(steps.len(), graph.len());

    let pos: HashMap<&str, usize> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| (s.step_id(), i))
        .collect();
    prop_assert_eq!(pos.len(), steps.len(), "a step was emitted twice");

    for (i, s) in steps.iter().enumerate() {
        prop_assert_eq!(s.step_idx(), i);
        for parent in graph.parents_of(s.step_id()).unwrap() {
            prop_assert!(pos[parent.as_str()] < i, "{} before its parent {}", s.step_id(), parent);
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn greedy_emits_every_step_after_its_parents(case in dag_strategy(12)) {
        let steps = schedule_greedy(&case.graph, &case.store, None).unwrap();
        check_order(&case.graph, &steps)?;

        let stop: HashMap<&str, _> = steps
            .iter()
            .map(|s| (s.step_id(), s.stop().unwrap()))
            .collect();
        for s in &steps {
            let start = s.start().unwrap();
            prop_assert!(s.stop().unwrap() >= start);
            for parent in case.graph.parents_of(s.step_id()).unwrap() {
                prop_assert!(start >= stop[parent.as_str()]);
            }
        }
    }

    #[test]
    fn topological_emits_every_step_after_its_parents(case in dag_strategy(12)) {
        let steps = schedule_topological(&case.graph, &case.store, None).unwrap();
        check_order(&case.graph, &steps)?;

        for pair in steps.windows(2) {
            prop_assert!(pair[0].stop().unwrap() <= pair[1].start().unwrap());
        }
    }

    #[test]
    fn targets_schedule_exactly_their_ancestors(case in dag_strategy(12), pick in any::<usize>()) {
        let ids: Vec<&str> = case.graph.step_ids().collect();
        let target = ids[pick % ids.len()];

        let mut expected = case.graph.all_ancestors(target).unwrap();
        expected.insert(target.to_string());

        let steps = schedule_topological(&case.graph, &case.store, Some(&[target])).unwrap();
        let got: BTreeSet<String> = steps.iter().map(|s| s.step_id().to_string()).collect();
        prop_assert_eq!(got, expected);
        prop_assert_eq!(steps.last().map(|s| s.step_id()), Some(target));
    }
}
