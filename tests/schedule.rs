// tests/schedule.rs

use std::time::Duration;

use manuallabour::dag::{
    GraphStep, RawSchedule, RawScheduleStep, Schedule, ScheduleStep, StepTiming,
};
use manuallabour::errors::ManualError;
use manuallabour::model::{Dereference, TimeSpan};
use manuallabour::store::LocalMemoryStore;
use manuallabour_test_utils::builders::{ObjectBuilder, RefBuilder, StepBuilder};
use manuallabour_test_utils::fixtures::schedule_example;
use manuallabour_test_utils::init_tracing;

fn raw_step(step_id: &str, step_idx: usize) -> RawScheduleStep {
    RawScheduleStep {
        step_id: step_id.to_string(),
        requires: None,
        step_idx,
        start: None,
        stop: None,
    }
}

fn untimed_schedule(step_ids: &[&str]) -> Schedule {
    let steps = step_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| raw_step(id, idx))
        .collect();
    Schedule::try_from(RawSchedule {
        sched_id: "foobar".to_string(),
        steps,
    })
    .unwrap()
}

#[test]
fn schedule_step_numbers_and_timing() {
    let s = ScheduleStep::try_from(raw_step("rs9", 0)).unwrap();
    assert_eq!(s.step_nr(), 1);
    assert!(s.start().is_none());

    let s = ScheduleStep::try_from(RawScheduleStep {
        start: Some(TimeSpan::minutes(4)),
        stop: Some(TimeSpan::minutes(24)),
        ..raw_step("rs9", 0)
    })
    .unwrap();
    assert_eq!(s.start(), Some(Duration::from_secs(240)));
}

#[test]
fn schedule_step_needs_both_start_and_stop() {
    let raw = RawScheduleStep {
        start: Some(TimeSpan {
            hours: Some(2),
            ..TimeSpan::default()
        }),
        ..raw_step("a", 0)
    };
    assert!(matches!(
        ScheduleStep::try_from(raw),
        Err(ManualError::Validation { .. })
    ));
}

#[test]
fn schedule_step_stop_not_before_start() {
    let step = GraphStep::new("a", Vec::<String>::new()).unwrap();
    let timing = StepTiming {
        start: Duration::from_secs(60),
        stop: Duration::from_secs(30),
    };
    assert!(matches!(
        ScheduleStep::new(&step, 0, Some(timing)),
        Err(ManualError::Validation { .. })
    ));
}

#[test]
fn schedule_step_times_must_fit_a_duration() {
    let raw = RawScheduleStep {
        start: Some(TimeSpan::seconds(0)),
        stop: Some(TimeSpan {
            days: Some(u64::MAX),
            ..TimeSpan::default()
        }),
        ..raw_step("a", 0)
    };
    assert!(matches!(
        ScheduleStep::try_from(raw),
        Err(ManualError::Validation { .. })
    ));
}

#[test]
fn schedule_step_dereference() {
    init_tracing();
    let store = schedule_example();

    let step = ScheduleStep::try_from(RawScheduleStep {
        start: Some(TimeSpan {
            hours: Some(2),
            ..TimeSpan::default()
        }),
        stop: Some(TimeSpan {
            hours: Some(2),
            minutes: Some(15),
            ..TimeSpan::default()
        }),
        ..raw_step("a", 0)
    })
    .unwrap();
    let view = step.dereference(&store).unwrap();
    assert_eq!(view.step_idx, 0);
    assert_eq!(view.step.step.title, "First");
    assert_eq!(view.step.step.images[0].extension, ".png");

    let step = ScheduleStep::try_from(raw_step("b", 2)).unwrap();
    let view = step.dereference(&store).unwrap();
    assert_eq!(view.step_nr, 3);
    assert!(view.step.step.images.is_empty());
    assert!(view.stop.is_none());

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["step_nr"], 3);
    assert_eq!(json["title"], "Second");
    assert!(json["stop"].is_null());
}

#[test]
fn schedule_indices_must_match_positions() {
    let raw = RawSchedule {
        sched_id: "s".to_string(),
        steps: vec![raw_step("a", 0), raw_step("b", 2)],
    };
    assert!(matches!(
        Schedule::try_from(raw),
        Err(ManualError::Validation { .. })
    ));
}

#[test]
fn schedule_rejects_duplicate_steps() {
    let raw = RawSchedule {
        sched_id: "s".to_string(),
        steps: vec![raw_step("a", 0), raw_step("a", 1)],
    };
    assert!(matches!(
        Schedule::try_from(raw),
        Err(ManualError::DuplicateId { .. })
    ));
}

#[test]
fn bom_counts_peak_tools_and_summed_parts() {
    let store = schedule_example();
    let schedule = untimed_schedule(&["a", "b", "c"]);

    let bom = schedule.collect_bom(&store).unwrap();

    assert_eq!(bom.tools["ta"].quantity, 3);
    assert_eq!(bom.tools["ta"].optional, 0);

    // ra is produced in a and consumed in b
    assert!(!bom.parts.contains_key("ra"));
    assert_eq!(bom.parts["pa"].quantity, 5);
    assert_eq!(bom.parts["pa"].optional, 1);
}

#[test]
fn bom_counts_tools_produced_earlier() {
    let mut store = LocalMemoryStore::new();
    store
        .add_obj(ObjectBuilder::new("jig", "Drilling jig").build())
        .unwrap();
    store
        .add_obj(ObjectBuilder::new("board", "Board").build())
        .unwrap();
    store
        .add_step(
            StepBuilder::new("make", "Make a jig")
                .part("b", RefBuilder::new("board"))
                .result("j", RefBuilder::new("jig").created())
                .build(),
        )
        .unwrap();
    store
        .add_step(
            StepBuilder::new("drill", "Drill")
                .tool("j", RefBuilder::new("jig").quantity(2))
                .part("b", RefBuilder::new("board").quantity(2))
                .build(),
        )
        .unwrap();

    let bom = untimed_schedule(&["make", "drill"])
        .collect_bom(&store)
        .unwrap();

    // one jig comes out of `make`, the second one has to be bought
    assert_eq!(bom.tools["jig"].quantity, 1);
    assert!(!bom.parts.contains_key("jig"));
    assert_eq!(bom.parts["board"].quantity, 3);

    let view = bom.tools["jig"].dereference(&store).unwrap();
    assert_eq!(view.object.name, "Drilling jig");
    assert_eq!(view.quantity, 1);
}

#[test]
fn bom_keeps_tools_that_are_only_optional() {
    let mut store = LocalMemoryStore::new();
    store
        .add_obj(ObjectBuilder::new("clamp", "Clamp").build())
        .unwrap();
    store
        .add_step(
            StepBuilder::new("glue", "Glue")
                .tool("c", RefBuilder::new("clamp").quantity(2).optional())
                .build(),
        )
        .unwrap();

    let bom = untimed_schedule(&["glue"]).collect_bom(&store).unwrap();
    assert_eq!(bom.tools["clamp"].quantity, 0);
    assert_eq!(bom.tools["clamp"].optional, 2);
}

#[test]
fn collect_ids_of_schedule() {
    let store = schedule_example();
    let schedule = untimed_schedule(&["a", "b"]);

    let ids = schedule.collect_ids(&store).unwrap();
    assert_eq!(ids.sched_ids.len(), 1);
    assert!(ids.sched_ids.contains("foobar"));
    assert!(ids.graph_ids.is_empty());
    assert_eq!(ids.step_ids.len(), 2);
    assert_eq!(ids.blob_ids.len(), 4);
    assert_eq!(ids.obj_ids.len(), 3);
}

#[test]
fn collect_sourcefiles_of_schedule() {
    let store = schedule_example();
    let schedule = untimed_schedule(&["a", "b"]);

    let files = schedule.collect_sourcefiles(&store).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].blob_id, "rwth");
    assert_eq!(files[0].filename, "source.src");
    assert!(files[0].url.starts_with("file://"));
}

#[test]
fn schedule_serde_round_trip() {
    let store = schedule_example();
    let schedule = untimed_schedule(&["a", "b", "c"]);

    let json = serde_json::to_value(&schedule).unwrap();
    assert_eq!(json["sched_id"], "foobar");
    assert_eq!(json["steps"][2]["step_idx"], 2);

    let back: Schedule = serde_json::from_value(json).unwrap();
    assert_eq!(back, schedule);

    let views = back.dereference(&store).unwrap();
    assert_eq!(views.len(), 3);
    assert_eq!(views[2].step_nr, 3);
}
