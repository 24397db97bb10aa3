// src/dag/mod.rs

//! Step graphs and the schedules derived from them.
//!
//! - [`graph`] holds steps and their `requires` relation.
//! - [`schedule`] is a total order over steps, with bill of materials.
//! - [`scheduler`] contains the greedy and topological list schedulers.

pub mod graph;
pub mod schedule;
pub mod scheduler;

pub use graph::{CollectedIds, Graph, GraphStep, GraphStepView, RawGraph, RawGraphStep};
pub use schedule::{
    Bom, RawSchedule, RawScheduleStep, Schedule, ScheduleStep, ScheduleStepView, StepTiming,
};
pub use scheduler::{SchedulerKind, plan, schedule_greedy, schedule_topological, working_set};
