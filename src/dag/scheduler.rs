// src/dag/scheduler.rs

//! List schedulers that turn a [`Graph`] into an ordered list of
//! [`ScheduleStep`]s.
//!
//! Both schedulers work on the same working set: every step of the graph,
//! or the given targets together with all their ancestors.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dag::graph::Graph;
use crate::dag::schedule::{Schedule, ScheduleStep, StepTiming};
use crate::errors::{ManualError, Result};
use crate::store::Store;

/// Steps that have to be scheduled to reach `targets`, or all steps.
pub fn working_set(graph: &Graph, targets: Option<&[&str]>) -> Result<BTreeSet<String>> {
    match targets {
        None => {
            graph.check_requirements()?;
            Ok(graph.step_ids().map(str::to_string).collect())
        }
        Some(targets) => {
            let mut work = BTreeSet::new();
            for &target in targets {
                if !graph.contains(target) {
                    return Err(ManualError::not_found("step", target));
                }
                work.extend(graph.all_ancestors(target)?);
                work.insert(target.to_string());
            }
            Ok(work)
        }
    }
}

fn graph_step_at(
    graph: &Graph,
    step_id: &str,
    step_idx: usize,
    timing: Option<StepTiming>,
) -> Result<ScheduleStep> {
    let step = graph
        .get(step_id)
        .ok_or_else(|| ManualError::not_found("step", step_id))?;
    ScheduleStep::new(step, step_idx, timing)
}

fn add_time(a: Duration, b: Duration, step_id: &str) -> Result<Duration> {
    a.checked_add(b)
        .ok_or_else(|| ManualError::TimeOverflow(step_id.to_string()))
}

/// First unscheduled step, used to report a stuck scheduler.
fn first_unscheduled(work: &BTreeSet<String>, is_done: impl Fn(&str) -> bool) -> ManualError {
    let id = work
        .iter()
        .find(|id| !is_done(id))
        .map(String::as_str)
        .unwrap_or_default();
    ManualError::CyclicDependency(id.to_string())
}

/// Greedy list scheduler.
///
/// At each iteration every ready step is given a candidate start at the
/// later of the current time and the end of its parents' waiting periods.
/// The candidate with the earliest stop wins; ties go to the lowest step
/// id. Steps whose results still have to wait can thereby be interleaved
/// with unrelated work.
///
/// Every step in the working set needs a duration. Tool availability is
/// not modelled, so the resulting makespan is a lower bound. Times that do
/// not fit a `Duration` fail with `TimeOverflow`.
pub fn schedule_greedy(
    graph: &Graph,
    store: &dyn Store,
    targets: Option<&[&str]>,
) -> Result<Vec<ScheduleStep>> {
    let work = working_set(graph, targets)?;

    let mut timing: HashMap<&str, (Duration, Duration)> = HashMap::with_capacity(work.len());
    for step_id in &work {
        let step = store.get_step(step_id)?;
        let duration = step
            .duration()
            .ok_or_else(|| ManualError::MissingTiming(step_id.clone()))?;
        timing.insert(step_id.as_str(), (duration, step.waiting()));
    }

    let mut steps = Vec::with_capacity(work.len());
    // step_id -> end of its waiting period
    let mut wait_end: HashMap<&str, Duration> = HashMap::with_capacity(work.len());
    let mut time = Duration::ZERO;

    while steps.len() < work.len() {
        let mut best: Option<(&str, StepTiming)> = None;

        for step_id in &work {
            if wait_end.contains_key(step_id.as_str()) {
                continue;
            }
            let parents = graph.parents_of(step_id)?;
            if !parents.iter().all(|p| wait_end.contains_key(p.as_str())) {
                continue;
            }

            let start = parents
                .iter()
                .filter_map(|p| wait_end.get(p.as_str()).copied())
                .fold(time, Duration::max);
            let stop = add_time(start, timing[step_id.as_str()].0, step_id)?;

            if best.is_none_or(|(_, b)| stop < b.stop) {
                best = Some((step_id.as_str(), StepTiming { start, stop }));
            }
        }

        let Some((step_id, chosen)) = best else {
            return Err(first_unscheduled(&work, |id| wait_end.contains_key(id)));
        };

        debug!(
            step = %step_id,
            start = chosen.start.as_secs(),
            stop = chosen.stop.as_secs(),
            "greedy: scheduled step"
        );
        time = chosen.stop;
        wait_end.insert(step_id, add_time(chosen.stop, timing[step_id].1, step_id)?);
        steps.push(graph_step_at(graph, step_id, steps.len(), Some(chosen))?);
    }

    info!(graph = %graph.graph_id(), steps = steps.len(), "greedy schedule complete");
    Ok(steps)
}

/// Topological scheduler.
///
/// Emits ready steps in order of their step id. If every step in the
/// working set has a duration the steps are laid out back to back, each
/// followed by its waiting time; otherwise the schedule is untimed.
pub fn schedule_topological(
    graph: &Graph,
    store: &dyn Store,
    targets: Option<&[&str]>,
) -> Result<Vec<ScheduleStep>> {
    let work = working_set(graph, targets)?;

    let mut timing: BTreeMap<&str, (Duration, Duration)> = BTreeMap::new();
    let mut timed = true;
    for step_id in &work {
        let step = store.get_step(step_id)?;
        match step.duration() {
            Some(duration) => {
                timing.insert(step_id.as_str(), (duration, step.waiting()));
            }
            None => timed = false,
        }
    }

    let mut pending: HashMap<&str, usize> = HashMap::with_capacity(work.len());
    for step_id in &work {
        pending.insert(step_id.as_str(), graph.parents_of(step_id)?.len());
    }
    let mut ready: BTreeSet<&str> = pending
        .iter()
        .filter(|&(_, &n)| n == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut steps = Vec::with_capacity(work.len());
    let mut emitted: BTreeSet<&str> = BTreeSet::new();
    let mut time = Duration::ZERO;

    while let Some(step_id) = ready.pop_first() {
        let step_timing = if timed {
            let (duration, waiting) = timing[step_id];
            let start = time;
            let stop = add_time(start, duration, step_id)?;
            time = add_time(stop, waiting, step_id)?;
            Some(StepTiming { start, stop })
        } else {
            None
        };

        debug!(step = %step_id, timed, "topological: scheduled step");
        steps.push(graph_step_at(graph, step_id, steps.len(), step_timing)?);
        emitted.insert(step_id);

        for child in graph.children_of(step_id) {
            if let Some(n) = pending.get_mut(child) {
                *n -= 1;
                if *n == 0 {
                    ready.insert(child);
                }
            }
        }
    }

    if steps.len() < work.len() {
        return Err(first_unscheduled(&work, |id| emitted.contains(id)));
    }

    info!(graph = %graph.graph_id(), steps = steps.len(), timed, "topological schedule complete");
    Ok(steps)
}

/// Which scheduler to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    #[default]
    Greedy,
    Topological,
}

impl SchedulerKind {
    pub fn schedule(
        self,
        graph: &Graph,
        store: &dyn Store,
        targets: Option<&[&str]>,
    ) -> Result<Vec<ScheduleStep>> {
        match self {
            SchedulerKind::Greedy => schedule_greedy(graph, store, targets),
            SchedulerKind::Topological => schedule_topological(graph, store, targets),
        }
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerKind::Greedy => write!(f, "greedy"),
            SchedulerKind::Topological => write!(f, "topological"),
        }
    }
}

impl FromStr for SchedulerKind {
    type Err = ManualError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "greedy" => Ok(SchedulerKind::Greedy),
            "topological" => Ok(SchedulerKind::Topological),
            other => Err(ManualError::ConfigError(format!(
                "unknown scheduler '{other}' (expected 'greedy' or 'topological')"
            ))),
        }
    }
}

/// Run a scheduler and wrap its output in a [`Schedule`].
pub fn plan(
    graph: &Graph,
    store: &dyn Store,
    kind: SchedulerKind,
    targets: Option<&[&str]>,
    sched_id: impl Into<String>,
) -> Result<Schedule> {
    let steps = kind.schedule(graph, store, targets)?;
    Schedule::new(sched_id, steps)
}
