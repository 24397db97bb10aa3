// src/dag/schedule.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dag::graph::{
    CollectedIds, GraphStep, GraphStepView, RawGraphStep, collect_ids_for_steps,
};
use crate::errors::{ManualError, Result};
use crate::model::ids::validate_step_id;
use crate::model::timespan::{self, TimeSpan};
use crate::model::{BomCount, BomReference, Dereference, FileView, ImageReference};
use crate::store::Store;

/// Start and stop of the active part of a step, as offsets from the start
/// of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTiming {
    pub start: Duration,
    pub stop: Duration,
}

/// Declared fields of a [`ScheduleStep`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawScheduleStep {
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<Vec<String>>,
    pub step_idx: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<TimeSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<TimeSpan>,
}

/// A [`GraphStep`] placed at a position (and optionally a time) in a
/// schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScheduleStep", into = "RawScheduleStep")]
pub struct ScheduleStep {
    step_id: String,
    requires: Vec<String>,
    step_idx: usize,
    timing: Option<StepTiming>,
}

impl ScheduleStep {
    pub fn new(step: &GraphStep, step_idx: usize, timing: Option<StepTiming>) -> Result<Self> {
        if let Some(t) = timing {
            check_timing(step.step_id(), t)?;
        }
        Ok(Self {
            step_id: step.step_id().to_string(),
            requires: step.requires().to_vec(),
            step_idx,
            timing,
        })
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// Position in the schedule, starting at 0.
    pub fn step_idx(&self) -> usize {
        self.step_idx
    }

    /// Human facing step number, starting at 1.
    pub fn step_nr(&self) -> usize {
        self.step_idx + 1
    }

    pub fn timing(&self) -> Option<StepTiming> {
        self.timing
    }

    pub fn start(&self) -> Option<Duration> {
        self.timing.map(|t| t.start)
    }

    pub fn stop(&self) -> Option<Duration> {
        self.timing.map(|t| t.stop)
    }

    pub fn declared(&self) -> RawScheduleStep {
        RawScheduleStep {
            step_id: self.step_id.clone(),
            requires: (!self.requires.is_empty()).then(|| self.requires.clone()),
            step_idx: self.step_idx,
            start: self.start().map(TimeSpan::from_duration),
            stop: self.stop().map(TimeSpan::from_duration),
        }
    }
}

fn check_timing(step_id: &str, t: StepTiming) -> Result<()> {
    if t.stop < t.start {
        return Err(ManualError::validation(
            format!("schedule step '{step_id}'"),
            "stop lies before start",
        ));
    }
    Ok(())
}

impl TryFrom<RawScheduleStep> for ScheduleStep {
    type Error = ManualError;

    fn try_from(raw: RawScheduleStep) -> Result<Self> {
        let timing = match (raw.start, raw.stop) {
            (Some(start), Some(stop)) => Some(StepTiming {
                start: start.to_duration()?,
                stop: stop.to_duration()?,
            }),
            (None, None) => None,
            _ => {
                return Err(ManualError::validation(
                    format!("schedule step '{}'", raw.step_id),
                    "start and stop must be given together",
                ));
            }
        };

        let step = GraphStep::try_from(RawGraphStep {
            step_id: raw.step_id,
            requires: raw.requires,
        })?;
        Self::new(&step, raw.step_idx, timing)
    }
}

impl From<ScheduleStep> for RawScheduleStep {
    fn from(s: ScheduleStep) -> Self {
        s.declared()
    }
}

/// Resolved view of a [`ScheduleStep`]. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleStepView {
    pub step_idx: usize,
    pub step_nr: usize,
    #[serde(with = "timespan::opt_secs")]
    pub start: Option<Duration>,
    #[serde(with = "timespan::opt_secs")]
    pub stop: Option<Duration>,
    #[serde(flatten)]
    pub step: GraphStepView,
}

impl Dereference for ScheduleStep {
    type View = ScheduleStepView;

    fn dereference(&self, store: &dyn Store) -> Result<ScheduleStepView> {
        let step = store.get_step(&self.step_id)?.dereference(store)?;
        Ok(ScheduleStepView {
            step_idx: self.step_idx,
            step_nr: self.step_nr(),
            start: self.start(),
            stop: self.stop(),
            step: GraphStepView {
                requires: self.requires.clone(),
                step,
            },
        })
    }
}

/// Aggregated parts and tools needed to work through a schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bom {
    pub tools: BTreeMap<String, BomReference>,
    pub parts: BTreeMap<String, BomReference>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    quantity: i64,
    optional: i64,
}

impl Tally {
    fn report(self) -> Option<BomCount> {
        if self.quantity <= 0 && self.optional <= 0 {
            return None;
        }
        let clamp = |v: i64| u32::try_from(v.max(0)).unwrap_or(u32::MAX);
        Some(BomCount {
            quantity: clamp(self.quantity),
            optional: clamp(self.optional),
        })
    }
}

/// Declared fields of a [`Schedule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSchedule {
    pub sched_id: String,
    #[serde(default)]
    pub steps: Vec<RawScheduleStep>,
}

/// A total order over a subset of a graph's steps, optionally timed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchedule", into = "RawSchedule")]
pub struct Schedule {
    sched_id: String,
    steps: Vec<ScheduleStep>,
    id_to_idx: HashMap<String, usize>,
}

impl Schedule {
    /// Build a schedule. Step indices must match positions and step ids
    /// must be unique.
    pub fn new(sched_id: impl Into<String>, steps: Vec<ScheduleStep>) -> Result<Self> {
        let sched_id = sched_id.into();
        let entity = format!("schedule '{sched_id}'");
        let mut id_to_idx = HashMap::with_capacity(steps.len());

        for (pos, step) in steps.iter().enumerate() {
            validate_step_id(step.step_id())?;
            if step.step_idx() != pos {
                return Err(ManualError::validation(
                    &entity,
                    format!(
                        "step '{}' has step_idx {} but is at position {}",
                        step.step_id(),
                        step.step_idx(),
                        pos
                    ),
                ));
            }
            if id_to_idx.insert(step.step_id().to_string(), pos).is_some() {
                return Err(ManualError::DuplicateId {
                    kind: "step",
                    container: "schedule",
                    id: step.step_id().to_string(),
                });
            }
        }

        Ok(Self {
            sched_id,
            steps,
            id_to_idx,
        })
    }

    pub fn sched_id(&self) -> &str {
        &self.sched_id
    }

    pub fn steps(&self) -> &[ScheduleStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.step_id())
    }

    /// Step number (1-based) of a step in this schedule.
    pub fn step_nr_of(&self, step_id: &str) -> Option<usize> {
        self.id_to_idx.get(step_id).map(|i| i + 1)
    }

    /// True iff every step carries start and stop times.
    pub fn is_timed(&self) -> bool {
        self.steps.iter().all(|s| s.timing().is_some())
    }

    /// Latest stop time, for timed schedules.
    pub fn end_time(&self) -> Option<Duration> {
        if !self.is_timed() {
            return None;
        }
        self.steps.iter().filter_map(|s| s.stop()).max()
    }

    /// Bill of materials for this schedule.
    ///
    /// Tools are reusable: the reported quantity is the peak number needed in
    /// a single step, minus what earlier steps produced. Parts are consumed:
    /// quantities add up over the schedule and every unit produced as a
    /// result (or created part) reduces the outstanding need. Objects whose
    /// net need is zero or negative are not reported.
    pub fn collect_bom(&self, store: &dyn Store) -> Result<Bom> {
        let mut tools: BTreeMap<String, Tally> = BTreeMap::new();
        let mut parts: BTreeMap<String, Tally> = BTreeMap::new();
        let mut produced: HashMap<String, i64> = HashMap::new();

        for sstep in &self.steps {
            let step = store.get_step(sstep.step_id())?;

            // Tool usage within this step.
            let mut usage: BTreeMap<&str, Tally> = BTreeMap::new();
            for tool in step.tools().values() {
                let entry = usage.entry(tool.obj_id()).or_default();
                let q = i64::from(tool.quantity());
                if tool.created() {
                    continue;
                } else if tool.optional() {
                    entry.optional += q;
                } else {
                    entry.quantity += q;
                }
            }
            for (obj_id, used) in usage {
                let available = produced.get(obj_id).copied().unwrap_or(0);
                let tally = tools.entry(obj_id.to_string()).or_default();
                tally.quantity = tally.quantity.max(used.quantity - available);
                tally.optional = tally.optional.max(used.optional);
            }

            for part in step.parts().values() {
                let tally = parts.entry(part.obj_id().to_string()).or_default();
                let q = i64::from(part.quantity());
                if part.created() {
                    tally.quantity -= q;
                } else if part.optional() {
                    tally.optional += q;
                } else {
                    tally.quantity += q;
                }
            }
            for result in step.results().values() {
                let tally = parts.entry(result.obj_id().to_string()).or_default();
                tally.quantity -= i64::from(result.quantity());
            }

            let created = step
                .tools()
                .values()
                .chain(step.parts().values())
                .chain(step.results().values())
                .filter(|r| r.created());
            for r in created {
                *produced.entry(r.obj_id().to_string()).or_default() += i64::from(r.quantity());
            }
        }

        let mut bom = Bom::default();
        for (obj_id, tally) in tools {
            if let Some(count) = tally.report() {
                bom.tools
                    .insert(obj_id.clone(), BomReference::new(obj_id, count)?);
            }
        }
        for (obj_id, tally) in parts {
            if let Some(count) = tally.report() {
                bom.parts
                    .insert(obj_id.clone(), BomReference::new(obj_id, count)?);
            }
        }

        debug!(
            sched = %self.sched_id,
            tools = bom.tools.len(),
            parts = bom.parts.len(),
            "collected bill of materials"
        );
        Ok(bom)
    }

    /// Ids of all steps, objects and blobs this schedule needs.
    pub fn collect_ids(&self, store: &dyn Store) -> Result<CollectedIds> {
        let mut ids = collect_ids_for_steps(self.step_ids(), store)?;
        ids.sched_ids.insert(self.sched_id.clone());
        Ok(ids)
    }

    /// Source files attached to images of the scheduled steps and of the
    /// objects they use, in schedule order and without duplicates.
    pub fn collect_sourcefiles(&self, store: &dyn Store) -> Result<Vec<FileView>> {
        let mut seen = BTreeSet::new();
        let mut files = Vec::new();

        let mut push_sources = |img: &ImageReference| -> Result<()> {
            for src in img.sourcefiles() {
                if seen.insert(src.blob_id().to_string()) {
                    files.push(src.dereference(store)?);
                }
            }
            Ok(())
        };

        for sstep in &self.steps {
            let step = store.get_step(sstep.step_id())?;
            for img in step.images().values() {
                push_sources(img)?;
            }
            for nsp in [step.parts(), step.tools(), step.results()] {
                for obj_ref in nsp.values() {
                    for img in store.get_obj(obj_ref.obj_id())?.images() {
                        push_sources(img)?;
                    }
                }
            }
        }

        Ok(files)
    }

    /// Resolve all steps against the store, in schedule order.
    pub fn dereference(&self, store: &dyn Store) -> Result<Vec<ScheduleStepView>> {
        self.steps.iter().map(|s| s.dereference(store)).collect()
    }

    pub fn declared(&self) -> RawSchedule {
        RawSchedule {
            sched_id: self.sched_id.clone(),
            steps: self.steps.iter().map(ScheduleStep::declared).collect(),
        }
    }
}

impl TryFrom<RawSchedule> for Schedule {
    type Error = ManualError;

    fn try_from(raw: RawSchedule) -> Result<Self> {
        let steps = raw
            .steps
            .into_iter()
            .map(ScheduleStep::try_from)
            .collect::<Result<Vec<_>>>()?;
        Schedule::new(raw.sched_id, steps)
    }
}

impl From<Schedule> for RawSchedule {
    fn from(s: Schedule) -> Self {
        s.declared()
    }
}
