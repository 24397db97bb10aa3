// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{ManualError, Result};
use crate::model::ids::validate_step_id;
use crate::model::{Dereference, StepView};
use crate::store::Store;

/// Declared fields of a [`GraphStep`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawGraphStep {
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<Vec<String>>,
}

/// Reference to a step in a store, plus the steps it requires.
///
/// The step content itself is only looked up on dereference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGraphStep", into = "RawGraphStep")]
pub struct GraphStep {
    step_id: String,
    requires: Vec<String>,
}

impl GraphStep {
    pub fn new<S: Into<String>>(
        step_id: impl Into<String>,
        requires: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        Self::try_from(RawGraphStep {
            step_id: step_id.into(),
            requires: Some(requires.into_iter().map(Into::into).collect()),
        })
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub fn declared(&self) -> RawGraphStep {
        RawGraphStep {
            step_id: self.step_id.clone(),
            requires: (!self.requires.is_empty()).then(|| self.requires.clone()),
        }
    }
}

impl TryFrom<RawGraphStep> for GraphStep {
    type Error = ManualError;

    fn try_from(raw: RawGraphStep) -> Result<Self> {
        validate_step_id(&raw.step_id)?;
        // Repeated requirements collapse to their first occurrence.
        let mut requires: Vec<String> = Vec::new();
        for req in raw.requires.unwrap_or_default() {
            validate_step_id(&req)?;
            if !requires.contains(&req) {
                requires.push(req);
            }
        }
        Ok(Self {
            step_id: raw.step_id,
            requires,
        })
    }
}

impl From<GraphStep> for RawGraphStep {
    fn from(s: GraphStep) -> Self {
        s.declared()
    }
}

/// Resolved view of a [`GraphStep`]: the step's content plus `requires`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphStepView {
    pub requires: Vec<String>,
    #[serde(flatten)]
    pub step: StepView,
}

impl Dereference for GraphStep {
    type View = GraphStepView;

    fn dereference(&self, store: &dyn Store) -> Result<GraphStepView> {
        let step = store.get_step(&self.step_id)?.dereference(store)?;
        Ok(GraphStepView {
            requires: self.requires.clone(),
            step,
        })
    }
}

/// Ids of everything a graph or schedule references, directly or through
/// the objects its steps use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectedIds {
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub graph_ids: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub sched_ids: BTreeSet<String>,
    pub step_ids: BTreeSet<String>,
    pub obj_ids: BTreeSet<String>,
    pub blob_ids: BTreeSet<String>,
}

/// Walk the given steps and collect the ids of the objects and blobs they
/// need, including object images and image source files.
pub(crate) fn collect_ids_for_steps<'a>(
    step_ids: impl IntoIterator<Item = &'a str>,
    store: &dyn Store,
) -> Result<CollectedIds> {
    let mut res = CollectedIds::default();

    for step_id in step_ids {
        res.step_ids.insert(step_id.to_string());
        let step = store.get_step(step_id)?;

        for img in step.images().values() {
            res.blob_ids.insert(img.blob_id().to_string());
            for src in img.sourcefiles() {
                res.blob_ids.insert(src.blob_id().to_string());
            }
        }
        for file in step.files().values() {
            res.blob_ids.insert(file.blob_id().to_string());
        }

        for nsp in [step.parts(), step.tools(), step.results()] {
            for obj in nsp.values() {
                res.obj_ids.insert(obj.obj_id().to_string());
            }
        }
    }

    for obj_id in &res.obj_ids {
        let obj = store.get_obj(obj_id)?;
        for img in obj.images() {
            res.blob_ids.insert(img.blob_id().to_string());
            for src in img.sourcefiles() {
                res.blob_ids.insert(src.blob_id().to_string());
            }
        }
    }

    Ok(res)
}

/// Declared fields of a [`Graph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawGraph {
    pub graph_id: String,
    #[serde(default)]
    pub steps: Vec<RawGraphStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Container for a set of dependent steps.
///
/// `parents` maps each step to the steps it requires, `children` the other
/// way round. Both are updated on every insert such that the final maps do
/// not depend on the order in which steps were added: a step that is
/// required before it is added already has a `children` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGraph", into = "RawGraph")]
pub struct Graph {
    graph_id: String,
    steps: Vec<GraphStep>,
    index: HashMap<String, usize>,
    parents: BTreeMap<String, Vec<String>>,
    children: BTreeMap<String, BTreeSet<String>>,
}

impl Graph {
    pub fn new(graph_id: impl Into<String>) -> Self {
        Self {
            graph_id: graph_id.into(),
            steps: Vec::new(),
            index: HashMap::new(),
            parents: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    /// Build a graph from a list of steps, failing on the first collision.
    pub fn from_steps(
        graph_id: impl Into<String>,
        steps: impl IntoIterator<Item = GraphStep>,
    ) -> Result<Self> {
        let mut graph = Self::new(graph_id);
        for step in steps {
            graph.add_step(step)?;
        }
        Ok(graph)
    }

    /// Insert a step and register its dependencies.
    ///
    /// A step id that is already present is rejected before any map is
    /// touched.
    pub fn add_step(&mut self, step: GraphStep) -> Result<()> {
        let step_id = step.step_id().to_string();
        if self.index.contains_key(&step_id) {
            return Err(ManualError::DuplicateId {
                kind: "step",
                container: "graph",
                id: step_id,
            });
        }

        self.parents
            .insert(step_id.clone(), step.requires().to_vec());
        self.children.entry(step_id.clone()).or_default();
        for req in step.requires() {
            self.children
                .entry(req.clone())
                .or_default()
                .insert(step_id.clone());
        }

        debug!(graph = %self.graph_id, step = %step_id, requires = ?step.requires(), "graph: added step");
        self.index.insert(step_id, self.steps.len());
        self.steps.push(step);
        Ok(())
    }

    pub fn graph_id(&self) -> &str {
        &self.graph_id
    }

    /// Steps in insertion order.
    pub fn steps(&self) -> &[GraphStep] {
        &self.steps
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.step_id())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn contains(&self, step_id: &str) -> bool {
        self.index.contains_key(step_id)
    }

    pub fn get(&self, step_id: &str) -> Option<&GraphStep> {
        self.index.get(step_id).map(|&i| &self.steps[i])
    }

    /// Direct prerequisites of a step.
    pub fn parents_of(&self, step_id: &str) -> Result<&[String]> {
        self.parents
            .get(step_id)
            .map(|p| p.as_slice())
            .ok_or_else(|| ManualError::not_found("step", step_id))
    }

    /// Steps that directly require `step_id`, sorted by id.
    ///
    /// Also answers for ids that are only known as somebody's requirement.
    pub fn children_of(&self, step_id: &str) -> Vec<&str> {
        self.children
            .get(step_id)
            .map(|c| c.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn parents(&self) -> &BTreeMap<String, Vec<String>> {
        &self.parents
    }

    pub fn children(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.children
    }

    /// Steps without prerequisites, in insertion order.
    pub fn roots(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.requires().is_empty())
            .map(|s| s.step_id())
            .collect()
    }

    /// All direct and indirect prerequisites of `step_id`.
    ///
    /// Iterative depth-first walk over `parents`. Reaching a step that is
    /// still on the current path means the requirements are cyclic.
    pub fn all_ancestors(&self, step_id: &str) -> Result<BTreeSet<String>> {
        let mut ancestors = BTreeSet::new();
        let mut state: HashMap<&str, Visit> = HashMap::new();
        let mut stack: Vec<(&str, usize)> = vec![(step_id, 0)];

        self.parents_of(step_id)?;
        state.insert(step_id, Visit::InProgress);

        while let Some(&(node, idx)) = stack.last() {
            let parents = self.parents_of(node)?;
            if idx >= parents.len() {
                state.insert(node, Visit::Done);
                stack.pop();
                continue;
            }
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            let parent = parents[idx].as_str();
            match state.get(parent).copied() {
                Some(Visit::InProgress) => {
                    return Err(ManualError::CyclicDependency(parent.to_string()));
                }
                Some(Visit::Done) => {}
                None => {
                    ancestors.insert(parent.to_string());
                    state.insert(parent, Visit::InProgress);
                    stack.push((parent, 0));
                }
            }
        }

        Ok(ancestors)
    }

    /// Check that every requirement names a step of this graph.
    pub fn check_requirements(&self) -> Result<()> {
        for step in &self.steps {
            for req in step.requires() {
                if !self.contains(req) {
                    return Err(ManualError::not_found("step", req.clone()));
                }
            }
        }
        Ok(())
    }

    /// Whole-graph cycle check.
    pub fn check_acyclic(&self) -> Result<()> {
        // Edge direction: requirement -> step.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for step in &self.steps {
            graph.add_node(step.step_id());
        }
        for step in &self.steps {
            for req in step.requires() {
                graph.add_edge(req.as_str(), step.step_id(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(ManualError::CyclicDependency(cycle.node_id().to_string())),
        }
    }

    /// True iff every step of the graph has a duration.
    pub fn is_timed(&self, store: &dyn Store) -> Result<bool> {
        for step in &self.steps {
            if store.get_step(step.step_id())?.duration().is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Ids of all steps, objects and blobs this graph needs, e.g. to
    /// package only the relevant part of a store.
    pub fn collect_ids(&self, store: &dyn Store) -> Result<CollectedIds> {
        let mut ids = collect_ids_for_steps(self.step_ids(), store)?;
        ids.graph_ids.insert(self.graph_id.clone());
        Ok(ids)
    }

    /// Resolve all steps against the store, in insertion order.
    pub fn dereference(&self, store: &dyn Store) -> Result<Vec<GraphStepView>> {
        self.steps.iter().map(|s| s.dereference(store)).collect()
    }

    pub fn declared(&self) -> RawGraph {
        RawGraph {
            graph_id: self.graph_id.clone(),
            steps: self.steps.iter().map(GraphStep::declared).collect(),
        }
    }
}

impl TryFrom<RawGraph> for Graph {
    type Error = ManualError;

    fn try_from(raw: RawGraph) -> Result<Self> {
        let steps = raw
            .steps
            .into_iter()
            .map(GraphStep::try_from)
            .collect::<Result<Vec<_>>>()?;
        Graph::from_steps(raw.graph_id, steps)
    }
}

impl From<Graph> for RawGraph {
    fn from(g: Graph) -> Self {
        g.declared()
    }
}
