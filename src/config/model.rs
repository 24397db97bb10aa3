// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dag::{Graph, RawGraphStep, SchedulerKind};
use crate::logging::LogLevel;
use crate::model::{
    RawFileReference, RawImageReference, RawObject, RawObjectReference, RawStep, TimeSpan,
};
use crate::store::LocalMemoryStore;

/// Top-level manual as read from a TOML file.
///
/// ```toml
/// [config]
/// scheduler = "greedy"
/// targets = ["c"]
///
/// [blob.imb]
/// path = "img/a.png"
///
/// [object.ta]
/// name = "Tool A"
///
/// [step.a]
/// title = "First"
/// description = "Put it together"
/// duration = { minutes = 15 }
/// tools.hammer = { obj_id = "ta" }
///
/// [step.b]
/// title = "Second"
/// requires = ["a"]
/// ```
///
/// Table keys are the ids of the blobs, objects and steps.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawManualFile {
    /// Global options from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// `[blob.<blob_id>]`
    #[serde(default)]
    pub blob: BTreeMap<String, BlobConfig>,

    /// `[object.<obj_id>]`
    #[serde(default)]
    pub object: BTreeMap<String, ObjectConfig>,

    /// `[step.<step_id>]`
    #[serde(default)]
    pub step: BTreeMap<String, StepConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// `"greedy"` (default) or `"topological"`.
    #[serde(default)]
    pub scheduler: SchedulerKind,

    /// Steps the schedule has to reach. All steps if absent.
    #[serde(default)]
    pub targets: Option<Vec<String>>,

    #[serde(default = "default_graph_id")]
    pub graph_id: String,

    #[serde(default = "default_sched_id")]
    pub sched_id: String,

    /// Overrides `MANUALLABOUR_LOG` when set.
    #[serde(default)]
    pub log_level: Option<LogLevel>,
}

fn default_graph_id() -> String {
    "manual".to_string()
}

fn default_sched_id() -> String {
    "schedule".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            scheduler: SchedulerKind::default(),
            targets: None,
            graph_id: default_graph_id(),
            sched_id: default_sched_id(),
            log_level: None,
        }
    }
}

/// `[blob.<blob_id>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlobConfig {
    /// Relative paths are taken relative to the manual file.
    pub path: PathBuf,
}

/// `[object.<obj_id>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<RawImageReference>>,
}

impl ObjectConfig {
    pub fn to_raw(&self, obj_id: &str) -> RawObject {
        RawObject {
            obj_id: obj_id.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            images: self.images.clone(),
        }
    }
}

/// `[step.<step_id>]` section: the step content plus its place in the
/// graph.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    pub title: String,
    #[serde(default)]
    pub description: String,

    /// Steps that have to be done before this one.
    #[serde(default)]
    pub requires: Vec<String>,

    #[serde(default)]
    pub parts: Option<BTreeMap<String, RawObjectReference>>,
    #[serde(default)]
    pub tools: Option<BTreeMap<String, RawObjectReference>>,
    #[serde(default)]
    pub results: Option<BTreeMap<String, RawObjectReference>>,
    #[serde(default)]
    pub files: Option<BTreeMap<String, RawFileReference>>,
    #[serde(default)]
    pub images: Option<BTreeMap<String, RawImageReference>>,

    #[serde(default)]
    pub duration: Option<TimeSpan>,
    #[serde(default)]
    pub waiting: Option<TimeSpan>,
    #[serde(default)]
    pub attention: Option<String>,
    #[serde(default)]
    pub assertions: Option<Vec<String>>,
}

impl StepConfig {
    pub fn to_raw(&self, step_id: &str) -> RawStep {
        RawStep {
            step_id: step_id.to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            parts: self.parts.clone(),
            tools: self.tools.clone(),
            results: self.results.clone(),
            files: self.files.clone(),
            images: self.images.clone(),
            duration: self.duration,
            waiting: self.waiting,
            attention: self.attention.clone(),
            assertions: self.assertions.clone(),
        }
    }

    pub fn to_graph_step(&self, step_id: &str) -> RawGraphStep {
        RawGraphStep {
            step_id: step_id.to_string(),
            requires: (!self.requires.is_empty()).then(|| self.requires.clone()),
        }
    }

    /// Every obj_id referenced from one of the object namespaces.
    pub fn obj_ids(&self) -> impl Iterator<Item = &str> {
        [&self.parts, &self.tools, &self.results]
            .into_iter()
            .flatten()
            .flat_map(|nsp| nsp.values().map(|r| r.obj_id.as_str()))
    }

    /// Every blob_id referenced from files and images, including image
    /// source files.
    pub fn blob_ids(&self) -> impl Iterator<Item = &str> {
        let files = self
            .files
            .iter()
            .flat_map(|f| f.values().map(|r| r.blob_id.as_str()));
        let images = self
            .images
            .iter()
            .flat_map(|i| i.values())
            .flat_map(image_blob_ids);
        files.chain(images)
    }
}

pub(crate) fn image_blob_ids(img: &RawImageReference) -> impl Iterator<Item = &str> {
    std::iter::once(img.blob_id.as_str()).chain(
        img.sourcefiles
            .iter()
            .flatten()
            .map(|f| f.blob_id.as_str()),
    )
}

/// A validated manual: a populated store and the step graph over it.
#[derive(Debug, Clone)]
pub struct Manual {
    pub config: ConfigSection,
    pub store: LocalMemoryStore,
    pub graph: Graph,
    /// Directory relative blob paths were resolved against.
    pub base_dir: PathBuf,
}

impl Manual {
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
