// src/model/step.rs

//! A single unit of assembly work.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::{ManualError, Result};
use crate::model::checksum::{checksum_unordered, checksum_value};
use crate::model::ids::validate_step_id;
use crate::model::object::{ObjectRefView, ObjectReference, RawObjectReference};
use crate::model::resource::{
    FileReference, FileView, ImageReference, ImageView, RawFileReference, RawImageReference,
};
use crate::model::timespan::{self, TimeSpan};
use crate::model::Dereference;
use crate::store::Store;

/// Declared fields of a [`Step`].
///
/// Namespaces map a step-local alias to a reference. Aliases are only
/// meaningful inside the step (e.g. for `{{part(nut)}}` style markup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStep {
    pub step_id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<BTreeMap<String, RawObjectReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<BTreeMap<String, RawObjectReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<BTreeMap<String, RawObjectReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<String, RawFileReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<BTreeMap<String, RawImageReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<TimeSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting: Option<TimeSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attention: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertions: Option<Vec<String>>,
}

impl RawStep {
    pub fn new(
        step_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            title: title.into(),
            description: description.into(),
            parts: None,
            tools: None,
            results: None,
            files: None,
            images: None,
            duration: None,
            waiting: None,
            attention: None,
            assertions: None,
        }
    }
}

/// One step of the instructions.
///
/// Constructed once from validated input and never mutated afterwards.
/// `duration` is the time actively spent on the step, `waiting` the time
/// that has to pass afterwards before the results can be used (e.g. glue
/// curing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStep", into = "RawStep")]
pub struct Step {
    step_id: String,
    title: String,
    description: String,
    parts: BTreeMap<String, ObjectReference>,
    tools: BTreeMap<String, ObjectReference>,
    results: BTreeMap<String, ObjectReference>,
    files: BTreeMap<String, FileReference>,
    images: BTreeMap<String, ImageReference>,
    duration: Option<Duration>,
    waiting: Duration,
    attention: Option<String>,
    assertions: Vec<String>,
}

impl Step {
    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parts(&self) -> &BTreeMap<String, ObjectReference> {
        &self.parts
    }

    pub fn tools(&self) -> &BTreeMap<String, ObjectReference> {
        &self.tools
    }

    pub fn results(&self) -> &BTreeMap<String, ObjectReference> {
        &self.results
    }

    pub fn files(&self) -> &BTreeMap<String, FileReference> {
        &self.files
    }

    pub fn images(&self) -> &BTreeMap<String, ImageReference> {
        &self.images
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn waiting(&self) -> Duration {
        self.waiting
    }

    pub fn attention(&self) -> Option<&str> {
        self.attention.as_deref()
    }

    pub fn assertions(&self) -> &[String] {
        &self.assertions
    }

    /// Minimal declared form: empty namespaces, zero waiting time and
    /// missing optional fields are left out.
    pub fn declared(&self) -> RawStep {
        fn objs(
            m: &BTreeMap<String, ObjectReference>,
        ) -> Option<BTreeMap<String, RawObjectReference>> {
            (!m.is_empty()).then(|| m.iter().map(|(k, v)| (k.clone(), v.declared())).collect())
        }

        RawStep {
            step_id: self.step_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            parts: objs(&self.parts),
            tools: objs(&self.tools),
            results: objs(&self.results),
            files: (!self.files.is_empty()).then(|| {
                self.files
                    .iter()
                    .map(|(k, v)| (k.clone(), v.declared()))
                    .collect()
            }),
            images: (!self.images.is_empty()).then(|| {
                self.images
                    .iter()
                    .map(|(k, v)| (k.clone(), v.declared()))
                    .collect()
            }),
            duration: self.duration.map(TimeSpan::from_duration),
            waiting: (!self.waiting.is_zero()).then(|| TimeSpan::from_duration(self.waiting)),
            attention: self.attention.clone(),
            assertions: (!self.assertions.is_empty()).then(|| self.assertions.clone()),
        }
    }

    /// Content checksum over everything except `step_id`.
    ///
    /// Aliases do not enter the checksum: each namespace is hashed as an
    /// unordered collection of its references.
    pub fn checksum(&self) -> Result<String> {
        fn unordered<T: Serialize>(refs: impl Iterator<Item = T>) -> Result<String> {
            let values = refs
                .map(|r| serde_json::to_value(r))
                .collect::<std::result::Result<Vec<Value>, _>>()?;
            Ok(checksum_unordered(values.iter()))
        }

        let content = json!({
            "title": self.title,
            "description": self.description,
            "parts": unordered(self.parts.values().map(ObjectReference::declared))?,
            "tools": unordered(self.tools.values().map(ObjectReference::declared))?,
            "results": unordered(self.results.values().map(ObjectReference::declared))?,
            "files": unordered(self.files.values().map(FileReference::declared))?,
            "images": unordered(self.images.values().map(ImageReference::declared))?,
            "duration": self.duration.map(|d| d.as_secs()),
            "waiting": self.waiting.as_secs(),
            "attention": self.attention,
            "assertions": self.assertions,
        });
        Ok(checksum_value(&content))
    }
}

impl TryFrom<RawStep> for Step {
    type Error = ManualError;

    fn try_from(raw: RawStep) -> Result<Self> {
        let entity = format!("step '{}'", raw.step_id);

        if raw.title.trim().is_empty() {
            return Err(ManualError::validation(&entity, "title must not be empty"));
        }
        for (nsp, aliases) in [
            ("parts", raw.parts.as_ref().map(|m| m.keys().collect::<Vec<_>>())),
            ("tools", raw.tools.as_ref().map(|m| m.keys().collect())),
            ("results", raw.results.as_ref().map(|m| m.keys().collect())),
            ("files", raw.files.as_ref().map(|m| m.keys().collect())),
            ("images", raw.images.as_ref().map(|m| m.keys().collect())),
        ] {
            if aliases.unwrap_or_default().iter().any(|a| a.trim().is_empty()) {
                return Err(ManualError::validation(
                    &entity,
                    format!("empty alias in namespace '{nsp}'"),
                ));
            }
        }

        validate_step_id(&raw.step_id)?;

        let parts = convert_namespace(raw.parts, ObjectReference::try_from)?;
        let tools = convert_namespace(raw.tools, ObjectReference::try_from)?;
        let results = convert_namespace(raw.results, ObjectReference::try_from)?;
        let files = convert_namespace(raw.files, FileReference::try_from)?;
        let images = convert_namespace(raw.images, ImageReference::try_from)?;

        if let Some((alias, _)) = results.iter().find(|(_, r)| !r.created()) {
            return Err(ManualError::validation(
                &entity,
                format!("result '{alias}' must be marked as created"),
            ));
        }

        let too_long =
            |field: &str| ManualError::validation(&entity, format!("{field} is too long"));
        let duration = raw
            .duration
            .map(Duration::try_from)
            .transpose()
            .map_err(|_| too_long("duration"))?;
        let waiting = raw
            .waiting
            .map(Duration::try_from)
            .transpose()
            .map_err(|_| too_long("waiting"))?
            .unwrap_or_default();

        Ok(Self {
            step_id: raw.step_id,
            title: raw.title,
            description: raw.description,
            parts,
            tools,
            results,
            files,
            images,
            duration,
            waiting,
            attention: raw.attention,
            assertions: raw.assertions.unwrap_or_default(),
        })
    }
}

impl From<Step> for RawStep {
    fn from(s: Step) -> Self {
        s.declared()
    }
}

fn convert_namespace<R, T>(
    raw: Option<BTreeMap<String, R>>,
    convert: impl Fn(R) -> Result<T>,
) -> Result<BTreeMap<String, T>> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|(alias, r)| Ok((alias, convert(r)?)))
        .collect()
}

/// Fully resolved view of a [`Step`]. Namespaces are flattened into lists
/// ordered by alias; each entry keeps its alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub step_id: String,
    pub title: String,
    pub description: String,
    #[serde(with = "timespan::opt_secs")]
    pub duration: Option<Duration>,
    #[serde(with = "timespan::secs")]
    pub waiting: Duration,
    pub attention: Option<String>,
    pub assertions: Vec<String>,
    pub parts: Vec<ObjectRefView>,
    pub tools: Vec<ObjectRefView>,
    pub results: Vec<ObjectRefView>,
    pub files: Vec<FileView>,
    pub images: Vec<ImageView>,
}

impl Dereference for Step {
    type View = StepView;

    fn dereference(&self, store: &dyn Store) -> Result<StepView> {
        let objs = |m: &BTreeMap<String, ObjectReference>| -> Result<Vec<ObjectRefView>> {
            m.iter()
                .map(|(alias, r)| {
                    let mut view = r.dereference(store)?;
                    view.alias = Some(alias.clone());
                    Ok(view)
                })
                .collect()
        };

        let files = self
            .files
            .iter()
            .map(|(alias, r)| {
                let mut view = r.dereference(store)?;
                view.alias = Some(alias.clone());
                Ok(view)
            })
            .collect::<Result<Vec<_>>>()?;

        let images = self
            .images
            .iter()
            .map(|(alias, r)| {
                let mut view = r.dereference(store)?;
                view.alias = Some(alias.clone());
                Ok(view)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(StepView {
            step_id: self.step_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            duration: self.duration,
            waiting: self.waiting,
            attention: self.attention.clone(),
            assertions: self.assertions.clone(),
            parts: objs(&self.parts)?,
            tools: objs(&self.tools)?,
            results: objs(&self.results)?,
            files,
            images,
        })
    }
}
