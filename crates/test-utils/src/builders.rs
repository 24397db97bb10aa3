#![allow(dead_code)]

use std::collections::BTreeMap;

use manuallabour::dag::{Graph, GraphStep};
use manuallabour::model::{
    Object, RawFileReference, RawImageReference, RawObject, RawObjectReference, RawStep, Step,
    TimeSpan,
};

/// Builder for `Object` to simplify test setup.
pub struct ObjectBuilder {
    obj: RawObject,
}

impl ObjectBuilder {
    pub fn new(obj_id: &str, name: &str) -> Self {
        Self {
            obj: RawObject::new(obj_id, name),
        }
    }

    pub fn description(mut self, text: &str) -> Self {
        self.obj.description = Some(text.to_string());
        self
    }

    pub fn image(mut self, blob_id: &str, alt: &str, extension: &str) -> Self {
        self.obj.images.get_or_insert_with(Vec::new).push(RawImageReference {
            blob_id: blob_id.to_string(),
            alt: alt.to_string(),
            extension: extension.to_string(),
            sourcefiles: None,
        });
        self
    }

    pub fn raw(self) -> RawObject {
        self.obj
    }

    pub fn build(self) -> Object {
        Object::try_from(self.obj).expect("Failed to build valid object from builder")
    }
}

/// Builder for `ObjectReference` declarations.
pub struct RefBuilder {
    r: RawObjectReference,
}

impl RefBuilder {
    pub fn new(obj_id: &str) -> Self {
        Self {
            r: RawObjectReference::new(obj_id),
        }
    }

    pub fn quantity(mut self, q: u32) -> Self {
        self.r.quantity = Some(q);
        self
    }

    pub fn optional(mut self) -> Self {
        self.r.optional = Some(true);
        self
    }

    pub fn created(mut self) -> Self {
        self.r.created = Some(true);
        self
    }

    pub fn build(self) -> RawObjectReference {
        self.r
    }
}

/// Builder for `Step`.
pub struct StepBuilder {
    step: RawStep,
}

impl StepBuilder {
    pub fn new(step_id: &str, title: &str) -> Self {
        Self {
            step: RawStep::new(step_id, title, ""),
        }
    }

    pub fn description(mut self, text: &str) -> Self {
        self.step.description = text.to_string();
        self
    }

    pub fn minutes(mut self, minutes: u64) -> Self {
        self.step.duration = Some(TimeSpan::minutes(minutes));
        self
    }

    pub fn days(mut self, days: u64) -> Self {
        self.step.duration = Some(TimeSpan {
            days: Some(days),
            ..TimeSpan::default()
        });
        self
    }

    pub fn waiting_minutes(mut self, minutes: u64) -> Self {
        self.step.waiting = Some(TimeSpan::minutes(minutes));
        self
    }

    pub fn part(mut self, alias: &str, r: RefBuilder) -> Self {
        insert(&mut self.step.parts, alias, r.build());
        self
    }

    pub fn tool(mut self, alias: &str, r: RefBuilder) -> Self {
        insert(&mut self.step.tools, alias, r.build());
        self
    }

    pub fn result(mut self, alias: &str, r: RefBuilder) -> Self {
        insert(&mut self.step.results, alias, r.build());
        self
    }

    pub fn file(mut self, alias: &str, blob_id: &str, filename: &str) -> Self {
        let file = RawFileReference {
            blob_id: blob_id.to_string(),
            filename: filename.to_string(),
        };
        insert(&mut self.step.files, alias, file);
        self
    }

    pub fn image(mut self, alias: &str, image: RawImageReference) -> Self {
        insert(&mut self.step.images, alias, image);
        self
    }

    pub fn attention(mut self, text: &str) -> Self {
        self.step.attention = Some(text.to_string());
        self
    }

    pub fn raw(self) -> RawStep {
        self.step
    }

    pub fn build(self) -> Step {
        Step::try_from(self.step).expect("Failed to build valid step from builder")
    }
}

fn insert<T>(nsp: &mut Option<BTreeMap<String, T>>, alias: &str, value: T) {
    nsp.get_or_insert_with(BTreeMap::new)
        .insert(alias.to_string(), value);
}

/// Graph from `(step_id, requires)` pairs, in the given order.
pub fn graph(graph_id: &str, steps: &[(&str, &[&str])]) -> Graph {
    let steps = steps.iter().map(|(id, requires)| {
        GraphStep::new(*id, requires.iter().copied()).expect("valid graph step")
    });
    Graph::from_steps(graph_id, steps).expect("Failed to build valid graph")
}
