// src/config/validate.rs

use std::collections::BTreeSet;
use std::path::Path;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::model::{Manual, RawManualFile, image_blob_ids};
use crate::dag::{Graph, GraphStep};
use crate::errors::{ManualError, Result};
use crate::model::{Object, Step};
use crate::store::LocalMemoryStore;

impl TryFrom<RawManualFile> for Manual {
    type Error = ManualError;

    /// Relative blob paths are resolved against the working directory.
    fn try_from(raw: RawManualFile) -> Result<Self> {
        Manual::from_raw(raw, Path::new("."))
    }
}

impl Manual {
    /// Validate a parsed manual and build its store and graph.
    ///
    /// Cycles are rejected by [`validate_manual`] before anything is built.
    pub fn from_raw(raw: RawManualFile, base_dir: &Path) -> Result<Self> {
        validate_manual(&raw)?;

        let mut store = LocalMemoryStore::new();
        for (blob_id, blob) in &raw.blob {
            store.add_blob(blob_id, base_dir.join(&blob.path))?;
        }
        for (obj_id, obj) in &raw.object {
            store.add_obj(Object::try_from(obj.to_raw(obj_id))?)?;
        }

        let mut graph = Graph::new(raw.config.graph_id.clone());
        for (step_id, step) in &raw.step {
            store.add_step(Step::try_from(step.to_raw(step_id))?)?;
            graph.add_step(GraphStep::try_from(step.to_graph_step(step_id))?)?;
        }

        debug!(
            graph = %graph.graph_id(),
            steps = graph.len(),
            "manual: built store and graph"
        );
        Ok(Manual {
            config: raw.config,
            store,
            graph,
            base_dir: base_dir.to_path_buf(),
        })
    }
}

/// Semantic checks on a parsed manual that serde can not express.
pub fn validate_manual(raw: &RawManualFile) -> Result<()> {
    ensure_has_steps(raw)?;
    validate_step_dependencies(raw)?;
    validate_references(raw)?;
    validate_targets(raw)?;
    validate_dag(raw)?;
    Ok(())
}

fn ensure_has_steps(raw: &RawManualFile) -> Result<()> {
    if raw.step.is_empty() {
        return Err(ManualError::ConfigError(
            "manual must contain at least one [step.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_step_dependencies(raw: &RawManualFile) -> Result<()> {
    for (step_id, step) in &raw.step {
        for dep in &step.requires {
            if dep == step_id {
                return Err(ManualError::ConfigError(format!(
                    "step '{step_id}' cannot require itself"
                )));
            }
            if !raw.step.contains_key(dep) {
                return Err(ManualError::ConfigError(format!(
                    "step '{step_id}' requires unknown step '{dep}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_references(raw: &RawManualFile) -> Result<()> {
    for (step_id, step) in &raw.step {
        for obj_id in step.obj_ids() {
            if !raw.object.contains_key(obj_id) {
                return Err(ManualError::ConfigError(format!(
                    "step '{step_id}' references unknown object '{obj_id}'"
                )));
            }
        }
        for blob_id in step.blob_ids() {
            if !raw.blob.contains_key(blob_id) {
                return Err(ManualError::ConfigError(format!(
                    "step '{step_id}' references unknown blob '{blob_id}'"
                )));
            }
        }
    }

    for (obj_id, obj) in &raw.object {
        let blob_ids = obj.images.iter().flatten().flat_map(image_blob_ids);
        for blob_id in blob_ids {
            if !raw.blob.contains_key(blob_id) {
                return Err(ManualError::ConfigError(format!(
                    "object '{obj_id}' references unknown blob '{blob_id}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_targets(raw: &RawManualFile) -> Result<()> {
    let Some(targets) = &raw.config.targets else {
        return Ok(());
    };
    let mut seen = BTreeSet::new();
    for target in targets {
        if !raw.step.contains_key(target) {
            return Err(ManualError::ConfigError(format!(
                "[config].targets names unknown step '{target}'"
            )));
        }
        if !seen.insert(target) {
            return Err(ManualError::ConfigError(format!(
                "[config].targets lists '{target}' twice"
            )));
        }
    }
    Ok(())
}

fn validate_dag(raw: &RawManualFile) -> Result<()> {
    // Edge direction: requirement -> step.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for step_id in raw.step.keys() {
        graph.add_node(step_id.as_str());
    }
    for (step_id, step) in &raw.step {
        for dep in &step.requires {
            graph.add_edge(dep.as_str(), step_id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(ManualError::CyclicDependency(cycle.node_id().to_string())),
    }
}
