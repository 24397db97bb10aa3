// src/store/memory.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::errors::{ManualError, Result};
use crate::model::ids::validate_blob_id;
use crate::model::{Object, Step};
use crate::store::Store;

/// Store that keeps steps and objects in memory and refers to blobs by
/// their absolute path on the local file system.
///
/// Inserts check for collisions before touching any map, so a rejected
/// insert leaves the store unchanged.
#[derive(Debug, Clone, Default)]
pub struct LocalMemoryStore {
    objects: BTreeMap<String, Object>,
    steps: BTreeMap<String, Step>,
    paths: BTreeMap<String, PathBuf>,
}

impl LocalMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blob by its path. The path is made absolute but not
    /// required to exist.
    pub fn add_blob(&mut self, blob_id: &str, path: impl AsRef<Path>) -> Result<()> {
        validate_blob_id(blob_id)?;
        if self.paths.contains_key(blob_id) {
            return Err(ManualError::DuplicateId {
                kind: "blob",
                container: "store",
                id: blob_id.to_string(),
            });
        }
        let path = path.as_ref();
        let abs = std::path::absolute(path)
            .with_context(|| format!("resolving absolute path of blob {:?}", path))?;

        debug!(blob = %blob_id, path = ?abs, "store: added blob");
        self.paths.insert(blob_id.to_string(), abs);
        Ok(())
    }

    /// Local path of a blob, if known.
    pub fn blob_path(&self, blob_id: &str) -> Option<&Path> {
        self.paths.get(blob_id).map(|p| p.as_path())
    }

    pub fn add_obj(&mut self, obj: Object) -> Result<()> {
        if self.objects.contains_key(obj.obj_id()) {
            return Err(ManualError::DuplicateId {
                kind: "object",
                container: "store",
                id: obj.obj_id().to_string(),
            });
        }
        debug!(obj = %obj.obj_id(), "store: added object");
        self.objects.insert(obj.obj_id().to_string(), obj);
        Ok(())
    }

    pub fn add_step(&mut self, step: Step) -> Result<()> {
        if self.steps.contains_key(step.step_id()) {
            return Err(ManualError::DuplicateId {
                kind: "step",
                container: "store",
                id: step.step_id().to_string(),
            });
        }
        debug!(step = %step.step_id(), "store: added step");
        self.steps.insert(step.step_id().to_string(), step);
        Ok(())
    }
}

impl Store for LocalMemoryStore {
    fn has_blob(&self, blob_id: &str) -> bool {
        self.paths.contains_key(blob_id)
    }

    fn get_blob_url(&self, blob_id: &str) -> Result<String> {
        let path = self
            .paths
            .get(blob_id)
            .ok_or_else(|| ManualError::not_found("blob", blob_id))?;
        Ok(format!("file://{}", path.display()))
    }

    fn iter_blob(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.paths.keys().map(|k| k.as_str()))
    }

    fn has_obj(&self, obj_id: &str) -> bool {
        self.objects.contains_key(obj_id)
    }

    fn get_obj(&self, obj_id: &str) -> Result<&Object> {
        self.objects
            .get(obj_id)
            .ok_or_else(|| ManualError::not_found("object", obj_id))
    }

    fn iter_obj(&self) -> Box<dyn Iterator<Item = (&str, &Object)> + '_> {
        Box::new(self.objects.iter().map(|(k, v)| (k.as_str(), v)))
    }

    fn has_step(&self, step_id: &str) -> bool {
        self.steps.contains_key(step_id)
    }

    fn get_step(&self, step_id: &str) -> Result<&Step> {
        self.steps
            .get(step_id)
            .ok_or_else(|| ManualError::not_found("step", step_id))
    }

    fn iter_step(&self) -> Box<dyn Iterator<Item = (&str, &Step)> + '_> {
        Box::new(self.steps.iter().map(|(k, v)| (k.as_str(), v)))
    }
}
