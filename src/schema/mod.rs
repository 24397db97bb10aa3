// src/schema/mod.rs

//! JSON schema documents describing the entity model.
//!
//! Schemas may point into sibling files with `{"$ref": "common.json#/obj_ref"}`
//! (or into their own document with `"#/definitions/..."`). [`SchemaLoader`]
//! replaces every such node by the referenced sub-schema, so the loaded
//! document is self-contained. Keys written next to a `$ref` take precedence
//! over the keys of the referenced schema.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::{ManualError, Result};

const REF_KEY: &str = "$ref";

/// Directory of the schema files shipped with this crate.
pub fn bundled_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("schema")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Loads schema files from one directory and resolves their references.
///
/// Raw files and resolved reference targets are cached for the lifetime of
/// the loader.
#[derive(Debug)]
pub struct SchemaLoader {
    dir: PathBuf,
    files: HashMap<String, Value>,
    targets: HashMap<String, Value>,
}

impl SchemaLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: HashMap::new(),
            targets: HashMap::new(),
        }
    }

    /// Loader for [`bundled_dir`].
    pub fn bundled() -> Self {
        Self::new(bundled_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load `name` (e.g. `"step.json"`) with all references substituted.
    pub fn load(&mut self, name: &str) -> Result<Value> {
        check_file_name(name, name)?;
        let doc = self.file(name)?.clone();
        self.resolve_targets(refs_in(&doc, name)?)?;
        let resolved = substitute(doc, name, &self.targets)?;
        debug!(schema = %name, dir = ?self.dir, "loaded schema");
        Ok(resolved)
    }

    /// Load the sub-schema at `pointer` (e.g. `"/obj_ref"`) of `name`.
    pub fn load_part(&mut self, name: &str, pointer: &str) -> Result<Value> {
        let key = format!("{name}#{pointer}");
        check_file_name(name, &key)?;
        self.resolve_targets(vec![key.clone()])?;
        self.targets
            .get(&key)
            .cloned()
            .ok_or(ManualError::UnresolvedSchemaRef(key))
    }

    fn file(&mut self, name: &str) -> Result<&Value> {
        if !self.files.contains_key(name) {
            let path = self.dir.join(name);
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading schema file {:?}", path))?;
            let value: Value = serde_json::from_str(&text)?;
            self.files.insert(name.to_string(), value);
        }
        self.files
            .get(name)
            .ok_or_else(|| ManualError::UnresolvedSchemaRef(name.to_string()))
    }

    /// Raw (unsubstituted) value a reference key points at.
    fn raw_target(&mut self, key: &str) -> Result<Value> {
        let (file, pointer) = split_key(key);
        let doc = match self.file(file) {
            Ok(doc) => doc,
            Err(ManualError::Other(_)) | Err(ManualError::IoError(_)) => {
                return Err(ManualError::UnresolvedSchemaRef(key.to_string()));
            }
            Err(e) => return Err(e),
        };
        doc.pointer(pointer)
            .cloned()
            .ok_or_else(|| ManualError::UnresolvedSchemaRef(key.to_string()))
    }

    /// Resolve every reference target reachable from `roots`, depth first.
    ///
    /// A target is resolved once all targets it refers to are resolved.
    /// Meeting a target that is still on the current path is a cycle.
    fn resolve_targets(&mut self, roots: Vec<String>) -> Result<()> {
        let mut state: HashMap<String, Visit> = self
            .targets
            .keys()
            .map(|k| (k.clone(), Visit::Done))
            .collect();

        for root in roots {
            if state.contains_key(&root) {
                continue;
            }

            let raw = self.raw_target(&root)?;
            let deps = refs_in(&raw, split_key(&root).0)?;
            state.insert(root.clone(), Visit::InProgress);
            let mut stack: Vec<(String, Value, Vec<String>)> = vec![(root, raw, deps)];

            while let Some((key, _, deps)) = stack.last_mut() {
                let Some(dep) = deps.pop() else {
                    let Some((key, raw, _)) = stack.pop() else {
                        break;
                    };
                    let resolved = substitute(raw, split_key(&key).0, &self.targets)?;
                    self.targets.insert(key.clone(), resolved);
                    state.insert(key, Visit::Done);
                    continue;
                };

                match state.get(&dep).copied() {
                    Some(Visit::Done) => {}
                    Some(Visit::InProgress) => {
                        return Err(ManualError::CyclicSchemaRef(format!("{key} -> {dep}")));
                    }
                    None => {
                        let raw = self.raw_target(&dep)?;
                        let deps = refs_in(&raw, split_key(&dep).0)?;
                        state.insert(dep.clone(), Visit::InProgress);
                        stack.push((dep, raw, deps));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Property defaults declared in an object schema.
pub fn property_defaults(schema: &Value) -> Map<String, Value> {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .filter_map(|(name, prop)| Some((name.clone(), prop.get("default")?.clone())))
                .collect()
        })
        .unwrap_or_default()
}

fn split_key(key: &str) -> (&str, &str) {
    key.split_once('#').unwrap_or((key, ""))
}

fn check_file_name(file: &str, reference: &str) -> Result<()> {
    if file.is_empty() || file.contains('/') || file.contains('\\') || file.contains("..") {
        return Err(ManualError::UnresolvedSchemaRef(reference.to_string()));
    }
    Ok(())
}

/// Canonical `file#pointer` key of a `$ref` found in `current_file`.
fn ref_key(reference: &str, current_file: &str) -> Result<String> {
    let (file, pointer) = split_key(reference);
    let file = if file.is_empty() { current_file } else { file };
    check_file_name(file, reference)?;
    if !pointer.is_empty() && !pointer.starts_with('/') {
        return Err(ManualError::UnresolvedSchemaRef(reference.to_string()));
    }
    Ok(format!("{file}#{pointer}"))
}

/// All reference keys in `value`, without duplicates.
fn refs_in(value: &Value, current_file: &str) -> Result<Vec<String>> {
    let mut refs = Vec::new();
    let mut stack = vec![value];

    while let Some(node) = stack.pop() {
        match node {
            Value::Object(map) => {
                if let Some(r) = map.get(REF_KEY) {
                    let r = r
                        .as_str()
                        .ok_or_else(|| ManualError::UnresolvedSchemaRef(r.to_string()))?;
                    let key = ref_key(r, current_file)?;
                    if !refs.contains(&key) {
                        refs.push(key);
                    }
                }
                stack.extend(map.values());
            }
            Value::Array(items) => stack.extend(items),
            _ => {}
        }
    }

    Ok(refs)
}

/// Replace every `$ref` node in `value` by its resolved target.
fn substitute(
    mut value: Value,
    current_file: &str,
    targets: &HashMap<String, Value>,
) -> Result<Value> {
    let mut stack = vec![&mut value];

    while let Some(node) = stack.pop() {
        if let Value::Object(map) = &mut *node {
            if let Some(r) = map.remove(REF_KEY) {
                let reference = r.as_str().unwrap_or_default();
                let key = ref_key(reference, current_file)?;
                let target = targets
                    .get(&key)
                    .ok_or_else(|| ManualError::UnresolvedSchemaRef(key.clone()))?;
                match target {
                    Value::Object(target_map) => {
                        for (k, v) in target_map {
                            if !map.contains_key(k) {
                                map.insert(k.clone(), v.clone());
                            }
                        }
                    }
                    other => *node = other.clone(),
                }
            }
        }

        match node {
            Value::Object(map) => stack.extend(map.values_mut()),
            Value::Array(items) => stack.extend(items.iter_mut()),
            _ => {}
        }
    }

    Ok(value)
}
