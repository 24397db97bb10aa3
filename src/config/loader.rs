// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::model::{Manual, RawManualFile};
use crate::errors::Result;

/// Read a manual file and return the parsed `RawManualFile`.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] to
/// also check references and build the store and graph.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawManualFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let manual: RawManualFile = toml::from_str(&contents)?;

    Ok(manual)
}

/// Load a manual from `path`, validate it and build store and graph.
///
/// Blob paths are resolved relative to the directory of `path`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Manual> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let manual = Manual::from_raw(raw, base_dir)?;

    info!(
        path = ?path,
        steps = manual.graph.len(),
        scheduler = %manual.config.scheduler,
        "loaded manual"
    );
    Ok(manual)
}
